//! smartpot - Smart Plant Pot Client Binary
//!
//! Command-line client for pairing pots, inspecting their status and
//! watching live sensor readings.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use smartpot::catalog;
use smartpot::model::classify::Dimension;
use smartpot::monitor::LogAlertSink;
use smartpot::{
    pair, AppConfig, FleetMonitor, HttpPotApi, JsonFileStorage, MemoryStorage, PairOutcome,
    PollEvent, Poller, Pot, PotApi, PotId, PotStore, PotStoreHandle, ThresholdConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "smartpot")]
#[command(about = "🌱 smartpot - Smart Plant Pot Client")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Pair smart plant pots, check their status and watch live sensor readings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./smartpot.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Pot server base URL
    #[arg(long, global = true)]
    server: Option<String>,

    /// Directory holding the local pot list
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep the pot list in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair a pot from its scanned QR token
    Pair(PairArgs),

    /// List paired pots
    List,

    /// Fetch fresh readings for one pot and show its status
    Show(PotArg),

    /// Poll one pot, or all pots, until interrupted
    Watch(WatchArgs),

    /// List or search the plant catalog
    Plants(PlantsArgs),

    /// Assign a catalog plant to a pot
    Assign(AssignArgs),

    /// Rename a pot
    Rename(RenameArgs),

    /// Delete a pot from the local list
    Remove(PotArg),

    /// Delete every pot from the local list
    Clear,

    /// Register a push notification token with the server
    RegisterToken(TokenArgs),

    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct PairArgs {
    /// Token read from the pot's QR code
    token: String,

    /// Plant to assign right after pairing (id or name)
    #[arg(long)]
    plant: Option<String>,
}

#[derive(Args)]
struct PotArg {
    /// Pot identifier or name
    pot: String,
}

#[derive(Args)]
struct WatchArgs {
    /// Pot identifier or name; all pots when omitted
    pot: Option<String>,

    /// Poll interval in milliseconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// Stop after this many poll results
    #[arg(long)]
    count: Option<usize>,
}

#[derive(Args)]
struct PlantsArgs {
    /// Case-insensitive name filter
    #[arg(short, long, default_value = "")]
    search: String,
}

#[derive(Args)]
struct AssignArgs {
    /// Pot identifier or name
    pot: String,

    /// Plant id or name
    plant: String,
}

#[derive(Args)]
struct RenameArgs {
    /// Pot identifier or name
    pot: String,

    /// New display name
    name: String,
}

#[derive(Args)]
struct TokenArgs {
    /// Platform push token
    token: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    let config = load_config(&cli)?;
    let api = HttpPotApi::new(config.client_config())?;

    match &cli.command {
        Commands::Pair(args) => pair_command(&cli, &api, &open_store(&cli, &config)?, args).await?,
        Commands::List => list_command(&cli, &open_store(&cli, &config)?)?,
        Commands::Show(args) => show_command(&cli, &api, &open_store(&cli, &config)?, args).await?,
        Commands::Watch(args) => {
            let store = open_store(&cli, &config)?;
            watch_command(&cli, &config, api, store, args).await?
        }
        Commands::Plants(args) => plants_command(&cli, &api, args).await?,
        Commands::Assign(args) => assign_command(&cli, &api, &open_store(&cli, &config)?, args).await?,
        Commands::Rename(args) => rename_command(&cli, &api, &open_store(&cli, &config)?, args).await?,
        Commands::Remove(args) => remove_command(&open_store(&cli, &config)?, args).await?,
        Commands::Clear => {
            open_store(&cli, &config)?.clear().await?;
            println!("All pots removed.");
        }
        Commands::RegisterToken(args) => {
            api.register_push_token(&args.token).await?;
            println!("✅ Token sent to server");
        }
        Commands::Config => print!("{}", toml::to_string_pretty(&config)?),
    }

    Ok(())
}

/// Level used when `RUST_LOG` is unset.
fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// Filter from `RUST_LOG`-style directives, falling back to `level`.
fn log_filter(level: Level, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives.unwrap_or_default())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(log_level(cli), directives.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn open_store(cli: &Cli, config: &AppConfig) -> anyhow::Result<PotStoreHandle> {
    let store = if cli.ephemeral {
        PotStore::spawn(MemoryStorage::new())?
    } else {
        let storage = JsonFileStorage::new(&config.storage.data_dir);
        info!("Using pot list at {}", storage.path().display());
        PotStore::spawn(storage)?
    };
    Ok(store)
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;

    if let Some(server) = &cli.server {
        config.server.base_url = server.clone();
    }
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Look a pot up by identifier, then by name.
fn resolve_pot(store: &PotStoreHandle, key: &str) -> anyhow::Result<Pot> {
    if let Ok(id) = PotId::parse(key) {
        if let Some(pot) = store.get(&id) {
            return Ok(pot);
        }
    }

    let key = key.trim();
    let mut matches = store
        .list()
        .into_iter()
        .filter(|p| p.name.eq_ignore_ascii_case(key));
    match (matches.next(), matches.next()) {
        (Some(pot), None) => Ok(pot),
        (Some(_), Some(_)) => bail!("Several pots are named {:?}; use the identifier", key),
        (None, _) => bail!("No pot {:?} in the list", key),
    }
}

async fn pair_command(
    cli: &Cli,
    api: &HttpPotApi,
    store: &PotStoreHandle,
    args: &PairArgs,
) -> anyhow::Result<()> {
    let outcome = pair(api, store, &args.token)
        .await
        .context("Failed to pair pot")?;

    let pot = match outcome {
        PairOutcome::AlreadyPresent(id) => {
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&PairOutcome::AlreadyPresent(id))?),
                OutputFormat::Pretty => println!("Already added: pot {} is already in your list.", id),
            }
            return Ok(());
        }
        PairOutcome::Added(pot) => pot,
    };

    let pot = match &args.plant {
        Some(plant) => assign_plant(api, store, &pot, plant).await?,
        None => pot,
    };

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&PairOutcome::Added(pot))?),
        OutputFormat::Pretty => {
            println!("🌱 Paired {} ({})", pot.name, pot.id);
            if pot.assigned_plant.is_none() {
                println!("   Next: smartpot plants, then smartpot assign {} <plant>", pot.id);
            }
        }
    }
    Ok(())
}

fn list_command(cli: &Cli, store: &PotStoreHandle) -> anyhow::Result<()> {
    let pots = store.list();

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pots)?),
        OutputFormat::Pretty => {
            if pots.is_empty() {
                println!("No pots yet. Pair one with: smartpot pair <token>");
            }
            for pot in &pots {
                let plant = pot
                    .assigned_plant
                    .as_ref()
                    .map(|p| p.name.as_str())
                    .unwrap_or("no plant");
                println!("🪴 {} [{}] - {} - {}", pot.name, pot.id, plant, pot.summary());
            }
        }
    }
    Ok(())
}

async fn show_command(
    cli: &Cli,
    api: &HttpPotApi,
    store: &PotStoreHandle,
    args: &PotArg,
) -> anyhow::Result<()> {
    let pot = resolve_pot(store, &args.pot)?;
    let fetched_at = chrono::Utc::now();

    match api.fetch_device(&pot.id).await {
        Ok(record) => {
            store.apply_snapshot(&pot.id, record.snapshot(fetched_at)).await?;
        }
        Err(e) => eprintln!("⚠️  Failed to load plant data, showing cached values: {}", e),
    }

    let pot = store.get(&pot.id).unwrap_or(pot);
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pot)?),
        OutputFormat::Pretty => print_pretty_pot(&pot),
    }
    Ok(())
}

async fn watch_command(
    cli: &Cli,
    config: &AppConfig,
    api: HttpPotApi,
    store: PotStoreHandle,
    args: &WatchArgs,
) -> anyhow::Result<()> {
    if args.interval == Some(0) {
        bail!("--interval must be greater than zero");
    }
    let (tx, mut rx) = mpsc::channel::<PollEvent>(16);

    let handle = match &args.pot {
        Some(key) => {
            let pot = resolve_pot(&store, key)?;
            let interval = args.interval.map(Duration::from_millis).unwrap_or(config.poll_interval());
            if cli.format == OutputFormat::Pretty {
                print_banner(&format!("Watching {} every {:?}", pot.name, interval));
            }
            Poller::new(api, store.clone(), pot.id)
                .with_interval(interval)?
                .with_events(tx)
                .spawn()
        }
        None => {
            if store.list().is_empty() {
                bail!("No pots to watch. Pair one with: smartpot pair <token>");
            }
            let interval = args.interval.map(Duration::from_millis).unwrap_or(config.fleet_interval());
            if cli.format == OutputFormat::Pretty {
                print_banner(&format!("Watching {} pots every {:?}", store.list().len(), interval));
            }
            FleetMonitor::new(api, store.clone(), Arc::new(LogAlertSink))
                .with_interval(interval)?
                .with_events(tx)
                .spawn()
        }
    };

    let mut seen = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                print_event(cli, &store, &event)?;
                seen += 1;
                if args.count.is_some_and(|count| seen >= count) {
                    break;
                }
            }
        }
    }

    handle.stop().await;
    Ok(())
}

async fn plants_command(cli: &Cli, api: &HttpPotApi, args: &PlantsArgs) -> anyhow::Result<()> {
    let plants = api.list_plants().await.context("Failed to fetch plants")?;
    let found = catalog::search(&plants, &args.search);

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&found)?),
        OutputFormat::Pretty => {
            if found.is_empty() {
                println!("No plants match {:?}", args.search);
            }
            for plant in found {
                println!("🌿 {} [{}]", plant.name, plant.id);
                if !plant.description.is_empty() {
                    println!("   {}", plant.description);
                }
            }
        }
    }
    Ok(())
}

async fn assign_command(
    cli: &Cli,
    api: &HttpPotApi,
    store: &PotStoreHandle,
    args: &AssignArgs,
) -> anyhow::Result<()> {
    let pot = resolve_pot(store, &args.pot)?;
    let pot = assign_plant(api, store, &pot, &args.plant).await?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pot)?),
        OutputFormat::Pretty => {
            let plant = pot.assigned_plant.as_ref().map(|p| p.name.as_str()).unwrap_or("?");
            println!("🌱 Plant {} assigned to {}", plant, pot.name);
        }
    }
    Ok(())
}

async fn assign_plant(
    api: &HttpPotApi,
    store: &PotStoreHandle,
    pot: &Pot,
    plant: &str,
) -> anyhow::Result<Pot> {
    let plants = api.list_plants().await.context("Failed to fetch plants")?;
    let Some(entry) = catalog::find(&plants, plant) else {
        bail!("No plant {:?} in the catalog", plant);
    };

    api.assign_plant(&pot.id, &entry.id)
        .await
        .context("Failed to assign plant")?;
    Ok(store.assign_plant(&pot.id, entry.clone()).await?)
}

async fn rename_command(
    cli: &Cli,
    api: &HttpPotApi,
    store: &PotStoreHandle,
    args: &RenameArgs,
) -> anyhow::Result<()> {
    let pot = resolve_pot(store, &args.pot)?;
    let name = smartpot::model::data::normalize_pot_name(&args.name)?;

    api.rename_pot(&pot.id, &name)
        .await
        .context("Failed to rename pot")?;
    let pot = store.rename(&pot.id, name).await?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pot)?),
        OutputFormat::Pretty => println!("Pot name updated: {}", pot.name),
    }
    Ok(())
}

async fn remove_command(store: &PotStoreHandle, args: &PotArg) -> anyhow::Result<()> {
    let pot = resolve_pot(store, &args.pot)?;
    match store.remove(&pot.id).await? {
        Some(pot) => println!("Deleted {} ({})", pot.name, pot.id),
        None => println!("Pot {} was already gone", pot.id),
    }
    Ok(())
}

fn print_banner(line: &str) {
    println!("🌱 smartpot - Smart Plant Pot Client");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!("   {}", line);
    println!();
}

fn print_event(cli: &Cli, store: &PotStoreHandle, event: &PollEvent) -> anyhow::Result<()> {
    match (cli.format, event) {
        (OutputFormat::Json, PollEvent::Snapshot { id, .. }) => {
            if let Some(pot) = store.get(id) {
                println!("{}", serde_json::to_string(&pot)?);
            }
        }
        (OutputFormat::Json, PollEvent::Failed { id, error }) => {
            println!("{}", serde_json::json!({ "uuid": id, "error": error }));
        }
        (OutputFormat::Pretty, PollEvent::Snapshot { id, snapshot, .. }) => {
            let name = store.get(id).map(|p| p.name).unwrap_or_else(|| id.to_string());
            let r = &snapshot.readings;
            println!(
                "{} {}: moisture {} | temperature {} | light {} | {}",
                snapshot.fetched_at.format("%H:%M:%S"),
                name,
                fmt_reading(r.moisture, Dimension::Moisture),
                fmt_reading(r.temperature, Dimension::Temperature),
                fmt_reading(r.light, Dimension::Light),
                store.get(id).map(|p| p.summary()).unwrap_or_default(),
            );
        }
        (OutputFormat::Pretty, PollEvent::Failed { id, error }) => {
            println!("⚠️  {}: failed to fetch plant data: {}", id, error);
        }
    }
    Ok(())
}

fn fmt_reading(value: Option<f64>, dimension: Dimension) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, dimension.unit()),
        None => "-".to_string(),
    }
}

fn print_pretty_pot(pot: &Pot) {
    println!("🪴 {} [{}]", pot.name, pot.id);
    println!("==========================================");

    match &pot.assigned_plant {
        Some(plant) => {
            println!("🌿 Plant: {}", plant.name);
            if !plant.description.is_empty() {
                println!("   {}", plant.description);
            }
        }
        None => println!("🌿 Plant: none assigned"),
    }
    println!();

    let Some(snapshot) = &pot.snapshot else {
        println!("No data yet");
        return;
    };

    let config = pot.assigned_plant.as_ref().and_then(ThresholdConfig::from_plant);
    for dimension in Dimension::ALL {
        let reading = fmt_reading(dimension.reading(&snapshot.readings), dimension);
        let range = match &config {
            Some(config) => format!("{} {}", config.threshold(dimension).range, dimension.unit()),
            None => "range unknown".to_string(),
        };
        println!(
            "  {:<12} {:>10}   ({})   {}",
            dimension.to_string(),
            reading,
            range,
            dimension.label(&snapshot.status)
        );
    }
    println!();
    println!("Status: {}", pot.summary());
    println!(
        "Updated: {}",
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}
