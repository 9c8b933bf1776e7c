use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use smartpot::{
    error::PotError,
    monitor::CollectingAlertSink,
    pair, ClientConfig, FleetMonitor, HttpPotApi, MemoryStorage, PairOutcome, PollEvent, Poller,
    PotApi, PotId, PotStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

#[derive(Clone, Default)]
struct MockServer {
    devices: Arc<Mutex<HashMap<String, Value>>>,
    posts: Arc<Mutex<Vec<(String, Value)>>>,
    device_requests: Arc<AtomicUsize>,
}

impl MockServer {
    fn with_device(self, id: &str, body: Value) -> Self {
        self.devices.lock().unwrap().insert(id.to_string(), body);
        self
    }

    fn posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().unwrap().clone()
    }

    fn device_requests(&self) -> usize {
        self.device_requests.load(Ordering::SeqCst)
    }
}

async fn plants() -> Json<Value> {
    Json(json!([
        {
            "_id": "basil-1",
            "name": "Basil",
            "description": "Kitchen herb",
            "photo": "https://example.com/basil.jpg",
            "defaultSoil": {"min": 40, "max": 70},
            "defaultTemp": {"min": 18, "max": 28},
            "defaultLight": {"min": 300, "max": 900}
        },
        {
            "_id": "cactus-1",
            "name": "Cactus",
            "description": "Desert plant",
            "photo": ""
        }
    ]))
}

async fn device(State(server): State<MockServer>, Path(id): Path<String>) -> Response {
    server.device_requests.fetch_add(1, Ordering::SeqCst);

    if id == "slow" {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    if id == "broken" {
        return (StatusCode::OK, "{not json").into_response();
    }

    match server.devices.lock().unwrap().get(&id) {
        Some(body) => Json(body.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Device not found"})),
        )
            .into_response(),
    }
}

async fn record_post(server: &MockServer, path: &str, body: Value) -> Json<Value> {
    server.posts.lock().unwrap().push((path.to_string(), body));
    Json(json!({"message": "ok"}))
}

async fn spawn_server(server: MockServer) -> String {
    let app = Router::new()
        .route("/plants", get(plants))
        .route("/device/:id", get(device))
        .route(
            "/assign-plant",
            post(|State(s): State<MockServer>, Json(body): Json<Value>| async move {
                record_post(&s, "/assign-plant", body).await
            }),
        )
        .route(
            "/update-name",
            post(|State(s): State<MockServer>, Json(body): Json<Value>| async move {
                record_post(&s, "/update-name", body).await
            }),
        )
        .route(
            "/token",
            post(|State(s): State<MockServer>, Json(body): Json<Value>| async move {
                record_post(&s, "/token", body).await
            }),
        )
        .with_state(server);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind mock server");
    let addr = listener.local_addr().expect("Should have local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock server failed");
    });

    format!("http://{}", addr)
}

fn device_body(id: &str, light: f64) -> Value {
    json!({
        "uuid": id,
        "name": "My Smart Pot",
        "assignedPlant": {
            "_id": "basil-1",
            "name": "Basil",
            "description": "Kitchen herb",
            "photo": "",
            "defaultSoil": {"min": 40, "max": 70},
            "defaultTemp": {"min": 18, "max": 28},
            "defaultLight": {"min": 300, "max": 900}
        },
        "sensorData": {"moisture": 55.0, "temperature": 21.5, "light": light},
        "status": {"moisture": "Moisture OK", "temperature": "Temperature OK", "light": "Light OK"}
    })
}

async fn client_for(server: &MockServer) -> HttpPotApi {
    let base_url = spawn_server(server.clone()).await;
    HttpPotApi::new(ClientConfig::new(base_url).with_timeout(Some(Duration::from_millis(500))))
        .expect("Should build client")
}

#[tokio::test]
async fn test_fetch_device_and_plants() {
    let server = MockServer::default().with_device("pot-1", device_body("pot-1", 500.0));
    let api = client_for(&server).await;

    let record = api
        .fetch_device(&PotId::parse("pot-1").unwrap())
        .await
        .expect("Should fetch device");
    assert_eq!(record.name.as_deref(), Some("My Smart Pot"));
    assert_eq!(record.sensor_data.unwrap().light, Some(500.0));
    assert!(record.assigned_plant.unwrap().has_ranges());

    let plants = api.list_plants().await.expect("Should list plants");
    assert_eq!(plants.len(), 2);
    assert_eq!(plants[1].soil_moisture, None);
}

#[tokio::test]
async fn test_server_errors_carry_message() {
    let server = MockServer::default();
    let api = client_for(&server).await;

    let err = api
        .fetch_device(&PotId::parse("missing").unwrap())
        .await
        .unwrap_err();
    match err {
        PotError::Server { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Device not found");
        }
        other => panic!("Expected server error, got {:?}", other),
    }

    let err = api
        .fetch_device(&PotId::parse("broken").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, PotError::Json(_)));
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::default();
    let api = client_for(&server).await;

    let err = api
        .fetch_device(&PotId::parse("slow").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, PotError::Network(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_post_bodies() {
    let server = MockServer::default();
    let api = client_for(&server).await;
    let id = PotId::parse("pot-1").unwrap();

    api.assign_plant(&id, "basil-1").await.expect("Should assign");
    api.rename_pot(&id, "  Balcony  ").await.expect("Should rename");
    api.register_push_token("ExponentPushToken[abc]").await.expect("Should register");

    let posts = server.posts();
    assert_eq!(
        posts,
        vec![
            ("/assign-plant".to_string(), json!({"uuid": "pot-1", "plantId": "basil-1"})),
            ("/update-name".to_string(), json!({"uuid": "pot-1", "newName": "Balcony"})),
            ("/token".to_string(), json!({"token": "ExponentPushToken[abc]"})),
        ]
    );

    let err = api.rename_pot(&id, "   ").await.unwrap_err();
    assert!(matches!(err, PotError::InvalidInput(_)));
    assert_eq!(server.posts().len(), 3);
}

#[tokio::test]
async fn test_pairing_flow() {
    let server = MockServer::default().with_device("pot-1", device_body("pot-1", 500.0));
    let api = client_for(&server).await;
    let store = PotStore::spawn(MemoryStorage::new()).expect("Should start store");

    let outcome = pair(&api, &store, " pot-1 ").await.expect("Should pair");
    let pot = match outcome {
        PairOutcome::Added(pot) => pot,
        other => panic!("Expected Added, got {:?}", other),
    };
    assert_eq!(pot.name, "My Smart Pot");
    assert_eq!(pot.summary(), "All Conditions Good");

    let again = pair(&api, &store, "pot-1").await.expect("Should pair again");
    assert_eq!(again, PairOutcome::AlreadyPresent(PotId::parse("pot-1").unwrap()));
    assert_eq!(server.device_requests(), 1);
    assert_eq!(store.list().len(), 1);

    let err = pair(&api, &store, "unknown").await.unwrap_err();
    assert!(matches!(err, PotError::Server { status: 404, .. }));
    assert_eq!(store.list().len(), 1);
}

#[tokio::test]
async fn test_pairing_token_with_reserved_characters() {
    let mut other = device_body("pot-A", 500.0);
    other["name"] = json!("Other pot");
    let mut hashed = device_body("pot-A#x", 500.0);
    hashed["name"] = json!("Hash pot");
    let mut queried = device_body("pot-A?x=1", 500.0);
    queried["name"] = json!("Query pot");

    let server = MockServer::default()
        .with_device("pot-A", other)
        .with_device("pot-A#x", hashed)
        .with_device("pot-A?x=1", queried);
    let api = client_for(&server).await;
    let store = PotStore::spawn(MemoryStorage::new()).expect("Should start store");

    for (token, name) in [("pot-A#x", "Hash pot"), ("pot-A?x=1", "Query pot")] {
        match pair(&api, &store, token).await.expect("Should pair") {
            PairOutcome::Added(pot) => {
                assert_eq!(pot.id.as_str(), token);
                assert_eq!(pot.name, name);
            }
            other => panic!("Expected Added, got {:?}", other),
        }
    }
    assert_eq!(store.list().len(), 2);
}

#[tokio::test]
async fn test_zero_interval_rejected() {
    let server = MockServer::default();
    let api = client_for(&server).await;
    let store = PotStore::spawn(MemoryStorage::new()).expect("Should start store");

    let stream = smartpot::monitor::snapshot_stream(api.clone(), PotId::parse("pot-1").unwrap(), Duration::ZERO);
    assert!(stream.is_err());

    let err = Poller::new(api.clone(), store.clone(), PotId::parse("pot-1").unwrap())
        .with_interval(Duration::ZERO)
        .err()
        .expect("Zero interval should be rejected");
    assert!(matches!(err, PotError::InvalidInput(_)));

    let err = FleetMonitor::new(api, store, Arc::new(CollectingAlertSink::new()))
        .with_interval(Duration::ZERO)
        .err()
        .expect("Zero interval should be rejected");
    assert!(matches!(err, PotError::InvalidInput(_)));
    assert_eq!(server.device_requests(), 0);
}

#[tokio::test]
async fn test_poller_updates_store_and_stops() {
    let server = MockServer::default().with_device("pot-1", device_body("pot-1", 100.0));
    let api = client_for(&server).await;
    let store = PotStore::spawn(MemoryStorage::new()).expect("Should start store");
    pair(&api, &store, "pot-1").await.expect("Should pair");

    let (tx, mut rx) = mpsc::channel(8);
    let handle = Poller::new(api, store.clone(), PotId::parse("pot-1").unwrap())
        .with_interval(Duration::from_millis(20))
        .expect("Non-zero interval")
        .with_events(tx)
        .spawn();

    for _ in 0..2 {
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("Should poll within timeout")
            .expect("Channel open");
        assert!(matches!(event, PollEvent::Snapshot { .. }));
    }

    handle.stop().await;

    let pot = store.get(&PotId::parse("pot-1").unwrap()).unwrap();
    assert_eq!(pot.summary(), "Not enough light");
    assert!(server.device_requests() >= 3);
}

#[tokio::test]
async fn test_poller_survives_failures() {
    let server = MockServer::default();
    let api = client_for(&server).await;
    let store = PotStore::spawn(MemoryStorage::new()).expect("Should start store");
    store
        .add(smartpot::Pot::new(PotId::parse("offline").unwrap(), "Offline pot"))
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let handle = Poller::new(api, store.clone(), PotId::parse("offline").unwrap())
        .with_interval(Duration::from_millis(20))
        .expect("Non-zero interval")
        .with_events(tx)
        .spawn();

    for _ in 0..3 {
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("Should keep polling")
            .expect("Channel open");
        assert!(matches!(event, PollEvent::Failed { .. }));
    }
    assert!(!handle.is_finished());
    handle.stop().await;

    assert!(store.get(&PotId::parse("offline").unwrap()).unwrap().snapshot.is_none());
}

#[tokio::test]
async fn test_poller_stops_when_pot_removed() {
    let server = MockServer::default().with_device("pot-1", device_body("pot-1", 500.0));
    let api = client_for(&server).await;
    let store = PotStore::spawn(MemoryStorage::new()).expect("Should start store");

    let handle = Poller::new(api, store.clone(), PotId::parse("pot-1").unwrap())
        .with_interval(Duration::from_millis(20))
        .expect("Non-zero interval")
        .spawn();

    timeout(Duration::from_secs(2), async {
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Poller should stop for an unknown pot");
}

#[tokio::test]
async fn test_fleet_monitor_raises_alerts() {
    let server = MockServer::default()
        .with_device("pot-1", device_body("pot-1", 50.0))
        .with_device("pot-2", device_body("pot-2", 500.0));
    let api = client_for(&server).await;
    let store = PotStore::spawn(MemoryStorage::new()).expect("Should start store");
    pair(&api, &store, "pot-1").await.expect("Should pair pot-1");
    pair(&api, &store, "pot-2").await.expect("Should pair pot-2");

    let sink = Arc::new(CollectingAlertSink::new());
    let (tx, mut rx) = mpsc::channel(16);
    let handle = FleetMonitor::new(api, store.clone(), sink.clone())
        .with_interval(Duration::from_millis(20))
        .expect("Non-zero interval")
        .with_events(tx)
        .spawn();

    // Two full rounds over both pots
    for _ in 0..4 {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("Should poll within timeout")
            .expect("Channel open");
    }
    handle.stop().await;

    let alerts = sink.alerts();
    assert_eq!(alerts.len(), 1, "one alert per transition: {:?}", alerts);
    assert_eq!(alerts[0].pot_id.as_str(), "pot-1");
    assert_eq!(alerts[0].title, "Sunlight Alert");
    assert_eq!(alerts[0].description, "Move your (My Smart Pot) to a sunnier spot.");
}
