//! Pot server client.

use crate::api::config::ClientConfig;
use crate::error::{PotError, Result};
use crate::model::data::normalize_pot_name;
use crate::model::{DeviceRecord, PlantCatalogEntry, PotId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Operations offered by the pot server.
///
/// Implementations must be cheap to clone; pollers hold their own copy.
pub trait PotApi: Clone + Send + Sync + 'static {
    /// Fetch the full plant catalog.
    fn list_plants(&self) -> impl std::future::Future<Output = Result<Vec<PlantCatalogEntry>>> + Send;

    /// Resolve a pot identifier to its current device record.
    fn fetch_device(&self, id: &PotId) -> impl std::future::Future<Output = Result<DeviceRecord>> + Send;

    /// Assign a catalog plant to a pot.
    fn assign_plant(
        &self,
        id: &PotId,
        plant_id: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Change a pot's display name on the server.
    fn rename_pot(&self, id: &PotId, name: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Forward a platform push token to the server.
    fn register_push_token(&self, token: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[derive(Serialize)]
struct AssignPlantRequest<'a> {
    uuid: &'a PotId,
    #[serde(rename = "plantId")]
    plant_id: &'a str,
}

#[derive(Serialize)]
struct RenameRequest<'a> {
    uuid: &'a PotId,
    #[serde(rename = "newName")]
    new_name: &'a str,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// [`PotApi`] over HTTP using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPotApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpPotApi {
    /// Create a client for the configured server.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PotError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> Result<reqwest::Url> {
        reqwest::Url::parse(&self.config.endpoint(path)).map_err(|e| {
            PotError::config_error(format!("Invalid server URL {}: {}", self.config.base_url, e))
        })
    }

    /// `device/{id}` with the id percent-encoded as a single path segment.
    fn device_url(&self, id: &PotId) -> Result<reqwest::Url> {
        let mut url = self.url("device")?;
        url.path_segments_mut()
            .map_err(|_| {
                PotError::config_error(format!("Server URL {} cannot take a path", self.config.base_url))
            })?
            .push(id.as_str());
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: reqwest::Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let body = Self::checked_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.url(path)?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        Self::checked_body(response).await?;
        Ok(())
    }

    /// Read the body, turning non-2xx responses into [`PotError::Server`].
    async fn checked_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Something went wrong")
                    .to_string()
            });

        warn!("Server returned {}: {}", status, message);
        Err(PotError::server_error(status.as_u16(), message))
    }
}

impl PotApi for HttpPotApi {
    async fn list_plants(&self) -> Result<Vec<PlantCatalogEntry>> {
        self.get_json(self.url("plants")?).await
    }

    async fn fetch_device(&self, id: &PotId) -> Result<DeviceRecord> {
        self.get_json(self.device_url(id)?).await
    }

    async fn assign_plant(&self, id: &PotId, plant_id: &str) -> Result<()> {
        self.post_json("assign-plant", &AssignPlantRequest { uuid: id, plant_id })
            .await
    }

    async fn rename_pot(&self, id: &PotId, name: &str) -> Result<()> {
        let name = normalize_pot_name(name)?;
        self.post_json(
            "update-name",
            &RenameRequest {
                uuid: id,
                new_name: &name,
            },
        )
        .await
    }

    async fn register_push_token(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(PotError::invalid_input("push token is empty"));
        }
        self.post_json("token", &TokenRequest { token }).await
    }
}
