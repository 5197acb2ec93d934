//! Sol-Ark Cloud API client.
use reqwest::Url;
use serde_json::{Value, json};
use std::time::Duration;

use super::auth::{Authenticator, Credentials};
use super::error::{Error, Result};
use super::http_client::{Host, HttpClient};
use super::schemas::RawReading;

static PLANT_DATA_ENDPOINT: &str = "/rest/plant/getPlantData";

pub struct Client {
    http: HttpClient,
    auth: Authenticator,
    plant_id: String,
}

impl Client {
    /// Creates a new instance of `Client`.
    pub fn new(credentials: Credentials, primary: Url, fallback: Url, timeout: Duration) -> Self {
        let plant_id = credentials.plant_id.clone();
        Client {
            http: HttpClient::new(primary, fallback, timeout),
            auth: Authenticator::new(credentials),
            plant_id,
        }
    }

    /// Authenticate eagerly without fetching any data.
    pub async fn login(&self, host: Host) -> Result<()> {
        self.auth.ensure_session(&self.http, host).await?;
        Ok(())
    }

    /// Drop the cached session.
    pub async fn logout(&self) {
        self.auth.invalidate().await;
    }

    /// Invalidate the session so the next fetch re-authenticates.
    pub async fn invalidate_session(&self) {
        self.auth.invalidate().await;
    }

    /// Fetch the current raw plant data.
    pub async fn fetch_plant_data(&self, host: Host) -> Result<RawReading> {
        let session = self.auth.ensure_session(&self.http, host).await?;
        let body = json!({"plantId": self.plant_id});
        let value = self
            .http
            .post_json(
                host,
                PLANT_DATA_ENDPOINT,
                &body,
                Some(&session.access_token),
            )
            .await
            .map_err(|err| self.fetch_error(err));
        match value {
            Ok(value) => Self::extract_payload(value),
            Err(Error::TokenExpired) => {
                self.auth.invalidate().await;
                Err(Error::TokenExpired)
            }
            Err(err) => Err(err),
        }
    }

    /// Map raw transport errors into plant-data semantics.
    fn fetch_error(&self, error: Error) -> Error {
        match error {
            Error::Unauthorized => Error::TokenExpired,
            Error::NotFound => Error::InvalidPlantId(self.plant_id.clone()),
            other => other,
        }
    }

    /// Locate the data object inside the response envelope.
    fn extract_payload(value: Value) -> Result<RawReading> {
        let payload = ["data", "Data", "result"]
            .iter()
            .find_map(|key| value.get(*key))
            .filter(|payload| !payload.is_null())
            .unwrap_or(&value);
        RawReading::from_value(payload)
            .ok_or_else(|| Error::SchemaMismatch("plant data payload is not an object".into()))
    }

    /// Check that the configured credentials and plant can be reached.
    pub async fn test_connection(&self, host: Host) -> bool {
        match self.fetch_plant_data(host).await {
            Ok(_) => true,
            Err(err) => {
                log::warn!("Connection test failed: {err}");
                false
            }
        }
    }
}
