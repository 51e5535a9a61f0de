use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::MetadataSettings;
use crate::utils::BridgeError;

/// Host placeholder used when the metadata service cannot be reached.
///
/// Callers must check for it; the endpoint still answers `200 OK`.
pub const LOOKUP_FAILED: &str = "-1";

/// Connection details for the broker, as served to devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerMetadata {
    #[serde(rename = "mqtt_uri")]
    pub uri: String,
    #[serde(rename = "mqtt_port")]
    pub port: String,
    #[serde(rename = "uri_with_port")]
    pub combined: String,
}

impl BrokerMetadata {
    pub fn new(scheme: &str, host: &str, port: u16) -> Self {
        let uri = format!("{scheme}://{host}");
        Self {
            combined: format!("{uri}:{port}"),
            port: port.to_string(),
            uri,
        }
    }
}

/// Looks up the public hostname of this instance.
#[derive(Debug, Clone)]
pub struct MetadataService {
    http: reqwest::Client,
    lookup_url: String,
    scheme: String,
    mqtt_port: u16,
}

impl MetadataService {
    pub fn new(settings: &MetadataSettings) -> Result<Self, BridgeError> {
        let timeout = Duration::from_millis(settings.timeout_ms);
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .timeout(timeout * 2)
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            lookup_url: settings.lookup_url.clone(),
            scheme: settings.scheme.clone(),
            mqtt_port: settings.mqtt_port,
        })
    }

    /// Fetches the public hostname. Line breaks in the answer are dropped.
    pub async fn public_hostname(&self) -> Result<String, BridgeError> {
        let response = self
            .http
            .get(&self.lookup_url)
            .send()
            .await
            .map_err(|e| BridgeError::MetadataLookup(e.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(BridgeError::MetadataLookup(format!(
                "{} answered with status {}",
                self.lookup_url,
                response.status()
            )));
        }
        let text = response
            .text()
            .await
            .map_err(|e| BridgeError::MetadataLookup(e.to_string()))?;
        Ok(text.lines().collect())
    }

    /// Current broker metadata. Never fails: a failed lookup yields
    /// [`LOOKUP_FAILED`] as the host.
    pub async fn broker_metadata(&self) -> BrokerMetadata {
        let host = match self.public_hostname().await {
            Ok(host) => {
                debug!("Public hostname is {host}");
                host
            }
            Err(e) => {
                warn!("{e}; answering with sentinel host");
                LOOKUP_FAILED.to_string()
            }
        };
        BrokerMetadata::new(&self.scheme, &host, self.mqtt_port)
    }
}
