use url::Url;

use crate::utils::BridgeError;

pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Host and port parsed from a `tcp://host[:port]` broker URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    /// Accepts the `tcp` and `mqtt` schemes. A missing port means 1883.
    pub fn parse(uri: &str) -> Result<Self, BridgeError> {
        let url = Url::parse(uri)
            .map_err(|e| BridgeError::Config(format!("invalid broker uri '{uri}': {e}")))?;
        if !matches!(url.scheme(), "tcp" | "mqtt") {
            return Err(BridgeError::Config(format!(
                "unsupported broker uri scheme '{}' (expected tcp:// or mqtt://)",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| BridgeError::Config(format!("broker uri '{uri}' has no host")))?;
        Ok(Self {
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port: url.port().unwrap_or(DEFAULT_MQTT_PORT),
        })
    }
}
