//! Ledger HTTP client
//!
//! Delivery is best-effort: one POST per record, no retry, no requeue. The
//! outcome is logged here and returned to the caller, which drops the record
//! either way.
//!
//! Both the connect and the read timeout are bounded, and so is the whole
//! request (connect + read), so a stalled ledger holds up the dispatch worker
//! for a known, finite time.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::LedgerSettings;
use crate::record::LedgerRecord;
use crate::utils::{BridgeError, ForwardError};

#[derive(Debug, Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
}

impl LedgerClient {
    pub fn new(settings: &LedgerSettings) -> Result<Self, BridgeError> {
        Self::with_timeouts(
            Duration::from_millis(settings.connect_timeout_ms),
            Duration::from_millis(settings.read_timeout_ms),
        )
    }

    pub fn with_timeouts(connect: Duration, read: Duration) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect)
            .read_timeout(read)
            .timeout(connect + read)
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Posts `body` as JSON to `url`.
    ///
    /// Returns the full response body on `200 OK`. Any other status, and any
    /// connect/read failure or timeout, is a [`ForwardError`].
    pub async fn post(&self, url: &str, body: String) -> Result<String, ForwardError> {
        let result = self.send(url, body).await;
        match &result {
            Ok(text) => info!("Ledger accepted record at {url}: {}", text.trim_end()),
            Err(e) => warn!("Ledger POST to {url} failed: {e}"),
        }
        result
    }

    /// Serializes `record` and posts it to `url`.
    pub async fn post_record(
        &self,
        url: &str,
        record: &LedgerRecord,
    ) -> Result<String, BridgeError> {
        self.post_json(url, record).await
    }

    /// Serializes `value` and posts it to `url`. Nothing is sent when the
    /// value cannot be encoded.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        value: &T,
    ) -> Result<String, BridgeError> {
        let body =
            serde_json::to_string(value).map_err(|e| BridgeError::Serialize(e.to_string()))?;
        Ok(self.post(url, body).await?)
    }

    async fn send(&self, url: &str, body: String) -> Result<String, ForwardError> {
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ForwardError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        response.text().await.map_err(transport_error)
    }
}

fn transport_error(err: reqwest::Error) -> ForwardError {
    if err.is_timeout() {
        ForwardError::Transport(format!("timed out: {err}"))
    } else {
        ForwardError::Transport(err.to_string())
    }
}
