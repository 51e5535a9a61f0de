//! The `error` module defines the error types used within the `ledger-bridge` application.
//!
//! Every failure in the bridge is handled where it happens: it is logged and
//! the bridge moves on to the next message. Only startup failures (bad config,
//! a broker that cannot be reached at launch) end the process.

use thiserror::Error;

/// Top-level error taxonomy for the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Broker unreachable, auth rejected, or the session was lost.
    #[error("broker connection error: {0}")]
    Connection(String),

    /// Message payload was not valid UTF-8 JSON. The message is dropped.
    #[error("failed to parse message payload: {0}")]
    Parse(String),

    /// A record could not be encoded as JSON. Nothing was sent.
    #[error("failed to serialize record: {0}")]
    Serialize(String),

    /// The ledger API could not be reached or did not answer with 200.
    #[error("failed to forward record: {0}")]
    Forward(#[from] ForwardError),

    /// The host metadata service could not be queried.
    #[error("metadata lookup failed: {0}")]
    MetadataLookup(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("http server error: {0}")]
    Server(String),
}

/// Ways a single POST to the ledger can fail.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The ledger answered, but not with `200 OK`.
    #[error("ledger responded with status {code}: {reason}")]
    Status { code: u16, reason: String },

    /// Connect, write, or read failed (including timeouts).
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<config::ConfigError> for BridgeError {
    fn from(err: config::ConfigError) -> Self {
        BridgeError::Config(err.to_string())
    }
}

impl From<rumqttc::ClientError> for BridgeError {
    fn from(err: rumqttc::ClientError) -> Self {
        BridgeError::Connection(err.to_string())
    }
}

impl From<rumqttc::ConnectionError> for BridgeError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        BridgeError::Connection(err.to_string())
    }
}
