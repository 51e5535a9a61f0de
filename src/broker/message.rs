//! Message definitions for the broker adapter
//!
//! `InboundMessage` is what the adapter hands to the dispatch worker for
//! each PUBLISH received from the broker. It lives exactly as long as one
//! trip through the record builder and the ledger client.

use bytes::Bytes;
use rumqttc::{Publish, QoS};

use crate::utils::BridgeError;

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Bytes,
    pub qos: u8,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>, qos: u8) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos,
        }
    }

    /// Payload as text for logging; invalid UTF-8 is replaced, not rejected.
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

impl From<Publish> for InboundMessage {
    fn from(publish: Publish) -> Self {
        Self {
            qos: qos_level(publish.qos),
            topic: publish.topic,
            payload: publish.payload,
        }
    }
}

pub fn qos_level(qos: QoS) -> u8 {
    match qos {
        QoS::AtMostOnce => 0,
        QoS::AtLeastOnce => 1,
        QoS::ExactlyOnce => 2,
    }
}

pub fn qos_from_level(level: u8) -> Result<QoS, BridgeError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(BridgeError::Config(format!("invalid QoS level {other}"))),
    }
}
