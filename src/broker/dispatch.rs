//! Dispatch worker
//!
//! Turns each `InboundMessage` into a ledger record and posts it. A single
//! worker task drains a bounded queue, so messages are handled one at a
//! time in arrival order. Failures are logged and the message is dropped:
//! there is no retry and no dead-letter queue.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::broker::message::InboundMessage;
use crate::client::LedgerClient;
use crate::config::Settings;
use crate::record::RecordBuilder;
use crate::utils::BridgeError;

/// Queue depth between the broker loop and the worker.
pub const DISPATCH_QUEUE_DEPTH: usize = 1;

#[derive(Debug, Clone)]
pub struct Dispatcher {
    builder: RecordBuilder,
    ledger: LedgerClient,
    endpoint: String,
}

impl Dispatcher {
    pub fn new(settings: &Settings) -> Result<Self, BridgeError> {
        Ok(Self::from_parts(
            RecordBuilder::new(settings.record.clone()),
            LedgerClient::new(&settings.ledger)?,
            settings.ledger.endpoint(),
        ))
    }

    pub fn from_parts(builder: RecordBuilder, ledger: LedgerClient, endpoint: String) -> Self {
        Self {
            builder,
            ledger,
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Builds the record for `message` and posts it to the ledger.
    ///
    /// Returns the ledger's response body on success.
    pub async fn handle(&self, message: &InboundMessage) -> Result<String, BridgeError> {
        let record = self.builder.build(&message.topic, &message.payload)?;
        self.ledger.post_record(&self.endpoint, &record).await
    }

    /// Starts the worker. Dropping every sender stops it once the queue is
    /// drained.
    pub fn spawn(self) -> (mpsc::Sender<InboundMessage>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<InboundMessage>(DISPATCH_QUEUE_DEPTH);
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match self.handle(&message).await {
                    Ok(_) => {}
                    // the ledger client has already logged the outcome
                    Err(BridgeError::Forward(_)) => {}
                    Err(e) => warn!("Dropping message on '{}': {e}", message.topic),
                }
            }
            debug!("Dispatch worker stopped");
        });
        (tx, handle)
    }
}
