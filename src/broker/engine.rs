//! Broker adapter engine
//!
//! This module owns the MQTT session the bridge listens on:
//! - connecting with a clean session (no replay of missed messages)
//! - subscribing to the configured topic pattern
//! - driving the client event loop and handing each PUBLISH to the dispatch
//!   worker, in the order the broker delivered them
//!
//! Concurrency and usage notes:
//! - The event loop is polled from a single task. Hand-off to the dispatch
//!   worker goes through a bounded channel, so while the worker is busy with
//!   a slow POST the event loop waits too. That is the backpressure policy:
//!   one message in flight, arrival order preserved, no overlap.
//! - On connection loss the loop stops and `run` returns the cause. There is
//!   no automatic reconnect; the process is expected to be restarted by
//!   whatever supervises it.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::broker::address::BrokerAddress;
use crate::broker::message::{InboundMessage, qos_from_level};
use crate::broker::state::ConnectionState;
use crate::config::BrokerSettings;
use crate::utils::BridgeError;

pub struct BrokerAdapter {
    client: AsyncClient,
    eventloop: EventLoop,
    state: ConnectionState,
}

impl BrokerAdapter {
    /// How long a clean disconnect or a publish acknowledgement is waited for.
    const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

    /// Opens a session with the broker and waits for its CONNACK.
    ///
    /// Credentials are only sent when both `username` and `password` are set.
    pub async fn connect(settings: &BrokerSettings) -> Result<Self, BridgeError> {
        let address = BrokerAddress::parse(&settings.uri)?;
        let options = mqtt_options(settings, &address);
        let (client, eventloop) = AsyncClient::new(options, settings.channel_capacity.max(1));

        let mut adapter = Self {
            client,
            eventloop,
            state: ConnectionState::Connecting,
        };

        info!("Connecting to broker: {}", settings.uri);
        loop {
            match adapter.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    adapter.state = ConnectionState::Connected;
                    info!(
                        "Connected to {}:{} as {} ({:?})",
                        address.host, address.port, settings.client_id, ack.code
                    );
                    return Ok(adapter);
                }
                Ok(_) => continue,
                Err(e) => {
                    adapter.state = ConnectionState::Disconnected;
                    error!("Failed to connect to {}: {e}", settings.uri);
                    return Err(e.into());
                }
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Registers interest in `pattern` (`#` for every topic).
    pub async fn subscribe(&self, pattern: &str, qos: u8) -> Result<(), BridgeError> {
        self.client.subscribe(pattern, qos_from_level(qos)?).await?;
        info!("Subscribing to '{pattern}' at QoS {qos}");
        Ok(())
    }

    /// Drives the session, forwarding every PUBLISH to `dispatch`.
    ///
    /// Returns `Ok(())` after an explicit disconnect or once the dispatch
    /// worker has gone away, and the connection error if the session is lost.
    pub async fn run(&mut self, dispatch: mpsc::Sender<InboundMessage>) -> Result<(), BridgeError> {
        loop {
            let event = match self.eventloop.poll().await {
                Ok(event) => event,
                Err(e) => {
                    self.state = ConnectionState::Disconnected;
                    error!("Lost connection to broker: {e}");
                    return Err(e.into());
                }
            };

            match event {
                Event::Incoming(Packet::Publish(publish)) => {
                    let message = InboundMessage::from(publish);
                    info!(
                        "Message arrived on '{}': {}",
                        message.topic,
                        message.payload_lossy()
                    );
                    if dispatch.send(message).await.is_err() {
                        warn!("Dispatch worker stopped; leaving broker loop");
                        return Ok(());
                    }
                }
                Event::Incoming(Packet::SubAck(ack)) => {
                    info!("Subscription acknowledged: {:?}", ack.return_codes);
                }
                Event::Incoming(Packet::PubAck(ack)) => {
                    debug!("Message with packet id {} delivered.", ack.pkid);
                }
                Event::Incoming(Packet::PubComp(comp)) => {
                    debug!("Message with packet id {} delivered.", comp.pkid);
                }
                Event::Incoming(Packet::Disconnect) => {
                    self.state = ConnectionState::Disconnected;
                    error!("Broker closed the session");
                    return Err(BridgeError::Connection("broker closed the session".into()));
                }
                Event::Outgoing(Outgoing::Disconnect) => {
                    self.state = ConnectionState::Disconnected;
                    info!("Disconnected from broker");
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    /// Publishes one message and waits until the broker has it.
    ///
    /// For QoS 0 that is when the packet is written; for QoS 1 and 2 it is
    /// the PUBACK / PUBCOMP.
    pub async fn publish(
        &mut self,
        topic: &str,
        payload: Vec<u8>,
        qos: u8,
    ) -> Result<(), BridgeError> {
        let level = qos_from_level(qos)?;
        self.client.publish(topic, level, false, payload).await?;

        let eventloop = &mut self.eventloop;
        let wait = async {
            loop {
                let event = match eventloop.poll().await {
                    Ok(event) => event,
                    Err(e) => return Err(BridgeError::from(e)),
                };
                match event {
                    Event::Outgoing(Outgoing::Publish(pkid)) if level == QoS::AtMostOnce => {
                        debug!("Published packet {pkid} to '{topic}'");
                        return Ok(());
                    }
                    Event::Incoming(Packet::PubAck(ack)) => {
                        debug!("Message with packet id {} delivered.", ack.pkid);
                        return Ok(());
                    }
                    Event::Incoming(Packet::PubComp(comp)) => {
                        debug!("Message with packet id {} delivered.", comp.pkid);
                        return Ok(());
                    }
                    _ => {}
                }
            }
        };

        match tokio::time::timeout(Self::DRAIN_TIMEOUT, wait).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
            Err(_) => Err(BridgeError::Connection(format!(
                "no acknowledgement for publish to '{topic}' within {:?}",
                Self::DRAIN_TIMEOUT
            ))),
        }
    }

    /// Sends DISCONNECT and closes the transport.
    pub async fn disconnect(&mut self) -> Result<(), BridgeError> {
        if self.state == ConnectionState::Disconnected {
            return Ok(());
        }
        self.client.disconnect().await?;

        let eventloop = &mut self.eventloop;
        let drain = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(Self::DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("Timed out waiting for DISCONNECT to be written");
        }

        self.state = ConnectionState::Disconnected;
        info!("Disconnected from broker");
        Ok(())
    }
}

pub(crate) fn mqtt_options(settings: &BrokerSettings, address: &BrokerAddress) -> MqttOptions {
    let mut options = MqttOptions::new(
        settings.client_id.clone(),
        address.host.clone(),
        address.port,
    );
    options.set_clean_session(true);
    options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs.max(5)));
    if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
        options.set_credentials(username.clone(), password.clone());
    }
    options
}
