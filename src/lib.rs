//! # ledger-bridge
//!
//! `ledger-bridge` subscribes to every topic on an MQTT broker, turns each
//! sensor reading into a ledger asset record, and posts it to a REST ledger
//! API. A small HTTP endpoint tells devices where the broker lives.
//!
//! ## Core Modules
//!
//! - `broker`: MQTT session handling and the single-worker dispatch queue.
//! - `client`: HTTP client that posts records to the ledger.
//! - `config`: Handles loading and validating configuration.
//! - `record`: Hashing and ledger record assembly.
//! - `transport`: The broker metadata HTTP endpoint.
//! - `utils`: Error taxonomy and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod record;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod test_support;
