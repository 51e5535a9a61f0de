//! The `client` module holds the outbound HTTP client for the ledger API.
//!
//! It provides the `LedgerClient`, which posts serialized records to the
//! ledger with bounded connect and read timeouts.

pub mod ledger_client;
pub use ledger_client::LedgerClient;
