//! The `record` module turns raw broker messages into ledger records.
//!
//! - `hasher`: SHA-256 content addressing for record and patient ids.
//! - `builder`: parses the payload and assembles the nested ledger document.

pub mod builder;
pub mod hasher;

pub use builder::{CaseDocument, LedgerRecord, PatientRef, RecordBuilder};
pub use hasher::sha256_hex;
