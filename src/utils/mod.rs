//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `ledger-bridge` application.
//!
//! This module centralizes reusable components, such as the error taxonomy
//! and logging setup, to promote code consistency and reduce duplication.

pub mod error;
pub mod logging;

pub use error::{BridgeError, ForwardError};
