//! The `transport` module serves the broker metadata HTTP endpoint.
//!
//! Devices call it to find out where to connect: it looks up this host's
//! public hostname from the instance metadata service and answers with the
//! broker URI and port. There is no authentication on this endpoint.

pub mod http;
pub mod metadata;

pub use http::{router, serve_on, start_metadata_server};
pub use metadata::{BrokerMetadata, LOOKUP_FAILED, MetadataService};
