use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::info;

use crate::transport::metadata::{BrokerMetadata, MetadataService};
use crate::utils::BridgeError;

/// Path the deployed devices query.
pub const DEVICE_INFO_PATH: &str = "/KUHealth/GetMqttInfo";
pub const METADATA_PATH: &str = "/broker-metadata";

pub fn router(service: MetadataService) -> Router {
    Router::new()
        .route(DEVICE_INFO_PATH, get(broker_metadata))
        .route(METADATA_PATH, get(broker_metadata))
        .with_state(Arc::new(service))
}

async fn broker_metadata(State(service): State<Arc<MetadataService>>) -> Json<BrokerMetadata> {
    Json(service.broker_metadata().await)
}

/// Binds `addr` and serves the metadata endpoint until the server fails.
pub async fn start_metadata_server(
    addr: String,
    service: MetadataService,
) -> Result<(), BridgeError> {
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| BridgeError::Server(format!("can't bind {addr}: {e}")))?;
    info!("Metadata endpoint listening on http://{addr}{DEVICE_INFO_PATH}");
    serve_on(listener, service).await
}

pub async fn serve_on(listener: TcpListener, service: MetadataService) -> Result<(), BridgeError> {
    axum::serve(listener, router(service))
        .await
        .map_err(|e| BridgeError::Server(e.to_string()))
}
