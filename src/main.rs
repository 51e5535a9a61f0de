//! CLI for ledger-bridge
//!
//! Subcommands:
//! - `bridge`: forward every MQTT message to the ledger API
//! - `metadata`: serve the broker metadata endpoint
//! - `serve`: both of the above in one process
//! - `publish`: send a single message to the broker (useful for smoke tests)

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ledger_bridge::broker::{BrokerAdapter, ConnectionState, Dispatcher};
use ledger_bridge::config::{Settings, load_config};
use ledger_bridge::transport::{MetadataService, start_metadata_server};
use ledger_bridge::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ledger-bridge", version)]
struct Cli {
    /// Overrides the configured log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Subscribe to the broker and forward every message to the ledger
    Bridge,
    /// Start the broker metadata HTTP endpoint
    Metadata,
    /// Run the bridge and the metadata endpoint together
    Serve,
    /// Publish one message to the configured broker and exit
    Publish {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        payload: String,
        #[arg(long, default_value_t = 1)]
        qos: u8,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init(cli.log_level.as_deref().unwrap_or("info"));
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(level) = cli.log_level {
        settings.log_level = level;
    }
    logging::init(&settings.log_level);

    let result = match cli.command {
        Command::Bridge => run_bridge(settings).await,
        Command::Metadata => run_metadata(settings).await,
        Command::Serve => {
            tokio::select! {
                res = run_bridge(settings.clone()) => res,
                res = run_metadata(settings) => res,
            }
        }
        Command::Publish {
            topic,
            payload,
            qos,
        } => run_publish(settings, &topic, payload, qos).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_bridge(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = Dispatcher::new(&settings)?;
    info!("Forwarding records to {}", dispatcher.endpoint());
    let (tx, worker) = dispatcher.spawn();

    let mut adapter = BrokerAdapter::connect(&settings.broker).await?;
    adapter
        .subscribe(&settings.broker.topic, settings.broker.qos)
        .await?;

    let outcome = tokio::select! {
        res = adapter.run(tx) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            Ok(())
        }
    };

    if adapter.state() == ConnectionState::Connected {
        adapter.disconnect().await?;
    }
    // let the in-flight record finish
    if let Err(e) = worker.await {
        error!("Dispatch worker failed: {e}");
    }

    outcome?;
    Ok(())
}

async fn run_metadata(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", settings.metadata.host, settings.metadata.port);
    let service = MetadataService::new(&settings.metadata)?;

    tokio::select! {
        res = start_metadata_server(addr, service) => {
            res?;
            error!("Metadata server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }
    Ok(())
}

async fn run_publish(
    mut settings: Settings,
    topic: &str,
    payload: String,
    qos: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    settings.broker.client_id = format!("{}-pub-{}", settings.broker.client_id, &suffix[..8]);

    let mut adapter = BrokerAdapter::connect(&settings.broker).await?;
    adapter.publish(topic, payload.into_bytes(), qos).await?;
    info!("Published to '{topic}' at QoS {qos}");
    adapter.disconnect().await?;
    Ok(())
}
