mod settings;

use crate::broker::BrokerAddress;
use crate::utils::BridgeError;
use config::{Config, Environment, File};

use settings::PartialSettings;

pub use settings::{BrokerSettings, LedgerSettings, MetadataSettings, RecordSettings, Settings};

/// Prefix for environment overrides, e.g. `LEDGER_BRIDGE_BROKER__URI`.
pub const ENV_PREFIX: &str = "LEDGER_BRIDGE";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a validated `Settings` struct
pub fn load_config() -> Result<Settings, BridgeError> {
    load_config_from("config/default")
}

/// Same as [`load_config`], reading the optional file at `path` (extension
/// resolved by the `config` crate).
pub fn load_config_from(path: &str) -> Result<Settings, BridgeError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    let settings = Settings::merge(partial);
    validate(&settings)?;
    Ok(settings)
}

/// Rejects settings the bridge cannot start with.
pub fn validate(settings: &Settings) -> Result<(), BridgeError> {
    if settings.broker.qos > 2 {
        return Err(BridgeError::Config(format!(
            "broker.qos must be 0, 1 or 2 (got {})",
            settings.broker.qos
        )));
    }
    if settings.broker.client_id.is_empty() {
        return Err(BridgeError::Config("broker.client_id must not be empty".into()));
    }
    if settings.broker.channel_capacity == 0 {
        return Err(BridgeError::Config(
            "broker.channel_capacity must be at least 1".into(),
        ));
    }
    if settings.broker.keep_alive_secs < 5 {
        return Err(BridgeError::Config(format!(
            "broker.keep_alive_secs must be at least 5 (got {})",
            settings.broker.keep_alive_secs
        )));
    }
    let ledger = &settings.ledger;
    if ledger.connect_timeout_ms == 0 || ledger.read_timeout_ms == 0 {
        return Err(BridgeError::Config(
            "ledger.connect_timeout_ms and ledger.read_timeout_ms must be non-zero".into(),
        ));
    }
    // A POST holds up the broker loop, so it has to finish inside one keep-alive.
    let worst_case_ms = ledger.connect_timeout_ms.saturating_add(ledger.read_timeout_ms);
    let keep_alive_ms = settings.broker.keep_alive_secs.saturating_mul(1000);
    if worst_case_ms >= keep_alive_ms {
        return Err(BridgeError::Config(format!(
            "ledger timeouts ({worst_case_ms} ms) must stay below broker.keep_alive_secs \
             ({keep_alive_ms} ms)"
        )));
    }
    BrokerAddress::parse(&settings.broker.uri)?;
    url::Url::parse(&settings.ledger.base_url).map_err(|e| {
        BridgeError::Config(format!(
            "ledger.base_url '{}' is not a valid URL: {e}",
            settings.ledger.base_url
        ))
    })?;
    Ok(())
}
