use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Built once at startup and never mutated afterwards. Each component gets
/// the section it needs passed in at construction.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub ledger: LedgerSettings,
    pub record: RecordSettings,
    pub metadata: MetadataSettings,
    pub log_level: String,
}

/// Configuration for the MQTT broker connection.
///
/// `username` and `password` are only sent when both are present.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub uri: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic: String,
    pub qos: u8,
    pub keep_alive_secs: u64,
    pub channel_capacity: usize,
}

/// Configuration for the ledger API the records are posted to.
#[derive(Debug, Deserialize, Clone)]
pub struct LedgerSettings {
    pub base_url: String,
    pub asset_type: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl LedgerSettings {
    /// `POST` target for records: `<base_url>/api/<asset_type>`.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/api/{}",
            self.base_url.trim_end_matches('/'),
            self.asset_type
        )
    }
}

/// Static values stamped into every ledger record.
///
/// These are demo placeholders; there is no enrichment source behind them.
#[derive(Debug, Deserialize, Clone)]
pub struct RecordSettings {
    pub namespace: String,
    pub salt_address: String,
    pub birth_date: String,
    pub infection: String,
    pub travel_route: String,
}

/// Configuration for the broker metadata HTTP endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct MetadataSettings {
    pub host: String,
    pub port: u16,
    pub lookup_url: String,
    pub scheme: String,
    pub mqtt_port: u16,
    pub timeout_ms: u64,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub ledger: Option<PartialLedgerSettings>,
    pub record: Option<PartialRecordSettings>,
    pub metadata: Option<PartialMetadataSettings>,
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub uri: Option<String>,
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic: Option<String>,
    pub qos: Option<u8>,
    pub keep_alive_secs: Option<u64>,
    pub channel_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLedgerSettings {
    pub base_url: Option<String>,
    pub asset_type: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialRecordSettings {
    pub namespace: Option<String>,
    pub salt_address: Option<String>,
    pub birth_date: Option<String>,
    pub infection: Option<String>,
    pub travel_route: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialMetadataSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub lookup_url: Option<String>,
    pub scheme: Option<String>,
    pub mqtt_port: Option<u16>,
    pub timeout_ms: Option<u64>,
}

const SEOUL_CITY_HALL: &str = "110, Sejong-daero, Jung-gu, Seoul, Republic of Korea";

/// Provides default values for `Settings`.
///
/// These match the sample deployment: a local broker, a local ledger REST
/// server, and the EC2 instance metadata service.
impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings {
                uri: "tcp://127.0.0.1:1883".to_string(),
                client_id: "MQTT_REST_Translator_01".to_string(),
                username: None,
                password: None,
                topic: "#".to_string(),
                qos: 1,
                keep_alive_secs: 30,
                channel_capacity: 10,
            },
            ledger: LedgerSettings {
                base_url: "http://127.0.0.1:5000".to_string(),
                asset_type: "org.oslab.ac.kr.COVIDAsset".to_string(),
                connect_timeout_ms: 5000,
                read_timeout_ms: 5000,
            },
            record: RecordSettings {
                namespace: "org.oslab.ac.kr".to_string(),
                salt_address: SEOUL_CITY_HALL.to_string(),
                birth_date: "1988.01.29".to_string(),
                infection: "Y".to_string(),
                travel_route: SEOUL_CITY_HALL.to_string(),
            },
            metadata: MetadataSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
                lookup_url: "http://169.254.169.254/latest/meta-data/public-hostname"
                    .to_string(),
                scheme: "tcp".to_string(),
                mqtt_port: 1883,
                timeout_ms: 5000,
            },
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Fills every field missing from `partial` with its default.
    pub fn merge(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let broker = partial.broker.unwrap_or_default();
        let ledger = partial.ledger.unwrap_or_default();
        let record = partial.record.unwrap_or_default();
        let metadata = partial.metadata.unwrap_or_default();

        Settings {
            broker: BrokerSettings {
                uri: broker.uri.unwrap_or(default.broker.uri),
                client_id: broker.client_id.unwrap_or(default.broker.client_id),
                username: broker.username.or(default.broker.username),
                password: broker.password.or(default.broker.password),
                topic: broker.topic.unwrap_or(default.broker.topic),
                qos: broker.qos.unwrap_or(default.broker.qos),
                keep_alive_secs: broker
                    .keep_alive_secs
                    .unwrap_or(default.broker.keep_alive_secs),
                channel_capacity: broker
                    .channel_capacity
                    .unwrap_or(default.broker.channel_capacity),
            },
            ledger: LedgerSettings {
                base_url: ledger.base_url.unwrap_or(default.ledger.base_url),
                asset_type: ledger.asset_type.unwrap_or(default.ledger.asset_type),
                connect_timeout_ms: ledger
                    .connect_timeout_ms
                    .unwrap_or(default.ledger.connect_timeout_ms),
                read_timeout_ms: ledger
                    .read_timeout_ms
                    .unwrap_or(default.ledger.read_timeout_ms),
            },
            record: RecordSettings {
                namespace: record.namespace.unwrap_or(default.record.namespace),
                salt_address: record.salt_address.unwrap_or(default.record.salt_address),
                birth_date: record.birth_date.unwrap_or(default.record.birth_date),
                infection: record.infection.unwrap_or(default.record.infection),
                travel_route: record.travel_route.unwrap_or(default.record.travel_route),
            },
            metadata: MetadataSettings {
                host: metadata.host.unwrap_or(default.metadata.host),
                port: metadata.port.unwrap_or(default.metadata.port),
                lookup_url: metadata.lookup_url.unwrap_or(default.metadata.lookup_url),
                scheme: metadata.scheme.unwrap_or(default.metadata.scheme),
                mqtt_port: metadata.mqtt_port.unwrap_or(default.metadata.mqtt_port),
                timeout_ms: metadata.timeout_ms.unwrap_or(default.metadata.timeout_ms),
            },
            log_level: partial.log_level.unwrap_or(default.log_level),
        }
    }
}
