//! Ledger record assembly
//!
//! A `LedgerRecord` is the document the ledger REST API expects for one
//! sensor reading. Its two identifiers are content addressed:
//! - `COVIDId` is `sha256(salt_address + payload_json)`
//! - `patientId.PatientId` is `sha256(topic)`
//!
//! `payload_json` is the payload re-serialized in compact form with object
//! keys sorted, so whitespace or key order differences in what a device
//! publishes do not change the id.
//!
//! The remaining fields (birth date, infection flag, travel route) come from
//! `RecordSettings`. They are placeholders; nothing enriches them per patient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::RecordSettings;
use crate::record::hasher::sha256_hex;
use crate::utils::BridgeError;

/// Rendering of the `date` field, e.g. `Thu Oct 15 14:23:00 UTC 2026`.
pub const DATE_FORMAT: &str = "%a %b %d %H:%M:%S UTC %Y";

/// The asset document posted to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    #[serde(rename = "$class")]
    pub class: String,
    #[serde(rename = "COVIDId")]
    pub record_id: String,
    pub covid: CaseDocument,
}

/// The case body nested inside a [`LedgerRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDocument {
    #[serde(rename = "$class")]
    pub class: String,
    pub patient_id: PatientRef,
    /// Topic the reading arrived on.
    pub name: String,
    pub birth_date: String,
    pub infection: String,
    pub date: String,
    pub travel_route: String,
    /// The original payload, re-serialized as compact JSON text.
    pub note: String,
}

/// Relationship to the patient participant, keyed by the topic hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRef {
    #[serde(rename = "$class")]
    pub class: String,
    #[serde(rename = "PatientId")]
    pub patient_id: String,
}

/// Builds ledger records from broker messages.
///
/// Cheap to clone; holds only the static record settings.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    settings: RecordSettings,
}

impl RecordBuilder {
    pub fn new(settings: RecordSettings) -> Self {
        Self { settings }
    }

    /// Builds a record stamped with the current wall-clock time.
    pub fn build(&self, topic: &str, payload: &[u8]) -> Result<LedgerRecord, BridgeError> {
        self.build_at(topic, payload, Utc::now())
    }

    /// Builds a record stamped with `now`.
    ///
    /// Fails with [`BridgeError::Parse`] if `payload` is not UTF-8 JSON.
    pub fn build_at(
        &self,
        topic: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<LedgerRecord, BridgeError> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| BridgeError::Parse(format!("payload is not UTF-8: {e}")))?;
        let parsed: Value =
            serde_json::from_str(text).map_err(|e| BridgeError::Parse(e.to_string()))?;
        let note = parsed.to_string();

        let ns = &self.settings.namespace;
        Ok(LedgerRecord {
            class: format!("{ns}.COVIDAsset"),
            record_id: self.record_id(&note),
            covid: CaseDocument {
                class: format!("{ns}.COVID"),
                patient_id: PatientRef {
                    class: format!("{ns}.Patients"),
                    patient_id: sha256_hex(topic),
                },
                name: topic.to_string(),
                birth_date: self.settings.birth_date.clone(),
                infection: self.settings.infection.clone(),
                date: now.format(DATE_FORMAT).to_string(),
                travel_route: self.settings.travel_route.clone(),
                note,
            },
        })
    }

    fn record_id(&self, payload_json: &str) -> String {
        let salt = &self.settings.salt_address;
        let mut salted = String::with_capacity(salt.len() + payload_json.len());
        salted.push_str(salt);
        salted.push_str(payload_json);
        sha256_hex(salted)
    }
}
