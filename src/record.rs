//! The log record stored on the ledger and the request that produces it.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::classifier::{Classification, Framework, ValidationStatus};
use crate::errors::{ComplianceError, ComplianceResult};
use crate::integrity;

pub const DEFAULT_ACCESS_ROLE: &str = "user";

/// A classified, hashed audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(rename = "logID")]
    pub log_id: String,
    pub message: String,
    #[serde(with = "millis_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub access_role: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub severity: String,
    pub framework: Framework,
    pub risk_score: u8,
    /// Always set by the classifier; other producers may omit it.
    #[serde(default)]
    pub validated: Option<ValidationStatus>,
    pub hash: String,
}

impl LogRecord {
    /// Assemble a record from an accepted request and its derived fields.
    /// The hash is computed here and never taken from the caller.
    pub fn assemble(
        request: IngestRequest,
        log_id: String,
        timestamp: DateTime<Utc>,
        classification: Classification,
    ) -> Self {
        let timestamp = truncate_to_millis(timestamp);
        let hash = integrity::compute_hash(&log_id, &request.message, &request.user, &timestamp);
        Self {
            log_id,
            message: request.message,
            timestamp,
            user: request.user,
            access_role: request
                .access_role
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_ACCESS_ROLE.to_string()),
            source: request.source,
            severity: request.severity,
            framework: classification.framework,
            risk_score: classification.risk_score,
            validated: Some(classification.validated),
            hash,
        }
    }
}

/// Body of an ingest call. Derived fields are deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub user: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub severity: String,
    #[serde(default)]
    pub access_role: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source: String,
}

/// An explicit `null` counts as an absent field.
fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

impl IngestRequest {
    /// Reject requests missing any of message, user, severity or source.
    pub fn validate(&self) -> ComplianceResult<()> {
        let required = [
            ("message", &self.message),
            ("user", &self.user),
            ("severity", &self.severity),
            ("source", &self.source),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| *name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ComplianceError::validation(
                missing.join(","),
                "Missing required fields",
            ))
        }
    }
}

/// Ledger timestamps keep millisecond precision.
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or(ts)
}

/// Canonical text form of a timestamp, e.g. `2025-01-02T03:04:05.678Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod millis_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
