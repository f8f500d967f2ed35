//! Tamper-evidence digest over a record's identity fields.
//!
//! The digest is SHA-256 over `logID + message + user + timestamp`, in that
//! order, rendered as lowercase hex.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::record::{format_timestamp, LogRecord};

pub fn compute_hash(log_id: &str, message: &str, user: &str, timestamp: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(log_id.as_bytes());
    hasher.update(message.as_bytes());
    hasher.update(user.as_bytes());
    hasher.update(format_timestamp(timestamp).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Recompute the digest of a stored record.
pub fn recompute(record: &LogRecord) -> String {
    compute_hash(&record.log_id, &record.message, &record.user, &record.timestamp)
}

/// True when the stored hash matches the record's identity fields.
pub fn verify(record: &LogRecord) -> bool {
    recompute(record).eq_ignore_ascii_case(&record.hash)
}
