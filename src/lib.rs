//! Library root for the `compliance_ledger` crate

// Core error handling
pub mod errors;

// Records, classification and integrity
pub mod classifier;
pub mod integrity;
pub mod record;

// Ledger adapters
pub mod ledger;
pub mod ledger_sled;

// Access control and credentials
pub mod policy;

// Ingest and read-side analytics
pub mod aggregation;
pub mod pipeline;

// Configuration & CLI
pub mod cli;
pub mod config;
pub mod simulate;

// Web server interface
pub mod api;
pub mod api_errors;
pub mod app_state;
pub mod security;
pub mod web;

#[cfg(test)]
mod tests {
    pub mod ledger_sled_test;
    pub mod pipeline_test;
}

pub use classifier::{Classification, Classifier, Framework, ValidationStatus};
pub use errors::{ComplianceError, ComplianceResult};
pub use ledger::LedgerGateway;
pub use record::{IngestRequest, LogRecord};
