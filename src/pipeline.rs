//! Ingest flow: access check, validation, classification, hashing, append.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::errors::{ComplianceError, ComplianceResult};
use crate::ledger::LedgerGateway;
use crate::policy::{authorize, Claims, Operation};
use crate::record::{IngestRequest, LogRecord};

pub struct IngestPipeline {
    classifier: Arc<Classifier>,
    ledger: Arc<dyn LedgerGateway>,
}

impl IngestPipeline {
    pub fn new(classifier: Arc<Classifier>, ledger: Arc<dyn LedgerGateway>) -> Self {
        Self { classifier, ledger }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Authorize, validate, classify, hash and append one event.
    ///
    /// Every append failure comes back as a ledger failure, including a
    /// rejection the ledger phrases as a validation error.
    pub async fn ingest(&self, claims: &Claims, request: IngestRequest) -> ComplianceResult<LogRecord> {
        authorize(claims, Operation::Ingest)?;
        let record = self.prepare(request)?;
        self.commit(&claims.sub, &record).await?;
        Ok(record)
    }

    fn prepare(&self, request: IngestRequest) -> ComplianceResult<LogRecord> {
        request.validate()?;
        let classification = self.classifier.classify(&request.message);
        let log_id = Uuid::new_v4().to_string();
        Ok(LogRecord::assemble(request, log_id, Utc::now(), classification))
    }

    async fn commit(&self, submitted_by: &str, record: &LogRecord) -> ComplianceResult<()> {
        if let Err(e) = self.ledger.append(record).await {
            tracing::error!("Ingest Error: {e}");
            return Err(if e.is_ledger_failure() {
                e
            } else {
                ComplianceError::internal(format!("append of {} rejected: {e}", record.log_id))
            });
        }
        tracing::info!(
            log_id = %record.log_id,
            source = %record.source,
            framework = %record.framework,
            risk_score = record.risk_score,
            "Ingested log submitted by {}",
            submitted_by
        );
        Ok(())
    }
}
