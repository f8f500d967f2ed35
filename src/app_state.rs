use std::sync::Arc;
use std::time::Duration;

use crate::aggregation::AggregationConfig;
use crate::classifier::Classifier;
use crate::config::{ApiConfig, ComplianceConfig, LedgerBackend};
use crate::errors::ComplianceResult;
use crate::ledger::{LedgerGateway, MemoryLedger, TimedLedger};
use crate::ledger_sled::SledLedger;
use crate::pipeline::IngestPipeline;
use crate::policy::{CredentialStore, StaticCredentialStore, TokenIssuer};

/// Shared, immutable state handed to every request handler.
pub struct AppState {
    pub ledger: Arc<dyn LedgerGateway>,
    pub pipeline: IngestPipeline,
    pub tokens: TokenIssuer,
    pub credentials: Arc<dyn CredentialStore>,
    pub aggregation: AggregationConfig,
    pub api: ApiConfig,
}

impl AppState {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        classifier: Arc<Classifier>,
        tokens: TokenIssuer,
        credentials: Arc<dyn CredentialStore>,
        aggregation: AggregationConfig,
        api: ApiConfig,
    ) -> Self {
        let pipeline = IngestPipeline::new(classifier, ledger.clone());
        Self {
            ledger,
            pipeline,
            tokens,
            credentials,
            aggregation,
            api,
        }
    }

    /// Wire up the configured ledger backend, rule table and user list.
    pub fn from_config(config: &ComplianceConfig) -> ComplianceResult<Self> {
        let backend: Arc<dyn LedgerGateway> = match config.ledger.backend {
            LedgerBackend::Sled => Arc::new(SledLedger::open(&config.ledger.path)?),
            LedgerBackend::Memory => {
                tracing::warn!("Using in-memory ledger; records are lost on restart");
                Arc::new(MemoryLedger::new())
            }
        };
        let ledger: Arc<dyn LedgerGateway> = Arc::new(TimedLedger::new(
            backend,
            Duration::from_millis(config.ledger.timeout_ms),
        ));

        let classifier = match &config.classifier.rules_path {
            Some(path) => Classifier::from_file(path)?,
            None => Classifier::default(),
        };

        let tokens = TokenIssuer::new(&config.auth.jwt_secret)?;
        let credentials = Arc::new(StaticCredentialStore::new(&config.auth.users));
        if config.auth.users.is_empty() {
            tracing::warn!("No users configured; every login will be rejected");
        }

        Ok(Self::new(
            ledger,
            Arc::new(classifier),
            tokens,
            credentials,
            config.aggregation.clone(),
            config.api.clone(),
        ))
    }
}
