use std::sync::Arc;

use async_trait::async_trait;

use crate::classifier::{Classifier, Framework, ValidationStatus};
use crate::errors::{ComplianceError, ComplianceResult};
use crate::integrity;
use crate::ledger::{LedgerGateway, MemoryLedger};
use crate::pipeline::IngestPipeline;
use crate::policy::{Claims, Role};
use crate::record::{IngestRequest, LogRecord};

fn claims(role: Role) -> Claims {
    Claims {
        sub: format!("{role}-user"),
        role,
        iat: 0,
        exp: i64::MAX,
    }
}

fn request(message: &str) -> IngestRequest {
    IngestRequest {
        message: message.to_string(),
        user: "alice".to_string(),
        severity: "high".to_string(),
        access_role: None,
        source: "SIEM".to_string(),
    }
}

fn pipeline() -> (IngestPipeline, Arc<MemoryLedger>) {
    let ledger = Arc::new(MemoryLedger::new());
    let pipeline = IngestPipeline::new(Arc::new(Classifier::default()), ledger.clone());
    (pipeline, ledger)
}

#[tokio::test]
async fn collector_ingest_classifies_hashes_and_appends() {
    let (pipeline, ledger) = pipeline();

    let record = pipeline
        .ingest(
            &claims(Role::Collector),
            request("Unauthorized access to PII detected"),
        )
        .await
        .unwrap();

    assert_eq!(record.framework, Framework::Gdpr);
    assert_eq!(record.risk_score, 85);
    assert_eq!(record.validated, Some(ValidationStatus::NeedsReview));
    assert_eq!(record.access_role, "user");
    assert_eq!(record.hash.len(), 64);
    assert!(integrity::verify(&record));
    assert!(uuid::Uuid::parse_str(&record.log_id).is_ok());

    let stored = ledger.get_by_id(&record.log_id).await.unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn admin_may_ingest_too() {
    let (pipeline, ledger) = pipeline();
    let record = pipeline
        .ingest(&claims(Role::Admin), request("Firewall disabled"))
        .await
        .unwrap();
    assert_eq!(record.framework, Framework::NistCsf);
    assert_eq!(ledger.get_all().await.unwrap(), vec![record]);
}

#[tokio::test]
async fn incomplete_request_never_reaches_the_ledger() {
    let (pipeline, ledger) = pipeline();
    let mut req = request("Firewall disabled");
    req.source.clear();

    let err = pipeline
        .ingest(&claims(Role::Collector), req)
        .await
        .unwrap_err();
    match err {
        ComplianceError::Validation { field, .. } => assert_eq!(field, "source"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(ledger.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn offline_ledger_is_a_ledger_failure() {
    let (pipeline, ledger) = pipeline();
    ledger.set_offline(true);

    let err = pipeline
        .ingest(&claims(Role::Collector), request("Credit card leaked"))
        .await
        .unwrap_err();
    assert!(err.is_ledger_failure());
}

/// Ledger that refuses every append as if the ID were already taken.
struct DuplicateLedger;

#[async_trait]
impl LedgerGateway for DuplicateLedger {
    async fn append(&self, record: &LogRecord) -> ComplianceResult<()> {
        Err(ComplianceError::validation(
            "logID",
            format!("log with ID {} already exists", record.log_id),
        ))
    }
    async fn get_all(&self) -> ComplianceResult<Vec<LogRecord>> {
        Ok(Vec::new())
    }
    async fn get_by_id(&self, id: &str) -> ComplianceResult<LogRecord> {
        Err(ComplianceError::not_found("log", id))
    }
    async fn delete(&self, id: &str) -> ComplianceResult<()> {
        Err(ComplianceError::not_found("log", id))
    }
}

#[tokio::test]
async fn ledger_rejection_is_not_reported_as_bad_input() {
    let pipeline = IngestPipeline::new(Arc::new(Classifier::default()), Arc::new(DuplicateLedger));
    let err = pipeline
        .ingest(&claims(Role::Collector), request("Firewall disabled"))
        .await
        .unwrap_err();
    assert!(matches!(err, ComplianceError::Internal { .. }));
    assert!(err.is_ledger_failure());
}

#[tokio::test]
async fn each_ingest_gets_a_fresh_id() {
    let (pipeline, ledger) = pipeline();
    let collector = claims(Role::Collector);
    let a = pipeline.ingest(&collector, request("same")).await.unwrap();
    let b = pipeline.ingest(&collector, request("same")).await.unwrap();
    assert_ne!(a.log_id, b.log_id);
    assert_eq!(ledger.get_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn supplied_access_role_is_kept() {
    let (pipeline, _) = pipeline();
    let mut req = request("hello");
    req.access_role = Some("auditor".to_string());
    let record = pipeline.ingest(&claims(Role::Collector), req).await.unwrap();
    assert_eq!(record.access_role, "auditor");
    assert_eq!(record.framework, Framework::Unknown);
    assert_eq!(pipeline.classifier().rules().len(), 15);
}
