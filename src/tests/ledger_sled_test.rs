use chrono::{TimeZone, Utc};
use tempfile::tempdir;

use crate::classifier::Classifier;
use crate::errors::ComplianceError;
use crate::integrity;
use crate::ledger::LedgerGateway;
use crate::ledger_sled::{SledLedger, ENTRIES_TREE};
use crate::record::{IngestRequest, LogRecord};

fn record(id: &str, message: &str, user: &str) -> LogRecord {
    let request = IngestRequest {
        message: message.to_string(),
        user: user.to_string(),
        severity: "high".to_string(),
        access_role: None,
        source: "SIEM".to_string(),
    };
    let classification = Classifier::default().classify(message);
    let ts = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    LogRecord::assemble(request, id.to_string(), ts, classification)
}

#[tokio::test]
async fn get_all_returns_append_order() {
    let dir = tempdir().expect("failed to create temp dir");
    let ledger = SledLedger::open(dir.path()).expect("open failed");

    for (id, msg) in [("c", "Firewall disabled"), ("a", "Credit card leaked"), ("b", "hello")] {
        ledger.append(&record(id, msg, "alice")).await.unwrap();
    }

    let ids: Vec<String> = ledger
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.log_id)
        .collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[tokio::test]
async fn duplicate_log_id_is_rejected() {
    let dir = tempdir().expect("failed to create temp dir");
    let ledger = SledLedger::open(dir.path()).unwrap();

    ledger.append(&record("dup", "first", "alice")).await.unwrap();
    let err = ledger
        .append(&record("dup", "second", "bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, ComplianceError::Validation { .. }));

    let all = ledger.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].message, "first");
}

#[tokio::test]
async fn missing_ids_are_not_found() {
    let dir = tempdir().expect("failed to create temp dir");
    let ledger = SledLedger::open(dir.path()).unwrap();

    assert!(matches!(
        ledger.get_by_id("nope").await,
        Err(ComplianceError::NotFound { .. })
    ));
    assert!(matches!(
        ledger.delete("nope").await,
        Err(ComplianceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn delete_removes_record_and_index() {
    let dir = tempdir().expect("failed to create temp dir");
    let ledger = SledLedger::open(dir.path()).unwrap();

    ledger.append(&record("keep", "a", "alice")).await.unwrap();
    ledger.append(&record("drop", "b", "bob")).await.unwrap();
    ledger.delete("drop").await.unwrap();

    assert!(ledger.get_by_id("drop").await.is_err());
    let ids: Vec<String> = ledger
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.log_id)
        .collect();
    assert_eq!(ids, vec!["keep"]);

    // A deleted ID may be appended again.
    ledger.append(&record("drop", "c", "bob")).await.unwrap();
    assert_eq!(ledger.get_by_id("drop").await.unwrap().message, "c");
}

#[tokio::test]
async fn records_survive_reopen_with_valid_hashes() {
    let dir = tempdir().expect("failed to create temp dir");
    let stored = record("persist", "Unauthorized access to PII detected", "carol");
    {
        let ledger = SledLedger::open(dir.path()).unwrap();
        ledger.append(&stored).await.unwrap();
    }

    let reopened = SledLedger::open(dir.path()).unwrap();
    let loaded = reopened.get_by_id("persist").await.unwrap();
    assert_eq!(loaded, stored);
    assert!(integrity::verify(&loaded));
}

#[tokio::test]
async fn query_by_user_uses_sled_scan() {
    let dir = tempdir().expect("failed to create temp dir");
    let ledger = SledLedger::open(dir.path()).unwrap();
    ledger.append(&record("1", "a", "Alice")).await.unwrap();
    ledger.append(&record("2", "b", "bob")).await.unwrap();
    ledger.append(&record("3", "c", "alice")).await.unwrap();

    let ids: Vec<String> = ledger
        .query_by_user("ALICE")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.log_id)
        .collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn undecodable_entries_are_skipped_by_scans() {
    let dir = tempdir().expect("failed to create temp dir");
    let db = sled::open(dir.path()).unwrap();
    let entries = db.open_tree(ENTRIES_TREE).unwrap();
    let seq = db.generate_id().unwrap().to_be_bytes();
    entries
        .insert(seq, br#"{"logID":"bad","riskScore":400}"#.to_vec())
        .unwrap();

    let ledger = SledLedger::from_db(db).unwrap();
    ledger.append(&record("good", "Firewall disabled", "bob")).await.unwrap();

    let ids: Vec<String> = ledger
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.log_id)
        .collect();
    assert_eq!(ids, vec!["good"]);
}
