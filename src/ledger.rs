//! Append-only ledger contract.
//!
//! The ledger is an external collaborator; the crate only relies on the four
//! operations below. `getAll` returns records in append order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::{ComplianceError, ComplianceResult};
use crate::record::LogRecord;

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn append(&self, record: &LogRecord) -> ComplianceResult<()>;

    async fn get_all(&self) -> ComplianceResult<Vec<LogRecord>>;

    async fn get_by_id(&self, id: &str) -> ComplianceResult<LogRecord>;

    async fn delete(&self, id: &str) -> ComplianceResult<()>;

    /// Records whose user matches case-insensitively, in append order.
    async fn query_by_user(&self, user: &str) -> ComplianceResult<Vec<LogRecord>> {
        let all = self.get_all().await?;
        Ok(all
            .into_iter()
            .filter(|r| r.user.eq_ignore_ascii_case(user))
            .collect())
    }
}

/// In-process ledger used for tests and the `memory` backend.
#[derive(Default)]
pub struct MemoryLedger {
    records: RwLock<Vec<LogRecord>>,
    offline: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a lost connection: every call fails with a connectivity error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Overwrite a stored record in place, bypassing the append-only contract.
    /// Only useful for exercising tamper detection.
    pub async fn tamper<F: FnOnce(&mut LogRecord)>(&self, id: &str, edit: F) -> bool {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.log_id == id) {
            Some(record) => {
                edit(record);
                true
            }
            None => false,
        }
    }

    fn ensure_online(&self, operation: &str) -> ComplianceResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ComplianceError::connectivity(operation, "ledger offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerGateway for MemoryLedger {
    async fn append(&self, record: &LogRecord) -> ComplianceResult<()> {
        self.ensure_online("append")?;
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.log_id == record.log_id) {
            return Err(ComplianceError::validation(
                "logID",
                format!("log with ID {} already exists", record.log_id),
            ));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn get_all(&self) -> ComplianceResult<Vec<LogRecord>> {
        self.ensure_online("get_all")?;
        Ok(self.records.read().await.clone())
    }

    async fn get_by_id(&self, id: &str) -> ComplianceResult<LogRecord> {
        self.ensure_online("get_by_id")?;
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.log_id == id)
            .cloned()
            .ok_or_else(|| ComplianceError::not_found("log", id))
    }

    async fn delete(&self, id: &str) -> ComplianceResult<()> {
        self.ensure_online("delete")?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.log_id != id);
        if records.len() == before {
            return Err(ComplianceError::not_found("log", id));
        }
        Ok(())
    }
}

/// Bounds every call of the wrapped ledger with a timeout.
pub struct TimedLedger {
    inner: Arc<dyn LedgerGateway>,
    limit: Duration,
}

impl TimedLedger {
    pub fn new(inner: Arc<dyn LedgerGateway>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> ComplianceResult<T>
    where
        F: std::future::Future<Output = ComplianceResult<T>>,
    {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ComplianceError::timeout(
                operation,
                self.limit.as_millis() as u64,
            )),
        }
    }
}

#[async_trait]
impl LedgerGateway for TimedLedger {
    async fn append(&self, record: &LogRecord) -> ComplianceResult<()> {
        self.bounded("append", self.inner.append(record)).await
    }

    async fn get_all(&self) -> ComplianceResult<Vec<LogRecord>> {
        self.bounded("get_all", self.inner.get_all()).await
    }

    async fn get_by_id(&self, id: &str) -> ComplianceResult<LogRecord> {
        self.bounded("get_by_id", self.inner.get_by_id(id)).await
    }

    async fn delete(&self, id: &str) -> ComplianceResult<()> {
        self.bounded("delete", self.inner.delete(id)).await
    }
}
