//! Local append-only ledger on sled.
//!
//! Entries live in the `entries` tree keyed by a big-endian sequence number,
//! so iteration yields append order. The `index` tree maps a logID to its
//! sequence key. The database handle is opened once and shared by every call.

use std::path::Path;

use async_trait::async_trait;
use sled::{Db, Tree};

use crate::errors::{ComplianceError, ComplianceResult};
use crate::ledger::LedgerGateway;
use crate::record::LogRecord;

pub const ENTRIES_TREE: &str = "entries";
pub const INDEX_TREE: &str = "index";

#[derive(Clone)]
pub struct SledLedger {
    db: Db,
    entries: Tree,
    index: Tree,
}

impl SledLedger {
    pub fn open<P: AsRef<Path>>(path: P) -> ComplianceResult<Self> {
        let path = path.as_ref();
        let db = sled::open(path)
            .map_err(|e| ComplianceError::database(format!("open {}", path.display()), e))?;
        tracing::info!("Opened sled ledger at {}", path.display());
        Self::from_db(db)
    }

    /// Use an already opened database; the ledger trees are created if missing.
    pub fn from_db(db: Db) -> ComplianceResult<Self> {
        let entries = db.open_tree(ENTRIES_TREE)?;
        let index = db.open_tree(INDEX_TREE)?;
        Ok(Self { db, entries, index })
    }

    fn serialize(record: &LogRecord) -> ComplianceResult<Vec<u8>> {
        serde_json::to_vec(record).map_err(|e| ComplianceError::serialization("encode record", e))
    }

    fn deserialize(bytes: &[u8]) -> ComplianceResult<LogRecord> {
        serde_json::from_slice(bytes).map_err(|e| ComplianceError::serialization("decode record", e))
    }

    fn append_blocking(&self, record: &LogRecord) -> ComplianceResult<()> {
        let seq = self.db.generate_id()?.to_be_bytes();
        let claimed = self.index.compare_and_swap(
            record.log_id.as_bytes(),
            None as Option<&[u8]>,
            Some(&seq[..]),
        )?;
        if claimed.is_err() {
            return Err(ComplianceError::validation(
                "logID",
                format!("log with ID {} already exists", record.log_id),
            ));
        }
        self.entries.insert(seq, Self::serialize(record)?)?;
        self.db.flush()?;
        Ok(())
    }

    /// Entries that no longer decode are logged and left out of the scan.
    fn get_all_blocking(&self) -> ComplianceResult<Vec<LogRecord>> {
        let mut records = Vec::new();
        for entry in self.entries.iter() {
            let (key, value) = entry?;
            match Self::deserialize(&value) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping undecodable ledger entry {:?}: {e}", key.as_ref()),
            }
        }
        Ok(records)
    }

    fn get_by_id_blocking(&self, id: &str) -> ComplianceResult<LogRecord> {
        let seq = self
            .index
            .get(id.as_bytes())?
            .ok_or_else(|| ComplianceError::not_found("log", id))?;
        let bytes = self
            .entries
            .get(&seq)?
            .ok_or_else(|| ComplianceError::internal(format!("index points to missing entry for {id}")))?;
        Self::deserialize(&bytes)
    }

    fn delete_blocking(&self, id: &str) -> ComplianceResult<()> {
        let seq = self
            .index
            .remove(id.as_bytes())?
            .ok_or_else(|| ComplianceError::not_found("log", id))?;
        self.entries.remove(&seq)?;
        self.db.flush()?;
        Ok(())
    }

    async fn run_blocking<T, F>(&self, operation: &'static str, f: F) -> ComplianceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(SledLedger) -> ComplianceResult<T> + Send + 'static,
    {
        let ledger = self.clone();
        tokio::task::spawn_blocking(move || f(ledger))
            .await
            .map_err(|e| ComplianceError::internal(format!("{operation} task failed: {e}")))?
    }
}

#[async_trait]
impl LedgerGateway for SledLedger {
    async fn append(&self, record: &LogRecord) -> ComplianceResult<()> {
        let record = record.clone();
        self.run_blocking("append", move |l| l.append_blocking(&record))
            .await
    }

    async fn get_all(&self) -> ComplianceResult<Vec<LogRecord>> {
        self.run_blocking("get_all", |l| l.get_all_blocking()).await
    }

    async fn get_by_id(&self, id: &str) -> ComplianceResult<LogRecord> {
        let id = id.to_string();
        self.run_blocking("get_by_id", move |l| l.get_by_id_blocking(&id))
            .await
    }

    async fn delete(&self, id: &str) -> ComplianceResult<()> {
        let id = id.to_string();
        self.run_blocking("delete", move |l| l.delete_blocking(&id))
            .await
    }
}
