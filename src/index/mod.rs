//! Persistent signature index backed by SQLite.
//!
//! [`IndexStore`] is a cloneable async handle around one mutex-guarded
//! connection. Each method runs its SQL on the blocking pool; the synchronous
//! functions in the submodules take a plain [`Connection`] and are what the
//! handle delegates to.

pub mod forget;
pub mod query;
pub mod stats;
pub mod store;

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use rusqlite::Connection;

use crate::db::{self, HealthReport};
use crate::error::StoreError;
use crate::signature::{CategoryTag, Signature};

pub use stats::IndexStats;
pub use store::LogOutcome;

/// Upper bound on rows a single range query may return.
pub const DEFAULT_MAX_CANDIDATES: usize = 500;

#[derive(Clone)]
pub struct IndexStore {
    db: Arc<Mutex<Connection>>,
    max_candidates: usize,
}

impl IndexStore {
    /// Open (or create) the index database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    /// Fresh in-memory index, used by tests and one-off runs.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(db::open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Insert or overwrite. `Ok(true)` means a new row.
    pub async fn upsert(&self, source_url: &str, signature: &Signature) -> Result<bool, StoreError> {
        let url = source_url.to_string();
        let signature = signature.clone();
        self.with_conn(move |conn| store::upsert_signature(conn, &url, &signature))
            .await
    }

    pub async fn exists(&self, source_url: &str) -> Result<bool, StoreError> {
        let url = source_url.to_string();
        self.with_conn(move |conn| query::exists(conn, &url)).await
    }

    pub async fn get(&self, source_url: &str) -> Result<Option<Signature>, StoreError> {
        let url = source_url.to_string();
        self.with_conn(move |conn| query::get(conn, &url)).await
    }

    /// Frequency-band prefilter. `limit` is capped at the store's candidate bound.
    pub async fn range_query(
        &self,
        min_freq: f64,
        max_freq: f64,
        category: Option<CategoryTag>,
        limit: usize,
    ) -> Result<Vec<(String, Signature)>, StoreError> {
        let limit = limit.min(self.max_candidates);
        self.with_conn(move |conn| query::range_query(conn, min_freq, max_freq, category, limit))
            .await
    }

    /// Bounded full-index read, used when the prefilter comes back empty.
    pub async fn scan(&self, limit: usize) -> Result<Vec<(String, Signature)>, StoreError> {
        self.with_conn(move |conn| query::scan(conn, limit)).await
    }

    pub async fn stats(&self) -> Result<IndexStats, StoreError> {
        self.with_conn(|conn| stats::index_stats(conn)).await
    }

    pub async fn delete(&self, source_url: &str) -> Result<bool, StoreError> {
        let url = source_url.to_string();
        self.with_conn(move |conn| forget::delete_source(conn, &url))
            .await
    }

    pub async fn record_access(&self, urls: Vec<String>) -> Result<(), StoreError> {
        self.with_conn(move |conn| store::record_access(conn, &urls))
            .await
    }

    pub async fn log_outcome(
        &self,
        source_url: &str,
        outcome: LogOutcome,
        details: Option<serde_json::Value>,
    ) -> Result<(), StoreError> {
        let url = source_url.to_string();
        self.with_conn(move |conn| store::write_ingest_log(conn, &url, outcome, details.as_ref()))
            .await
    }

    pub async fn health(&self) -> Result<HealthReport, StoreError> {
        self.with_conn(|conn| Ok(db::check_database_health(conn)?))
            .await
    }

    /// Checkpoint the WAL so the database file is self-contained.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
            Ok(())
        })
        .await?;
        tracing::debug!("index store checkpointed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SignatureEncoder;

    #[tokio::test]
    async fn test_async_handle_round_trip() {
        let store = IndexStore::in_memory().unwrap();
        let sig = SignatureEncoder::default()
            .encode("Coral reefs shelter a quarter of all marine species")
            .unwrap()
            .unwrap();

        assert!(store.upsert("https://reef.example/", &sig).await.unwrap());
        assert!(store.exists("https://reef.example/").await.unwrap());
        assert_eq!(store.get("https://reef.example/").await.unwrap(), Some(sig));
        assert_eq!(store.stats().await.unwrap().total_sources, 1);

        let health = store.health().await.unwrap();
        assert!(health.integrity_ok);
        assert_eq!(health.signature_count, 1);

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_range_limit_is_capped() {
        let store = IndexStore::in_memory().unwrap().with_max_candidates(2);
        let encoder = SignatureEncoder::default();
        for i in 0..5 {
            let sig = encoder
                .encode(&format!("Background document number {i} with ordinary words"))
                .unwrap()
                .unwrap();
            store.upsert(&format!("https://bg.example/{i}"), &sig).await.unwrap();
        }
        let hits = store.range_query(0.0, 5000.0, None, 100).await.unwrap();
        assert_eq!(hits.len(), 2);
    }
}
