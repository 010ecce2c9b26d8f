// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQLite-backed local cache.
//!
//! Schema (one table per collection):
//! ```sql
//! CREATE TABLE call_data (
//!   id INTEGER PRIMARY KEY,
//!   timestamp TEXT NOT NULL UNIQUE,  -- 20-digit zero-padded epoch millis
//!   number TEXT, type INTEGER, duration TEXT, lat REAL, lon REAL
//! )
//! CREATE TABLE mobile_data / wifi_data (
//!   id INTEGER PRIMARY KEY,
//!   timestamp TEXT NOT NULL UNIQUE,
//!   timeframe TEXT, updata TEXT, downdata TEXT, lat REAL, lon REAL
//! )
//! ```
//!
//! Every operation is a single statement, so no partial write is ever
//! visible. Writers (insert / delete) and readers are serialized per
//! collection with an `RwLock`. A drain takes the collection's write lock
//! once through [`LocalStore::lock_for_drain`] and holds it from the listing
//! to the last delete, so inserts arriving mid-drain wait for the next pass.

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use std::sync::Once;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::schema::{column_list, create_table_sql, LocalRecord};
use super::{CollectionCounts, StorageError};
use crate::codec::encode_timestamp;
use crate::config::SyncConfig;
use crate::record::{CallRecord, Collection, RecordKind, UsageRecord};
use crate::resilience::retry::{retry, RetryConfig};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

fn backend(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

fn slot(collection: Collection) -> usize {
    match collection {
        Collection::Calls => 0,
        Collection::CellularUsage => 1,
        Collection::WifiUsage => 2,
    }
}

/// Where a ranged scan resumes.
#[derive(Debug, Clone)]
struct RangeCursor {
    lower: Option<String>,
    inclusive: bool,
}

pub struct LocalStore {
    pool: AnyPool,
    path: String,
    page_size: usize,
    locks: [RwLock<()>; 3],
}

impl LocalStore {
    /// Open (or create) the cache file. Connection uses startup-mode retry.
    pub async fn open(config: &SyncConfig) -> Result<Self, StorageError> {
        install_drivers();

        let url = config.sqlite_url();
        let url = url.as_str();
        let max_connections = config.max_connections.max(1);
        info!(path = %config.database_path, "Opening local telemetry cache");

        let pool = retry("local_store_connect", &RetryConfig::startup(), || async move {
            AnyPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await
                .map_err(backend)
        })
        .await?;

        let store = Self {
            pool,
            path: config.database_path.clone(),
            page_size: config.local_page_size.max(1),
            locks: [RwLock::new(()), RwLock::new(()), RwLock::new(())],
        };

        store.enable_wal_mode().await?;
        store.init_schema().await?;

        let pending = store.counts().await?;
        if pending.total() > 0 {
            warn!(
                calls = pending.calls,
                cellular = pending.cellular_usage,
                wifi = pending.wifi_usage,
                "Cache has records from a previous run, next sync will drain them"
            );
        }

        Ok(store)
    }

    /// Path to the SQLite file (for display).
    pub fn path(&self) -> &str {
        &self.path
    }

    async fn enable_wal_mode(&self) -> Result<(), StorageError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to enable WAL mode: {}", e)))?;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to set synchronous mode: {}", e)))?;

        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        for collection in Collection::ALL {
            let sql = match collection.kind() {
                RecordKind::Call => create_table_sql::<CallRecord>(collection.table_name()),
                RecordKind::Usage => create_table_sql::<UsageRecord>(collection.table_name()),
            };
            sqlx::query(&sql).execute(&self.pool).await.map_err(backend)?;
        }
        Ok(())
    }

    /// Truncate the SQLite WAL file to reclaim space after a full drain.
    pub async fn checkpoint(&self) -> Result<(), StorageError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("WAL checkpoint failed: {}", e)))?;
        debug!(path = %self.path, "Cache checkpoint completed");
        Ok(())
    }

    fn lock(&self, collection: Collection) -> &RwLock<()> {
        &self.locks[slot(collection)]
    }

    fn check_kind<R: LocalRecord>(collection: Collection) -> Result<(), StorageError> {
        if collection.kind() != R::KIND {
            return Err(StorageError::KindMismatch {
                collection,
                expected: collection.kind(),
            });
        }
        Ok(())
    }

    fn decode<R: LocalRecord>(collection: Collection, row: &AnyRow) -> Result<R, StorageError> {
        R::from_row(row).map_err(|reason| StorageError::Corrupt { collection, reason })
    }

    fn select_prefix<R: LocalRecord>(collection: Collection) -> String {
        format!(
            "SELECT timestamp, {} FROM {}",
            column_list::<R>(),
            collection.table_name()
        )
    }

    /// Append a record. Never overwrites: an existing timestamp yields
    /// [`StorageError::DuplicateKey`] and leaves the table untouched.
    pub async fn insert<R: LocalRecord>(&self, collection: Collection, record: &R) -> Result<(), StorageError> {
        Self::check_kind::<R>(collection)?;

        let placeholders = vec!["?"; R::COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} (timestamp, {}) VALUES (?, {}) ON CONFLICT(timestamp) DO NOTHING",
            collection.table_name(),
            column_list::<R>(),
            placeholders
        );

        let _guard = self.lock(collection).write().await;
        let query = sqlx::query(&sql).bind(encode_timestamp(record.timestamp()));
        let result = record
            .bind_payload(query)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::DuplicateKey {
                collection,
                timestamp: record.timestamp(),
            });
        }

        debug!(%collection, timestamp = record.timestamp(), "Record cached");
        Ok(())
    }

    /// Every cached record, oldest first.
    pub async fn list_all<R: LocalRecord>(&self, collection: Collection) -> Result<Vec<R>, StorageError> {
        let _guard = self.lock(collection).read().await;
        self.list_all_unlocked(collection).await
    }

    async fn list_all_unlocked<R: LocalRecord>(&self, collection: Collection) -> Result<Vec<R>, StorageError> {
        Self::check_kind::<R>(collection)?;
        let sql = format!("{} ORDER BY timestamp ASC", Self::select_prefix::<R>(collection));

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.iter().map(|row| Self::decode(collection, row)).collect()
    }

    /// Inclusive range scan, oldest first. Either bound may be open.
    ///
    /// The stream is lazy: rows are fetched `local_page_size` at a time,
    /// resuming after the last timestamp seen.
    pub fn list_range<R: LocalRecord>(
        &self,
        collection: Collection,
        earliest: Option<u64>,
        latest: Option<u64>,
    ) -> impl Stream<Item = Result<R, StorageError>> + '_ {
        let start = RangeCursor {
            lower: earliest.map(encode_timestamp),
            inclusive: true,
        };
        let upper = latest.map(encode_timestamp);

        stream::try_unfold(Some(start), move |cursor| {
            let upper = upper.clone();
            async move {
                let Some(cursor) = cursor else {
                    return Ok::<_, StorageError>(None);
                };
                let page: Vec<R> = self.fetch_page(collection, &cursor, upper.as_deref()).await?;
                let next = if page.len() < self.page_size {
                    None
                } else {
                    page.last().map(|last| RangeCursor {
                        lower: Some(encode_timestamp(last.timestamp())),
                        inclusive: false,
                    })
                };
                Ok(Some((page, next)))
            }
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<R, StorageError>)))
        .try_flatten()
    }

    /// Convenience for callers that want the whole range at once.
    pub async fn collect_range<R: LocalRecord>(
        &self,
        collection: Collection,
        earliest: Option<u64>,
        latest: Option<u64>,
    ) -> Result<Vec<R>, StorageError> {
        self.list_range(collection, earliest, latest)
            .boxed()
            .try_collect()
            .await
    }

    async fn fetch_page<R: LocalRecord>(
        &self,
        collection: Collection,
        cursor: &RangeCursor,
        upper: Option<&str>,
    ) -> Result<Vec<R>, StorageError> {
        Self::check_kind::<R>(collection)?;

        let mut clauses = Vec::new();
        if cursor.lower.is_some() {
            clauses.push(if cursor.inclusive { "timestamp >= ?" } else { "timestamp > ?" });
        }
        if upper.is_some() {
            clauses.push("timestamp <= ?");
        }
        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "{}{} ORDER BY timestamp ASC LIMIT ?",
            Self::select_prefix::<R>(collection),
            filter
        );

        let mut query = sqlx::query(&sql);
        if let Some(ref lower) = cursor.lower {
            query = query.bind(lower.clone());
        }
        if let Some(upper) = upper {
            query = query.bind(upper.to_string());
        }
        query = query.bind(self.page_size as i64);

        let _guard = self.lock(collection).read().await;
        let rows = query.fetch_all(&self.pool).await.map_err(backend)?;
        rows.iter().map(|row| Self::decode(collection, row)).collect()
    }

    async fn fetch_edge<R: LocalRecord>(&self, collection: Collection, order: &str) -> Result<Option<R>, StorageError> {
        Self::check_kind::<R>(collection)?;
        let sql = format!(
            "{} ORDER BY timestamp {} LIMIT 1",
            Self::select_prefix::<R>(collection),
            order
        );

        let _guard = self.lock(collection).read().await;
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(|row| Self::decode(collection, &row)).transpose()
    }

    pub async fn oldest<R: LocalRecord>(&self, collection: Collection) -> Result<Option<R>, StorageError> {
        self.fetch_edge(collection, "ASC").await
    }

    pub async fn newest<R: LocalRecord>(&self, collection: Collection) -> Result<Option<R>, StorageError> {
        self.fetch_edge(collection, "DESC").await
    }

    pub async fn count(&self, collection: Collection) -> Result<u64, StorageError> {
        let _guard = self.lock(collection).read().await;
        self.count_unlocked(collection).await
    }

    pub async fn counts(&self) -> Result<CollectionCounts, StorageError> {
        let mut counts = CollectionCounts::default();
        for collection in Collection::ALL {
            counts.set(collection, self.count(collection).await?);
        }
        Ok(counts)
    }

    /// Remove at most one record. Returns whether a row was removed.
    pub async fn delete_by_key(&self, collection: Collection, timestamp: u64) -> Result<bool, StorageError> {
        let _guard = self.lock(collection).write().await;
        self.delete_unlocked(collection, timestamp).await
    }

    async fn delete_unlocked(&self, collection: Collection, timestamp: u64) -> Result<bool, StorageError> {
        let sql = format!("DELETE FROM {} WHERE timestamp = ?", collection.table_name());
        let result = sqlx::query(&sql)
            .bind(encode_timestamp(timestamp))
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_unlocked(&self, collection: Collection) -> Result<u64, StorageError> {
        let sql = format!("SELECT COUNT(*) as cnt FROM {}", collection.table_name());
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        let count: i64 = row.try_get("cnt").map_err(backend)?;

        Ok(count as u64)
    }

    /// Take exclusive ownership of a collection for one drain.
    ///
    /// Every other operation on the collection, inserts included, waits
    /// until the returned lock is dropped.
    pub async fn lock_for_drain(&self, collection: Collection) -> DrainLock<'_> {
        let guard = self.lock(collection).write().await;
        debug!(%collection, "Drain lock acquired");
        DrainLock {
            store: self,
            collection,
            _guard: guard,
        }
    }

    /// Clear a collection. Returns the number of rows removed.
    pub async fn delete_all(&self, collection: Collection) -> Result<u64, StorageError> {
        let sql = format!("DELETE FROM {}", collection.table_name());

        let _guard = self.lock(collection).write().await;
        let result = sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        info!(%collection, removed = result.rows_affected(), "Collection cleared");
        Ok(result.rows_affected())
    }
}

/// Write lock over one collection, held for the length of a drain.
pub struct DrainLock<'a> {
    store: &'a LocalStore,
    collection: Collection,
    _guard: RwLockWriteGuard<'a, ()>,
}

impl DrainLock<'_> {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Every cached record, oldest first.
    pub async fn list_all<R: LocalRecord>(&self) -> Result<Vec<R>, StorageError> {
        self.store.list_all_unlocked(self.collection).await
    }

    pub async fn delete_by_key(&self, timestamp: u64) -> Result<bool, StorageError> {
        self.store.delete_unlocked(self.collection, timestamp).await
    }

    pub async fn count(&self) -> Result<u64, StorageError> {
        self.store.count_unlocked(self.collection).await
    }
}
