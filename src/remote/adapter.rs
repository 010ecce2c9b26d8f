// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Collection-aware wrapper over a [`RemoteStore`] client.
//!
//! Adds domain naming, lazy domain creation, per-call timeouts,
//! token-following queries and metrics. One adapter is built per sync
//! attempt from whatever client the provider hands out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::attributes::RemoteRecord;
use super::select::{SelectRequest, SortOrder};
use super::traits::{RemoteError, RemoteStore};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::metrics::{self, LatencyTimer};
use crate::record::Collection;

pub struct RemoteAdapter {
    store: Arc<dyn RemoteStore>,
    domain_prefix: String,
    timeout: Duration,
}

impl RemoteAdapter {
    pub fn new(store: Arc<dyn RemoteStore>, domain_prefix: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            domain_prefix: domain_prefix.into(),
            timeout,
        }
    }

    pub fn from_config(store: Arc<dyn RemoteStore>, config: &SyncConfig) -> Self {
        Self::new(store, config.domain_prefix.clone(), config.remote_timeout())
    }

    #[must_use]
    pub fn domain(&self, collection: Collection) -> String {
        collection.domain_name(&self.domain_prefix)
    }

    /// Run one remote call under the timeout, recording latency and status.
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        let _timer = LatencyTimer::new(operation);
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        };

        let status = match result {
            Ok(_) => "success",
            Err(RemoteError::Timeout) => "timeout",
            Err(_) => "error",
        };
        metrics::record_remote_call(operation, status);
        result
    }

    /// Write one record, creating the domain on first use.
    ///
    /// A missing domain triggers exactly one `create_domain` and one
    /// retried put; the retry's result is final.
    pub async fn put<R: RemoteRecord>(&self, collection: Collection, record: &R) -> Result<(), SyncError> {
        let domain = self.domain(collection);
        let item_name = record.item_name();
        let attributes = record.to_attributes();
        let timestamp = RemoteRecord::timestamp(record);

        let wrap = |source: RemoteError| SyncError::RemotePut {
            collection,
            timestamp,
            source,
        };

        let first = self
            .call("put", self.store.put_attributes(&domain, &item_name, &attributes))
            .await;

        match first {
            Ok(()) => {}
            Err(RemoteError::NoSuchDomain(_)) => {
                info!(%domain, "Remote domain missing, creating it");
                self.call("create_domain", self.store.create_domain(&domain))
                    .await
                    .map_err(wrap)?;
                metrics::record_domain_created(collection);

                self.call("put", self.store.put_attributes(&domain, &item_name, &attributes))
                    .await
                    .map_err(wrap)?;
            }
            Err(e) => return Err(wrap(e)),
        }

        debug!(%domain, item = %item_name, "Remote put acknowledged");
        Ok(())
    }

    /// Every record with `earliest <= timestamp <= latest`, ascending.
    ///
    /// Reads are consistent and every page is fetched; a failure on any
    /// page discards what was gathered so far.
    pub async fn query<R: RemoteRecord>(
        &self,
        collection: Collection,
        earliest: Option<u64>,
        latest: Option<u64>,
    ) -> Result<Vec<R>, SyncError> {
        let request = SelectRequest::new(self.domain(collection)).with_bounds(earliest, latest);
        self.select_all(collection, request).await
    }

    /// Newest record in the collection's domain, if any.
    pub async fn most_recent<R: RemoteRecord>(&self, collection: Collection) -> Result<Option<R>, SyncError> {
        let request = SelectRequest::new(self.domain(collection))
            .order(SortOrder::Descending)
            .limit(1);
        Ok(self.select_all(collection, request).await?.into_iter().next())
    }

    /// Oldest record in the collection's domain, if any.
    pub async fn oldest<R: RemoteRecord>(&self, collection: Collection) -> Result<Option<R>, SyncError> {
        let request = SelectRequest::new(self.domain(collection)).limit(1);
        Ok(self.select_all(collection, request).await?.into_iter().next())
    }

    async fn select_all<R: RemoteRecord>(
        &self,
        collection: Collection,
        mut request: SelectRequest,
    ) -> Result<Vec<R>, SyncError> {
        let wrap = |source: RemoteError| SyncError::RemoteQuery { collection, source };

        request.consistent_read = true;
        debug!(expression = %request.expression(), "Remote select");

        let mut records = Vec::new();
        let mut pages = 0usize;
        loop {
            let page = self
                .call("select", self.store.select(&request))
                .await
                .map_err(|e| {
                    warn!(%collection, pages, error = %e, "Remote select failed, discarding partial result");
                    wrap(e)
                })?;
            pages += 1;

            for (item_name, attributes) in &page.items {
                records.push(R::from_attributes(item_name, attributes).map_err(wrap)?);
            }

            match page.next_token {
                Some(token) => request.next_token = Some(token),
                None => break,
            }
        }

        debug!(%collection, pages, records = records.len(), "Remote select complete");
        Ok(records)
    }
}
