// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::select::SelectRequest;

/// A single name/value pair on a remote item. Values are always strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("No such domain: {0}")]
    NoSuchDomain(String),
    #[error("Credentials rejected: {0}")]
    Unauthorized(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Remote call timed out")]
    Timeout,
    #[error("Malformed item '{item}': {reason}")]
    Malformed { item: String, reason: String },
}

/// One page of select results: `(item_name, attributes)` in request order.
#[derive(Debug, Clone, Default)]
pub struct SelectPage {
    pub items: Vec<(String, Vec<Attribute>)>,
    pub next_token: Option<String>,
}

/// The remote key-value service: domains of named items, each a bag of
/// string attributes.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Idempotent: creating an existing domain succeeds.
    async fn create_domain(&self, domain: &str) -> Result<(), RemoteError>;

    /// Replace semantics: every attribute named here overwrites any
    /// existing value on the item.
    async fn put_attributes(
        &self,
        domain: &str,
        item_name: &str,
        attributes: &[Attribute],
    ) -> Result<(), RemoteError>;

    async fn select(&self, request: &SelectRequest) -> Result<SelectPage, RemoteError>;
}

/// Supplies an authenticated client. Called at the start of every sync
/// attempt so refreshed credentials are picked up.
#[async_trait]
pub trait RemoteClientProvider: Send + Sync {
    async fn client(&self) -> Result<Arc<dyn RemoteStore>, RemoteError>;
}

/// Always hands out the same client.
pub struct StaticClientProvider {
    client: Arc<dyn RemoteStore>,
}

impl StaticClientProvider {
    pub fn new(client: Arc<dyn RemoteStore>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteClientProvider for StaticClientProvider {
    async fn client(&self) -> Result<Arc<dyn RemoteStore>, RemoteError> {
        Ok(self.client.clone())
    }
}
