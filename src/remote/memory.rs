// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Loopback [`RemoteStore`] for tests, demos and offline hosts.
//!
//! Mirrors the service model: domains must be created before use, puts
//! replace attributes by name, selects are paginated. Every call is
//! counted so tests can assert on traffic.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::select::{SelectRequest, SortOrder, SORT_ATTRIBUTE};
use super::traits::{Attribute, RemoteError, RemoteStore, SelectPage};

const DEFAULT_PAGE_SIZE: usize = 100;

/// Calls served so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteCallCounts {
    pub puts: u64,
    pub creates: u64,
    pub selects: u64,
    pub inconsistent_selects: u64,
}

type Domain = BTreeMap<String, Vec<Attribute>>;

pub struct InMemoryRemoteStore {
    domains: DashMap<String, Domain>,
    page_size: usize,
    counts: Mutex<RemoteCallCounts>,
}

impl InMemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Items returned per select page (at least 1).
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            domains: DashMap::new(),
            page_size: page_size.max(1),
            counts: Mutex::new(RemoteCallCounts::default()),
        }
    }

    /// Pre-create a domain without counting it as a call.
    #[must_use]
    pub fn with_domain(self, domain: &str) -> Self {
        self.domains.entry(domain.to_string()).or_default();
        self
    }

    #[must_use]
    pub fn has_domain(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }

    /// Number of items in a domain, `None` if it does not exist.
    #[must_use]
    pub fn item_count(&self, domain: &str) -> Option<usize> {
        self.domains.get(domain).map(|d| d.len())
    }

    /// Item names in a domain, sorted.
    #[must_use]
    pub fn item_names(&self, domain: &str) -> Vec<String> {
        self.domains
            .get(domain)
            .map(|d| d.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn item(&self, domain: &str, item_name: &str) -> Option<Vec<Attribute>> {
        self.domains.get(domain).and_then(|d| d.get(item_name).cloned())
    }

    #[must_use]
    pub fn counts(&self) -> RemoteCallCounts {
        *self.counts.lock()
    }

    fn sort_value(attributes: &[Attribute]) -> &str {
        attributes
            .iter()
            .find(|a| a.name == SORT_ATTRIBUTE)
            .map_or("", |a| a.value.as_str())
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn create_domain(&self, domain: &str) -> Result<(), RemoteError> {
        self.counts.lock().creates += 1;
        self.domains.entry(domain.to_string()).or_default();
        Ok(())
    }

    async fn put_attributes(
        &self,
        domain: &str,
        item_name: &str,
        attributes: &[Attribute],
    ) -> Result<(), RemoteError> {
        self.counts.lock().puts += 1;

        let mut items = self
            .domains
            .get_mut(domain)
            .ok_or_else(|| RemoteError::NoSuchDomain(domain.to_string()))?;
        let item = items.entry(item_name.to_string()).or_default();
        for attr in attributes {
            item.retain(|existing| existing.name != attr.name);
            item.push(attr.clone());
        }
        Ok(())
    }

    async fn select(&self, request: &SelectRequest) -> Result<SelectPage, RemoteError> {
        {
            let mut counts = self.counts.lock();
            counts.selects += 1;
            if !request.consistent_read {
                counts.inconsistent_selects += 1;
            }
        }

        let items = self
            .domains
            .get(&request.domain)
            .ok_or_else(|| RemoteError::NoSuchDomain(request.domain.clone()))?;

        let mut matched: Vec<(String, Vec<Attribute>)> = items
            .iter()
            .filter(|(_, attrs)| request.matches(Self::sort_value(attrs)))
            .map(|(name, attrs)| (name.clone(), attrs.clone()))
            .collect();
        drop(items);

        matched.sort_by(|a, b| Self::sort_value(&a.1).cmp(Self::sort_value(&b.1)));
        if request.order == SortOrder::Descending {
            matched.reverse();
        }
        if let Some(limit) = request.limit {
            matched.truncate(limit);
        }

        let offset = match request.next_token {
            Some(ref token) => token
                .parse::<usize>()
                .map_err(|_| RemoteError::Transport(format!("invalid next token '{}'", token)))?,
            None => 0,
        };

        let end = (offset + self.page_size).min(matched.len());
        let page: Vec<_> = matched.get(offset..end).map(|slice| slice.to_vec()).unwrap_or_default();
        let next_token = (end < matched.len()).then(|| end.to_string());

        Ok(SelectPage { items: page, next_token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_timestamp;

    fn item(ts: u64, extra: &str) -> Vec<Attribute> {
        vec![
            Attribute::new("timestamp", encode_timestamp(ts)),
            Attribute::new("extra", extra),
        ]
    }

    #[tokio::test]
    async fn test_put_requires_domain() {
        let store = InMemoryRemoteStore::new();
        let err = store.put_attributes("user_call", "a", &item(1, "x")).await.unwrap_err();
        assert_eq!(err, RemoteError::NoSuchDomain("user_call".into()));

        store.create_domain("user_call").await.unwrap();
        store.put_attributes("user_call", "a", &item(1, "x")).await.unwrap();
        assert_eq!(store.item_count("user_call"), Some(1));
        assert_eq!(store.counts().puts, 2);
        assert_eq!(store.counts().creates, 1);
    }

    #[tokio::test]
    async fn test_put_replaces_attributes() {
        let store = InMemoryRemoteStore::new().with_domain("d");
        store.put_attributes("d", "k", &item(1, "first")).await.unwrap();
        store.put_attributes("d", "k", &item(1, "second")).await.unwrap();

        let attrs = store.item("d", "k").unwrap();
        assert_eq!(attrs.len(), 2);
        assert!(attrs.contains(&Attribute::new("extra", "second")));
    }

    #[tokio::test]
    async fn test_select_pages_in_order() {
        let store = InMemoryRemoteStore::with_page_size(2).with_domain("d");
        for ts in [5, 1, 4, 2, 3] {
            store.put_attributes("d", &encode_timestamp(ts), &item(ts, "")).await.unwrap();
        }

        let first = store.select(&SelectRequest::new("d")).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].0, encode_timestamp(1));
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let second = store
            .select(&SelectRequest::new("d").with_token(first.next_token))
            .await
            .unwrap();
        assert_eq!(second.items[0].0, encode_timestamp(3));

        let last = store
            .select(&SelectRequest::new("d").with_token(second.next_token))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.next_token.is_none());
    }

    #[tokio::test]
    async fn test_select_descending_limit_and_missing_sort_attribute() {
        let store = InMemoryRemoteStore::new().with_domain("d");
        for ts in [10, 30, 20] {
            store.put_attributes("d", &encode_timestamp(ts), &item(ts, "")).await.unwrap();
        }
        store
            .put_attributes("d", "no-ts", &[Attribute::new("extra", "orphan")])
            .await
            .unwrap();

        let page = store
            .select(&SelectRequest::new("d").order(SortOrder::Descending).limit(1))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].0, encode_timestamp(30));

        let all = store.select(&SelectRequest::new("d")).await.unwrap();
        assert_eq!(all.items.len(), 3);
    }

    #[tokio::test]
    async fn test_inconsistent_selects_are_counted() {
        let store = InMemoryRemoteStore::new().with_domain("d");
        let mut req = SelectRequest::new("d");
        req.consistent_read = false;
        store.select(&req).await.unwrap();
        store.select(&SelectRequest::new("d")).await.unwrap();

        assert_eq!(store.counts().selects, 2);
        assert_eq!(store.counts().inconsistent_selects, 1);
    }

    #[tokio::test]
    async fn test_select_unknown_domain() {
        let store = InMemoryRemoteStore::new();
        let err = store.select(&SelectRequest::new("missing")).await.unwrap_err();
        assert!(matches!(err, RemoteError::NoSuchDomain(_)));
    }
}
