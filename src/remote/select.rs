// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Select requests against a remote domain.
//!
//! All range filtering and ordering is done on the padded `timestamp`
//! attribute, which sorts lexicographically in numeric order.
//!
//! ```
//! use telemetry_sync::{SelectRequest, SortOrder};
//!
//! let req = SelectRequest::new("user_call").with_bounds(Some(10), None);
//! assert_eq!(
//!     req.expression(),
//!     "select * from `user_call` where timestamp >= '00000000000000000010' order by timestamp"
//! );
//!
//! let newest = SelectRequest::new("user_call").order(SortOrder::Descending).limit(1);
//! assert_eq!(
//!     newest.expression(),
//!     "select * from `user_call` where timestamp > '' order by timestamp desc limit 1"
//! );
//! ```

use crate::codec::encode_timestamp;

/// Attribute every select filters and sorts on.
pub const SORT_ATTRIBUTE: &str = "timestamp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectRequest {
    pub domain: String,
    /// Inclusive lower bound, already padded.
    pub lower: Option<String>,
    /// Inclusive upper bound, already padded.
    pub upper: Option<String>,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub consistent_read: bool,
    pub next_token: Option<String>,
}

impl SelectRequest {
    /// Ascending, unbounded, consistent read.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            lower: None,
            upper: None,
            order: SortOrder::Ascending,
            limit: None,
            consistent_read: true,
            next_token: None,
        }
    }

    #[must_use]
    pub fn with_bounds(mut self, earliest: Option<u64>, latest: Option<u64>) -> Self {
        self.lower = earliest.map(encode_timestamp);
        self.upper = latest.map(encode_timestamp);
        self
    }

    #[must_use]
    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.next_token = token;
        self
    }

    /// Whether a padded timestamp falls inside the bounds.
    #[must_use]
    pub fn matches(&self, timestamp: &str) -> bool {
        // Items without a sort value never match, even when unbounded
        if timestamp.is_empty() {
            return false;
        }
        let above = self.lower.as_deref().map_or(true, |lower| timestamp >= lower);
        let below = self.upper.as_deref().map_or(true, |upper| timestamp <= upper);
        above && below
    }

    /// Render as a select expression for logging and SDK bindings.
    #[must_use]
    pub fn expression(&self) -> String {
        let mut predicates = Vec::new();
        match self.lower {
            Some(ref lower) => predicates.push(format!("{} >= '{}'", SORT_ATTRIBUTE, lower)),
            None => predicates.push(format!("{} > ''", SORT_ATTRIBUTE)),
        }
        if let Some(ref upper) = self.upper {
            predicates.push(format!("{} <= '{}'", SORT_ATTRIBUTE, upper));
        }

        let mut expr = format!(
            "select * from `{}` where {} order by {}",
            self.domain,
            predicates.join(" and "),
            SORT_ATTRIBUTE
        );
        if self.order == SortOrder::Descending {
            expr.push_str(" desc");
        }
        if let Some(limit) = self.limit {
            expr.push_str(&format!(" limit {}", limit));
        }
        expr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_is_consistent_ascending() {
        let req = SelectRequest::new("user_wifi");
        assert!(req.consistent_read);
        assert_eq!(req.order, SortOrder::Ascending);
        assert_eq!(req.limit, None);
        assert_eq!(
            req.expression(),
            "select * from `user_wifi` where timestamp > '' order by timestamp"
        );
    }

    #[test]
    fn test_expression_with_both_bounds() {
        let req = SelectRequest::new("user_mobile").with_bounds(Some(5), Some(9));
        assert_eq!(
            req.expression(),
            "select * from `user_mobile` where timestamp >= '00000000000000000005' \
             and timestamp <= '00000000000000000009' order by timestamp"
        );
    }

    #[test]
    fn test_matches_is_inclusive() {
        let req = SelectRequest::new("d").with_bounds(Some(5), Some(9));
        assert!(req.matches(&encode_timestamp(5)));
        assert!(req.matches(&encode_timestamp(9)));
        assert!(!req.matches(&encode_timestamp(4)));
        assert!(!req.matches(&encode_timestamp(10)));
        assert!(!SelectRequest::new("d").matches(""));
    }
}
