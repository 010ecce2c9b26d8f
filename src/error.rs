// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use thiserror::Error;

use crate::record::Collection;
use crate::remote::RemoteError;
use crate::storage::StorageError;

/// Failure of a sync attempt (or one collection within it).
///
/// No variant implies data loss: cached records are only removed after the
/// remote store acknowledged them.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("Local store error: {0}")]
    LocalStore(#[from] StorageError),

    #[error("Remote store unavailable: {reason}")]
    RemoteUnavailable { reason: String },

    #[error("Remote put failed for {collection} record {timestamp}: {source}")]
    RemotePut {
        collection: Collection,
        timestamp: u64,
        #[source]
        source: RemoteError,
    },

    #[error("Remote query failed for {collection}: {source}")]
    RemoteQuery {
        collection: Collection,
        #[source]
        source: RemoteError,
    },

    #[error("Remote client unavailable: {0}")]
    Client(RemoteError),
}

impl SyncError {
    /// Credentials rejected by the remote store, anywhere in the chain.
    ///
    /// Hosts typically answer `true` from their failure handler for these,
    /// since the retry fetches a fresh client.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::RemotePut { source, .. } | Self::RemoteQuery { source, .. } | Self::Client(source) => {
                matches!(source, RemoteError::Unauthorized(_))
            }
            _ => false,
        }
    }
}
