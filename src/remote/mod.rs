// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote key-value store: the service trait, the collection-aware adapter
//! and a loopback implementation.

pub mod adapter;
pub mod attributes;
pub mod memory;
pub mod select;
pub mod traits;

pub use adapter::RemoteAdapter;
pub use attributes::RemoteRecord;
pub use memory::{InMemoryRemoteStore, RemoteCallCounts};
pub use select::{SelectRequest, SortOrder};
pub use traits::{Attribute, RemoteClientProvider, RemoteError, RemoteStore, SelectPage, StaticClientProvider};
