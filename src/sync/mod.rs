// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Drains the local cache into the remote store.

mod engine;
mod types;

pub use engine::SyncEngine;
pub use types::{DrainOutcome, SyncReport};
