// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! At-most-once execution guard. The processed set is append-only; an id is
//! marked only once the effect it guards has actually been applied, so a
//! failed attempt never blocks a legitimate retry.

use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Default)]
pub struct ReplayGuard {
    processed: Mutex<HashSet<[u8; 32]>>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check-and-mark. Returns false, with no state change, if
    /// the id was already processed.
    pub fn mark_if_unprocessed(&self, id: [u8; 32]) -> bool {
        self.processed.lock().insert(id)
    }

    pub fn is_processed(&self, id: &[u8; 32]) -> bool {
        self.processed.lock().contains(id)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.lock().len()
    }
}
