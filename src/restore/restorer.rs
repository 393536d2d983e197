//! Deferred index application
//!
//! Index definitions are collected while documents are loaded and
//! applied only after the last chunk:
//! 1. Record each collection's list, at most once per collection
//! 2. Apply collections in sorted order, specs in declared order
//! 3. Stop at the first failure; inserted documents stay

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::info;

use super::errors::{RestoreError, RestoreResult};
use crate::database::DocumentTarget;
use crate::document::IndexSpec;
use crate::observability::Event;

/// Index totals after application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedIndexes {
    pub collections: usize,
    pub indexes: usize,
}

/// Index lists waiting for the bulk load to finish
#[derive(Debug, Default)]
pub struct IndexPlan {
    pending: BTreeMap<String, Vec<IndexSpec>>,
}

impl IndexPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and keep one collection's `indexes.json` payload
    pub fn record(&mut self, collection: &str, payload: &Bytes) -> RestoreResult<()> {
        if self.pending.contains_key(collection) {
            return Err(RestoreError::duplicate_index(collection));
        }
        let specs = IndexSpec::decode_list(payload).map_err(|e| {
            RestoreError::invalid_entry(&format!("{}/indexes.json", collection), e)
        })?;
        info!(event = %Event::IndexesRecorded, collection = %collection, count = specs.len());
        self.pending.insert(collection.to_string(), specs);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Apply every recorded list, consuming the plan
    pub fn apply(self, target: &mut dyn DocumentTarget) -> RestoreResult<AppliedIndexes> {
        let mut applied = AppliedIndexes::default();
        for (collection, specs) in self.pending {
            info!(collection = %collection, "applying indexes");
            for spec in &specs {
                target
                    .ensure_index(&collection, spec)
                    .map_err(|e| RestoreError::index(&collection, e))?;
                applied.indexes += 1;
            }
            applied.collections += 1;
            info!(event = %Event::IndexesApplied, collection = %collection, count = specs.len());
        }
        Ok(applied)
    }
}
