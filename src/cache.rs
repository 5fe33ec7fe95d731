use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::error::RfvError;
use crate::models::RfvTable;
use crate::{ingest, rfv};

/// Content fingerprint of an uploaded file.
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Explicit result cache keyed by input fingerprint. The caller owns it
/// and decides when entries are invalidated; there is no ambient global
/// state. A shell serving several files holds one cache per session so
/// customers from different uploads never share a table.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<String, RfvTable>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &str) -> Option<&RfvTable> {
        self.entries.get(fingerprint)
    }

    /// Returns the cached table for these bytes, running the full
    /// pipeline on a miss. Identical bytes always yield the identical
    /// stored table.
    pub fn get_or_compute(&mut self, bytes: &[u8]) -> Result<&RfvTable, RfvError> {
        let key = fingerprint(bytes);
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                debug!(fingerprint = %entry.key(), "cache hit");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let transactions = ingest::parse_transactions(bytes)?;
                let table = rfv::segment(&transactions)?;
                Ok(entry.insert(table))
            }
        }
    }

    /// Drops one entry. Returns whether it was present.
    pub fn invalidate(&mut self, fingerprint: &str) -> bool {
        self.entries.remove(fingerprint).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
