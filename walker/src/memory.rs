//! An in-memory [Index].

use crate::Index;
use finality_types::IndexRow;
use std::{collections::BTreeMap, convert::Infallible};

/// Block index held in memory, keyed by height.
///
/// Rows at the same height are listed in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    rows: BTreeMap<u64, Vec<IndexRow>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row to the index.
    pub fn insert(&mut self, row: IndexRow) {
        self.rows.entry(row.num()).or_default().push(row);
    }

    /// Mark every row at or below `num` as irreversible.
    pub fn finalize(&mut self, num: u64) {
        for row in self.rows.range_mut(..=num).flat_map(|(_, rows)| rows.iter_mut()) {
            row.irreversible = true;
        }
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Index for Memory {
    type Error = Infallible;

    async fn list_blocks(&self, high: u64, limit: usize) -> Result<Vec<IndexRow>, Self::Error> {
        Ok(self
            .rows
            .range(..=high)
            .rev()
            .flat_map(|(_, rows)| rows.iter().cloned())
            .take(limit)
            .collect())
    }
}
