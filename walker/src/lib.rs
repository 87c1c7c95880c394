//! Reconcile fork tops with the irreversible chain of a block index.
//!
//! Given a block that may sit on a reversible fork, [Walker] scans a persisted [Index] backward
//! (following each block's parent id) until it reaches a block marked irreversible. Every
//! reversible block visited on the way is returned, most recent first, so callers learn exactly
//! which blocks would have to be undone to return to the final chain.
//!
//! # Paging
//!
//! The index is read in pages that start at the height of the block currently being searched
//! for. Because several blocks may exist at the same height (competing forks), a page can be
//! consumed by siblings before reaching the expected parent. The page size therefore grows after
//! every fetch (until a ceiling is reached) and the total number of fetches is bounded so that a
//! corrupt or cyclic index cannot stall the walk forever. Both are tunable through [Config].

use finality_types::IndexRow;
use std::future::Future;
use thiserror::Error;

pub mod memory;
mod walker;
pub use walker::Walker;

/// A persisted index of blocks, possibly containing several forks.
pub trait Index: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// List up to `limit` rows whose height is at most `high`, highest first.
    ///
    /// Rows sharing a height may appear in any order relative to each other. Irreversibility
    /// flags must be truthful.
    fn list_blocks(
        &self,
        high: u64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<IndexRow>, Self::Error>> + Send;
}

/// Configuration for a [Walker].
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of rows fetched in the first page.
    pub initial_window: usize,

    /// Number of rows added to the page size after each fetch.
    pub window_growth: usize,

    /// The page size only grows while it is at most this value.
    pub window_growth_limit: usize,

    /// Maximum number of pages fetched before giving up.
    pub max_iterations: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_window: 10,
            window_growth: 5,
            window_growth_limit: 100,
            max_iterations: 1_000,
        }
    }
}

/// Why a reconciliation point could not be found.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Reason {
    #[error("expected block at height {expected} but index skipped to {found}")]
    Gap { expected: u64, found: u64 },
    #[error("gave up after {0} iterations")]
    TooManyIterations(usize),
}

/// Errors that can occur when reconciling a fork.
#[derive(Debug, Error)]
pub enum Error<E: std::error::Error + 'static> {
    #[error("reconciliation point not found: {0}")]
    NotFound(Reason),
    #[error("index error: {0}")]
    Index(#[source] E),
    #[error(transparent)]
    InvalidId(#[from] finality_types::Error),
}
