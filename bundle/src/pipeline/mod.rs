//! Filter bundles from a source store into a destination store.

use governor::Quota;
use std::time::Duration;

mod engine;
pub use engine::Pipeline;
mod metrics;

/// Where a [Pipeline] starts and whether it ever stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Resume after the newest bundle already at the destination and follow the source
    /// forever.
    ///
    /// The resume scan never looks further behind the head than `truncation_window` blocks
    /// (rounded down to a whole number of bundles). A window of zero is unbounded.
    Live { truncation_window: u64 },

    /// Process the bundles in `[start, stop)` and return.
    ///
    /// Both bounds must be multiples of [finality_types::bundle::SIZE].
    Batch { start: u64, stop: u64 },
}

/// Configuration for a [Pipeline].
#[derive(Clone)]
pub struct Config<S, D, T, F> {
    /// Store bundles are read from.
    pub source: S,

    /// Store filtered bundles are written to.
    pub destination: D,

    /// Locates the chain head in [Mode::Live].
    pub tracker: T,

    /// Applied to every block.
    pub filter: F,

    pub mode: Mode,

    /// How long to wait before checking again for a bundle missing from the source.
    pub poll_interval: Duration,

    /// Number of times a bundle is attempted before the pipeline fails.
    pub max_attempts: usize,

    /// How long to wait between attempts of the same bundle.
    pub retry_backoff: Duration,

    /// Number of encoded bytes buffered before a chunk is handed to the upload.
    pub flush_threshold: usize,

    /// Largest encoded block accepted from the source.
    pub max_block_size: usize,

    /// Rate of progress logs.
    pub log_rate: Quota,
}
