//! Race redundant upstream providers for block ids and head snapshots.
//!
//! A [Racer] holds a set of independent [Provider]s that can each answer "what is the id of the
//! block at height N" and "what are the current head and last irreversible block". Every query is
//! sent to all providers at once and the first trustworthy answer wins. Individual failures are
//! recorded but never abort the race: a query only fails once every provider has failed (with
//! [Error::AllSourcesFailed] listing each cause) or when its deadline elapses first
//! ([Error::DeadlineExceeded]).
//!
//! [Racer] performs no retries. Callers that want backoff should wrap calls themselves.
//!
//! # Example
//!
//! ```rust,ignore
//! use commonware_runtime::{deterministic, Metrics, Runner};
//! use finality_racer::{Config, Racer};
//!
//! let executor = deterministic::Runner::default();
//! executor.start(|context| async move {
//!     let racer = Racer::new(context.with_label("racer"), Config::default(), providers);
//!     let id = racer.resolve_block_id(1_000).await.unwrap();
//!     let head = racer.resolve_head().await.unwrap();
//! });
//! ```

use std::{
    fmt,
    future::Future,
    time::{Duration, SystemTime},
};
use thiserror::Error;

mod metrics;
mod racer;
pub use racer::Racer;

#[cfg(test)]
mod mocks;

/// Lowest height for which a block id can be derived.
pub const MIN_BLOCK_NUM: u64 = 2;

/// Head and last irreversible block as reported by a [Provider].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadInfo {
    pub last_irreversible_block_num: u64,
    pub last_irreversible_block_id: String,
    pub head_block_num: u64,
    pub head_block_id: String,
    pub head_block_time: SystemTime,
}

/// An upstream source of chain data.
///
/// Providers fail and stall independently of each other and no ordering is assumed between them.
pub trait Provider: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Name used to attribute failures.
    fn name(&self) -> String;

    /// Fetch the id of the block at height `num`.
    fn block_id(&self, num: u64) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Fetch the current head and last irreversible block.
    fn head_info(&self) -> impl Future<Output = Result<HeadInfo, Self::Error>> + Send;
}

/// Configuration for a [Racer].
#[derive(Clone, Debug)]
pub struct Config {
    /// Deadline applied to [Racer::resolve_block_id].
    pub block_id_timeout: Duration,

    /// Deadline applied to [Racer::resolve_head].
    pub head_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_id_timeout: Duration::from_secs(5),
            head_timeout: Duration::from_secs(10),
        }
    }
}

/// The reason a single provider did not produce an answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub provider: String,
    pub reason: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

/// Every provider failure collected during a race.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Failures(pub Vec<Failure>);

impl fmt::Display for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no providers configured");
        }
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// Errors that can occur when racing providers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("cannot derive block id below height 2: {0}")]
    InvalidBlockNum(u64),
    #[error("all sources failed: {0}")]
    AllSourcesFailed(Failures),
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
}
