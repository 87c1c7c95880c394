//! Identify blocks, heads, and bundles of a fork-prone chain.
//!
//! Every block on the chain is addressed by a [BlockRef]: a pair of a self-describing identifier
//! (whose first 8 characters are the big-endian hexadecimal height) and the height itself. Heads
//! observed from upstream sources are captured as [HeadSnapshot]s and persisted index entries as
//! [IndexRow]s. Block history is stored in fixed-size [bundle]s.

use thiserror::Error;

mod block;
pub use block::{block_num, BlockRef, IndexRow};
mod head;
pub use head::{HeadSnapshot, Timestamp};
pub mod bundle;

/// Errors that can occur when interpreting chain identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid block id: {0}")]
    InvalidId(String),
    #[error("timestamp before unix epoch")]
    InvalidTimestamp,
}
