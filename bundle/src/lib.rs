//! Maintain a filtered copy of block bundles from a source store.
//!
//! Blocks are stored in bundles of [finality_types::bundle::SIZE] consecutive heights. A
//! [Pipeline] watches a source [Store] and, bundle by bundle in increasing order, decodes every
//! block, applies a [Filter] to it, and streams the re-encoded result into a destination [Store].
//!
//! # Design
//!
//! ## Streaming
//!
//! A bundle is never fully materialized. The source is read lazily by a [codec::Decoder], each
//! filtered block is written to a [codec::Encoder], and the encoder feeds a bounded [pipe] that a
//! concurrently spawned upload task drains into the destination. A destination only commits a
//! bundle once its body stream ends cleanly, so dropping the pipe (on any failure or when the
//! pipeline is aborted) leaves no partial bundle behind.
//!
//! ## Resumption
//!
//! In [pipeline::Mode::Live], the pipeline asks a [Tracker] for the current chain head and scans
//! the destination backward from the head's bundle to find where to resume. The scan never goes
//! deeper than the configured truncation window. Bundles that already exist at the destination
//! are skipped, so restarting is idempotent.
//!
//! ## Waiting
//!
//! A bundle missing from the source is expected (it has not been produced yet): the pipeline
//! sleeps for the poll interval and checks again, forever.

use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

mod block;
pub use block::{Action, Block, Filtering, Transaction};
pub mod codec;
pub mod filter;
pub mod pipe;
pub mod pipeline;
pub use pipeline::Pipeline;
pub mod store;
pub use store::{Body, List, Store};
pub mod tracker;
pub use tracker::Tracker;

/// Mutates a block in place, keeping only the content of interest.
pub trait Filter: Send + Sync + 'static {
    fn apply(&self, block: &mut Block) -> Result<(), Error>;
}

/// A stream of byte chunks making up a bundle.
pub trait Chunks: Stream<Item = Result<Bytes, Error>> + Send + Unpin + 'static {}

impl<T: Stream<Item = Result<Bytes, Error>> + Send + Unpin + 'static> Chunks for T {}

/// Errors that can occur when reading, filtering, or writing bundles.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bundle not found: {0}")]
    NotFound(String),
    #[error("codec error: {0}")]
    Codec(#[from] commonware_codec::Error),
    #[error("invalid block: {0}")]
    InvalidBlock(&'static str),
    #[error("invalid bundle header")]
    InvalidHeader,
    #[error("bundle truncated")]
    Truncated,
    #[error("block too large: {0}")]
    BlockTooLarge(usize),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("filter failed: {0}")]
    Filter(String),
    #[error("head unavailable: {0}")]
    Tracker(String),
    #[error("pipe closed")]
    PipeClosed,
    #[error("pipe aborted")]
    PipeAborted,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("runtime error: {0}")]
    Runtime(#[from] commonware_runtime::Error),
}
