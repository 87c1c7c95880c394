//! Maintain a filtered copy of block bundles stored on disk.
//!
//! The `filter` binary reads a YAML [Config], opens the source and destination directories as
//! [finality_bundle::store::Directory] stores, and runs a [finality_bundle::Pipeline] until it
//! fails, finishes its batch, or is interrupted.
//!
//! # Example Config
//!
//! ```yaml
//! source: /data/bundles
//! destination: /data/bundles-filtered
//! include: "eosio.token, eosio::onblock"
//! exclude: "spam"
//! truncation_window: 10000
//! ```

use commonware_runtime::{Clock, Metrics, Spawner};
use finality_bundle::{
    filter::Accounts,
    pipeline,
    store::Directory,
    tracker::Latest,
    Pipeline,
};
use governor::{clock::ReasonablyRealtime, Quota};
use thiserror::Error;
use tracing::info;

mod config;
pub use config::{Batch, Config};

/// Errors that can occur when running the `filter` binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error(transparent)]
    Bundle(#[from] finality_bundle::Error),
}

/// Open the configured stores and run a pipeline over them.
///
/// In live mode the head is the last block of the highest bundle in the source directory.
pub async fn run<E>(context: E, config: Config) -> Result<(), Error>
where
    E: Spawner + Clock + ReasonablyRealtime + Metrics,
{
    let source = Directory::init(&config.source).await?;
    let destination = Directory::init(&config.destination).await?;
    let filter = Accounts::parse(&config.include, &config.exclude)?;
    if filter.is_noop() {
        info!("no include or exclude expression, bundles are copied unchanged");
    }
    let mode = config.mode();
    info!(
        source = %config.source.display(),
        destination = %config.destination.display(),
        ?mode,
        "starting pipeline"
    );

    let cfg = pipeline::Config {
        tracker: Latest::new(source.clone(), config.max_block_size),
        source,
        destination,
        filter,
        mode,
        poll_interval: config.poll_interval(),
        max_attempts: config.attempts,
        retry_backoff: config.retry_backoff(),
        flush_threshold: config.flush_threshold,
        max_block_size: config.max_block_size,
        log_rate: Quota::per_second(config.log_rate()?),
    };
    Pipeline::new(context.with_label("pipeline"), cfg)?
        .run()
        .await?;
    Ok(())
}
