use super::{metrics::Metrics, Config, Mode};
use crate::{
    codec::{Decoder, Encoder},
    pipe, Error, Filter, Store, Tracker,
};
use commonware_runtime::{Clock, Handle, Metrics as RuntimeMetrics, Spawner};
use finality_types::bundle;
use governor::{
    clock::ReasonablyRealtime,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    RateLimiter,
};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Filters bundles from a source [Store] into a destination [Store], one at a time and in
/// increasing order.
pub struct Pipeline<
    E: Spawner + Clock + ReasonablyRealtime + RuntimeMetrics,
    S: Store,
    D: Store,
    T: Tracker,
    F: Filter,
> {
    context: E,

    source: S,
    destination: D,
    tracker: T,
    filter: F,

    mode: Mode,
    poll_interval: Duration,
    max_attempts: usize,
    retry_backoff: Duration,
    flush_threshold: usize,
    max_block_size: usize,

    log_limiter: RateLimiter<NotKeyed, InMemoryState, E, NoOpMiddleware<E::Instant>>,
    metrics: Metrics,
}

impl<
        E: Spawner + Clock + ReasonablyRealtime + RuntimeMetrics,
        S: Store,
        D: Store,
        T: Tracker,
        F: Filter,
    > Pipeline<E, S, D, T, F>
{
    /// Create a pipeline, failing with [Error::InvalidConfig] if `cfg` is inconsistent.
    pub fn new(context: E, cfg: Config<S, D, T, F>) -> Result<Self, Error> {
        if cfg.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if cfg.flush_threshold == 0 {
            return Err(Error::InvalidConfig(
                "flush_threshold must be at least 1".to_string(),
            ));
        }
        if let Mode::Batch { start, stop } = cfg.mode {
            if start % bundle::SIZE != 0 || stop % bundle::SIZE != 0 {
                return Err(Error::InvalidConfig(format!(
                    "batch bounds must be multiples of {}: [{start}, {stop})",
                    bundle::SIZE
                )));
            }
            if start > stop {
                return Err(Error::InvalidConfig(format!(
                    "batch start after stop: [{start}, {stop})"
                )));
            }
        }

        let metrics = Metrics::init(&context);
        let log_limiter = RateLimiter::direct_with_clock(cfg.log_rate, &context);
        Ok(Self {
            context,
            source: cfg.source,
            destination: cfg.destination,
            tracker: cfg.tracker,
            filter: cfg.filter,
            mode: cfg.mode,
            poll_interval: cfg.poll_interval,
            max_attempts: cfg.max_attempts,
            retry_backoff: cfg.retry_backoff,
            flush_threshold: cfg.flush_threshold,
            max_block_size: cfg.max_block_size,
            log_limiter,
            metrics,
        })
    }

    /// Run the pipeline in a new task.
    pub fn start(self) -> Handle<Result<(), Error>> {
        self.context.clone().spawn(|_| self.run())
    }

    /// Run the pipeline until it fails or, in [Mode::Batch], until the last bundle is written.
    pub async fn run(self) -> Result<(), Error> {
        match self.mode {
            Mode::Live { truncation_window } => {
                let start = self.resume_point(truncation_window).await?;
                info!(start = %bundle::name(start), "resuming");
                self.process(start, None).await
            }
            Mode::Batch { start, stop } => {
                info!(
                    start = %bundle::name(start),
                    stop = %bundle::name(stop),
                    "processing batch"
                );
                self.process(start, Some(stop)).await
            }
        }
    }

    /// Find the first bundle to process, scanning the destination backward from the head.
    async fn resume_point(&self, truncation_window: u64) -> Result<u64, Error> {
        let head = self.tracker.head().await?;
        let window = bundle::base(truncation_window);
        let lowest = head.num().saturating_sub(window);
        info!(head = %head, window, "scanning destination for last bundle");

        let mut candidate = bundle::base(head.num());
        loop {
            if window != 0 && candidate <= lowest {
                debug!(base = %bundle::name(candidate), "reached end of truncation window");
                return Ok(candidate);
            }
            if self.destination.exists(&bundle::name(candidate)).await? {
                debug!(base = %bundle::name(candidate), "found bundle at destination");
                return Ok(candidate + bundle::SIZE);
            }
            if candidate == 0 {
                debug!("no bundle at destination");
                return Ok(0);
            }
            candidate -= bundle::SIZE;
        }
    }

    async fn process(self, start: u64, stop: Option<u64>) -> Result<(), Error> {
        let mut current = start;
        loop {
            if stop.is_some_and(|stop| current >= stop) {
                info!(stop = %bundle::name(current), "batch complete");
                return Ok(());
            }
            self.metrics.current.set(current as i64);
            let name = bundle::name(current);

            if self.destination.exists(&name).await? {
                self.metrics.skipped.inc();
                if self.log_limiter.check().is_ok() {
                    info!(base = %name, "bundle already at destination");
                }
                current += bundle::SIZE;
                continue;
            }
            if !self.source.exists(&name).await? {
                self.metrics.waits.inc();
                if self.log_limiter.check().is_ok() {
                    info!(base = %name, "waiting for source bundle");
                }
                self.context.sleep(self.poll_interval).await;
                continue;
            }

            let blocks = self.process_with_retry(&name).await?;
            self.metrics.processed.inc();
            self.metrics.blocks.inc_by(blocks as u64);
            if self.log_limiter.check().is_ok() {
                info!(base = %name, blocks, "uploaded bundle");
            }
            current += bundle::SIZE;
        }
    }

    async fn process_with_retry(&self, name: &str) -> Result<usize, Error> {
        let mut attempt = 1;
        loop {
            match self.process_bundle(name).await {
                Ok(blocks) => return Ok(blocks),
                Err(err) if attempt < self.max_attempts => {
                    warn!(base = name, attempt, ?err, "failed to process bundle, retrying");
                    self.metrics.retries.inc();
                    self.context.sleep(self.retry_backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(base = name, attempt, ?err, "failed to process bundle");
                    return Err(err);
                }
            }
        }
    }

    /// Stream one bundle from the source, through the filter, into the destination.
    ///
    /// Returns the number of blocks written. On failure nothing is committed at the destination.
    async fn process_bundle(&self, name: &str) -> Result<usize, Error> {
        let mut decoder = Decoder::new(self.source.open(name).await?, self.max_block_size);
        let (writer, reader) = pipe::channel();
        let upload = self.context.with_label("upload").spawn({
            let destination = self.destination.clone();
            let name = name.to_string();
            move |_| async move { destination.write(&name, reader).await }
        });

        // The encoder is dropped (aborting the upload) as soon as this returns an error.
        let mut encoder = Encoder::new(writer, self.flush_threshold);
        let transformed = async {
            let mut blocks = 0;
            while let Some(mut block) = decoder.next().await? {
                self.filter.apply(&mut block)?;
                encoder.encode(&block).await?;
                blocks += 1;
            }
            encoder.finish().await?;
            Ok::<_, Error>(blocks)
        }
        .await;
        let uploaded = upload.await.map_err(Error::Runtime).and_then(|result| result);

        match (transformed, uploaded) {
            (Ok(blocks), Ok(())) => Ok(blocks),
            // A closed pipe only means the upload stopped first.
            (Err(Error::PipeClosed), Err(err)) => Err(err),
            (Err(err), _) | (Ok(_), Err(err)) => Err(err),
        }
    }
}
