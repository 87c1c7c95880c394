use crate::{
    metrics::Metrics, Config, Error, Failure, Failures, HeadInfo, Provider, MIN_BLOCK_NUM,
};
use commonware_macros::select;
use commonware_runtime::{Clock, Metrics as RuntimeMetrics};
use finality_types::{HeadSnapshot, Timestamp};
use futures::{stream::FuturesUnordered, StreamExt};
use std::{future::Future, time::Duration};
use tracing::{debug, warn};

/// Resolves chain data by racing a set of redundant [Provider]s.
pub struct Racer<E: Clock + RuntimeMetrics, P: Provider> {
    context: E,
    providers: Vec<P>,

    block_id_timeout: Duration,
    head_timeout: Duration,

    metrics: Metrics,
}

impl<E: Clock + RuntimeMetrics, P: Provider> Racer<E, P> {
    /// Create a racer over `providers`. The set may be empty.
    pub fn new(context: E, cfg: Config, providers: Vec<P>) -> Self {
        let metrics = Metrics::init(&context);
        Self {
            context,
            providers,
            block_id_timeout: cfg.block_id_timeout,
            head_timeout: cfg.head_timeout,
            metrics,
        }
    }

    /// Resolve the id of the block at height `num`.
    ///
    /// Heights below [MIN_BLOCK_NUM] are rejected without contacting any provider. When no
    /// providers are configured, an empty id is returned. An empty id returned by a provider
    /// counts as a failure of that provider.
    pub async fn resolve_block_id(&self, num: u64) -> Result<String, Error> {
        if num < MIN_BLOCK_NUM {
            return Err(Error::InvalidBlockNum(num));
        }
        if self.providers.is_empty() {
            debug!(num, "no providers configured");
            return Ok(String::new());
        }
        self.race(self.block_id_timeout, move |provider| async move {
            match provider.block_id(num).await {
                Ok(id) if id.is_empty() => Err("empty block id".to_string()),
                Ok(id) => Ok(id),
                Err(err) => Err(err.to_string()),
            }
        })
        .await
    }

    /// Resolve the current head and last irreversible block.
    pub async fn resolve_head(&self) -> Result<HeadSnapshot, Error> {
        if self.providers.is_empty() {
            self.metrics.all_failed.inc();
            return Err(Error::AllSourcesFailed(Failures::default()));
        }
        self.race(self.head_timeout, |provider| async move {
            let info = provider.head_info().await.map_err(|err| err.to_string())?;
            snapshot(info)
        })
        .await
    }

    /// Run `attempt` against every provider concurrently and return the first success.
    ///
    /// Attempts still in flight when this returns are dropped.
    async fn race<T, F, Fut>(&self, timeout: Duration, attempt: F) -> Result<T, Error>
    where
        F: Fn(P) -> Fut,
        Fut: Future<Output = Result<T, String>> + Send,
    {
        let mut attempts = self
            .providers
            .iter()
            .cloned()
            .map(|provider| {
                let name = provider.name();
                let attempt = attempt(provider);
                async move { (name, attempt.await) }
            })
            .collect::<FuturesUnordered<_>>();
        let total = attempts.len();
        let mut failures = Vec::with_capacity(total);
        let mut deadline = Box::pin(self.context.sleep(timeout));
        loop {
            select! {
                _ = &mut deadline => {
                    self.metrics.timed_out.inc();
                    warn!(
                        ?timeout,
                        failed = failures.len(),
                        pending = total - failures.len(),
                        "deadline exceeded"
                    );
                    return Err(Error::DeadlineExceeded(timeout));
                },
                outcome = attempts.next() => {
                    let Some((provider, result)) = outcome else {
                        self.metrics.all_failed.inc();
                        return Err(Error::AllSourcesFailed(Failures(failures)));
                    };
                    match result {
                        Ok(value) => {
                            self.metrics.resolved.inc();
                            debug!(%provider, failed = failures.len(), "resolved");
                            return Ok(value);
                        }
                        Err(reason) => {
                            self.metrics.provider_failures.inc();
                            debug!(%provider, %reason, "provider failed");
                            failures.push(Failure { provider, reason });
                            if failures.len() == total {
                                self.metrics.all_failed.inc();
                                warn!(%total, "all sources failed");
                                return Err(Error::AllSourcesFailed(Failures(failures)));
                            }
                        }
                    }
                },
            }
        }
    }
}

/// Translate a provider's head report into a [HeadSnapshot].
fn snapshot(info: HeadInfo) -> Result<HeadSnapshot, String> {
    if info.last_irreversible_block_num > info.head_block_num {
        return Err(format!(
            "last irreversible block {} above head {}",
            info.last_irreversible_block_num, info.head_block_num
        ));
    }
    let head_time = Timestamp::try_from(info.head_block_time).map_err(|err| err.to_string())?;
    Ok(HeadSnapshot {
        lib_num: info.last_irreversible_block_num,
        lib_id: info.last_irreversible_block_id,
        head_num: info.head_block_num,
        head_id: info.head_block_id,
        head_time,
    })
}
