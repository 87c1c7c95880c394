//! A [crate::Provider] that answers after a configurable latency.

use crate::HeadInfo;
use commonware_runtime::Clock;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, UNIX_EPOCH},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct Error(pub String);

#[derive(Clone)]
pub struct Provider<E: Clock + Clone + Send + Sync + 'static> {
    context: E,
    name: String,
    latency: Duration,
    block_id: Result<String, String>,
    head: Result<HeadInfo, String>,
    calls: Arc<AtomicUsize>,
}

impl<E: Clock + Clone + Send + Sync + 'static> Provider<E> {
    pub fn new(context: E, name: &str, latency: Duration) -> Self {
        Self {
            context,
            name: name.to_string(),
            latency,
            block_id: Err("no block id".to_string()),
            head: Err("no head".to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_block_id(mut self, block_id: Result<&str, &str>) -> Self {
        self.block_id = block_id.map(str::to_string).map_err(str::to_string);
        self
    }

    pub fn with_head(mut self, head: Result<HeadInfo, &str>) -> Self {
        self.head = head.map_err(str::to_string);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl<E: Clock + Clone + Send + Sync + 'static> crate::Provider for Provider<E> {
    type Error = Error;

    fn name(&self) -> String {
        self.name.clone()
    }

    async fn block_id(&self, _num: u64) -> Result<String, Self::Error> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.context.sleep(self.latency).await;
        self.block_id.clone().map_err(Error)
    }

    async fn head_info(&self) -> Result<HeadInfo, Self::Error> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.context.sleep(self.latency).await;
        self.head.clone().map_err(Error)
    }
}

/// A well-formed head where the last irreversible block trails the head by `lag` blocks.
pub fn head(head_num: u64, lag: u64) -> HeadInfo {
    let lib_num = head_num - lag;
    HeadInfo {
        last_irreversible_block_num: lib_num,
        last_irreversible_block_id: format!("{lib_num:08x}lib"),
        head_block_num: head_num,
        head_block_id: format!("{head_num:08x}head"),
        head_block_time: UNIX_EPOCH + Duration::from_secs(1_600_000_000),
    }
}
