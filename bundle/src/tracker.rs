//! Locate the current head of the chain.

use crate::{codec::Decoder, Error, List};
use finality_types::{bundle, BlockRef};
use std::future::Future;
use tracing::debug;

/// Reports the most recent block known to exist.
pub trait Tracker: Send + Sync + 'static {
    fn head(&self) -> impl Future<Output = Result<BlockRef, Error>> + Send;
}

/// A [Tracker] that always reports the same head.
#[derive(Clone, Debug)]
pub struct Fixed(pub BlockRef);

impl Tracker for Fixed {
    async fn head(&self) -> Result<BlockRef, Error> {
        Ok(self.0.clone())
    }
}

/// A [Tracker] that reports the last block of the highest bundle in a store.
#[derive(Clone)]
pub struct Latest<S: List> {
    store: S,
    max_block_size: usize,
}

impl<S: List> Latest<S> {
    pub fn new(store: S, max_block_size: usize) -> Self {
        Self {
            store,
            max_block_size,
        }
    }
}

impl<S: List> Tracker for Latest<S> {
    async fn head(&self) -> Result<BlockRef, Error> {
        let base = self
            .store
            .list()
            .await?
            .iter()
            .filter_map(|name| bundle::parse(name))
            .max()
            .ok_or_else(|| Error::Tracker("no bundles in store".to_string()))?;
        let name = bundle::name(base);
        debug!(base = %name, "reading head from latest bundle");

        let mut decoder = Decoder::new(self.store.open(&name).await?, self.max_block_size);
        let mut last = None;
        while let Some(block) = decoder.next().await? {
            last = Some(block);
        }
        let block = last.ok_or_else(|| Error::Tracker(format!("bundle {name} is empty")))?;
        Ok(BlockRef::new(block.id, block.number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codec, store::Memory, Block};
    use bytes::Bytes;
    use commonware_macros::test_traced;
    use commonware_runtime::{deterministic, Runner};

    fn blocks(range: std::ops::Range<u64>) -> Vec<Block> {
        range
            .map(|number| Block {
                id: format!("{number:08x}aa"),
                number,
                ..Default::default()
            })
            .collect()
    }

    #[test_traced]
    fn test_latest_bundle() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let store = Memory::new();
            store.put("0000000000", codec::encode(&blocks(0..100)));
            store.put("0000000100", codec::encode(&blocks(100..142)));
            store.put("unrelated", Bytes::from_static(b"x"));

            let tracker = Latest::new(store, 1024);
            let head = tracker.head().await.unwrap();
            assert_eq!(head, BlockRef::new("0000008daa", 141));
        });
    }

    #[test_traced]
    fn test_no_bundles() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let tracker = Latest::new(Memory::new(), 1024);
            assert!(matches!(tracker.head().await, Err(Error::Tracker(_))));
        });
    }

    #[test_traced]
    fn test_empty_bundle() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let store = Memory::new();
            store.put("0000000200", codec::encode(&[]));
            let tracker = Latest::new(store, 1024);
            assert!(matches!(tracker.head().await, Err(Error::Tracker(_))));
        });
    }
}
