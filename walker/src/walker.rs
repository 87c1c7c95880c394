use crate::{Config, Error, Index, Reason};
use finality_types::BlockRef;
use tracing::{debug, error};

/// Walks an [Index] backward from a fork top to the irreversible chain.
pub struct Walker<I: Index> {
    index: I,
    cfg: Config,
}

impl<I: Index> Walker<I> {
    pub fn new(index: I, cfg: Config) -> Self {
        Self { index, cfg }
    }

    /// Collect the reversible ancestors of `fork_top` (itself included when reversible), most
    /// recent first, stopping at (and excluding) the first irreversible ancestor.
    pub async fn reconcile(&self, fork_top: &BlockRef) -> Result<Vec<BlockRef>, Error<I::Error>> {
        let mut next = fork_top.clone();
        let mut window = self.cfg.initial_window;
        let mut ancestors = Vec::new();
        let mut iteration = 0;
        loop {
            if iteration >= self.cfg.max_iterations {
                error!(
                    next_id = next.id(),
                    next_num = next.num(),
                    iteration,
                    "stopping after too many iterations"
                );
                return Err(Error::NotFound(Reason::TooManyIterations(iteration)));
            }

            let rows = self
                .index
                .list_blocks(next.num(), window)
                .await
                .map_err(Error::Index)?;
            for row in rows {
                if row.num() < next.num() {
                    debug!(
                        next_id = next.id(),
                        next_num = next.num(),
                        row_num = row.num(),
                        "index skipped expected height"
                    );
                    return Err(Error::NotFound(Reason::Gap {
                        expected: next.num(),
                        found: row.num(),
                    }));
                }
                if row.id() != next.id() {
                    continue;
                }
                if row.irreversible {
                    debug!(
                        fork_top = %fork_top,
                        reconciled = %row.block,
                        ancestors = ancestors.len(),
                        "reached irreversible chain"
                    );
                    return Ok(ancestors);
                }
                next = BlockRef::from_id(row.previous_id.as_str())?;
                debug!(found = %row.block, next = %next, "found reversible block");
                ancestors.push(row.block);
            }

            if window <= self.cfg.window_growth_limit {
                window += self.cfg.window_growth;
            }
            iteration += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use commonware_macros::test_traced;
    use commonware_runtime::{deterministic, Runner};
    use finality_types::IndexRow;
    use std::{
        convert::Infallible,
        sync::{Arc, Mutex},
    };

    fn id(num: u64, branch: &str) -> String {
        format!("{num:08x}{branch}")
    }

    fn row(num: u64, branch: &str, previous: &str, irreversible: bool) -> IndexRow {
        IndexRow {
            block: BlockRef::new(id(num, branch), num),
            previous_id: id(num - 1, previous),
            irreversible,
        }
    }

    /// A linear chain `1..=head` on branch "a" where every block at or below `lib` is final.
    fn chain(head: u64, lib: u64) -> Memory {
        let mut index = Memory::new();
        for num in 1..=head {
            index.insert(row(num, "a", "a", num <= lib));
        }
        index
    }

    fn nums(blocks: &[BlockRef]) -> Vec<u64> {
        blocks.iter().map(BlockRef::num).collect()
    }

    /// Records the `(high, limit)` arguments of every page fetched from the wrapped index.
    struct Recording {
        inner: Memory,
        calls: Arc<Mutex<Vec<(u64, usize)>>>,
    }

    impl Index for Recording {
        type Error = Infallible;

        async fn list_blocks(
            &self,
            high: u64,
            limit: usize,
        ) -> Result<Vec<IndexRow>, Self::Error> {
            self.calls.lock().unwrap().push((high, limit));
            self.inner.list_blocks(high, limit).await
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("index unavailable")]
    struct Unavailable;

    struct Broken;

    impl Index for Broken {
        type Error = Unavailable;

        async fn list_blocks(&self, _: u64, _: usize) -> Result<Vec<IndexRow>, Self::Error> {
            Err(Unavailable)
        }
    }

    #[test_traced]
    fn test_clean_chain() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let walker = Walker::new(chain(10, 5), Config::default());
            let top = BlockRef::new(id(10, "a"), 10);
            let ancestors = walker.reconcile(&top).await.unwrap();
            assert_eq!(nums(&ancestors), vec![10, 9, 8, 7, 6]);
            for pair in ancestors.windows(2) {
                assert_eq!(pair[0].num(), pair[1].num() + 1);
            }
            assert_eq!(ancestors[0], top);
        });
    }

    #[test_traced]
    fn test_irreversible_fork_top() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let walker = Walker::new(chain(10, 10), Config::default());
            let top = BlockRef::new(id(10, "a"), 10);
            assert!(walker.reconcile(&top).await.unwrap().is_empty());
        });
    }

    #[test_traced]
    fn test_follows_matching_branch() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            // Dead branch "b" forks off block 6 and is listed before "a" at each height.
            let mut index = Memory::new();
            for num in 1..=6 {
                index.insert(row(num, "a", "a", num <= 5));
            }
            index.insert(row(7, "b", "a", false));
            index.insert(row(7, "a", "a", false));
            index.insert(row(8, "b", "b", false));
            index.insert(row(8, "a", "a", false));
            index.insert(row(9, "b", "b", false));
            index.insert(row(9, "a", "a", false));
            index.insert(row(10, "a", "a", false));
            let walker = Walker::new(index, Config::default());

            let ancestors = walker
                .reconcile(&BlockRef::new(id(10, "a"), 10))
                .await
                .unwrap();
            let expected = vec![
                BlockRef::new(id(10, "a"), 10),
                BlockRef::new(id(9, "a"), 9),
                BlockRef::new(id(8, "a"), 8),
                BlockRef::new(id(7, "a"), 7),
                BlockRef::new(id(6, "a"), 6),
            ];
            assert_eq!(ancestors, expected);

            let ancestors = walker
                .reconcile(&BlockRef::new(id(9, "b"), 9))
                .await
                .unwrap();
            let expected = vec![
                BlockRef::new(id(9, "b"), 9),
                BlockRef::new(id(8, "b"), 8),
                BlockRef::new(id(7, "b"), 7),
                BlockRef::new(id(6, "a"), 6),
            ];
            assert_eq!(ancestors, expected);
        });
    }

    #[test_traced]
    fn test_missing_predecessor() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let mut index = Memory::new();
            for num in (1..=10).filter(|num| *num != 7) {
                index.insert(row(num, "a", "a", num <= 5));
            }
            let walker = Walker::new(index, Config::default());
            let result = walker.reconcile(&BlockRef::new(id(10, "a"), 10)).await;
            assert!(matches!(
                result,
                Err(Error::NotFound(Reason::Gap {
                    expected: 7,
                    found: 6
                }))
            ));
        });
    }

    #[test_traced]
    fn test_unknown_fork_top_in_empty_index() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let walker = Walker::new(Memory::new(), Config::default());
            let result = walker.reconcile(&BlockRef::new(id(10, "a"), 10)).await;
            assert!(matches!(
                result,
                Err(Error::NotFound(Reason::TooManyIterations(1_000)))
            ));
        });
    }

    #[test_traced]
    fn test_cyclic_index_terminates() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            // Two reversible blocks at the same height pointing at each other never reconnect.
            let mut index = Memory::new();
            index.insert(IndexRow {
                block: BlockRef::new(id(10, "a"), 10),
                previous_id: id(10, "b"),
                irreversible: false,
            });
            index.insert(IndexRow {
                block: BlockRef::new(id(10, "b"), 10),
                previous_id: id(10, "a"),
                irreversible: false,
            });
            let walker = Walker::new(index, Config::default());
            let result = walker.reconcile(&BlockRef::new(id(10, "a"), 10)).await;
            assert!(matches!(
                result,
                Err(Error::NotFound(Reason::TooManyIterations(1_000)))
            ));
        });
    }

    #[test_traced]
    fn test_window_grows_until_limit() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let index = Recording {
                inner: chain(1_000, 600),
                calls: calls.clone(),
            };
            let cfg = Config {
                initial_window: 95,
                ..Config::default()
            };
            let walker = Walker::new(index, cfg);
            let ancestors = walker
                .reconcile(&BlockRef::new(id(1_000, "a"), 1_000))
                .await
                .unwrap();
            assert_eq!(ancestors.len(), 400);

            // Each page starts at the block being searched for, which is the one just below the
            // lowest row of the previous page.
            let calls = calls.lock().unwrap().clone();
            assert_eq!(
                calls,
                vec![(1_000, 95), (905, 100), (805, 105), (700, 105)]
            );
        });
    }

    #[test_traced]
    fn test_default_window_growth() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let index = Recording {
                inner: chain(100, 50),
                calls: calls.clone(),
            };
            let walker = Walker::new(index, Config::default());
            walker
                .reconcile(&BlockRef::new(id(100, "a"), 100))
                .await
                .unwrap();
            let limits = calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, limit)| *limit)
                .collect::<Vec<_>>();
            assert_eq!(limits, vec![10, 15, 20, 25]);
        });
    }

    #[test_traced]
    fn test_index_error_passthrough() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let walker = Walker::new(Broken, Config::default());
            let result = walker.reconcile(&BlockRef::new(id(10, "a"), 10)).await;
            assert!(matches!(result, Err(Error::Index(Unavailable))));
        });
    }

    #[test_traced]
    fn test_invalid_previous_id() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let mut index = Memory::new();
            index.insert(IndexRow {
                block: BlockRef::new(id(10, "a"), 10),
                previous_id: "bogus".to_string(),
                irreversible: false,
            });
            let walker = Walker::new(index, Config::default());
            let result = walker.reconcile(&BlockRef::new(id(10, "a"), 10)).await;
            assert!(matches!(result, Err(Error::InvalidId(_))));
        });
    }
}
