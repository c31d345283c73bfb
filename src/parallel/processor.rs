use anyhow::{Result, anyhow};
use crossbeam::channel::{Receiver, Sender, bounded};
use std::io;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Configuration for parallel processing
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Maximum number of worker threads
    pub max_workers: usize,
    /// Channel buffer size multiplier (buffer = workers * multiplier)
    pub channel_buffer_multiplier: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_workers: default_worker_count(),
            channel_buffer_multiplier: 2,
        }
    }
}

impl ParallelConfig {
    pub fn with_workers(max_workers: usize) -> Self {
        Self {
            max_workers,
            ..Self::default()
        }
    }
}

/// Two workers per detected CPU core, or one when the core count is unknown.
///
/// Workers mostly sit blocked on child processes, so oversubscribing the
/// cores is fine.
pub fn default_worker_count() -> usize {
    workers_for_parallelism(std::thread::available_parallelism())
}

fn workers_for_parallelism(detected: io::Result<NonZeroUsize>) -> usize {
    detected.map_or(1, |cores| cores.get() * 2)
}

/// Bounded worker pool that maps a function over work items
pub struct ParallelProcessor {
    config: ParallelConfig,
}

impl ParallelProcessor {
    pub fn new(config: ParallelConfig) -> Self {
        Self { config }
    }

    /// Number of workers actually started for `work_count` items
    pub fn worker_count(&self, work_count: usize) -> usize {
        std::cmp::min(self.config.max_workers.max(1), work_count.max(1))
    }

    /// Apply `worker_fn` to every item with at most `max_workers` running
    /// at once and return the results in input order.
    ///
    /// Items are tagged with their index on the way in and slotted back by
    /// index on the way out, so completion order does not matter. The call
    /// blocks until every item is processed. It fails only if a worker
    /// thread cannot be spawned or panics.
    ///
    /// `progress` is called with `(completed, total)` after each item.
    pub fn process<T, R, F, P>(
        &self,
        work_items: Vec<T>,
        worker_fn: F,
        progress: Option<P>,
    ) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
        P: Fn(usize, usize) + Sync,
    {
        let work_count = work_items.len();
        if work_count == 0 {
            return Ok(Vec::new());
        }

        let workers = self.worker_count(work_count);
        let buffer = workers * self.config.channel_buffer_multiplier.max(1);
        let completed = AtomicUsize::new(0);
        let worker_fn = &worker_fn;
        let progress = progress.as_ref();
        let completed = &completed;

        let slots = crossbeam::thread::scope(|s| -> Result<Vec<Option<R>>> {
            let (work_tx, work_rx): (Sender<(usize, T)>, Receiver<(usize, T)>) = bounded(buffer);
            let (result_tx, result_rx): (Sender<(usize, R)>, Receiver<(usize, R)>) =
                bounded(buffer);

            for worker_id in 0..workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();

                s.builder()
                    .name(format!("worker-{worker_id}"))
                    .spawn(move |_| {
                        while let Ok((index, work_item)) = work_rx.recv() {
                            let result = worker_fn(work_item);
                            if result_tx.send((index, result)).is_err() {
                                break; // Collector dropped
                            }

                            let current = completed.fetch_add(1, Ordering::Relaxed) + 1;
                            if let Some(report) = progress {
                                report(current, work_count);
                            }
                        }
                    })
                    .map_err(|e| anyhow!("Failed to spawn worker thread {worker_id}: {e}"))?;
            }
            drop(work_rx);

            // Producer: feed work to the pool
            s.builder()
                .name("producer".to_string())
                .spawn(move |_| {
                    for item in work_items.into_iter().enumerate() {
                        if work_tx.send(item).is_err() {
                            break; // Workers dropped
                        }
                    }
                })
                .map_err(|e| anyhow!("Failed to spawn producer thread: {e}"))?;

            // Drop our sender so the collector stops once every worker exits
            drop(result_tx);

            Ok(collect_results(result_rx, work_count))
        })
        .map_err(|_| anyhow!("Thread panic occurred during parallel processing"))??;

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| anyhow!("No result produced for work item {index}"))
            })
            .collect()
    }
}

/// Collect results into a pre-sized vector indexed by input position
fn collect_results<R>(result_rx: Receiver<(usize, R)>, total_work: usize) -> Vec<Option<R>> {
    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total_work).collect();

    while let Ok((index, result)) = result_rx.recv() {
        slots[index] = Some(result);
    }

    slots
}
