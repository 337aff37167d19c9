//! Debounce-window batching of near-simultaneous item requests

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use hourglass_domain::{HourglassError, Result};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

/// Processor invoked once per flushed batch; must return one result per
/// input item, in input order.
pub type BatchProcessor<T, R> =
    Arc<dyn Fn(Vec<T>) -> BoxFuture<'static, Result<Vec<R>>> + Send + Sync>;

struct Queue<T, R> {
    items: Vec<T>,
    waiters: Vec<oneshot::Sender<Result<R>>>,
    /// Bumped on every submit; a pending flush only fires if its generation
    /// is still current, which is what makes the window a debounce.
    generation: u64,
}

impl<T, R> Queue<T, R> {
    fn new() -> Self {
        Self { items: Vec::new(), waiters: Vec::new(), generation: 0 }
    }
}

/// Accumulates items arriving within a short window into one processor call.
///
/// Each caller's future resolves with the result at its item's positional
/// index; a processor error rejects every caller in the batch. Used to
/// group per-date availability lookups into per-week upstream fetches.
pub struct Batcher<T, R> {
    queues: Arc<Mutex<HashMap<String, Queue<T, R>>>>,
}

impl<T, R> Batcher<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    pub fn new() -> Self {
        Self { queues: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Enqueue `item` under `queue_key` and await its individual result.
    ///
    /// The queue flushes once no new item has arrived for `delay`; the
    /// processor passed with the final submit of the window is the one that
    /// runs.
    pub async fn submit(
        &self,
        queue_key: &str,
        item: T,
        processor: BatchProcessor<T, R>,
        delay: Duration,
    ) -> Result<R> {
        let (tx, rx) = oneshot::channel();

        let generation = {
            let mut queues = self.queues.lock();
            let queue = queues.entry(queue_key.to_owned()).or_insert_with(Queue::new);
            queue.items.push(item);
            queue.waiters.push(tx);
            queue.generation += 1;
            queue.generation
        };

        let queues = Arc::clone(&self.queues);
        let key = queue_key.to_owned();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let flushed = {
                let mut map = queues.lock();
                // A later submit supersedes this timer
                match map.get(&key) {
                    Some(queue) if queue.generation == generation => map.remove(&key),
                    _ => None,
                }
            };
            let Some(queue) = flushed else { return };

            debug!(queue = %key, size = queue.items.len(), "flushing batch");
            Self::settle(queue, processor).await;
        });

        rx.await
            .map_err(|_| HourglassError::Internal("batch dropped without resolving".into()))?
    }

    async fn settle(queue: Queue<T, R>, processor: BatchProcessor<T, R>) {
        match processor(queue.items).await {
            Ok(results) => {
                let mut results: Vec<Option<R>> = results.into_iter().map(Some).collect();
                for (index, waiter) in queue.waiters.into_iter().enumerate() {
                    let outcome = results.get_mut(index).and_then(Option::take).ok_or_else(|| {
                        HourglassError::Internal(format!("no result for batch item {index}"))
                    });
                    let _ = waiter.send(outcome);
                }
            }
            Err(error) => {
                for waiter in queue.waiters {
                    let _ = waiter.send(Err(error.clone()));
                }
            }
        }
    }

    /// Number of queues currently accumulating.
    pub fn pending_queues(&self) -> usize {
        self.queues.lock().len()
    }
}

impl<T, R> Default for Batcher<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
