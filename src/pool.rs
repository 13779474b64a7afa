use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;

/// Runs `work` once per item on at most `concurrency` concurrent workers.
///
/// Workers pull from a shared FIFO queue until it is empty. Each worker keeps
/// the outcomes it produced and hands them back when it finishes; the
/// outcomes are returned in input order once every worker is done. Failures
/// are expected to be encoded in `R` so one item cannot stop the batch.
pub async fn process_batch<T, R, F, Fut>(items: Vec<T>, concurrency: usize, work: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let total = items.len();
    let workers = concurrency.max(1).min(total);
    let queue = Arc::new(Mutex::new(
        items.into_iter().enumerate().collect::<VecDeque<_>>(),
    ));
    let work = Arc::new(work);

    let mut set = JoinSet::new();
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let work = Arc::clone(&work);
        set.spawn(async move {
            let mut outcomes = Vec::new();
            while let Some((index, item)) = pop_front(&queue) {
                outcomes.push((index, work(item).await));
            }
            outcomes
        });
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(outcomes) => results.extend(outcomes),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => tracing::error!(?err, "batch worker was cancelled"),
        }
    }

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, outcome)| outcome).collect()
}

fn pop_front<T>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    queue
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .pop_front()
}
