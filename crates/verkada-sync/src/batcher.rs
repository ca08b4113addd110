use futures::future::join_all;
use std::future::Future;
use tracing::debug;

pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Run `op` over `items` in consecutive groups of `batch_size`.
///
/// Members of a group run concurrently and the next group starts only once every member has
/// settled. Nothing is cancelled when a member fails: `op` reports failure through `R`.
/// Results come back in input order.
pub async fn run_batched<T, R, F, Fut>(items: Vec<T>, batch_size: usize, op: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let mut results = Vec::with_capacity(items.len());
    for_each_batch(items, batch_size, op, |settled| results.extend(settled)).await;
    results
}

/// Like [`run_batched`], but hands each group's results to `on_settled` before the next group
/// starts.
pub async fn for_each_batch<T, R, F, Fut, S>(items: Vec<T>, batch_size: usize, op: F, mut on_settled: S)
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
    S: FnMut(Vec<R>),
{
    let batch_size = batch_size.max(1);
    let total = items.len();
    let mut items = items.into_iter().peekable();
    let mut group = 0usize;

    while items.peek().is_some() {
        let batch: Vec<_> = items.by_ref().take(batch_size).map(&op).collect();
        debug!(group, size = batch.len(), total, "running batch");
        on_settled(join_all(batch).await);
        group += 1;
    }
}
