//! Bounded task runner
//!
//! Executes a collection of independent work items with at most `limit` in
//! flight. Admission waits on a semaphore permit; a cancellation observed
//! while waiting (or between items) stops all further launches, while items
//! already in flight run to their own abort point. The runner returns only
//! after every launched item has been joined, and aggregates nothing — items
//! report their own progress through the shared phase counters.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub(crate) async fn run_bounded<T, F, Fut>(
    items: Vec<T>,
    limit: usize,
    cancel: &CancellationToken,
    work: F,
) where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks: JoinSet<()> = JoinSet::new();

    for item in items {
        if cancel.is_cancelled() {
            break;
        }

        let permit = tokio::select! {
            permit = semaphore.clone().acquire_owned() => {
                match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                }
            }
            () = cancel.cancelled() => break,
        };

        let fut = work(item);
        tasks.spawn(async move {
            let _permit = permit;
            fut.await;
        });
    }

    // Launched items are never orphaned, cancelled run or not.
    while tasks.join_next().await.is_some() {}
}
