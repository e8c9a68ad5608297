use futures::stream::{self, StreamExt};
use std::future::Future;

/// Run `work` for every item with at most `limit` futures in flight.
///
/// Results come back in completion order, not input order. A unit of work
/// that can fail should encode the failure in its own output so one bad item
/// never cancels its siblings. A `limit` of zero is treated as one.
pub async fn run_bounded<I, T, R, F, Fut>(items: I, limit: usize, work: F) -> Vec<R>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
{
    stream::iter(items)
        .map(work)
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_every_item() {
        let mut results = run_bounded(1..=20, 4, |n| async move { n * 2 }).await;
        results.sort();
        assert_eq!(results, (1..=20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        run_bounded(0..30, 3, |_| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_results_in_completion_order() {
        let delays = vec![(0usize, 60u64), (1, 1), (2, 30)];
        let results = run_bounded(delays, 3, |(key, delay)| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            key
        })
        .await;
        assert_eq!(results, vec![1, 2, 0]);
    }

    #[tokio::test]
    async fn test_failure_is_per_item() {
        let results: Vec<Result<u32, String>> = run_bounded(0..5u32, 2, |n| async move {
            if n == 2 {
                Err(format!("item {} failed", n))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(results.len(), 5);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    }

    #[tokio::test]
    async fn test_zero_limit_still_runs() {
        let results = run_bounded(vec!["a", "b"], 0, |s| async move { s.len() }).await;
        assert_eq!(results.len(), 2);
    }
}
