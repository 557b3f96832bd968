//! Bounded-concurrency iteration over asynchronous steps

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Run `step` over every item with at most `max_parallel` steps in flight.
///
/// Steps are started in item order as capacity frees up; completion order is
/// unconstrained. The call resolves only after every step has finished, and
/// results come back in item order. A cap of zero is treated as one.
pub async fn for_each_parallel<T, R, F, Fut>(items: Vec<T>, max_parallel: usize, step: F) -> Vec<R>
where
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = R>,
{
    let mut completed: Vec<(usize, R)> = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| {
            let fut = step(index, item);
            async move { (index, fut.await) }
        })
        .buffer_unordered(max_parallel.max(1))
        .collect()
        .await;

    completed.sort_by_key(|&(index, _)| index);
    completed.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_each_item_runs_exactly_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();

        let results = for_each_parallel(vec![10, 20, 30, 40], 2, |index, item| {
            let calls = calls_clone.clone();
            async move {
                calls.lock().unwrap().push((index, item));
                item + 1
            }
        })
        .await;

        assert_eq!(results, vec![11, 21, 31, 41]);

        let mut calls = calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec![(0, 10), (1, 20), (2, 30), (3, 40)]);
    }

    #[tokio::test]
    async fn test_parallelism_cap_is_respected() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..10).collect();
        let running_clone = running.clone();
        let peak_clone = peak.clone();

        for_each_parallel(items, 3, |_, _| {
            let running = running_clone.clone();
            let peak = peak_clone.clone();
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert_eq!(running.load(Ordering::SeqCst), 0);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_starts_respect_item_order() {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let starts_clone = starts.clone();

        for_each_parallel((0..6).collect(), 1, |index, _item: usize| {
            let starts = starts_clone.clone();
            async move {
                starts.lock().unwrap().push(index);
            }
        })
        .await;

        assert_eq!(*starts.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_results_keep_item_order_despite_completion_order() {
        // Later items finish first; results still come back by index
        let results = for_each_parallel(vec![4u64, 3, 2, 1], 4, |index, item| async move {
            tokio::time::sleep(Duration::from_millis(item * 10)).await;
            index
        })
        .await;

        assert_eq!(results, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_input_completes_without_steps() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let invoked_clone = invoked.clone();

        let results: Vec<()> = for_each_parallel(Vec::<u32>::new(), 4, |_, _| {
            let invoked = invoked_clone.clone();
            async move {
                invoked.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(results.is_empty());
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_cap_is_clamped_to_one() {
        let results = for_each_parallel(vec![1, 2, 3], 0, |_, item| async move { item * 2 }).await;
        assert_eq!(results, vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn test_cap_larger_than_input() {
        let results = for_each_parallel(vec![5, 6], 16, |_, item| async move { item }).await;
        assert_eq!(results, vec![5, 6]);
    }
}
