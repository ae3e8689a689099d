//! Bounded parallel execution over independent work items.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Apply `f` to every item using at most `limit` worker threads, returning
/// results in item order.
///
/// Items are claimed through a shared counter, so workers stay busy however
/// uneven the per-item cost is. Result order is restored afterwards: the
/// output never depends on execution order.
pub fn parallel_map<T, R, F>(items: &[T], limit: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    let n = items.len();
    if n == 0 {
        return Vec::new();
    }
    let workers = limit.max(1).min(n);

    let next = AtomicUsize::new(0);
    let collected: Mutex<Vec<(usize, R)>> = Mutex::new(Vec::with_capacity(n));

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let idx = next.fetch_add(1, Ordering::SeqCst);
                if idx >= n {
                    break;
                }
                let result = f(idx, &items[idx]);
                if let Ok(mut out) = collected.lock() {
                    out.push((idx, result));
                }
            });
        }
    });

    // A worker panic propagates out of the scope above, so the vector is
    // complete here.
    let mut results = collected.into_inner().unwrap_or_default();
    results.sort_by_key(|(idx, _)| *idx);
    debug_assert_eq!(results.len(), n);
    results.into_iter().map(|(_, r)| r).collect()
}
