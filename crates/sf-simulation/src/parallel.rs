//! Bounded fan-out helpers.
//!
//! Every helper runs on the rayon pool but caps the number of concurrent
//! workers: items are split into at most `workers` contiguous runs (never
//! more runs than items), and each run is processed by one worker. No
//! ordering holds between items handled by different workers. A panic in a
//! callback propagates to the caller once the other workers have finished.

use rayon::prelude::*;

/// Worker count used when the caller has no better figure.
pub const DEFAULT_WORKERS: usize = 4;

/// Minimum run length that yields at most `workers` runs over `len` items.
fn run_length(len: usize, workers: usize) -> usize {
    let workers = workers.clamp(1, len.max(1));
    len.div_ceil(workers).max(1)
}

/// Call `f` once per item on at most `workers` concurrent workers.
pub fn for_each<T, F>(items: &[T], workers: usize, f: F)
where
    T: Sync,
    F: Fn(&T) + Send + Sync,
{
    if items.is_empty() {
        return;
    }
    items
        .par_iter()
        .with_min_len(run_length(items.len(), workers))
        .for_each(f);
}

/// Split `items` into batches of `batch_size` and hand each batch to `f`.
///
/// Batches run independently on at most `workers` workers; the items of one
/// batch are always handled together by a single call.
pub fn for_each_batch<T, F>(items: &[T], batch_size: usize, workers: usize, f: F)
where
    T: Sync,
    F: Fn(&[T]) + Send + Sync,
{
    if items.is_empty() {
        return;
    }
    let batch_size = batch_size.max(1);
    let batches = items.len().div_ceil(batch_size);
    items
        .par_chunks(batch_size)
        .with_min_len(run_length(batches, workers))
        .for_each(f);
}

/// Map every item through `f` concurrently; `out[i]` is `f(&items[i])`.
pub fn map<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Send + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    items
        .par_iter()
        .with_min_len(run_length(items.len(), workers))
        .map(f)
        .collect()
}

/// Call `f` only for items accepted by `keep`; rejected items are skipped
/// inside the worker that tested them.
pub fn for_each_where<T, P, F>(items: &[T], workers: usize, keep: P, f: F)
where
    T: Sync,
    P: Fn(&T) -> bool + Send + Sync,
    F: Fn(&T) + Send + Sync,
{
    if items.is_empty() {
        return;
    }
    items
        .par_iter()
        .with_min_len(run_length(items.len(), workers))
        .filter(|item| keep(item))
        .for_each(f);
}
