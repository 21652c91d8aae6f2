use std::thread;

use crossbeam_channel::unbounded;

use crate::constants::MAX_WORKERS;

/// Number of cores the machine reports, 1 when unknown
pub fn available_cpus() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Default pool size for `jobs` independent captures
pub fn worker_count(jobs: usize) -> usize {
    available_cpus().min(MAX_WORKERS).min(jobs).max(1)
}

/// Apply `f` to every item on a bounded pool of scoped worker threads
///
/// Indices are handed out through a shared job queue; each worker owns its
/// own state and sends `(index, result)` back. The returned vector is sorted
/// by index, so the output order never depends on scheduling.
pub fn parallel_map<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<(usize, R)>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    let workers = workers.clamp(1, items.len().max(1));
    let (job_tx, job_rx) = unbounded::<usize>();
    let (result_tx, result_rx) = unbounded::<(usize, R)>();

    for index in 0..items.len() {
        // Receiver is alive in this scope
        let _ = job_tx.send(index);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let f = &f;
            scope.spawn(move || {
                for index in job_rx.iter() {
                    if result_tx.send((index, f(index, &items[index]))).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut results: Vec<(usize, R)> = result_rx.iter().collect();
    results.sort_by_key(|(index, _)| *index);
    results
}
