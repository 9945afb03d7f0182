//! A small worker pool. Jobs are fanned out to worker threads over a channel
//! and results come back over a second channel to a single collector (the
//! calling thread), which puts them back in job order. Returning is the
//! barrier: no result is handed back before every job has finished.

use crossbeam_channel::unbounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Applies `f` to every job using up to `threads` workers and returns the
/// results in job order. If any job fails, workers stop picking up new jobs
/// and, of the jobs that ran, the earliest failure is returned.
pub fn map<T, R, E, F>(threads: usize, jobs: Vec<T>, f: F) -> Result<Vec<R>, E>
where
    T: Send,
    R: Send,
    E: Send,
    F: Fn(T) -> Result<R, E> + Sync,
{
    let threads = threads.min(jobs.len());
    if threads < 2 {
        return jobs.into_iter().map(f).collect();
    }

    let total = jobs.len();
    let (job_tx, job_rx) = unbounded::<(usize, T)>();
    let (result_tx, result_rx) = unbounded::<(usize, Result<R, E>)>();
    for job in jobs.into_iter().enumerate() {
        // the receiver is alive until the end of this function
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let failed = AtomicBool::new(false);
    thread::scope(|s| {
        for _ in 0..threads {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let (f, failed) = (&f, &failed);
            s.spawn(move || {
                for (i, job) in job_rx {
                    if failed.load(Ordering::Relaxed) {
                        break;
                    }
                    let result = f(job);
                    if result.is_err() {
                        failed.store(true, Ordering::Relaxed);
                    }
                    if result_tx.send((i, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut results: Vec<Option<R>> = (0..total).map(|_| None).collect();
        let mut first_error: Option<(usize, E)> = None;
        for (i, result) in result_rx {
            match result {
                Ok(r) => results[i] = Some(r),
                Err(e) => match &first_error {
                    Some((j, _)) if *j < i => {}
                    _ => first_error = Some((i, e)),
                },
            }
        }

        match first_error {
            Some((_, e)) => Err(e),
            // without an error every job ran to completion
            None => Ok(results.into_iter().flatten().collect()),
        }
    })
}
