//! Background chunk prefetch.
//!
//! One worker thread services every stream: sources push
//! `(job, chunk_index)` requests onto a condvar-parked FIFO, the worker
//! reads the chunk into the job's next-buffer and publishes it through
//! the ready flag. The audio thread never touches the queue lock — it
//! only swaps the finished buffer out.
//!
//! Dropping the [`Prefetcher`] sets the stop flag, wakes the worker, and
//! joins it; requests already queued are drained first.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use crate::source::StreamJob;

#[derive(Debug)]
struct Request {
    job: Arc<StreamJob>,
    index: u32,
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<VecDeque<Request>>,
    ready: Condvar,
    stop: AtomicBool,
}

impl Shared {
    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<Request>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the single background prefetch worker.
pub struct Prefetcher {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Prefetcher {
    /// Starts the worker thread.
    #[must_use]
    pub fn new() -> Self {
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::spawn(move || worker_loop(&worker_shared));
        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// A handle sources use to queue requests.
    pub(crate) fn handle(&self) -> PrefetchHandle {
        PrefetchHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for Prefetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.ready.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Cloneable queue endpoint held by each [`FileStreamSource`](crate::FileStreamSource).
#[derive(Debug)]
pub(crate) struct PrefetchHandle {
    shared: Arc<Shared>,
}

impl PrefetchHandle {
    /// Queues chunk `index` of `job`, dropping duplicate requests.
    pub fn push(&self, job: Arc<StreamJob>, index: u32) {
        {
            let mut queue = self.shared.lock_queue();
            let duplicate = queue
                .iter()
                .any(|r| Arc::ptr_eq(&r.job, &job) && r.index == index);
            if !duplicate {
                queue.push_back(Request { job, index });
            }
        }
        self.shared.ready.notify_one();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let request = {
            let mut queue = shared.lock_queue();
            loop {
                if let Some(request) = queue.pop_front() {
                    break request;
                }
                if shared.stop.load(Ordering::Acquire) {
                    return;
                }
                queue = shared
                    .ready
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let mut next = request.job.lock_next();
        match request.job.read_chunk(request.index, &mut next) {
            Ok(()) => {
                drop(next);
                request.job.publish_next(request.index);
                tracing::trace!(chunk = request.index, "prefetched streaming chunk");
            }
            Err(error) => {
                drop(next);
                if !request.job.failed.swap(true, Ordering::AcqRel) {
                    tracing::warn!(chunk = request.index, %error, "prefetch failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_joins_the_worker() {
        let prefetcher = Prefetcher::new();
        drop(prefetcher);
    }

    #[test]
    fn default_matches_new() {
        let prefetcher = Prefetcher::default();
        drop(prefetcher);
    }
}
