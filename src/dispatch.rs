//! Fixed-size worker pools with bounded request queues.
//!
//! A [`QueryDispatcher`] owns `workers` threads that all pull from one shared
//! request queue of capacity `queue_capacity` (1 by default). Each request
//! carries its own single-use reply channel. When every worker is busy and
//! the queue is full, [`QueryDispatcher::submit`] blocks the caller; that is
//! the only backpressure, nothing is ever dropped.
//!
//! ```text
//!   submit ──▶ [ bounded queue ] ──▶ worker 0 ─┐
//!                                 ├─▶ worker 1 ─┼─▶ reply (one per query)
//!                                 └─▶ worker N ─┘
//! ```

use crossbeam_channel::{bounded, Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::{Engine, Error, Result};

/// A unit of work a dispatcher worker runs against the engine.
pub trait Job: Send + 'static {
    type Output: Send + 'static;

    /// Execute the query. Each call gets fresh cursor and error state.
    fn run(&self, engine: &Engine) -> Result<Self::Output>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

struct Envelope<J: Job> {
    job: J,
    reply: Sender<Result<J::Output>>,
}

/// Pending response to a submitted query.
pub struct Reply<T> {
    rx: Receiver<Result<T>>,
}

impl<T> Reply<T> {
    /// Block until the worker responds.
    pub fn wait(self) -> Result<T> {
        self.rx.recv().unwrap_or(Err(Error::DispatcherClosed))
    }

    /// Block for at most `timeout`; `None` if the worker has not answered yet.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Some(Err(Error::DispatcherClosed))
            }
        }
    }
}

/// Counters shared by a dispatcher's workers.
#[derive(Debug, Default)]
pub struct DispatcherStats {
    served: AtomicU64,
    failed: AtomicU64,
}

impl DispatcherStats {
    /// Queries answered with a result.
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// Queries answered with an error.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Worker pool serialising access to one dataset.
pub struct QueryDispatcher<J: Job> {
    name: &'static str,
    requests: Option<Sender<Envelope<J>>>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<DispatcherStats>,
}

impl<J: Job> QueryDispatcher<J> {
    /// Start `workers` threads sharing a queue of `queue_capacity` requests.
    pub fn new(
        name: &'static str,
        engine: Arc<Engine>,
        workers: usize,
        queue_capacity: usize,
    ) -> Result<Self> {
        if workers == 0 {
            return Err(Error::Config(format!("{} dispatcher needs at least one worker", name)));
        }

        let (tx, rx) = bounded::<Envelope<J>>(queue_capacity.max(1));
        let stats = Arc::new(DispatcherStats::default());

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            // All workers share one MPMC queue
            let requests = rx.clone();
            let engine = Arc::clone(&engine);
            let stats = Arc::clone(&stats);

            let handle = thread::Builder::new()
                .name(format!("{}-worker-{}", name, id))
                .spawn(move || run_worker(name, id, &engine, requests, &stats))?;
            handles.push(handle);
        }

        log::info!(
            "Started {} dispatcher: {} workers, queue capacity {}",
            name,
            workers,
            queue_capacity.max(1)
        );

        Ok(Self {
            name,
            requests: Some(tx),
            workers: handles,
            stats,
        })
    }

    /// Enqueue a query, blocking while the queue is full.
    pub fn submit(&self, job: J) -> Result<Reply<J::Output>> {
        let requests = self.requests.as_ref().ok_or(Error::DispatcherClosed)?;
        let (reply, rx) = bounded(1);

        requests
            .send(Envelope { job, reply })
            .map_err(|_| Error::DispatcherClosed)?;
        Ok(Reply { rx })
    }

    /// Submit and wait for the response.
    pub fn query(&self, job: J) -> Result<J::Output> {
        self.submit(job)?.wait()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn stats(&self) -> &DispatcherStats {
        &self.stats
    }

    /// Stop accepting queries and wait for in-flight ones to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Closing the queue ends each worker's receive loop
        self.requests.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("{} worker exited abnormally", self.name);
            }
        }
    }
}

impl<J: Job> Drop for QueryDispatcher<J> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<J: Job>(
    name: &str,
    id: usize,
    engine: &Engine,
    requests: Receiver<Envelope<J>>,
    stats: &DispatcherStats,
) {
    while let Ok(Envelope { job, reply }) = requests.recv() {
        let label = job.describe();
        log::debug!("{} worker {} serving {}", name, id, label);

        let result = panic::catch_unwind(AssertUnwindSafe(|| job.run(engine)))
            .unwrap_or_else(|payload| Err(Error::WorkerPanicked(panic_message(payload.as_ref()))));

        match result {
            Ok(_) => {
                stats.served.fetch_add(1, Ordering::Relaxed);
            }
            Err(ref e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                if e.is_operational() || matches!(e, Error::WorkerPanicked(_)) {
                    log::warn!("{} query {} failed: {}", name, label, e);
                } else {
                    log::debug!("{} query {} rejected: {}", name, label, e);
                }
            }
        }

        // The caller may have stopped waiting
        if reply.send(result).is_err() {
            log::debug!("{} reply for {} dropped: caller went away", name, label);
        }
    }
    log::debug!("{} worker {} stopped", name, id);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
