//! Fixed-size worker pool with a quiescence barrier.
//!
//! Jobs are fire-and-forget closures. The pool counts pending jobs: the count
//! goes up on `submit` and down once a job has finished and been dropped, and
//! `await_idle` returns when it reaches zero. Jobs may submit further jobs; the
//! barrier covers them as long as they are submitted before the count drains.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use crate::error::{Result, SearchError};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn increment(&self) {
        *self.count.lock() += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock();
        *count -= 1;
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

pub struct TaskPool {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    pending: Arc<Pending>,
    size: usize,
}

impl TaskPool {
    /// Start `workers` threads. A count of zero is treated as one.
    pub fn new(workers: usize) -> Result<Self> {
        let size = workers.max(1);
        let (sender, receiver) = unbounded::<Job>();
        let pending = Arc::new(Pending::default());

        let mut handles = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = receiver.clone();
            let pending = pending.clone();
            let handle = thread::Builder::new()
                .name(format!("minion-{id}"))
                .spawn(move || worker_loop(id, receiver, pending))
                .map_err(SearchError::Spawn)?;
            handles.push(handle);
        }
        tracing::debug!(workers = size, "task pool started");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            pending,
            size,
        })
    }

    pub fn workers(&self) -> usize {
        self.size
    }

    /// Number of submitted jobs that have not finished yet.
    pub fn pending(&self) -> usize {
        *self.pending.count.lock()
    }

    /// Queue a job and return immediately.
    ///
    /// Fails with [`SearchError::PoolClosed`] once `shutdown` has begun.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(SearchError::PoolClosed);
        };
        self.pending.increment();
        if sender.send(Box::new(job)).is_err() {
            self.pending.decrement();
            return Err(SearchError::PoolClosed);
        }
        Ok(())
    }

    /// Block until every submitted job has completed.
    ///
    /// Must not be called from inside a job: the calling worker would wait on
    /// its own completion.
    pub fn await_idle(&self) {
        let mut count = self.pending.count.lock();
        while *count > 0 {
            self.pending.idle.wait(&mut count);
        }
    }

    /// Let the workers drain the queue, then join them. Later calls do nothing.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);

        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            let name = handle.thread().name().map(str::to_owned);
            if handle.join().is_err() {
                tracing::error!(worker = ?name, "worker thread exited abnormally");
            }
        }
        tracing::debug!(workers = self.size, "task pool shut down");
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("workers", &self.size)
            .field("pending", &self.pending())
            .finish()
    }
}

fn worker_loop(id: usize, receiver: Receiver<Job>, pending: Arc<Pending>) {
    while let Ok(job) = receiver.recv() {
        // the closure and everything it captured is dropped inside catch_unwind
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            tracing::error!(worker = id, %reason, "job panicked");
        }
        pending.decrement();
    }
}
