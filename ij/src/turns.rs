//! Deferred turn queue
//!
//! Work that must not run on the caller's stack (waiter drainage, join
//! targets) is pushed here and run later, either by an explicit `settle()`
//! or by a notifier task woken through `Notify`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

/// A unit of deferred work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// FIFO queue of deferred jobs
pub struct Turns {
    queue: Mutex<VecDeque<Job>>,
    notify: Notify,
}

impl Turns {
    pub fn new() -> Self {
        debug!("Turns::new: called");
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a job to run on a later turn
    pub fn defer(&self, job: impl FnOnce() + Send + 'static) {
        let depth = {
            let mut queue = self.lock();
            queue.push_back(Box::new(job));
            queue.len()
        };
        debug!(depth, "Turns::defer: queued");
        self.notify.notify_one();
    }

    /// Number of jobs waiting to run
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Run the oldest queued job, if any
    ///
    /// The queue lock is released before the job runs, so jobs may defer
    /// further jobs.
    pub fn run_next(&self) -> bool {
        let job = self.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run jobs until the queue is empty, including jobs queued along the way
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        if ran > 0 {
            debug!(ran, "Turns::run_until_idle: drained");
        }
        ran
    }

    /// Spawn a task that drains the queue whenever work is deferred
    ///
    /// Must be called from within a tokio runtime. The task runs until aborted.
    pub fn spawn_notifier(self: &Arc<Self>) -> JoinHandle<()> {
        debug!("Turns::spawn_notifier: called");
        let turns = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                turns.run_until_idle();
                turns.notify.notified().await;
            }
        })
    }
}

impl Default for Turns {
    fn default() -> Self {
        Self::new()
    }
}
