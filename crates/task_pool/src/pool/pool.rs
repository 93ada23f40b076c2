//! The `ThreadPool` facade: submission, re-entrant waiting, and shutdown.

use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::error;

use super::registry;
use super::stack::TaskStack;
use super::worker;
use crate::task::{PackagedTask, Task};

/// State shared between the pool facade, its workers, and the registry.
pub(crate) struct PoolInner {
    pub(crate) stack: TaskStack,
}

impl PoolInner {
    pub(crate) fn new() -> Self {
        Self {
            stack: TaskStack::new(),
        }
    }
}

/// A thread pool whose waiters keep working.
///
/// Any thread that waits on a [`Task`] through one of the `wait_*` routines
/// services pending work from the same pool instead of blocking, so tasks may
/// recursively submit child tasks and wait on them without exhausting the
/// pool's concurrency. See the [module docs](super) for the full protocol.
///
/// A fresh pool is uninitialized (`concurrency() == 0`) and rejects all
/// submissions until [`ThreadPool::init`] succeeds.
pub struct ThreadPool {
    /// Configured degree of parallelism; `0` until `init` succeeds.
    concurrency_level: u64,
    workers: Vec<thread::JoinHandle<()>>,
    inner: Arc<PoolInner>,
}

/// The machine's available parallelism, for callers that want
/// `pool.init(default_concurrency())`.
pub fn default_concurrency() -> u64 {
    thread::available_parallelism()
        .map(|n| n.get() as u64)
        .unwrap_or(1)
}

impl ThreadPool {
    /// Creates an uninitialized pool.
    pub fn new() -> Self {
        Self {
            concurrency_level: 0,
            workers: Vec::new(),
            inner: Arc::new(PoolInner::new()),
        }
    }

    /// Spawns the pool's workers and opens it for submissions.
    ///
    /// One fewer thread than `concurrency_level` is spawned: the thread
    /// calling the `wait_*` routines services tasks alongside the workers and
    /// contributes the remaining unit of parallelism.
    ///
    /// On a spawn failure every already-spawned worker is joined and the pool
    /// is left in its pre-`init` state.
    pub fn init(&mut self, concurrency_level: u64) -> Result<()> {
        if concurrency_level == 0 {
            return Err(anyhow!(
                "Unable to initialize a thread pool with a concurrency level of 0."
            ));
        }
        if self.concurrency_level != 0 {
            return Err(anyhow!(
                "Thread pool is already initialized with a concurrency level of {}.",
                self.concurrency_level
            ));
        }

        let num_workers = concurrency_level - 1;
        for i in 0..num_workers {
            match worker::spawn(i, Arc::clone(&self.inner)) {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    self.terminate();
                    self.inner = Arc::new(PoolInner::new());
                    return Err(e.context(format!(
                        "Failed to initialize a thread pool with a concurrency level of {}",
                        concurrency_level
                    )));
                }
            }
        }

        // Workers are indexed before any task can reach them: submissions
        // are rejected until `concurrency_level` is stored below.
        registry::register(&self.worker_ids(), &self.inner);
        self.concurrency_level = concurrency_level;
        Ok(())
    }

    /// The configured concurrency level; `0` means uninitialized.
    pub fn concurrency(&self) -> u64 {
        self.concurrency_level
    }

    /// Submits a work unit and returns its completion handle.
    ///
    /// Submission to an uninitialized or terminated pool is non-fatal: it
    /// logs an error and returns an invalid handle, and the caller decides.
    pub fn submit<F>(&self, func: F) -> Task
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        if self.concurrency_level == 0 {
            error!("cannot submit a task to an uninitialized thread pool");
            return Task::invalid();
        }

        // With a concurrency level above 1 at least one worker is available
        // to pick the unit up. At a concurrency level of 1 no workers exist,
        // so the unit runs on the submitting thread before `submit` returns.
        if self.concurrency_level > 1 {
            let (unit, task) = PackagedTask::new(func);
            match self.inner.stack.push(unit) {
                Ok(()) => task,
                Err(_) => {
                    error!("cannot submit a task to a terminated thread pool");
                    Task::invalid()
                }
            }
        } else {
            if self.inner.stack.is_terminating() {
                error!("cannot submit a task to a terminated thread pool");
                return Task::invalid();
            }
            let (unit, task) = PackagedTask::new(func);
            unit.run();
            task
        }
    }

    /// Blocks until `task` completes and returns its status, servicing
    /// pending work from this thread's host pool while it waits.
    ///
    /// The host pool is the pool whose worker set contains the current
    /// thread; threads that are not workers of any pool drain this pool's
    /// stack. Units are popped in LIFO order so that descendants of the
    /// awaited task finish before their ancestors block.
    pub fn wait_one(&self, task: Task) -> Result<()> {
        while !task.done() {
            let host = registry::lookup(thread::current().id())
                .unwrap_or_else(|| Arc::clone(&self.inner));

            match host.stack.pop() {
                Some(unit) => unit.run(),
                // Nothing left to help with: the awaited unit is already
                // running on some other thread, so block on its handle.
                None => break,
            }
        }
        task.get()
    }

    /// Waits on every handle and returns the first non-`Ok` status in input
    /// order.
    ///
    /// All handles are drained even when an error is encountered, so the
    /// remaining tasks still run to completion.
    pub fn wait_all(&self, tasks: Vec<Task>) -> Result<()> {
        for status in self.wait_all_status(tasks) {
            status?;
        }
        Ok(())
    }

    /// Waits on every handle and collects the per-task statuses in input
    /// order.
    ///
    /// Invalid handles yield a synthetic "invalid task future" error and
    /// never block.
    pub fn wait_all_status(&self, tasks: Vec<Task>) -> Vec<Result<()>> {
        let mut statuses = Vec::with_capacity(tasks.len());
        for task in tasks {
            if !task.is_valid() {
                error!("waiting on an invalid task future");
                statuses.push(Err(anyhow!("invalid task future")));
                continue;
            }

            let status = self.wait_one(task);
            if let Err(e) = &status {
                error!("task completed with an error: {:#}", e);
            }
            statuses.push(status);
        }
        statuses
    }

    /// Shuts the pool down: wakes every worker, lets them drain the
    /// already-scheduled work, and joins them.
    ///
    /// Idempotent. Subsequent submissions return invalid handles. Also
    /// invoked on drop.
    pub fn terminate(&mut self) {
        self.inner.stack.signal_terminate();

        // Entries come out of the registry before the join so that a waiter
        // helping a terminating pool falls through to blocking on its own
        // handle once the stack runs dry.
        registry::unregister(&self.worker_ids());

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }

    fn worker_ids(&self) -> Vec<ThreadId> {
        self.workers.iter().map(|w| w.thread().id()).collect()
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.terminate();
    }
}
