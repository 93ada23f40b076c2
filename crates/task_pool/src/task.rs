//! Task futures for submitted work units.
//!
//! `ThreadPool::submit` splits every work unit in two: the caller keeps a
//! [`Task`] (the completion handle), while the pool owns a `PackagedTask`
//! (the closure plus the shared completion record). Whichever thread ends up
//! running the closure - a worker or a helping waiter - consumes the
//! `PackagedTask` and publishes the status through the shared record.
//!
//! A `Task` returned from a failed submission (pool uninitialized or
//! terminated) carries no record at all. Such a handle is *invalid*: it
//! reports itself as done, never blocks, and yields a synthetic
//! "invalid task future" error.

use anyhow::{anyhow, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};

/// Progress of a submitted work unit.
///
/// Transitions are monotonic: `Pending -> Running -> Completed`. Exactly one
/// thread performs the `Pending -> Running` transition because running
/// consumes the `PackagedTask`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Pending,
    Running,
    Completed,
}

struct TaskRecord {
    stage: Stage,
    result: Option<Result<()>>,
}

/// Completion record shared between a `Task` and its `PackagedTask`.
struct TaskState {
    record: Mutex<TaskRecord>,
    completed: Condvar,
}

impl TaskState {
    fn new() -> Self {
        Self {
            record: Mutex::new(TaskRecord {
                stage: Stage::Pending,
                result: None,
            }),
            completed: Condvar::new(),
        }
    }
}

/// Completion handle for a submitted work unit.
///
/// Handles are move-only: the status of a task is read exactly once, by
/// whoever consumes the handle with [`Task::get`] (directly or through one of
/// the pool's `wait_*` routines).
pub struct Task {
    state: Option<Arc<TaskState>>,
}

impl Task {
    /// A handle with no backing work unit, returned from failed submissions.
    pub(crate) fn invalid() -> Self {
        Self { state: None }
    }

    /// Whether this handle is backed by a submitted work unit.
    pub fn is_valid(&self) -> bool {
        self.state.is_some()
    }

    /// Whether the work unit has finished executing.
    ///
    /// Invalid handles report `true`: there is nothing to wait for, and no
    /// wait path may block on them.
    pub fn done(&self) -> bool {
        match &self.state {
            Some(state) => state.record.lock().unwrap().stage == Stage::Completed,
            None => true,
        }
    }

    /// Blocks until the work unit has finished executing.
    pub fn wait(&self) {
        if let Some(state) = &self.state {
            let mut record = state.record.lock().unwrap();
            while record.stage != Stage::Completed {
                record = state.completed.wait(record).unwrap();
            }
        }
    }

    /// Blocks until the work unit has finished, then returns its status.
    pub fn get(self) -> Result<()> {
        let state = match self.state {
            Some(state) => state,
            None => return Err(anyhow!("invalid task future")),
        };

        let mut record = state.record.lock().unwrap();
        while record.stage != Stage::Completed {
            record = state.completed.wait(record).unwrap();
        }
        record
            .result
            .take()
            .unwrap_or_else(|| Err(anyhow!("task status already consumed")))
    }
}

/// A work unit owned by the pool: the user closure plus the completion record
/// it must fill in.
pub(crate) struct PackagedTask {
    func: Box<dyn FnOnce() -> Result<()> + Send + 'static>,
    state: Arc<TaskState>,
}

impl PackagedTask {
    /// Packages a closure with a fresh completion record and returns both
    /// halves.
    pub(crate) fn new<F>(func: F) -> (Self, Task)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let state = Arc::new(TaskState::new());
        let packaged = Self {
            func: Box::new(func),
            state: Arc::clone(&state),
        };
        (packaged, Task { state: Some(state) })
    }

    /// Runs the closure to completion and publishes its status.
    ///
    /// A panicking closure is converted into an error status; failures never
    /// cross the thread boundary.
    pub(crate) fn run(self) {
        let Self { func, state } = self;

        {
            let mut record = state.record.lock().unwrap();
            debug_assert_eq!(record.stage, Stage::Pending);
            record.stage = Stage::Running;
        }

        let result = match panic::catch_unwind(AssertUnwindSafe(func)) {
            Ok(status) => status,
            Err(payload) => Err(anyhow!("task panicked: {}", panic_message(payload.as_ref()))),
        };

        let mut record = state.record.lock().unwrap();
        record.stage = Stage::Completed;
        record.result = Some(result);
        drop(record);
        state.completed.notify_all();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn invalid_future_is_done_and_errors() {
        let task = Task::invalid();
        assert!(!task.is_valid());
        assert!(task.done());
        task.wait(); // must not block
        let err = task.get().unwrap_err();
        assert!(err.to_string().contains("invalid task future"));
    }

    #[test]
    fn run_completes_the_handle() {
        let (unit, task) = PackagedTask::new(|| Ok(()));
        assert!(task.is_valid());
        assert!(!task.done());

        unit.run();
        assert!(task.done());
        assert!(task.get().is_ok());
    }

    #[test]
    fn error_status_is_preserved() {
        let (unit, task) = PackagedTask::new(|| Err(anyhow!("boom")));
        unit.run();
        assert_eq!(task.get().unwrap_err().to_string(), "boom");
    }

    #[test]
    fn panic_is_converted_to_error_status() {
        let (unit, task) = PackagedTask::new(|| panic!("exploded"));
        unit.run();
        let err = task.get().unwrap_err();
        assert!(err.to_string().contains("exploded"));
    }

    #[test]
    fn wait_blocks_until_completion() {
        let (unit, task) = PackagedTask::new(|| Ok(()));
        let runner = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            unit.run();
        });

        task.wait();
        assert!(task.done());
        runner.join().unwrap();
    }
}
