//! Synchronized LIFO stack of pending work units.
//!
//! The stack is the only queue in the pool: a mutex-guarded `Vec` plus a
//! condition variable, drained by workers and helping waiters alike. Units
//! are popped newest-first, which keeps descendants of a waited-on task
//! ahead of their ancestors.

use crate::task::PackagedTask;
use std::sync::{Condvar, Mutex};

struct StackState {
    tasks: Vec<PackagedTask>,
    terminating: bool,
}

pub(crate) struct TaskStack {
    state: Mutex<StackState>,
    wakeup: Condvar,
}

impl TaskStack {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(StackState {
                tasks: Vec::new(),
                terminating: false,
            }),
            wakeup: Condvar::new(),
        }
    }

    /// Pushes a work unit and wakes one waiting worker.
    ///
    /// Once termination has been signalled the unit is handed back to the
    /// caller instead.
    pub(crate) fn push(&self, task: PackagedTask) -> Result<(), PackagedTask> {
        let mut state = self.state.lock().unwrap();
        if state.terminating {
            return Err(task);
        }
        state.tasks.push(task);
        drop(state);

        self.wakeup.notify_one();
        Ok(())
    }

    /// Pops the most recently pushed unit, if any.
    pub(crate) fn pop(&self) -> Option<PackagedTask> {
        self.state.lock().unwrap().tasks.pop()
    }

    /// Blocks until a unit is available or the stack is shutting down.
    ///
    /// Remaining work is drained before shutdown is reported: `None` is
    /// returned only once termination has been signalled *and* the stack is
    /// empty.
    pub(crate) fn pop_or_wait(&self) -> Option<PackagedTask> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(task) = state.tasks.pop() {
                return Some(task);
            }
            if state.terminating {
                return None;
            }
            state = self.wakeup.wait(state).unwrap();
        }
    }

    /// Signals shutdown and wakes every waiting worker.
    pub(crate) fn signal_terminate(&self) {
        let mut state = self.state.lock().unwrap();
        state.terminating = true;
        drop(state);

        self.wakeup.notify_all();
    }

    pub(crate) fn is_terminating(&self) -> bool {
        self.state.lock().unwrap().terminating
    }
}

/// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{PackagedTask, Task};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn unit() -> (PackagedTask, Task) {
        PackagedTask::new(|| Ok(()))
    }

    #[test]
    fn pop_returns_units_in_lifo_order() {
        let stack = TaskStack::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for id in 0..3 {
            let order = order.clone();
            let (task, _handle) = PackagedTask::new(move || {
                order.lock().unwrap().push(id);
                Ok(())
            });
            assert!(stack.push(task).is_ok());
        }

        while let Some(task) = stack.pop() {
            task.run();
        }
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn pop_on_empty_stack_returns_none() {
        let stack = TaskStack::new();
        assert!(stack.pop().is_none());
    }

    #[test]
    fn push_is_refused_after_terminate() {
        let stack = TaskStack::new();
        stack.signal_terminate();
        assert!(stack.is_terminating());

        let (task, _handle) = unit();
        assert!(stack.push(task).is_err());
    }

    #[test]
    fn pop_or_wait_drains_remaining_work_before_shutdown() {
        let stack = TaskStack::new();
        let (first, _h1) = unit();
        let (second, _h2) = unit();
        assert!(stack.push(first).is_ok());
        assert!(stack.push(second).is_ok());

        stack.signal_terminate();
        assert!(stack.pop_or_wait().is_some());
        assert!(stack.pop_or_wait().is_some());
        assert!(stack.pop_or_wait().is_none());
    }

    #[test]
    fn pop_or_wait_wakes_on_push() {
        let stack = Arc::new(TaskStack::new());
        let popped = Arc::new(AtomicUsize::new(0));

        let waiter = {
            let stack = stack.clone();
            let popped = popped.clone();
            thread::spawn(move || {
                if stack.pop_or_wait().is_some() {
                    popped.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        thread::sleep(Duration::from_millis(50));
        let (task, _handle) = unit();
        assert!(stack.push(task).is_ok());

        waiter.join().unwrap();
        assert_eq!(popped.load(Ordering::SeqCst), 1);
    }
}
