//! Re-entrant thread pool.
//!
//! A [`ThreadPool`] runs fallible work units on a fixed set of worker
//! threads. What sets it apart from a textbook pool is the wait path: a
//! thread that waits on a submitted task keeps pulling work from the same
//! pool instead of blocking, so tasks may recursively submit child tasks and
//! wait on them. A naive pool deadlocks once every worker is blocked inside
//! such a wait; this one keeps making forward progress.
//!
//! # Architecture Overview
//!
//! ```text
//!   submitters ──► ThreadPool::submit ──► TaskStack (LIFO, mutex + condvar)
//!                                              │
//!                      ┌───────────────────────┼────────────────┐
//!                      ▼                       ▼                ▼
//!                  worker 0     ...       worker n-2      helping waiter
//!                      │                       │          (any thread in
//!                      ▼                       ▼            a wait_* call)
//!                 PackagedTask::run ──► Task handle completed
//! ```
//!
//! - The pool spawns `concurrency_level - 1` workers; the thread calling the
//!   `wait_*` routines contributes the remaining unit of parallelism.
//! - The stack is popped newest-first, so a helping waiter always takes the
//!   deepest outstanding work and awaited ancestors make progress.
//! - A process-wide registry maps worker threads to their pool: a worker of
//!   pool A that waits on a task of pool B still drains pool A, which keeps
//!   each pool's concurrency bound intact.
//!
//! # Module Structure
//!
//! ```text
//! src/pool/
//! ├── mod.rs        # Public API exports + architecture docs
//! ├── pool.rs       # ThreadPool facade: init/submit/wait/terminate
//! ├── stack.rs      # Synchronized LIFO stack of pending work units
//! ├── registry.rs   # Process-wide worker-thread → pool index
//! └── worker.rs     # Worker thread spawn and drain loop
//! ```
//!
//! # Example Usage
//!
//! ## Submit and wait
//! ```ignore
//! let mut pool = ThreadPool::new();
//! pool.init(default_concurrency())?;
//!
//! let tasks: Vec<_> = tiles
//!     .into_iter()
//!     .map(|tile| pool.submit(move || process(tile)))
//!     .collect();
//! pool.wait_all(tasks)?;
//! ```
//!
//! ## Recursive submission
//! ```ignore
//! let pool = Arc::new(pool);
//! let p = Arc::clone(&pool);
//! let parent = pool.submit(move || {
//!     let children: Vec<_> = attrs.iter().map(|a| p.submit(read_attr(a))).collect();
//!     p.wait_all(children) // the parent's thread helps run its children
//! });
//! pool.wait_one(parent)?;
//! ```

mod pool;
mod registry;
mod stack;
mod worker;

pub use pool::{default_concurrency, ThreadPool};
