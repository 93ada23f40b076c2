//! Process-wide index from worker threads to the pool that owns them.
//!
//! The wait routines consult this index to decide which pool's stack a
//! blocked thread should help drain. A worker of pool A that waits on a task
//! owned by pool B must keep draining pool A, so the index is keyed by
//! `ThreadId` rather than held in thread-local storage: a pool's terminate
//! path has to remove entries for threads other than the calling one.
//!
//! Threads that are not workers of any pool (application threads, plain
//! submitters) have no entry; `lookup` returns `None` for them and the wait
//! routines fall back to the pool being waited on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread::ThreadId;

use super::pool::PoolInner;

static POOL_INDEX: OnceLock<Mutex<HashMap<ThreadId, Weak<PoolInner>>>> = OnceLock::new();

fn index() -> &'static Mutex<HashMap<ThreadId, Weak<PoolInner>>> {
    POOL_INDEX.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Indexes `pool` under every given worker thread id.
pub(crate) fn register(threads: &[ThreadId], pool: &Arc<PoolInner>) {
    let mut index = index().lock().unwrap();
    for thread in threads {
        index.insert(*thread, Arc::downgrade(pool));
    }
}

/// Removes the entries for the given worker thread ids.
pub(crate) fn unregister(threads: &[ThreadId]) {
    let mut index = index().lock().unwrap();
    for thread in threads {
        index.remove(thread);
    }
}

/// The pool whose worker set contains `thread`, if any.
pub(crate) fn lookup(thread: ThreadId) -> Option<Arc<PoolInner>> {
    index().lock().unwrap().get(&thread).and_then(Weak::upgrade)
}
