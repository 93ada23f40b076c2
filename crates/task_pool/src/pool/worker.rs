//! Worker threads: long-lived drainers of a pool's task stack.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::pool::PoolInner;

/// Spawns a named worker thread that drains `pool`'s stack until shutdown.
pub(crate) fn spawn(index: u64, pool: Arc<PoolInner>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("task-pool-worker-{}", index))
        .spawn(move || run(&pool))
        .with_context(|| format!("Failed to spawn worker thread {}", index))
}

/// Runs work units to completion until termination is signalled and no work
/// remains. Workers never observe the handles of the units they run; statuses
/// are published through the units themselves.
fn run(pool: &PoolInner) {
    while let Some(task) = pool.stack.pop_or_wait() {
        task.run();
    }
}
