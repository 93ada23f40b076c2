use task_pool::ThreadPool;

/// Creates a pool initialized at the given concurrency level, with a test
/// tracing subscriber installed so pool error logs land in the test output.
pub fn init_pool(concurrency: u64) -> ThreadPool {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut pool = ThreadPool::new();
    pool.init(concurrency).expect("pool init failed");
    pool
}
