//! Example: Basic usage of the isx-pool thread pool

use isx_pool::{ThreadPool, current_worker_id};
use std::time::Duration;

fn fib(n: u64) -> u64 {
    if n < 2 { n } else { fib(n - 1) + fib(n - 2) }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Create a pool with 4 worker threads
    let pool = ThreadPool::builder()
        .worker_threads(4)
        .thread_name("demo")
        .on_thread_start(|id| println!("worker {id} ready"))
        .build();

    // Submit tasks and collect their results
    let futures: Vec<_> = (20..30).map(|n| pool.enqueue_with(fib, (n,))).collect();
    for (n, future) in (20..30).zip(futures) {
        println!("fib({n}) = {:?}", future.wait());
    }

    // A panicking task is reported through its future
    let failed = pool.enqueue(|| -> u64 { panic!("no answer") });
    println!("failed task: {:?}", failed.wait());

    // Fire-and-forget tasks, then wait for all of them
    for i in 0..8 {
        pool.enqueue_detach(move || {
            std::thread::sleep(Duration::from_millis(10));
            println!("detached {i} ran on worker {:?}", current_worker_id());
        });
    }
    pool.wait_for_tasks();

    // Dropping the pool joins every worker
}
