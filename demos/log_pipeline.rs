//! Example: Asynchronous log pipeline driven by a config file

use isx_pool::PoolBuilder;
use isx_pool::config::Config;
use isx_pool::log::{AsyncLogger, ConsoleSink};
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Falls back to defaults when the file is missing
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let mut config = match Config::load(&path) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            return;
        }
    };
    if let Err(error) = config.apply_env() {
        eprintln!("{error}");
        return;
    }

    let pool = Arc::new(PoolBuilder::from_config(&config.thread_pool()).build());
    let logger = AsyncLogger::new(&config.logging(), ConsoleSink::new(), pool.clone());

    println!("log filter: {}", logger.filter().label());

    for i in 0..4 {
        let logger = logger.clone();
        pool.enqueue_detach(move || {
            logger.trace(format!("task {i} tracing"));
            logger.debug(format!("task {i} debugging"));
            logger.prod(format!("task {i} done"));
        });
    }

    pool.wait_for_tasks();
    logger.warning("shutting down");
}
