use isx_pool::PoolBuilder;
use isx_pool::config::{Config, LoggingConfig, MAX_WORKING_THREADS_ENV, ThreadPoolConfig};
use isx_pool::error::ConfigError;
use isx_pool::log::SeverityFilter;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

/// Writes `contents` to a file unique to this test process.
fn temp_config(name: &str, contents: &str) -> PathBuf {
    let path = env::temp_dir().join(format!("isx-pool-{}-{name}.json", process::id()));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_parse_full_document() {
    let config = Config::from_json(
        r#"{
            "root": {
                "logging": { "filename": "pool.log", "LogLevel": 1, "flush": 1 },
                "threadpool": { "maxworkingthreads": 6 }
            }
        }"#,
    )
    .unwrap();

    assert_eq!(
        config.logging(),
        LoggingConfig {
            filename: String::from("pool.log"),
            log_level: SeverityFilter::ProdWarnErr,
            flush: true,
        }
    );
    assert_eq!(config.thread_pool().max_working_threads, 6);
}

#[test]
fn test_missing_sections_use_defaults() {
    let config = Config::from_json(r#"{ "root": {} }"#).unwrap();

    assert_eq!(config.logging, None);
    assert_eq!(config.thread_pool, None);
    assert_eq!(config.logging(), LoggingConfig::default());
    assert_eq!(config.thread_pool(), ThreadPoolConfig::default());
    assert_eq!(config.thread_pool().max_working_threads, 10);
    assert_eq!(config.logging().filename, "serverlog.txt");
    assert_eq!(config.logging().log_level, SeverityFilter::Debug);
}

#[test]
fn test_missing_keys_use_defaults() {
    let config = Config::from_json(r#"{ "root": { "logging": { "LogLevel": 3 } } }"#).unwrap();
    let logging = config.logging();

    assert_eq!(logging.log_level, SeverityFilter::Trace);
    assert_eq!(logging.filename, "serverlog.txt");
    assert!(!logging.flush);
}

#[test]
fn test_unknown_sections_are_ignored() {
    let config = Config::from_json(
        r#"{
            "root": {
                "server": { "port": 8080 },
                "threadpool": { "maxworkingthreads": 2 }
            }
        }"#,
    )
    .unwrap();

    assert_eq!(config.thread_pool().max_working_threads, 2);
}

#[test]
fn test_flush_accepts_int_or_bool() {
    let parse = |flush: &str| {
        let text = format!(r#"{{ "root": {{ "logging": {{ "flush": {flush} }} }} }}"#);
        Config::from_json(&text).unwrap().logging().flush
    };

    assert!(parse("1"));
    assert!(parse("true"));
    assert!(!parse("0"));
    assert!(!parse("false"));
}

#[test]
fn test_log_level_out_of_range_is_rejected() {
    let result = Config::from_json(r#"{ "root": { "logging": { "LogLevel": 7 } } }"#);
    assert!(result.is_err());
}

#[test]
fn test_missing_root_is_rejected() {
    assert!(Config::from_json(r#"{ "threadpool": { "maxworkingthreads": 2 } }"#).is_err());
}

#[test]
fn test_load_from_file() {
    let path = temp_config(
        "load",
        r#"{ "root": { "threadpool": { "maxworkingthreads": 3 } } }"#,
    );

    let config = Config::load(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(config.thread_pool().max_working_threads, 3);
}

#[test]
fn test_load_missing_file_yields_defaults() {
    let path = env::temp_dir().join(format!("isx-pool-{}-absent.json", process::id()));

    let config = Config::load(&path).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_malformed_file_is_parse_error() {
    let path = temp_config("malformed", r#"{ "root": { "threadpool": "#);

    let result = Config::load(&path);
    fs::remove_file(&path).unwrap();

    match result {
        Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn test_load_zero_threads_is_invalid() {
    let path = temp_config(
        "zero",
        r#"{ "root": { "threadpool": { "maxworkingthreads": 0 } } }"#,
    );

    let result = Config::load(&path);
    fs::remove_file(&path).unwrap();

    assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
}

#[test]
fn test_env_overrides_thread_count() {
    let mut config = Config::from_json(r#"{ "root": {} }"#).unwrap();

    // SAFETY: no other test in this binary reads or writes the environment.
    unsafe { env::set_var(MAX_WORKING_THREADS_ENV, "5") };
    let applied = config.apply_env();

    unsafe { env::set_var(MAX_WORKING_THREADS_ENV, "many") };
    let rejected = config.clone().apply_env();

    unsafe { env::remove_var(MAX_WORKING_THREADS_ENV) };

    applied.unwrap();
    assert_eq!(config.thread_pool().max_working_threads, 5);
    assert!(matches!(rejected, Err(ConfigError::InvalidValue(_))));
}

#[test]
fn test_builder_from_config() {
    let config = Config::from_json(r#"{ "root": { "threadpool": { "maxworkingthreads": 3 } } }"#)
        .unwrap();

    let pool = PoolBuilder::from_config(&config.thread_pool()).build();
    assert_eq!(pool.size(), 3);
    assert_eq!(pool.enqueue(|| "configured").wait(), Ok("configured"));
}
