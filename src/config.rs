//! File-based configuration.
//!
//! The configuration document is JSON with every section nested under a
//! top-level `root` object:
//!
//! ```json
//! {
//!   "root": {
//!     "logging":    { "filename": "serverlog.txt", "LogLevel": 2, "flush": 0 },
//!     "threadpool": { "maxworkingthreads": 10 }
//!   }
//! }
//! ```
//!
//! Missing sections and keys fall back to their defaults. Sections this
//! crate does not use (server, communication settings, timers) are ignored.

use crate::error::ConfigError;
use crate::log::SeverityFilter;

use std::env;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Deserializer};

/// Environment variable overriding [`ThreadPoolConfig::max_working_threads`].
pub const MAX_WORKING_THREADS_ENV: &str = "ISX_MAX_WORKING_THREADS";

#[derive(Debug, Deserialize)]
struct Document {
    root: Config,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: Option<LoggingConfig>,

    #[serde(default, rename = "threadpool")]
    pub thread_pool: Option<ThreadPoolConfig>,
}

/// Settings of the async log pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file written by file sinks.
    pub filename: String,

    /// Which severities reach the sink.
    #[serde(rename = "LogLevel")]
    pub log_level: SeverityFilter,

    /// Flush the sink after every drained batch.
    #[serde(deserialize_with = "int_or_bool")]
    pub flush: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filename: "serverlog.txt".to_string(),
            log_level: SeverityFilter::Debug,
            flush: false,
        }
    }
}

/// Settings of the thread pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThreadPoolConfig {
    #[serde(rename = "maxworkingthreads")]
    pub max_working_threads: usize,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            max_working_threads: 10,
        }
    }
}

impl Config {
    /// Loads the configuration from a JSON file.
    ///
    /// A file that does not exist yields the default configuration and a
    /// warning. Unreadable files and malformed documents are errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Parses a configuration document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let document: Document = serde_json::from_str(text)?;
        let config = document.root;

        if config.logging.is_none() {
            tracing::warn!(section = "logging", "config section missing, using defaults");
        }
        if config.thread_pool.is_none() {
            tracing::warn!(section = "threadpool", "config section missing, using defaults");
        }

        Ok(config)
    }

    /// Logging settings, defaulted when the section is missing.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Thread pool settings, defaulted when the section is missing.
    pub fn thread_pool(&self) -> ThreadPoolConfig {
        self.thread_pool.clone().unwrap_or_default()
    }

    /// Applies overrides from the environment.
    ///
    /// Reads [`MAX_WORKING_THREADS_ENV`]; an unparsable value is an error.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        let Ok(value) = env::var(MAX_WORKING_THREADS_ENV) else {
            return Ok(());
        };

        let threads = value.trim().parse::<usize>().map_err(|_| {
            ConfigError::InvalidValue(format!("{MAX_WORKING_THREADS_ENV}={value}"))
        })?;

        self.thread_pool
            .get_or_insert_with(ThreadPoolConfig::default)
            .max_working_threads = threads;

        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_pool().max_working_threads == 0 {
            return Err(ConfigError::InvalidValue(
                "maxworkingthreads must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Accepts `0` / `1` as well as `false` / `true`.
fn int_or_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(flag) => flag,
        Flag::Int(n) => n != 0,
    })
}
