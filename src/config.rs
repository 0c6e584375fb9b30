//! Harness configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `CROSSRUNNER_*` environment variables. Command line flags are applied on
//! top by the binary through the `with_*` setters.

use std::path::{Path, PathBuf};
use std::thread;

use serde::{Deserialize, Serialize};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "CROSSRUNNER";

/// Config file looked up in the current directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "crossrunner";

/// First port handed out to a pair.
pub const DEFAULT_BASE_PORT: u16 = 9000;

/// Default location the failure log is moved to when a run fails.
pub const DEFAULT_ARTIFACT_PATH: &str = "/testing/artifacts/unexpected_failures.log";

/// Configuration for a harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory pairs run relative to. The log directory lives here too.
    pub work_dir: PathBuf,
    /// Log directory, relative to `work_dir` unless absolute.
    pub log_dir: PathBuf,
    /// File name of the failure log inside `log_dir`.
    pub failure_log_name: String,
    /// Where the failure log is moved when at least one pair failed.
    pub artifact_path: PathBuf,
    /// Port assigned to the first dispatched pair.
    pub base_port: u16,
    /// Number of workers. 0 means twice the available parallelism.
    pub workers: usize,
    /// Whether console output may use colour.
    pub color: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            log_dir: PathBuf::from("log"),
            failure_log_name: "unexpected_failures.log".to_string(),
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            base_port: DEFAULT_BASE_PORT,
            workers: 0,
            color: true,
        }
    }
}

impl HarnessConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the layered configuration.
    ///
    /// `file` is required when given; otherwise `crossrunner.toml` in the
    /// current directory is used if present.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file_source = match file {
            Some(path) => config::File::from(path.to_path_buf()).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        config::Config::builder()
            .add_source(file_source)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Absolute-or-relative path of the log directory.
    pub fn log_dir_path(&self) -> PathBuf {
        self.work_dir.join(&self.log_dir)
    }

    /// Path of the failure log for this run.
    pub fn failure_log_path(&self) -> PathBuf {
        self.log_dir_path().join(&self.failure_log_name)
    }

    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        let parallelism = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        parallelism * 2
    }

    /// Set the directory pairs run relative to.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Set the log directory.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Set where a failing run's log is moved.
    pub fn with_artifact_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = path.into();
        self
    }

    /// Set the first port handed out.
    pub fn with_base_port(mut self, port: u16) -> Self {
        self.base_port = port;
        self
    }

    /// Set the worker count; 0 picks one from the CPU count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enable or disable colour.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}
