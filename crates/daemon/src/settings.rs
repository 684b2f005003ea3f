//! Daemon settings
//!
//! Layered: built-in defaults, then an optional TOML file
//! (`WAITLINE_CONFIG` or `~/.waitline/config.toml`), then `WAITLINE_*`
//! environment variables with `__` between sections
//! (e.g. `WAITLINE_RPC__PORT=9600`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use waitline_core::application::constants::{
    DEFAULT_DAY_COUNT_CHECK_INTERVAL, DEFAULT_RESET_HOUR, DEFAULT_RESET_TIME_ZONE,
    DEFAULT_RETRY_BACKOFF_FACTOR, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_ATTEMPTS,
};
use waitline_core::application::RetryPolicy;
use waitline_core::domain::{DailyBoundary, QueuePolicy};

const DEFAULT_CONFIG_PATH: &str = "~/.waitline/config.toml";
const DEFAULT_DB_PATH: &str = "~/.waitline/waitline.db";
const ENV_PREFIX: &str = "WAITLINE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub database: DatabaseSection,
    pub rpc: RpcSection,
    pub queue: QueueSection,
    pub day_count: DayCountSection,
    pub retry: RetrySection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// File path or `:memory:`
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSection {
    pub host: String,
    pub port: u16,
    pub rate_limit_burst: u32,
    pub rate_limit_per_sec: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSection {
    pub notify_threshold: u64,
    pub refresh_interval_secs: u64,
    pub store_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayCountSection {
    pub reset_hour: u32,
    pub time_zone: String,
    pub check_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    pub format: LogFormat,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let queue = QueuePolicy::default();
        let rpc = waitline_api_rpc::RpcServerConfig::default();
        Self {
            database: DatabaseSection {
                path: DEFAULT_DB_PATH.to_string(),
            },
            rpc: RpcSection {
                host: rpc.host,
                port: rpc.port,
                rate_limit_burst: rpc.rate_limit_burst,
                rate_limit_per_sec: rpc.rate_limit_per_sec,
            },
            queue: QueueSection {
                notify_threshold: queue.notify_threshold,
                refresh_interval_secs: queue.refresh_interval.as_secs(),
                store_timeout_ms: queue.store_timeout.as_millis() as u64,
            },
            day_count: DayCountSection {
                reset_hour: DEFAULT_RESET_HOUR,
                time_zone: DEFAULT_RESET_TIME_ZONE.to_string(),
                check_interval_secs: DEFAULT_DAY_COUNT_CHECK_INTERVAL.as_secs(),
            },
            retry: RetrySection {
                base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
                backoff_factor: DEFAULT_RETRY_BACKOFF_FACTOR,
                max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            },
            logging: LoggingSection {
                format: LogFormat::Pretty,
            },
        }
    }
}

impl DaemonConfig {
    /// Load from the config file and process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(format!("{ENV_PREFIX}_CONFIG"))
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = PathBuf::from(shellexpand::tilde(&path).into_owned());

        let mut config = Self::from_sources(Some(&path), environment())?;

        // Shorthand kept for parity with the logging docs
        if let Ok(format) = std::env::var(format!("{ENV_PREFIX}_LOG_FORMAT")) {
            config.logging.format = match format.as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            };
        }
        Ok(config)
    }

    fn from_sources(file: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&Self::default()).context("Invalid default configuration")?,
        );
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file).required(false));
        }

        let config: Self = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.daily_boundary()?;
        anyhow::ensure!(self.queue.refresh_interval_secs > 0, "queue.refresh_interval_secs must be > 0");
        anyhow::ensure!(self.queue.store_timeout_ms > 0, "queue.store_timeout_ms must be > 0");
        anyhow::ensure!(
            self.day_count.check_interval_secs > 0,
            "day_count.check_interval_secs must be > 0"
        );
        Ok(())
    }

    pub fn database_path(&self) -> String {
        shellexpand::tilde(&self.database.path).into_owned()
    }

    pub fn daily_boundary(&self) -> Result<DailyBoundary> {
        DailyBoundary::new(self.day_count.reset_hour, &self.day_count.time_zone)
            .context("Invalid day_count settings")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.base_delay_ms,
            self.retry.backoff_factor,
            self.retry.max_attempts,
        )
    }

    pub fn queue_policy(&self) -> QueuePolicy {
        QueuePolicy {
            notify_threshold: self.queue.notify_threshold,
            refresh_interval: Duration::from_secs(self.queue.refresh_interval_secs),
            store_timeout: Duration::from_millis(self.queue.store_timeout_ms),
        }
    }

    pub fn day_count_check_interval(&self) -> Duration {
        Duration::from_secs(self.day_count.check_interval_secs)
    }

    pub fn rpc_server_config(&self) -> waitline_api_rpc::RpcServerConfig {
        waitline_api_rpc::RpcServerConfig {
            host: self.rpc.host.clone(),
            port: self.rpc.port,
            rate_limit_burst: self.rpc.rate_limit_burst,
            rate_limit_per_sec: self.rpc.rate_limit_per_sec,
        }
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
