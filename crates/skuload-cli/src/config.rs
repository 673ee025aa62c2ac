//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use skuload_core::HttpConfig;

/// Global configuration for skuload
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub database: DatabaseConfig,
    pub workers: WorkersConfig,
    pub http: HttpSettings,
    pub log: LogConfig,
    /// File this config was read from, if any
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub chunk_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: skuload_products::config::DEFAULT_URL.to_string(),
            chunk_size: skuload_core::DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub insert_batch_size: usize,
    pub sample_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(skuload_products::config::DEFAULT_DB_PATH),
            insert_batch_size: skuload_products::store::DEFAULT_INSERT_BATCH,
            sample_size: skuload_products::verify::DEFAULT_SAMPLE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub count: usize,
    /// Batches allowed to wait for a free worker
    pub queue_capacity: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            count: 4,
            queue_capacity: 4,
        }
    }
}

/// HTTP settings as written in the file (whole seconds / milliseconds)
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout: u64,
    pub read_timeout: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub system_proxy: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let http = HttpConfig::default();
        Self {
            connect_timeout: http.connect_timeout.as_secs(),
            read_timeout: http.read_timeout.as_secs(),
            max_retries: http.max_retries,
            backoff_ms: http.backoff_base.as_millis() as u64,
            system_proxy: http.system_proxy,
        }
    }
}

impl HttpSettings {
    pub fn to_http_config(self) -> HttpConfig {
        HttpConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            read_timeout: Duration::from_secs(self.read_timeout),
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_ms),
            system_proxy: self.system_proxy,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Append-only log file; empty disables it
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("logs/skuload.log"),
        }
    }
}

impl LogConfig {
    pub fn file(&self) -> Option<&Path> {
        if self.file.as_os_str().is_empty() {
            None
        } else {
            Some(&self.file)
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./skuload.toml (current directory)
    /// 2. ~/.config/skuload/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("skuload.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "skuload") {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.loaded_from = Some(path.to_path_buf());
        Ok(config)
    }

    /// Pipeline settings from this file, before CLI overrides
    pub fn pipeline(&self) -> skuload_products::Config {
        skuload_products::Config {
            url: self.source.url.clone(),
            db_path: self.database.path.clone(),
            chunk_size: self.source.chunk_size,
            workers: self.workers.count,
            queue_capacity: self.workers.queue_capacity,
            insert_batch_size: self.database.insert_batch_size,
            sample_size: self.database.sample_size,
            http: self.http.to_http_config(),
        }
    }
}
