use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Store config
    #[serde(default)]
    pub store: StoreConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Settings of the translation unit store
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoreConfig {
    // @field: Spaces per nesting level when writing TMX
    #[serde(default = "default_indentation")]
    pub indentation: usize,

    // @field: Units per committed chunk during ingestion
    #[serde(default = "default_commit_chunk")]
    pub commit_chunk: usize,

    // @field: Parsed units buffered between reader thread and store
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    // @field: Parent directory of the disposable database
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    // @field: How long a foreground call waits for a busy store
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            indentation: default_indentation(),
            commit_chunk: default_commit_chunk(),
            channel_capacity: default_channel_capacity(),
            work_dir: None,
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Log level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_indentation() -> usize {
    2
}

fn default_commit_chunk() -> usize {
    1000
}

fn default_channel_capacity() -> usize {
    256
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration from a JSON file, writing a default one if missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .context(format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .context(format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            log::warn!("Config file not found at {:?}, creating default config.", path);
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Save configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .context(format!("Failed to write config to file: {:?}", path))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.store.indentation > 16 {
            return Err(anyhow!(
                "Indentation must be between 0 and 16, got {}",
                self.store.indentation
            ));
        }
        if self.store.commit_chunk == 0 {
            return Err(anyhow!("Commit chunk size must be at least 1"));
        }
        if self.store.channel_capacity == 0 {
            return Err(anyhow!("Channel capacity must be at least 1"));
        }
        if let Some(dir) = &self.store.work_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(anyhow!("Work directory is not a directory: {:?}", dir));
            }
        }
        Ok(())
    }
}
