use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles loading and validating the converter settings.
/// Nothing here is ever written back to disk.

/// Frame rate assumed when neither the input nor the caller supplies one
pub const DEFAULT_FRAME_RATE: f64 = 23.976;

/// Inputs at or above this size skip the detection cascade
pub const DEFAULT_CASCADE_SIZE_LIMIT: u64 = 10 * 1024 * 1024;

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "subconv.json";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Frame rate used by frame-based codecs unless overridden
    #[serde(default = "default_frame_rate")]
    pub default_frame_rate: f64,

    /// Output text encoding label
    #[serde(default = "default_encoding")]
    pub default_encoding: String,

    /// Size gate of the detection cascade, in bytes
    #[serde(default = "default_cascade_size_limit")]
    pub cascade_size_limit_bytes: u64,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_frame_rate() -> f64 {
    DEFAULT_FRAME_RATE
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_cascade_size_limit() -> u64 {
    DEFAULT_CASCADE_SIZE_LIMIT
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !(self.default_frame_rate.is_finite() && self.default_frame_rate > 0.0) {
            return Err(anyhow!(
                "Default frame rate must be a positive number, got {}",
                self.default_frame_rate
            ));
        }
        if self.cascade_size_limit_bytes == 0 {
            return Err(anyhow!("Cascade size limit must be greater than zero"));
        }
        if self.default_encoding.trim().is_empty() {
            return Err(anyhow!("Default encoding must not be empty"));
        }
        Ok(())
    }

    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the configuration for a run: an explicit path must exist,
    /// otherwise `subconv.json` in `working_dir` is used when present, else
    /// the defaults.
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let implicit: PathBuf = working_dir.join(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            return Self::from_file(&implicit);
        }
        Ok(Self::default())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            default_frame_rate: default_frame_rate(),
            default_encoding: default_encoding(),
            cascade_size_limit_bytes: default_cascade_size_limit(),
            log_level: LogLevel::default(),
        }
    }
}
