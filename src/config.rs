//! Configuration (loaded from an optional TOML file).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{CHUNK_SIZE, KDF_ITERATIONS, TicketCryptError};

/// Top-level configuration. Every section falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub history: HistoryConfig,
    pub log: LogConfig,
}

/// Tunables of the encryption/decryption pipelines.
///
/// Changing either value changes the output format: ciphertext produced with
/// non-default settings only decrypts with the same settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Plaintext bytes per cipher call (default 10 MiB).
    pub chunk_size: usize,
    /// PBKDF2 iterations (default 100 000).
    pub kdf_iterations: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            kdf_iterations: KDF_ITERATIONS,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), TicketCryptError> {
        if self.chunk_size == 0 {
            return Err(TicketCryptError::Invalid("chunk_size must be > 0"));
        }
        if self.kdf_iterations == 0 {
            return Err(TicketCryptError::Invalid("kdf_iterations must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// JSON file holding every user's encryption history.
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ticket-crypt-history.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, TicketCryptError> {
        let config: Config = toml::from_str(s)?;
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, TicketCryptError> {
        match path {
            Some(p) => Self::from_toml_str(&std::fs::read_to_string(p)?),
            None => Ok(Self::default()),
        }
    }
}
