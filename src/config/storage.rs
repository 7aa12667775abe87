//! Configuration Storage
//!
//! This module handles persistent storage of the shell configuration:
//! where the catalog service lives and how hard to try reaching it.

use crate::error::{Result, ShellError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Directory name below the platform configuration directory
const APP_DIR: &str = "evita-shell";

/// Persistent configuration data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Host of the catalog service
    pub host: String,
    /// Port of the catalog service
    pub port: u16,
    /// Endpoint scheme (`http`, `https` or `memory`)
    pub scheme: String,
    /// Bootstrap probe attempts before startup is abandoned
    pub connect_attempts: u32,
    /// Fixed delay between probe attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Line editor history file; defaults to `~/.evita-shell/history`
    pub history_file: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5556,
            scheme: "http".to_string(),
            connect_attempts: 20,
            retry_delay_ms: 300,
            request_timeout_secs: 30,
            history_file: None,
        }
    }
}

impl ShellConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint URL built from scheme, host and port
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// History file to use for the line editor
    pub fn history_path(&self) -> PathBuf {
        self.history_file.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|p| p.join(".evita-shell").join("history"))
                .unwrap_or_else(|| ".evita-shell-history".into())
        })
    }

    /// Get the configuration directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ShellError::Config("Could not find configuration directory".to_string()))?
            .join(APP_DIR);

        fs::create_dir_all(&config_dir)?;

        Ok(config_dir)
    }

    /// Get the configuration file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    /// Load configuration from a specific file, falling back to defaults if it is missing
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
