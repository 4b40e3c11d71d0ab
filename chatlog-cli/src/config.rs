use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chatlog_core::export::ExportFormat;
use chatlog_core::filter::{LogScope, DEFAULT_LANGUAGE};
use chatlog_core::paginator::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};

pub const DEFAULT_URL: &str = "https://gateway.watsonplatform.net/assistant/api";
pub const DEFAULT_VERSION: &str = "2020-04-01";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Load environment variables from .env files in multiple locations
///
/// Priority order (highest to lowest):
/// 1. Environment variables already set
/// 2. Current directory .env
/// 3. ~/.chatlog/.env
///
/// Returns the files that were loaded so they can be logged once tracing is up.
pub fn load_dotenv() -> Vec<PathBuf> {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(path);
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        // dotenvy doesn't overwrite existing vars, so the current directory wins
        if env_file.exists() && dotenvy::from_path(&env_file).is_ok() {
            loaded_from.push(env_file);
        }
    }

    loaded_from
}

/// Get the chatlog config directory path (~/.chatlog)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".chatlog"))
}

/// Defaults read from ~/.chatlog/config.toml; CLI flags and environment
/// variables override every value here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatlogConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub export: ExportDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            version: default_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDefaults {
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub logtype: LogScope,

    #[serde(default)]
    pub filetype: ExportFormat,

    #[serde(default = "default_total_pages")]
    pub total_pages: u32,

    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    #[serde(default)]
    pub strip: bool,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            language: default_language(),
            logtype: LogScope::default(),
            filetype: ExportFormat::default(),
            total_pages: default_total_pages(),
            page_limit: default_page_limit(),
            strip: false,
        }
    }
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_total_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl ChatlogConfig {
    /// Load config from `path`, or from ~/.chatlog/config.toml.
    ///
    /// A missing default file yields built-in defaults; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::config_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !config_path.exists() {
            if explicit {
                anyhow::bail!("Config not found at {:?}", config_path);
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .context(format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&content)
            .context(format!("Failed to parse config file (invalid TOML): {:?}", config_path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get config file path: ~/.chatlog/config.toml
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }
}
