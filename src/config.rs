//! Configuration loading and types for medivoice
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/medivoice/config.toml)
//! 3. Environment variables (MEDIVOICE_*)
//! 4. CLI arguments (highest priority)

use crate::error::MedivoiceError;
use crate::report::ReportType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# MediVoice Configuration
#
# Location: ~/.config/medivoice/config.toml
# All settings can be overridden via CLI flags

[service]
# Base URL of the dictation service gateway. All three endpoints
# (/transcribe, /process-transcription, /generate-report) hang off this.
# Required for remote operation; report generation falls back to a local
# template when it is missing or unreachable.
# endpoint = "https://api.example.com/v1"

# Bearer credential for the gateway. Can also be supplied via the
# MEDIVOICE_API_KEY environment variable.
# api_key = "sk-..."

# Per-request timeout in seconds. A generation request that exceeds this
# is aborted and served from the local fallback instead.
timeout_secs = 30

[transcription]
# Language hint sent with audio uploads ("auto" lets the service detect)
language = "en"

[enhancement]
# Label speaker turns as DOCTOR:/PATIENT: in the enhanced transcript
diarization = true

# Correct medical terminology and grammar
terminology = true

[report]
# Default report format: "general", "soap", or "diagnostic"
default_type = "general"

# Delay between words when the local fallback simulates streaming (ms)
fallback_word_delay_ms = 50

[storage]
# Report history location. "auto" uses ~/.local/share/medivoice/,
# a custom path stores the database there, "disabled" turns history off.
path = "auto"
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub transcription: TranscriptionConfig,

    #[serde(default)]
    pub enhancement: EnhancementConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub storage: StorageSettings,
}

/// Remote dictation service configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Base URL of the service gateway (e.g. "https://api.example.com/v1")
    pub endpoint: Option<String>,

    /// Bearer credential; MEDIVOICE_API_KEY is checked when unset
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Audio transcription configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptionConfig {
    /// Language hint ("en", "es", "auto", ...)
    #[serde(default = "default_language")]
    pub language: String,
}

/// Transcript enhancement configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnhancementConfig {
    /// Request DOCTOR:/PATIENT: speaker labels
    #[serde(default = "default_true")]
    pub diarization: bool,

    /// Request medical terminology and grammar correction
    #[serde(default = "default_true")]
    pub terminology: bool,
}

/// Report generation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Report format used when the CLI does not specify one
    #[serde(default)]
    pub default_type: ReportType,

    /// Word delay for the fallback builder's simulated streaming (ms)
    #[serde(default = "default_word_delay_ms")]
    pub fallback_word_delay_ms: u64,
}

/// Report history storage settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    /// "auto", "disabled", or an explicit directory path
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_language() -> String {
    "en".to_string()
}

fn default_word_delay_ms() -> u64 {
    50
}

fn default_storage_path() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            diarization: true,
            terminology: true,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_type: ReportType::default(),
            fallback_word_delay_ms: default_word_delay_ms(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                endpoint: None,
                api_key: None,
                timeout_secs: default_timeout_secs(),
            },
            transcription: TranscriptionConfig::default(),
            enhancement: EnhancementConfig::default(),
            report: ReportConfig::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "medivoice")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Resolve the report history directory from config.
    /// Returns None when history is explicitly disabled.
    pub fn resolve_storage_dir(&self) -> Option<PathBuf> {
        match self.storage.path.to_lowercase().as_str() {
            "disabled" => None,
            "auto" => directories::ProjectDirs::from("", "", "medivoice")
                .map(|dirs| dirs.data_dir().to_path_buf()),
            _ => Some(PathBuf::from(&self.storage.path)),
        }
    }
}

/// Load configuration with layered priority
pub fn load_config(path: Option<&Path>) -> Result<Config, MedivoiceError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| MedivoiceError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| MedivoiceError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(endpoint) = std::env::var("MEDIVOICE_ENDPOINT") {
        config.service.endpoint = Some(endpoint);
    }
    if let Ok(language) = std::env::var("MEDIVOICE_LANGUAGE") {
        config.transcription.language = language;
    }

    Ok(config)
}
