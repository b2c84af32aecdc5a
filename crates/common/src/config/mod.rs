//! Configuration management for ContextFlow
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Content extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Language model configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Pipeline limits
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// Extraction provider: http, mock
    #[serde(default = "default_extraction_provider")]
    pub provider: String,

    /// Per-document fetch timeout in seconds
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,

    /// User agent presented to source documents
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Hard cap on extracted content, in characters
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Model provider: openai, mock
    #[serde(default = "default_model_provider")]
    pub provider: String,

    /// API key for the model service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Chat model to use
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Per-prompt timeout in seconds
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// System prompt installed at session creation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Maximum sources aggregated per run
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    /// Per-source contribution to the combined context, in characters
    #[serde(default = "default_per_source_context_chars")]
    pub per_source_context_chars: usize,

    /// Cap on the combined context, in characters
    #[serde(default = "default_total_context_chars")]
    pub total_context_chars: usize,

    /// Content fed into each summarization prompt, in characters
    #[serde(default = "default_summary_input_chars")]
    pub summary_input_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_extraction_provider() -> String { "http".to_string() }
fn default_extraction_timeout() -> u64 { 15 }
fn default_user_agent() -> String { format!("contextflow/{}", env!("CARGO_PKG_VERSION")) }
fn default_max_content_chars() -> usize { 10_000 }
fn default_model_provider() -> String { "openai".to_string() }
fn default_chat_model() -> String { crate::DEFAULT_CHAT_MODEL.to_string() }
fn default_model_timeout() -> u64 { 30 }
fn default_system_prompt() -> String { crate::DEFAULT_SYSTEM_PROMPT.to_string() }
fn default_max_sources() -> usize { 5 }
fn default_per_source_context_chars() -> usize { 2000 }
fn default_total_context_chars() -> usize { 5000 }
fn default_summary_input_chars() -> usize { 2000 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_metrics_port() -> u16 { 0 }
fn default_service_name() -> String { "contextflow".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get per-fetch timeout as Duration
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction.timeout_secs)
    }

    /// Get per-prompt timeout as Duration
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider: default_extraction_provider(),
            timeout_secs: default_extraction_timeout(),
            user_agent: default_user_agent(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_model_provider(),
            api_key: None,
            api_base: None,
            model: default_chat_model(),
            timeout_secs: default_model_timeout(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_sources: default_max_sources(),
            per_source_context_chars: default_per_source_context_chars(),
            total_context_chars: default_total_context_chars(),
            summary_input_chars: default_summary_input_chars(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            extraction: ExtractionConfig::default(),
            model: ModelConfig::default(),
            pipeline: PipelineConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
