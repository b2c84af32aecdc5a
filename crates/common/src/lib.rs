//! ContextFlow Common Library
//!
//! Shared code for the ContextFlow service including:
//! - Error types and the response envelope
//! - Configuration management
//! - Language-model capability abstraction
//! - Content-extraction capability abstraction
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod extract;
pub mod metrics;
pub mod model;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use extract::Extractor;
pub use model::{Availability, LanguageModel, ModelSession};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default chat model
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// System prompt used for every pipeline session
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful research assistant \
    that analyzes and connects information from multiple sources. Provide \
    concise, clear responses.";
