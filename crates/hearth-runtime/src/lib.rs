//! # Hearth Runtime
//!
//! Wiring for the `hearth` binary: configuration, logging, message
//! templates, the chat feature handlers, and the JSON log sink. The
//! building blocks live in the other crates; this one assembles them
//! from a config file.

use thiserror::Error;

pub mod config;
pub mod features;
pub mod logging;
pub mod sink;
pub mod template;

/// Fatal startup or shutdown errors for the `hearth` binary.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("store error: {0}")]
    Cache(#[from] hearth_cache::CacheError),

    #[error("transport error: {0}")]
    Transport(#[from] hearth_core::TransportError),

    #[error("dispatcher error: {0}")]
    Bot(#[from] hearth_core::BotError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
