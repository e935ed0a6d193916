//! Error types shared by the engine and its consumers.
//!
//! The `FeedError` enum covers the few ways the market engine can refuse a
//! request: an unknown symbol, a configuration that cannot be simulated, a bad
//! alert threshold, or a malformed universe file. None of them is fatal to a
//! running tick loop.
use std::io;

use thiserror::Error;

/// Unified error type shared by the engine and the monitor.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The requested symbol is not part of the simulated universe.
    #[error("Ticker not found: {0}")]
    NotFound(String),

    /// Engine construction rejected the universe or timing parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An alert threshold was not a finite, positive price.
    #[error("Invalid alert threshold: {0}")]
    InvalidThreshold(String),

    /// Error while parsing a universe file into `TickerSpec` values.
    #[error("Parse universe file error: {0}")]
    ParseUniverse(String),

    /// I/O error originating from reading a universe file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding JSON via serde_json.
    #[error("JSON serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}
