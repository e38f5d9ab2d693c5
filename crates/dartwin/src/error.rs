//! Error types for DarTwin operations.
//!
//! Malformed DSL text is not an error: parsing, graph building and layout
//! degrade and report diagnostics instead. [`DartwinError`] covers what must
//! be surfaced to the caller unambiguously: I/O, rejected interchange data and
//! unusable configuration.

use std::io;

use thiserror::Error;

use dartwin_core::interchange::InterchangeError;

/// The main error type for DarTwin operations.
#[derive(Debug, Error)]
pub enum DartwinError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Interchange error: {0}")]
    Interchange(#[from] InterchangeError),

    #[error("Configuration error: {0}")]
    Config(String),
}
