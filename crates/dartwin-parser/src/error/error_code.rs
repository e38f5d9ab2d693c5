//! Error codes for the DarTwin diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Lexer diagnostics
//! - `E1xx` - Parser diagnostics

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer (E0xx)
    // =========================================================================
    /// Unterminated block comment.
    ///
    /// A `/*` was never closed; the comment runs to the end of the input.
    E001,

    /// Unexpected character.
    ///
    /// A character was encountered that starts no token.
    E002,

    // =========================================================================
    // Parser (E1xx)
    // =========================================================================
    /// Unexpected input.
    ///
    /// A statement was not recognized in its scope and was skipped.
    E100,

    /// Unclosed block.
    ///
    /// The input ended before the `}` of a block. Everything inside the
    /// block up to that point is kept.
    E101,

    /// Missing root declaration.
    ///
    /// No `#root <name> {` header was found; the model is empty.
    E102,

    /// Content after the root block.
    ///
    /// Only the first root block is read.
    E103,

    /// Repeated section.
    ///
    /// A second `#transform` section, or a repeated `#before`/`#core`/`#after`
    /// stage. The first occurrence wins.
    E104,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unterminated block comment",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E100 => "unexpected input",
            ErrorCode::E101 => "unclosed block",
            ErrorCode::E102 => "missing root declaration",
            ErrorCode::E103 => "content after root block",
            ErrorCode::E104 => "repeated section",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
