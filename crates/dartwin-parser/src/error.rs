//! Diagnostics reported while reading a DarTwin document.
//!
//! Reading never fails: the language is edited live, so half-typed text is
//! the normal state of a document. Everything the lexer and parser had to
//! skip, truncate or ignore is reported as a [`Diagnostic`] instead, carrying
//! an error code, labeled source spans and optional help text.
//!
//! # Example
//!
//! ```
//! # use dartwin_parser::error::{Diagnostic, ErrorCode};
//! # use dartwin_parser::Span;
//!
//! let diag = Diagnostic::warning("unclosed `#system` block")
//!     .with_code(ErrorCode::E101)
//!     .with_label(Span::new(40..41), "opened here")
//!     .with_help("add the closing `}`");
//! assert_eq!(diag.to_string(), "warning[E101]: unclosed `#system` block");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod severity;

pub(crate) use collector::DiagnosticCollector;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use severity::Severity;
