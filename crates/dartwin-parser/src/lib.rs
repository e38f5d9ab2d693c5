//! # DarTwin Parser
//!
//! Parser for the DarTwin architecture language. This crate turns DarTwin
//! source text into a [`DarTwinModel`].
//!
//! Reading never fails. The language is edited live, so a half-typed
//! document still yields a model: unknown statements are skipped, an unclosed
//! block keeps what was read before the input ran out, and a document without
//! a `#root` declaration yields an empty model. Everything that was skipped is
//! reported through [`parse_with_diagnostics`].
//!
//! ## Usage
//!
//! ```
//! # use dartwin_parser::parse;
//!
//! let source = r#"
//!     #root Factory {
//!         #system Plant {
//!             #digitaltwin Monitor { port data; }
//!             part Motor { port data; }
//!             connect Monitor.data to Motor.data;
//!         }
//!     }
//! "#;
//!
//! let model = parse(source);
//! assert_eq!(model.name, "Factory");
//! assert_eq!(model.systems[0].connections[0].from, "Monitor.data");
//! ```

pub mod block;
pub mod error;
pub mod lexer;
mod parser;
mod span;
pub mod tokens;

pub use lexer::{Lexed, tokenize};
pub use span::{Span, Spanned};

use log::{debug, info, trace};

use dartwin_core::model::DarTwinModel;

use error::Diagnostic;

/// A parsed model together with everything the reader had to skip.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub model: DarTwinModel,
    /// Lexer diagnostics first, then parser diagnostics, each in source order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse source text into a model, discarding diagnostics.
///
/// Equivalent to `parse_with_diagnostics(source).model`.
pub fn parse(source: &str) -> DarTwinModel {
    parse_with_diagnostics(source).model
}

/// Parse source text into a model and report what was skipped.
///
/// The pipeline has two steps:
///
/// 1. **Tokenize** - Convert source text to positioned tokens
/// 2. **Parse** - Read the `#root` block into a [`DarTwinModel`]
///
/// # Example
///
/// ```
/// # use dartwin_parser::{parse_with_diagnostics, error::ErrorCode};
///
/// let outcome = parse_with_diagnostics("#root R { #system S { port stray; } }");
/// assert_eq!(outcome.model.systems.len(), 1);
/// assert_eq!(outcome.diagnostics[0].code(), Some(ErrorCode::E100));
/// ```
pub fn parse_with_diagnostics(source: &str) -> ParseOutcome {
    info!(source_len = source.len(); "Parsing document");

    let Lexed {
        tokens,
        diagnostics: lexer_diagnostics,
    } = tokenize(source);
    debug!(tokens = tokens.len(); "Tokenized");

    let (model, diagnostics) = parser::build_model(&tokens, lexer_diagnostics);

    debug!(
        systems = model.systems.len(),
        goals = model.goals.len(),
        allocations = model.allocations.len(),
        diagnostics = diagnostics.len();
        "Document parsed"
    );
    trace!(model:?; "Parsed model");

    ParseOutcome { model, diagnostics }
}
