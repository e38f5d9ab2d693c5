//! Error adapter for converting DarTwin errors and diagnostics to miette
//! reports.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI. Parser
//! diagnostics are warnings, not errors: the CLI renders them and carries on.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use dartwin::{DartwinError, interchange::InterchangeError};
use dartwin_parser::error::{Diagnostic, Severity};

/// Adapter for a single parser diagnostic.
///
/// This adapter wraps a single [`Diagnostic`] and implements
/// [`MietteDiagnostic`] to enable rich formatting in the CLI.
pub struct DiagnosticAdapter<'a> {
    /// The wrapped diagnostic
    diag: &'a Diagnostic,
    /// Source code for displaying snippets
    src: &'a str,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter.
    pub fn new(diag: &'a Diagnostic, src: &'a str) -> Self {
        Self { diag, src }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.diag.severity() {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = self.diag.labels();
        if labels.is_empty() {
            return None;
        }

        Some(Box::new(labels.iter().map(|label| {
            let span = span_to_miette(label.span());
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

/// Adapter for [`DartwinError`], which carries no source location.
pub struct ErrorAdapter<'a>(pub &'a DartwinError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            DartwinError::Io(_) => "dartwin::io",
            DartwinError::Interchange(_) => "dartwin::interchange",
            DartwinError::Config(_) => "dartwin::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            DartwinError::Interchange(InterchangeError::Invalid(_)) => {
                "the input must be a model exported with `--emit model`"
            }
            DartwinError::Config(_) => "check the [layout] and [ports] tables of the config file",
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// A reportable problem that can be rendered by miette.
///
/// This enum wraps either a parser diagnostic or a library error, providing
/// a uniform interface for rendering.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A diagnostic with source location information.
    Diagnostic(DiagnosticAdapter<'a>),
    /// An error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert a parser [`Span`](dartwin_parser::Span) to a miette [`SourceSpan`].
fn span_to_miette(span: dartwin_parser::Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// Convert a [`DartwinError`] into a list of reportable errors.
pub fn to_reportables(err: &DartwinError) -> Vec<Reportable<'_>> {
    vec![Reportable::Error(ErrorAdapter(err))]
}

/// Wrap parser diagnostics for rendering against their source text.
pub fn diagnostics_to_reportables<'a>(
    diagnostics: &'a [Diagnostic],
    src: &'a str,
) -> Vec<Reportable<'a>> {
    diagnostics
        .iter()
        .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d, src)))
        .collect()
}

#[cfg(test)]
mod tests {
    use dartwin_parser::{Span, error::ErrorCode};

    use super::*;

    fn render(reportable: &Reportable<'_>) -> String {
        let mut out = String::new();
        miette::GraphicalReportHandler::new_themed(miette::GraphicalTheme::unicode_nocolor())
            .render_report(&mut out, reportable)
            .unwrap();
        out
    }

    #[test]
    fn test_single_diagnostic() {
        let diag = Diagnostic::warning("unexpected statement")
            .with_code(ErrorCode::E100)
            .with_label(Span::new(0..5), "skipped")
            .with_help("try this");
        let diagnostics = [diag];

        let reportables = diagnostics_to_reportables(&diagnostics, "hello world");
        assert_eq!(reportables.len(), 1);

        match &reportables[0] {
            Reportable::Diagnostic(d) => {
                assert_eq!(d.to_string(), "unexpected statement");
                assert_eq!(d.severity(), Some(miette::Severity::Warning));
                assert_eq!(d.code().unwrap().to_string(), "E100");
                assert_eq!(d.labels().unwrap().count(), 1);
            }
            Reportable::Error(_) => panic!("Expected Diagnostic"),
        }

        let rendered = render(&reportables[0]);
        assert!(rendered.contains("unexpected statement"));
        assert!(rendered.contains("skipped"));
    }

    #[test]
    fn test_multiple_diagnostics_keep_order() {
        let diagnostics = vec![
            Diagnostic::warning("first").with_label(Span::new(0..1), "a"),
            Diagnostic::warning("second")
                .with_label(Span::new(2..3), "b")
                .with_secondary_label(Span::new(0..1), "opened here"),
            Diagnostic::warning("third"),
        ];

        let reportables = diagnostics_to_reportables(&diagnostics, "x y z");
        assert_eq!(reportables.len(), 3);
        assert_eq!(reportables[0].to_string(), "first");
        assert_eq!(reportables[1].to_string(), "second");
        assert_eq!(reportables[1].labels().unwrap().count(), 2);
        assert_eq!(reportables[2].to_string(), "third");
        assert!(reportables[2].labels().is_none());
    }

    #[test]
    fn test_config_error() {
        let err = DartwinError::Config("bad value".to_string());

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);
        match &reportables[0] {
            Reportable::Error(e) => {
                assert_eq!(e.code().unwrap().to_string(), "dartwin::config");
                assert!(e.help().is_some());
                assert!(e.source_code().is_none());
            }
            Reportable::Diagnostic(_) => panic!("Expected Error"),
        }
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = DartwinError::Io(io_err);

        let reportables = to_reportables(&err);
        assert_eq!(reportables[0].code().unwrap().to_string(), "dartwin::io");
        assert!(reportables[0].help().is_none());
        assert!(render(&reportables[0]).contains("file not found"));
    }

    #[test]
    fn test_invalid_model_error() {
        let err = DartwinError::from(
            dartwin::interchange::model_from_json(r#"{"name": 3}"#).unwrap_err(),
        );

        let reportables = to_reportables(&err);
        assert_eq!(
            reportables[0].code().unwrap().to_string(),
            "dartwin::interchange"
        );
        assert!(reportables[0].help().is_some());
    }
}
