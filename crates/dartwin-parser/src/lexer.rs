//! Lexical analyzer for DarTwin source text.
//!
//! The lexer converts source text into a stream of positioned [`Token`]s.
//! Comments, whitespace and newlines are kept as tokens: the parser needs
//! them to recover goal documentation and same-line connection names.
//!
//! The public entry point is [`tokenize`]. It never fails; characters that
//! start no token become [`Token::Unknown`] and are reported as warnings.

use log::debug;
use winnow::{
    Parser as _,
    combinator::{alt, preceded, terminated},
    error::{ContextError, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{rest, take_until, take_while},
};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    span::Span,
    tokens::{PositionedToken, Token},
};

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError>;

/// Tokens of a document together with the lexer's diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Lexed<'src> {
    pub tokens: Vec<PositionedToken<'src>>,
    pub diagnostics: Vec<Diagnostic>,
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Parse line comment starting with '//'
fn line_comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded("//", take_while(0.., |c| c != '\n'))
        .map(Token::LineComment)
        .parse_next(input)
}

/// Parse block comment `/* ... */`. An unterminated comment runs to the end
/// of the input.
fn block_comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded("/*", alt((terminated(take_until(0.., "*/"), "*/"), rest)))
        .map(Token::BlockComment)
        .parse_next(input)
}

/// Parse `#`-prefixed section keywords
fn section_keyword<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded('#', take_while(1.., is_identifier_char))
        .verify_map(|word: &str| match word {
            "root" => Some(Token::Root),
            "system" => Some(Token::System),
            "digitaltwin" => Some(Token::DigitalTwin),
            "goal" => Some(Token::Goal),
            "transform" => Some(Token::Transform),
            "before" => Some(Token::Before),
            "core" => Some(Token::Core),
            "after" => Some(Token::After),
            _ => None,
        })
        .parse_next(input)
}

/// Parse a word: a statement keyword or an identifier.
///
/// The whole run of identifier characters is taken first, so `ports` or
/// `connector` never split into a keyword and a suffix.
fn word<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., is_identifier_char)
        .map(|word: &'a str| match word {
            "part" => Token::Part,
            "port" => Token::Port,
            "connect" => Token::Connect,
            "to" => Token::To,
            "name" => Token::Name,
            "doc" => Token::Doc,
            "allocate" => Token::Allocate,
            _ => Token::Identifier(word),
        })
        .parse_next(input)
}

/// Parse single character tokens
fn punctuation<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        '.'.value(Token::Dot),
        ':'.value(Token::Colon),
        '{'.value(Token::LeftBrace),
        '}'.value(Token::RightBrace),
        ';'.value(Token::Semicolon),
    ))
    .parse_next(input)
}

/// Parse whitespace (spaces, tabs, etc. but not newlines)
fn whitespace<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., |c: char| c.is_whitespace() && c != '\n')
        .value(Token::Whitespace)
        .parse_next(input)
}

/// Parse newline
fn newline<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    '\n'.value(Token::Newline).parse_next(input)
}

/// Parse a single token with position tracking
fn positioned_token<'a>(input: &mut Input<'a>) -> IResult<PositionedToken<'a>> {
    let start_pos = input.current_token_start();

    let token = alt((
        line_comment,
        block_comment,
        section_keyword,
        word,
        punctuation,
        newline, // Must come before whitespace
        whitespace,
    ))
    .parse_next(input)?;

    let end_pos = input.current_token_start();
    Ok(PositionedToken::new(token, Span::new(start_pos..end_pos)))
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a> {
    source: &'a str,
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: DiagnosticCollector,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// Tokenize the input, turning anything unrecognized into
    /// [`Token::Unknown`].
    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            let start = input.current_token_start();
            let checkpoint = input.checkpoint();

            match positioned_token(&mut input) {
                Ok(token) => {
                    if matches!(token.token, Token::BlockComment(_)) {
                        self.check_block_comment(&token);
                    }
                    self.tokens.push(token);
                }
                Err(_) => {
                    input.reset(&checkpoint);
                    let Some(ch) = input.next_token() else {
                        break;
                    };
                    let span = Span::new(start..start + ch.len_utf8());
                    debug!(character:? = ch, offset = start; "Unexpected character");
                    self.diagnostics.emit(
                        Diagnostic::warning(format!("unexpected character `{ch}`"))
                            .with_code(ErrorCode::E002)
                            .with_label(span, ErrorCode::E002.description()),
                    );
                    self.tokens
                        .push(PositionedToken::new(Token::Unknown(ch), span));
                }
            }
        }
    }

    fn check_block_comment(&mut self, token: &PositionedToken<'a>) {
        let text = &self.source[token.span.range()];
        if text.len() >= 4 && text.ends_with("*/") {
            return;
        }
        self.diagnostics.emit(
            Diagnostic::warning("unterminated block comment")
                .with_code(ErrorCode::E001)
                .with_label(token.span, "comment runs to the end of the input")
                .with_help("add the closing `*/`"),
        );
    }

    fn finish(self) -> Lexed<'a> {
        Lexed {
            tokens: self.tokens,
            diagnostics: self.diagnostics.finish(),
        }
    }
}

/// Split `source` into positioned tokens.
///
/// The spans of the returned tokens cover the source without gaps or
/// overlaps, in order.
pub fn tokenize(source: &str) -> Lexed<'_> {
    let mut lexer = Lexer::new(source);
    lexer.tokenize(LocatingSlice::new(source));
    lexer.finish()
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    /// Strategy for generating identifier strings that are not keywords.
    fn identifier_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z_][A-Za-z0-9_-]{0,20}".prop_filter("avoid keywords", |s| {
            !matches!(
                s.as_str(),
                "part" | "port" | "connect" | "to" | "name" | "doc" | "allocate"
            )
        })
    }

    /// Token spans tile the input exactly, whatever the input is.
    fn check_spans_cover_input(source: &str) -> Result<(), TestCaseError> {
        let lexed = tokenize(source);
        let mut expected_start = 0;
        for token in &lexed.tokens {
            prop_assert_eq!(token.span.start(), expected_start);
            prop_assert!(token.span.end() > token.span.start());
            expected_start = token.span.end();
        }
        prop_assert_eq!(expected_start, source.len());
        Ok(())
    }

    /// A valid identifier always lexes to exactly one identifier token.
    fn check_identifier_is_single_token(id: &str) -> Result<(), TestCaseError> {
        let lexed = tokenize(id);
        prop_assert_eq!(lexed.tokens.len(), 1);
        prop_assert_eq!(&lexed.tokens[0].token, &Token::Identifier(id));
        prop_assert!(lexed.diagnostics.is_empty());
        Ok(())
    }

    proptest! {
        #[test]
        fn spans_cover_input(source in any::<String>()) {
            check_spans_cover_input(&source)?;
        }

        #[test]
        fn spans_cover_dsl_like_input(source in "[#a-z{}.;:/* \n]{0,64}") {
            check_spans_cover_input(&source)?;
        }

        #[test]
        fn identifier_is_single_token(id in identifier_strategy()) {
            check_identifier_is_single_token(&id)?;
        }
    }
}
