//! Token types produced by the [`lexer`](crate::lexer).

use std::fmt;

use winnow::stream::Location;

use crate::span::Span;

/// Token types for the DarTwin language
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    // Section keywords
    Root,        // #root
    System,      // #system
    DigitalTwin, // #digitaltwin
    Goal,        // #goal
    Transform,   // #transform
    Before,      // #before
    Core,        // #core
    After,       // #after

    // Statement keywords, also usable as identifiers
    Part,
    Port,
    Connect,
    To,
    Name,
    Doc,
    Allocate,

    Identifier(&'src str),

    // Punctuation
    Dot,        // .
    Colon,      // :
    LeftBrace,  // {
    RightBrace, // }
    Semicolon,  // ;

    // Comments
    LineComment(&'src str),  // // comment
    BlockComment(&'src str), // /* comment */

    // Whitespace
    Whitespace,
    Newline,

    /// A character that starts no token.
    Unknown(char),
}

impl Token<'_> {
    /// Returns the spelling of a statement keyword, which the grammar also
    /// accepts wherever an identifier is expected.
    pub fn bare_keyword(&self) -> Option<&'static str> {
        match self {
            Token::Part => Some("part"),
            Token::Port => Some("port"),
            Token::Connect => Some("connect"),
            Token::To => Some("to"),
            Token::Name => Some("name"),
            Token::Doc => Some("doc"),
            Token::Allocate => Some("allocate"),
            _ => None,
        }
    }

    /// Tokens that begin a statement or section in some scope.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            Token::Root
                | Token::System
                | Token::DigitalTwin
                | Token::Goal
                | Token::Transform
                | Token::Before
                | Token::Core
                | Token::After
                | Token::Part
                | Token::Port
                | Token::Connect
                | Token::Doc
                | Token::Allocate
        )
    }

    /// Whitespace, newlines and comments.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Token::Whitespace | Token::Newline | Token::LineComment(_) | Token::BlockComment(_)
        )
    }
}

/// A token with position information for winnow integration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span) -> Self {
        Self { token, span }
    }
}

impl<'src> std::ops::Deref for PositionedToken<'src> {
    type Target = Token<'src>;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl Location for PositionedToken<'_> {
    fn previous_token_end(&self) -> usize {
        self.span.start()
    }

    fn current_token_start(&self) -> usize {
        self.span.start()
    }
}

impl fmt::Display for PositionedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.token.fmt(f)
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Root => write!(f, "#root"),
            Token::System => write!(f, "#system"),
            Token::DigitalTwin => write!(f, "#digitaltwin"),
            Token::Goal => write!(f, "#goal"),
            Token::Transform => write!(f, "#transform"),
            Token::Before => write!(f, "#before"),
            Token::Core => write!(f, "#core"),
            Token::After => write!(f, "#after"),

            Token::Part
            | Token::Port
            | Token::Connect
            | Token::To
            | Token::Name
            | Token::Doc
            | Token::Allocate => write!(f, "{}", self.bare_keyword().unwrap_or_default()),

            Token::Identifier(name) => write!(f, "{name}"),

            Token::Dot => write!(f, "."),
            Token::Colon => write!(f, ":"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::Semicolon => write!(f, ";"),

            Token::LineComment(comment) => write!(f, "//{comment}"),
            Token::BlockComment(comment) => write!(f, "/*{comment}*/"),
            Token::Whitespace => write!(f, " "),
            Token::Newline => write!(f, "\\n"),
            Token::Unknown(ch) => write!(f, "{ch}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_keywords() {
        assert_eq!(Token::Port.bare_keyword(), Some("port"));
        assert_eq!(Token::Allocate.bare_keyword(), Some("allocate"));
        assert_eq!(Token::System.bare_keyword(), None);
        assert_eq!(Token::Identifier("port").bare_keyword(), None);
    }

    #[test]
    fn test_display_roundtrips_spelling() {
        assert_eq!(Token::DigitalTwin.to_string(), "#digitaltwin");
        assert_eq!(Token::Connect.to_string(), "connect");
        assert_eq!(Token::BlockComment(" text ").to_string(), "/* text */");
    }

    #[test]
    fn test_trivia() {
        assert!(Token::Newline.is_trivia());
        assert!(Token::LineComment(" x").is_trivia());
        assert!(!Token::Semicolon.is_trivia());
    }
}
