//! Balanced-brace block extraction.
//!
//! Two forms of the same contract: [`extract`] works on raw text, counting
//! every `{` and `}` byte; [`matching_brace`] works on the token stream, where
//! braces inside comments are already folded into comment tokens.

use crate::tokens::{PositionedToken, Token};

/// The body of a block and the position of its closing brace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extracted<'src> {
    /// Text strictly between the opening and the matching closing brace.
    pub body: &'src str,
    /// Byte index of the matching closing brace, or `source.len()` when the
    /// block is never closed.
    pub end: usize,
}

impl Extracted<'_> {
    /// Returns `true` if a matching closing brace was found.
    pub fn is_closed(&self, source: &str) -> bool {
        self.end < source.len()
    }
}

/// Returns the body of the block opened by the `{` at byte `open`.
///
/// Malformed input degrades instead of failing: if the block never closes,
/// or `open` does not point at a `{`, the body is empty and `end` is
/// `source.len()`. Callers must not assume `end < source.len()`.
///
/// ```
/// use dartwin_parser::block::extract;
///
/// let source = "#system S { #digitaltwin D { port a; } } tail";
/// let open = source.find('{').unwrap();
/// let block = extract(source, open);
/// assert_eq!(block.body, " #digitaltwin D { port a; } ");
/// assert_eq!(&source[block.end..], "} tail");
///
/// let broken = extract("{ never closed", 0);
/// assert_eq!(broken.body, "");
/// assert_eq!(broken.end, 14);
/// ```
pub fn extract(source: &str, open: usize) -> Extracted<'_> {
    let unbalanced = Extracted {
        body: "",
        end: source.len(),
    };
    if source.as_bytes().get(open) != Some(&b'{') {
        return unbalanced;
    }

    let mut depth = 0usize;
    for (index, byte) in source.bytes().enumerate().skip(open) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Extracted {
                        body: &source[open + 1..index],
                        end: index,
                    };
                }
            }
            _ => {}
        }
    }
    unbalanced
}

/// Returns the index of the token closing the block opened at `tokens[open]`.
///
/// `None` if `tokens[open]` is not a `{` or the block is never closed.
pub fn matching_brace(tokens: &[PositionedToken<'_>], open: usize) -> Option<usize> {
    if !matches!(tokens.get(open)?.token, Token::LeftBrace) {
        return None;
    }

    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        match token.token {
            Token::LeftBrace => depth += 1,
            Token::RightBrace => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn test_extract_flat_block() {
        let block = extract("{abc}", 0);
        assert_eq!(block.body, "abc");
        assert_eq!(block.end, 4);
        assert!(block.is_closed("{abc}"));
    }

    #[test]
    fn test_extract_nested_block() {
        let source = "x { a { b { c } } d } e";
        let block = extract(source, 2);
        assert_eq!(block.body, " a { b { c } } d ");
        assert_eq!(block.end, 20);
    }

    #[test]
    fn test_extract_inner_block() {
        let source = "{ a { b } c }";
        let block = extract(source, 4);
        assert_eq!(block.body, " b ");
        assert_eq!(block.end, 8);
    }

    #[test]
    fn test_extract_empty_block() {
        let block = extract("{}", 0);
        assert_eq!(block.body, "");
        assert_eq!(block.end, 1);
    }

    #[test]
    fn test_extract_unbalanced() {
        let source = "{ a { b }";
        let block = extract(source, 0);
        assert_eq!(block.body, "");
        assert_eq!(block.end, source.len());
        assert!(!block.is_closed(source));
    }

    #[test]
    fn test_extract_open_not_a_brace() {
        assert_eq!(extract("abc", 1).end, 3);
        assert_eq!(extract("abc", 10).body, "");
    }

    #[test]
    fn test_matching_brace_on_tokens() {
        let lexed = tokenize("{ a { b } } c");
        let close = matching_brace(&lexed.tokens, 0).unwrap();
        assert_eq!(lexed.tokens[close].span.start(), 10);
    }

    #[test]
    fn test_matching_brace_ignores_commented_braces() {
        let lexed = tokenize("{ /* { */ }");
        assert!(matching_brace(&lexed.tokens, 0).is_some());

        // The raw-text form counts the commented brace.
        assert_eq!(extract("{ /* { */ }", 0).body, "");
    }

    #[test]
    fn test_matching_brace_unbalanced() {
        let lexed = tokenize("{ { }");
        assert_eq!(matching_brace(&lexed.tokens, 0), None);
        assert_eq!(matching_brace(&lexed.tokens, 1), None);
        assert_eq!(matching_brace(&lexed.tokens, 2), Some(4));
    }
}
