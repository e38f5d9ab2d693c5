//! Recursive-descent parser for DarTwin token streams.
//!
//! Leaf statements (`port`, `connect`, `allocate`, block headers) are plain
//! winnow parsers over a [`TokenSlice`] that backtrack on mismatch. Blocks are
//! read by [`DocumentParser`], which owns the recovery policy: a statement
//! that fits nowhere is skipped up to the end of its line, its `;` or over a
//! whole `{ ... }` block, and reported as a warning. Nothing here fails; an
//! unclosed block keeps everything read before the input ran out.

use log::debug;
use winnow::{
    Parser as _,
    combinator::{opt, preceded, repeat},
    error::{ContextError, ErrMode},
    stream::{Stream, TokenSlice},
    token::any,
};

use dartwin_core::model::{
    Allocation, Connection, DarTrans, DarTransSlice, DarTwinModel, DigitalTwin, Goal,
    OriginalTwin, Stage, TwinSystem,
};

use crate::{
    block,
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    lexer::is_identifier_char,
    span::{Span, Spanned},
    tokens::{PositionedToken, Token},
};

/// Type alias for winnow TokenSlice with our positioned tokens
type DarTwinTokenSlice<'src> = TokenSlice<'src, PositionedToken<'src>>;
type Input<'src> = DarTwinTokenSlice<'src>;
type IResult<O> = std::result::Result<O, ErrMode<ContextError>>;

/// Returns the next token without consuming it.
fn peek<'src>(input: &Input<'src>) -> Option<&'src PositionedToken<'src>> {
    input.clone().next_token()
}

/// Runs `parser`, restoring the input if it does not match.
fn attempt<'src, O, F>(input: &mut Input<'src>, mut parser: F) -> Option<O>
where
    F: FnMut(&mut Input<'src>) -> IResult<O>,
{
    let checkpoint = input.checkpoint();
    match parser(input) {
        Ok(output) => Some(output),
        Err(_) => {
            input.reset(&checkpoint);
            None
        }
    }
}

fn skip_trivia(input: &mut Input<'_>) {
    while peek(input).is_some_and(|token| token.is_trivia()) {
        input.next_token();
    }
}

/// Parse whitespace and comments, including newlines
fn ws_comments0<'src>(input: &mut Input<'src>) -> IResult<()> {
    repeat(
        0..,
        any.verify(|token: &PositionedToken<'_>| token.is_trivia())
            .void(),
    )
    .parse_next(input)
}

/// Parse whitespace and block comments that stay on the current line
fn inline_ws0<'src>(input: &mut Input<'src>) -> IResult<()> {
    repeat(
        0..,
        any.verify(|token: &PositionedToken<'_>| {
            matches!(token.token, Token::Whitespace | Token::BlockComment(_))
        })
        .void(),
    )
    .parse_next(input)
}

/// Parse trivia between the parts of a statement, which may wrap onto
/// following lines. Returns `true` if a line break was crossed.
fn continuation<'src>(input: &mut Input<'src>) -> IResult<bool> {
    let mut wrapped = false;
    while let Some(token) = peek(input).filter(|token| token.is_trivia()) {
        wrapped |= matches!(token.token, Token::Newline);
        input.next_token();
    }
    Ok(wrapped)
}

/// Parse the next part of a wrapped statement with `parser`.
///
/// A statement keyword at the start of a following line begins the next
/// statement, so it is refused here and an incomplete statement does not
/// swallow the line after it.
fn continued<'src, O>(
    input: &mut Input<'src>,
    mut parser: impl FnMut(&mut Input<'src>) -> IResult<O>,
) -> IResult<O> {
    if continuation(input)? && peek(input).is_some_and(|token| token.starts_statement()) {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    parser(input)
}

/// Parse whitespace and newlines, but no comments
fn blank0<'src>(input: &mut Input<'src>) -> IResult<()> {
    repeat(
        0..,
        any.verify(|token: &PositionedToken<'_>| {
            matches!(token.token, Token::Whitespace | Token::Newline)
        })
        .void(),
    )
    .parse_next(input)
}

/// Parse one token accepted by `is_expected`, returning its span
fn expect_token<'src>(input: &mut Input<'src>, is_expected: fn(&Token<'_>) -> bool) -> IResult<Span> {
    any.verify(move |token: &PositionedToken<'_>| is_expected(&token.token))
        .map(|token: &PositionedToken<'_>| token.span)
        .parse_next(input)
}

fn dot<'src>(input: &mut Input<'src>) -> IResult<Span> {
    expect_token(input, |token| matches!(token, Token::Dot))
}

fn to_keyword<'src>(input: &mut Input<'src>) -> IResult<Span> {
    expect_token(input, |token| matches!(token, Token::To))
}

fn left_brace<'src>(input: &mut Input<'src>) -> IResult<Span> {
    expect_token(input, |token| matches!(token, Token::LeftBrace))
}

/// Parse a `;` on the current line
fn semicolon<'src>(input: &mut Input<'src>) -> IResult<Span> {
    inline_ws0.parse_next(input)?;
    expect_token(input, |token| matches!(token, Token::Semicolon))
}

/// Parse an identifier. Statement keywords are accepted as identifiers.
fn identifier<'src>(input: &mut Input<'src>) -> IResult<Spanned<&'src str>> {
    any.verify_map(|token: &PositionedToken<'_>| match &token.token {
        Token::Identifier(name) => Some(Spanned::new(*name, token.span)),
        other => other
            .bare_keyword()
            .map(|word| Spanned::new(word, token.span)),
    })
    .parse_next(input)
}

/// Parse a dotted reference such as `Plant.Motor.speed`
fn reference<'src>(input: &mut Input<'src>) -> IResult<Spanned<String>> {
    let first = identifier.parse_next(input)?;
    let mut path = first.inner().to_string();
    let mut span = first.span();

    while let Some(segment) = attempt(input, |input| preceded(dot, identifier).parse_next(input)) {
        path.push('.');
        path.push_str(segment.inner());
        span = span.union(segment.span());
    }

    Ok(Spanned::new(path, span))
}

/// Parse `<keyword> <name> {`, returning the name and the span of the brace
fn block_header<'src>(
    input: &mut Input<'src>,
    is_keyword: fn(&Token<'_>) -> bool,
) -> IResult<(Spanned<&'src str>, Span)> {
    expect_token(input, is_keyword)?;
    ws_comments0.parse_next(input)?;
    let name = identifier.parse_next(input)?;
    ws_comments0.parse_next(input)?;
    let open = left_brace.parse_next(input)?;
    Ok((name, open))
}

/// Parse an unnamed `<keyword> {`, returning the span from keyword to brace
fn section_header<'src>(input: &mut Input<'src>, is_keyword: fn(&Token<'_>) -> bool) -> IResult<Span> {
    let keyword = expect_token(input, is_keyword)?;
    ws_comments0.parse_next(input)?;
    let open = left_brace.parse_next(input)?;
    Ok(keyword.union(open))
}

/// Parse `port <name>;`
fn port_statement<'src>(input: &mut Input<'src>) -> IResult<Spanned<&'src str>> {
    expect_token(input, |token| matches!(token, Token::Port))?;
    let name = continued(input, identifier)?;
    attempt(input, semicolon);
    Ok(name)
}

/// Parse the `name <id>` suffix of a connection
fn inline_name<'src>(input: &mut Input<'src>) -> IResult<Spanned<&'src str>> {
    inline_ws0.parse_next(input)?;
    expect_token(input, |token| matches!(token, Token::Name))?;
    inline_ws0.parse_next(input)?;
    identifier.parse_next(input)
}

/// Parse a `// name: <id>` comment on the current line
fn trailing_name_comment<'src>(input: &mut Input<'src>) -> IResult<&'src str> {
    inline_ws0.parse_next(input)?;
    any.verify_map(|token: &PositionedToken<'_>| match token.token {
        Token::LineComment(text) => name_from_comment(text),
        _ => None,
    })
    .parse_next(input)
}

/// Extracts `<id>` from the text of a `// name: <id>` comment.
fn name_from_comment(comment: &str) -> Option<&str> {
    let rest = comment
        .trim_start()
        .strip_prefix("name")?
        .trim_start()
        .strip_prefix(':')?
        .trim_start();
    let end = rest
        .find(|c: char| !is_identifier_char(c))
        .unwrap_or(rest.len());
    let name = &rest[..end];
    (!name.is_empty()).then_some(name)
}

/// Parse `connect <ref> to <ref> [name <id>] ;` and its optional trailing
/// name comment. An inline name takes precedence over the comment. The
/// statement may wrap between its parts; the optional tail stays on the line
/// of the target reference.
fn connection<'src>(input: &mut Input<'src>) -> IResult<Connection> {
    expect_token(input, |token| matches!(token, Token::Connect))?;
    let from = continued(input, reference)?;
    continued(input, to_keyword)?;
    let to = continued(input, reference)?;
    let inline = opt(inline_name).parse_next(input)?;
    attempt(input, semicolon);
    let commented = attempt(input, trailing_name_comment);

    let name = inline
        .map(|name| name.inner().to_string())
        .or_else(|| commented.map(str::to_string));

    Ok(Connection {
        from: from.into_inner(),
        to: to.into_inner(),
        name,
    })
}

/// Parse `allocate <goal> to <ref>;`
fn allocation<'src>(input: &mut Input<'src>) -> IResult<Allocation> {
    expect_token(input, |token| matches!(token, Token::Allocate))?;
    let goal = continued(input, identifier)?;
    continued(input, to_keyword)?;
    let target = continued(input, reference)?;
    attempt(input, semicolon);

    Ok(Allocation {
        goal: goal.inner().to_string(),
        target: target.into_inner(),
    })
}

/// Parse `#goal <name>`
fn goal_header<'src>(input: &mut Input<'src>) -> IResult<Spanned<&'src str>> {
    expect_token(input, |token| matches!(token, Token::Goal))?;
    ws_comments0.parse_next(input)?;
    identifier.parse_next(input)
}

/// Parse `doc /* text */`, returning the raw comment text
fn doc_statement<'src>(input: &mut Input<'src>) -> IResult<&'src str> {
    expect_token(input, |token| matches!(token, Token::Doc))?;
    blank0.parse_next(input)?;
    any.verify_map(|token: &PositionedToken<'_>| match token.token {
        Token::BlockComment(text) => Some(text),
        _ => None,
    })
    .parse_next(input)
}

/// Trims every line, drops blank ones and joins the rest with single spaces.
fn normalize_doc(text: &str) -> Option<String> {
    let doc = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!doc.is_empty()).then_some(doc)
}

/// The kind of block being read; used to word recovery diagnostics.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Root,
    System,
    DigitalTwin,
    Part,
    Goal,
    Transform,
    Stage,
}

impl Scope {
    fn describe(self) -> &'static str {
        match self {
            Scope::Root => "`#root` block",
            Scope::System => "`#system` block",
            Scope::DigitalTwin => "`#digitaltwin` block",
            Scope::Part => "`part` block",
            Scope::Goal => "`#goal` block",
            Scope::Transform => "`#transform` section",
            Scope::Stage => "transformation stage",
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Scope::Root => "expected `#system`, `#goal`, `allocate` or `#transform`",
            Scope::System => "expected `#digitaltwin`, `part` or `connect`",
            Scope::DigitalTwin | Scope::Part => "expected `port <name>;`",
            Scope::Goal => "expected `doc /* ... */`",
            Scope::Transform => "expected `#before`, `#core` or `#after`",
            Scope::Stage => "expected `#system`, `#goal` or `allocate`",
        }
    }
}

/// Systems, goals and allocations read from one block, in source order.
#[derive(Debug, Default)]
struct Declarations {
    systems: Vec<TwinSystem>,
    goals: Vec<Goal>,
    allocations: Vec<Allocation>,
}

impl Declarations {
    /// A stage slice only lists the kinds that were actually declared.
    fn into_slice(self) -> DarTransSlice {
        fn present<T>(items: Vec<T>) -> Option<Vec<T>> {
            (!items.is_empty()).then_some(items)
        }

        DarTransSlice {
            systems: present(self.systems),
            goals: present(self.goals),
            allocations: present(self.allocations),
        }
    }
}

/// Reads blocks and owns recovery and diagnostics.
struct DocumentParser<'src> {
    tokens: &'src [PositionedToken<'src>],
    diagnostics: DiagnosticCollector,
}

impl<'src> DocumentParser<'src> {
    fn new(tokens: &'src [PositionedToken<'src>]) -> Self {
        Self {
            tokens,
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// Index of the next token in `self.tokens`.
    fn position(&self, input: &Input<'src>) -> usize {
        self.tokens.len() - input.eof_offset()
    }

    fn warn(&mut self, diagnostic: Diagnostic) {
        debug!(
            code:? = diagnostic.code(),
            message = diagnostic.message();
            "Parser diagnostic"
        );
        self.diagnostics.emit(diagnostic);
    }

    fn document(&mut self, input: &mut Input<'src>) -> DarTwinModel {
        let Some((name, open)) = self.locate_root(input) else {
            self.warn(
                Diagnostic::warning("no `#root` declaration found")
                    .with_code(ErrorCode::E102)
                    .with_help("start the document with `#root <name> { ... }`"),
            );
            return DarTwinModel::default();
        };

        let mut declarations = Declarations::default();
        let mut trans = None;
        let closed = self.block_body(input, open, Scope::Root, |parser, input| {
            parser.declaration(input, &mut declarations) || parser.transform(input, &mut trans)
        });
        if closed {
            self.trailing_content(input);
        }

        let mut model = DarTwinModel::new(*name.inner());
        model.systems = declarations.systems;
        model.goals = declarations.goals;
        model.allocations = declarations.allocations;
        model.trans = trans;
        model
    }

    /// Advances to the first complete `#root <name> {` header.
    fn locate_root(&mut self, input: &mut Input<'src>) -> Option<(Spanned<&'src str>, Span)> {
        loop {
            let token = peek(input)?;
            if matches!(token.token, Token::Root) {
                if let Some(header) =
                    attempt(input, |input| block_header(input, |token| matches!(token, Token::Root)))
                {
                    return Some(header);
                }
            } else if !token.is_trivia() {
                debug!(token:% = token; "Ignoring token before root declaration");
            }
            input.next_token();
        }
    }

    fn trailing_content(&mut self, input: &mut Input<'src>) {
        skip_trivia(input);
        let start = self.position(input);
        if start == self.tokens.len() {
            return;
        }

        let span = self.tokens[start..]
            .iter()
            .filter(|token| !token.is_trivia())
            .map(|token| token.span)
            .reduce(|a, b| a.union(b))
            .unwrap_or_default();
        input.next_slice(input.eof_offset());
        self.warn(
            Diagnostic::warning("content after the root block is ignored")
                .with_code(ErrorCode::E103)
                .with_label(span, "ignored")
                .with_help("a document holds exactly one `#root` block"),
        );
    }

    /// Reads statements until the `}` closing the block opened at `open`.
    ///
    /// `statement` must either consume a statement and return `true`, or
    /// leave the input untouched and return `false`. Returns whether the
    /// block was closed before the input ran out.
    fn block_body<F>(&mut self, input: &mut Input<'src>, open: Span, scope: Scope, mut statement: F) -> bool
    where
        F: FnMut(&mut Self, &mut Input<'src>) -> bool,
    {
        loop {
            skip_trivia(input);
            let Some(token) = peek(input) else {
                self.warn(
                    Diagnostic::warning(format!("unclosed {}", scope.describe()))
                        .with_code(ErrorCode::E101)
                        .with_label(open, "block opened here")
                        .with_help("add the closing `}`"),
                );
                return false;
            };

            if matches!(token.token, Token::RightBrace) {
                input.next_token();
                return true;
            }

            if !statement(self, input) {
                self.skip_statement(input, scope);
            }
        }
    }

    /// Skips an unrecognized statement: up to and including its `;` or line
    /// break, or over one balanced `{ ... }` block. Never consumes a `}` that
    /// belongs to the enclosing block.
    fn skip_statement(&mut self, input: &mut Input<'src>, scope: Scope) {
        let start = self.position(input);
        while let Some(token) = peek(input) {
            match token.token {
                Token::RightBrace => break,
                Token::LeftBrace => {
                    self.skip_block(input);
                    break;
                }
                Token::Semicolon | Token::Newline => {
                    input.next_token();
                    break;
                }
                _ => {
                    input.next_token();
                }
            }
        }

        let end = self.position(input);
        let span = self.tokens[start..end]
            .iter()
            .filter(|token| !token.is_trivia())
            .map(|token| token.span)
            .reduce(|a, b| a.union(b))
            .unwrap_or_default();
        self.warn(
            Diagnostic::warning(format!("unexpected input in {}", scope.describe()))
                .with_code(ErrorCode::E100)
                .with_label(span, "skipped")
                .with_help(scope.expected()),
        );
    }

    /// Skips the balanced block starting at the next token, or everything
    /// left if it never closes.
    fn skip_block(&self, input: &mut Input<'src>) {
        let open = self.position(input);
        let count = block::matching_brace(self.tokens, open)
            .map_or(input.eof_offset(), |close| close - open + 1);
        input.next_slice(count);
    }

    fn declaration(&mut self, input: &mut Input<'src>, declarations: &mut Declarations) -> bool {
        let Some(token) = peek(input) else {
            return false;
        };

        match token.token {
            Token::System => {
                let Some(system) = self.system(input) else {
                    return false;
                };
                declarations.systems.push(system);
            }
            Token::Goal => {
                let Some(goal) = self.goal(input) else {
                    return false;
                };
                declarations.goals.push(goal);
            }
            Token::Allocate => {
                let Some(allocation) = attempt(input, allocation) else {
                    return false;
                };
                declarations.allocations.push(allocation);
            }
            _ => return false,
        }
        true
    }

    fn system(&mut self, input: &mut Input<'src>) -> Option<TwinSystem> {
        let (name, open) =
            attempt(input, |input| block_header(input, |token| matches!(token, Token::System)))?;
        let mut system = TwinSystem::new(*name.inner());

        self.block_body(input, open, Scope::System, |parser, input| {
            let Some(token) = peek(input) else {
                return false;
            };
            match token.token {
                Token::DigitalTwin => {
                    let Some((name, ports)) = parser.twin(
                        input,
                        |token| matches!(token, Token::DigitalTwin),
                        Scope::DigitalTwin,
                    ) else {
                        return false;
                    };
                    system.digital_twins.push(DigitalTwin { name, ports });
                }
                Token::Part => {
                    let Some((name, ports)) =
                        parser.twin(input, |token| matches!(token, Token::Part), Scope::Part)
                    else {
                        return false;
                    };
                    system.original_twins.push(OriginalTwin { name, ports });
                }
                Token::Connect => {
                    let Some(connection) = attempt(input, connection) else {
                        return false;
                    };
                    system.connections.push(connection);
                }
                _ => return false,
            }
            true
        });

        debug!(
            name = system.name.as_str(),
            digital_twins = system.digital_twins.len(),
            original_twins = system.original_twins.len(),
            connections = system.connections.len();
            "Parsed system"
        );
        Some(system)
    }

    /// Reads a digital twin or part: a named block of port statements.
    fn twin(
        &mut self,
        input: &mut Input<'src>,
        is_keyword: fn(&Token<'_>) -> bool,
        scope: Scope,
    ) -> Option<(String, Vec<String>)> {
        let (name, open) = attempt(input, |input| block_header(input, is_keyword))?;
        let mut ports = Vec::new();

        self.block_body(input, open, scope, |_, input| {
            match attempt(input, port_statement) {
                Some(port) => {
                    ports.push(port.inner().to_string());
                    true
                }
                None => false,
            }
        });

        Some((name.inner().to_string(), ports))
    }

    fn goal(&mut self, input: &mut Input<'src>) -> Option<Goal> {
        let name = attempt(input, goal_header)?;
        let mut doc = None;

        let checkpoint = input.checkpoint();
        skip_trivia(input);
        match attempt(input, left_brace) {
            Some(open) => {
                self.block_body(input, open, Scope::Goal, |_, input| {
                    match attempt(input, doc_statement) {
                        Some(text) => {
                            if doc.is_none() {
                                doc = normalize_doc(text);
                            }
                            true
                        }
                        None => false,
                    }
                });
            }
            None => input.reset(&checkpoint),
        }
        attempt(input, semicolon);

        Some(Goal {
            name: name.inner().to_string(),
            doc,
        })
    }

    fn transform(&mut self, input: &mut Input<'src>, trans: &mut Option<DarTrans>) -> bool {
        let Some(header) = attempt(input, |input| {
            section_header(input, |token| matches!(token, Token::Transform))
        }) else {
            return false;
        };

        let mut section = DarTrans::default();
        self.block_body(input, header, Scope::Transform, |parser, input| {
            parser.stage(input, &mut section)
        });

        if trans.is_some() {
            self.warn(
                Diagnostic::warning("only the first `#transform` section is read")
                    .with_code(ErrorCode::E104)
                    .with_label(header, "ignored"),
            );
        } else {
            *trans = Some(section);
        }
        true
    }

    fn stage(&mut self, input: &mut Input<'src>, section: &mut DarTrans) -> bool {
        let Some(token) = peek(input) else {
            return false;
        };
        let stage = match token.token {
            Token::Before => Stage::Before,
            Token::Core => Stage::Core,
            Token::After => Stage::After,
            _ => return false,
        };
        let Some(header) = attempt(input, |input| {
            section_header(input, |token| {
                matches!(token, Token::Before | Token::Core | Token::After)
            })
        }) else {
            return false;
        };

        let mut declarations = Declarations::default();
        self.block_body(input, header, Scope::Stage, |parser, input| {
            parser.declaration(input, &mut declarations)
        });

        let slot = section.slot_mut(stage);
        if slot.is_some() {
            self.warn(
                Diagnostic::warning(format!("repeated `#{stage}` stage; the first one is kept"))
                    .with_code(ErrorCode::E104)
                    .with_label(header, "ignored"),
            );
        } else {
            *slot = Some(declarations.into_slice());
        }
        true
    }
}

/// Reads a model from a token stream, never failing.
///
/// The returned diagnostics start with `earlier`, the diagnostics of the
/// lexer run that produced `tokens`.
pub(crate) fn build_model<'src>(
    tokens: &'src [PositionedToken<'src>],
    earlier: Vec<Diagnostic>,
) -> (DarTwinModel, Vec<Diagnostic>) {
    let mut input = TokenSlice::new(tokens);
    let mut parser = DocumentParser::new(tokens);
    parser.diagnostics.extend(earlier);
    let model = parser.document(&mut input);
    (model, parser.diagnostics.finish())
}
