//! Decomposition of fluent call chains.

use super::{ChainError, Scanner};
use std::fmt;

/// One `.method(args)` link of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    /// Text between the call's parentheses, byte for byte.
    pub args: String,
    /// Whitespace and comments between the previous link and this link's
    /// dot. A link carries them along when it moves.
    pub leading: String,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: args.into(),
            leading: String::new(),
        }
    }

    pub fn with_leading(mut self, leading: impl Into<String>) -> Self {
        self.leading = leading.into();
        self
    }
}

impl fmt::Display for MethodCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}({})", self.method, self.args)
    }
}

/// A call chain split into its leading expression and the calls that follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChain {
    /// Leading `ident(.ident)*(args)` expression, verbatim.
    pub base: String,
    pub calls: Vec<MethodCall>,
    /// Number of bytes of the input the chain spans. Anything after this
    /// offset is not part of the chain.
    pub consumed: usize,
}

impl ParsedChain {
    /// Rebuilds chain text from `base` and `calls`.
    pub fn render(&self) -> String {
        render(&self.base, &self.calls)
    }

    /// Returns the method names in call order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.calls.iter().map(|c| c.method.as_str())
    }
}

/// Concatenates `base` with each call's leading trivia and `.method(args)`.
pub fn render(base: &str, calls: &[MethodCall]) -> String {
    let mut out = String::with_capacity(base.len() + calls.len() * 16);
    out.push_str(base);
    for call in calls {
        out.push_str(&call.leading);
        out.push_str(&call.to_string());
    }
    out
}

/// Parses the call chain at the start of `text`.
///
/// The base is an identifier path followed by one balanced argument list,
/// such as `z.string()` or `z.object({ a: z.number() })`. Each following
/// `.method(args)` becomes a [`MethodCall`]; whitespace and comments may
/// separate the links and are kept as the following link's `leading` text.
/// Parsing stops at the first link that is not a call, leaving the rest of
/// the text alone. A comment between a link's dot and its parentheses has
/// nowhere to go when links move, so such a chain is malformed.
///
/// # Example
///
/// ```rust
/// use migrate_dsl::chain::parse_chain;
///
/// let chain = parse_chain("z.object({ a: z.number() }).optional();")?;
/// assert_eq!(chain.base, "z.object({ a: z.number() })");
/// assert_eq!(chain.calls.len(), 1);
/// assert_eq!(chain.calls[0].method, "optional");
/// assert_eq!(chain.consumed, "z.object({ a: z.number() }).optional()".len());
/// # Ok::<(), migrate_dsl::chain::ChainError>(())
/// ```
pub fn parse_chain(text: &str) -> Result<ParsedChain, ChainError> {
    let mut scanner = Scanner::new(text);
    let base_end = parse_base(&mut scanner)?;
    let base = text[..base_end].to_string();

    let mut calls = Vec::new();
    let mut consumed = base_end;

    loop {
        let checkpoint = scanner.pos();
        scanner.skip_trivia();
        let leading = &text[checkpoint..scanner.pos()];
        let dot = scanner.pos();
        if !scanner.eat('.') {
            scanner.reset(checkpoint);
            break;
        }
        let mut inner_comment = scanner.skip_trivia();
        let Some(method) = scanner.identifier() else {
            scanner.reset(checkpoint);
            break;
        };
        inner_comment |= scanner.skip_trivia();
        if scanner.peek() != Some('(') {
            // Property access, not a call.
            scanner.reset(checkpoint);
            break;
        }
        if inner_comment {
            return Err(ChainError::Malformed {
                offset: dot,
                message: "comment inside a chain link",
            });
        }
        let args = scanner.balanced()?;
        calls.push(MethodCall::new(method, &text[args]).with_leading(leading));
        consumed = scanner.pos();
    }

    Ok(ParsedChain {
        base,
        calls,
        consumed,
    })
}

fn parse_base(scanner: &mut Scanner<'_>) -> Result<usize, ChainError> {
    if scanner.identifier().is_none() {
        return Err(ChainError::NoMatch);
    }

    loop {
        let checkpoint = scanner.pos();
        scanner.skip_trivia();
        if !scanner.eat('.') {
            scanner.reset(checkpoint);
            break;
        }
        scanner.skip_trivia();
        if scanner.identifier().is_none() {
            return Err(ChainError::NoMatch);
        }
    }

    scanner.skip_trivia();
    if scanner.peek() != Some('(') {
        return Err(ChainError::NoMatch);
    }
    scanner.balanced()?;
    Ok(scanner.pos())
}
