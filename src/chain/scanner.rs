//! A small scanner over JavaScript-like source text.
//!
//! It knows just enough lexical structure to find identifiers and the extent
//! of a bracketed span: nested `()`, `[]` and `{}`, string, template and
//! regex literals, and comments. A `/` opens a regex only where an expression
//! can begin; elsewhere it is division.

use super::ChainError;
use std::ops::Range;

/// A cursor over source text that never moves backwards on its own.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner at the start of `text`.
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Returns the current byte offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Moves the cursor back to a previously observed offset.
    pub fn reset(&mut self, pos: usize) {
        self.pos = pos.min(self.text.len());
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Returns the text not yet consumed.
    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consumes `c` if it is the next character.
    pub fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Skips whitespace, newlines and comments.
    ///
    /// Returns true if at least one comment was skipped.
    pub fn skip_trivia(&mut self) -> bool {
        let mut saw_comment = false;
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    self.skip_line_comment();
                    saw_comment = true;
                }
                (Some('/'), Some('*')) => {
                    if self.skip_block_comment().is_err() {
                        return saw_comment;
                    }
                    saw_comment = true;
                }
                _ => return saw_comment,
            }
        }
    }

    /// Consumes an identifier, returning it.
    pub fn identifier(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_ident_start(c) => {
                self.bump();
            }
            _ => return None,
        }
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.bump();
        }
        Some(&self.text[start..self.pos])
    }

    /// Consumes a bracketed span starting at the current opening bracket.
    ///
    /// Returns the byte range strictly between the brackets. The cursor ends
    /// up just past the closing bracket.
    pub fn balanced(&mut self) -> Result<Range<usize>, ChainError> {
        let open_at = self.pos;
        let closer = match self.bump() {
            Some('(') => ')',
            Some('[') => ']',
            Some('{') => '}',
            _ => {
                self.pos = open_at;
                return Err(ChainError::Malformed {
                    offset: open_at,
                    message: "expected an opening bracket",
                });
            }
        };
        let inner_start = self.pos;

        loop {
            match self.peek() {
                None => {
                    return Err(ChainError::Malformed {
                        offset: open_at,
                        message: "unbalanced brackets",
                    });
                }
                Some(c) if c == closer => {
                    let inner_end = self.pos;
                    self.bump();
                    return Ok(inner_start..inner_end);
                }
                Some(')' | ']' | '}') => {
                    return Err(ChainError::Malformed {
                        offset: self.pos,
                        message: "mismatched closing bracket",
                    });
                }
                Some(_) => self.advance_atom()?,
            }
        }
    }

    /// Advances over one lexical unit: a bracketed span, a literal, a comment
    /// or a single character.
    pub fn advance_atom(&mut self) -> Result<(), ChainError> {
        match (self.peek(), self.peek_second()) {
            (Some('(' | '[' | '{'), _) => self.balanced().map(|_| ()),
            (Some(q @ ('\'' | '"')), _) => self.skip_string(q),
            (Some('`'), _) => self.skip_template(),
            (Some('/'), Some('/')) => {
                self.skip_line_comment();
                Ok(())
            }
            (Some('/'), Some('*')) => self.skip_block_comment(),
            (Some('/'), _) if self.expression_can_start() => self.skip_regex(),
            (Some(_), _) => {
                self.bump();
                Ok(())
            }
            (None, _) => Ok(()),
        }
    }

    fn skip_string(&mut self, quote: char) -> Result<(), ChainError> {
        let start = self.pos;
        self.bump();
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                c if c == quote => return Ok(()),
                _ => {}
            }
        }
        Err(ChainError::Malformed {
            offset: start,
            message: "unterminated string literal",
        })
    }

    fn skip_template(&mut self) -> Result<(), ChainError> {
        let start = self.pos;
        self.bump();
        loop {
            match (self.peek(), self.peek_second()) {
                (None, _) => {
                    return Err(ChainError::Malformed {
                        offset: start,
                        message: "unterminated template literal",
                    });
                }
                (Some('\\'), _) => {
                    self.bump();
                    self.bump();
                }
                (Some('`'), _) => {
                    self.bump();
                    return Ok(());
                }
                (Some('$'), Some('{')) => {
                    self.bump();
                    self.balanced()?;
                }
                (Some(_), _) => {
                    self.bump();
                }
            }
        }
    }

    /// Returns true if the last significant character before the cursor
    /// leaves room for an operand, so a `/` here opens a regex.
    fn expression_can_start(&self) -> bool {
        matches!(
            self.text[..self.pos].trim_end().chars().next_back(),
            None | Some('(' | ',' | '=' | ':' | '[' | '!' | '&' | '|' | '?' | '{' | ';')
        )
    }

    fn skip_regex(&mut self) -> Result<(), ChainError> {
        let start = self.pos;
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(ChainError::Malformed {
                        offset: start,
                        message: "unterminated regex literal",
                    });
                }
                Some('\\') => {
                    self.bump();
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.bump();
        }
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ChainError> {
        let start = self.pos;
        match self.rest()[2..].find("*/") {
            Some(end) => {
                self.pos += 2 + end + 2;
                Ok(())
            }
            None => Err(ChainError::Malformed {
                offset: start,
                message: "unterminated block comment",
            }),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

/// Splits an argument list on its top-level commas.
///
/// Each piece is trimmed; a trailing comma does not produce an empty piece.
/// Unbalanced input yields `None`.
pub fn split_args(args: &str) -> Option<Vec<&str>> {
    let mut pieces = Vec::new();
    let mut scanner = Scanner::new(args);
    let mut start = 0;

    while !scanner.is_at_end() {
        if scanner.peek() == Some(',') {
            pieces.push(args[start..scanner.pos()].trim());
            scanner.bump();
            start = scanner.pos();
            continue;
        }
        scanner.advance_atom().ok()?;
    }

    let last = args[start..].trim();
    if !last.is_empty() {
        pieces.push(last);
    }
    Some(pieces)
}

/// Returns the identifier a member or call chain starts with.
pub fn root_identifier(text: &str) -> Option<&str> {
    let mut scanner = Scanner::new(text);
    scanner.skip_trivia();
    scanner.identifier()
}
