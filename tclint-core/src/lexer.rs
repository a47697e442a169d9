//! Word-fragment tokenizer (spec §4A).
//!
//! Tcl has no fixed lexical grammar — whether `{`, `$`, or a bare byte run
//! starts a word depends on where the parser is, not on a table the lexer
//! alone can consult. So, unlike a conventional tokenizer, [`Lexer`] does
//! not hand back a flat token stream; it's a character cursor over a shared
//! [`Code`] buffer with a handful of primitives (`peek_char`, `bump`,
//! `at_command_start`) plus scanners for the handful of *balanced*
//! constructs Tcl does have unconditionally — `{…}` and `[…]` nesting, and
//! `\`-escapes — which [`crate::parser`] composes into the context-sensitive
//! grammar.
//!
//! This mirrors `yash_syntax::parser::lex::core::Lexer`'s role (a buffered
//! cursor the parser drives), simplified because this crate parses a
//! complete in-memory source string rather than an incrementally-read
//! interactive input stream — there is no `Input` trait or async
//! continuation here, just a `&str`.

use crate::parser::error::{ParseError, SyntaxErrorKind};
use crate::source::{Code, Span};
use std::rc::Rc;

/// A structural token kind, as enumerated in spec §4A.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Ws,
    CmdSep,
    WordStart,
    BraceOpen,
    BraceClose,
    Quote,
    BracketOpen,
    BracketClose,
    Dollar,
    BackslashEscape,
    Comment,
    Eof,
}

/// Returns whether `c` is a blank (whitespace other than newline).
pub fn is_blank(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

/// Character cursor over a shared source buffer.
///
/// A `Lexer` can be scoped to a sub-range of a [`Code`] buffer (see
/// [`Lexer::sub`]), which is how re-parsing a `BracedWord`'s captured raw
/// text as a script/expression/list (spec §3 "Lifecycle") keeps using the
/// same absolute byte positions as the rest of the tree.
#[derive(Clone)]
pub struct Lexer {
    code: Rc<Code>,
    pos: usize,
    end: usize,
    /// True at the start of a script body or immediately after a command
    /// separator — the only positions where `#` starts a comment (spec
    /// §4A: "A `#` starts a `COMMENT` only in command-start position").
    at_command_start: bool,
}

impl Lexer {
    /// Creates a lexer over the whole of `code`.
    pub fn new(code: Rc<Code>) -> Self {
        let end = code.text().len();
        Lexer {
            code,
            pos: 0,
            end,
            at_command_start: true,
        }
    }

    /// Creates a lexer scoped to `range` within the same shared buffer,
    /// used to re-parse a captured substring (a `BracedWord`'s contents)
    /// without losing absolute source positions.
    pub fn sub(code: Rc<Code>, range: std::ops::Range<usize>) -> Self {
        Lexer {
            code,
            pos: range.start,
            end: range.end,
            at_command_start: true,
        }
    }

    pub fn code(&self) -> &Rc<Code> {
        &self.code
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    /// Builds a span from `start` (a byte offset previously returned by
    /// [`Lexer::position`]) to the current position.
    pub fn span_from(&self, start: usize) -> Span {
        Span {
            code: Rc::clone(&self.code),
            range: start..self.pos,
        }
    }

    pub fn span_point(&self, at: usize) -> Span {
        Span {
            code: Rc::clone(&self.code),
            range: at..at,
        }
    }

    fn remaining(&self) -> &str {
        &self.code.text()[self.pos..self.end]
    }

    /// Returns the next character without consuming it.
    pub fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Returns the character after the next one, without consuming either.
    pub fn peek_char2(&self) -> Option<char> {
        let mut chars = self.remaining().chars();
        chars.next();
        chars.next()
    }

    /// Returns whether the remaining input starts with `s`.
    pub fn starts_with(&self, s: &str) -> bool {
        self.remaining().starts_with(s)
    }

    /// Returns the character `byte_offset` bytes past the cursor, without
    /// consuming anything. `byte_offset` must land on a character boundary.
    pub fn peek_at(&self, byte_offset: usize) -> Option<char> {
        self.remaining().get(byte_offset..)?.chars().next()
    }

    /// Consumes and returns the next character, updating `at_command_start`
    /// if it was a command separator.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' || c == ';' {
            self.at_command_start = true;
        } else if !is_blank(c) {
            self.at_command_start = false;
        }
        Some(c)
    }

    /// Consumes `n` bytes unconditionally (the caller has already verified
    /// they form whole characters, e.g. via [`Lexer::starts_with`]).
    pub fn bump_bytes(&mut self, n: usize) {
        for _ in 0..n {
            // starts_with callers only pass ASCII prefixes in this crate.
        }
        self.pos += n;
        self.at_command_start = false;
    }

    pub fn at_command_start(&self) -> bool {
        self.at_command_start
    }

    pub fn force_command_start(&mut self, value: bool) {
        self.at_command_start = value;
    }

    /// Skips blank characters and backslash-newline continuations, which
    /// count as a single logical blank (spec §4A).
    pub fn skip_blanks(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek_char() {
                Some(c) if is_blank(c) => {
                    self.bump();
                }
                Some('\\') if self.peek_char2() == Some('\n') => {
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Consumes a `#`-to-end-of-line comment, if one starts here, returning
    /// its text (without the leading `#`). Only valid to call when
    /// [`Lexer::at_command_start`] is true — callers check this themselves,
    /// since whether `#` is a comment depends on parse context (spec §4A,
    /// §8 "`#` at non-command-start is a literal, not a comment").
    pub fn scan_comment(&mut self) -> Option<(String, Span)> {
        if self.peek_char() != Some('#') {
            return None;
        }
        let start = self.pos;
        self.bump(); // '#'
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.bump();
        }
        Some((text, self.span_from(start)))
    }

    /// Scans a balanced `{…}` construct starting at the current `{`,
    /// returning the inner text (braces excluded) and the full span
    /// (braces included). A backslash escapes exactly one following byte,
    /// including an opening or closing brace, for counting purposes (spec
    /// §4A: "backslash before any character escapes exactly one following
    /// byte").
    pub fn scan_braced(&mut self) -> Result<(String, Span), ParseError> {
        debug_assert_eq!(self.peek_char(), Some('{'));
        let outer_start = self.pos;
        self.bump(); // '{'
        let inner_start = self.pos;
        let mut depth = 1u32;
        loop {
            match self.peek_char() {
                None => {
                    return Err(ParseError {
                        kind: SyntaxErrorKind::UnterminatedBrace,
                        span: self.span_point(outer_start),
                    });
                }
                Some('\\') => {
                    self.bump();
                    if self.peek_char().is_some() {
                        self.bump();
                    }
                }
                Some('{') => {
                    depth += 1;
                    self.bump();
                }
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        let inner_end = self.pos;
                        self.bump(); // '}'
                        let inner = self.code.text()[inner_start..inner_end].to_string();
                        return Ok((inner, self.span_from(outer_start)));
                    }
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Scans a balanced `[…]` construct starting at the current `[`,
    /// returning the inner text and the full span. Unlike `{…}`, this is
    /// only used when the caller wants the raw text (e.g. reporting an
    /// error); normal `CmdSub` parsing recurses into [`crate::parser`]'s
    /// script grammar instead, so it can build a real [`crate::syntax::Script`]
    /// rather than capturing text to re-lex later.
    pub fn scan_bracketed_raw(&mut self) -> Result<(String, Span), ParseError> {
        debug_assert_eq!(self.peek_char(), Some('['));
        let outer_start = self.pos;
        self.bump();
        let inner_start = self.pos;
        let mut depth = 1u32;
        loop {
            match self.peek_char() {
                None => {
                    return Err(ParseError {
                        kind: SyntaxErrorKind::UnterminatedBracket,
                        span: self.span_point(outer_start),
                    });
                }
                Some('\\') => {
                    self.bump();
                    if self.peek_char().is_some() {
                        self.bump();
                    }
                }
                Some('[') => {
                    depth += 1;
                    self.bump();
                }
                Some(']') => {
                    depth -= 1;
                    if depth == 0 {
                        let inner_end = self.pos;
                        self.bump();
                        let inner = self.code.text()[inner_start..inner_end].to_string();
                        return Ok((inner, self.span_from(outer_start)));
                    }
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Scans a double-quoted construct's raw text (`"…"`, quotes excluded),
    /// honoring the spec §4A rule that inside `"…"` only `[`, `$`, and `\`
    /// retain meaning (the quote-interior *structure* — where the `VarSub`
    /// and `CmdSub` children are — is built by `parser::word`, which calls
    /// the individual scanners below on this same cursor; this method
    /// exists only for contexts that want the whole raw span, such as list
    /// parsing).
    pub fn scan_quoted_raw(&mut self) -> Result<(String, Span), ParseError> {
        debug_assert_eq!(self.peek_char(), Some('"'));
        let outer_start = self.pos;
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(ParseError {
                        kind: SyntaxErrorKind::UnterminatedQuote,
                        span: self.span_point(outer_start),
                    });
                }
                Some('"') => {
                    self.bump();
                    return Ok((text, self.span_from(outer_start)));
                }
                Some('\\') => {
                    text.push('\\');
                    self.bump();
                    if let Some(c) = self.peek_char() {
                        text.push(c);
                        self.bump();
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Origin;

    fn lexer(s: &str) -> Lexer {
        Lexer::new(Code::new(s, Origin::Unknown))
    }

    #[test]
    fn scan_braced_simple() {
        let mut lex = lexer("{hello world}");
        let (inner, span) = lex.scan_braced().unwrap();
        assert_eq!(inner, "hello world");
        assert_eq!(span.text(), "{hello world}");
        assert!(lex.at_end());
    }

    #[test]
    fn scan_braced_nested() {
        let mut lex = lexer("{a {b} c}");
        let (inner, _) = lex.scan_braced().unwrap();
        assert_eq!(inner, "a {b} c");
    }

    #[test]
    fn scan_braced_escaped_brace_does_not_close() {
        let mut lex = lexer(r"{a \} b}");
        let (inner, _) = lex.scan_braced().unwrap();
        assert_eq!(inner, r"a \} b");
    }

    #[test]
    fn scan_braced_unterminated_is_error() {
        let mut lex = lexer("{oops");
        let err = lex.scan_braced().unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnterminatedBrace);
    }

    #[test]
    fn skip_blanks_joins_backslash_newline() {
        let mut lex = lexer("\\\n\\\n   x");
        lex.skip_blanks().unwrap();
        assert_eq!(lex.peek_char(), Some('x'));
    }

    #[test]
    fn comment_only_recognized_when_requested() {
        let mut lex = lexer("# hi\nrest");
        assert!(lex.at_command_start());
        let (text, span) = lex.scan_comment().unwrap();
        assert_eq!(text, " hi");
        assert_eq!(span.text(), "# hi");
    }

    #[test]
    fn bump_tracks_command_start() {
        let mut lex = lexer("a;b");
        assert!(lex.at_command_start());
        lex.bump();
        assert!(!lex.at_command_start());
        lex.bump(); // ';'
        assert!(lex.at_command_start());
    }
}
