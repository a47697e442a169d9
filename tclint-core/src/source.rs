//! Source code positions.
//!
//! Every AST node produced by the [parser](crate::parser) carries a [`Span`]
//! identifying the range of the original source it was built from. This
//! module defines [`Code`] (the shared source buffer a span points into) and
//! [`Span`] itself, along with the line/column resolution spans need for
//! reporting [`Position`]s to a caller.
//!
//! The model is adapted from `yash_syntax::source`: a [`Code`] is shared via
//! `Rc` among every span that points into it, and a span is just a byte
//! range plus a reference to that shared buffer. Unlike the teacher crate
//! (which tracks a single character position per [`Location`]), every node
//! here needs a *range*, since violations and formatter rewrites both need
//! to know where a construct ends, not just where it starts.

use std::fmt;
use std::rc::Rc;

/// Origin of a [`Code`] buffer.
///
/// Mirrors `yash_syntax::source::Source`, trimmed to what this crate's
/// non-goals leave meaningful: there is no alias substitution and no
/// `eval`/`source` resolution at analysis time (spec Non-goals), so the only
/// origins are "a real file" and "no file at all" (used by tests and by
/// `FromStr` parses of ASTs built outside a full driver call).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Origin {
    /// Source of unknown or irrelevant origin (tests, doctests).
    Unknown,
    /// A file at the given path, as the driver façade would report it.
    File(Rc<str>),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Unknown => write!(f, "<unknown>"),
            Origin::File(path) => write!(f, "{path}"),
        }
    }
}

/// A source buffer shared by every [`Span`] into it.
///
/// `line_starts` is the byte offset of the first byte of each line, computed
/// once at construction time so span-to-position resolution is O(log n) via
/// binary search instead of re-scanning the buffer per lookup.
#[derive(Debug)]
pub struct Code {
    text: String,
    origin: Origin,
    line_starts: Vec<usize>,
}

impl Code {
    /// Wraps `text` as a new source buffer with the given origin.
    pub fn new(text: impl Into<String>, origin: Origin) -> Rc<Code> {
        let text = text.into();
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Rc::new(Code {
            text,
            origin,
            line_starts,
        })
    }

    /// The full source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The buffer's origin.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Resolves a byte offset to a 1-based `(line, column)` pair.
    ///
    /// The column is counted in Unicode scalar values from the start of the
    /// line, matching `yash_syntax::source::Location`'s convention.
    fn position_at(&self, byte_offset: usize) -> Position {
        let line_index = match self.line_starts.binary_search(&byte_offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_index];
        let column = self.text[line_start..byte_offset].chars().count() as u32 + 1;
        Position {
            line: line_index as u32 + 1,
            column,
        }
    }
}

/// A resolved `(line, column)` position, both 1-based.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A byte range within a shared [`Code`] buffer.
///
/// Spans nest strictly within their parent's span (a tree invariant from
/// spec §3) and are monotone non-decreasing in document order.
#[derive(Clone, Debug)]
pub struct Span {
    pub code: Rc<Code>,
    pub range: std::ops::Range<usize>,
}

impl Span {
    /// A span covering no particular source, for ASTs built without a real
    /// lexer (tests, `FromStr` impls). Mirrors `Location::dummy` in the
    /// teacher crate.
    pub fn dummy(text: impl Into<String>) -> Span {
        let code = Code::new(text, Origin::Unknown);
        let range = 0..code.text().len();
        Span { code, range }
    }

    /// The text this span covers.
    pub fn text(&self) -> &str {
        &self.code.text()[self.range.clone()]
    }

    /// The 1-based `(line, column)` of the first byte of this span.
    pub fn start(&self) -> Position {
        self.code.position_at(self.range.start)
    }

    /// The 1-based `(line, column)` just past the last byte of this span.
    pub fn end(&self) -> Position {
        self.code.position_at(self.range.end)
    }

    /// Builds a span covering `self` through (and including) `other`, which
    /// must point into the same `Code` and start no earlier than `self`.
    pub fn merge(&self, other: &Span) -> Span {
        debug_assert!(Rc::ptr_eq(&self.code, &other.code));
        Span {
            code: Rc::clone(&self.code),
            range: self.range.start..other.range.end,
        }
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.code, &other.code) && self.range == other.range
    }
}
impl Eq for Span {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_at_first_line() {
        let code = Code::new("abc\ndef\n", Origin::Unknown);
        assert_eq!(code.position_at(0), Position { line: 1, column: 1 });
        assert_eq!(code.position_at(2), Position { line: 1, column: 3 });
    }

    #[test]
    fn position_at_second_line() {
        let code = Code::new("abc\ndef\n", Origin::Unknown);
        assert_eq!(code.position_at(4), Position { line: 2, column: 1 });
        assert_eq!(code.position_at(7), Position { line: 2, column: 4 });
    }

    #[test]
    fn position_at_counts_scalar_values_not_bytes() {
        let code = Code::new("héllo\nworld\n", Origin::Unknown);
        // 'é' is 2 bytes (U+00E9) but a single column.
        let byte_offset = "h\u{e9}".len();
        assert_eq!(code.position_at(byte_offset), Position { line: 1, column: 3 });
    }

    #[test]
    fn span_merge() {
        let code = Code::new("set x 1", Origin::Unknown);
        let a = Span { code: Rc::clone(&code), range: 0..3 };
        let b = Span { code: Rc::clone(&code), range: 4..5 };
        let merged = a.merge(&b);
        assert_eq!(merged.text(), "set x");
    }

    #[test]
    fn dummy_span_roundtrip() {
        let span = Span::dummy("puts hi");
        assert_eq!(span.text(), "puts hi");
        assert_eq!(span.start(), Position { line: 1, column: 1 });
    }
}
