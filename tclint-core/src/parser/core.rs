//! The [`Parser`] struct and its construction.
//!
//! Grounded on `yash_syntax::parser::core::{Parser, Config}`, made
//! synchronous: this crate parses a complete in-memory source string in one
//! call, so there is no `Rec<T>`/alias-substitution-restart machinery (Tcl
//! has no POSIX-shell-style `alias` builtin) and no `async fn` anywhere in
//! the parser.

use crate::lexer::Lexer;
use crate::parser::error::{ParseError, SyntaxErrorKind};
use crate::source::Code;
use std::rc::Rc;

/// Parser-wide tuning knobs.
///
/// The teacher's `Config` holds the alias table and declaration-utility
/// glossary this crate has no counterpart for; what's left is the one
/// real engineering concern a recursive-descent parser over untrusted
/// input has on its own: bounding recursion depth so a pathologically
/// nested `[[[[...]]]]` can't blow the stack.
#[derive(Clone, Debug)]
pub struct ParserConfig {
    pub max_nesting_depth: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            max_nesting_depth: 200,
        }
    }
}

/// A recursive-descent parser over a [`Lexer`] cursor.
pub struct Parser {
    pub(crate) lexer: Lexer,
    pub(crate) config: ParserConfig,
    pub(crate) depth: u32,
}

impl Parser {
    /// Creates a parser over the whole of `code`.
    pub fn new(code: Rc<Code>, config: ParserConfig) -> Self {
        Parser {
            lexer: Lexer::new(code),
            config,
            depth: 0,
        }
    }

    /// Creates a parser over an existing, already-positioned lexer (used to
    /// re-lex a captured brace body as a script/expression/list).
    pub(crate) fn with_lexer(lexer: Lexer, config: ParserConfig, depth: u32) -> Self {
        Parser {
            lexer,
            config,
            depth,
        }
    }

    /// Enters one more level of nesting (a `[...]` command substitution, a
    /// parenthesized `expr` sub-expression), failing instead of recursing
    /// forever when `max_nesting_depth` is exceeded.
    pub(crate) fn enter_nested(&mut self) -> Result<(), ParseError> {
        if self.depth + 1 > self.config.max_nesting_depth {
            return Err(ParseError::new(
                SyntaxErrorKind::NestingTooDeep,
                self.lexer.span_point(self.lexer.position()),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave_nested(&mut self) {
        self.depth -= 1;
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::source::{Code, Origin};
    use crate::syntax::Spanned;
    use proptest::prelude::*;

    fn bare_word() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9_]{0,5}"
    }

    fn braced_word() -> impl Strategy<Value = String> {
        bare_word().prop_map(|w| format!("{{{w}}}"))
    }

    fn word() -> impl Strategy<Value = String> {
        prop_oneof![bare_word(), braced_word()]
    }

    fn command() -> impl Strategy<Value = String> {
        proptest::collection::vec(word(), 1..5).prop_map(|words| words.join(" "))
    }

    proptest! {
        /// A script built entirely from bare words and brace-balanced words
        /// never trips a syntax error — there is no way to form an
        /// unterminated brace/bracket/quote out of this grammar.
        #[test]
        fn brace_balanced_scripts_always_parse(commands in proptest::collection::vec(command(), 1..6)) {
            let src = format!("{}\n", commands.join("\n"));
            let mut parser = Parser::new(Code::new(&src, Origin::Unknown), ParserConfig::default());
            prop_assert!(parser.parse_script().is_ok());
        }

        /// Top-level script items never overlap and appear in the order
        /// they were written, byte range increasing monotonically.
        #[test]
        fn top_level_item_spans_are_monotonic(commands in proptest::collection::vec(command(), 1..6)) {
            let src = format!("{}\n", commands.join("\n"));
            let mut parser = Parser::new(Code::new(&src, Origin::Unknown), ParserConfig::default());
            let script = parser.parse_script().unwrap();

            let mut prev_end = 0usize;
            for item in &script.items {
                let range = &item.span().range;
                prop_assert!(range.start >= prev_end);
                prop_assert!(range.end >= range.start);
                prev_end = range.end;
            }
        }
    }
}
