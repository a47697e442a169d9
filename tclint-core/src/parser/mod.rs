//! Recursive-descent parser producing the [`crate::syntax`] tree.
//!
//! Split the way `yash_syntax::parser` is split — `core` for the
//! `Parser`/`ParserConfig` pair, `error` for the error type, `script`/`word`
//! for the main grammar, `expr` for the `expr` sub-grammar, `list` for the
//! braced-list re-parse grammar.

pub mod core;
pub mod error;
pub mod expr;
pub mod list;
pub mod script;
pub mod word;

pub use core::{Parser, ParserConfig};
pub use error::{ParseError, SyntaxErrorKind};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Code, Origin};
    use crate::syntax::{Reparsed, Word};

    /// A small but representative script exercising most word shapes at
    /// once, the way `yash_syntax::parser::core`'s own integration tests do.
    #[test]
    fn parses_a_representative_script() {
        let src = r#"
# configure the widget
set ::name "hello, [get_name]!"
if {$x > 0} {
    puts $name
} elseif {$x < 0} {
    puts -negative
}
foreach {*}$items {
    lappend out $items
}
"#;
        let mut parser = Parser::new(Code::new(src, Origin::Unknown), ParserConfig::default());
        let script = parser.parse_script().unwrap();
        assert_eq!(script.commands().count(), 3);

        let set_cmd = script.commands().next().unwrap();
        assert_eq!(set_cmd.name_literal().as_deref(), Some("set"));
        match &set_cmd.words[2] {
            Word::Quoted(q) => assert_eq!(q.parts.len(), 3),
            other => panic!("expected quoted word, got {other:?}"),
        }

        let if_cmd = script.commands().nth(1).unwrap();
        assert_eq!(if_cmd.name_literal().as_deref(), Some("if"));
        match &if_cmd.words[1] {
            Word::Braced(b) => assert_eq!(b.raw, "$x > 0"),
            other => panic!("expected braced condition, got {other:?}"),
        }
    }

    #[test]
    fn reparsing_a_braced_word_as_expr_preserves_raw_text() {
        let src = "$x > 0";
        let code = Code::new(src, Origin::Unknown);
        let mut parser = Parser::new(code, ParserConfig::default());
        let expr = parser.parse_expr().unwrap();
        let reparsed = Reparsed::Expression(expr);
        match reparsed {
            Reparsed::Expression(_) => {}
            _ => panic!("expected Expression variant"),
        }
    }
}
