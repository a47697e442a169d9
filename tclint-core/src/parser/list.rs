//! Braced-list re-parse grammar (spec §4B, last paragraph).
//!
//! Tcl's list format has no POSIX-shell equivalent, so this has no direct
//! teacher analog; it follows the same `Lexer`-driven recursive-descent
//! style as the rest of [`crate::parser`]. Unlike ordinary word parsing, a
//! list element never substitutes — `$x` and `[cmd]` are literal text here,
//! since re-reading a word as a list is itself the substitution-free
//! operation Tcl's `list`/`lindex`/`foreach` commands perform.

use crate::lexer::is_blank;
use crate::parser::core::Parser;
use crate::parser::error::{ParseError, SyntaxErrorKind};
use crate::syntax::{BareWord, BracedWord, QuotedWord, Word};

impl Parser {
    /// Parses the current position to end of input as a sequence of
    /// whitespace-separated list elements.
    pub fn parse_list(&mut self) -> Result<Vec<Word>, ParseError> {
        let mut elements = Vec::new();
        loop {
            self.skip_list_ws();
            if self.lexer.at_end() {
                break;
            }
            elements.push(self.parse_list_element()?);
        }
        Ok(elements)
    }

    fn skip_list_ws(&mut self) {
        while let Some(c) = self.lexer.peek_char() {
            if is_blank(c) || c == '\n' {
                self.lexer.bump();
            } else {
                break;
            }
        }
    }

    fn parse_list_element(&mut self) -> Result<Word, ParseError> {
        match self.lexer.peek_char() {
            Some('{') => {
                let (raw, span) = self.lexer.scan_braced()?;
                Ok(Word::Braced(BracedWord {
                    raw,
                    reparsed: None,
                    span,
                }))
            }
            Some('"') => {
                let (raw, span) = self.lexer.scan_quoted_raw()?;
                Ok(Word::Quoted(QuotedWord {
                    parts: vec![Word::Bare(BareWord {
                        text: raw,
                        span: span.clone(),
                    })],
                    span,
                }))
            }
            _ => self.parse_bare_list_element(),
        }
    }

    /// An unbraced, unquoted list element: a run of non-blank text, with a
    /// backslash escaping exactly the next byte (so an escaped blank or
    /// brace doesn't end or unbalance the element).
    fn parse_bare_list_element(&mut self) -> Result<Word, ParseError> {
        let start = self.lexer.position();
        let mut text = String::new();
        loop {
            match self.lexer.peek_char() {
                None => break,
                Some(c) if is_blank(c) || c == '\n' => break,
                Some('\\') => {
                    text.push('\\');
                    self.lexer.bump();
                    if let Some(c) = self.lexer.peek_char() {
                        text.push(c);
                        self.lexer.bump();
                    } else {
                        return Err(ParseError::new(
                            SyntaxErrorKind::DanglingBackslash,
                            self.lexer.span_point(start),
                        ));
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.lexer.bump();
                }
            }
        }
        if text.is_empty() {
            return Err(ParseError::new(
                SyntaxErrorKind::MalformedListElement,
                self.lexer.span_point(start),
            ));
        }
        Ok(Word::Bare(BareWord {
            text,
            span: self.lexer.span_from(start),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::core::ParserConfig;
    use crate::source::{Code, Origin};

    fn parse(src: &str) -> Vec<Word> {
        let mut parser = Parser::new(Code::new(src, Origin::Unknown), ParserConfig::default());
        parser.parse_list().unwrap()
    }

    #[test]
    fn simple_list() {
        let elements = parse("a b c");
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn braced_element_keeps_spaces() {
        let elements = parse("a {b c} d");
        assert_eq!(elements.len(), 3);
        assert!(matches!(&elements[1], Word::Braced(b) if b.raw == "b c"));
    }

    #[test]
    fn dollar_is_literal_in_list_context() {
        let elements = parse("$x");
        assert!(matches!(&elements[0], Word::Bare(b) if b.text == "$x"));
    }

    #[test]
    fn escaped_space_stays_in_one_element() {
        let elements = parse(r"a\ b c");
        assert_eq!(elements.len(), 2);
        assert!(matches!(&elements[0], Word::Bare(b) if b.text == r"a\ b"));
    }
}
