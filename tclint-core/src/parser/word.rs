//! Word grammar: dispatch on the first significant byte (spec §4B "Word
//! parse"), brace/quote/substitution recognition.
//!
//! Grounded on `yash_syntax::parser::lex::word` for the
//! fragment-collect-and-flush shape a word parser needs when plain text and
//! substitutions can alternate with no intervening whitespace.

use crate::lexer::is_blank;
use crate::parser::core::Parser;
use crate::parser::error::{ParseError, SyntaxErrorKind};
use crate::syntax::{
    ArgExpansion, BackslashSub, BareWord, BracedWord, CmdSub, CompoundWord, QuotedWord, VarSub,
    Word,
};

fn is_word_boundary(c: Option<char>) -> bool {
    matches!(c, None | Some('\n') | Some(';')) || matches!(c, Some(ch) if is_blank(ch))
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ':'
}

impl Parser {
    /// Parses one word, dispatching on its first character.
    pub fn parse_word(&mut self) -> Result<Word, ParseError> {
        if self.lexer.starts_with("{*}") && !is_word_boundary(self.lexer.peek_at(3)) {
            let start = self.lexer.position();
            self.lexer.bump_bytes(3);
            let inner = self.parse_word()?;
            return Ok(Word::ArgExpansion(ArgExpansion {
                word: Box::new(inner),
                span: self.lexer.span_from(start),
            }));
        }
        match self.lexer.peek_char() {
            Some('{') => self.parse_braced_word(),
            Some('"') => self.parse_quoted_word(),
            _ => self.parse_unquoted_word(),
        }
    }

    fn parse_braced_word(&mut self) -> Result<Word, ParseError> {
        let (raw, span) = self.lexer.scan_braced()?;
        let next = self.lexer.peek_char();
        if !is_word_boundary(next) {
            return Err(ParseError::new(
                SyntaxErrorKind::WordAfterCloseBrace,
                self.lexer.span_point(self.lexer.position()),
            ));
        }
        Ok(Word::Braced(BracedWord {
            raw,
            reparsed: None,
            span,
        }))
    }

    fn parse_quoted_word(&mut self) -> Result<Word, ParseError> {
        let start = self.lexer.position();
        self.lexer.bump(); // opening '"'
        let parts = self.collect_fragments(|c| matches!(c, None | Some('"')))?;
        match self.lexer.peek_char() {
            Some('"') => {
                self.lexer.bump();
            }
            _ => {
                return Err(ParseError::new(
                    SyntaxErrorKind::UnterminatedQuote,
                    self.lexer.span_point(start),
                ));
            }
        }
        Ok(Word::Quoted(QuotedWord {
            parts,
            span: self.lexer.span_from(start),
        }))
    }

    fn parse_unquoted_word(&mut self) -> Result<Word, ParseError> {
        let start = self.lexer.position();
        let mut fragments = self.collect_fragments(is_word_boundary)?;
        if fragments.is_empty() {
            return Err(ParseError::new(
                SyntaxErrorKind::ExpectedCommandWord,
                self.lexer.span_point(start),
            ));
        }
        if fragments.len() == 1 {
            Ok(fragments.pop().unwrap())
        } else {
            Ok(Word::Compound(CompoundWord {
                parts: fragments,
                span: self.lexer.span_from(start),
            }))
        }
    }

    /// Collects a run of literal text interspersed with `$`/`[`/`\`
    /// substitutions, stopping once `is_stop` accepts the next character (or
    /// end of input). Shared by unquoted words, quoted-word interiors, and
    /// array-index content — the three contexts where substitutions can
    /// appear without an intervening word boundary.
    fn collect_fragments(
        &mut self,
        is_stop: impl Fn(Option<char>) -> bool,
    ) -> Result<Vec<Word>, ParseError> {
        let mut fragments = Vec::new();
        let mut literal = String::new();
        let mut literal_start: Option<usize> = None;
        loop {
            let c = self.lexer.peek_char();
            if is_stop(c) {
                break;
            }
            match c.expect("is_stop(None) is always true") {
                '\\' => {
                    flush(&mut fragments, &mut literal, &mut literal_start, &self.lexer);
                    let bs = self.scan_backslash_escape()?;
                    fragments.push(Word::BackslashSub(bs));
                }
                '$' => {
                    flush(&mut fragments, &mut literal, &mut literal_start, &self.lexer);
                    fragments.push(self.parse_var_sub()?);
                }
                '[' => {
                    flush(&mut fragments, &mut literal, &mut literal_start, &self.lexer);
                    fragments.push(self.parse_cmd_sub()?);
                }
                c => {
                    if literal_start.is_none() {
                        literal_start = Some(self.lexer.position());
                    }
                    literal.push(c);
                    self.lexer.bump();
                }
            }
        }
        flush(&mut fragments, &mut literal, &mut literal_start, &self.lexer);
        Ok(fragments)
    }

    fn parse_var_sub(&mut self) -> Result<Word, ParseError> {
        let start = self.lexer.position();
        self.lexer.bump(); // '$'
        if self.lexer.peek_char() == Some('{') {
            self.lexer.bump();
            let mut name = String::new();
            loop {
                match self.lexer.peek_char() {
                    Some('}') => break,
                    None => {
                        return Err(ParseError::new(
                            SyntaxErrorKind::UnterminatedVarBrace,
                            self.lexer.span_point(start),
                        ));
                    }
                    Some(c) => {
                        name.push(c);
                        self.lexer.bump();
                    }
                }
            }
            if name.is_empty() {
                return Err(ParseError::new(
                    SyntaxErrorKind::EmptyVarName,
                    self.lexer.span_point(start),
                ));
            }
            self.lexer.bump(); // '}'
            return Ok(Word::VarSub(VarSub {
                name,
                index: None,
                braced: true,
                span: self.lexer.span_from(start),
            }));
        }

        let mut name = String::new();
        while let Some(c) = self.lexer.peek_char() {
            if is_name_char(c) {
                name.push(c);
                self.lexer.bump();
            } else {
                break;
            }
        }
        if name.is_empty() {
            // A bare `$` with nothing name-like after it is just a literal
            // dollar sign (real Tcl's behavior for `$` at end of word/before
            // punctuation).
            return Ok(Word::Bare(BareWord {
                text: "$".to_string(),
                span: self.lexer.span_from(start),
            }));
        }

        let index = if self.lexer.peek_char() == Some('(') {
            self.lexer.bump();
            let idx_start = self.lexer.position();
            let mut idx_fragments = self.collect_fragments(|c| matches!(c, None | Some(')')))?;
            match self.lexer.peek_char() {
                Some(')') => {
                    self.lexer.bump();
                }
                _ => {
                    return Err(ParseError::new(
                        SyntaxErrorKind::UnterminatedVarIndex,
                        self.lexer.span_point(idx_start),
                    ));
                }
            }
            let word = if idx_fragments.len() == 1 {
                idx_fragments.pop().unwrap()
            } else {
                Word::Compound(CompoundWord {
                    parts: idx_fragments,
                    span: self.lexer.span_from(idx_start),
                })
            };
            Some(Box::new(word))
        } else {
            None
        };

        Ok(Word::VarSub(VarSub {
            name,
            index,
            braced: false,
            span: self.lexer.span_from(start),
        }))
    }

    fn parse_cmd_sub(&mut self) -> Result<Word, ParseError> {
        let start = self.lexer.position();
        self.lexer.bump(); // '['
        self.enter_nested()?;
        let script = self.parse_script_until(Some(']'));
        self.leave_nested();
        let script = script?;
        match self.lexer.peek_char() {
            Some(']') => {
                self.lexer.bump();
            }
            _ => {
                return Err(ParseError::new(
                    SyntaxErrorKind::UnterminatedBracket,
                    self.lexer.span_point(start),
                ));
            }
        }
        Ok(Word::CmdSub(CmdSub {
            script,
            span: self.lexer.span_from(start),
        }))
    }

    /// Resolves one `\x` escape (spec §4A backslash table), starting at the
    /// backslash.
    fn scan_backslash_escape(&mut self) -> Result<BackslashSub, ParseError> {
        let start = self.lexer.position();
        self.lexer.bump(); // '\'
        let escaped = self.lexer.peek_char().ok_or_else(|| {
            ParseError::new(SyntaxErrorKind::DanglingBackslash, self.lexer.span_point(start))
        })?;
        let resolved = match escaped {
            '\n' => {
                self.lexer.bump();
                while let Some(c) = self.lexer.peek_char() {
                    if is_blank(c) {
                        self.lexer.bump();
                    } else {
                        break;
                    }
                }
                ' '
            }
            'a' => {
                self.lexer.bump();
                '\u{7}'
            }
            'b' => {
                self.lexer.bump();
                '\u{8}'
            }
            'f' => {
                self.lexer.bump();
                '\u{c}'
            }
            'n' => {
                self.lexer.bump();
                '\n'
            }
            'r' => {
                self.lexer.bump();
                '\r'
            }
            't' => {
                self.lexer.bump();
                '\t'
            }
            'v' => {
                self.lexer.bump();
                '\u{b}'
            }
            'x' => {
                self.lexer.bump();
                let digits = self.take_while_hex(usize::MAX);
                if digits.is_empty() {
                    'x'
                } else {
                    let code = u32::from_str_radix(&digits, 16).unwrap_or(0) & 0xff;
                    char::from_u32(code).unwrap_or('\u{fffd}')
                }
            }
            'u' => {
                self.lexer.bump();
                let digits = self.take_while_hex(4);
                if digits.is_empty() {
                    'u'
                } else {
                    let code = u32::from_str_radix(&digits, 16).unwrap_or(0);
                    char::from_u32(code).unwrap_or('\u{fffd}')
                }
            }
            '0'..='7' => {
                let mut digits = String::new();
                while digits.len() < 3 {
                    match self.lexer.peek_char() {
                        Some(c) if ('0'..='7').contains(&c) => {
                            digits.push(c);
                            self.lexer.bump();
                        }
                        _ => break,
                    }
                }
                let code = u32::from_str_radix(&digits, 8).unwrap_or(0) & 0xff;
                char::from_u32(code).unwrap_or('\u{fffd}')
            }
            other => {
                self.lexer.bump();
                other
            }
        };
        Ok(BackslashSub {
            escaped,
            resolved,
            span: self.lexer.span_from(start),
        })
    }

    fn take_while_hex(&mut self, max: usize) -> String {
        let mut digits = String::new();
        while digits.len() < max {
            match self.lexer.peek_char() {
                Some(c) if c.is_ascii_hexdigit() => {
                    digits.push(c);
                    self.lexer.bump();
                }
                _ => break,
            }
        }
        digits
    }
}

fn flush(
    fragments: &mut Vec<Word>,
    literal: &mut String,
    literal_start: &mut Option<usize>,
    lexer: &crate::lexer::Lexer,
) {
    if let Some(start) = literal_start.take() {
        if !literal.is_empty() {
            fragments.push(Word::Bare(BareWord {
                text: std::mem::take(literal),
                span: lexer.span_from(start),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::core::ParserConfig;
    use crate::source::{Code, Origin};
    use crate::syntax::Spanned;

    fn parse_one_word(src: &str) -> Word {
        let mut parser = Parser::new(Code::new(src, Origin::Unknown), ParserConfig::default());
        parser.parse_word().unwrap()
    }

    #[test]
    fn bare_word() {
        let w = parse_one_word("hello");
        assert!(matches!(w, Word::Bare(b) if b.text == "hello"));
    }

    #[test]
    fn braced_word_keeps_raw_text() {
        let w = parse_one_word("{a b c}");
        assert!(matches!(w, Word::Braced(b) if b.raw == "a b c"));
    }

    #[test]
    fn braced_word_followed_by_text_is_error() {
        let mut parser = Parser::new(Code::new("{a}b", Origin::Unknown), ParserConfig::default());
        assert!(parser.parse_word().is_err());
    }

    #[test]
    fn var_sub_bare_name() {
        let w = parse_one_word("$x");
        assert!(matches!(w, Word::VarSub(v) if v.name == "x" && !v.braced));
    }

    #[test]
    fn var_sub_braced_name() {
        let w = parse_one_word("${my var}");
        assert!(matches!(w, Word::VarSub(v) if v.name == "my var" && v.braced));
    }

    #[test]
    fn var_sub_with_index() {
        let w = parse_one_word("$arr(1)");
        match w {
            Word::VarSub(v) => {
                assert_eq!(v.name, "arr");
                assert!(v.index.is_some());
            }
            _ => panic!("expected VarSub"),
        }
    }

    #[test]
    fn compound_word_mixes_literal_and_substitution() {
        let w = parse_one_word("foo$bar");
        match w {
            Word::Compound(c) => assert_eq!(c.parts.len(), 2),
            _ => panic!("expected compound word"),
        }
    }

    #[test]
    fn cmd_sub_parses_nested_script() {
        let w = parse_one_word("[puts hi]");
        match w {
            Word::CmdSub(c) => assert_eq!(c.script.commands().count(), 1),
            _ => panic!("expected CmdSub"),
        }
    }

    #[test]
    fn backslash_n_resolves_to_newline() {
        let w = parse_one_word(r"\n");
        assert!(matches!(w, Word::BackslashSub(b) if b.resolved == '\n'));
    }

    #[test]
    fn arg_expansion_wraps_following_word() {
        let w = parse_one_word("{*}$list");
        match w {
            Word::ArgExpansion(e) => assert!(matches!(*e.word, Word::VarSub(_))),
            _ => panic!("expected ArgExpansion"),
        }
    }

    #[test]
    fn quoted_word_span_includes_quotes() {
        let w = parse_one_word("\"a b\"");
        assert_eq!(w.span().text(), "\"a b\"");
    }
}
