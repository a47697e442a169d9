//! Script- and command-level grammar (spec §4B, top half).
//!
//! Grounded on `yash_syntax::parser::simple_command` for the
//! "skip-separators, collect-words, stop-at-terminator" shape, adapted to
//! Tcl's separators (`;` and newline, not `&&`/`||`/pipe) and its
//! command-start-only comment rule.

use crate::parser::core::Parser;
use crate::parser::error::{ParseError, SyntaxErrorKind};
use crate::syntax::{Comment, Command, Script, ScriptItem};

impl Parser {
    /// Parses a full script, stopping at end of input.
    pub fn parse_script(&mut self) -> Result<Script, ParseError> {
        self.parse_script_until(None)
    }

    /// Parses a script, stopping either at end of input or, if `terminator`
    /// is given, just before that character at top level — used to parse
    /// the body of a `[...]` command substitution without consuming its
    /// closing bracket.
    pub(crate) fn parse_script_until(
        &mut self,
        terminator: Option<char>,
    ) -> Result<Script, ParseError> {
        let start = self.lexer.position();
        let mut items = Vec::new();
        loop {
            self.skip_separators()?;
            match self.lexer.peek_char() {
                None => break,
                Some(c) if Some(c) == terminator => break,
                Some('#') if self.lexer.at_command_start() => {
                    let (text, span) = self.lexer.scan_comment().expect("peeked '#'");
                    items.push(ScriptItem::Comment(Comment { text, span }));
                }
                _ => {
                    if let Some(command) = self.parse_command(terminator)? {
                        items.push(ScriptItem::Command(command));
                    }
                }
            }
        }
        Ok(Script {
            items,
            span: self.lexer.span_from(start),
        })
    }

    /// Consumes command separators (`;`, newline) and non-comment blanks
    /// between commands.
    fn skip_separators(&mut self) -> Result<(), ParseError> {
        loop {
            self.lexer.skip_blanks()?;
            match self.lexer.peek_char() {
                Some(';') | Some('\n') => {
                    self.lexer.bump();
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Parses one command: a sequence of words up to the next separator,
    /// terminator, or end of input. Returns `None` if no words were found
    /// (callers only invoke this once a separator/terminator/comment has
    /// already been ruled out, so an empty result means the terminator was
    /// reached immediately).
    fn parse_command(&mut self, terminator: Option<char>) -> Result<Option<Command>, ParseError> {
        let start = self.lexer.position();
        let mut words = Vec::new();
        loop {
            self.lexer.skip_blanks()?;
            match self.lexer.peek_char() {
                None | Some(';') | Some('\n') => break,
                Some(c) if Some(c) == terminator => break,
                Some('#') if !words.is_empty() => break,
                _ => {
                    words.push(self.parse_word()?);
                }
            }
        }
        if words.is_empty() {
            return Ok(None);
        }
        let inline_comment = self.parse_inline_comment()?;
        Ok(Some(Command {
            words,
            inline_comment,
            span: self.lexer.span_from(start),
        }))
    }

    /// Parses a trailing `# ...` comment on the same line as the command
    /// that just finished, if present.
    fn parse_inline_comment(&mut self) -> Result<Option<Comment>, ParseError> {
        self.lexer.skip_blanks()?;
        if self.lexer.peek_char() == Some('#') {
            let (text, span) = self.lexer.scan_comment().expect("peeked '#'");
            return Ok(Some(Comment { text, span }));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::core::ParserConfig;
    use crate::source::{Code, Origin};
    use crate::syntax::Spanned;

    fn parse(src: &str) -> Script {
        let mut parser = Parser::new(Code::new(src, Origin::Unknown), ParserConfig::default());
        parser.parse_script().unwrap()
    }

    #[test]
    fn empty_script_has_no_items() {
        let script = parse("   \n  \n");
        assert!(script.items.is_empty());
    }

    #[test]
    fn two_commands_separated_by_newline() {
        let script = parse("puts hi\nputs bye\n");
        assert_eq!(script.commands().count(), 2);
    }

    #[test]
    fn semicolon_separates_commands_on_one_line() {
        let script = parse("set x 1; set y 2");
        assert_eq!(script.commands().count(), 2);
    }

    #[test]
    fn leading_comment_is_a_script_item_not_inline() {
        let script = parse("# header\nputs hi\n");
        assert_eq!(script.items.len(), 2);
        match &script.items[0] {
            ScriptItem::Comment(c) => assert_eq!(c.text, " header"),
            _ => panic!("expected comment"),
        }
    }

    #[test]
    fn trailing_comment_attaches_to_command() {
        let script = parse("puts hi # say hi\n");
        let cmd = script.commands().next().unwrap();
        assert!(cmd.inline_comment.is_some());
    }

    #[test]
    fn semicolon_then_comment_is_a_separate_item() {
        // The `;` ends the command; `#` then starts at command-start
        // position, so it's a leading comment for whatever follows, not
        // this command's inline comment.
        let script = parse("puts hi ;# say hi\n");
        assert_eq!(script.items.len(), 2);
        let cmd = script.commands().next().unwrap();
        assert!(cmd.inline_comment.is_none());
    }

    #[test]
    fn command_span_covers_all_words() {
        let script = parse("set x 1");
        let cmd = script.commands().next().unwrap();
        assert_eq!(cmd.span().text(), "set x 1");
    }
}
