//! Style rules (spec §4E): violations about layout rather than meaning.
//!
//! Several of these work directly over `source` rather than the tree
//! (`line-length`, `trailing-whitespace`, `blank-lines`, `backslash-spacing`)
//! the way a line-oriented linter naturally would; the rest (`indent`,
//! `spacing`, `spaces-in-braces`) need the tree to know where a command or
//! braced word sits relative to its siblings and its nesting depth.

use crate::config::{IndentStyle, LintConfig};
use crate::rules::{Category, Rule, Violation};
use crate::source::{Code, Span};
use crate::syntax::{walk_command, walk_script, Command, MaybeLiteral, Reparsed, Script, ScriptItem, Spanned, Visitor, Word};
use std::ops::Range;
use std::rc::Rc;
use std::sync::OnceLock;
use unicode_width::UnicodeWidthStr;

/// Runs `f` once per line of `source`, handing back the line's 1-based
/// number, its byte range (excluding the terminating `\n`, including a
/// trailing `\r` if present), and its text.
fn for_each_line<'a>(source: &'a str, mut f: impl FnMut(u32, Range<usize>, &'a str)) {
    let mut start = 0;
    let mut line_no = 1u32;
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            f(line_no, start..i, &source[start..i]);
            start = i + 1;
            line_no += 1;
        }
    }
    if start < source.len() {
        f(line_no, start..source.len(), &source[start..]);
    }
}

fn span_for(code: &Rc<Code>, range: Range<usize>) -> Span {
    Span {
        code: Rc::clone(code),
        range,
    }
}

fn url_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"[a-z]+://\S+").expect("static pattern is valid"))
}

/// Any line whose display width exceeds the configured limit, excluding
/// lines containing a URL (spec §4E, §8).
pub struct LineLength;

impl Rule for LineLength {
    fn id(&self) -> &'static str {
        "line-length"
    }
    fn category(&self) -> Category {
        Category::Style
    }
    fn check(&self, script: &Script, source: &str, config: &LintConfig, out: &mut Vec<Violation>) {
        let code = &script.span.code;
        let limit = config.style.line_length;
        for_each_line(source, |_line_no, range, text| {
            if url_pattern().is_match(text) {
                return;
            }
            if text.width() > limit {
                out.push(Violation::new(
                    "line-length",
                    Category::Style,
                    format!("line is {} columns wide, limit is {limit}", text.width()),
                    span_for(code, range),
                ));
            }
        });
    }
}

/// Any line ending in `[ \t]+` before its newline.
pub struct TrailingWhitespace;

impl Rule for TrailingWhitespace {
    fn id(&self) -> &'static str {
        "trailing-whitespace"
    }
    fn category(&self) -> Category {
        Category::Style
    }
    fn check(&self, script: &Script, source: &str, _config: &LintConfig, out: &mut Vec<Violation>) {
        let code = &script.span.code;
        for_each_line(source, |_line_no, range, text| {
            let trimmed = text.trim_end_matches(['\r']);
            let stripped = trimmed.trim_end_matches([' ', '\t']);
            if stripped.len() != trimmed.len() {
                out.push(Violation::new(
                    "trailing-whitespace",
                    Category::Style,
                    "trailing whitespace",
                    span_for(code, range.start + stripped.len()..range.start + trimmed.len()),
                ));
            }
        });
    }
}

/// More than `max_blank_lines` consecutive blank lines inside a script body.
pub struct BlankLines;

impl Rule for BlankLines {
    fn id(&self) -> &'static str {
        "blank-lines"
    }
    fn category(&self) -> Category {
        Category::Style
    }
    fn check(&self, script: &Script, source: &str, config: &LintConfig, out: &mut Vec<Violation>) {
        let code = &script.span.code;
        let limit = config.style.max_blank_lines;

        let mut run_start: Option<usize> = None; // byte offset of the run's first line
        let mut run_len = 0usize;
        let mut run_end = 0usize;

        let mut flush = |run_start: &mut Option<usize>, run_len: &mut usize, run_end: usize, out: &mut Vec<Violation>| {
            if *run_len > limit {
                out.push(Violation::new(
                    "blank-lines",
                    Category::Style,
                    format!("{run_len} consecutive blank lines, limit is {limit}"),
                    span_for(code, run_start.unwrap()..run_end),
                ));
            }
            *run_start = None;
            *run_len = 0;
        };

        for_each_line(source, |_line_no, range, text| {
            if text.trim().is_empty() {
                if run_start.is_none() {
                    run_start = Some(range.start);
                }
                run_len += 1;
                run_end = range.end;
            } else {
                flush(&mut run_start, &mut run_len, run_end, out);
            }
        });
        flush(&mut run_start, &mut run_len, run_end, out);
    }
}

/// Actual leading whitespace does not match the indentation a line's
/// nesting depth implies (tclint-only; spec §4E notes `tclfmt` supersedes
/// this once a file is run through the formatter).
pub struct Indent;

impl Rule for Indent {
    fn id(&self) -> &'static str {
        "indent"
    }
    fn category(&self) -> Category {
        Category::Style
    }
    fn check(&self, script: &Script, source: &str, config: &LintConfig, out: &mut Vec<Violation>) {
        check_script_indent(script, source, config, 0, out);
    }
}

fn expected_indent(style: &IndentStyle, depth: u32) -> String {
    let depth = depth as usize;
    match style {
        IndentStyle::Tab => "\t".repeat(depth),
        IndentStyle::Spaces(n) => " ".repeat(depth * *n as usize),
        // Mixed indent styles are uncommon; this rule approximates them as
        // plain space-indentation using the `spaces` width. The formatter
        // (crate::format), not this rule, is the source of truth for mixed
        // rendering.
        IndentStyle::Mixed { spaces, .. } => " ".repeat(depth * *spaces as usize),
    }
}

fn is_namespace_eval(command: &Command) -> bool {
    command.name_literal().as_deref() == Some("namespace")
        && command.words.get(1).and_then(Word::to_string_if_literal).as_deref() == Some("eval")
}

/// The whitespace run from the start of `byte_offset`'s line up to
/// `byte_offset`, or `None` if anything other than spaces/tabs precedes it
/// (meaning this command isn't the line's first token, e.g. it follows a
/// `;` — the indent rule only judges lines a command actually opens).
fn leading_ws(source: &str, byte_offset: usize) -> Option<&str> {
    let line_start = source[..byte_offset].rfind('\n').map_or(0, |i| i + 1);
    let candidate = &source[line_start..byte_offset];
    candidate.chars().all(|c| c == ' ' || c == '\t').then_some(candidate)
}

fn check_script_indent(script: &Script, source: &str, config: &LintConfig, depth: u32, out: &mut Vec<Violation>) {
    for item in &script.items {
        let ScriptItem::Command(command) = item else { continue };
        let start = command.span().range.start;
        if let Some(actual) = leading_ws(source, start) {
            let expected = expected_indent(&config.style.indent, depth);
            if actual != expected {
                out.push(Violation::new(
                    "indent",
                    Category::Style,
                    format!("expected {} column(s) of indentation, found {}", expected.width(), actual.width()),
                    command.span().clone(),
                ));
            }
        }

        let nested_depth = if is_namespace_eval(command) && !config.style.indent_namespace_eval {
            depth
        } else {
            depth + 1
        };
        for word in &command.words {
            if let Word::Braced(b) = word {
                if let Some(Reparsed::Script(inner)) = &b.reparsed {
                    check_script_indent(inner, source, config, nested_depth, out);
                }
            }
        }
    }
}

/// More than one space between two argument words on the same source line.
///
/// `allow_aligned_sets` exempts the gap between a `set` command's variable
/// name and its value, so consecutive `set` statements may pad that gap to
/// align a column of values (spec §4E).
pub struct Spacing;

impl Rule for Spacing {
    fn id(&self) -> &'static str {
        "spacing"
    }
    fn category(&self) -> Category {
        Category::Style
    }
    fn check(&self, script: &Script, _source: &str, config: &LintConfig, out: &mut Vec<Violation>) {
        struct Finder<'a> {
            out: &'a mut Vec<Violation>,
            allow_aligned_sets: bool,
        }
        impl Visitor for Finder<'_> {
            fn visit_command(&mut self, command: &Command) {
                let is_set = command.name_literal().as_deref() == Some("set");
                for i in 0..command.words.len().saturating_sub(1) {
                    let a = command.words[i].span();
                    let b = command.words[i + 1].span();
                    if a.end().line != b.start().line {
                        continue; // different lines: the `indent` rule's job
                    }
                    let gap = &a.code.text()[a.range.end..b.range.start];
                    if !gap.chars().all(|c| c == ' ' || c == '\t') {
                        continue; // shouldn't happen for adjacent words, but don't misfire
                    }
                    if gap.chars().count() <= 1 {
                        continue;
                    }
                    if self.allow_aligned_sets && is_set && i == 1 {
                        continue;
                    }
                    self.out.push(Violation::new(
                        "spacing",
                        Category::Style,
                        "more than one space between words",
                        command.words[i + 1].span().clone(),
                    ));
                }
                walk_command(self, command);
            }
        }
        walk_script(
            &mut Finder {
                out,
                allow_aligned_sets: config.rules.allow_aligned_sets,
            },
            script,
        );
    }
}

/// A line-continuation backslash not separated from preceding content by
/// exactly one space (spec §4G "Line-continuation backslashes").
pub struct BackslashSpacing;

impl Rule for BackslashSpacing {
    fn id(&self) -> &'static str {
        "backslash-spacing"
    }
    fn category(&self) -> Category {
        Category::Style
    }
    fn check(&self, script: &Script, source: &str, _config: &LintConfig, out: &mut Vec<Violation>) {
        let code = &script.span.code;
        for_each_line(source, |_line_no, range, text| {
            let trimmed = text.trim_end_matches('\r');
            let backslash_run = trimmed.bytes().rev().take_while(|&b| b == b'\\').count();
            if backslash_run == 0 || backslash_run % 2 == 0 {
                return; // no continuation, or the trailing backslash is itself escaped
            }
            let before = &trimmed[..trimmed.len() - backslash_run];
            let space_run = before.chars().rev().take_while(|&c| c == ' ').count();
            let well_spaced = space_run == 1 && !before[..before.len() - 1].ends_with('\t');
            if !well_spaced {
                let run_start = range.start + before.len();
                out.push(Violation::new(
                    "backslash-spacing",
                    Category::Style,
                    "line-continuation backslash should be preceded by exactly one space",
                    span_for(code, run_start..run_start + 1),
                ));
            }
        });
    }
}

/// Whether a braced body's padding matches `spaces_in_braces` (spec §6:
/// `true` ⇒ `{ contents }`, `false` ⇒ `{contents}`).
///
/// Only applies to braces the formatter actually controls — a word
/// re-parsed as a nested script or list — since a plain literal brace body
/// may carry meaningful leading/trailing whitespace as data.
pub struct SpacesInBraces;

impl Rule for SpacesInBraces {
    fn id(&self) -> &'static str {
        "spaces-in-braces"
    }
    fn category(&self) -> Category {
        Category::Style
    }
    fn check(&self, script: &Script, _source: &str, config: &LintConfig, out: &mut Vec<Violation>) {
        struct Finder<'a> {
            out: &'a mut Vec<Violation>,
            want_spaces: bool,
        }
        impl Visitor for Finder<'_> {
            fn visit_word(&mut self, word: &Word) {
                if let Word::Braced(b) = word {
                    let structural = matches!(&b.reparsed, Some(Reparsed::Script(_)) | Some(Reparsed::List(_)));
                    if structural && !b.raw.is_empty() {
                        let starts_ok = b.raw.starts_with(' ') == self.want_spaces;
                        let ends_ok = b.raw.ends_with(' ') == self.want_spaces;
                        if !starts_ok || !ends_ok {
                            self.out.push(Violation::new(
                                "spaces-in-braces",
                                Category::Style,
                                if self.want_spaces {
                                    "expected a space just inside each brace"
                                } else {
                                    "expected no space just inside the braces"
                                },
                                word.span().clone(),
                            ));
                        }
                    }
                }
                crate::syntax::walk_word(self, word);
            }
        }
        walk_script(
            &mut Finder {
                out,
                want_spaces: config.style.spaces_in_braces,
            },
            script,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, ParserConfig};
    use crate::registry::builtins;
    use crate::source::Origin;

    fn check(rule: &dyn Rule, src: &str, config: &LintConfig) -> Vec<Violation> {
        let mut parser = Parser::new(Code::new(src, Origin::Unknown), ParserConfig::default());
        let mut script = parser.parse_script().unwrap();
        crate::registry::dispatch(&builtins::registry(), &mut script);
        let mut out = Vec::new();
        rule.check(&script, src, config, &mut out);
        out
    }

    #[test]
    fn flags_a_too_long_line() {
        let mut config = LintConfig::default();
        config.style.line_length = 10;
        let v = check(&LineLength, "puts {this is a long line}\n", &config);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn url_lines_are_exempt_from_line_length() {
        let mut config = LintConfig::default();
        config.style.line_length = 10;
        let v = check(&LineLength, "puts http://example.com/a/very/long/path\n", &config);
        assert!(v.is_empty());
    }

    #[test]
    fn flags_trailing_whitespace() {
        let v = check(&TrailingWhitespace, "puts hi  \n", &LintConfig::default());
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn flags_excess_blank_lines() {
        let mut config = LintConfig::default();
        config.style.max_blank_lines = 1;
        let v = check(&BlankLines, "puts a\n\n\n\nputs b\n", &config);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn flags_nested_body_indented_wrong() {
        let v = check(&Indent, "if {1} {\nputs hi\n}\n", &LintConfig::default());
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn accepts_correctly_indented_nested_body() {
        let v = check(&Indent, "if {1} {\n    puts hi\n}\n", &LintConfig::default());
        assert!(v.is_empty());
    }

    #[test]
    fn flags_double_space_between_words() {
        let v = check(&Spacing, "puts  hi\n", &LintConfig::default());
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn allow_aligned_sets_exempts_set_value_gap() {
        let mut config = LintConfig::default();
        config.rules.allow_aligned_sets = true;
        let v = check(&Spacing, "set x     1\n", &config);
        assert!(v.is_empty());
    }

    #[test]
    fn flags_unspaced_continuation_backslash() {
        let v = check(&BackslashSpacing, "set x 1\\\n  + 2\n", &LintConfig::default());
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn accepts_properly_spaced_continuation_backslash() {
        let v = check(&BackslashSpacing, "set x 1 \\\n  + 2\n", &LintConfig::default());
        assert!(v.is_empty());
    }
}
