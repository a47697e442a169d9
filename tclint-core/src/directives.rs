//! Inline directive resolver (spec §4F): `tclint-disable`/`-enable` comments.
//!
//! New relative to the teacher (`yash-syntax` has no comment-directive
//! concept), but built the way the rest of this crate treats comment/text
//! scanning — a `regex` pattern compiled once via `OnceLock`, the same
//! approach `rules::style`'s URL heuristic uses.

use crate::rules::Violation;
use crate::syntax::{walk_command, walk_script, Command, Comment, Script, Visitor};
use std::ops::Range;
use std::sync::OnceLock;

#[derive(Clone, Debug, Eq, PartialEq)]
enum RuleFilter {
    All,
    Rules(Vec<String>),
}

impl RuleFilter {
    fn matches(&self, rule_id: &str) -> bool {
        match self {
            RuleFilter::All => true,
            RuleFilter::Rules(rules) => rules.iter().any(|r| r == rule_id),
        }
    }

    fn from_rule_list(text: &str) -> Self {
        let rules: Vec<String> = text.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
        if rules.is_empty() {
            RuleFilter::All
        } else {
            RuleFilter::Rules(rules)
        }
    }
}

enum DirectiveKind {
    Disable,
    Enable,
    DisableLine,
    DisableNextLine,
}

fn directive_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"tclint-(disable-next-line|disable-line|disable|enable)\b\s*(.*)").expect("static pattern is valid")
    })
}

fn parse_directive(text: &str) -> Option<(DirectiveKind, RuleFilter)> {
    let captures = directive_pattern().captures(text)?;
    let kind = match &captures[1] {
        "disable" => DirectiveKind::Disable,
        "enable" => DirectiveKind::Enable,
        "disable-line" => DirectiveKind::DisableLine,
        "disable-next-line" => DirectiveKind::DisableNextLine,
        _ => unreachable!("regex alternation only matches the four listed directives"),
    };
    let filter = RuleFilter::from_rule_list(captures[2].trim());
    Some((kind, filter))
}

/// A resolved set of per-rule suppressed line ranges, computed once per
/// script and reused to filter however many violations the rule engine
/// produced.
#[derive(Debug, Default)]
pub struct Directives {
    /// `(filter, inclusive line range)` pairs; a violation is suppressed if
    /// any entry matches its rule and contains its line.
    ranges: Vec<(RuleFilter, Range<u32>)>,
}

impl Directives {
    /// Scans every comment (standalone and inline) in `script` for
    /// directives and resolves their suppressed ranges.
    pub fn resolve(script: &Script) -> Self {
        struct CommentCollector(Vec<(u32, String)>);
        impl Visitor for CommentCollector {
            fn visit_comment(&mut self, comment: &Comment) {
                self.0.push((comment.span.start().line, comment.text.clone()));
            }
            fn visit_command(&mut self, command: &Command) {
                if let Some(c) = &command.inline_comment {
                    self.visit_comment(c);
                }
                walk_command(self, command);
            }
        }

        let mut collector = CommentCollector(Vec::new());
        walk_script(&mut collector, script);
        collector.0.sort_by_key(|(line, _)| *line);

        let file_end_line = script.span.end().line;
        let mut ranges = Vec::new();
        // Open `tclint-disable` intervals not yet closed by a matching
        // `tclint-enable`, most-recently-opened last.
        let mut open: Vec<(RuleFilter, u32)> = Vec::new();

        for (line, text) in &collector.0 {
            let Some((kind, filter)) = parse_directive(text) else {
                continue;
            };
            match kind {
                DirectiveKind::Disable => open.push((filter, line + 1)),
                DirectiveKind::DisableLine => ranges.push((filter, *line..*line + 1)),
                DirectiveKind::DisableNextLine => ranges.push((filter, line + 1..line + 2)),
                DirectiveKind::Enable => {
                    // Closes the most recently opened interval matching
                    // `filter` (`RuleFilter::All` closes whatever is on top
                    // of the stack, specific-rule `enable` looks for an
                    // interval opened with that exact rule list).
                    let close_at = match filter {
                        RuleFilter::All => open.pop(),
                        RuleFilter::Rules(ref rules) => {
                            let pos = open.iter().rposition(|(f, _)| matches!(f, RuleFilter::Rules(r) if r == rules));
                            pos.map(|i| open.remove(i))
                        }
                    };
                    if let Some((opened_filter, start_line)) = close_at {
                        ranges.push((opened_filter, start_line..*line + 1));
                    }
                }
            }
        }
        // Any interval never closed by `enable` runs to the end of the file.
        for (filter, start_line) in open {
            ranges.push((filter, start_line..file_end_line + 1));
        }

        Directives { ranges }
    }

    /// Whether `rule_id` is suppressed at `line` (1-based).
    pub fn is_suppressed(&self, rule_id: &str, line: u32) -> bool {
        self.ranges.iter().any(|(filter, range)| filter.matches(rule_id) && range.contains(&line))
    }

    /// Drops every violation this directive set suppresses.
    pub fn filter(&self, violations: Vec<Violation>) -> Vec<Violation> {
        violations.into_iter().filter(|v| !self.is_suppressed(v.rule_id, v.span.start().line)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LintConfig;
    use crate::parser::{Parser, ParserConfig};
    use crate::registry::builtins;
    use crate::rules::RuleEngine;
    use crate::source::{Code, Origin};

    fn lint(src: &str) -> Vec<Violation> {
        let mut parser = Parser::new(Code::new(src, Origin::Unknown), ParserConfig::default());
        let mut script = parser.parse_script().unwrap();
        let mut violations = crate::registry::dispatch(&builtins::registry(), &mut script);
        violations.extend(RuleEngine::default().run(&script, src, &LintConfig::default()));
        Directives::resolve(&script).filter(violations)
    }

    #[test]
    fn disable_next_line_suppresses_only_that_line() {
        let src = "# tclint-disable-next-line command-args\nputs a b c d e\nputs f g h i j\n";
        let v = lint(src);
        assert_eq!(v.iter().filter(|v| v.rule_id == "command-args").count(), 1);
    }

    #[test]
    fn disable_without_rule_list_suppresses_everything_until_enable() {
        let src = "# tclint-disable\nproc if {} {}\n# tclint-enable\nproc if2 {} {}\n";
        let v = lint(src);
        assert!(v.iter().all(|v| v.span.start().line != 2));
    }

    #[test]
    fn disable_line_only_covers_its_own_line() {
        let src = "proc if {} {} ;# tclint-disable-line redefined-builtin\nproc if {} {}\n";
        let v = lint(src);
        assert_eq!(v.iter().filter(|v| v.rule_id == "redefined-builtin").count(), 1);
    }
}
