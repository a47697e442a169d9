//! Violations, the `Rule` trait, and the engine that runs them (spec §4E).
//!
//! New relative to the teacher — `yash-syntax` has no lint layer — but the
//! ordering contract (start position, then rule id) is a plain `Ord` impl,
//! the way a teacher-style crate would express a total order rather than
//! reach for a custom comparator function.

pub mod style;
pub mod usage;

use crate::config::LintConfig;
use crate::source::{Position, Span};
use crate::syntax::{Spanned, Script};
use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};

/// Which half of the rule list (spec §4E) a rule belongs to. Fixed per
/// rule, not configurable — only whether a rule is *enabled* is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Category {
    Style,
    Usage,
}

/// A single reported issue.
#[derive(Clone, Debug)]
pub struct Violation {
    pub rule_id: &'static str,
    pub category: Category,
    pub message: String,
    pub span: Span,
}

impl Violation {
    pub fn new(rule_id: &'static str, category: Category, message: impl Into<String>, span: Span) -> Self {
        Violation {
            rule_id,
            category,
            message: message.into(),
            span,
        }
    }

    fn start(&self) -> Position {
        self.span.start()
    }
}

impl PartialEq for Violation {
    fn eq(&self, other: &Self) -> bool {
        self.start() == other.start() && self.rule_id == other.rule_id
    }
}
impl Eq for Violation {}

impl PartialOrd for Violation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Violation {
    /// Violations sort by source position first, then by rule id, so a
    /// caller rendering a report never has to re-sort or explain ties
    /// (spec §8: "violations for one file are emitted in position order").
    fn cmp(&self, other: &Self) -> Ordering {
        (self.start().line, self.start().column, self.rule_id).cmp(&(
            other.start().line,
            other.start().column,
            other.rule_id,
        ))
    }
}

/// A single check over a parsed script.
///
/// Most rules only need the raw source text (`line-length`,
/// `trailing-whitespace`) or a tree walk (`redundant-expr`); `source` is
/// passed alongside the tree so both kinds share one signature rather than
/// forcing text-based rules to reconstruct text from spans.
pub trait Rule {
    fn id(&self) -> &'static str;
    fn category(&self) -> Category;
    fn check(&self, script: &Script, source: &str, config: &LintConfig, out: &mut Vec<Violation>);
}

/// Runs every enabled rule over a script in one call, returning violations
/// in the ordering contract above.
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        RuleEngine {
            rules: vec![
                Box::new(usage::RedefinedBuiltin),
                Box::new(usage::UnbracedExpr),
                Box::new(usage::RedundantExpr),
                Box::new(usage::ExprFormat),
                Box::new(style::LineLength),
                Box::new(style::TrailingWhitespace),
                Box::new(style::BlankLines),
                Box::new(style::Indent),
                Box::new(style::Spacing),
                Box::new(style::BackslashSpacing),
                Box::new(style::SpacesInBraces),
            ],
        }
    }
}

impl RuleEngine {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        RuleEngine { rules }
    }

    /// Runs every rule enabled by `config.rules` and returns violations in
    /// the crate-wide ordering contract. A rule that panics internally is
    /// never allowed to propagate past this call: §7's "rule engines never
    /// throw to the caller" is upheld by catching the unwind here and
    /// reporting it as an `internal-error` violation scoped to the whole
    /// file instead, logged via `tracing::error!` alongside.
    pub fn run(&self, script: &Script, source: &str, config: &LintConfig) -> Vec<Violation> {
        let mut out = Vec::new();
        for rule in &self.rules {
            if !config.rules.is_enabled(rule.id()) {
                continue;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut found = Vec::new();
                rule.check(script, source, config, &mut found);
                found
            }));
            match outcome {
                Ok(found) => out.extend(found),
                Err(_) => {
                    tracing::error!(rule_id = rule.id(), "rule panicked; reporting as internal-error");
                    out.push(Violation::new(
                        "internal-error",
                        Category::Usage,
                        format!("rule `{}` failed unexpectedly and was skipped", rule.id()),
                        script.span().clone(),
                    ));
                }
            }
        }
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Code, Origin};

    fn span_at(line_text: &str, offset: usize) -> Span {
        let code = Code::new(line_text, Origin::Unknown);
        Span { code, range: offset..offset + 1 }
    }

    #[test]
    fn violations_sort_by_position_then_rule_id() {
        let mut v = vec![
            Violation::new("line-length", Category::Style, "m", span_at("x\ny\n", 2)),
            Violation::new("command-args", Category::Usage, "m", span_at("x\ny\n", 2)),
            Violation::new("line-length", Category::Style, "m", span_at("x\ny\n", 0)),
        ];
        v.sort();
        assert_eq!(v[0].span.start().line, 1);
        assert_eq!(v[1].rule_id, "command-args");
        assert_eq!(v[2].rule_id, "line-length");
    }

    struct PanickingRule;
    impl Rule for PanickingRule {
        fn id(&self) -> &'static str {
            "panicking-rule"
        }
        fn category(&self) -> Category {
            Category::Usage
        }
        fn check(&self, _script: &Script, _source: &str, _config: &LintConfig, _out: &mut Vec<Violation>) {
            panic!("simulated rule bug");
        }
    }

    #[test]
    fn a_panicking_rule_is_reported_as_internal_error_not_propagated() {
        let engine = RuleEngine::new(vec![Box::new(PanickingRule)]);
        let code = Code::new("set x 1\n", Origin::Unknown);
        let script = Script { items: Vec::new(), span: Span { code, range: 0..0 } };
        let prev_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let violations = engine.run(&script, "set x 1\n", &LintConfig::default());
        panic::set_hook(prev_hook);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "internal-error");
    }
}
