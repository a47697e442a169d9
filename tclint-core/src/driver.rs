//! Driver façade (spec §4H): the operations an outer collaborator — a CLI,
//! a language server — calls to use this crate at all.
//!
//! New relative to the teacher: `yash-syntax` has no single "entry point"
//! module, since it's consumed piece-by-piece by the rest of the shell.
//! This crate is meant to be used as a whole, so it gets one, grounded on
//! the "pure function over a source string and a config snapshot" shape
//! spec §5 mandates (no shared mutable state between calls, no I/O).

use crate::config::LintConfig;
use crate::directives::Directives;
use crate::registry::{builtins, collect_proc_declarations};
use crate::rules::{Category, RuleEngine, Violation};
use crate::source::{Code, Origin, Span};
use crate::syntax::Script;
use crate::{parser, registry};
use std::rc::Rc;
use thiserror::Error;

/// Raised only by [`format_debug_checked`]'s `-d` invariant check (spec
/// §7.5): the pretty-printer is never supposed to drop, reorder, or invent a
/// word, so a caller running in debug mode can ask the driver to verify
/// that its own output re-parses to a structurally equivalent tree before
/// trusting it. Never returned by plain [`format`]/[`format_with_registry`].
#[derive(Debug, Error)]
pub enum FormatterInvariantViolation {
    #[error("formatted output failed to re-parse: {0}")]
    ReparseFailed(#[from] parser::ParseError),
    #[error("formatted output does not re-parse to a structurally equivalent tree (before: `{before}`, after: `{after}`)")]
    StructuralMismatch { before: String, after: String },
}

/// A `proc` declaration, as `symbols` reports it to an LSP document-symbol
/// request (spec §4H).
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub span: Span,
}

/// Parses `source`, translating an unrecoverable syntax error into a single
/// `parse-error` violation rather than failing the call outright (spec
/// §7.3: "surfaced as a violation at the failing span").
///
/// This crate's parser has no alias-substitution-restart machinery to
/// resynchronize with (see `DESIGN.md`'s note on the dropped `Rec<T>`
/// teacher mechanism), so unlike a true recovering parser it cannot resume
/// past the failing construct and keep collecting commands after it; a
/// syntax error yields an empty tree plus that one violation, rather than a
/// partial tree plus violations for everything that parsed before it.
fn parse(source: &str, origin: Origin) -> (Script, Vec<Violation>) {
    let code = Code::new(source, origin);
    let mut p = parser::Parser::new(Rc::clone(&code), parser::ParserConfig::default());
    match p.parse_script() {
        Ok(script) => (script, Vec::new()),
        Err(err) => {
            let violation = Violation::new("parse-error", Category::Usage, err.kind.to_string(), err.span.clone());
            let empty = Script {
                items: Vec::new(),
                span: Span { code, range: 0..0 },
            };
            (empty, vec![violation])
        }
    }
}

/// Lints `source` against `commands` (the merged built-in-plus-plugin
/// command table a caller assembled at startup, spec §6 "Loaded at driver
/// init; never loaded dynamically from the config file") and `config`.
///
/// Returns every violation in the crate-wide ordering contract
/// (`rules::Violation`'s `Ord` impl), with inline `tclint-disable`/
/// `-enable` directives already applied.
pub fn lint_with_registry(source: &str, config: &LintConfig, commands: &dyn registry::Registry) -> Vec<Violation> {
    let _span = tracing::debug_span!("lint", bytes = source.len()).entered();
    let (mut script, mut violations) = parse(source, Origin::Unknown);
    if let Some(parse_error) = violations.first() {
        tracing::warn!(message = %parse_error.message, "source failed to parse; linting only the parse-error violation");
    }
    violations.extend(registry::dispatch(commands, &mut script));
    violations.extend(RuleEngine::default().run(&script, source, config));
    let mut violations = Directives::resolve(&script).filter(violations);
    violations.sort();
    violations
}

/// [`lint_with_registry`] against the built-in command table alone, for
/// callers with no plugin spec to layer in.
pub fn lint(source: &str, config: &LintConfig) -> Vec<Violation> {
    lint_with_registry(source, config, &builtins::registry())
}

/// Formats `source` under `config.style` (spec §4G), re-parsing against
/// `commands` first so braced script/expr/list arguments the formatter
/// needs to walk structurally (an `if` condition, a `foreach` varlist) are
/// reparsed exactly the way `lint` would see them.
///
/// If `source` doesn't parse, formatting is a no-op: the original source is
/// returned unchanged alongside the parse-error violation, rather than
/// guessing at a corrupted tree's layout.
pub fn format_with_registry(source: &str, config: &LintConfig, commands: &dyn registry::Registry) -> (String, Vec<Violation>) {
    let _span = tracing::debug_span!("format", bytes = source.len()).entered();
    let (mut script, violations) = parse(source, Origin::Unknown);
    if !violations.is_empty() {
        tracing::warn!("source failed to parse; leaving it unformatted");
        return (source.to_string(), violations);
    }
    registry::dispatch(commands, &mut script);
    (crate::format::format(&script, &config.style), Vec::new())
}

/// [`format_with_registry`] against the built-in command table alone.
pub fn format(source: &str, config: &LintConfig) -> (String, Vec<Violation>) {
    format_with_registry(source, config, &builtins::registry())
}

/// [`format`], plus the `-d` debug-mode invariant check (spec §7.5):
/// formatting must never change a script's structure, only its whitespace.
/// Re-parses the formatted output and compares it against the original
/// parse's single-line [`Script`] `Display` form (the structural-equivalence
/// rendering `crate::syntax` documents existing for exactly this check) —
/// not the formatted text itself, since that's expected to differ.
///
/// Meant for a caller's test suite or a `--debug` CLI flag, not the hot
/// path: it parses the source twice.
pub fn format_debug_checked(source: &str, config: &LintConfig) -> Result<String, FormatterInvariantViolation> {
    let (formatted, violations) = format(source, config);
    if !violations.is_empty() {
        return Ok(formatted);
    }

    let original_tree = parser::Parser::new(Code::new(source, Origin::Unknown), parser::ParserConfig::default()).parse_script()?;
    let reformatted_tree = parser::Parser::new(Code::new(&formatted, Origin::Unknown), parser::ParserConfig::default()).parse_script()?;

    let before = original_tree.to_string();
    let after = reformatted_tree.to_string();
    if before != after {
        tracing::error!(%before, %after, "formatter invariant violated: output does not re-parse to an equivalent tree");
        return Err(FormatterInvariantViolation::StructuralMismatch { before, after });
    }
    Ok(formatted)
}

/// Lists every `proc` declaration in `source`, for `textDocument/
/// documentSymbol` (spec §4H). A source that fails to parse reports no
/// symbols rather than erroring, since a document-symbol request has
/// nowhere to surface a violation.
pub fn symbols(source: &str) -> Vec<Symbol> {
    let (script, violations) = parse(source, Origin::Unknown);
    if !violations.is_empty() {
        return Vec::new();
    }
    collect_proc_declarations(&script)
        .into_iter()
        .map(|(name, span)| Symbol { name, span })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lint_reports_command_args_and_style_violations_together() {
        let violations = lint("puts a b c d e\nset x 1   \n", &LintConfig::default());
        assert!(violations.iter().any(|v| v.rule_id == "command-args"));
        assert!(violations.iter().any(|v| v.rule_id == "trailing-whitespace"));
    }

    #[test]
    fn lint_honors_inline_disable_directives() {
        let src = "# tclint-disable-next-line command-args\nputs a b c d e\n";
        let violations = lint(src, &LintConfig::default());
        assert!(violations.iter().all(|v| v.rule_id != "command-args"));
    }

    #[test]
    fn lint_surfaces_unterminated_brace_as_a_parse_error_violation() {
        let violations = lint("if {$x\n", &LintConfig::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "parse-error");
    }

    #[test]
    fn format_reindents_a_multi_command_body() {
        let (out, violations) = format("if {$x} {\nputs a\nputs b\n}\n", &LintConfig::default());
        assert!(violations.is_empty());
        assert_eq!(out, "if {$x} {\n    puts a\n    puts b\n}\n");
    }

    #[test]
    fn format_leaves_unparseable_source_untouched() {
        let (out, violations) = format("if {$x\n", &LintConfig::default());
        assert_eq!(out, "if {$x\n");
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn symbols_reports_proc_names_and_spans() {
        let symbols = symbols("proc greet {name} {\n    puts $name\n}\n");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "greet");
        assert_eq!(symbols[0].span.start().line, 1);
    }

    #[test]
    fn format_debug_checked_accepts_well_formed_reformatting() {
        let out = format_debug_checked("if {$x} {\nputs a\nputs b\n}\n", &LintConfig::default()).unwrap();
        assert_eq!(out, "if {$x} {\n    puts a\n    puts b\n}\n");
    }

    #[test]
    fn format_debug_checked_passes_through_unparseable_source() {
        let out = format_debug_checked("if {$x\n", &LintConfig::default()).unwrap();
        assert_eq!(out, "if {$x\n");
    }
}
