//! Usage rules (spec §4E): violations about what a script *does*, not how
//! it's laid out. Tree-based, built on the [`Visitor`] every other
//! tree-walking part of this crate shares.

use crate::config::LintConfig;
use crate::registry::builtins;
use crate::rules::{Category, Rule, Violation};
use crate::syntax::{walk_expr, walk_script, Command, Expr, MaybeLiteral, Script, Spanned, Visitor, Word};

/// `proc name ...` where `name` shadows a Tcl built-in or control-structure
/// keyword — almost always a mistake, since it silently changes what every
/// other command in scope means.
pub struct RedefinedBuiltin;

impl Rule for RedefinedBuiltin {
    fn id(&self) -> &'static str {
        "redefined-builtin"
    }
    fn category(&self) -> Category {
        Category::Usage
    }
    fn check(&self, script: &Script, _source: &str, _config: &LintConfig, out: &mut Vec<Violation>) {
        struct Finder<'a>(&'a mut Vec<Violation>);
        impl Visitor for Finder<'_> {
            fn visit_command(&mut self, command: &Command) {
                if command.name_literal().as_deref() == Some("proc") {
                    if let Some(name) = command.words.get(1).and_then(Word::to_string_if_literal) {
                        if builtins::is_builtin(&name) {
                            self.0.push(Violation::new(
                                "redefined-builtin",
                                Category::Usage,
                                format!("`proc {name}` redefines the built-in command `{name}`"),
                                command.span().clone(),
                            ));
                        }
                    }
                }
                for word in &command.words {
                    self.visit_word(word);
                }
            }
        }

        walk_script(&mut Finder(out), script);
    }
}

/// `expr`, `if`, and `while` taking an unbraced condition/expression
/// (`if $x > 0 {...}` instead of `if {$x > 0} {...}`) — legal, but loses
/// the "evaluated once, safe from double-substitution" guarantee braces
/// give.
pub struct UnbracedExpr;

impl Rule for UnbracedExpr {
    fn id(&self) -> &'static str {
        "unbraced-expr"
    }
    fn category(&self) -> Category {
        Category::Usage
    }
    fn check(&self, script: &Script, _source: &str, _config: &LintConfig, out: &mut Vec<Violation>) {
        struct Finder<'a>(&'a mut Vec<Violation>);
        impl Visitor for Finder<'_> {
            fn visit_command(&mut self, command: &Command) {
                if let Some(name) = command.name_literal() {
                    let expr_positions: &[usize] = match name.as_str() {
                        "expr" => &[1],
                        "if" | "while" => &[1],
                        _ => &[],
                    };
                    for &pos in expr_positions {
                        if let Some(word) = command.words.get(pos) {
                            if !matches!(word, Word::Braced(_)) && word.contains_substitution() {
                                self.0.push(Violation::new(
                                    "unbraced-expr",
                                    Category::Usage,
                                    format!("`{name}`'s expression argument should be brace-quoted"),
                                    word.span().clone(),
                                ));
                            }
                        }
                    }
                }
                for word in &command.words {
                    self.visit_word(word);
                }
            }
        }
        walk_script(&mut Finder(out), script);
    }
}

/// `expr {[expr {...}]}` — a redundant nested call to `expr`.
pub struct RedundantExpr;

impl Rule for RedundantExpr {
    fn id(&self) -> &'static str {
        "redundant-expr"
    }
    fn category(&self) -> Category {
        Category::Usage
    }
    fn check(&self, script: &Script, _source: &str, _config: &LintConfig, out: &mut Vec<Violation>) {
        struct Finder<'a>(&'a mut Vec<Violation>);
        impl Visitor for Finder<'_> {
            fn visit_expr(&mut self, expr: &Expr) {
                if expr.is_redundant_expr_call() {
                    self.0.push(Violation::new(
                        "redundant-expr",
                        Category::Usage,
                        "nested `[expr {...}]` inside an expression is redundant",
                        expr.span().clone(),
                    ));
                }
                walk_expr(self, expr);
            }
        }
        walk_script(&mut Finder(out), script);
    }
}

/// Flags an expression string whose binary operators aren't surrounded by
/// single spaces (`$x+1` instead of `$x + 1`) — a readability rule distinct
/// from `spacing`, which covers command-word spacing rather than
/// expression-internal spacing.
pub struct ExprFormat;

impl Rule for ExprFormat {
    fn id(&self) -> &'static str {
        "expr-format"
    }
    fn category(&self) -> Category {
        Category::Usage
    }
    fn check(&self, script: &Script, _source: &str, _config: &LintConfig, out: &mut Vec<Violation>) {
        struct Finder<'a>(&'a mut Vec<Violation>);
        impl Visitor for Finder<'_> {
            fn visit_expr(&mut self, expr: &Expr) {
                if let Expr::BinaryOp { op, left, right, span } = expr {
                    let between = {
                        let code = span.code.text();
                        let gap_start = left.span().range.end;
                        let gap_end = right.span().range.start;
                        if gap_start <= gap_end && gap_end <= code.len() {
                            &code[gap_start..gap_end]
                        } else {
                            ""
                        }
                    };
                    let well_spaced = between.starts_with(' ')
                        && between.ends_with(' ')
                        && between.trim() == op.as_str();
                    if !well_spaced {
                        self.0.push(Violation::new(
                            "expr-format",
                            Category::Usage,
                            format!("operator `{}` should have exactly one space on each side", op.as_str()),
                            span.clone(),
                        ));
                    }
                }
                walk_expr(self, expr);
            }
        }
        walk_script(&mut Finder(out), script);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, ParserConfig};
    use crate::source::{Code, Origin};

    fn check(rule: &dyn Rule, src: &str) -> Vec<Violation> {
        let mut parser = Parser::new(Code::new(src, Origin::Unknown), ParserConfig::default());
        let script = parser.parse_script().unwrap();
        let mut out = Vec::new();
        rule.check(&script, src, &LintConfig::default(), &mut out);
        out
    }

    #[test]
    fn flags_proc_named_if() {
        let v = check(&RedefinedBuiltin, "proc if {a b} { return $a }");
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn does_not_flag_proc_with_unique_name() {
        let v = check(&RedefinedBuiltin, "proc my_helper {a b} { return $a }");
        assert!(v.is_empty());
    }

    #[test]
    fn flags_unbraced_if_condition() {
        let v = check(&UnbracedExpr, "if $x { puts hi }");
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn does_not_flag_braced_if_condition() {
        let v = check(&UnbracedExpr, "if {$x} { puts hi }");
        assert!(v.is_empty());
    }
}
