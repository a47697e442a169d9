//! Built-in command specs and handlers (spec §4D, the command table keyed
//! by name).
//!
//! Grounded on `yash_syntax::decl_util`'s glossary-as-trait-object pattern:
//! a [`BuiltinRegistry`] is just a `HashMap` wrapped in a `Registry` impl, so
//! it composes with a [`super::LayeredRegistry`] the same way a plugin's
//! registry does. The five control structures whose shape depends on how
//! many words they got (`if`'s `elseif`/`else` chain, `foreach`/`lmap`'s
//! varlist/list pairs, `switch`'s pattern/body pairs, `try`'s `on`/`trap`/
//! `finally` clauses) are [`CommandEntry::Handler`]s instead of a flat
//! [`CommandSpec`] — grounded on `yash_syntax::parser`'s `if`/`while_loop`/
//! `for_loop`/`case` functions, which likewise walk their own token stream
//! and call back into `parse_script`/`parse_expr` rather than being driven
//! by a declarative arity table.

use super::{ArgType, CommandArgError, CommandEntry, CommandSpec, HandlerOutcome, PositionalSpec, Registry, SwitchSpec};
use crate::syntax::{MaybeLiteral, Reparsed, Word};
use std::collections::HashMap;

/// Every built-in name this crate knows the shape of. Order doesn't matter;
/// kept alphabetical so a new entry's neighbors are easy to find.
const BUILTIN_NAMES: &[&str] = &[
    "append",
    "apply",
    "array",
    "break",
    "catch",
    "continue",
    "dict",
    "else",
    "elseif",
    "eval",
    "expr",
    "for",
    "foreach",
    "global",
    "if",
    "incr",
    "lappend",
    "lassign",
    "lindex",
    "lmap",
    "lset",
    "namespace",
    "proc",
    "puts",
    "return",
    "set",
    "switch",
    "try",
    "unset",
    "uplevel",
    "upvar",
    "variable",
    "while",
];

/// Whether `name` is one of the command names this crate treats as a
/// built-in control structure or core command — used by the
/// `redefined-builtin` rule to flag a `proc` that shadows one.
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

#[derive(Debug, Default)]
pub struct BuiltinRegistry {
    specs: HashMap<&'static str, CommandEntry>,
}

impl Registry for BuiltinRegistry {
    fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        self.specs.get(name)
    }
}

fn positional(name: &'static str, arg_type: ArgType) -> PositionalSpec {
    PositionalSpec {
        name,
        arg_type,
        optional: false,
    }
}

fn optional(name: &'static str, arg_type: ArgType) -> PositionalSpec {
    PositionalSpec {
        name,
        arg_type,
        optional: true,
    }
}

/// `if`'s handler (spec §4D): types the leading condition/then-body pair,
/// then walks any `elseif cond body` clauses and a trailing `else body`,
/// reparsing each condition as `Expr` and each body as `Script`.
fn if_handler(args: &[Word]) -> Result<HandlerOutcome, CommandArgError> {
    if args.len() < 2 {
        return Err(CommandArgError(format!("`if` expects at least 2 argument(s), got {}", args.len())));
    }
    let mut out = args.to_vec();
    super::reparse_if_literal_braced(&mut out[0], ArgType::Expr);
    super::reparse_if_literal_braced(&mut out[1], ArgType::Script);

    let mut i = 2;
    while i < out.len() {
        let Some(keyword) = out[i].to_string_if_literal() else {
            return Err(CommandArgError("`if`'s `elseif`/`else` clauses must start with a literal keyword".to_string()));
        };
        match keyword.as_str() {
            "elseif" => {
                if i + 2 >= out.len() {
                    return Err(CommandArgError("`elseif` expects a condition and a body".to_string()));
                }
                super::reparse_if_literal_braced(&mut out[i + 1], ArgType::Expr);
                super::reparse_if_literal_braced(&mut out[i + 2], ArgType::Script);
                i += 3;
            }
            "else" => {
                if i + 1 >= out.len() {
                    return Err(CommandArgError("`else` expects a body".to_string()));
                }
                super::reparse_if_literal_braced(&mut out[i + 1], ArgType::Script);
                i += 2;
                if i != out.len() {
                    return Err(CommandArgError("`else` must be the last clause of an `if`".to_string()));
                }
            }
            other => return Err(CommandArgError(format!("unexpected `if` clause keyword `{other}`"))),
        }
    }
    Ok(HandlerOutcome::Replace(out))
}

/// Shared walk for `foreach`/`lmap`: one or more `varlist list` pairs
/// followed by a body, each varlist/list typed as `List` and the body as
/// `Script`.
fn foreach_like_handler(name: &str, args: &[Word]) -> Result<HandlerOutcome, CommandArgError> {
    if args.len() < 3 || args.len() % 2 == 0 {
        return Err(CommandArgError(format!(
            "`{name}` expects one or more varlist/list pairs followed by a body, got {} argument(s)",
            args.len()
        )));
    }
    let mut out = args.to_vec();
    let body_idx = out.len() - 1;
    let mut i = 0;
    while i < body_idx {
        super::reparse_if_literal_braced(&mut out[i], ArgType::List);
        super::reparse_if_literal_braced(&mut out[i + 1], ArgType::List);
        i += 2;
    }
    super::reparse_if_literal_braced(&mut out[body_idx], ArgType::Script);
    Ok(HandlerOutcome::Replace(out))
}

fn foreach_handler(args: &[Word]) -> Result<HandlerOutcome, CommandArgError> {
    foreach_like_handler("foreach", args)
}

fn lmap_handler(args: &[Word]) -> Result<HandlerOutcome, CommandArgError> {
    foreach_like_handler("lmap", args)
}

const SWITCH_SWITCHES: &[SwitchSpec] = &[
    SwitchSpec {
        name: "-exact",
        takes_value: false,
        value_type: ArgType::Any,
    },
    SwitchSpec {
        name: "-glob",
        takes_value: false,
        value_type: ArgType::Any,
    },
    SwitchSpec {
        name: "-regexp",
        takes_value: false,
        value_type: ArgType::Any,
    },
    SwitchSpec {
        name: "--",
        takes_value: false,
        value_type: ArgType::Any,
    },
];

/// `switch`'s handler (spec §4D): consumes its own leading switches, then
/// types the pattern/body pairs — either a single braced list (`switch $x {
/// a body-a b body-b }`) or flat trailing words (`switch $x a body-a b
/// body-b`) — reparsing each body as `Script`.
fn switch_handler(args: &[Word]) -> Result<HandlerOutcome, CommandArgError> {
    let start = super::positional_start(args, SWITCH_SWITCHES);
    if start >= args.len() {
        return Err(CommandArgError("`switch` expects a string argument".to_string()));
    }
    let remaining = &args[start + 1..];
    if remaining.is_empty() {
        return Err(CommandArgError("`switch` expects pattern/body arguments".to_string()));
    }

    let mut out = args.to_vec();

    if remaining.len() == 1 {
        let last = out.len() - 1;
        super::reparse_if_literal_braced(&mut out[last], ArgType::List);
        if let Word::Braced(braced) = &mut out[last] {
            if let Some(Reparsed::List(elements)) = &mut braced.reparsed {
                if elements.len() % 2 != 0 {
                    return Err(CommandArgError(
                        "`switch`'s pattern/body list must have an even number of elements".to_string(),
                    ));
                }
                for (i, element) in elements.iter_mut().enumerate() {
                    if i % 2 == 1 {
                        super::reparse_if_literal_braced(element, ArgType::Script);
                    }
                }
            }
        }
    } else {
        if remaining.len() % 2 != 0 {
            return Err(CommandArgError("`switch` expects pattern/body arguments in pairs".to_string()));
        }
        let mut i = start + 1;
        while i < out.len() {
            super::reparse_if_literal_braced(&mut out[i + 1], ArgType::Script);
            i += 2;
        }
    }

    Ok(HandlerOutcome::Replace(out))
}

/// `try`'s handler (spec §4D): types the leading body, then walks `on code
/// variableList script`, `trap pattern variableList script`, and a trailing
/// `finally script` clause, reparsing each variable list as `List` and each
/// script as `Script`.
fn try_handler(args: &[Word]) -> Result<HandlerOutcome, CommandArgError> {
    if args.is_empty() {
        return Err(CommandArgError("`try` expects a body".to_string()));
    }
    let mut out = args.to_vec();
    super::reparse_if_literal_braced(&mut out[0], ArgType::Script);

    let mut i = 1;
    let mut seen_finally = false;
    while i < out.len() {
        if seen_finally {
            return Err(CommandArgError("`finally` must be the last clause of a `try`".to_string()));
        }
        let Some(keyword) = out[i].to_string_if_literal() else {
            return Err(CommandArgError("`try`'s clauses must start with a literal `on`/`trap`/`finally` keyword".to_string()));
        };
        match keyword.as_str() {
            "on" => {
                if i + 3 >= out.len() {
                    return Err(CommandArgError("`on` expects a code, a variable list, and a body".to_string()));
                }
                super::reparse_if_literal_braced(&mut out[i + 2], ArgType::List);
                super::reparse_if_literal_braced(&mut out[i + 3], ArgType::Script);
                i += 4;
            }
            "trap" => {
                if i + 3 >= out.len() {
                    return Err(CommandArgError("`trap` expects a pattern, a variable list, and a body".to_string()));
                }
                super::reparse_if_literal_braced(&mut out[i + 1], ArgType::List);
                super::reparse_if_literal_braced(&mut out[i + 2], ArgType::List);
                super::reparse_if_literal_braced(&mut out[i + 3], ArgType::Script);
                i += 4;
            }
            "finally" => {
                if i + 1 >= out.len() {
                    return Err(CommandArgError("`finally` expects a body".to_string()));
                }
                super::reparse_if_literal_braced(&mut out[i + 1], ArgType::Script);
                i += 2;
                seen_finally = true;
            }
            other => return Err(CommandArgError(format!("unexpected `try` clause keyword `{other}`"))),
        }
    }
    Ok(HandlerOutcome::Replace(out))
}

/// Builds the built-in command table (spec §4D). Most entries are a
/// declarative [`CommandSpec`]; `if`/`foreach`/`lmap`/`switch`/`try` are
/// [`CommandEntry::Handler`]s since their shape isn't expressible as a
/// fixed positional list plus one variadic tail.
pub fn table() -> BuiltinRegistry {
    let mut specs = HashMap::new();

    specs.insert("if", CommandEntry::Handler(if_handler));
    specs.insert(
        "while",
        CommandEntry::Spec(CommandSpec::simple(vec![
            positional("condition", ArgType::Expr),
            positional("body", ArgType::Script),
        ])),
    );
    specs.insert(
        "for",
        CommandEntry::Spec(CommandSpec::simple(vec![
            positional("start", ArgType::Script),
            positional("condition", ArgType::Expr),
            positional("next", ArgType::Script),
            positional("body", ArgType::Script),
        ])),
    );
    specs.insert("foreach", CommandEntry::Handler(foreach_handler));
    specs.insert("lmap", CommandEntry::Handler(lmap_handler));
    specs.insert("switch", CommandEntry::Handler(switch_handler));
    specs.insert(
        "proc",
        CommandEntry::Spec(CommandSpec::simple(vec![
            positional("name", ArgType::VarName),
            positional("args", ArgType::List),
            positional("body", ArgType::Script),
        ])),
    );
    specs.insert(
        "apply",
        CommandEntry::Spec(CommandSpec {
            positionals: vec![positional("lambda", ArgType::List)],
            variadic_tail: Some(ArgType::Any),
            ..Default::default()
        }),
    );
    specs.insert(
        "expr",
        CommandEntry::Spec(CommandSpec {
            positionals: vec![positional("expression", ArgType::Expr)],
            variadic_tail: Some(ArgType::Expr), // unbraced `expr a + b` spreads across words
            ..Default::default()
        }),
    );
    specs.insert(
        "catch",
        CommandEntry::Spec(CommandSpec::simple(vec![
            positional("script", ArgType::Script),
            optional("resultVarName", ArgType::VarName),
            optional("optionsVarName", ArgType::VarName),
        ])),
    );
    specs.insert("try", CommandEntry::Handler(try_handler));
    specs.insert(
        "eval",
        CommandEntry::Spec(CommandSpec {
            positionals: vec![positional("script", ArgType::Script)],
            variadic_tail: Some(ArgType::Any), // `eval a b c` concatenates as a list
            ..Default::default()
        }),
    );
    specs.insert(
        "puts",
        CommandEntry::Spec(CommandSpec {
            switches: vec![SwitchSpec {
                name: "-nonewline",
                takes_value: false,
                value_type: ArgType::Any,
            }],
            positionals: vec![optional("channelId", ArgType::Any), positional("string", ArgType::Any)],
            ..Default::default()
        }),
    );
    specs.insert(
        "uplevel",
        CommandEntry::Spec(CommandSpec {
            positionals: vec![optional("level", ArgType::Any), positional("script", ArgType::Script)],
            variadic_tail: Some(ArgType::Any),
            ..Default::default()
        }),
    );

    let dict_for = CommandSpec::simple(vec![
        positional("varlist", ArgType::List),
        positional("dict", ArgType::Any),
        positional("body", ArgType::Script),
    ]);
    let mut dict = CommandSpec {
        positionals: vec![positional("subcommand", ArgType::Any)],
        variadic_tail: Some(ArgType::Any),
        ..Default::default()
    };
    dict.subcommands.insert("for", dict_for);
    specs.insert("dict", CommandEntry::Spec(dict));

    let mut namespace = CommandSpec {
        positionals: vec![positional("subcommand", ArgType::Any)],
        variadic_tail: Some(ArgType::Any),
        ..Default::default()
    };
    namespace
        .subcommands
        .insert("eval", CommandSpec::simple(vec![positional("name", ArgType::Any), positional("script", ArgType::Script)]));
    specs.insert("namespace", CommandEntry::Spec(namespace));

    BuiltinRegistry { specs }
}

/// Convenience wrapper so callers who want only the built-in layer don't
/// have to know about [`super::LayeredRegistry`].
pub fn registry() -> BuiltinRegistry {
    table()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, ParserConfig};
    use crate::source::{Code, Origin};
    use assert_matches::assert_matches;

    #[test]
    fn is_builtin_recognizes_control_structures() {
        assert!(is_builtin("if"));
        assert!(is_builtin("proc"));
        assert!(!is_builtin("my_custom_command"));
    }

    #[test]
    fn foreach_is_a_handler_not_a_flat_spec() {
        let reg = registry();
        assert_matches!(reg.lookup("foreach"), Some(CommandEntry::Handler(_)));
    }

    #[test]
    fn foreach_handler_types_its_list_arguments() {
        let mut parser = Parser::new(Code::new("foreach x {1 2 3} { puts $x }", Origin::Unknown), ParserConfig::default());
        let mut script = parser.parse_script().unwrap();
        let reg = registry();
        let violations = super::dispatch(&reg, &mut script);
        assert!(violations.is_empty(), "{violations:?}");
        let cmd = script.commands().next().unwrap();
        assert_matches!(&cmd.words[2], Word::Braced(b) => {
            assert_matches!(b.reparsed, Some(Reparsed::List(_)));
        });
        assert_matches!(&cmd.words[3], Word::Braced(b) => {
            assert_matches!(b.reparsed, Some(Reparsed::Script(_)));
        });
    }

    #[test]
    fn dict_for_subcommand_types_its_varlist_as_list() {
        let reg = registry();
        assert_matches!(reg.lookup("dict"), Some(CommandEntry::Spec(dict)) => {
            let dict_for = dict.subcommands.get("for").unwrap();
            assert_eq!(dict_for.positionals[0].arg_type, ArgType::List);
        });
    }
}
