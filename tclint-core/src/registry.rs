//! Command registry and dispatcher (spec §4D).
//!
//! Grounded on `yash_syntax::decl_util::Glossary` for the trait-based,
//! layered lookup pattern (`EmptyGlossary`, blanket impls for `&T`/`&mut T`)
//! and `yash_syntax::alias::AliasSet` for the
//! name-keyed-collection-with-shadowing storage shape.

pub mod builtins;
pub mod plugin;

use crate::parser::{Parser, ParserConfig};
use crate::rules::{Category, Violation};
use crate::syntax::{walk_command, walk_script, BracedWord, Command, MaybeLiteral, Reparsed, Script, Spanned, Visitor, Word};
use std::collections::HashMap;
use std::fmt::Debug;

/// What kind of content a positional or switch-valued argument holds, which
/// decides whether the dispatcher re-parses it (spec §4D step 4).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArgType {
    /// No structural meaning assumed; left as-is.
    Any,
    /// A nested Tcl script (a `proc` body, an `if` branch).
    Script,
    /// An `expr`-syntax expression (an `if`/`while` condition, `expr`'s own
    /// argument).
    Expr,
    /// A braced list (`foreach`'s variable-name list, `proc`'s parameter
    /// list).
    List,
    /// A variable name, not further interpreted, but recorded for
    /// symbol-table purposes.
    VarName,
}

#[derive(Clone, Debug)]
pub struct SwitchSpec {
    pub name: &'static str,
    pub takes_value: bool,
    pub value_type: ArgType,
}

#[derive(Clone, Debug)]
pub struct PositionalSpec {
    pub name: &'static str,
    pub arg_type: ArgType,
    pub optional: bool,
}

/// The shape of one command's arguments, as a command handler or plugin
/// file declares it (spec §4D, §6).
#[derive(Clone, Debug, Default)]
pub struct CommandSpec {
    pub switches: Vec<SwitchSpec>,
    pub positionals: Vec<PositionalSpec>,
    /// If `Some`, any positionals beyond `positionals.len()` are accepted
    /// and re-parsed as this type (e.g. `proc`'s body is fixed, but some
    /// plugin commands accept `...rest`).
    pub variadic_tail: Option<ArgType>,
    /// `subcommands["with"]` etc., for a first-positional-dispatches-type
    /// command like `dict`.
    pub subcommands: HashMap<&'static str, CommandSpec>,
}

impl CommandSpec {
    pub fn simple(positionals: Vec<PositionalSpec>) -> Self {
        CommandSpec {
            positionals,
            ..Default::default()
        }
    }
}

/// An argument-shape mismatch a [`Handler`] detects on its own — a flat
/// [`CommandSpec`] arity check can't express "an `if`'s `elseif` clause is
/// missing its body" or "`switch`'s pattern/body list has an odd length".
/// Becomes a `command-args` violation anchored at the whole command.
#[derive(Clone, Debug)]
pub struct CommandArgError(pub String);

/// What a [`Handler`] does to a command's own argument words, once it's
/// walked them and decided how each one is shaped.
#[derive(Clone, Debug)]
pub enum HandlerOutcome {
    /// Nothing needed reparsing; leave the words exactly as the parser
    /// produced them.
    Unchanged,
    /// The full, ordered replacement for the command's argument words (not
    /// including the command name), with any braced argument the handler
    /// recognized as a script/expression/list reparsed in place.
    Replace(Vec<Word>),
}

/// A command handler (spec §4D's "Handler API"): given a command's own
/// argument words, decides how each one is shaped and reparses the ones it
/// recognizes — something a flat [`CommandSpec`] can't express when a
/// command's shape depends on how many words it got (an `if`'s trailing
/// `elseif`/`else` clauses, `switch`'s pattern/body pairs, `try`'s `on`/
/// `trap`/`finally` clauses). Implementations live in [`builtins`].
pub type Handler = fn(&[Word]) -> Result<HandlerOutcome, CommandArgError>;

/// One entry in a [`Registry`]: spec §4D's "mapping from command name to
/// `CommandSpec | Handler | null`" (`null` is simply the absence of an
/// entry — `Registry::lookup` returning `None` already means "known or
/// unknown, either way unchecked").
#[derive(Clone, Debug)]
pub enum CommandEntry {
    /// A declarative arity/type table (built-ins with a fixed shape, every
    /// plugin-declared command).
    Spec(CommandSpec),
    /// Code that walks the argument list itself (built-ins whose shape
    /// varies with how many words they got).
    Handler(Handler),
}

/// A source of [`CommandEntry`]s: built-ins, a plugin file, or a layering
/// of both. Mirrors `yash_syntax::decl_util::Glossary`'s trait-based,
/// composable lookup — `&T`/`&mut T` blanket impls let callers compose
/// layers without the trait needing to know how many there are.
pub trait Registry: Debug {
    fn lookup(&self, name: &str) -> Option<&CommandEntry>;
}

/// A registry with no commands in it, for callers that want dispatch-free
/// parsing (mirrors `yash_syntax::decl_util::EmptyGlossary`).
#[derive(Debug, Default)]
pub struct EmptyRegistry;

impl Registry for EmptyRegistry {
    fn lookup(&self, _name: &str) -> Option<&CommandEntry> {
        None
    }
}

impl<T: Registry + ?Sized> Registry for &T {
    fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        (**self).lookup(name)
    }
}

impl<T: Registry + ?Sized> Registry for &mut T {
    fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        (**self).lookup(name)
    }
}

/// Queries each layer in order, first match wins — later layers (builtins)
/// are shadowed by earlier ones (plugin-declared commands), the same
/// precedence a real Tcl interpreter gives a redefined command.
#[derive(Debug, Default)]
pub struct LayeredRegistry {
    layers: Vec<Box<dyn Registry>>,
}

impl LayeredRegistry {
    pub fn new() -> Self {
        LayeredRegistry { layers: Vec::new() }
    }

    pub fn with_layer(mut self, layer: Box<dyn Registry>) -> Self {
        self.layers.push(layer);
        self
    }
}

impl Registry for LayeredRegistry {
    fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        self.layers.iter().find_map(|layer| layer.lookup(name))
    }
}

/// Runs the dispatcher over a whole script: resolves each command's name
/// against `registry`, validates its arguments (spec §4D steps 1–8), and
/// re-parses any `Script`/`Expr`/`List`-typed argument that is a literal
/// `{...}` word, mutating it in place.
///
/// Never panics: an internal invariant violation becomes an `internal-error`
/// violation rather than propagating (spec §7 "Rule engines never throw to
/// the caller").
pub fn dispatch(registry: &dyn Registry, script: &mut Script) -> Vec<Violation> {
    let _span = tracing::debug_span!("dispatch", commands = script.commands().count()).entered();
    let mut out = Vec::new();
    dispatch_script(registry, script, &mut out);
    out
}

fn dispatch_script(registry: &dyn Registry, script: &mut Script, out: &mut Vec<Violation>) {
    for item in &mut script.items {
        if let crate::syntax::ScriptItem::Command(command) = item {
            dispatch_command(registry, command, out);
        }
    }
}

fn dispatch_command(registry: &dyn Registry, command: &mut Command, out: &mut Vec<Violation>) {
    // Validate and reparse this command's own braced arguments first, so
    // a condition/body word that started out as an opaque `BracedWord`
    // gains its `Reparsed::Script`/`Expression`/`List` *before* the
    // recursion below walks into it. Recursing first would miss every
    // command nested inside a braced body this very call is the one that
    // reparses (an `if`'s then-body, a `proc`'s body, ...).
    if let Some(name) = command.name_literal() {
        if let Some(entry) = registry.lookup(&name) {
            match entry {
                CommandEntry::Spec(spec) => validate_and_reparse(spec, command, out),
                CommandEntry::Handler(handler) => dispatch_via_handler(*handler, command, out),
            }
        }
    }

    for word in &mut command.words {
        dispatch_word(registry, word, out);
    }
}

/// Runs a [`Handler`] over a command's own argument words and applies its
/// outcome: a replacement word list is spliced in in place, an error
/// becomes a `command-args` violation anchored at the whole command.
fn dispatch_via_handler(handler: Handler, command: &mut Command, out: &mut Vec<Violation>) {
    match handler(command.args()) {
        Ok(HandlerOutcome::Unchanged) => {}
        Ok(HandlerOutcome::Replace(words)) => {
            command.words.splice(1.., words);
        }
        Err(CommandArgError(message)) => {
            out.push(Violation::new(
                "command-args",
                Category::Usage,
                message,
                command.span().clone(),
            ));
        }
    }
}

fn dispatch_word(registry: &dyn Registry, word: &mut Word, out: &mut Vec<Violation>) {
    match word {
        Word::CmdSub(w) => dispatch_script(registry, &mut w.script, out),
        Word::Quoted(w) => {
            for part in &mut w.parts {
                dispatch_word(registry, part, out);
            }
        }
        Word::Compound(w) => {
            for part in &mut w.parts {
                dispatch_word(registry, part, out);
            }
        }
        Word::ArgExpansion(w) => dispatch_word(registry, &mut w.word, out),
        Word::Braced(w) => match &mut w.reparsed {
            Some(Reparsed::Script(script)) => dispatch_script(registry, script, out),
            Some(Reparsed::List(elements)) => {
                for element in elements {
                    dispatch_word(registry, element, out);
                }
            }
            Some(Reparsed::Expression(_)) | None => {}
        },
        _ => {}
    }
}

/// Consumes recognized leading switches (spec §4D step 1) from `args`,
/// returning the index of the first positional argument. Only literal,
/// known switch names are consumed; an unrecognized or substituted leading
/// word falls through to positional counting as-is. Shared between
/// [`validate_and_reparse`] and the [`builtins`] handlers that parse their
/// own switches (`switch`'s `-exact`/`-glob`/`-regexp`/`--`).
pub(crate) fn positional_start(args: &[Word], switches: &[SwitchSpec]) -> usize {
    let mut i = 0;
    while i < args.len() {
        let Some(text) = args[i].to_string_if_literal() else {
            break;
        };
        let Some(switch) = switches.iter().find(|s| s.name == text) else {
            break;
        };
        i += 1;
        if switch.takes_value {
            i += 1;
        }
    }
    i
}

fn validate_and_reparse(spec: &CommandSpec, command: &mut Command, out: &mut Vec<Violation>) {
    let args = command.args();
    let has_expansion = args.iter().any(Word::is_arg_expansion);

    // Consume recognized leading switches before counting positionals, so a
    // flag like `-nonewline` isn't mistaken for a positional argument.
    let start = positional_start(args, &spec.switches);
    let positional_args = &args[start.min(args.len())..];

    if !has_expansion {
        let min = spec.positionals.iter().filter(|p| !p.optional).count();
        let max = if spec.variadic_tail.is_some() {
            usize::MAX
        } else {
            spec.positionals.len()
        };
        if positional_args.len() < min || positional_args.len() > max {
            out.push(Violation::new(
                "command-args",
                Category::Usage,
                format!(
                    "`{}` expects {} argument(s), got {}",
                    command.name_literal().unwrap_or_default(),
                    describe_arity(min, max),
                    positional_args.len()
                ),
                command.span().clone(),
            ));
        }
    }

    let arg_types: Vec<ArgType> = spec
        .positionals
        .iter()
        .map(|p| p.arg_type)
        .chain(std::iter::repeat(spec.variadic_tail.unwrap_or(ArgType::Any)))
        .take(positional_args.len())
        .collect();

    for (i, arg_type) in arg_types.into_iter().enumerate() {
        let Some(word) = command.words.get_mut(start + i + 1) else {
            continue;
        };
        reparse_if_literal_braced(word, arg_type);
    }
}

fn describe_arity(min: usize, max: usize) -> String {
    if min == max {
        min.to_string()
    } else if max == usize::MAX {
        format!("at least {min}")
    } else {
        format!("{min}-{max}")
    }
}

/// Re-parses a `{...}` word's captured text as `arg_type`'s grammar, storing
/// the result in `BracedWord::reparsed`. Only applies to literal braced
/// words — an argument containing a substitution can't be statically
/// re-parsed (spec §4B "Unresolvable arguments").
fn reparse_if_literal_braced(word: &mut Word, arg_type: ArgType) {
    let Word::Braced(braced) = word else { return };
    if braced.reparsed.is_some() {
        return;
    }
    match arg_type {
        ArgType::Script => {
            if let Ok(script) = reparse_as_script(braced) {
                braced.reparsed = Some(Reparsed::Script(script));
            }
        }
        ArgType::Expr => {
            if let Ok(expr) = reparse_as_expr(braced) {
                braced.reparsed = Some(Reparsed::Expression(expr));
            }
        }
        ArgType::List => {
            if let Ok(elements) = reparse_as_list(braced) {
                braced.reparsed = Some(Reparsed::List(elements));
            }
        }
        ArgType::Any | ArgType::VarName => {}
    }
}

fn reparser_for(braced: &BracedWord) -> Parser {
    let inner_range = braced.span.range.start + 1..braced.span.range.end - 1;
    let lexer = crate::lexer::Lexer::sub(braced.span.code.clone(), inner_range);
    Parser::with_lexer(lexer, ParserConfig::default(), 0)
}

fn reparse_as_script(braced: &BracedWord) -> Result<Script, crate::parser::ParseError> {
    reparser_for(braced).parse_script()
}

fn reparse_as_expr(braced: &BracedWord) -> Result<crate::syntax::Expr, crate::parser::ParseError> {
    reparser_for(braced).parse_expr()
}

fn reparse_as_list(braced: &BracedWord) -> Result<Vec<Word>, crate::parser::ParseError> {
    reparser_for(braced).parse_list()
}

/// Counts how many `proc`/built-in command definitions appear in `script`
/// (used by the `symbols` driver operation and by tests); walks `reparsed`
/// script bodies too, since a `proc` can be declared inside a conditionally
/// executed block.
pub fn collect_proc_names(script: &Script) -> Vec<String> {
    collect_proc_declarations(script).into_iter().map(|(name, _)| name).collect()
}

/// Like [`collect_proc_names`] but keeps each `proc`'s command span, for the
/// driver's `symbols` operation (spec §4H: "for LSP document-symbols:
/// `proc` definitions, with name and span").
pub fn collect_proc_declarations(script: &Script) -> Vec<(String, crate::source::Span)> {
    struct Finder(Vec<(String, crate::source::Span)>);
    impl Visitor for Finder {
        fn visit_command(&mut self, command: &Command) {
            if command.name_literal().as_deref() == Some("proc") {
                if let Some(name) = command.words.get(1).and_then(Word::to_string_if_literal) {
                    self.0.push((name, command.span().clone()));
                }
            }
            walk_command(self, command);
        }
    }
    let mut finder = Finder(Vec::new());
    walk_script(&mut finder, script);
    finder.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, ParserConfig};
    use crate::source::{Code, Origin};
    use assert_matches::assert_matches;

    fn parse(src: &str) -> Script {
        let mut parser = Parser::new(Code::new(src, Origin::Unknown), ParserConfig::default());
        parser.parse_script().unwrap()
    }

    #[test]
    fn unknown_command_name_is_not_validated() {
        let mut script = parse("my_custom_proc a b c d e");
        let registry = builtins::registry();
        let violations = dispatch(&registry, &mut script);
        assert!(violations.is_empty());
    }

    #[test]
    fn wrong_arity_reports_command_args() {
        let mut script = parse("foreach x {1 2 3} { puts $x }");
        let registry = builtins::registry();
        let violations = dispatch(&registry, &mut script);
        assert!(violations.is_empty(), "foreach varlist+list+body is valid: {violations:?}");

        let mut bad = parse("puts");
        let violations = dispatch(&registry, &mut bad);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "command-args");
    }

    #[test]
    fn foreach_with_no_body_reports_command_args() {
        let mut bad = parse("foreach x {1 2 3}");
        let registry = builtins::registry();
        let violations = dispatch(&registry, &mut bad);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "command-args");
    }

    #[test]
    fn if_condition_is_reparsed_as_expr() {
        let mut script = parse("if {$x > 0} { puts hi }");
        let registry = builtins::registry();
        dispatch(&registry, &mut script);
        let cmd = script.commands().next().unwrap();
        assert_matches!(&cmd.words[1], Word::Braced(b) => {
            assert_matches!(b.reparsed, Some(Reparsed::Expression(_)));
        });
    }

    #[test]
    fn if_body_is_reparsed_as_script() {
        let mut script = parse("if {1} { puts hi }");
        let registry = builtins::registry();
        dispatch(&registry, &mut script);
        let cmd = script.commands().next().unwrap();
        assert_matches!(&cmd.words[2], Word::Braced(b) => {
            assert_matches!(b.reparsed, Some(Reparsed::Script(_)));
        });
    }

    #[test]
    fn if_elseif_and_else_bodies_are_reparsed_as_script() {
        let mut script = parse("if {1} { puts a } elseif {2} { puts b } else { puts c }");
        let registry = builtins::registry();
        dispatch(&registry, &mut script);
        let cmd = script.commands().next().unwrap();
        // words: if {1} {puts a} elseif {2} {puts b} else {puts c}
        assert_matches!(&cmd.words[4], Word::Braced(b) => {
            assert_matches!(b.reparsed, Some(Reparsed::Expression(_)));
        });
        assert_matches!(&cmd.words[5], Word::Braced(b) => {
            assert_matches!(b.reparsed, Some(Reparsed::Script(_)));
        });
        assert_matches!(&cmd.words[7], Word::Braced(b) => {
            assert_matches!(b.reparsed, Some(Reparsed::Script(_)));
        });
    }

    #[test]
    fn if_malformed_elseif_chain_reports_command_args() {
        let mut bad = parse("if {1} { puts a } elseif {2}");
        let registry = builtins::registry();
        let violations = dispatch(&registry, &mut bad);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "command-args");
    }

    #[test]
    fn switch_pattern_body_pairs_are_reparsed_as_script() {
        let mut script = parse("switch $x { a { puts a } b { puts b } }");
        let registry = builtins::registry();
        dispatch(&registry, &mut script);
        let cmd = script.commands().next().unwrap();
        assert_matches!(&cmd.words[2], Word::Braced(b) => {
            assert_matches!(&b.reparsed, Some(Reparsed::List(elements)) => {
                assert_matches!(&elements[1], Word::Braced(body) => {
                    assert_matches!(body.reparsed, Some(Reparsed::Script(_)));
                });
                assert_matches!(&elements[3], Word::Braced(body) => {
                    assert_matches!(body.reparsed, Some(Reparsed::Script(_)));
                });
            });
        });
    }

    #[test]
    fn try_clause_bodies_are_reparsed_as_script() {
        let mut script = parse("try { risky } on error {msg} { puts $msg } finally { cleanup }");
        let registry = builtins::registry();
        dispatch(&registry, &mut script);
        let cmd = script.commands().next().unwrap();
        assert_matches!(&cmd.words[1], Word::Braced(b) => {
            assert_matches!(b.reparsed, Some(Reparsed::Script(_)));
        });
        assert_matches!(&cmd.words[5], Word::Braced(b) => {
            assert_matches!(b.reparsed, Some(Reparsed::Script(_)));
        });
        assert_matches!(&cmd.words[7], Word::Braced(b) => {
            assert_matches!(b.reparsed, Some(Reparsed::Script(_)));
        });
    }
}
