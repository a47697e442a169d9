//! Tcl syntax tree.
//!
//! This module defines the tagged-variant AST described in spec §3: a
//! [`Script`] is an ordered sequence of [`ScriptItem`]s (commands and
//! top-level comments); a [`Command`] is an ordered sequence of [`Word`]s;
//! a `Word` is polymorphic over several lexical shapes (bare, braced,
//! quoted, …).
//!
//! Following `yash_syntax::syntax`'s lead, most of these types implement
//! [`Display`](fmt::Display) to reconstruct a single-line textual form. That
//! form is *not* the canonical pretty-printed output (see [`crate::format`]
//! for that) — it exists so the formatter's `-d` debug mode and the
//! parser's round-trip tests can cheaply compare "same structure" without
//! re-deriving a string representation from scratch.

use crate::source::Span;
use std::fmt;
use std::rc::Rc;

/// A node that knows where it came from in the source.
pub trait Spanned {
    fn span(&self) -> &Span;
}

/// A node that may have a statically known literal string value.
///
/// Mirrors `yash_syntax::syntax::MaybeLiteral`. A command handler (§4D) uses
/// this to tell whether an argument word can be re-interpreted as a script,
/// expression or list at parse time, or whether its content only becomes
/// known through substitution at run time (in which case re-parsing it is
/// unsound and the handler must fall back, raising `command-args` for
/// script-typed arguments per spec §4B "Unresolvable arguments").
pub trait MaybeLiteral {
    /// Returns the literal string value of `self`, or `None` if it contains
    /// any substitution (`$name`, `[cmd]`, `{*}`).
    fn to_string_if_literal(&self) -> Option<String>;
}

/// A whole Tcl script: an ordered sequence of commands and comments.
#[derive(Clone, Debug)]
pub struct Script {
    pub items: Vec<ScriptItem>,
    pub span: Span,
}

impl Spanned for Script {
    fn span(&self) -> &Span {
        &self.span
    }
}

impl Script {
    /// Iterates the [`Command`]s in this script, skipping comments.
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.items.iter().filter_map(|item| match item {
            ScriptItem::Command(c) => Some(c),
            ScriptItem::Comment(_) => None,
        })
    }
}

#[derive(Clone, Debug)]
pub enum ScriptItem {
    Command(Command),
    Comment(Comment),
}

impl Spanned for ScriptItem {
    fn span(&self) -> &Span {
        match self {
            ScriptItem::Command(c) => &c.span,
            ScriptItem::Comment(c) => &c.span,
        }
    }
}

/// A `#`-to-end-of-line comment appearing where a script admits a command.
#[derive(Clone, Debug)]
pub struct Comment {
    /// Comment text, not including the leading `#` or trailing newline.
    pub text: String,
    pub span: Span,
}

/// A single logical command: a command-name word followed by argument
/// words, as delimited by whitespace and terminated by a newline or `;`.
#[derive(Clone, Debug)]
pub struct Command {
    /// `words[0]` is the command name; `words[1..]` are its arguments.
    pub words: Vec<Word>,
    /// A `;# comment` trailing the command on the same source line, if any.
    pub inline_comment: Option<Comment>,
    pub span: Span,
}

impl Spanned for Command {
    fn span(&self) -> &Span {
        &self.span
    }
}

impl Command {
    pub fn name(&self) -> &Word {
        &self.words[0]
    }

    pub fn args(&self) -> &[Word] {
        &self.words[1..]
    }

    /// The command name's literal text, if it has no substitution.
    ///
    /// Command dispatch (§4D) looks commands up by this; a command whose
    /// name itself contains a substitution (`[get_cmd_name] arg`) cannot be
    /// resolved statically and is left undispatched.
    pub fn name_literal(&self) -> Option<String> {
        self.words[0].to_string_if_literal()
    }
}

/// A single argument or command-name token.
///
/// Dispatch on the first significant byte decides which variant a word
/// parses into (spec §4B "Word parse").
#[derive(Clone, Debug)]
pub enum Word {
    /// An unquoted literal, e.g. `foo`, `-switch`, `123`.
    Bare(BareWord),
    /// `{…}` — brace-quoted, no substitution inside; may additionally carry
    /// a structured re-parse (script/expr/list) once a command handler has
    /// interpreted it that way.
    Braced(BracedWord),
    /// `"…"` — double-quoted, with `$`, `[`, and `\` recognized inside.
    Quoted(QuotedWord),
    /// Several word units glued together with no intervening whitespace,
    /// e.g. `foo$bar[baz]`.
    Compound(CompoundWord),
    /// `$name`, `$name(index)`, or `${name}`.
    VarSub(VarSub),
    /// `[…]` holding a nested script.
    CmdSub(CmdSub),
    /// `{*}word` — argument expansion.
    ArgExpansion(ArgExpansion),
    /// A braced word re-parsed as a structured list (after a command
    /// handler requested it, e.g. `proc`'s argument-list parameter).
    List(ListWord),
    /// A word re-parsed as a structured expression (after `expr` or an
    /// `expr`-typed handler argument requested it).
    Expression(ExpressionWord),
    /// `\x` — a single backslash escape appearing outside any quoting.
    BackslashSub(BackslashSub),
}

impl Spanned for Word {
    fn span(&self) -> &Span {
        match self {
            Word::Bare(w) => &w.span,
            Word::Braced(w) => &w.span,
            Word::Quoted(w) => &w.span,
            Word::Compound(w) => &w.span,
            Word::VarSub(w) => &w.span,
            Word::CmdSub(w) => &w.span,
            Word::ArgExpansion(w) => &w.span,
            Word::List(w) => &w.span,
            Word::Expression(w) => &w.span,
            Word::BackslashSub(w) => &w.span,
        }
    }
}

impl MaybeLiteral for Word {
    fn to_string_if_literal(&self) -> Option<String> {
        match self {
            Word::Bare(w) => Some(w.text.clone()),
            Word::Braced(w) => Some(w.raw.clone()),
            Word::Quoted(w) => w.to_string_if_literal(),
            Word::Compound(w) => w.to_string_if_literal(),
            Word::VarSub(_) | Word::CmdSub(_) | Word::ArgExpansion(_) => None,
            Word::List(_) | Word::Expression(_) => None,
            Word::BackslashSub(w) => Some(w.resolved.to_string()),
        }
    }
}

impl Word {
    /// Whether this word (or, for a compound word, any of its parts)
    /// contains a variable or command substitution.
    ///
    /// Used by the `unbraced-expr` rule (spec §4E).
    pub fn contains_substitution(&self) -> bool {
        match self {
            Word::VarSub(_) | Word::CmdSub(_) => true,
            Word::Compound(w) => w.parts.iter().any(Word::contains_substitution),
            Word::Quoted(w) => w.parts.iter().any(Word::contains_substitution),
            Word::ArgExpansion(w) => w.word.contains_substitution(),
            _ => false,
        }
    }

    /// Whether this word is `{*}`-prefixed, at top level, anywhere in a
    /// command's argument list; used to disable exact argument counting
    /// (spec §4D step 7).
    pub fn is_arg_expansion(&self) -> bool {
        matches!(self, Word::ArgExpansion(_))
    }
}

#[derive(Clone, Debug)]
pub struct BareWord {
    pub text: String,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct BracedWord {
    /// The literal bytes between the braces, verbatim (no substitution).
    pub raw: String,
    /// A structured re-parse of `raw`, present only once a command handler
    /// (§4D) has re-interpreted this word as a script, expression or list.
    /// The original `raw` text is always retained alongside so the
    /// formatter can fall back to it (spec §3 "Lifecycle").
    pub reparsed: Option<Reparsed>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Reparsed {
    Script(Script),
    Expression(Expr),
    List(Vec<Word>),
}

#[derive(Clone, Debug)]
pub struct QuotedWord {
    /// The `"…"`-internal substitution children: runs of literal text
    /// interspersed with `VarSub`/`CmdSub`/`BackslashSub` words.
    pub parts: Vec<Word>,
    pub span: Span,
}

impl MaybeLiteral for QuotedWord {
    fn to_string_if_literal(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            out.push_str(&part.to_string_if_literal()?);
        }
        Some(out)
    }
}

#[derive(Clone, Debug)]
pub struct CompoundWord {
    pub parts: Vec<Word>,
    pub span: Span,
}

impl MaybeLiteral for CompoundWord {
    fn to_string_if_literal(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            out.push_str(&part.to_string_if_literal()?);
        }
        Some(out)
    }
}

/// `$name`, `$name(index)`, or `${name}`.
#[derive(Clone, Debug)]
pub struct VarSub {
    pub name: String,
    /// The `(index)` part of an array reference, `$name(index)`, if any.
    /// The index itself may contain substitutions, so it is a `Word`.
    pub index: Option<Box<Word>>,
    /// Whether this was written `${name}` (braced form) rather than bare
    /// `$name`; purely cosmetic, kept for the formatter.
    pub braced: bool,
    pub span: Span,
}

/// `[…]`, holding a nested script whose last command's result substitutes
/// in place.
#[derive(Clone, Debug)]
pub struct CmdSub {
    pub script: Script,
    pub span: Span,
}

/// `{*}word` — expands `word` (normally a list) into multiple arguments.
#[derive(Clone, Debug)]
pub struct ArgExpansion {
    pub word: Box<Word>,
    pub span: Span,
}

/// A word re-parsed as a braced list (spec §4B "List parser").
#[derive(Clone, Debug)]
pub struct ListWord {
    pub raw: String,
    pub elements: Vec<Word>,
    pub span: Span,
}

/// A word re-parsed as a structured `expr` expression.
#[derive(Clone, Debug)]
pub struct ExpressionWord {
    pub raw: String,
    pub expr: Expr,
    pub span: Span,
}

/// `\x` outside any quoting: a single escaped byte.
#[derive(Clone, Debug)]
pub struct BackslashSub {
    /// The character following the backslash, as written.
    pub escaped: char,
    /// The value this escape resolves to (spec gives Tcl's backslash table:
    /// `\n` -> newline, `\t` -> tab, etc.; an escape with no special
    /// meaning resolves to the escaped character itself).
    pub resolved: char,
    pub span: Span,
}

// ---------------------------------------------------------------------
// Expression tree (the `expr` sub-grammar, spec §4B)
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    StrEq,
    StrNe,
    In,
    NotIn,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    /// Binding power: lower binds looser, following the precedence table
    /// in spec §4B ("Expression sub-parser"). Encoded as `(left, right)`
    /// binding powers for Pratt parsing; equal for left-associative
    /// operators, `right < left` for the one right-associative case (`**`).
    pub fn binding_power(self) -> (u8, u8) {
        use BinaryOp::*;
        match self {
            Or => (1, 2),
            And => (3, 4),
            BitOr => (5, 6),
            BitXor => (7, 8),
            BitAnd => (9, 10),
            Eq | Ne => (11, 12),
            StrEq | StrNe | In | NotIn => (13, 14),
            Lt | Le | Gt | Ge => (15, 16),
            Shl | Shr => (17, 18),
            Add | Sub => (19, 20),
            Mul | Div | Mod => (21, 22),
            Pow => (24, 23), // right-associative: right binds looser than left
        }
    }

    pub fn as_str(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Or => "||",
            And => "&&",
            BitOr => "|",
            BitXor => "^",
            BitAnd => "&",
            Eq => "==",
            Ne => "!=",
            StrEq => "eq",
            StrNe => "ne",
            In => "in",
            NotIn => "ni",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Shl => "<<",
            Shr => ">>",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Pow => "**",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Expr {
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Ternary {
        cond: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
        span: Span,
    },
    Function {
        name: String,
        args: Vec<Expr>,
        span: Span,
    },
    Paren {
        inner: Box<Expr>,
        span: Span,
    },
    /// A leaf: a literal, variable substitution, command substitution, or
    /// quoted/braced sub-expression that did not decompose further.
    Leaf(Word),
}

impl Spanned for Expr {
    fn span(&self) -> &Span {
        match self {
            Expr::BinaryOp { span, .. }
            | Expr::UnaryOp { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Function { span, .. }
            | Expr::Paren { span, .. } => span,
            Expr::Leaf(w) => w.span(),
        }
    }
}

/// Whether this expression is itself a single call to the `expr` command
/// re-expressed as a function — used by the `redundant-expr` rule, which
/// flags `expr {[expr {...}]}` (spec §4E).
impl Expr {
    pub fn is_redundant_expr_call(&self) -> bool {
        matches!(self, Expr::Leaf(Word::CmdSub(cmd_sub))
            if cmd_sub.script.commands().count() == 1
                && cmd_sub
                    .script
                    .commands()
                    .next()
                    .and_then(Command::name_literal)
                    .as_deref()
                    == Some("expr"))
    }
}

// ---------------------------------------------------------------------
// Visitor
// ---------------------------------------------------------------------

/// Pre-order (with an opt-in post-order hook) visitor over a [`Script`].
///
/// Rule implementations (§4E) and the formatter (§4G) both walk the tree
/// this way; giving them a shared visitor keeps traversal order consistent
/// and lets the rule engine run every enabled rule in one pass (spec §4E:
/// "the engine invokes each enabled rule over the tree in one traversal
/// where possible").
pub trait Visitor {
    fn visit_script(&mut self, script: &Script) {
        walk_script(self, script);
    }
    fn visit_command(&mut self, command: &Command) {
        walk_command(self, command);
    }
    fn visit_comment(&mut self, _comment: &Comment) {}
    fn visit_word(&mut self, word: &Word) {
        walk_word(self, word);
    }
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
    /// Called after all of a script's children have been visited.
    fn leave_script(&mut self, _script: &Script) {}
}

pub fn walk_script<V: Visitor + ?Sized>(v: &mut V, script: &Script) {
    for item in &script.items {
        match item {
            ScriptItem::Command(c) => v.visit_command(c),
            ScriptItem::Comment(c) => v.visit_comment(c),
        }
    }
    v.leave_script(script);
}

pub fn walk_command<V: Visitor + ?Sized>(v: &mut V, command: &Command) {
    for word in &command.words {
        v.visit_word(word);
    }
}

pub fn walk_word<V: Visitor + ?Sized>(v: &mut V, word: &Word) {
    match word {
        Word::Quoted(w) => {
            for part in &w.parts {
                v.visit_word(part);
            }
        }
        Word::Compound(w) => {
            for part in &w.parts {
                v.visit_word(part);
            }
        }
        Word::CmdSub(w) => v.visit_script(&w.script),
        Word::ArgExpansion(w) => v.visit_word(&w.word),
        Word::VarSub(w) => {
            if let Some(index) = &w.index {
                v.visit_word(index);
            }
        }
        Word::Braced(w) => match &w.reparsed {
            Some(Reparsed::Script(s)) => v.visit_script(s),
            Some(Reparsed::Expression(e)) => v.visit_expr(e),
            Some(Reparsed::List(words)) => {
                for word in words {
                    v.visit_word(word);
                }
            }
            None => {}
        },
        Word::List(w) => {
            for element in &w.elements {
                v.visit_word(element);
            }
        }
        Word::Expression(w) => v.visit_expr(&w.expr),
        Word::Bare(_) | Word::BackslashSub(_) => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::BinaryOp { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::UnaryOp { operand, .. } => v.visit_expr(operand),
        Expr::Ternary {
            cond,
            if_true,
            if_false,
            ..
        } => {
            v.visit_expr(cond);
            v.visit_expr(if_true);
            v.visit_expr(if_false);
        }
        Expr::Function { args, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Paren { inner, .. } => v.visit_expr(inner),
        Expr::Leaf(word) => v.visit_word(word),
    }
}

/// Finds the innermost node whose span contains `(line, column)`.
///
/// Used by the language-server façade to resolve "what's under the
/// cursor" (spec §4C).
pub fn node_at(script: &Script, line: u32, column: u32) -> Option<&Command> {
    fn contains(span: &Span, line: u32, column: u32) -> bool {
        let start = span.start();
        let end = span.end();
        (start.line, start.column) <= (line, column) && (line, column) <= (end.line, end.column)
    }

    fn in_word(word: &Word, line: u32, column: u32) -> Option<&Command> {
        match word {
            Word::CmdSub(w) => in_script(&w.script, line, column),
            Word::Quoted(w) => w.parts.iter().find_map(|part| in_word(part, line, column)),
            Word::Compound(w) => w.parts.iter().find_map(|part| in_word(part, line, column)),
            Word::ArgExpansion(w) => in_word(&w.word, line, column),
            Word::Braced(w) => match &w.reparsed {
                Some(Reparsed::Script(s)) => in_script(s, line, column),
                _ => None,
            },
            _ => None,
        }
    }

    fn in_script(script: &Script, line: u32, column: u32) -> Option<&Command> {
        for item in &script.items {
            if let ScriptItem::Command(command) = item {
                if contains(&command.span, line, column) {
                    for word in &command.words {
                        if let Some(found) = in_word(word, line, column) {
                            return Some(found);
                        }
                    }
                    return Some(command);
                }
            }
        }
        None
    }

    in_script(script, line, column)
}

// ---------------------------------------------------------------------
// Display: single-line re-emission for structural-equivalence checks
// ---------------------------------------------------------------------

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for item in &self.items {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            match item {
                ScriptItem::Command(c) => write!(f, "{c}")?,
                ScriptItem::Comment(c) => write!(f, "#{}", c.text)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for word in &self.words {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{word}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Bare(w) => write!(f, "{}", w.text),
            Word::Braced(w) => write!(f, "{{{}}}", w.raw),
            Word::Quoted(w) => {
                write!(f, "\"")?;
                for part in &w.parts {
                    write!(f, "{part}")?;
                }
                write!(f, "\"")
            }
            Word::Compound(w) => {
                for part in &w.parts {
                    write!(f, "{part}")?;
                }
                Ok(())
            }
            Word::VarSub(w) => {
                if w.braced {
                    write!(f, "${{{}}}", w.name)
                } else if let Some(index) = &w.index {
                    write!(f, "${}({index})", w.name)
                } else {
                    write!(f, "${}", w.name)
                }
            }
            Word::CmdSub(w) => write!(f, "[{}]", w.script),
            Word::ArgExpansion(w) => write!(f, "{{*}}{}", w.word),
            Word::List(w) => write!(f, "{{{}}}", w.raw),
            Word::Expression(w) => write!(f, "{{{}}}", w.raw),
            Word::BackslashSub(w) => write!(f, "\\{}", w.escaped),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::BinaryOp { op, left, right, .. } => write!(f, "{left} {} {right}", op.as_str()),
            Expr::UnaryOp { op, operand, .. } => write!(f, "{}{operand}", op.as_str()),
            Expr::Ternary {
                cond,
                if_true,
                if_false,
                ..
            } => write!(f, "{cond} ? {if_true} : {if_false}"),
            Expr::Function { name, args, .. } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::Paren { inner, .. } => write!(f, "({inner})"),
            Expr::Leaf(word) => write!(f, "{word}"),
        }
    }
}

/// A shared handle to a parsed script, as the [`crate::driver`] façade hands
/// back to callers who need to hold onto a tree across multiple queries
/// (e.g. a language server resolving several `node_at` calls against the
/// same buffer version).
pub type SharedScript = Rc<Script>;

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::parser::{Parser, ParserConfig};
    use crate::source::{Code, Origin};
    use proptest::prelude::*;

    fn bare_word() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9_]{0,5}"
    }

    fn braced_word() -> impl Strategy<Value = String> {
        bare_word().prop_map(|w| format!("{{{w}}}"))
    }

    fn command() -> impl Strategy<Value = String> {
        proptest::collection::vec(prop_oneof![bare_word(), braced_word()], 1..5).prop_map(|words| words.join(" "))
    }

    fn assert_nested(outer: &std::ops::Range<usize>, inner: &Span) {
        assert!(inner.range.start >= outer.start);
        assert!(inner.range.end <= outer.end);
    }

    proptest! {
        /// §3's "Child spans nest strictly within parent spans": every word
        /// in a command sits inside that command's own span, and every
        /// command sits inside the script's span.
        #[test]
        fn word_and_command_spans_nest_within_their_parents(commands in proptest::collection::vec(command(), 1..6)) {
            let src = format!("{}\n", commands.join("\n"));
            let code = Code::new(&src, Origin::Unknown);
            let mut parser = Parser::new(code.clone(), ParserConfig::default());
            let script = parser.parse_script().unwrap();

            for item in &script.items {
                let ScriptItem::Command(cmd) = item else { continue };
                assert_nested(&script.span.range, cmd.span());
                for word in &cmd.words {
                    assert_nested(&cmd.span.range, word.span());
                }
            }
        }
    }
}
