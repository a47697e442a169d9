//! Pretty-printer (spec §4G).
//!
//! New relative to the teacher (`yash-syntax` only ever re-emits a single
//! line, via the `Display` impls in [`crate::syntax`], for its own
//! round-trip tests). This module generalizes that same recursive
//! composition with the indent and line-break bookkeeping a real multi-line
//! pretty-printer needs, grounded on the structural walk `yash_syntax::
//! syntax::impl_display` uses but driven by an explicit depth counter
//! instead of purely lexical recursion.
//!
//! Priority order (spec §4G): semantic fidelity first (the output must
//! re-parse to a structurally equivalent tree — checked by `-d` debug mode
//! in the driver, not here), then idempotence, then the configured style.
//! Nothing in this module ever drops, reorders, or invents a word; it only
//! decides whitespace.

use crate::config::{IndentStyle, StyleConfig};
use crate::syntax::{Command, Reparsed, Script, ScriptItem, Spanned, Word};

/// Renders `script` as Tcl source under `style`.
pub fn format(script: &Script, style: &StyleConfig) -> String {
    let mut emitter = Emitter::new(style);
    emitter.emit_script_body(script, 0);
    emitter.finish()
}

struct Emitter<'a> {
    style: &'a StyleConfig,
    out: String,
    at_line_start: bool,
}

impl<'a> Emitter<'a> {
    fn new(style: &'a StyleConfig) -> Self {
        Emitter {
            style,
            out: String::new(),
            at_line_start: true,
        }
    }

    /// Leading/trailing blank lines are removed from every script body
    /// (including the top-level one), and the file always ends in exactly
    /// one trailing newline.
    fn finish(mut self) -> String {
        while self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out.push('\n');
        self.out
    }

    fn indent_str(&self, depth: usize) -> String {
        match &self.style.indent {
            IndentStyle::Tab => "\t".repeat(depth),
            IndentStyle::Spaces(n) => " ".repeat(*n as usize * depth),
            // No per-column tab/space mixing model exists below the word
            // level; approximated as space-width indentation (see
            // `rules::style::Indent`, which makes the same simplification).
            IndentStyle::Mixed { spaces, .. } => " ".repeat((*spaces).max(1) as usize * depth),
        }
    }

    fn write_indent(&mut self, depth: usize) {
        if self.at_line_start {
            self.out.push_str(&self.indent_str(depth));
            self.at_line_start = false;
        }
    }

    /// Ends the current output line, trimming any trailing whitespace from
    /// it first (spec: "trailing whitespace removed").
    fn newline(&mut self) {
        while self.out.ends_with(' ') || self.out.ends_with('\t') {
            self.out.pop();
        }
        self.out.push('\n');
        self.at_line_start = true;
    }

    /// Emits the commands and comments of a script body at `depth`,
    /// collapsing interior blank-line runs to `style.max_blank_lines` using
    /// the source line numbers already on each item's span.
    fn emit_script_body(&mut self, script: &Script, depth: usize) {
        let mut prev_end_line: Option<u32> = None;
        for item in &script.items {
            let start_line = item.span().start().line;
            if let Some(prev) = prev_end_line {
                let gap = start_line.saturating_sub(prev).saturating_sub(1);
                for _ in 0..gap.min(self.style.max_blank_lines as u32) {
                    self.out.push('\n');
                }
            }
            self.write_indent(depth);
            match item {
                ScriptItem::Command(c) => self.emit_command(c, depth),
                ScriptItem::Comment(c) => self.out.push_str(&format!("#{}", c.text.trim_end())),
            }
            self.newline();
            prev_end_line = Some(item.span().end().line);
        }
    }

    fn emit_command(&mut self, command: &Command, depth: usize) {
        for (i, word) in command.words.iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }
            self.emit_word(word, depth);
        }
        if let Some(comment) = &command.inline_comment {
            self.out.push_str(&format!(" ;#{}", comment.text.trim_end()));
        }
    }

    fn emit_word(&mut self, word: &Word, depth: usize) {
        match word {
            Word::Bare(w) => self.out.push_str(&w.text),
            Word::Braced(w) => match &w.reparsed {
                Some(Reparsed::Script(inner)) => self.emit_braced_script(inner, &w.raw, depth),
                Some(Reparsed::Expression(expr)) => {
                    self.emit_expr_body(&expr.to_string(), &w.raw, depth);
                }
                Some(Reparsed::List(elements)) => {
                    let rendered = elements.iter().map(Word::to_string).collect::<Vec<_>>().join(" ");
                    self.emit_braced_oneliner(&rendered);
                }
                // A literal `{...}` argument no handler ever re-parsed: its
                // body may be meaningful string data, so it is reproduced
                // byte-for-byte rather than reformatted (mirrors the
                // `spaces-in-braces` rule's own restriction to structurally
                // re-parsed words, spec §4E).
                None => self.out.push_str(&format!("{{{}}}", w.raw)),
            },
            Word::Quoted(w) => {
                self.out.push('"');
                for part in &w.parts {
                    self.emit_word(part, depth);
                }
                self.out.push('"');
            }
            Word::Compound(w) => {
                for part in &w.parts {
                    self.emit_word(part, depth);
                }
            }
            Word::VarSub(w) => {
                if w.braced {
                    self.out.push_str(&format!("${{{}}}", w.name));
                } else if let Some(index) = &w.index {
                    self.out.push_str(&format!("${}(", w.name));
                    self.emit_word(index, depth);
                    self.out.push(')');
                } else {
                    self.out.push_str(&format!("${}", w.name));
                }
            }
            Word::CmdSub(w) => self.emit_cmd_sub(&w.script, depth),
            Word::ArgExpansion(w) => {
                self.out.push_str("{*}");
                self.emit_word(&w.word, depth);
            }
            // Never produced by this crate's own dispatcher (only
            // `Word::Braced::reparsed` is), kept total over the AST in case
            // a future handler or plugin constructs one directly.
            Word::List(w) => self.out.push_str(&format!("{{{}}}", w.raw)),
            Word::Expression(w) => self.out.push_str(&format!("{{{}}}", w.raw)),
            Word::BackslashSub(w) => {
                self.out.push('\\');
                self.out.push(w.escaped);
            }
        }
    }

    /// Renders a `{ contents }`/`{contents}` braced body that is not itself
    /// a multi-line script (an expression or a list), honoring
    /// `spaces_in_braces`.
    fn emit_braced_oneliner(&mut self, contents: &str) {
        if self.style.spaces_in_braces && !contents.is_empty() {
            self.out.push_str(&format!("{{ {contents} }}"));
        } else {
            self.out.push_str(&format!("{{{contents}}}"));
        }
    }

    /// Renders a reparsed `expr` body. One written on a single source line
    /// re-emits `expr_text` (the structurally normalized `Display` form, so
    /// spacing around operators matches `expr-format`'s expectation); one
    /// that spanned multiple lines keeps its own line breaks, reindented to
    /// `depth + 1`, rather than collapsing back to one line (spec §4G:
    /// "Multi-line braced expressions... body nested one indent level").
    fn emit_expr_body(&mut self, expr_text: &str, raw: &str, depth: usize) {
        if raw.contains('\n') {
            self.emit_multiline_raw(raw, depth);
        } else {
            self.emit_braced_oneliner(expr_text);
        }
    }

    /// Reindents each non-blank line of `raw` to `depth + 1`, with the
    /// opening brace on the current line and the closing brace on its own
    /// line at `depth`.
    fn emit_multiline_raw(&mut self, raw: &str, depth: usize) {
        self.out.push('{');
        self.newline();
        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.write_indent(depth + 1);
            self.out.push_str(trimmed);
            self.newline();
        }
        self.write_indent(depth);
        self.out.push('}');
    }

    /// Renders a braced script body. A single-command body that was
    /// originally written on one line stays inline; anything else (multiple
    /// commands, or a body that spanned multiple source lines) is rendered
    /// with the opening brace on the parent line, the body nested one
    /// indent level, and the closing brace on its own line aligned with the
    /// parent's indent (spec §4G rendering rules).
    fn emit_braced_script(&mut self, inner: &Script, raw: &str, depth: usize) {
        let multiline = inner.items.len() > 1 || raw.contains('\n');
        if !multiline {
            if let Some(ScriptItem::Command(c)) = inner.items.first() {
                let mut rendered = Emitter::new(self.style);
                rendered.emit_command(c, 0);
                self.emit_braced_oneliner(&rendered.out);
                return;
            }
            // Empty body, or a lone comment: still a one-liner.
            self.emit_braced_oneliner(raw.trim());
            return;
        }

        self.out.push('{');
        self.newline();
        self.emit_script_body(inner, depth + 1);
        self.write_indent(depth);
        self.out.push('}');
    }

    /// `[...]`: brackets stay inline for a single command; a multi-command
    /// substitution gets its own lines, each command indented one level
    /// past the substitution's parent (spec §4G: "`CmdSub` with multiple
    /// commands: brackets on their own lines").
    fn emit_cmd_sub(&mut self, inner: &Script, depth: usize) {
        let commands: Vec<&Command> = inner.commands().collect();
        if commands.len() <= 1 && inner.items.len() <= 1 {
            self.out.push('[');
            if let Some(c) = commands.first() {
                self.emit_command(c, depth);
            }
            self.out.push(']');
            return;
        }

        self.out.push('[');
        self.newline();
        self.emit_script_body(inner, depth + 1);
        self.write_indent(depth);
        self.out.push(']');
    }
}
