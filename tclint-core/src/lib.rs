//! `tclint-core`: a lexer, parser, command registry, rule engine and
//! formatter for Tcl and its hardware-description dialects (SDC, XDC, UPF).
//!
//! This crate is a pure analysis library: it never evaluates Tcl and holds
//! no process-wide state. A caller (a CLI, an editor's language server)
//! drives it through [`driver`]'s three operations — `lint`, `format`, and
//! `symbols` — each taking a source string and a config value and returning
//! owned results.

pub mod config;
pub mod directives;
pub mod driver;
pub mod format;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod rules;
pub mod source;
pub mod syntax;
