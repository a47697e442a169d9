//! Loading a plugin's command specs from its JSON declaration file (spec
//! §6's plugin-file shape).
//!
//! Grounded on `config.rs`'s `serde`-derived config types for the shape of
//! the mapping, and on `yash_syntax::decl_util::Glossary`'s layered-lookup
//! pattern for how a [`PluginRegistry`] slots in ahead of the built-in
//! table in a [`super::LayeredRegistry`].

use super::{ArgType, CommandEntry, CommandSpec, PositionalSpec, Registry, SwitchSpec};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("malformed plugin spec: {0}")]
    Json(#[from] serde_json::Error),
    #[error("command `{command}` declares the switch `-{switch}` more than once")]
    SwitchNameCollision { command: String, switch: String },
}

/// One `{"commands": {...}}` entry's on-disk shape, matching
/// `CommandSpec`'s fields one-for-one with JSON-friendly types. The JSON
/// value itself may also be `null` (spec §6: "disables all checks; the
/// command is merely known"), handled one level up as `Option<RawCommandSpec>`.
#[derive(Debug, Deserialize)]
struct RawCommandSpec {
    #[serde(default)]
    switches: Vec<RawSwitchSpec>,
    #[serde(default)]
    positionals: Vec<RawPositionalSpec>,
    #[serde(default)]
    variadic_tail: Option<RawArgType>,
    #[serde(default)]
    subcommands: HashMap<String, Option<RawCommandSpec>>,
}

#[derive(Debug, Deserialize)]
struct RawSwitchSpec {
    name: String,
    #[serde(default)]
    takes_value: bool,
    #[serde(default)]
    value_type: RawArgType,
}

#[derive(Debug, Deserialize)]
struct RawPositionalSpec {
    name: String,
    #[serde(default)]
    arg_type: RawArgType,
    #[serde(default)]
    optional: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawArgType {
    #[default]
    Any,
    Script,
    Expr,
    List,
    VarName,
}

impl From<RawArgType> for ArgType {
    fn from(raw: RawArgType) -> Self {
        match raw {
            RawArgType::Any => ArgType::Any,
            RawArgType::Script => ArgType::Script,
            RawArgType::Expr => ArgType::Expr,
            RawArgType::List => ArgType::List,
            RawArgType::VarName => ArgType::VarName,
        }
    }
}

fn leak(name: String) -> &'static str {
    Box::leak(name.into_boxed_str())
}

impl From<RawCommandSpec> for CommandSpec {
    fn from(raw: RawCommandSpec) -> Self {
        CommandSpec {
            switches: raw
                .switches
                .into_iter()
                .map(|s| SwitchSpec {
                    name: leak(s.name),
                    takes_value: s.takes_value,
                    value_type: s.value_type.into(),
                })
                .collect(),
            positionals: raw
                .positionals
                .into_iter()
                .map(|p| PositionalSpec {
                    name: leak(p.name),
                    arg_type: p.arg_type.into(),
                    optional: p.optional,
                })
                .collect(),
            variadic_tail: raw.variadic_tail.map(Into::into),
            // A `null` subcommand spec disables checks the same way a `null`
            // top-level command does; since `Registry::lookup` returning
            // `None` already means "skip validation", it's left out of the
            // map rather than represented some other way.
            subcommands: raw
                .subcommands
                .into_iter()
                .filter_map(|(name, spec)| Some((leak(name), spec?.into())))
                .collect(),
        }
    }
}

/// Walks a command spec (and its subcommand specs, recursively) looking for
/// two switches declared under the same name — a plugin author's copy-paste
/// mistake that would otherwise make `validate_and_reparse`'s switch lookup
/// silently pick whichever one `Vec::iter().find` happens to hit first.
fn check_switch_collisions(command: &str, spec: &RawCommandSpec) -> Result<(), PluginError> {
    let mut seen = std::collections::HashSet::new();
    for switch in &spec.switches {
        if !seen.insert(switch.name.as_str()) {
            return Err(PluginError::SwitchNameCollision {
                command: command.to_string(),
                switch: switch.name.clone(),
            });
        }
    }
    for (name, sub) in &spec.subcommands {
        if let Some(sub) = sub {
            check_switch_collisions(&format!("{command} {name}"), sub)?;
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RawPluginFile {
    name: String,
    #[serde(default)]
    commands: HashMap<String, Option<RawCommandSpec>>,
}

#[derive(Debug, Default)]
pub struct PluginRegistry {
    pub name: String,
    specs: HashMap<&'static str, CommandEntry>,
}

impl Registry for PluginRegistry {
    fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        self.specs.get(name)
    }
}

impl PluginRegistry {
    /// Parses a plugin file's JSON text into a registry layer (spec §6).
    /// A command name is leaked to `'static` once per plugin load, which is
    /// acceptable here: plugin files are loaded once at startup, not per
    /// file linted.
    ///
    /// Rejects the whole file, rather than just the offending command, on a
    /// malformed spec value: an unknown `value_type` is caught by `serde`
    /// itself (`RawArgType` has no catch-all variant), and a switch-name
    /// collision within one command is caught explicitly below (spec §7
    /// "Plugin error ... the plugin is rejected whole").
    pub fn from_json(text: &str) -> Result<Self, PluginError> {
        let raw: RawPluginFile = serde_json::from_str(text).map_err(|e| {
            tracing::warn!(error = %e, "rejecting malformed plugin spec");
            PluginError::Json(e)
        })?;
        for (command, spec) in &raw.commands {
            if let Some(spec) = spec {
                check_switch_collisions(command, spec).map_err(|e| {
                    tracing::warn!(error = %e, "rejecting malformed plugin spec");
                    e
                })?;
            }
        }
        let specs = raw
            .commands
            .into_iter()
            .filter_map(|(name, spec)| Some((leak(name), CommandEntry::Spec(spec?.into()))))
            .collect();
        Ok(PluginRegistry { name: raw.name, specs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn loads_a_simple_plugin_command() {
        let json = r#"{
            "name": "my_plugin",
            "commands": {
                "my_assert": {
                    "positionals": [
                        {"name": "condition", "arg_type": "expr"},
                        {"name": "message", "optional": true}
                    ]
                }
            }
        }"#;
        let registry = PluginRegistry::from_json(json).unwrap();
        assert_eq!(registry.name, "my_plugin");
        assert_matches!(registry.lookup("my_assert"), Some(CommandEntry::Spec(spec)) => {
            assert_eq!(spec.positionals.len(), 2);
            assert_eq!(spec.positionals[0].arg_type, ArgType::Expr);
            assert!(spec.positionals[1].optional);
        });
    }

    #[test]
    fn unknown_command_is_not_found() {
        let registry = PluginRegistry::from_json(r#"{"name": "empty", "commands": {}}"#).unwrap();
        assert!(registry.lookup("nope").is_none());
    }

    #[test]
    fn null_command_spec_is_known_but_unchecked() {
        let json = r#"{"name": "p", "commands": {"my_noop": null}}"#;
        let registry = PluginRegistry::from_json(json).unwrap();
        assert!(registry.lookup("my_noop").is_none());
    }

    #[test]
    fn rejects_a_plugin_whole_on_a_switch_name_collision() {
        let json = r#"{
            "name": "p",
            "commands": {
                "my_cmd": {
                    "switches": [
                        {"name": "verbose"},
                        {"name": "verbose"}
                    ]
                }
            }
        }"#;
        let err = PluginRegistry::from_json(json).unwrap_err();
        assert_matches!(err, PluginError::SwitchNameCollision { .. });
    }

    #[test]
    fn rejects_a_plugin_whole_on_an_unknown_value_type() {
        let json = r#"{
            "name": "p",
            "commands": {
                "my_cmd": {
                    "positionals": [{"name": "x", "arg_type": "not_a_real_type"}]
                }
            }
        }"#;
        assert!(PluginRegistry::from_json(json).is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(PluginRegistry::from_json("not json").is_err());
    }
}
