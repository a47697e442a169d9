//! Style and rule configuration (spec §6's `[style]`/rule tables, minus the
//! TOML/file transport those are normally loaded from).
//!
//! `serde` derives the way `oj-core`'s config types do in the pack; this
//! crate only owns the in-memory shape and validation, not reading it off
//! disk.

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How a script is indented, as written in the `[style]` table's `indent`
/// key (spec §6: one of `"tab"`, an integer width, or `{spaces, tabs}`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IndentStyle {
    Tab,
    Spaces(u32),
    Mixed { spaces: u32, tabs: u32 },
}

impl Serialize for IndentStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IndentStyle::Tab => serializer.serialize_str("tab"),
            IndentStyle::Spaces(n) => serializer.serialize_u32(*n),
            IndentStyle::Mixed { spaces, tabs } => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("spaces", spaces)?;
                map.serialize_entry("tabs", tabs)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for IndentStyle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IndentStyleVisitor;

        impl<'de> Visitor<'de> for IndentStyleVisitor {
            type Value = IndentStyle;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "\"tab\", an integer width, or a {{spaces, tabs}} table")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(de::Error::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(IndentStyle::Spaces(v as u32))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(IndentStyle::Spaces(v as u32))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut spaces = 0u32;
                let mut tabs = 0u32;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "spaces" => spaces = map.next_value()?,
                        "tabs" => tabs = map.next_value()?,
                        other => return Err(de::Error::unknown_field(other, &["spaces", "tabs"])),
                    }
                }
                Ok(IndentStyle::Mixed { spaces, tabs })
            }
        }

        deserializer.deserialize_any(IndentStyleVisitor)
    }
}

impl Default for IndentStyle {
    fn default() -> Self {
        IndentStyle::Spaces(4)
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("invalid indent style {0:?}")]
    InvalidIndentStyle(String),
    #[error("line_length must be positive")]
    NonPositiveLineLength,
    #[error("max_blank_lines must be representable as a count (got {0})")]
    InvalidMaxBlankLines(i64),
}

impl FromStr for IndentStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "tab" {
            return Ok(IndentStyle::Tab);
        }
        if let Ok(n) = s.parse::<u32>() {
            return Ok(IndentStyle::Spaces(n));
        }
        Err(ConfigError::InvalidIndentStyle(s.to_string()))
    }
}

impl fmt::Display for IndentStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndentStyle::Tab => write!(f, "tab"),
            IndentStyle::Spaces(n) => write!(f, "{n}"),
            IndentStyle::Mixed { spaces, tabs } => write!(f, "{{spaces={spaces}, tabs={tabs}}}"),
        }
    }
}

/// The `[style]` table (spec §6), with defaults matching the spec's stated
/// ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub indent: IndentStyle,
    pub line_length: usize,
    pub max_blank_lines: usize,
    pub indent_namespace_eval: bool,
    pub spaces_in_braces: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        StyleConfig {
            indent: IndentStyle::default(),
            line_length: 100,
            max_blank_lines: 2,
            indent_namespace_eval: true,
            spaces_in_braces: false,
        }
    }
}

impl StyleConfig {
    /// Validates semantic constraints a `Deserialize` impl can't express
    /// (spec §1's "ambient" error-handling section).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.line_length == 0 {
            return Err(ConfigError::NonPositiveLineLength);
        }
        if let IndentStyle::Spaces(0) = self.indent {
            return Err(ConfigError::InvalidIndentStyle("0".to_string()));
        }
        Ok(())
    }
}

/// Which rules run, and the one rule-specific knob the spec names
/// (`allow_aligned_sets` for `spacing`). A rule's `category` (spec §4E) is
/// fixed per rule, not configurable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Rule ids explicitly turned off; every other known rule is enabled.
    pub disabled: HashSet<String>,
    pub allow_aligned_sets: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig {
            disabled: HashSet::new(),
            allow_aligned_sets: false,
        }
    }
}

impl RuleConfig {
    pub fn is_enabled(&self, rule_id: &str) -> bool {
        !self.disabled.contains(rule_id)
    }
}

/// Everything `driver::lint`/`driver::format` need for one call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    pub style: StyleConfig,
    pub rules: RuleConfig,
}

impl LintConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.style.validate()
    }
}

/// One `[[fileset]]` entry's resolved config plus the path predicate that
/// selects it, stripped of how that predicate was expressed in TOML (a
/// glob, a list of extensions, …) — the external loader owns that; this
/// crate just picks the first whose predicate accepts a path.
pub struct FilesetOverride<'a> {
    pub matches: Box<dyn Fn(&str) -> bool + 'a>,
    pub config: LintConfig,
}

/// Resolves the effective config for `path`: the first matching fileset
/// override, or `base` if none match. First-match-wins, per the Open
/// Question resolution in `DESIGN.md`.
pub fn resolve_fileset<'a>(
    base: &'a LintConfig,
    overrides: &'a [FilesetOverride<'a>],
    path: &str,
) -> &'a LintConfig {
    overrides
        .iter()
        .find(|o| (o.matches)(path))
        .map(|o| &o.config)
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_matches_spec() {
        let style = StyleConfig::default();
        assert_eq!(style.indent, IndentStyle::Spaces(4));
        assert_eq!(style.line_length, 100);
        assert_eq!(style.max_blank_lines, 2);
        assert!(style.indent_namespace_eval);
        assert!(!style.spaces_in_braces);
    }

    #[test]
    fn indent_style_parses_tab_and_width() {
        assert_eq!("tab".parse::<IndentStyle>().unwrap(), IndentStyle::Tab);
        assert_eq!("2".parse::<IndentStyle>().unwrap(), IndentStyle::Spaces(2));
        assert!("bogus".parse::<IndentStyle>().is_err());
    }

    #[test]
    fn zero_line_length_is_invalid() {
        let mut style = StyleConfig::default();
        style.line_length = 0;
        assert_eq!(style.validate(), Err(ConfigError::NonPositiveLineLength));
    }

    #[test]
    fn fileset_resolution_is_first_match_wins() {
        let base = LintConfig::default();
        let mut strict = LintConfig::default();
        strict.style.line_length = 80;
        let overrides = vec![
            FilesetOverride { matches: Box::new(|p: &str| p.ends_with(".tcl")), config: strict.clone() },
            FilesetOverride { matches: Box::new(|_: &str| true), config: base.clone() },
        ];
        let resolved = resolve_fileset(&base, &overrides, "foo.tcl");
        assert_eq!(resolved.style.line_length, 80);
        let resolved2 = resolve_fileset(&base, &overrides, "foo.sdc");
        assert_eq!(resolved2.style.line_length, 100);
    }
}
