//! Identifier rewriting for merge-module scenarios.
//!
//! When a compiled module is merged into a consuming package, its
//! identifiers must not collide with the consumer's. Each column declares
//! a [`ModularizeType`] policy; the [`Modularizer`] applies the policy to
//! a raw field value, appending the module's uniqueness suffix to every
//! qualifying identifier. Platform-reserved names and explicitly
//! suppressed identifiers are never rewritten.

use fxhash::FxHashSet;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::standard::{is_standard_action, is_standard_property};

/// Per-column rewriting policy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ModularizeType {
    /// Never rewritten.
    #[default]
    None,
    /// The value is an identifier; suffix it. Anything else is an error.
    Column,
    /// A companion-file reference; a value starting with a digit is a
    /// literal version and is left alone.
    CompanionFile,
    /// An installer condition expression; qualifying identifier tokens are
    /// suffixed in place.
    Condition,
    /// A control-event argument; whether it is an identifier or a
    /// formatted string depends on the sibling event name.
    ControlEventArgument,
    /// Control text; only rewritten for `Bitmap`/`Icon` controls and only
    /// when the text is itself a well-formed identifier.
    ControlText,
    /// An icon reference; the suffix is inserted before the extension.
    Icon,
    /// A formatted string; `[Identifier]` property references are
    /// rewritten.
    Property,
    /// A `;`-delimited identifier list; every segment is suffixed.
    SemicolonDelimited,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModularizeError {
    #[error("cannot modularize '{value}': the column policy requires an identifier")]
    NotAnIdentifier { value: String },
}

/// Control events whose argument names a dialog, action, or property to
/// redirect to, rather than formatted text.
static IDENTIFIER_ARGUMENT_EVENTS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    FxHashSet::from_iter([
        "CheckExistingTargetPath",
        "CheckTargetPath",
        "DoAction",
        "NewDialog",
        "SelectionBrowse",
        "SetTargetPath",
        "SpawnDialog",
        "SpawnWaitDialog",
    ])
});

/// Keywords of the condition language; never identifiers.
static CONDITION_KEYWORDS: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| FxHashSet::from_iter(["AND", "OR", "NOT", "XOR", "EQV", "IMP", "MOD"]));

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][0-9A-Za-z_.]*$").expect("valid identifier pattern"));

/// `[Identifier]` property references inside a formatted string, with an
/// optional `#`, `$` or `!` file/component prefix.
static PROPERTY_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?P<prefix>[#$!]?)(?P<id>[A-Za-z_][0-9A-Za-z_.]*)\]")
        .expect("valid property reference pattern")
});

/// Tokenizer for the condition language: quoted strings, environment
/// variable references, comparison operators and identifiers.
static CONDITION_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?P<quote>"[^"]*")|(?P<env>%[A-Za-z_][0-9A-Za-z_.]*)|(?P<op><>|<=|>=|<<|>>|~=|=|<|>)|(?P<id>[A-Za-z_][0-9A-Za-z_.]*)"#)
        .expect("valid condition token pattern")
});

/// Returns true when `value` is a well-formed identifier.
pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER.is_match(value)
}

/// Rewrites identifiers with a module's uniqueness suffix.
#[derive(Debug, Clone)]
pub struct Modularizer {
    guid: String,
    suppressed: FxHashSet<String>,
}

impl Modularizer {
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            suppressed: FxHashSet::default(),
        }
    }

    /// Exempt an identifier from rewriting, for example one the authoring
    /// declared as shared.
    pub fn suppress(&mut self, id: impl Into<String>) {
        self.suppressed.insert(id.into());
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    /// Apply `policy` to `value`. `sibling` carries the context field the
    /// two context-sensitive policies dispatch on: the event name for
    /// [`ModularizeType::ControlEventArgument`] and the control type for
    /// [`ModularizeType::ControlText`].
    pub fn modularize(
        &self,
        policy: ModularizeType,
        value: &str,
        sibling: Option<&str>,
    ) -> Result<String, ModularizeError> {
        if self.is_exempt(value) {
            return Ok(value.to_owned());
        }

        match policy {
            ModularizeType::None => Ok(value.to_owned()),

            ModularizeType::Column => {
                if !is_identifier(value) {
                    return Err(ModularizeError::NotAnIdentifier {
                        value: value.to_owned(),
                    });
                }
                Ok(self.suffixed(value))
            }

            ModularizeType::CompanionFile => {
                // A value starting with a digit is a literal version.
                if value.starts_with(|c: char| c.is_ascii_digit()) {
                    Ok(value.to_owned())
                } else {
                    Ok(self.suffixed(value))
                }
            }

            ModularizeType::Condition => Ok(self.modularize_condition(value)),

            ModularizeType::ControlEventArgument => {
                let event = sibling.unwrap_or_default();
                if IDENTIFIER_ARGUMENT_EVENTS.contains(event) && is_identifier(value) {
                    Ok(self.suffixed(value))
                } else {
                    Ok(self.modularize_properties(value))
                }
            }

            ModularizeType::ControlText => {
                let control_type = sibling.unwrap_or_default();
                if matches!(control_type, "Bitmap" | "Icon") && is_identifier(value) {
                    Ok(self.suffixed(value))
                } else {
                    Ok(value.to_owned())
                }
            }

            ModularizeType::Icon => match value.rfind('.') {
                Some(dot) => Ok(format!(
                    "{}.{}.{}",
                    &value[..dot],
                    self.guid,
                    &value[dot + 1..]
                )),
                None => Ok(self.suffixed(value)),
            },

            ModularizeType::Property => Ok(self.modularize_properties(value)),

            ModularizeType::SemicolonDelimited => Ok(value
                .split(';')
                .map(|segment| {
                    if segment.is_empty() || self.is_exempt(segment) {
                        segment.to_owned()
                    } else {
                        self.suffixed(segment)
                    }
                })
                .collect::<Vec<_>>()
                .join(";")),
        }
    }

    fn is_exempt(&self, value: &str) -> bool {
        is_standard_action(value) || is_standard_property(value) || self.suppressed.contains(value)
    }

    fn suffixed(&self, value: &str) -> String {
        format!("{}.{}", value, self.guid)
    }

    /// Rewrite `[Identifier]` references inside a formatted string.
    fn modularize_properties(&self, value: &str) -> String {
        PROPERTY_REFERENCE
            .replace_all(value, |captures: &regex::Captures<'_>| {
                let prefix = &captures["prefix"];
                let id = &captures["id"];
                if self.is_exempt(id) {
                    captures[0].to_owned()
                } else {
                    format!("[{}{}.{}]", prefix, id, self.guid)
                }
            })
            .into_owned()
    }

    /// Rewrite qualifying identifier tokens of a condition expression.
    ///
    /// Matches are spliced right-to-left so earlier insertions cannot
    /// invalidate the offsets of matches still to be processed.
    fn modularize_condition(&self, value: &str) -> String {
        let mut rewritten = value.to_owned();
        let insertions: Vec<usize> = CONDITION_TOKEN
            .captures_iter(value)
            .filter_map(|captures| {
                let id = captures.name("id")?;
                let token = id.as_str();
                if CONDITION_KEYWORDS.contains(token) || self.is_exempt(token) {
                    None
                } else {
                    Some(id.end())
                }
            })
            .collect();

        for end in insertions.into_iter().rev() {
            rewritten.insert_str(end, &format!(".{}", self.guid));
        }
        rewritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modularizer() -> Modularizer {
        Modularizer::new("ABC")
    }

    #[test]
    fn column_policy_suffixes_identifiers() {
        let result = modularizer()
            .modularize(ModularizeType::Column, "MyComponent", None)
            .unwrap();
        assert_eq!(result, "MyComponent.ABC");
    }

    #[test]
    fn column_policy_is_single_pass_only() {
        // Double application is documented as non-idempotent: the contract
        // only guarantees single-pass correctness.
        let m = modularizer();
        let once = m
            .modularize(ModularizeType::Column, "MyComponent", None)
            .unwrap();
        let twice = m.modularize(ModularizeType::Column, &once, None).unwrap();
        assert_eq!(twice, "MyComponent.ABC.ABC");
    }

    #[test]
    fn column_policy_rejects_non_identifiers() {
        let error = modularizer()
            .modularize(ModularizeType::Column, "not an identifier", None)
            .unwrap_err();
        assert!(matches!(error, ModularizeError::NotAnIdentifier { .. }));
    }

    #[test]
    fn standard_names_are_never_rewritten() {
        let m = modularizer();
        assert_eq!(
            m.modularize(ModularizeType::Column, "CostFinalize", None)
                .unwrap(),
            "CostFinalize"
        );
        assert_eq!(
            m.modularize(ModularizeType::Column, "ProductCode", None)
                .unwrap(),
            "ProductCode"
        );
    }

    #[test]
    fn suppressed_identifiers_are_exempt() {
        let mut m = modularizer();
        m.suppress("SharedDialog");
        assert_eq!(
            m.modularize(ModularizeType::Column, "SharedDialog", None)
                .unwrap(),
            "SharedDialog"
        );
    }

    #[test]
    fn condition_rewrite_targets_identifier_tokens_only() {
        let m = Modularizer::new("Z1");
        let result = m
            .modularize(ModularizeType::Condition, "(X = 1) AND (Y = 2)", None)
            .unwrap();
        assert_eq!(result, "(X.Z1 = 1) AND (Y.Z1 = 2)");
    }

    #[test]
    fn condition_rewrite_skips_quotes_and_environment_variables() {
        let m = Modularizer::new("Z1");
        let result = m
            .modularize(
                ModularizeType::Condition,
                r#"MYPROP = "X" OR %PATH"#,
                None,
            )
            .unwrap();
        assert_eq!(result, r#"MYPROP.Z1 = "X" OR %PATH"#);
    }

    #[test]
    fn condition_rewrite_skips_standard_properties() {
        let m = Modularizer::new("Z1");
        let result = m
            .modularize(ModularizeType::Condition, "Installed OR MYCOND", None)
            .unwrap();
        assert_eq!(result, "Installed OR MYCOND.Z1");
    }

    #[test]
    fn property_policy_rewrites_bracket_references() {
        let m = modularizer();
        let result = m
            .modularize(
                ModularizeType::Property,
                "[MYDIR] and [#MyFile] but not [ProductName]",
                None,
            )
            .unwrap();
        assert_eq!(result, "[MYDIR.ABC] and [#MyFile.ABC] but not [ProductName]");
    }

    #[test]
    fn companion_file_skips_versions() {
        let m = modularizer();
        assert_eq!(
            m.modularize(ModularizeType::CompanionFile, "1.2.3.4", None)
                .unwrap(),
            "1.2.3.4"
        );
        assert_eq!(
            m.modularize(ModularizeType::CompanionFile, "MyFile", None)
                .unwrap(),
            "MyFile.ABC"
        );
    }

    #[test]
    fn icon_suffix_goes_before_the_extension() {
        let m = modularizer();
        assert_eq!(
            m.modularize(ModularizeType::Icon, "app.ico", None).unwrap(),
            "app.ABC.ico"
        );
        assert_eq!(
            m.modularize(ModularizeType::Icon, "noext", None).unwrap(),
            "noext.ABC"
        );
    }

    #[test]
    fn semicolon_delimited_suffixes_every_segment() {
        let m = modularizer();
        assert_eq!(
            m.modularize(ModularizeType::SemicolonDelimited, "A;B;TARGETDIR", None)
                .unwrap(),
            "A.ABC;B.ABC;TARGETDIR"
        );
    }

    #[test]
    fn control_event_argument_depends_on_event() {
        let m = modularizer();
        assert_eq!(
            m.modularize(
                ModularizeType::ControlEventArgument,
                "MyDialog",
                Some("NewDialog")
            )
            .unwrap(),
            "MyDialog.ABC"
        );
        // A formatted-string argument gets property rewriting instead.
        assert_eq!(
            m.modularize(
                ModularizeType::ControlEventArgument,
                "[MYPROP] text",
                Some("SetProperty")
            )
            .unwrap(),
            "[MYPROP.ABC] text"
        );
    }

    #[test]
    fn control_text_depends_on_control_type() {
        let m = modularizer();
        assert_eq!(
            m.modularize(ModularizeType::ControlText, "MyBitmap", Some("Bitmap"))
                .unwrap(),
            "MyBitmap.ABC"
        );
        assert_eq!(
            m.modularize(ModularizeType::ControlText, "MyBitmap", Some("Text"))
                .unwrap(),
            "MyBitmap"
        );
        // Not a well-formed identifier: left untouched even for Icon.
        assert_eq!(
            m.modularize(ModularizeType::ControlText, "two words", Some("Icon"))
                .unwrap(),
            "two words"
        );
    }
}
