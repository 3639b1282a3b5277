//! Typed field storage and the coercion engine.
//!
//! A field stores at most one canonical value. Which representations are
//! accepted, and how they are converted, is decided by the declared
//! [`FieldType`] of the column: coercion is type-directed, not
//! value-directed. Every successful write appends the prior value to an
//! append-only history, which is what transform tooling walks to recover
//! previous values.

use std::fmt;

use thiserror::Error;

/// Declared representation of a field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Bool,
    Number,
    LargeNumber,
    Path,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::LargeNumber => "large number",
            Self::Path => "path",
        };
        f.write_str(name)
    }
}

/// Name and type of one column of a symbol definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    name: String,
    field_type: FieldType,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

/// A path value, optionally referring to a blob embedded in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathValue {
    path: String,
    embedded_file_index: Option<usize>,
    base_uri: Option<String>,
}

impl PathValue {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            embedded_file_index: None,
            base_uri: None,
        }
    }

    /// A path resolved against an embedded file of a container identified
    /// by `base_uri`.
    pub fn embedded(path: impl Into<String>, index: usize, base_uri: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            embedded_file_index: Some(index),
            base_uri: Some(base_uri.into()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn embedded_file_index(&self) -> Option<usize> {
        self.embedded_file_index
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }
}

/// Canonical stored representation of a non-null field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldData {
    Bool(bool),
    Number(i32),
    LargeNumber(i64),
    String(String),
    Path(PathValue),
}

impl FieldData {
    /// The string projection used by primary keys, IDT export and XML
    /// persistence.
    pub fn as_string(&self) -> String {
        match self {
            Self::Bool(true) => "true".to_owned(),
            Self::Bool(false) => "false".to_owned(),
            Self::Number(number) => number.to_string(),
            Self::LargeNumber(number) => number.to_string(),
            Self::String(string) => string.clone(),
            Self::Path(path) => path.path().to_owned(),
        }
    }
}

impl fmt::Display for FieldData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// A candidate value offered to a setter, before coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(i32),
    LargeNumber(i64),
    String(String),
    Path(PathValue),
}

impl FieldValue {
    fn describe(&self) -> String {
        match self {
            Self::Null => "<null>".to_owned(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => value.to_string(),
            Self::LargeNumber(value) => value.to_string(),
            Self::String(value) => value.clone(),
            Self::Path(value) => value.path().to_owned(),
        }
    }

    /// The raw (uncoerced) stored form, used when a best-effort set fails.
    fn into_raw_data(self) -> Option<FieldData> {
        match self {
            Self::Null => None,
            Self::Bool(value) => Some(FieldData::Bool(value)),
            Self::Number(value) => Some(FieldData::Number(value)),
            Self::LargeNumber(value) => Some(FieldData::LargeNumber(value)),
            Self::String(value) => Some(FieldData::String(value)),
            Self::Path(value) => Some(FieldData::Path(value)),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::LargeNumber(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<PathValue> for FieldValue {
    fn from(value: PathValue) -> Self {
        Self::Path(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoercionError {
    #[error("cannot convert value '{value}' of field '{field}' to {target}")]
    Conversion {
        field: String,
        value: String,
        target: FieldType,
    },
}

/// Coerce `value` into the canonical representation for `definition`.
///
/// The matrix is deliberately asymmetric: a path is never synthesized from
/// a bare boolean, number, or string, while a path coerces into a string
/// field as its path component.
pub fn coerce(
    definition: &FieldDefinition,
    value: FieldValue,
) -> Result<Option<FieldData>, CoercionError> {
    let fail = |value: &FieldValue| CoercionError::Conversion {
        field: definition.name().to_owned(),
        value: value.describe(),
        target: definition.field_type(),
    };

    let data = match (definition.field_type(), value) {
        (_, FieldValue::Null) => return Ok(None),

        (FieldType::String, FieldValue::String(string)) => FieldData::String(string),
        (FieldType::String, FieldValue::Bool(value)) => {
            FieldData::String(if value { "true" } else { "false" }.to_owned())
        }
        (FieldType::String, FieldValue::Number(number)) => FieldData::String(number.to_string()),
        (FieldType::String, FieldValue::LargeNumber(number)) => {
            FieldData::String(number.to_string())
        }
        (FieldType::String, FieldValue::Path(path)) => FieldData::String(path.path().to_owned()),

        (FieldType::Bool, FieldValue::Bool(value)) => FieldData::Bool(value),
        (FieldType::Bool, FieldValue::String(string)) => {
            match string.to_ascii_lowercase().as_str() {
                "yes" | "true" => FieldData::Bool(true),
                "no" | "false" => FieldData::Bool(false),
                _ => return Err(fail(&FieldValue::String(string))),
            }
        }
        (FieldType::Bool, value) => return Err(fail(&value)),

        (FieldType::Number, FieldValue::Number(number)) => FieldData::Number(number),
        (FieldType::Number, FieldValue::Bool(value)) => FieldData::Number(i32::from(value)),
        (FieldType::Number, FieldValue::LargeNumber(number)) => match i32::try_from(number) {
            Ok(number) => FieldData::Number(number),
            Err(_) => return Err(fail(&FieldValue::LargeNumber(number))),
        },
        (FieldType::Number, FieldValue::String(string)) => match string.trim().parse() {
            Ok(number) => FieldData::Number(number),
            Err(_) => return Err(fail(&FieldValue::String(string))),
        },
        (FieldType::Number, value) => return Err(fail(&value)),

        (FieldType::LargeNumber, FieldValue::LargeNumber(number)) => FieldData::LargeNumber(number),
        (FieldType::LargeNumber, FieldValue::Number(number)) => {
            FieldData::LargeNumber(i64::from(number))
        }
        (FieldType::LargeNumber, FieldValue::Bool(value)) => {
            FieldData::LargeNumber(i64::from(value))
        }
        (FieldType::LargeNumber, FieldValue::String(string)) => match string.trim().parse() {
            Ok(number) => FieldData::LargeNumber(number),
            Err(_) => return Err(fail(&FieldValue::String(string))),
        },
        (FieldType::LargeNumber, value) => return Err(fail(&value)),

        (FieldType::Path, FieldValue::Path(path)) => FieldData::Path(path),
        (FieldType::Path, value) => return Err(fail(&value)),
    };

    Ok(Some(data))
}

/// One superseded value of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSnapshot {
    data: Option<FieldData>,
    context: Option<String>,
}

impl FieldSnapshot {
    pub fn data(&self) -> Option<&FieldData> {
        self.data.as_ref()
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

/// One typed value slot of a symbol or row.
///
/// The `history` vector is append-only, oldest snapshot first; the last
/// entry is the value this one replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    data: Option<FieldData>,
    modified: bool,
    context: Option<String>,
    history: Vec<FieldSnapshot>,
}

impl Field {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> Option<&FieldData> {
        self.data.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    pub fn modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn set_context(&mut self, context: Option<String>) {
        self.context = context;
    }

    /// The value this field held before its most recent write.
    pub fn previous_data(&self) -> Option<&FieldData> {
        self.history.last().and_then(FieldSnapshot::data)
    }

    pub fn history(&self) -> &[FieldSnapshot] {
        &self.history
    }

    /// Strictly coerce `value` and store it, recording the prior value.
    ///
    /// Writing null over a field that holds nothing of note (no value
    /// history, no provenance context) collapses to absent rather than
    /// recording a no-op history entry.
    pub fn set(
        &mut self,
        definition: &FieldDefinition,
        value: impl Into<FieldValue>,
    ) -> Result<(), CoercionError> {
        let data = coerce(definition, value.into())?;
        self.store(data);
        Ok(())
    }

    /// Coerce `value` like [`Field::set`], but on failure keep the raw,
    /// uncoerced value and report `false` instead of erroring.
    ///
    /// Used by repair and import tooling that must make forward progress
    /// over malformed data and record which fields provoked errors.
    pub fn set_best_effort(
        &mut self,
        definition: &FieldDefinition,
        value: impl Into<FieldValue>,
    ) -> bool {
        let value = value.into();
        match coerce(definition, value.clone()) {
            Ok(data) => {
                self.store(data);
                true
            }
            Err(_) => {
                self.store(value.into_raw_data());
                false
            }
        }
    }

    fn store(&mut self, data: Option<FieldData>) {
        let collapse = data.is_none()
            && self.data.is_none()
            && self.context.is_none()
            && self.history.is_empty();
        if !collapse {
            self.history.push(FieldSnapshot {
                data: self.data.take(),
                context: self.context.take(),
            });
        }
        self.data = data;
    }

    /// Restore a persisted previous value without disturbing the current
    /// one. Used by the XML reader.
    pub(crate) fn push_history(&mut self, data: Option<FieldData>, context: Option<String>) {
        self.history.push(FieldSnapshot { data, context });
    }

    /// Place a value directly, bypassing coercion. Only the deserializers
    /// use this, for data already validated against the column type.
    pub(crate) fn place(&mut self, data: Option<FieldData>) {
        self.data = data;
    }

    /// Two fields of the same column hold identical values when both are
    /// null or both hold equal canonical data.
    pub fn is_identical(&self, other: &Field) -> bool {
        self.data == other.data
    }

    /// String projection of the current value, or `None` when null.
    pub fn as_string(&self) -> Option<String> {
        self.data.as_ref().map(FieldData::as_string)
    }

    pub fn as_number(&self) -> Option<i32> {
        match self.data.as_ref()? {
            FieldData::Number(number) => Some(*number),
            FieldData::LargeNumber(number) => i32::try_from(*number).ok(),
            FieldData::Bool(value) => Some(i32::from(*value)),
            _ => None,
        }
    }

    pub fn as_large_number(&self) -> Option<i64> {
        match self.data.as_ref()? {
            FieldData::Number(number) => Some(i64::from(*number)),
            FieldData::LargeNumber(number) => Some(*number),
            FieldData::Bool(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.data.as_ref()? {
            FieldData::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&PathValue> {
        match self.data.as_ref()? {
            FieldData::Path(path) => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_column() -> FieldDefinition {
        FieldDefinition::new("Sequence", FieldType::Number)
    }

    fn bool_column() -> FieldDefinition {
        FieldDefinition::new("KeyPath", FieldType::Bool)
    }

    #[test]
    fn string_to_bool_is_case_insensitive() {
        let definition = bool_column();
        let mut field = Field::new();

        field.set(&definition, "Yes").unwrap();
        assert_eq!(field.as_bool(), Some(true));

        field.set(&definition, "FALSE").unwrap();
        assert_eq!(field.as_bool(), Some(false));

        let error = field.set(&definition, "maybe").unwrap_err();
        assert!(matches!(error, CoercionError::Conversion { .. }));
    }

    #[test]
    fn bool_to_number_stores_zero_or_one() {
        let definition = number_column();
        let mut field = Field::new();
        field.set(&definition, true).unwrap();
        assert_eq!(field.as_number(), Some(1));
        field.set(&definition, false).unwrap();
        assert_eq!(field.as_number(), Some(0));
    }

    #[test]
    fn number_to_string_stores_decimal_text() {
        let definition = FieldDefinition::new("Value", FieldType::String);
        let mut field = Field::new();
        field.set(&definition, -42).unwrap();
        assert_eq!(field.data(), Some(&FieldData::String("-42".to_owned())));
    }

    #[test]
    fn large_number_narrows_only_when_it_fits() {
        let definition = number_column();
        let mut field = Field::new();
        field.set(&definition, 1234i64).unwrap();
        assert_eq!(field.as_number(), Some(1234));
        assert!(field.set(&definition, i64::MAX).is_err());
    }

    #[test]
    fn path_is_never_synthesized() {
        let definition = FieldDefinition::new("Source", FieldType::Path);
        let mut field = Field::new();
        assert!(field.set(&definition, 7).is_err());
        assert!(field.set(&definition, "not-a-path-value").is_err());
        field
            .set(&definition, PathValue::new("payload.cab"))
            .unwrap();
        assert_eq!(field.as_path().unwrap().path(), "payload.cab");
    }

    #[test]
    fn path_coerces_into_string_column() {
        let definition = FieldDefinition::new("Name", FieldType::String);
        let mut field = Field::new();
        field
            .set(&definition, PathValue::embedded("a.cab", 0, "wixout://x"))
            .unwrap();
        assert_eq!(field.as_string().as_deref(), Some("a.cab"));
    }

    #[test]
    fn best_effort_keeps_raw_value_on_failure() {
        let definition = number_column();
        let mut field = Field::new();
        assert!(!field.set_best_effort(&definition, "not-a-number"));
        assert_eq!(
            field.data(),
            Some(&FieldData::String("not-a-number".to_owned()))
        );
        assert!(field.set_best_effort(&definition, "17"));
        assert_eq!(field.as_number(), Some(17));
    }

    #[test]
    fn writes_append_history() {
        let definition = number_column();
        let mut field = Field::new();
        field.set(&definition, 1).unwrap();
        field.set(&definition, 2).unwrap();
        field.set(&definition, 3).unwrap();

        assert_eq!(field.as_number(), Some(3));
        assert_eq!(field.previous_data(), Some(&FieldData::Number(2)));
        // Oldest snapshot is the initial absence.
        assert_eq!(field.history()[0].data(), None);
        assert_eq!(field.history().len(), 3);
    }

    #[test]
    fn null_over_pristine_field_collapses() {
        let definition = number_column();
        let mut field = Field::new();
        field.set(&definition, FieldValue::Null).unwrap();
        assert!(field.is_null());
        assert!(field.history().is_empty());

        // With provenance attached the history entry is kept.
        field.set_context(Some("transform-a".to_owned()));
        field.set(&definition, FieldValue::Null).unwrap();
        assert_eq!(field.history().len(), 1);
        assert_eq!(field.history()[0].context(), Some("transform-a"));
    }

    #[test]
    fn is_identical_compares_canonical_values() {
        let definition = number_column();
        let mut a = Field::new();
        let mut b = Field::new();
        assert!(a.is_identical(&b));

        a.set(&definition, 5).unwrap();
        assert!(!a.is_identical(&b));

        b.set(&definition, "5").unwrap();
        assert!(a.is_identical(&b));
    }
}
