//! The legacy row/table projection over the symbol model.
//!
//! Symbols are the canonical representation; tables are built from them on
//! demand for the legacy XML vocabulary and IDT export. A
//! [`TableDefinition`] carries the per-column flags those paths need
//! (primary keys, modularization policy, IDT escaping) that symbol
//! definitions do not.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use itertools::Itertools;
use thiserror::Error;

use crate::field::{CoercionError, Field, FieldData, FieldDefinition, FieldType, FieldValue};
use crate::identifier::AccessModifier;
use crate::index::KeyedIndex;
use crate::modularize::ModularizeType;
use crate::section::IntermediateSection;
use crate::source::SourceLineNumber;

/// Table whose schema intentionally has no primary key.
pub const BOOTSTRAPPER_APPLICATION_DATA_TABLE: &str = "BootstrapperApplicationData";

/// Storage class of a legacy column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Number,
    String,
    Localized,
    Object,
    Preserved,
}

impl ColumnType {
    /// Letter used in the IDT column-type header line.
    fn idt_letter(self) -> char {
        match self {
            Self::Number => 'i',
            Self::String => 's',
            Self::Localized => 'l',
            Self::Object => 'v',
            Self::Preserved => 's',
        }
    }
}

/// Static schema of one legacy column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    name: String,
    column_type: ColumnType,
    length: usize,
    primary_key: bool,
    nullable: bool,
    min_value: Option<i64>,
    max_value: Option<i64>,
    modularize: ModularizeType,
    added: bool,
    use_cdata: bool,
    escape_idt: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType, length: usize) -> Self {
        Self {
            name: name.into(),
            column_type,
            length,
            primary_key: false,
            nullable: false,
            min_value: None,
            max_value: None,
            modularize: ModularizeType::None,
            added: false,
            use_cdata: false,
            escape_idt: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn modularize(mut self, modularize: ModularizeType) -> Self {
        self.modularize = modularize;
        self
    }

    /// Mark a column introduced by a transform; added columns are always a
    /// trailing suffix of the column list.
    pub fn added(mut self) -> Self {
        self.added = true;
        self
    }

    pub fn use_cdata(mut self) -> Self {
        self.use_cdata = true;
        self
    }

    pub fn escape_idt(mut self) -> Self {
        self.escape_idt = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_added(&self) -> bool {
        self.added
    }

    pub fn uses_cdata(&self) -> bool {
        self.use_cdata
    }

    pub fn escapes_idt(&self) -> bool {
        self.escape_idt
    }

    pub fn modularize_type(&self) -> ModularizeType {
        self.modularize
    }

    /// The field type values of this column coerce against.
    pub fn field_type(&self) -> FieldType {
        match self.column_type {
            ColumnType::Number if self.length > 4 => FieldType::LargeNumber,
            ColumnType::Number => FieldType::Number,
            ColumnType::Object => FieldType::Path,
            _ => FieldType::String,
        }
    }

    pub(crate) fn field_definition(&self) -> FieldDefinition {
        FieldDefinition::new(self.name.clone(), self.field_type())
    }

    /// IDT type/width code, for example `s72` or `I2`; uppercase means
    /// nullable.
    pub fn idt_type_code(&self) -> String {
        let letter = self.column_type.idt_letter();
        let letter = if self.nullable {
            letter.to_ascii_uppercase()
        } else {
            letter
        };
        format!("{}{}", letter, self.length)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableDefinitionError {
    #[error("table '{table}' must declare at least one primary-key column")]
    NoPrimaryKey { table: String },
    #[error(
        "table '{table}': primary-key column '{column}' must be part of a \
         leading contiguous block"
    )]
    NonContiguousPrimaryKey { table: String, column: String },
    #[error("table '{table}': added column '{column}' must trail the original columns")]
    NonTrailingAddedColumn { table: String, column: String },
}

/// Static schema of a legacy table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    name: String,
    columns: Vec<ColumnDefinition>,
    unreal: bool,
    symbol_definition_name: Option<String>,
}

impl TableDefinition {
    /// Validates two contiguity invariants at construction: primary-key
    /// columns are a leading block (a misordered schema would otherwise
    /// silently truncate every key), and transform-added columns are a
    /// trailing block. A real table other than the
    /// bootstrapper-application-data table must have a primary key.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<ColumnDefinition>,
        unreal: bool,
    ) -> Result<Self, TableDefinitionError> {
        let name = name.into();

        if !unreal && name != BOOTSTRAPPER_APPLICATION_DATA_TABLE {
            if !columns.iter().any(ColumnDefinition::is_primary_key) {
                return Err(TableDefinitionError::NoPrimaryKey { table: name });
            }
        }

        let mut seen_non_key = false;
        let mut seen_added = false;
        for column in &columns {
            if column.is_primary_key() {
                if seen_non_key {
                    return Err(TableDefinitionError::NonContiguousPrimaryKey {
                        table: name,
                        column: column.name().to_owned(),
                    });
                }
            } else {
                seen_non_key = true;
            }

            if column.is_added() {
                seen_added = true;
            } else if seen_added {
                return Err(TableDefinitionError::NonTrailingAddedColumn {
                    table: name,
                    column: column.name().to_owned(),
                });
            }
        }

        Ok(Self {
            name,
            columns,
            unreal,
            symbol_definition_name: None,
        })
    }

    /// Associate the symbol definition this table projects.
    pub fn with_symbol_definition(mut self, name: impl Into<String>) -> Self {
        self.symbol_definition_name = Some(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnDefinition> {
        self.columns.get(index)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }

    /// Schema-only tables are never persisted or validated as real.
    pub fn is_unreal(&self) -> bool {
        self.unreal
    }

    pub fn symbol_definition_name(&self) -> Option<&str> {
        self.symbol_definition_name.as_deref()
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns
            .iter()
            .take_while(|column| column.is_primary_key())
    }
}

/// Provenance of a row in transform-diff semantics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RowOperation {
    #[default]
    None,
    Add,
    Modify,
    Delete,
}

impl RowOperation {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Add => "add",
            Self::Modify => "modify",
            Self::Delete => "delete",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "none" => Some(Self::None),
            "add" => Some(Self::Add),
            "modify" => Some(Self::Modify),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for RowOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error("value {value} of column '{column}' is outside the range {min}..={max}")]
    OutOfRange {
        column: String,
        value: i64,
        min: i64,
        max: i64,
    },
}

static ROW_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One record of a legacy table.
#[derive(Debug, Clone)]
pub struct Row {
    number: u64,
    definition: Arc<TableDefinition>,
    fields: Vec<Field>,
    access: AccessModifier,
    operation: RowOperation,
    redundant: bool,
    section_id: Option<String>,
    source: Option<SourceLineNumber>,
}

impl Row {
    pub fn new(definition: Arc<TableDefinition>, source: Option<SourceLineNumber>) -> Self {
        let fields = vec![Field::new(); definition.columns().len()];
        Self {
            number: ROW_COUNTER.fetch_add(1, Ordering::Relaxed),
            definition,
            fields,
            access: AccessModifier::Global,
            operation: RowOperation::None,
            redundant: false,
            section_id: None,
            source,
        }
    }

    /// Process-wide monotonic row number; unique across all tables.
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn definition(&self) -> &Arc<TableDefinition> {
        &self.definition
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> &Field {
        &self.fields[index]
    }

    pub fn field_mut(&mut self, index: usize) -> &mut Field {
        &mut self.fields[index]
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    pub fn access(&self) -> AccessModifier {
        self.access
    }

    pub fn set_access(&mut self, access: AccessModifier) {
        self.access = access;
    }

    pub fn operation(&self) -> RowOperation {
        self.operation
    }

    pub fn set_operation(&mut self, operation: RowOperation) {
        self.operation = operation;
    }

    pub fn is_redundant(&self) -> bool {
        self.redundant
    }

    pub fn set_redundant(&mut self, redundant: bool) {
        self.redundant = redundant;
    }

    pub fn section_id(&self) -> Option<&str> {
        self.section_id.as_deref()
    }

    pub fn set_section_id(&mut self, section_id: Option<String>) {
        self.section_id = section_id;
    }

    pub fn source(&self) -> Option<&SourceLineNumber> {
        self.source.as_ref()
    }

    /// Strictly set the field at `index`, coercing against the column type
    /// and enforcing the column's declared value range.
    pub fn set_field(&mut self, index: usize, value: impl Into<FieldValue>) -> Result<(), RowError> {
        let column = self
            .definition
            .column(index)
            .expect("column index within table definition");
        let field_definition = column.field_definition();
        self.fields[index].set(&field_definition, value)?;

        if let (Some(min), Some(max)) = (column.min_value, column.max_value) {
            if let Some(value) = self.fields[index].as_large_number() {
                if value < min || value > max {
                    return Err(RowError::OutOfRange {
                        column: column.name().to_owned(),
                        value,
                        min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }

    /// Leniently set the field at `index`; see [`Field::set_best_effort`].
    pub fn set_field_best_effort(&mut self, index: usize, value: impl Into<FieldValue>) -> bool {
        let column = self
            .definition
            .column(index)
            .expect("column index within table definition");
        let field_definition = column.field_definition();
        self.fields[index].set_best_effort(&field_definition, value)
    }

    /// Concatenate the string forms of the leading primary-key columns.
    ///
    /// Walks from index 0 and stops at the first non-key column; a null
    /// key field contributes an empty segment. `None` when the schema has
    /// no primary key.
    pub fn get_primary_key(&self, delimiter: char) -> Option<String> {
        let key_count = self.definition.primary_key_columns().count();
        if key_count == 0 {
            return None;
        }
        Some(
            self.fields[..key_count]
                .iter()
                .map(|field| field.as_string().unwrap_or_default())
                .join(&delimiter.to_string()),
        )
    }

    /// Primary key with the canonical `/` delimiter.
    pub fn get_key(&self) -> Option<String> {
        self.get_primary_key('/')
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error(
    "duplicate primary key '{key}' in table '{table}'; first occurrence was at \
     {first_location:?}"
)]
pub struct DuplicateRowError {
    pub table: String,
    pub key: String,
    pub first_location: Option<String>,
    pub duplicate_location: Option<String>,
}

/// An ordered collection of rows sharing one table definition.
#[derive(Debug, Clone)]
pub struct Table {
    definition: Arc<TableDefinition>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(definition: Arc<TableDefinition>) -> Self {
        Self {
            definition,
            rows: Vec::new(),
        }
    }

    pub fn definition(&self) -> &Arc<TableDefinition> {
        &self.definition
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    /// Create a row in this table and return it for population.
    pub fn create_row(&mut self, source: Option<SourceLineNumber>) -> &mut Row {
        self.rows.push(Row::new(self.definition.clone(), source));
        self.rows.last_mut().expect("row just pushed")
    }

    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Check for duplicate primary keys across all rows.
    ///
    /// Builds a fresh key map on every call; the error carries the source
    /// location of the first occurrence as well as the duplicate's.
    pub fn validate_rows(&self) -> Result<(), DuplicateRowError> {
        let mut seen: KeyedIndex<Option<String>> = KeyedIndex::new();
        for row in &self.rows {
            let Some(key) = row.get_key() else { continue };
            let location = row.source().map(SourceLineNumber::encoded);
            if let Some(first_location) = seen.get(&key) {
                return Err(DuplicateRowError {
                    table: self.definition.name().to_owned(),
                    key,
                    first_location: first_location.clone(),
                    duplicate_location: location,
                });
            }
            seen.insert(key, location)
                .expect("key checked for presence above");
        }
        Ok(())
    }

    /// Project the symbols of `section` matching this table's definition
    /// into rows.
    ///
    /// When the table has exactly one more column than the symbol
    /// definition has fields, the symbol's id fills the first column (the
    /// id-as-first-column convention of most installer tables); otherwise
    /// fields are copied index-aligned.
    pub fn from_symbols(
        definition: Arc<TableDefinition>,
        section: &IntermediateSection,
    ) -> Table {
        let symbol_name = definition
            .symbol_definition_name()
            .unwrap_or_else(|| definition.name())
            .to_owned();

        let mut table = Table::new(definition);
        for symbol in section.symbols() {
            if symbol.definition().name() != symbol_name {
                continue;
            }

            let row = table.create_row(symbol.source().cloned());
            row.set_section_id(section.id().map(str::to_owned));

            let id_column = row.definition().columns().len() == symbol.fields().len() + 1;
            let offset = usize::from(id_column);
            if id_column {
                if let Some(id) = symbol.id() {
                    row.set_access(id.access());
                    row.fields[0].place(id.id().map(|id| FieldData::String(id.to_owned())));
                }
            }
            for (index, field) in symbol.fields().iter().enumerate() {
                row.fields[index + offset].place(field.data().cloned());
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::builtin_definition;
    use crate::identifier::Identifier;
    use crate::symbol::IntermediateSymbol;

    fn registry_table() -> Arc<TableDefinition> {
        Arc::new(
            TableDefinition::new(
                "Registry",
                vec![
                    ColumnDefinition::new("Registry", ColumnType::String, 72).primary_key(),
                    ColumnDefinition::new("Root", ColumnType::Number, 2).range(-1, 3),
                    ColumnDefinition::new("Key", ColumnType::Localized, 255),
                    ColumnDefinition::new("Value", ColumnType::Localized, 0).nullable(),
                ],
                false,
            )
            .unwrap(),
        )
    }

    #[test]
    fn real_tables_need_a_primary_key() {
        let error = TableDefinition::new(
            "Broken",
            vec![ColumnDefinition::new("Value", ColumnType::String, 0)],
            false,
        )
        .unwrap_err();
        assert!(matches!(error, TableDefinitionError::NoPrimaryKey { .. }));

        // Unreal tables and the bootstrapper-application-data table are
        // exempt.
        assert!(TableDefinition::new(
            "Schema",
            vec![ColumnDefinition::new("Value", ColumnType::String, 0)],
            true,
        )
        .is_ok());
        assert!(TableDefinition::new(
            BOOTSTRAPPER_APPLICATION_DATA_TABLE,
            vec![ColumnDefinition::new("Value", ColumnType::String, 0)],
            false,
        )
        .is_ok());
    }

    #[test]
    fn primary_keys_must_lead_contiguously() {
        let error = TableDefinition::new(
            "Broken",
            vec![
                ColumnDefinition::new("A", ColumnType::String, 72).primary_key(),
                ColumnDefinition::new("B", ColumnType::String, 72),
                ColumnDefinition::new("C", ColumnType::String, 72).primary_key(),
            ],
            false,
        )
        .unwrap_err();
        assert_eq!(
            error,
            TableDefinitionError::NonContiguousPrimaryKey {
                table: "Broken".to_owned(),
                column: "C".to_owned(),
            }
        );
    }

    #[test]
    fn added_columns_must_trail() {
        let error = TableDefinition::new(
            "Broken",
            vec![
                ColumnDefinition::new("A", ColumnType::String, 72).primary_key(),
                ColumnDefinition::new("B", ColumnType::String, 72).added(),
                ColumnDefinition::new("C", ColumnType::String, 72),
            ],
            false,
        )
        .unwrap_err();
        assert!(matches!(
            error,
            TableDefinitionError::NonTrailingAddedColumn { .. }
        ));
    }

    #[test]
    fn primary_key_ignores_trailing_nulls() {
        let definition = registry_table();
        let mut with_nulls = Row::new(definition.clone(), None);
        with_nulls.set_field(0, "reg1").unwrap();

        let mut with_values = Row::new(definition, None);
        with_values.set_field(0, "reg1").unwrap();
        with_values.set_field(1, 2).unwrap();
        with_values.set_field(2, "Software\\Example").unwrap();

        // Same key regardless of how many non-key columns are populated.
        assert_eq!(with_nulls.get_key(), with_values.get_key());
        assert_eq!(with_nulls.get_key().as_deref(), Some("reg1"));
    }

    #[test]
    fn validate_rows_reports_key_collisions() {
        let definition = registry_table();
        let mut table = Table::new(definition);

        let row = table.create_row(Some(SourceLineNumber::new_with_line("a.wxs", 1)));
        row.set_field(0, "reg1").unwrap();
        row.set_field(1, 1).unwrap();

        // Identical key columns, different non-key values: collides by
        // design.
        let row = table.create_row(Some(SourceLineNumber::new_with_line("b.wxs", 9)));
        row.set_field(0, "reg1").unwrap();
        row.set_field(1, 3).unwrap();

        let error = table.validate_rows().unwrap_err();
        assert_eq!(error.key, "reg1");
        assert_eq!(error.first_location.as_deref(), Some("a.wxs*1"));
        assert_eq!(error.duplicate_location.as_deref(), Some("b.wxs*9"));
    }

    #[test]
    fn range_validation_rejects_out_of_range_numbers() {
        let definition = registry_table();
        let mut row = Row::new(definition, None);
        row.set_field(1, 3).unwrap();
        let error = row.set_field(1, 12).unwrap_err();
        assert!(matches!(error, RowError::OutOfRange { .. }));
    }

    #[test]
    fn idt_type_codes() {
        let column = ColumnDefinition::new("Key", ColumnType::String, 72);
        assert_eq!(column.idt_type_code(), "s72");
        let column = ColumnDefinition::new("Value", ColumnType::Localized, 0).nullable();
        assert_eq!(column.idt_type_code(), "L0");
        let column = ColumnDefinition::new("Sequence", ColumnType::Number, 2);
        assert_eq!(column.idt_type_code(), "i2");
    }

    #[test]
    fn projection_fills_id_column_from_symbol_id() {
        let property_table = Arc::new(
            TableDefinition::new(
                "Property",
                vec![
                    ColumnDefinition::new("Property", ColumnType::String, 72).primary_key(),
                    ColumnDefinition::new("Value", ColumnType::Localized, 0),
                ],
                false,
            )
            .unwrap(),
        );

        let mut section = crate::section::IntermediateSection::fragment(1252);
        let definition = builtin_definition("Property").unwrap().clone();
        let mut symbol =
            IntermediateSymbol::with_id(definition, Identifier::global("ProductVersion"));
        symbol.set(0, "1.2.3").unwrap();
        section.add_symbol(symbol);

        let table = Table::from_symbols(property_table, &section);
        assert_eq!(table.rows().len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.get_key().as_deref(), Some("ProductVersion"));
        assert_eq!(row.field(1).as_string().as_deref(), Some("1.2.3"));
    }

    #[test]
    fn row_numbers_are_unique_and_monotonic() {
        let definition = registry_table();
        let a = Row::new(definition.clone(), None);
        let b = Row::new(definition, None);
        assert!(a.number() < b.number());
    }
}
