//! Symbol instances: one typed record per definition.

use std::sync::Arc;

use crate::definition::{SymbolDefinition, SymbolShape};
use crate::field::{CoercionError, Field, FieldValue, PathValue};
use crate::identifier::Identifier;
use crate::source::SourceLineNumber;

/// One record instance of a [`SymbolDefinition`].
///
/// The field array always has exactly as many slots as the definition has
/// columns; index `i` in both always correspond. A symbol without an id is
/// anonymous and cannot be referenced by name.
#[derive(Debug, Clone)]
pub struct IntermediateSymbol {
    definition: Arc<SymbolDefinition>,
    fields: Vec<Field>,
    source: Option<SourceLineNumber>,
    id: Option<Identifier>,
}

impl IntermediateSymbol {
    pub fn new(definition: Arc<SymbolDefinition>) -> Self {
        let fields = vec![Field::new(); definition.field_definitions().len()];
        Self {
            definition,
            fields,
            source: None,
            id: None,
        }
    }

    pub fn with_id(definition: Arc<SymbolDefinition>, id: Identifier) -> Self {
        let mut symbol = Self::new(definition);
        symbol.id = Some(id);
        symbol
    }

    pub fn definition(&self) -> &Arc<SymbolDefinition> {
        &self.definition
    }

    pub fn id(&self) -> Option<&Identifier> {
        self.id.as_ref()
    }

    pub fn set_id(&mut self, id: Option<Identifier>) {
        self.id = id;
    }

    pub fn source(&self) -> Option<&SourceLineNumber> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: Option<SourceLineNumber>) {
        self.source = source;
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

    /// Field slot for the column named `name`, if the definition has one.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        let index = self.definition.field_index(name)?;
        Some(&self.fields[index])
    }

    /// Strictly set the field at `index`, coercing against its column type.
    pub fn set(&mut self, index: usize, value: impl Into<FieldValue>) -> Result<(), CoercionError> {
        let definition = self
            .definition
            .field_definition(index)
            .expect("field index within definition");
        self.fields[index].set(definition, value)
    }

    /// Leniently set the field at `index`; see [`Field::set_best_effort`].
    pub fn set_best_effort(&mut self, index: usize, value: impl Into<FieldValue>) -> bool {
        let definition = self
            .definition
            .field_definition(index)
            .expect("field index within definition");
        self.fields[index].set_best_effort(definition, value)
    }

    /// Typed accessor view, available when the definition resolved to a
    /// specialized shape.
    pub fn as_component(&self) -> Option<ComponentView<'_>> {
        (self.definition.shape() == SymbolShape::Component).then_some(ComponentView(self))
    }

    pub fn as_file(&self) -> Option<FileView<'_>> {
        (self.definition.shape() == SymbolShape::File).then_some(FileView(self))
    }

    pub fn as_property(&self) -> Option<PropertyView<'_>> {
        (self.definition.shape() == SymbolShape::Property).then_some(PropertyView(self))
    }

    pub fn as_control_event(&self) -> Option<ControlEventView<'_>> {
        (self.definition.shape() == SymbolShape::ControlEvent).then_some(ControlEventView(self))
    }
}

/// Typed view over a `Component` symbol.
pub struct ComponentView<'a>(&'a IntermediateSymbol);

impl ComponentView<'_> {
    pub fn component_id(&self) -> Option<String> {
        self.0.field(0).as_string()
    }

    pub fn directory(&self) -> Option<String> {
        self.0.field(1).as_string()
    }

    pub fn attributes(&self) -> Option<i32> {
        self.0.field(2).as_number()
    }

    pub fn condition(&self) -> Option<String> {
        self.0.field(3).as_string()
    }

    pub fn key_path(&self) -> Option<String> {
        self.0.field(4).as_string()
    }
}

/// Typed view over a `File` symbol.
pub struct FileView<'a>(&'a IntermediateSymbol);

impl FileView<'_> {
    pub fn component(&self) -> Option<String> {
        self.0.field(0).as_string()
    }

    pub fn name(&self) -> Option<String> {
        self.0.field(1).as_string()
    }

    pub fn file_size(&self) -> Option<i64> {
        self.0.field(2).as_large_number()
    }

    pub fn sequence(&self) -> Option<i32> {
        self.0.field(6).as_number()
    }

    pub fn source(&self) -> Option<&PathValue> {
        self.0.field(7).as_path()
    }
}

/// Typed view over a `Property` symbol.
pub struct PropertyView<'a>(&'a IntermediateSymbol);

impl PropertyView<'_> {
    pub fn value(&self) -> Option<String> {
        self.0.field(0).as_string()
    }
}

/// Typed view over a `ControlEvent` symbol.
pub struct ControlEventView<'a>(&'a IntermediateSymbol);

impl ControlEventView<'_> {
    pub fn event(&self) -> Option<String> {
        self.0.field(2).as_string()
    }

    pub fn argument(&self) -> Option<String> {
        self.0.field(3).as_string()
    }

    pub fn condition(&self) -> Option<String> {
        self.0.field(4).as_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::builtin_definition;

    #[test]
    fn fields_align_with_definition() {
        let definition = builtin_definition("Component").unwrap().clone();
        let symbol = IntermediateSymbol::new(definition.clone());
        assert_eq!(symbol.fields().len(), definition.field_definitions().len());
    }

    #[test]
    fn typed_view_reads_fields() {
        let definition = builtin_definition("Component").unwrap().clone();
        let mut symbol =
            IntermediateSymbol::with_id(definition, Identifier::global("MyComponent"));
        symbol.set(0, "{0A0B0C0D-0000-0000-0000-000000000001}").unwrap();
        symbol.set(1, "INSTALLDIR").unwrap();
        symbol.set(2, 4).unwrap();

        let view = symbol.as_component().unwrap();
        assert_eq!(view.directory().as_deref(), Some("INSTALLDIR"));
        assert_eq!(view.attributes(), Some(4));
        assert_eq!(view.key_path(), None);
        assert!(symbol.as_file().is_none());
    }

    #[test]
    fn field_by_name_resolves_column() {
        let definition = builtin_definition("Property").unwrap().clone();
        let mut symbol = IntermediateSymbol::new(definition);
        symbol.set(0, "1.0.0").unwrap();
        assert_eq!(
            symbol.field_by_name("Value").unwrap().as_string().as_deref(),
            Some("1.0.0")
        );
        assert!(symbol.field_by_name("Missing").is_none());
    }
}
