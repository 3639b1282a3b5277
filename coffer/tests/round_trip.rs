//! Serialization round-trips through the XML vocabulary.

use std::sync::Arc;

use coffer::definition::{DefinitionRegistry, SymbolDefinition};
use coffer::field::{FieldDefinition, FieldType, PathValue};
use coffer::identifier::{AccessModifier, Identifier};
use coffer::persist::{read, write};
use coffer::section::{Intermediate, IntermediateSection, SectionType};
use coffer::source::SourceLineNumber;
use coffer::symbol::IntermediateSymbol;
use coffer::table::{ColumnDefinition, ColumnType, RowOperation, Table, TableDefinition};

fn sample_intermediate(registry: &DefinitionRegistry) -> Intermediate {
    let mut section =
        IntermediateSection::new(Some("Product1".to_owned()), SectionType::Product, 1252)
            .unwrap();

    let component = registry.try_get("Component").unwrap();
    let mut symbol = IntermediateSymbol::with_id(
        component,
        Identifier::new(AccessModifier::Section, "MainComponent"),
    );
    symbol.set(0, "{11111111-2222-3333-4444-555555555555}").unwrap();
    symbol.set(1, "INSTALLDIR").unwrap();
    symbol.set(2, 4).unwrap();
    symbol.set_source(Some(
        SourceLineNumber::new_with_line("component.wxs", 12)
            .with_parent(SourceLineNumber::new_with_line("product.wxs", 3)),
    ));
    section.add_symbol(symbol);

    let property = registry.try_get("Property").unwrap();
    let mut symbol =
        IntermediateSymbol::with_id(property, Identifier::global("ProductVersion"));
    symbol.set(0, "1.0.0").unwrap();
    section.add_symbol(symbol);

    let mut intermediate = Intermediate::new();
    intermediate.add_section(section);
    intermediate.add_section(IntermediateSection::fragment(1252));
    intermediate
}

#[test]
fn object_document_round_trips() {
    let registry = DefinitionRegistry::new();
    let original = sample_intermediate(&registry);

    let mut document = Vec::new();
    write::write_object(&mut document, &original).unwrap();
    let loaded = read::read_object(document.as_slice(), &registry, false).unwrap();

    assert_eq!(loaded.id(), original.id());
    assert_eq!(loaded.sections().len(), 2);

    let section = &loaded.sections()[0];
    assert_eq!(section.id(), Some("Product1"));
    assert_eq!(section.section_type(), SectionType::Product);
    assert_eq!(section.codepage(), 1252);
    assert_eq!(section.intermediate_id(), Some(loaded.id()));

    let component = &section.symbols()[0];
    let id = component.id().unwrap();
    assert_eq!(id.id(), Some("MainComponent"));
    assert_eq!(id.access(), AccessModifier::Section);
    assert_eq!(
        component.source().unwrap().encoded(),
        "component.wxs*12|product.wxs*3"
    );
    assert_eq!(
        component.field(0).as_string().as_deref(),
        Some("{11111111-2222-3333-4444-555555555555}")
    );
    assert_eq!(component.field(2).as_number(), Some(4));
    assert!(component.field(3).is_null());

    let property = &section.symbols()[1];
    assert_eq!(property.id().unwrap().access(), AccessModifier::Global);
    assert_eq!(property.field(0).as_string().as_deref(), Some("1.0.0"));

    let fragment = &loaded.sections()[1];
    assert_eq!(fragment.id(), None);
    assert_eq!(fragment.section_type(), SectionType::Fragment);
}

#[test]
fn every_field_type_round_trips() {
    let mut registry = DefinitionRegistry::new();
    registry.register(SymbolDefinition::new(
        "Payload",
        0,
        vec![
            FieldDefinition::new("Name", FieldType::String),
            FieldDefinition::new("Compressed", FieldType::Bool),
            FieldDefinition::new("Sequence", FieldType::Number),
            FieldDefinition::new("FileSize", FieldType::LargeNumber),
            FieldDefinition::new("Source", FieldType::Path),
        ],
    ));
    let payload = registry.try_get("Payload").unwrap();

    let mut section = IntermediateSection::fragment(1252);
    let mut symbol = IntermediateSymbol::with_id(payload, Identifier::global("readme.txt"));
    symbol.set(0, "readme.txt").unwrap();
    symbol.set(1, true).unwrap();
    symbol.set(2, 7).unwrap();
    symbol.set(3, 5_000_000_000_i64).unwrap();
    symbol
        .set(
            4,
            PathValue::embedded("readme.txt", 2, "file:///build/product.wixout"),
        )
        .unwrap();
    section.add_symbol(symbol);

    // A plain path next to the embedded one: no extra attributes on the
    // wire, and none reconstructed.
    let icon = registry.try_get("Icon").unwrap();
    let mut symbol = IntermediateSymbol::with_id(icon, Identifier::global("AppIcon"));
    symbol.set(0, PathValue::new("assets/app.ico")).unwrap();
    section.add_symbol(symbol);

    let mut intermediate = Intermediate::new();
    intermediate.add_section(section);

    let mut document = Vec::new();
    write::write_object(&mut document, &intermediate).unwrap();
    let loaded = read::read_object(document.as_slice(), &registry, false).unwrap();

    let symbol = &loaded.sections()[0].symbols()[0];
    assert_eq!(symbol.field(0).as_string().as_deref(), Some("readme.txt"));
    assert_eq!(symbol.field(1).as_bool(), Some(true));
    assert_eq!(symbol.field(2).as_number(), Some(7));
    assert_eq!(symbol.field(3).as_large_number(), Some(5_000_000_000));
    let source = symbol.field(4).as_path().unwrap();
    assert_eq!(source.path(), "readme.txt");
    assert_eq!(source.embedded_file_index(), Some(2));
    assert_eq!(source.base_uri(), Some("file:///build/product.wixout"));

    let data = loaded.sections()[0].symbols()[1].field(0).as_path().unwrap();
    assert_eq!(data.path(), "assets/app.ico");
    assert_eq!(data.embedded_file_index(), None);
    assert_eq!(data.base_uri(), None);
}

#[test]
fn library_document_round_trips() {
    let registry = DefinitionRegistry::new();
    let a = sample_intermediate(&registry);
    let b = sample_intermediate(&registry);

    let mut document = Vec::new();
    write::write_library(&mut document, &[a.clone(), b.clone()]).unwrap();
    let loaded = read::read_library(document.as_slice(), &registry, false).unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id(), a.id());
    assert_eq!(loaded[1].id(), b.id());
    assert_eq!(loaded[1].sections().len(), 2);
}

fn action_table() -> Arc<TableDefinition> {
    Arc::new(
        TableDefinition::new(
            "CustomAction",
            vec![
                ColumnDefinition::new("Action", ColumnType::String, 72).primary_key(),
                ColumnDefinition::new("Type", ColumnType::Number, 2),
                ColumnDefinition::new("Target", ColumnType::Preserved, 0)
                    .nullable()
                    .use_cdata(),
            ],
            false,
        )
        .unwrap(),
    )
}

#[test]
fn output_tables_round_trip() {
    let definition = action_table();
    let mut table = Table::new(definition.clone());

    let row = table.create_row(Some(SourceLineNumber::new_with_line("actions.wxs", 8)));
    row.set_field(0, "LaunchReadme").unwrap();
    row.set_field(1, 34).unwrap();
    row.set_field(2, "<script>if (a && b) run();</script>").unwrap();
    row.set_operation(RowOperation::Add);
    row.set_section_id(Some("Product1".to_owned()));

    let row = table.create_row(None);
    row.set_field(0, "Obsolete").unwrap();
    row.set_field(1, 1).unwrap();
    row.set_redundant(true);

    let mut document = Vec::new();
    write::write_tables(&mut document, &[table]).unwrap();

    let resolve = {
        let definition = definition.clone();
        move |name: &str| (name == "CustomAction").then(|| definition.clone())
    };
    let loaded = read::read_tables(document.as_slice(), resolve, false).unwrap();

    assert_eq!(loaded.len(), 1);
    let table = &loaded[0];
    assert_eq!(table.rows().len(), 2);

    let row = &table.rows()[0];
    assert_eq!(row.get_key().as_deref(), Some("LaunchReadme"));
    assert_eq!(row.field(1).as_number(), Some(34));
    // The CDATA column survives with its markup intact.
    assert_eq!(
        row.field(2).as_string().as_deref(),
        Some("<script>if (a && b) run();</script>")
    );
    assert_eq!(row.operation(), RowOperation::Add);
    assert_eq!(row.section_id(), Some("Product1"));
    assert_eq!(row.source().unwrap().encoded(), "actions.wxs*8");

    let row = &table.rows()[1];
    assert!(row.is_redundant());
    assert_eq!(row.operation(), RowOperation::None);
}

#[test]
fn modified_fields_and_previous_values_round_trip() {
    let registry = DefinitionRegistry::new();
    let property = registry.try_get("Property").unwrap();

    let mut section = IntermediateSection::fragment(1252);
    let mut symbol =
        IntermediateSymbol::with_id(property, Identifier::global("ProductVersion"));
    symbol.set(0, "1.0.0").unwrap();
    symbol.set(0, "2.0.0").unwrap();
    symbol.field_mut(0).set_modified(true);
    section.add_symbol(symbol);

    let mut intermediate = Intermediate::new();
    intermediate.add_section(section);

    let mut document = Vec::new();
    write::write_object(&mut document, &intermediate).unwrap();
    let text = String::from_utf8(document.clone()).unwrap();
    assert!(text.contains(r#"modified="yes""#));
    assert!(text.contains(r#"previousData="1.0.0""#));

    let loaded = read::read_object(document.as_slice(), &registry, false).unwrap();
    let field = loaded.sections()[0].symbols()[0].field(0);
    assert_eq!(field.as_string().as_deref(), Some("2.0.0"));
    assert!(field.modified());
    assert_eq!(
        field.previous_data().map(|data| data.as_string()),
        Some("1.0.0".to_owned())
    );
}
