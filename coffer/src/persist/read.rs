//! Event-based XML readers for object, library and output documents.
//!
//! Structural violations (an unexpected element, a missing required
//! attribute, an unparseable value) abort the document load; there is no
//! recovery once a document's shape is wrong.

use std::io::BufRead;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::definition::DefinitionRegistry;
use crate::field::{Field, FieldData, FieldType, PathValue};
use crate::identifier::{AccessModifier, Identifier};
use crate::section::{Intermediate, IntermediateSection, SectionType};
use crate::source::SourceLineNumber;
use crate::symbol::IntermediateSymbol;
use crate::table::{Row, RowOperation, Table, TableDefinition};

use super::{XmlError, CURRENT_VERSION, LIBRARY_NAMESPACE, OBJECT_NAMESPACE};

/// Read an object document into an [`Intermediate`], resolving symbol
/// definitions through `registry`.
pub fn read_object<R: BufRead>(
    input: R,
    registry: &DefinitionRegistry,
    suppress_version_check: bool,
) -> Result<Intermediate, XmlError> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let root = read_root(&mut reader, "wixObject", OBJECT_NAMESPACE, suppress_version_check)?;
    let id = root.id.ok_or(XmlError::MissingAttribute {
        element: "wixObject",
        attribute: "id",
    })?;

    let mut intermediate = Intermediate::with_id(id);
    if !root.empty {
        read_sections_into(&mut reader, registry, &mut intermediate, b"wixObject")?;
    }
    Ok(intermediate)
}

/// Read a library document into its collection of intermediates.
pub fn read_library<R: BufRead>(
    input: R,
    registry: &DefinitionRegistry,
    suppress_version_check: bool,
) -> Result<Vec<Intermediate>, XmlError> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let root = read_root(&mut reader, "wixLibrary", LIBRARY_NAMESPACE, suppress_version_check)?;

    let mut intermediates = Vec::new();
    if root.empty {
        return Ok(intermediates);
    }
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) if element.name().as_ref() == b"wixObject" => {
                let id = attr_value(&element, b"id")?.ok_or(XmlError::MissingAttribute {
                    element: "wixObject",
                    attribute: "id",
                })?;
                let mut intermediate = Intermediate::with_id(id);
                read_sections_into(&mut reader, registry, &mut intermediate, b"wixObject")?;
                intermediates.push(intermediate);
            }
            Event::Empty(element) if element.name().as_ref() == b"wixObject" => {
                let id = attr_value(&element, b"id")?.ok_or(XmlError::MissingAttribute {
                    element: "wixObject",
                    attribute: "id",
                })?;
                intermediates.push(Intermediate::with_id(id));
            }
            Event::End(element) if element.name().as_ref() == b"wixLibrary" => break,
            Event::Eof => return Err(unexpected_eof(&reader)),
            event => return Err(unexpected(&reader, &event)),
        }
    }
    Ok(intermediates)
}

/// Read an output document's legacy tables, resolving table definitions
/// through `resolve`.
pub fn read_tables<R, F>(
    input: R,
    resolve: F,
    suppress_version_check: bool,
) -> Result<Vec<Table>, XmlError>
where
    R: BufRead,
    F: Fn(&str) -> Option<Arc<TableDefinition>>,
{
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let root = read_root(&mut reader, "wixOutput", OBJECT_NAMESPACE, suppress_version_check)?;

    let mut tables = Vec::new();
    if root.empty {
        return Ok(tables);
    }
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) if element.name().as_ref() == b"table" => {
                let name = attr_value(&element, b"name")?.ok_or(XmlError::MissingAttribute {
                    element: "table",
                    attribute: "name",
                })?;
                let definition =
                    resolve(&name).ok_or(XmlError::UnknownTable { name })?;
                tables.push(read_table_rows(&mut reader, definition)?);
            }
            Event::Empty(element) if element.name().as_ref() == b"table" => {
                let name = attr_value(&element, b"name")?.ok_or(XmlError::MissingAttribute {
                    element: "table",
                    attribute: "name",
                })?;
                let definition =
                    resolve(&name).ok_or(XmlError::UnknownTable { name })?;
                tables.push(Table::new(definition));
            }
            Event::End(element) if element.name().as_ref() == b"wixOutput" => break,
            Event::Eof => return Err(unexpected_eof(&reader)),
            event => return Err(unexpected(&reader, &event)),
        }
    }
    Ok(tables)
}

struct RootAttributes {
    id: Option<String>,
    /// The root element was self-closing; the document has no body.
    empty: bool,
}

/// Skip the prolog, then require the expected root element, namespace and
/// version.
fn read_root<R: BufRead>(
    reader: &mut Reader<R>,
    name: &str,
    namespace: &'static str,
    suppress_version_check: bool,
) -> Result<RootAttributes, XmlError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
            event @ (Event::Start(_) | Event::Empty(_)) => {
                let empty = matches!(event, Event::Empty(_));
                let element = match event {
                    Event::Start(element) | Event::Empty(element) => element,
                    _ => unreachable!(),
                };
                if element.name().as_ref() != name.as_bytes() {
                    return Err(unexpected_name(reader, &element));
                }

                let xmlns = attr_value(&element, b"xmlns")?.unwrap_or_default();
                if xmlns != namespace {
                    return Err(XmlError::WrongNamespace {
                        expected: namespace,
                        actual: xmlns,
                    });
                }

                let version = attr_value(&element, b"version")?;
                match version {
                    Some(version) if version == CURRENT_VERSION => {}
                    Some(_) if suppress_version_check => {}
                    Some(version) => {
                        return Err(XmlError::VersionMismatch {
                            expected: CURRENT_VERSION,
                            actual: version,
                        });
                    }
                    None => {
                        return Err(XmlError::MissingAttribute {
                            element: "document root",
                            attribute: "version",
                        });
                    }
                }

                return Ok(RootAttributes {
                    id: attr_value(&element, b"id")?,
                    empty,
                });
            }
            Event::Eof => return Err(unexpected_eof(reader)),
            event => return Err(unexpected(reader, &event)),
        }
    }
}

/// Read `section` children into `intermediate` until the end tag named
/// `end` closes.
fn read_sections_into<R: BufRead>(
    reader: &mut Reader<R>,
    registry: &DefinitionRegistry,
    intermediate: &mut Intermediate,
    end: &[u8],
) -> Result<(), XmlError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) if element.name().as_ref() == b"section" => {
                let mut section = section_from_attributes(&element)?;
                read_symbols_into(reader, registry, &mut section)?;
                intermediate.add_section(section);
            }
            Event::Empty(element) if element.name().as_ref() == b"section" => {
                intermediate.add_section(section_from_attributes(&element)?);
            }
            Event::End(element) if element.name().as_ref() == end => return Ok(()),
            Event::Eof => return Err(unexpected_eof(reader)),
            event => return Err(unexpected(reader, &event)),
        }
    }
}

fn section_from_attributes(element: &BytesStart<'_>) -> Result<IntermediateSection, XmlError> {
    let id = attr_value(element, b"id")?;

    let type_keyword = attr_value(element, b"type")?.ok_or(XmlError::MissingAttribute {
        element: "section",
        attribute: "type",
    })?;
    let section_type =
        SectionType::from_keyword(&type_keyword).ok_or(XmlError::InvalidValue {
            what: "section type",
            value: type_keyword,
        })?;

    let codepage_text = attr_value(element, b"codepage")?.ok_or(XmlError::MissingAttribute {
        element: "section",
        attribute: "codepage",
    })?;
    let codepage = codepage_text.parse().map_err(|_| XmlError::InvalidValue {
        what: "codepage",
        value: codepage_text,
    })?;

    let mut section = IntermediateSection::new(id, section_type, codepage)?;
    section.set_library_id(attr_value(element, b"libraryId")?);
    Ok(section)
}

fn read_symbols_into<R: BufRead>(
    reader: &mut Reader<R>,
    registry: &DefinitionRegistry,
    section: &mut IntermediateSection,
) -> Result<(), XmlError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) if element.name().as_ref() == b"symbol" => {
                let mut symbol = symbol_from_attributes(registry, &element)?;
                let definition = symbol.definition().clone();
                read_fields_into(reader, b"symbol", symbol.fields_mut(), |index| {
                    definition
                        .field_definition(index)
                        .map(|definition| definition.field_type())
                })?;
                section.add_symbol(symbol);
            }
            Event::Empty(element) if element.name().as_ref() == b"symbol" => {
                section.add_symbol(symbol_from_attributes(registry, &element)?);
            }
            Event::End(element) if element.name().as_ref() == b"section" => return Ok(()),
            Event::Eof => return Err(unexpected_eof(reader)),
            event => return Err(unexpected(reader, &event)),
        }
    }
}

fn symbol_from_attributes(
    registry: &DefinitionRegistry,
    element: &BytesStart<'_>,
) -> Result<IntermediateSymbol, XmlError> {
    let name = attr_value(element, b"name")?.ok_or(XmlError::MissingAttribute {
        element: "symbol",
        attribute: "name",
    })?;
    let definition = registry
        .try_get(&name)
        .ok_or(XmlError::UnknownDefinition { name })?;

    let mut symbol = IntermediateSymbol::new(definition);
    if let Some(id) = attr_value(element, b"id")? {
        let access = read_access(element)?;
        symbol.set_id(Some(Identifier::new(access, id)));
    }
    if let Some(encoded) = attr_value(element, b"sourceLineNumber")? {
        symbol.set_source(SourceLineNumber::from_encoded(&encoded));
    }
    Ok(symbol)
}

fn read_table_rows<R: BufRead>(
    reader: &mut Reader<R>,
    definition: Arc<TableDefinition>,
) -> Result<Table, XmlError> {
    let mut table = Table::new(definition.clone());
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) if element.name().as_ref() == b"row" => {
                let mut row = row_from_attributes(&definition, &element)?;
                read_fields_into(reader, b"row", row.fields_mut(), |index| {
                    definition.column(index).map(|column| column.field_type())
                })?;
                table.add_row(row);
            }
            Event::Empty(element) if element.name().as_ref() == b"row" => {
                table.add_row(row_from_attributes(&definition, &element)?);
            }
            Event::End(element) if element.name().as_ref() == b"table" => return Ok(table),
            Event::Eof => return Err(unexpected_eof(reader)),
            event => return Err(unexpected(reader, &event)),
        }
    }
}

fn row_from_attributes(
    definition: &Arc<TableDefinition>,
    element: &BytesStart<'_>,
) -> Result<Row, XmlError> {
    let source = attr_value(element, b"sourceLineNumber")?
        .and_then(|encoded| SourceLineNumber::from_encoded(&encoded));
    let mut row = Row::new(definition.clone(), source);

    if let Some(keyword) = attr_value(element, b"op")? {
        let operation =
            RowOperation::from_keyword(&keyword).ok_or(XmlError::InvalidValue {
                what: "row operation",
                value: keyword,
            })?;
        row.set_operation(operation);
    }
    if attr_value(element, b"redundant")?.as_deref() == Some("yes") {
        row.set_redundant(true);
    }
    row.set_access(read_access(element)?);
    row.set_section_id(attr_value(element, b"sectionId")?);
    Ok(row)
}

/// Read `field` children until the end tag named `end` closes. Each
/// persisted index resolves to a slot in `fields` and a declared type via
/// `field_type_of`; both always agree in well-formed documents.
fn read_fields_into<R: BufRead>(
    reader: &mut Reader<R>,
    end: &[u8],
    fields: &mut [Field],
    field_type_of: impl Fn(usize) -> Option<FieldType>,
) -> Result<(), XmlError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) if element.name().as_ref() == b"field" => {
                let attributes = field_attributes(&element)?;
                let text = read_element_text(reader, b"field")?;
                apply_field(fields, &field_type_of, attributes, Some(text))?;
            }
            Event::Empty(element) if element.name().as_ref() == b"field" => {
                let attributes = field_attributes(&element)?;
                apply_field(fields, &field_type_of, attributes, None)?;
            }
            Event::End(element) if element.name().as_ref() == end => return Ok(()),
            Event::Eof => return Err(unexpected_eof(reader)),
            event => return Err(unexpected(reader, &event)),
        }
    }
}

struct FieldAttributes {
    index: usize,
    modified: bool,
    previous_data: Option<String>,
    context: Option<String>,
    embedded_file_index: Option<usize>,
    base_uri: Option<String>,
}

fn field_attributes(element: &BytesStart<'_>) -> Result<FieldAttributes, XmlError> {
    let index_text = attr_value(element, b"index")?.ok_or(XmlError::MissingAttribute {
        element: "field",
        attribute: "index",
    })?;
    let index = index_text.parse().map_err(|_| XmlError::InvalidValue {
        what: "field index",
        value: index_text,
    })?;

    let embedded_file_index = match attr_value(element, b"embeddedFileIndex")? {
        None => None,
        Some(text) => Some(text.parse().map_err(|_| XmlError::InvalidValue {
            what: "embedded file index",
            value: text,
        })?),
    };

    Ok(FieldAttributes {
        index,
        modified: attr_value(element, b"modified")?.as_deref() == Some("yes"),
        previous_data: attr_value(element, b"previousData")?,
        context: attr_value(element, b"context")?,
        embedded_file_index,
        base_uri: attr_value(element, b"baseUri")?,
    })
}

fn apply_field(
    fields: &mut [Field],
    field_type_of: impl Fn(usize) -> Option<FieldType>,
    attributes: FieldAttributes,
    text: Option<String>,
) -> Result<(), XmlError> {
    let out_of_range = || XmlError::InvalidValue {
        what: "field index",
        value: attributes.index.to_string(),
    };
    let field_type = field_type_of(attributes.index).ok_or_else(out_of_range)?;
    let field = fields.get_mut(attributes.index).ok_or_else(out_of_range)?;

    if let Some(previous) = attributes.previous_data {
        let data = parse_field_data(field_type, previous, None, None)?;
        field.push_history(Some(data), None);
    }

    let data = match text {
        None => None,
        Some(text) => Some(parse_field_data(
            field_type,
            text,
            attributes.embedded_file_index,
            attributes.base_uri,
        )?),
    };
    field.place(data);
    field.set_modified(attributes.modified);
    field.set_context(attributes.context);
    Ok(())
}

/// Parse a persisted string back into typed field data.
///
/// Numbers are read as 64-bit and wrapped into the 32-bit column width;
/// documents written before the width of some columns changed carry
/// out-of-range values, and those must load rather than fail.
fn parse_field_data(
    field_type: FieldType,
    text: String,
    embedded_file_index: Option<usize>,
    base_uri: Option<String>,
) -> Result<FieldData, XmlError> {
    let data = match field_type {
        FieldType::String => FieldData::String(text),
        FieldType::Bool => match text.as_str() {
            "true" | "yes" => FieldData::Bool(true),
            "false" | "no" => FieldData::Bool(false),
            _ => {
                return Err(XmlError::InvalidValue {
                    what: "boolean field",
                    value: text,
                })
            }
        },
        FieldType::Number => {
            let wide: i64 = text.trim().parse().map_err(|_| XmlError::InvalidValue {
                what: "numeric field",
                value: text,
            })?;
            FieldData::Number(wide as i32)
        }
        FieldType::LargeNumber => {
            let number = text.trim().parse().map_err(|_| XmlError::InvalidValue {
                what: "numeric field",
                value: text,
            })?;
            FieldData::LargeNumber(number)
        }
        FieldType::Path => FieldData::Path(match (embedded_file_index, base_uri) {
            (Some(index), Some(base_uri)) => PathValue::embedded(text, index, base_uri),
            _ => PathValue::new(text),
        }),
    };
    Ok(data)
}

/// Accumulate text and CDATA content until the end tag named `end` closes.
fn read_element_text<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<String, XmlError> {
    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Text(content) => text.push_str(&content.unescape()?),
            Event::CData(content) => {
                text.push_str(&String::from_utf8_lossy(&content.into_inner()));
            }
            Event::End(element) if element.name().as_ref() == end => return Ok(text),
            Event::Eof => return Err(unexpected_eof(reader)),
            event => return Err(unexpected(reader, &event)),
        }
    }
}

fn read_access(element: &BytesStart<'_>) -> Result<AccessModifier, XmlError> {
    match attr_value(element, b"access")? {
        None => Ok(AccessModifier::Global),
        Some(keyword) => {
            AccessModifier::from_keyword(&keyword).ok_or(XmlError::InvalidValue {
                what: "access modifier",
                value: keyword,
            })
        }
    }
}

fn attr_value(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, XmlError> {
    for attribute in element.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == name {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn unexpected<R>(reader: &Reader<R>, event: &Event<'_>) -> XmlError {
    let element = match event {
        Event::Start(element) | Event::Empty(element) => {
            String::from_utf8_lossy(element.name().as_ref()).into_owned()
        }
        Event::End(element) => {
            format!("/{}", String::from_utf8_lossy(element.name().as_ref()))
        }
        other => format!("{other:?}"),
    };
    XmlError::UnexpectedElement {
        element,
        position: reader.buffer_position(),
    }
}

fn unexpected_name<R>(reader: &Reader<R>, element: &BytesStart<'_>) -> XmlError {
    XmlError::UnexpectedElement {
        element: String::from_utf8_lossy(element.name().as_ref()).into_owned(),
        position: reader.buffer_position(),
    }
}

fn unexpected_eof<R>(reader: &Reader<R>) -> XmlError {
    XmlError::UnexpectedElement {
        element: "(end of document)".to_owned(),
        position: reader.buffer_position(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_overflow_wraps_instead_of_failing() {
        let data = parse_field_data(FieldType::Number, "4294967296".to_owned(), None, None)
            .unwrap();
        assert_eq!(data, FieldData::Number(0));

        let data = parse_field_data(FieldType::Number, "4294967295".to_owned(), None, None)
            .unwrap();
        assert_eq!(data, FieldData::Number(-1));
    }

    #[test]
    fn wrong_namespace_is_rejected() {
        let document = r#"<?xml version="1.0"?>
            <wixObject xmlns="urn:something-else" version="4.0.0.0" id="abc"/>"#;
        let error =
            read_object(document.as_bytes(), &DefinitionRegistry::new(), false).unwrap_err();
        assert!(matches!(error, XmlError::WrongNamespace { .. }));
    }

    #[test]
    fn version_mismatch_is_suppressible() {
        let document = format!(
            r#"<?xml version="1.0"?>
            <wixObject xmlns="{OBJECT_NAMESPACE}" version="3.0.0.0" id="abc"></wixObject>"#
        );

        let registry = DefinitionRegistry::new();
        let error = read_object(document.as_bytes(), &registry, false).unwrap_err();
        match error {
            XmlError::VersionMismatch { expected, actual } => {
                assert_eq!(expected, CURRENT_VERSION);
                assert_eq!(actual, "3.0.0.0");
            }
            other => panic!("expected VersionMismatch, got {other:?}"),
        }

        let intermediate = read_object(document.as_bytes(), &registry, true).unwrap();
        assert_eq!(intermediate.id(), "abc");
    }

    #[test]
    fn unknown_definitions_abort_the_load() {
        let document = format!(
            r#"<wixObject xmlns="{OBJECT_NAMESPACE}" version="{CURRENT_VERSION}" id="abc">
                 <section type="fragment" codepage="1252">
                   <symbol name="NoSuchThing"/>
                 </section>
               </wixObject>"#
        );
        let error =
            read_object(document.as_bytes(), &DefinitionRegistry::new(), false).unwrap_err();
        assert!(matches!(error, XmlError::UnknownDefinition { name } if name == "NoSuchThing"));
    }
}
