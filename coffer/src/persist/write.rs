//! Event-based XML writers for object, library and output documents.

use std::io::Write;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::field::{Field, FieldData};
use crate::identifier::AccessModifier;
use crate::section::{Intermediate, IntermediateSection};
use crate::symbol::IntermediateSymbol;
use crate::table::{Row, RowOperation, Table};

use super::{XmlError, CURRENT_VERSION, LIBRARY_NAMESPACE, OBJECT_NAMESPACE};

/// Write one intermediate as an object document.
pub fn write_object<W: Write>(out: &mut W, intermediate: &Intermediate) -> Result<(), XmlError> {
    let mut xml = Writer::new(out);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("wixObject");
    root.push_attribute(("xmlns", OBJECT_NAMESPACE));
    root.push_attribute(("version", CURRENT_VERSION));
    root.push_attribute(("id", intermediate.id()));
    xml.write_event(Event::Start(root))?;

    for section in intermediate.sections() {
        write_section(&mut xml, section)?;
    }

    xml.write_event(Event::End(BytesEnd::new("wixObject")))?;
    Ok(())
}

/// Write a collection of intermediates as a library document.
pub fn write_library<W: Write>(
    out: &mut W,
    intermediates: &[Intermediate],
) -> Result<(), XmlError> {
    let mut xml = Writer::new(out);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("wixLibrary");
    root.push_attribute(("xmlns", LIBRARY_NAMESPACE));
    root.push_attribute(("version", CURRENT_VERSION));
    xml.write_event(Event::Start(root))?;

    for intermediate in intermediates {
        let mut object = BytesStart::new("wixObject");
        object.push_attribute(("id", intermediate.id()));
        xml.write_event(Event::Start(object))?;
        for section in intermediate.sections() {
            write_section(&mut xml, section)?;
        }
        xml.write_event(Event::End(BytesEnd::new("wixObject")))?;
    }

    xml.write_event(Event::End(BytesEnd::new("wixLibrary")))?;
    Ok(())
}

/// Write legacy tables as an output document.
pub fn write_tables<W: Write>(out: &mut W, tables: &[Table]) -> Result<(), XmlError> {
    let mut xml = Writer::new(out);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("wixOutput");
    root.push_attribute(("xmlns", OBJECT_NAMESPACE));
    root.push_attribute(("version", CURRENT_VERSION));
    xml.write_event(Event::Start(root))?;

    for table in tables {
        // Schema-only tables are never persisted.
        if table.definition().is_unreal() {
            continue;
        }
        let mut element = BytesStart::new("table");
        element.push_attribute(("name", table.definition().name()));
        xml.write_event(Event::Start(element))?;
        for row in table.rows() {
            write_row(&mut xml, row)?;
        }
        xml.write_event(Event::End(BytesEnd::new("table")))?;
    }

    xml.write_event(Event::End(BytesEnd::new("wixOutput")))?;
    Ok(())
}

fn write_section<W: Write>(
    xml: &mut Writer<W>,
    section: &IntermediateSection,
) -> Result<(), XmlError> {
    let mut element = BytesStart::new("section");
    if let Some(id) = section.id() {
        element.push_attribute(("id", id));
    }
    element.push_attribute(("type", section.section_type().keyword()));
    element.push_attribute(("codepage", section.codepage().to_string().as_str()));
    if let Some(library_id) = section.library_id() {
        element.push_attribute(("libraryId", library_id));
    }
    xml.write_event(Event::Start(element))?;

    for symbol in section.symbols() {
        write_symbol(xml, symbol)?;
    }

    xml.write_event(Event::End(BytesEnd::new("section")))?;
    Ok(())
}

fn write_symbol<W: Write>(
    xml: &mut Writer<W>,
    symbol: &IntermediateSymbol,
) -> Result<(), XmlError> {
    let mut element = BytesStart::new("symbol");
    element.push_attribute(("name", symbol.definition().name()));
    if let Some(id) = symbol.id().and_then(|id| id.id()) {
        element.push_attribute(("id", id));
        let access = symbol.id().map(|id| id.access()).unwrap_or_default();
        if access != AccessModifier::Global {
            element.push_attribute(("access", access.keyword()));
        }
    }
    if let Some(source) = symbol.source() {
        element.push_attribute(("sourceLineNumber", source.encoded().as_str()));
    }

    if symbol.fields().iter().all(field_is_blank) {
        xml.write_event(Event::Empty(element))?;
        return Ok(());
    }

    xml.write_event(Event::Start(element))?;
    for (index, field) in symbol.fields().iter().enumerate() {
        write_field(xml, index, field, false)?;
    }
    xml.write_event(Event::End(BytesEnd::new("symbol")))?;
    Ok(())
}

fn write_row<W: Write>(xml: &mut Writer<W>, row: &Row) -> Result<(), XmlError> {
    let mut element = BytesStart::new("row");
    if row.operation() != RowOperation::None {
        element.push_attribute(("op", row.operation().keyword()));
    }
    if row.is_redundant() {
        element.push_attribute(("redundant", "yes"));
    }
    if row.access() != AccessModifier::Global {
        element.push_attribute(("access", row.access().keyword()));
    }
    if let Some(section_id) = row.section_id() {
        element.push_attribute(("sectionId", section_id));
    }
    if let Some(source) = row.source() {
        element.push_attribute(("sourceLineNumber", source.encoded().as_str()));
    }

    if row.fields().iter().all(field_is_blank) {
        xml.write_event(Event::Empty(element))?;
        return Ok(());
    }

    xml.write_event(Event::Start(element))?;
    for (index, field) in row.fields().iter().enumerate() {
        let use_cdata = row
            .definition()
            .column(index)
            .is_some_and(|column| column.uses_cdata());
        write_field(xml, index, field, use_cdata)?;
    }
    xml.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

/// A field with no value and nothing worth persisting about it.
fn field_is_blank(field: &Field) -> bool {
    field.is_null() && !field.modified() && field.context().is_none() && field.previous_data().is_none()
}

fn write_field<W: Write>(
    xml: &mut Writer<W>,
    index: usize,
    field: &Field,
    use_cdata: bool,
) -> Result<(), XmlError> {
    if field_is_blank(field) {
        return Ok(());
    }

    let mut element = BytesStart::new("field");
    element.push_attribute(("index", index.to_string().as_str()));
    if field.modified() {
        element.push_attribute(("modified", "yes"));
    }
    if let Some(previous) = field.previous_data() {
        element.push_attribute(("previousData", previous.as_string().as_str()));
    }
    if let Some(context) = field.context() {
        element.push_attribute(("context", context));
    }
    if let Some(FieldData::Path(path)) = field.data() {
        if let Some(embedded_index) = path.embedded_file_index() {
            element.push_attribute(("embeddedFileIndex", embedded_index.to_string().as_str()));
        }
        if let Some(base_uri) = path.base_uri() {
            element.push_attribute(("baseUri", base_uri));
        }
    }

    match field.data() {
        None => {
            xml.write_event(Event::Empty(element))?;
        }
        Some(data) => {
            let text = data.as_string();
            xml.write_event(Event::Start(element))?;
            if use_cdata {
                xml.write_event(Event::CData(BytesCData::new(text.as_str())))?;
            } else {
                xml.write_event(Event::Text(BytesText::new(text.as_str())))?;
            }
            xml.write_event(Event::End(BytesEnd::new("field")))?;
        }
    }
    Ok(())
}
