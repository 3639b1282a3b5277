//! Legacy tab-delimited (IDT) table export.
//!
//! An IDT stream is a 3-line header (column names, then column type/width
//! codes, then the table name followed by its primary-key column names)
//! and one line per non-redundant row. Lines are tab-separated and end in
//! `\r\n`. Values in columns that request it have tab, CR and LF replaced
//! with fixed private substitute characters so the delimiters stay
//! unambiguous.

use std::io::{self, Write};

use itertools::Itertools;
use thiserror::Error;

use crate::reporting::{FatalMessage, Message, Messaging};
use crate::table::{ColumnDefinition, Table};

/// Codepage value meaning UTF-8.
pub const UTF8_CODEPAGE: i32 = 65001;

/// Diagnostic id reported when a character cannot be encoded in the
/// requested codepage and is replaced with `?`.
pub const CODEPAGE_FALLBACK_WARNING_ID: u32 = 1104;

const TAB_SUBSTITUTE: char = '\u{10}';
const CR_SUBSTITUTE: char = '\u{11}';
const LF_SUBSTITUTE: char = '\u{19}';

#[derive(Debug, Error)]
pub enum IdtError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Fatal(#[from] FatalMessage),
}

#[derive(Debug, Clone)]
pub struct IdtOptions {
    /// Include columns introduced by a transform. Added columns are a
    /// trailing suffix of the schema, so excluding them truncates the
    /// column list at the first added column.
    pub keep_added_columns: bool,
    pub codepage: i32,
}

impl Default for IdtOptions {
    fn default() -> Self {
        Self {
            keep_added_columns: false,
            codepage: UTF8_CODEPAGE,
        }
    }
}

/// Write `table` as an IDT stream.
pub fn write_idt<W: Write>(
    out: &mut W,
    table: &Table,
    options: &IdtOptions,
    messaging: &mut Messaging,
) -> Result<(), IdtError> {
    let definition = table.definition();
    let columns: Vec<&ColumnDefinition> = if options.keep_added_columns {
        definition.columns().iter().collect()
    } else {
        definition
            .columns()
            .iter()
            .take_while(|column| !column.is_added())
            .collect()
    };

    let mut text = String::new();

    text.push_str(&columns.iter().map(|column| column.name()).join("\t"));
    text.push_str("\r\n");

    text.push_str(
        &columns
            .iter()
            .map(|column| column.idt_type_code())
            .join("\t"),
    );
    text.push_str("\r\n");

    text.push_str(definition.name());
    for column in definition.primary_key_columns() {
        text.push('\t');
        text.push_str(column.name());
    }
    text.push_str("\r\n");

    for row in table.rows() {
        if row.is_redundant() {
            continue;
        }
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                text.push('\t');
            }
            let value = row.field(index).as_string().unwrap_or_default();
            if column.escapes_idt() {
                text.push_str(&escape_idt_value(&value));
            } else {
                text.push_str(&value);
            }
        }
        text.push_str("\r\n");
    }

    if options.codepage == UTF8_CODEPAGE {
        out.write_all(text.as_bytes())?;
        return Ok(());
    }

    // Non-UTF-8 codepages are written as their shared ASCII subset.
    let mut bytes = Vec::with_capacity(text.len());
    let mut substituted = false;
    for character in text.chars() {
        if character.is_ascii() {
            bytes.push(character as u8);
        } else {
            bytes.push(b'?');
            substituted = true;
        }
    }
    if substituted {
        messaging.report(Message::warning(
            CODEPAGE_FALLBACK_WARNING_ID,
            format!(
                "table '{}' contains characters that cannot be encoded in codepage {}; \
                 they were replaced with '?'",
                definition.name(),
                options.codepage,
            ),
        ))?;
    }
    out.write_all(&bytes)?;
    Ok(())
}

fn escape_idt_value(value: &str) -> String {
    value
        .chars()
        .map(|character| match character {
            '\t' => TAB_SUBSTITUTE,
            '\r' => CR_SUBSTITUTE,
            '\n' => LF_SUBSTITUTE,
            other => other,
        })
        .collect()
}
