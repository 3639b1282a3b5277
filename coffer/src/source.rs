//! Source file provenance for symbols and rows.
//!
//! Locations form a parent chain through include files: the head of the
//! chain is the innermost location and each `parent` link walks outward.
//! Chains are persisted as a delimited string, `file[*line]` frames joined
//! by `|` with the rightmost frame outermost.

use std::fmt;

/// Delimiter between a file name and its line number in the encoded form.
const LINE_DELIMITER: char = '*';

/// Delimiter between frames in the encoded form.
const FRAME_DELIMITER: char = '|';

/// A source location, optionally chained to the location that included it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLineNumber {
    file_name: String,
    line_number: Option<u32>,
    parent: Option<Box<SourceLineNumber>>,
}

impl SourceLineNumber {
    /// Create a location with no line number, for example for a generated
    /// file.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            line_number: None,
            parent: None,
        }
    }

    /// Create a location at a specific line of a file.
    pub fn new_with_line(file_name: impl Into<String>, line_number: u32) -> Self {
        Self {
            file_name: file_name.into(),
            line_number: Some(line_number),
            parent: None,
        }
    }

    /// Decode an encoded chain, for example `a.wxs*12|product.wxs*3`.
    ///
    /// Returns `None` when `encoded` is empty. A malformed line number in
    /// any frame also yields `None`; a frame without `*` is a file-only
    /// location.
    pub fn from_encoded(encoded: &str) -> Option<Self> {
        if encoded.is_empty() {
            return None;
        }

        // Single-frame locations are by far the most common case.
        if !encoded.contains(FRAME_DELIMITER) {
            return Self::frame_from_encoded(encoded);
        }

        let mut chain: Option<Box<SourceLineNumber>> = None;
        for frame in encoded.split(FRAME_DELIMITER).rev() {
            let mut location = Self::frame_from_encoded(frame)?;
            location.parent = chain;
            chain = Some(Box::new(location));
        }
        chain.map(|boxed| *boxed)
    }

    fn frame_from_encoded(frame: &str) -> Option<Self> {
        match frame.split_once(LINE_DELIMITER) {
            None => Some(Self::new(frame)),
            Some((file_name, line)) => {
                let line_number = line.parse().ok()?;
                Some(Self::new_with_line(file_name, line_number))
            }
        }
    }

    /// Encode the full chain back to its delimited string form.
    pub fn encoded(&self) -> String {
        let mut encoded = self.qualified_file_name();
        let mut parent = self.parent.as_deref();
        while let Some(location) = parent {
            encoded.push(FRAME_DELIMITER);
            encoded.push_str(&location.qualified_file_name());
            parent = location.parent.as_deref();
        }
        encoded
    }

    /// The `file[*line]` form of this frame alone.
    pub fn qualified_file_name(&self) -> String {
        match self.line_number {
            Some(line) => format!("{}{}{}", self.file_name, LINE_DELIMITER, line),
            None => self.file_name.clone(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn line_number(&self) -> Option<u32> {
        self.line_number
    }

    pub fn parent(&self) -> Option<&SourceLineNumber> {
        self.parent.as_deref()
    }

    /// Chain `parent` onto this location, returning the new head.
    pub fn with_parent(mut self, parent: SourceLineNumber) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }
}

impl fmt::Display for SourceLineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line_number {
            Some(line) => write!(f, "{} at line {}", self.file_name, line),
            None => f.write_str(&self.file_name),
        }
    }
}
