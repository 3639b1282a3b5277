//! XML persistence of the intermediate object model.
//!
//! Documents carry a namespace and a version attribute; both are checked
//! on load against the current constants below. A version mismatch is
//! fatal by default and suppressible for migration tooling, which needs to
//! load old documents as-is. The element vocabulary is shared between
//! object and library documents; only the root element and namespace
//! differ.

pub mod idt;
pub mod read;
pub mod write;

use thiserror::Error;

use crate::section::SectionError;

/// Namespace of object documents (compiled sections and symbols).
pub const OBJECT_NAMESPACE: &str = "http://wixtoolset.org/schemas/v4/wixobj";

/// Namespace of library documents (collections of objects).
pub const LIBRARY_NAMESPACE: &str = "http://wixtoolset.org/schemas/v4/wixlib";

/// Version written into every document and required on load.
pub const CURRENT_VERSION: &str = "4.0.0.0";

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("document version {actual} does not match the current version {expected}")]
    VersionMismatch {
        expected: &'static str,
        actual: String,
    },
    #[error("expected a document in namespace '{expected}' but found '{actual}'")]
    WrongNamespace {
        expected: &'static str,
        actual: String,
    },
    #[error("unexpected element '{element}' at byte {position}")]
    UnexpectedElement { element: String, position: usize },
    #[error("element '{element}' is missing its required '{attribute}' attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("invalid {what} value '{value}'")]
    InvalidValue { what: &'static str, value: String },
    #[error("no symbol definition named '{name}' is registered")]
    UnknownDefinition { name: String },
    #[error("no table definition named '{name}' is available")]
    UnknownTable { name: String },
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error(transparent)]
    Parse(#[from] quick_xml::Error),
    #[error(transparent)]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
