//! Binary container formats.
//!
//! Two independent designs coexist: the fixed-header multi-stream
//! [`FileStructure`] and the ZIP-based [`OutputArchive`]. They are not
//! wire-compatible; the archive is the newer format and addresses entries
//! by name instead of position.
//!
//! [`FileStructure`]: file_structure::FileStructure
//! [`OutputArchive`]: archive::OutputArchive

pub mod archive;
pub mod file_structure;

use std::fmt;
use std::io;

use thiserror::Error;

/// Length of the ASCII type tag at the start of a [`FileStructure`]
/// stream.
///
/// [`FileStructure`]: file_structure::FileStructure
pub const TAG_LENGTH: usize = 6;

/// Logical content category of a container.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// A compiled object.
    Object,
    /// A library of compiled objects.
    Library,
    /// Linker or binder output (including transforms and patches).
    Output,
    /// Debug symbols.
    Pdb,
}

/// Recognized container formats, one per wire tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum FileFormat {
    #[default]
    Unknown,
    WixObj,
    WixLib,
    WixOut,
    WixMst,
    WixMsp,
    WixPdb,
}

impl FileFormat {
    /// The 6-byte ASCII tag written at the start of a stream.
    pub fn tag(self) -> Option<&'static [u8; TAG_LENGTH]> {
        match self {
            Self::Unknown => None,
            Self::WixObj => Some(b"wixobj"),
            Self::WixLib => Some(b"wixlib"),
            Self::WixOut => Some(b"wixout"),
            Self::WixMst => Some(b"wixmst"),
            Self::WixMsp => Some(b"wixmsp"),
            Self::WixPdb => Some(b"wixpdb"),
        }
    }

    pub fn from_tag(tag: &[u8]) -> FileFormat {
        match tag {
            b"wixobj" => Self::WixObj,
            b"wixlib" => Self::WixLib,
            b"wixout" => Self::WixOut,
            b"wixmst" => Self::WixMst,
            b"wixmsp" => Self::WixMsp,
            b"wixpdb" => Self::WixPdb,
            _ => Self::Unknown,
        }
    }

    /// Guess the format from a file extension, case-insensitively and
    /// with or without the leading dot.
    pub fn from_extension(extension: &str) -> FileFormat {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        Self::from_tag(extension.to_ascii_lowercase().as_bytes())
    }

    pub fn kind(self) -> Option<ContainerKind> {
        match self {
            Self::Unknown => None,
            Self::WixObj => Some(ContainerKind::Object),
            Self::WixLib => Some(ContainerKind::Library),
            Self::WixOut | Self::WixMst | Self::WixMsp => Some(ContainerKind::Output),
            Self::WixPdb => Some(ContainerKind::Pdb),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Some(tag) => f.write_str(std::str::from_utf8(tag).expect("tags are ASCII")),
            None => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("stream does not hold a recognized container format")]
    UnknownFormat,
    #[error("expected a {expected} container but found {actual}")]
    UnexpectedFormat {
        expected: FileFormat,
        actual: FileFormat,
    },
    #[error("embedded file index {index} is out of range; the container holds {count}")]
    EmbeddedFileIndexOutOfRange { index: usize, count: usize },
    #[error("no embedded entry '{id}' in '{uri}'")]
    MissingEntry { id: String, uri: String },
    #[error("'{uri}' is not a valid {expected} container: {detail}")]
    CorruptArchive {
        uri: String,
        expected: FileFormat,
        detail: String,
    },
    #[error("unsupported uri '{uri}'")]
    UnsupportedUri { uri: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip() {
        for format in [
            FileFormat::WixObj,
            FileFormat::WixLib,
            FileFormat::WixOut,
            FileFormat::WixMst,
            FileFormat::WixMsp,
            FileFormat::WixPdb,
        ] {
            assert_eq!(FileFormat::from_tag(format.tag().unwrap()), format);
        }
        assert_eq!(FileFormat::from_tag(b"banana"), FileFormat::Unknown);
    }

    #[test]
    fn extension_guessing_is_case_insensitive_and_strips_dots() {
        assert_eq!(FileFormat::from_extension(".wixobj"), FileFormat::WixObj);
        assert_eq!(FileFormat::from_extension("WIXLIB"), FileFormat::WixLib);
        assert_eq!(FileFormat::from_extension(".WixMsp"), FileFormat::WixMsp);
        assert_eq!(FileFormat::from_extension("exe"), FileFormat::Unknown);
    }

    #[test]
    fn output_variants_share_a_kind() {
        assert_eq!(FileFormat::WixOut.kind(), Some(ContainerKind::Output));
        assert_eq!(FileFormat::WixMst.kind(), Some(ContainerKind::Output));
        assert_eq!(FileFormat::WixMsp.kind(), Some(ContainerKind::Output));
        assert_eq!(FileFormat::WixObj.kind(), Some(ContainerKind::Object));
        assert_eq!(FileFormat::Unknown.kind(), None);
    }
}
