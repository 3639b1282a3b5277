//! The ZIP-based output container.
//!
//! Each named entry is either an opaque embedded data stream or the XML
//! payload under [`DATA_ENTRY_NAME`]. Entries are addressed by stable
//! string identifiers rather than position; this format deliberately
//! diverges from [`FileStructure`] and the two are not wire-compatible.
//!
//! [`FileStructure`]: super::file_structure::FileStructure

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use super::{ContainerError, FileFormat};

/// Well-known entry name of the XML payload.
pub const DATA_ENTRY_NAME: &str = "wix-ir.xml";

/// URI scheme for archives compiled into a hosting binary.
const EMBEDDED_RESOURCE_SCHEME: &str = "embeddedresource:";

/// Where an output archive is loaded from.
///
/// The `embeddedresource:` scheme addresses an archive compiled into the
/// hosting binary (the caller resolves it to bytes, typically with
/// `include_bytes!`); anything else is a plain file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputArchiveUri {
    File(PathBuf),
    EmbeddedResource(String),
}

impl OutputArchiveUri {
    pub fn parse(uri: &str) -> OutputArchiveUri {
        match uri.strip_prefix(EMBEDDED_RESOURCE_SCHEME) {
            Some(resource) => Self::EmbeddedResource(resource.to_owned()),
            None => Self::File(PathBuf::from(uri)),
        }
    }
}

/// Writes a fresh output archive.
pub struct OutputArchiveBuilder<W: Write + Seek> {
    zip: ZipWriter<W>,
}

impl OutputArchiveBuilder<Cursor<Vec<u8>>> {
    /// Build an archive in memory.
    pub fn in_memory() -> Self {
        Self::from_writer(Cursor::new(Vec::new()))
    }
}

impl OutputArchiveBuilder<File> {
    /// Build an archive at `path`, truncating any existing file.
    pub fn create(path: &Path) -> Result<Self, ContainerError> {
        Ok(Self::from_writer(File::create(path)?))
    }
}

impl<W: Write + Seek> OutputArchiveBuilder<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
        }
    }

    /// Add an opaque embedded entry under `id`.
    pub fn add_embedded_file(
        &mut self,
        id: &str,
        mut contents: impl Read,
    ) -> Result<(), ContainerError> {
        self.zip
            .start_file(id, FileOptions::default())
            .map_err(zip_io_error)?;
        io::copy(&mut contents, &mut self.zip)?;
        Ok(())
    }

    /// Write the XML payload under the well-known entry name.
    pub fn write_data(&mut self, data: &[u8]) -> Result<(), ContainerError> {
        self.zip
            .start_file(DATA_ENTRY_NAME, FileOptions::default())
            .map_err(zip_io_error)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    /// Finish the archive and return the underlying writer.
    pub fn finish(mut self) -> Result<W, ContainerError> {
        Ok(self.zip.finish().map_err(zip_io_error)?)
    }
}

/// Read-only view over an existing output archive.
#[derive(Debug)]
pub struct OutputArchive<R: Read + Seek> {
    uri: String,
    archive: ZipArchive<R>,
}

impl OutputArchive<File> {
    /// Open the archive at `path` read-only.
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        let uri = path.display().to_string();
        let file = File::open(path)?;
        Self::from_reader(uri, file)
    }

    /// Open the archive addressed by `uri`.
    ///
    /// Embedded-resource URIs cannot be resolved from here; the hosting
    /// binary owns those bytes and must hand them to
    /// [`OutputArchive::from_bytes`] itself.
    pub fn open_uri(uri: &str) -> Result<Self, ContainerError> {
        match OutputArchiveUri::parse(uri) {
            OutputArchiveUri::File(path) => Self::open(&path),
            OutputArchiveUri::EmbeddedResource(_) => Err(ContainerError::UnsupportedUri {
                uri: uri.to_owned(),
            }),
        }
    }
}

impl OutputArchive<Cursor<Vec<u8>>> {
    /// Open an archive from bytes resolved out of an
    /// `embeddedresource:` URI.
    pub fn from_bytes(uri: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ContainerError> {
        Self::from_reader(uri.into(), Cursor::new(bytes))
    }
}

impl<R: Read + Seek> OutputArchive<R> {
    pub fn from_reader(uri: String, reader: R) -> Result<Self, ContainerError> {
        let archive = match ZipArchive::new(reader) {
            Ok(archive) => archive,
            Err(ZipError::Io(error)) => return Err(ContainerError::Io(error)),
            Err(error) => {
                // Structurally invalid ZIP data: a corrupt container, not
                // a missing entry.
                return Err(ContainerError::CorruptArchive {
                    uri,
                    expected: FileFormat::WixOut,
                    detail: error.to_string(),
                });
            }
        };
        Ok(Self { uri, archive })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Names of every entry, payload included.
    pub fn entry_ids(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }

    /// Copy the embedded entry `id` to `output_path`, creating parent
    /// directories as needed.
    pub fn extract_embedded_file(
        &mut self,
        id: &str,
        output_path: &Path,
    ) -> Result<(), ContainerError> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut entry = self.entry(id)?;
        let mut output = File::create(output_path)?;
        io::copy(&mut entry, &mut output)?;
        Ok(())
    }

    /// Read the XML payload entry in full.
    pub fn data(&mut self) -> Result<Vec<u8>, ContainerError> {
        let mut entry = self.entry(DATA_ENTRY_NAME)?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        Ok(data)
    }

    fn entry(&mut self, id: &str) -> Result<zip::read::ZipFile<'_>, ContainerError> {
        match self.archive.by_name(id) {
            Ok(entry) => Ok(entry),
            Err(ZipError::FileNotFound) => Err(ContainerError::MissingEntry {
                id: id.to_owned(),
                uri: self.uri.clone(),
            }),
            Err(ZipError::Io(error)) => Err(ContainerError::Io(error)),
            Err(error) => Err(ContainerError::CorruptArchive {
                uri: self.uri.clone(),
                expected: FileFormat::WixOut,
                detail: error.to_string(),
            }),
        }
    }
}

fn zip_io_error(error: ZipError) -> io::Error {
    match error {
        ZipError::Io(error) => error,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}
