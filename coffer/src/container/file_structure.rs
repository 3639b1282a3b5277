//! The fixed-header multi-stream container.
//!
//! Wire layout, in stream order:
//!
//! 1. a 6-byte ASCII type tag,
//! 2. a little-endian `u32` count of embedded files,
//! 3. one little-endian `u64` byte length per embedded file,
//! 4. the embedded files' raw bytes, back to back, in declared order,
//! 5. the payload (conventionally XML), running to end of stream.
//!
//! The caller owns the underlying stream; every operation borrows it, so
//! a nested reader or writer can never close it out from under the
//! caller.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::{ContainerError, FileFormat, TAG_LENGTH};

/// Parsed header of a container stream, with the offset bookkeeping
/// needed to reach each embedded file and the payload.
#[derive(Debug, Clone)]
pub struct FileStructure {
    format: FileFormat,
    embedded_sizes: Vec<u64>,
    data_offset: u64,
}

impl FileStructure {
    /// Write a container header and the embedded files to `stream`,
    /// leaving it positioned at the payload offset.
    ///
    /// The payload itself is written by the caller through
    /// [`FileStructure::data_stream`].
    pub fn create<S>(
        stream: &mut S,
        format: FileFormat,
        embed_paths: &[impl AsRef<Path>],
    ) -> Result<FileStructure, ContainerError>
    where
        S: Write + Seek,
    {
        let tag = format.tag().ok_or(ContainerError::UnknownFormat)?;
        stream.write_all(tag)?;

        let count = u32::try_from(embed_paths.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "too many embedded files")
        })?;
        stream.write_all(&count.to_le_bytes())?;

        let mut embedded_sizes = Vec::with_capacity(embed_paths.len());
        for path in embed_paths {
            let size = std::fs::metadata(path.as_ref())?.len();
            stream.write_all(&size.to_le_bytes())?;
            embedded_sizes.push(size);
        }

        for path in embed_paths {
            let mut file = File::open(path.as_ref())?;
            io::copy(&mut file, stream)?;
        }

        let data_offset = stream.stream_position()?;
        Ok(FileStructure {
            format,
            embedded_sizes,
            data_offset,
        })
    }

    /// Parse a container header from `stream`.
    ///
    /// An unrecognized tag yields a terminal [`FileFormat::Unknown`]
    /// structure with no further parsing attempted; its data operations
    /// fail with [`ContainerError::UnknownFormat`].
    pub fn read<S>(stream: &mut S) -> Result<FileStructure, ContainerError>
    where
        S: Read + Seek,
    {
        let start = stream.stream_position()?;

        let mut tag = [0u8; TAG_LENGTH];
        stream.read_exact(&mut tag)?;
        let format = FileFormat::from_tag(&tag);
        if format == FileFormat::Unknown {
            return Ok(FileStructure {
                format,
                embedded_sizes: Vec::new(),
                data_offset: start,
            });
        }

        let mut count_bytes = [0u8; 4];
        stream.read_exact(&mut count_bytes)?;
        let count = u32::from_le_bytes(count_bytes) as usize;

        // The count is untrusted wire data; cap the reservation and let the
        // per-entry reads surface truncation.
        let mut embedded_sizes = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let mut size_bytes = [0u8; 8];
            stream.read_exact(&mut size_bytes)?;
            embedded_sizes.push(u64::from_le_bytes(size_bytes));
        }

        let header_end = start + Self::header_len(count);
        let data_offset = header_end + embedded_sizes.iter().sum::<u64>();
        Ok(FileStructure {
            format,
            embedded_sizes,
            data_offset,
        })
    }

    /// Like [`FileStructure::read`], but require the container to hold
    /// `expected`.
    pub fn read_expecting<S>(
        stream: &mut S,
        expected: FileFormat,
    ) -> Result<FileStructure, ContainerError>
    where
        S: Read + Seek,
    {
        let structure = Self::read(stream)?;
        if structure.format != expected {
            return Err(ContainerError::UnexpectedFormat {
                expected,
                actual: structure.format,
            });
        }
        Ok(structure)
    }

    /// Probe the format of `stream` without consuming it; the stream
    /// position is restored whether or not the probe succeeds.
    pub fn test_file_format<S>(stream: &mut S) -> Result<FileFormat, ContainerError>
    where
        S: Read + Seek,
    {
        let position = stream.stream_position()?;
        let result = Self::probe(stream);
        stream.seek(SeekFrom::Start(position))?;
        result
    }

    fn probe<S: Read>(stream: &mut S) -> Result<FileFormat, ContainerError> {
        let mut tag = [0u8; TAG_LENGTH];
        let mut read = 0;
        while read < TAG_LENGTH {
            match stream.read(&mut tag[read..])? {
                0 => return Ok(FileFormat::Unknown),
                n => read += n,
            }
        }
        Ok(FileFormat::from_tag(&tag))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn embedded_file_count(&self) -> usize {
        self.embedded_sizes.len()
    }

    pub fn embedded_file_size(&self, index: usize) -> Result<u64, ContainerError> {
        self.embedded_sizes.get(index).copied().ok_or_else(|| {
            ContainerError::EmbeddedFileIndexOutOfRange {
                index,
                count: self.embedded_sizes.len(),
            }
        })
    }

    /// Copy the embedded file at `index` to `output_path`, creating
    /// parent directories as needed.
    pub fn extract_embedded_file<S>(
        &self,
        stream: &mut S,
        index: usize,
        output_path: &Path,
    ) -> Result<(), ContainerError>
    where
        S: Read + Seek,
    {
        let size = self.embedded_file_size(index)?;
        let offset = self.embedded_file_offset(index);

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        stream.seek(SeekFrom::Start(offset))?;
        let mut output = File::create(output_path)?;
        let copied = io::copy(&mut stream.take(size), &mut output)?;
        if copied != size {
            return Err(ContainerError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("embedded file {index} truncated: {copied} of {size} bytes"),
            )));
        }
        Ok(())
    }

    /// Position `stream` at the payload and hand it back.
    ///
    /// The returned borrow is the non-closing view: dropping whatever the
    /// caller wraps around it cannot close the underlying stream, which
    /// stays owned by the caller.
    pub fn data_stream<'a, S>(&self, stream: &'a mut S) -> Result<&'a mut S, ContainerError>
    where
        S: Seek,
    {
        if self.format == FileFormat::Unknown {
            return Err(ContainerError::UnknownFormat);
        }
        stream.seek(SeekFrom::Start(self.data_offset))?;
        Ok(stream)
    }

    /// Byte offset of the payload from the start of the container.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    fn header_len(count: usize) -> u64 {
        (TAG_LENGTH + 4 + 8 * count) as u64
    }

    fn embedded_file_offset(&self, index: usize) -> u64 {
        let header_end = self.data_offset - self.embedded_sizes.iter().sum::<u64>();
        header_end + self.embedded_sizes[..index].iter().sum::<u64>()
    }
}
