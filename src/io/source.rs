use crate::errors::QcError;
use flate2::read::MultiGzDecoder;
use memmap2::{Mmap, MmapOptions};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

/// Chunk target for the streamed variant: one logical line is pulled per
/// chunk, refilled through a buffer of this size.
const GZ_CHUNK_SIZE: usize = 16 * 1024;

/// Line-oriented forward traversal over an input. Each call yields the next
/// line without its terminator; `None` signals end of input.
pub trait LineSource {
    fn next_line(&mut self) -> Result<Option<&[u8]>, QcError>;
}

#[inline]
fn trim_terminator(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// A read-only memory mapping walked in place. The last byte address is fixed
/// at open time; zero-length files are represented without a mapping.
pub struct MappedReader {
    map: Option<Mmap>,
    pos: usize,
}

impl MappedReader {
    /// Opens and maps `path` read-only.
    ///
    /// ## Errors
    ///
    /// Any IO errors when opening or mapping the file are propagated with the
    /// path attached.
    pub fn open(path: &Path) -> Result<Self, QcError> {
        let file = File::open(path).map_err(QcError::io_at(path))?;
        let len = file.metadata().map_err(QcError::io_at(path))?.len();

        // An empty file cannot be mapped
        let map = if len == 0 {
            None
        } else {
            Some(unsafe { MmapOptions::new().map(&file) }.map_err(QcError::io_at(path))?)
        };

        Ok(MappedReader { map, pos: 0 })
    }

    fn next_line(&mut self) -> Option<&[u8]> {
        let data: &[u8] = self.map.as_deref().unwrap_or(&[]);
        if self.pos >= data.len() {
            return None;
        }

        let rest = &data[self.pos..];
        let (line_end, advance) = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => (i, i + 1),
            None => (rest.len(), rest.len()),
        };
        self.pos += advance;

        Some(trim_terminator(&rest[..line_end]))
    }
}

/// A gzip-compressed input decoded lazily on the scanning thread, one line
/// per chunk into a reused buffer. End of stream is signalled by the decoder.
pub struct GzLineReader {
    reader: BufReader<MultiGzDecoder<File>>,
    buf:    Vec<u8>,
    path:   PathBuf,
}

impl GzLineReader {
    /// Opens `path` and wraps it in a [`MultiGzDecoder`].
    ///
    /// ## Errors
    ///
    /// Any IO errors when opening the file are propagated with the path
    /// attached. Decode errors appear while reading lines.
    pub fn open(path: &Path) -> Result<Self, QcError> {
        let file = File::open(path).map_err(QcError::io_at(path))?;

        Ok(GzLineReader {
            reader: BufReader::with_capacity(GZ_CHUNK_SIZE, MultiGzDecoder::new(file)),
            buf:    Vec::with_capacity(GZ_CHUNK_SIZE),
            path:   path.to_path_buf(),
        })
    }

    fn next_line(&mut self) -> Result<Option<&[u8]>, QcError> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(QcError::io_at(&self.path))?;
        if read == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        Ok(Some(trim_terminator(&self.buf)))
    }
}

/// The three input variants the engine scans. The alignment variant differs
/// from the mapped plain variant only in record shape, which the tokenizer
/// handles; the byte traversal is identical.
pub enum RecordSource {
    MappedFastq(MappedReader),
    MappedSam(MappedReader),
    GzFastq(GzLineReader),
}

impl RecordSource {
    /// Whether records follow the tab-delimited alignment shape.
    pub fn is_alignment(&self) -> bool {
        matches!(self, RecordSource::MappedSam(_))
    }
}

impl LineSource for RecordSource {
    #[inline]
    fn next_line(&mut self) -> Result<Option<&[u8]>, QcError> {
        match self {
            RecordSource::MappedFastq(reader) | RecordSource::MappedSam(reader) => Ok(reader.next_line()),
            RecordSource::GzFastq(reader) => reader.next_line(),
        }
    }
}
