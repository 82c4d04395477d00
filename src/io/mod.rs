pub mod source;

use crate::{
    errors::{ConfigError, QcError},
    io::source::{GzLineReader, MappedReader, RecordSource},
};
use clap::ValueEnum;
use std::{fs::File, io::BufWriter, path::Path};

/// Checks whether a path carries the `gz` extension.
#[inline]
pub(crate) fn is_gz<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// The input layouts the engine scans. Normally determined from the filename
/// suffix; the CLI can override the detection.
#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputFormat {
    /// Four-line flat-text records.
    Fastq,
    /// Gzip-compressed four-line records.
    #[value(name = "fastq.gz")]
    FastqGz,
    /// Tab-delimited alignment records.
    Sam,
}

impl InputFormat {
    /// Determines the input format from the filename suffix: `.sam` is the
    /// alignment layout, `.gz` the compressed plain layout, anything else the
    /// plain layout. `.bam` is rejected: the engine has no
    /// compressed-alignment source variant.
    pub fn from_path(path: &Path) -> Result<InputFormat, ConfigError> {
        let ext = path.extension().map(|ext| ext.to_ascii_lowercase());

        match ext.as_deref().and_then(|ext| ext.to_str()) {
            Some("sam") => Ok(InputFormat::Sam),
            Some("bam") => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
            _ if is_gz(path) => Ok(InputFormat::FastqGz),
            _ => Ok(InputFormat::Fastq),
        }
    }
}

/// Opens the record source for `path` in the given format.
///
/// ## Errors
///
/// Any IO errors when opening or mapping the file are propagated with the
/// path attached.
pub fn open_source(path: &Path, format: InputFormat) -> Result<RecordSource, QcError> {
    match format {
        InputFormat::Fastq => Ok(RecordSource::MappedFastq(MappedReader::open(path)?)),
        InputFormat::Sam => Ok(RecordSource::MappedSam(MappedReader::open(path)?)),
        InputFormat::FastqGz => Ok(RecordSource::GzFastq(GzLineReader::open(path)?)),
    }
}

/// Creates a buffered writer for a report artifact.
///
/// ## Errors
///
/// Creation of `path` must succeed; failures carry the path.
pub fn create_report_writer(path: &Path) -> Result<BufWriter<File>, QcError> {
    File::create(path).map(BufWriter::new).map_err(QcError::io_at(path))
}
