use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading the limits, adapter, or contaminant tables, or
/// while validating analysis parameters.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown metric name `{0}` in the limits file")]
    UnknownMetric(String),

    #[error("unknown instruction `{instruction}` for metric `{metric}` in the limits file")]
    UnknownInstruction { metric: String, instruction: String },

    #[error("metric `{0}` is missing a warn/error threshold in the limits file")]
    MissingMetric(&'static str),

    #[error("line {line} of {file}: {reason}")]
    MalformedLine { file: String, line: usize, reason: String },

    #[error("adapter `{0}` contains a character outside A/C/T/G")]
    AdapterAlphabet(String),

    #[error("adapter `{name}` is shorter than the k-mer length ({kmer_len})")]
    AdapterTooShort { name: String, kmer_len: usize },

    #[error("k-mer length {0} is out of range (2 to 10)")]
    KmerLength(usize),

    #[error("unsupported input format for {0}")]
    UnsupportedFormat(String),
}

/// The analyzer's error catalogue. Every failure surfaces to the top-level
/// caller as one of these kinds; the engine never recovers locally and never
/// emits a partial report.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum QcError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("malformed record {record}: {reason}")]
    MalformedRecord { record: u64, reason: &'static str },

    #[error("invariant violation: {0}")]
    Invariant(&'static str),
}

impl QcError {
    /// Adapter for `map_err` that attaches the offending path to an
    /// [`std::io::Error`].
    #[inline]
    pub fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> QcError {
        let path = path.to_path_buf();
        move |source| QcError::Io { path, source }
    }
}
