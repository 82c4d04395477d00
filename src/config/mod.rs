pub mod adapters;
pub mod limits;

pub use adapters::{Adapter, Contaminant, default_adapters, load_adapters, load_contaminants};
pub use limits::{Limits, Metric, MetricLimits};

use crate::errors::ConfigError;

pub const DEFAULT_KMER_LEN: usize = 7;
pub const DEFAULT_POOR_QUALITY: u8 = 20;
pub const DEFAULT_OVERREP_MIN_FRAC: f64 = 0.001;

/// ASCII offset subtracted from quality bytes.
pub const QUALITY_OFFSET: u8 = 33;

/// Everything the engine needs to know before a scan: analysis parameters,
/// the verdict thresholds, and the adapter and contaminant tables.
#[derive(Clone, Debug)]
pub struct QcConfig {
    pub kmer_len:               usize,
    pub poor_quality_threshold: u8,
    pub overrep_min_frac:       f64,
    pub quality_offset:         u8,
    pub limits:                 Limits,
    pub adapters:               Vec<Adapter>,
    pub contaminants:           Vec<Contaminant>,
}

impl QcConfig {
    /// Builds a configuration with stock limits, stock adapters, and no
    /// contaminants.
    ///
    /// ## Errors
    ///
    /// The k-mer length must be between 2 and 10.
    pub fn new(kmer_len: usize) -> Result<Self, ConfigError> {
        if !(2..=10).contains(&kmer_len) {
            return Err(ConfigError::KmerLength(kmer_len));
        }

        Ok(QcConfig {
            kmer_len,
            poor_quality_threshold: DEFAULT_POOR_QUALITY,
            overrep_min_frac: DEFAULT_OVERREP_MIN_FRAC,
            quality_offset: QUALITY_OFFSET,
            limits: Limits::default(),
            adapters: default_adapters(kmer_len),
            contaminants: Vec::new(),
        })
    }
}
