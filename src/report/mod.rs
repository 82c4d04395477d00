pub mod html;
pub mod text;

use crate::{
    config::limits::{METRIC_COUNT, Metric},
    summary::duplication::DuplicationSummary,
};

/// Outcome of grading one metric against its thresholds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl Verdict {
    pub const fn label(self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Warn => "warn",
            Verdict::Fail => "fail",
        }
    }
}

/// Verdicts over the closed metric set. `None` means the metric was ignored
/// or had no data, and its report module is skipped. Repeated observations
/// can escalate a verdict but never de-escalate it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Verdicts {
    table: [Option<Verdict>; METRIC_COUNT],
}

impl Verdicts {
    pub fn new() -> Self {
        Verdicts::default()
    }

    pub fn set(&mut self, metric: Metric, verdict: Verdict) {
        let slot = &mut self.table[metric as usize];
        *slot = Some(slot.map_or(verdict, |previous| previous.max(verdict)));
    }

    pub fn get(&self, metric: Metric) -> Option<Verdict> {
        self.table[metric as usize]
    }

    /// The worse of two metrics' verdicts, for modules graded by a pair of
    /// limits.
    pub fn combined(&self, a: Metric, b: Metric) -> Option<Verdict> {
        match (self.get(a), self.get(b)) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (Some(x), None) | (None, Some(x)) => Some(x),
            (None, None) => None,
        }
    }
}

/// Quality distribution at one read position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionQuality {
    pub mean:           f64,
    pub median:         u32,
    pub lower_quartile: u32,
    pub upper_quartile: u32,
    pub decile_low:     u32,
    pub decile_high:    u32,
}

/// Base composition percentages at one read position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BaseContent {
    pub a: f64,
    pub c: f64,
    pub g: f64,
    pub t: f64,
    pub n: f64,
}

/// One entry of the overrepresented-sequences module.
#[derive(Clone, Debug, PartialEq)]
pub struct OverrepresentedSeq {
    pub sequence:   String,
    pub count:      u64,
    pub percentage: f64,
    pub source:     Option<String>,
}

/// Cumulative adapter-prefix percentages: one row per position, one column
/// per configured adapter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdapterContent {
    pub names: Vec<String>,
    pub rows:  Vec<(usize, Vec<f64>)>,
}

/// A k-mer with its strongest positional enrichment.
#[derive(Clone, Debug, PartialEq)]
pub struct KmerHit {
    pub sequence:     String,
    pub count:        u64,
    pub obs_exp_max:  f64,
    pub max_position: usize,
}

/// The inert record the report writers consume. Fields mirror the summarizer
/// outputs; there is no logic here beyond assembly.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportModel {
    pub filename:  String,
    pub file_type: String,
    pub encoding:  String,

    pub num_reads:       u64,
    pub num_poor:        u64,
    pub total_bases:     u64,
    pub avg_read_length: u64,
    pub avg_gc:          f64,
    pub min_read_length: usize,
    pub max_read_length: usize,

    pub per_base_quality:    Vec<PositionQuality>,
    pub tile_quality:        Option<Vec<(u32, Vec<f64>)>>,
    pub quality_histogram:   Vec<(u32, u64)>,
    pub per_base_content:    Vec<BaseContent>,
    pub gc_histogram:        [u64; 101],
    pub gc_deviation_pct:    f64,
    pub length_distribution: Vec<(usize, u64)>,
    pub duplication:         DuplicationSummary,
    pub overrepresented:     Vec<OverrepresentedSeq>,
    pub adapter_content:     AdapterContent,
    pub kmer_hits:           Vec<KmerHit>,

    pub verdicts: Verdicts,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verdicts_escalate_and_never_deescalate() {
        let mut verdicts = Verdicts::new();
        verdicts.set(Metric::Adapter, Verdict::Warn);
        verdicts.set(Metric::Adapter, Verdict::Fail);
        assert_eq!(verdicts.get(Metric::Adapter), Some(Verdict::Fail));

        verdicts.set(Metric::Adapter, Verdict::Pass);
        assert_eq!(verdicts.get(Metric::Adapter), Some(Verdict::Fail));
    }

    #[test]
    fn combined_takes_the_worse_verdict() {
        let mut verdicts = Verdicts::new();
        assert_eq!(verdicts.combined(Metric::QualityBaseLower, Metric::QualityBaseMedian), None);

        verdicts.set(Metric::QualityBaseMedian, Verdict::Warn);
        assert_eq!(
            verdicts.combined(Metric::QualityBaseLower, Metric::QualityBaseMedian),
            Some(Verdict::Warn)
        );

        verdicts.set(Metric::QualityBaseLower, Verdict::Fail);
        assert_eq!(
            verdicts.combined(Metric::QualityBaseLower, Metric::QualityBaseMedian),
            Some(Verdict::Fail)
        );
    }
}
