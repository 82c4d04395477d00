use crate::errors::{ConfigError, QcError};
use std::{fs, path::Path, str::FromStr};

/// The closed set of graded metrics. Limits-file lines and report verdicts
/// both key on these names.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Metric {
    Duplication,
    Kmer,
    NContent,
    Overrepresented,
    QualityBaseLower,
    QualityBaseMedian,
    QualitySequence,
    Sequence,
    GcSequence,
    Tile,
    SequenceLength,
    Adapter,
}

pub const METRIC_COUNT: usize = 12;

impl Metric {
    pub const ALL: [Metric; METRIC_COUNT] = [
        Metric::Duplication,
        Metric::Kmer,
        Metric::NContent,
        Metric::Overrepresented,
        Metric::QualityBaseLower,
        Metric::QualityBaseMedian,
        Metric::QualitySequence,
        Metric::Sequence,
        Metric::GcSequence,
        Metric::Tile,
        Metric::SequenceLength,
        Metric::Adapter,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Metric::Duplication => "duplication",
            Metric::Kmer => "kmer",
            Metric::NContent => "n_content",
            Metric::Overrepresented => "overrepresented",
            Metric::QualityBaseLower => "quality_base_lower",
            Metric::QualityBaseMedian => "quality_base_median",
            Metric::QualitySequence => "quality_sequence",
            Metric::Sequence => "sequence",
            Metric::GcSequence => "gc_sequence",
            Metric::Tile => "tile",
            Metric::SequenceLength => "sequence_length",
            Metric::Adapter => "adapter",
        }
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.name() == s)
            .ok_or_else(|| ConfigError::UnknownMetric(s.to_string()))
    }
}

/// Warn and error thresholds for one metric, plus whether the metric is
/// skipped outright.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MetricLimits {
    pub warn:   f64,
    pub error:  f64,
    pub ignore: bool,
}

/// The full warn/error/ignore table over the closed metric set.
#[derive(Clone, Debug)]
pub struct Limits {
    table: [MetricLimits; METRIC_COUNT],
}

impl Limits {
    #[inline]
    pub fn get(&self, metric: Metric) -> MetricLimits {
        self.table[metric as usize]
    }

    #[inline]
    pub fn is_ignored(&self, metric: Metric) -> bool {
        self.get(metric).ignore
    }

    /// Loads a limits file: `#`-prefixed comment lines, and data lines of the
    /// form `<metric-name> <warn|error|ignore> <number>`.
    ///
    /// ## Errors
    ///
    /// IO failures carry the path. Unknown metric names, unknown instruction
    /// words, malformed lines, or a metric missing either of its thresholds
    /// are configuration errors.
    pub fn from_file(path: &Path) -> Result<Self, QcError> {
        let text = fs::read_to_string(path).map_err(QcError::io_at(path))?;
        Limits::parse(&text, &path.display().to_string()).map_err(QcError::from)
    }

    pub(crate) fn parse(text: &str, file: &str) -> Result<Self, ConfigError> {
        let mut warn = [None; METRIC_COUNT];
        let mut error = [None; METRIC_COUNT];
        let mut ignore = [false; METRIC_COUNT];

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let malformed = |reason: &str| ConfigError::MalformedLine {
                file:   file.to_string(),
                line:   number + 1,
                reason: reason.to_string(),
            };

            let mut tokens = line.split_whitespace();
            let (Some(name), Some(instruction), Some(value), None) =
                (tokens.next(), tokens.next(), tokens.next(), tokens.next())
            else {
                return Err(malformed("expected `<metric> <warn|error|ignore> <number>`"));
            };

            let metric = Metric::from_str(name)?;
            let value: f64 = value.parse().map_err(|_| malformed("threshold is not a number"))?;

            match instruction {
                "warn" => warn[metric as usize] = Some(value),
                "error" => error[metric as usize] = Some(value),
                "ignore" => ignore[metric as usize] = value != 0.0,
                other => {
                    return Err(ConfigError::UnknownInstruction {
                        metric:      name.to_string(),
                        instruction: other.to_string(),
                    });
                }
            }
        }

        let mut table = [MetricLimits {
            warn:   0.0,
            error:  0.0,
            ignore: false,
        }; METRIC_COUNT];
        for metric in Metric::ALL {
            let i = metric as usize;
            let (Some(warn), Some(error)) = (warn[i], error[i]) else {
                return Err(ConfigError::MissingMetric(metric.name()));
            };
            table[i] = MetricLimits {
                warn,
                error,
                ignore: ignore[i],
            };
        }

        Ok(Limits { table })
    }
}

impl Default for Limits {
    /// The stock thresholds used when no limits file is given.
    fn default() -> Self {
        let mut table = [MetricLimits {
            warn:   0.0,
            error:  0.0,
            ignore: false,
        }; METRIC_COUNT];

        let defaults: [(Metric, f64, f64); METRIC_COUNT] = [
            (Metric::Duplication, 70.0, 50.0),
            (Metric::Kmer, 2.0, 5.0),
            (Metric::NContent, 5.0, 20.0),
            (Metric::Overrepresented, 0.1, 1.0),
            (Metric::QualityBaseLower, 10.0, 5.0),
            (Metric::QualityBaseMedian, 25.0, 20.0),
            (Metric::QualitySequence, 27.0, 20.0),
            (Metric::Sequence, 10.0, 20.0),
            (Metric::GcSequence, 15.0, 30.0),
            (Metric::Tile, 5.0, 10.0),
            (Metric::SequenceLength, 1.0, 1.0),
            (Metric::Adapter, 5.0, 10.0),
        ];
        for (metric, warn, error) in defaults {
            table[metric as usize] = MetricLimits {
                warn,
                error,
                ignore: false,
            };
        }

        Limits { table }
    }
}
