pub mod duplication;
pub mod gc_model;

use crate::{
    config::{Contaminant, Metric, MetricLimits, QcConfig},
    errors::QcError,
    qc::{
        decode_kmer,
        stats::{KMER_POSITIONS, QUAL_RANGE, QcStats},
    },
    report::{
        AdapterContent, BaseContent, KmerHit, OverrepresentedSeq, PositionQuality, ReportModel, Verdict, Verdicts,
    },
};
use std::cmp::Ordering;

/// Quantile fractions extracted per position, in ascending order.
const QUANTILES: [f64; 5] = [0.1, 0.25, 0.5, 0.75, 0.9];

/// Longest list of k-mer enrichment rows carried into the report.
const MAX_KMER_HITS: usize = 20;

const FILE_TYPE: &str = "Conventional base calls";
const ENCODING: &str = "Sanger / Illumina 1.9";

/// Derives the full report model from a frozen accumulator. Pure with respect
/// to its inputs: running it twice on the same state yields identical models.
pub fn summarize(stats: &QcStats, config: &QcConfig, filename: &str) -> Result<ReportModel, QcError> {
    let max_len = stats.max_read_length();
    let num_reads = stats.num_reads();

    // Number of reads with length >= p + 1, as a reverse prefix sum
    let mut cumulative = vec![0u64; max_len];
    let mut running = 0u64;
    for p in (0..max_len).rev() {
        running += stats.read_length_freq(p);
        cumulative[p] = running;
    }

    let total_bases: u64 = (0..max_len).map(|p| (p as u64 + 1) * stats.read_length_freq(p)).sum();
    let gc_bases: u64 = (0..max_len).map(|p| stats.base_count(p, 1) + stats.base_count(p, 3)).sum();
    let avg_read_length = if num_reads == 0 { 0 } else { total_bases / num_reads };
    let avg_gc = if total_bases == 0 {
        0.0
    } else {
        100.0 * gc_bases as f64 / total_bases as f64
    };

    let poor_cut = (config.poor_quality_threshold as usize).min(QUAL_RANGE);
    let num_poor: u64 = stats.quality_histogram()[..poor_cut].iter().sum();

    let min_read_length = if stats.empty_reads() > 0 {
        0
    } else {
        (0..max_len).find(|&p| stats.read_length_freq(p) > 0).map_or(0, |p| p + 1)
    };

    let per_base_quality: Vec<PositionQuality> = (0..max_len)
        .map(|p| position_quality(stats, p, cumulative[p]))
        .collect::<Result<_, _>>()?;
    let means: Vec<f64> = per_base_quality.iter().map(|pq| pq.mean).collect();

    let per_base_content: Vec<BaseContent> = (0..max_len)
        .map(|p| {
            let total = cumulative[p] as f64;
            BaseContent {
                a: 100.0 * stats.base_count(p, 0) as f64 / total,
                c: 100.0 * stats.base_count(p, 1) as f64 / total,
                t: 100.0 * stats.base_count(p, 2) as f64 / total,
                g: 100.0 * stats.base_count(p, 3) as f64 / total,
                n: 100.0 * stats.n_base_count(p) as f64 / total,
            }
        })
        .collect();

    let quality_histogram = observed_span(stats.quality_histogram());

    let mut length_distribution: Vec<(usize, u64)> = Vec::new();
    if stats.empty_reads() > 0 {
        length_distribution.push((0, stats.empty_reads()));
    }
    length_distribution.extend(
        (0..max_len)
            .filter(|&p| stats.read_length_freq(p) > 0)
            .map(|p| (p + 1, stats.read_length_freq(p))),
    );

    let duplication = duplication::duplication_summary(
        stats.sequence_counts().values().copied(),
        num_reads,
        stats.count_at_limit(),
    );

    let overrepresented = overrepresented(stats, config, num_reads);
    let adapter_content = adapter_content(stats, config, &cumulative, num_reads);
    let tile_quality = tile_quality(stats, &means);
    let kmer_hits = kmer_hits(stats, config, max_len);
    let gc_deviation_pct = 100.0 * gc_model::gc_deviation(stats.gc_histogram());

    let mut model = ReportModel {
        filename: filename.to_string(),
        file_type: FILE_TYPE.to_string(),
        encoding: ENCODING.to_string(),
        num_reads,
        num_poor,
        total_bases,
        avg_read_length,
        avg_gc,
        min_read_length,
        max_read_length: max_len,
        per_base_quality,
        tile_quality,
        quality_histogram,
        per_base_content,
        gc_histogram: *stats.gc_histogram(),
        gc_deviation_pct,
        length_distribution,
        duplication,
        overrepresented,
        adapter_content,
        kmer_hits,
        verdicts: Verdicts::new(),
    };
    model.verdicts = grade_model(&model, stats, config);

    Ok(model)
}

/// Mean and quantiles for one position's quality histogram. Each quantile is
/// the first quality at which the running count reaches its share of the
/// position's total.
fn position_quality(stats: &QcStats, p: usize, total: u64) -> Result<PositionQuality, QcError> {
    let mean = stats.quality_sum(p) as f64 / total as f64;

    let mut values = [0u32; 5];
    let mut next = 0;
    let mut running = 0u64;
    for q in 0..QUAL_RANGE {
        running += stats.position_quality_count(p, q);
        while next < QUANTILES.len() && running as f64 >= QUANTILES[next] * total as f64 {
            values[next] = q as u32;
            next += 1;
        }
    }
    if next < QUANTILES.len() {
        return Err(QcError::Invariant("position quality histogram does not cover its row total"));
    }

    Ok(PositionQuality {
        mean,
        median: values[2],
        lower_quartile: values[1],
        upper_quartile: values[3],
        decile_low: values[0],
        decile_high: values[4],
    })
}

/// Rows from the first to the last nonzero bucket, zeros in between included.
fn observed_span(histogram: &[u64; QUAL_RANGE]) -> Vec<(u32, u64)> {
    let Some(first) = histogram.iter().position(|&c| c > 0) else {
        return Vec::new();
    };
    // Cannot fail given `first`
    let last = histogram.iter().rposition(|&c| c > 0).unwrap();

    (first..=last).map(|q| (q as u32, histogram[q])).collect()
}

fn overrepresented(stats: &QcStats, config: &QcConfig, num_reads: u64) -> Vec<OverrepresentedSeq> {
    let threshold = config.overrep_min_frac * num_reads as f64;

    let mut entries: Vec<OverrepresentedSeq> = stats
        .sequence_counts()
        .iter()
        .filter(|&(_, &count)| count as f64 > threshold)
        .map(|(prefix, &count)| OverrepresentedSeq {
            sequence:   String::from_utf8_lossy(prefix).into_owned(),
            count,
            percentage: 100.0 * count as f64 / num_reads as f64,
            source:     contaminant_source(prefix, &config.contaminants),
        })
        .collect();

    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.sequence.cmp(&b.sequence)));
    entries
}

fn contaminant_source(prefix: &[u8], contaminants: &[Contaminant]) -> Option<String> {
    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
    }

    contaminants
        .iter()
        .find(|c| contains(&c.sequence, prefix) || contains(prefix, &c.sequence))
        .map(|c| c.name.clone())
}

/// Cumulative adapter-prefix occurrence per position, as a percentage of the
/// read count.
fn adapter_content(stats: &QcStats, config: &QcConfig, cumulative: &[u64], num_reads: u64) -> AdapterContent {
    let mut content = AdapterContent {
        names: config.adapters.iter().map(|a| a.name.clone()).collect(),
        rows:  Vec::new(),
    };

    let mut running = vec![0u64; config.adapters.len()];
    for p in 0..cumulative.len().min(KMER_POSITIONS) {
        if cumulative[p] == 0 {
            break;
        }
        for (slot, adapter) in running.iter_mut().zip(&config.adapters) {
            *slot += stats.kmer_count(p, adapter.prefix_hash);
        }
        let row = running.iter().map(|&v| 100.0 * v as f64 / num_reads as f64).collect();
        content.rows.push((p, row));
    }

    content
}

/// Per-tile mean quality deviation from the positional mean, sorted by tile.
fn tile_quality(stats: &QcStats, means: &[f64]) -> Option<Vec<(u32, Vec<f64>)>> {
    let mut tiles: Vec<(u32, Vec<f64>)> = stats
        .tile_quality_sums()
        .iter()
        .filter_map(|(&tile, sums)| {
            let count = *stats.tile_counts().get(&tile)?;
            if count == 0 {
                return None;
            }
            let deviations = sums
                .iter()
                .enumerate()
                .map(|(p, &sum)| sum as f64 / count as f64 - means[p])
                .collect();
            Some((tile, deviations))
        })
        .collect();

    if tiles.is_empty() {
        return None;
    }
    tiles.sort_by_key(|&(tile, _)| tile);
    Some(tiles)
}

/// The most position-enriched k-mers: for each k-mer, its count at the
/// strongest position against the expectation of an even spread over the
/// covered positions.
fn kmer_hits(stats: &QcStats, config: &QcConfig, max_len: usize) -> Vec<KmerHit> {
    let positions = max_len.min(KMER_POSITIONS);
    if positions == 0 {
        return Vec::new();
    }

    let kmer_space = 1usize << (2 * config.kmer_len);
    let mut totals = vec![0u64; kmer_space];
    let mut max_at = vec![(0u64, 0usize); kmer_space];
    for p in 0..positions {
        for (hash, &count) in stats.kmer_row(p).iter().enumerate() {
            if count == 0 {
                continue;
            }
            totals[hash] += count;
            if count > max_at[hash].0 {
                max_at[hash] = (count, p);
            }
        }
    }

    let mut hits: Vec<KmerHit> = totals
        .iter()
        .enumerate()
        .filter(|&(_, &total)| total > 0)
        .map(|(hash, &total)| {
            let (max_count, max_pos) = max_at[hash];
            let expected = total as f64 / positions as f64;
            KmerHit {
                sequence:     decode_kmer(hash as u64, config.kmer_len),
                count:        total,
                obs_exp_max:  max_count as f64 / expected,
                max_position: max_pos + 1,
            }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.obs_exp_max
            .partial_cmp(&a.obs_exp_max)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.sequence.cmp(&b.sequence))
    });
    hits.truncate(MAX_KMER_HITS);
    hits
}

fn grade_high(value: f64, limits: MetricLimits) -> Verdict {
    if value > limits.error {
        Verdict::Fail
    } else if value > limits.warn {
        Verdict::Warn
    } else {
        Verdict::Pass
    }
}

fn grade_low(value: f64, limits: MetricLimits) -> Verdict {
    if value < limits.error {
        Verdict::Fail
    } else if value < limits.warn {
        Verdict::Warn
    } else {
        Verdict::Pass
    }
}

/// Grades each non-ignored metric against its thresholds, taking the worst
/// sample across positions where the metric is positional.
fn grade_model(model: &ReportModel, stats: &QcStats, config: &QcConfig) -> Verdicts {
    let limits = &config.limits;
    let mut verdicts = Verdicts::new();

    if !limits.is_ignored(Metric::QualityBaseLower) {
        let verdict = model
            .per_base_quality
            .iter()
            .map(|pq| grade_low(pq.lower_quartile as f64, limits.get(Metric::QualityBaseLower)))
            .max()
            .unwrap_or(Verdict::Pass);
        verdicts.set(Metric::QualityBaseLower, verdict);
    }

    if !limits.is_ignored(Metric::QualityBaseMedian) {
        let verdict = model
            .per_base_quality
            .iter()
            .map(|pq| grade_low(pq.median as f64, limits.get(Metric::QualityBaseMedian)))
            .max()
            .unwrap_or(Verdict::Pass);
        verdicts.set(Metric::QualityBaseMedian, verdict);
    }

    if !limits.is_ignored(Metric::Sequence) {
        let worst = model
            .per_base_content
            .iter()
            .map(|row| (row.a - row.t).abs().max((row.g - row.c).abs()))
            .fold(0.0f64, f64::max);
        verdicts.set(Metric::Sequence, grade_high(worst, limits.get(Metric::Sequence)));
    }

    if !limits.is_ignored(Metric::NContent) {
        let worst = model.per_base_content.iter().map(|row| row.n).fold(0.0f64, f64::max);
        verdicts.set(Metric::NContent, grade_high(worst, limits.get(Metric::NContent)));
    }

    if !limits.is_ignored(Metric::QualitySequence) {
        // The most common mean read quality
        let mode = model
            .quality_histogram
            .iter()
            .max_by_key(|&&(_, count)| count)
            .map(|&(q, _)| q);
        if let Some(mode) = mode {
            verdicts.set(
                Metric::QualitySequence,
                grade_low(mode as f64, limits.get(Metric::QualitySequence)),
            );
        } else {
            verdicts.set(Metric::QualitySequence, Verdict::Pass);
        }
    }

    if !limits.is_ignored(Metric::GcSequence) {
        verdicts.set(
            Metric::GcSequence,
            grade_high(model.gc_deviation_pct, limits.get(Metric::GcSequence)),
        );
    }

    if !limits.is_ignored(Metric::SequenceLength) {
        let limit = limits.get(Metric::SequenceLength);
        let verdict = if stats.empty_reads() > 0 && limit.error != 0.0 {
            Verdict::Fail
        } else if model.min_read_length != model.max_read_length && model.num_reads > 0 && limit.warn != 0.0 {
            Verdict::Warn
        } else {
            Verdict::Pass
        };
        verdicts.set(Metric::SequenceLength, verdict);
    }

    if !limits.is_ignored(Metric::Duplication) {
        verdicts.set(
            Metric::Duplication,
            grade_low(model.duplication.total_deduplicated_pct, limits.get(Metric::Duplication)),
        );
    }

    if !limits.is_ignored(Metric::Overrepresented) {
        let worst = model.overrepresented.iter().map(|o| o.percentage).fold(0.0f64, f64::max);
        verdicts.set(Metric::Overrepresented, grade_high(worst, limits.get(Metric::Overrepresented)));
    }

    if !limits.is_ignored(Metric::Adapter) {
        let worst = model
            .adapter_content
            .rows
            .iter()
            .flat_map(|(_, row)| row.iter().copied())
            .fold(0.0f64, f64::max);
        verdicts.set(Metric::Adapter, grade_high(worst, limits.get(Metric::Adapter)));
    }

    if !limits.is_ignored(Metric::Tile)
        && let Some(tiles) = &model.tile_quality
    {
        // The deepest drop below the positional mean
        let worst = tiles
            .iter()
            .flat_map(|(_, deviations)| deviations.iter().map(|&d| -d))
            .fold(0.0f64, f64::max);
        verdicts.set(Metric::Tile, grade_high(worst, limits.get(Metric::Tile)));
    }

    if !limits.is_ignored(Metric::Kmer) {
        let verdict = match model.kmer_hits.first() {
            Some(best) => grade_high(best.obs_exp_max.log2(), limits.get(Metric::Kmer)),
            None => Verdict::Pass,
        };
        verdicts.set(Metric::Kmer, verdict);
    }

    verdicts
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::QcConfig;

    fn ingest(stats: &mut QcStats, seq: &[u8], qual: &[u8]) {
        stats.begin_record();
        for &b in seq {
            stats.push_sequence_byte(b);
        }
        for &b in qual {
            stats.push_quality_byte(b).unwrap();
        }
        stats.end_record().unwrap();
    }

    fn config() -> QcConfig {
        QcConfig::new(4).unwrap()
    }

    #[test]
    fn empty_input_summarizes_without_failures() {
        let mut stats = QcStats::new(4, 33);
        stats.finish();
        let model = summarize(&stats, &config(), "empty.fastq").unwrap();

        assert_eq!(model.num_reads, 0);
        assert_eq!(model.total_bases, 0);
        assert!(model.per_base_quality.is_empty());
        assert!(model.length_distribution.is_empty());
        assert_eq!(model.duplication.total_deduplicated_pct, 100.0);
        for metric in Metric::ALL {
            assert_ne!(model.verdicts.get(metric), Some(Verdict::Fail), "{}", metric.name());
            assert_ne!(model.verdicts.get(metric), Some(Verdict::Warn), "{}", metric.name());
        }
    }

    #[test]
    fn single_record_summary_fields() {
        let mut stats = QcStats::new(4, 33);
        ingest(&mut stats, b"ACGT", b"IIII");
        stats.finish();
        let model = summarize(&stats, &config(), "one.fastq").unwrap();

        assert_eq!(model.num_reads, 1);
        assert_eq!(model.avg_read_length, 4);
        assert_eq!(model.avg_gc, 50.0);
        assert_eq!(model.min_read_length, 4);
        assert_eq!(model.max_read_length, 4);
        assert_eq!(model.gc_histogram[50], 1);
        assert_eq!(model.quality_histogram, vec![(40, 1)]);
        assert_eq!(model.length_distribution, vec![(4, 1)]);

        for pq in &model.per_base_quality {
            assert_eq!(pq.mean, 40.0);
            assert_eq!(pq.median, 40);
            assert_eq!(pq.lower_quartile, 40);
            assert_eq!(pq.upper_quartile, 40);
            assert_eq!(pq.decile_low, 40);
            assert_eq!(pq.decile_high, 40);
        }
    }

    #[test]
    fn base_percentages_sum_to_one_hundred() {
        let mut stats = QcStats::new(4, 33);
        ingest(&mut stats, b"ACGTNN", b"IIIIII");
        ingest(&mut stats, b"AAT", b"III");
        ingest(&mut stats, b"GGCCGGCC", b"IIIIIIII");
        stats.finish();
        let model = summarize(&stats, &config(), "mixed.fastq").unwrap();

        for (p, row) in model.per_base_content.iter().enumerate() {
            let sum = row.a + row.c + row.g + row.t + row.n;
            assert!((sum - 100.0).abs() < 1e-6, "position {p}: {sum}");
        }
    }

    #[test]
    fn summarization_is_idempotent() {
        let mut stats = QcStats::new(4, 33);
        ingest(&mut stats, b"ACGTACGT", b"IIIIIIII");
        ingest(&mut stats, b"NNACGTNN", b"!!IIII!!");
        stats.finish();

        let first = summarize(&stats, &config(), "reads.fastq").unwrap();
        let second = summarize(&stats, &config(), "reads.fastq").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn heavy_duplication_fails_the_duplication_metric() {
        let mut stats = QcStats::new(4, 33);
        for _ in 0..100 {
            ingest(&mut stats, b"ACGTACGT", b"IIIIIIII");
        }
        stats.finish();
        let model = summarize(&stats, &config(), "dups.fastq").unwrap();

        assert_eq!(model.duplication.total_deduplicated_pct, 1.0);
        assert_eq!(model.verdicts.get(Metric::Duplication), Some(Verdict::Fail));
        assert_eq!(model.verdicts.get(Metric::Overrepresented), Some(Verdict::Fail));
    }

    #[test]
    fn low_quality_reads_fail_the_per_base_quality_metrics() {
        let mut stats = QcStats::new(4, 33);
        for _ in 0..4 {
            ingest(&mut stats, b"ACGT", b"!!!!");
        }
        stats.finish();
        let model = summarize(&stats, &config(), "poor.fastq").unwrap();

        assert_eq!(model.verdicts.get(Metric::QualityBaseLower), Some(Verdict::Fail));
        assert_eq!(model.verdicts.get(Metric::QualityBaseMedian), Some(Verdict::Fail));
        assert_eq!(model.num_poor, 4);
    }

    #[test]
    fn mixed_lengths_warn_the_length_metric() {
        let mut stats = QcStats::new(4, 33);
        ingest(&mut stats, b"ACGT", b"IIII");
        ingest(&mut stats, b"ACGTAC", b"IIIIII");
        stats.finish();
        let model = summarize(&stats, &config(), "lengths.fastq").unwrap();

        assert_eq!(model.verdicts.get(Metric::SequenceLength), Some(Verdict::Warn));
    }

    #[test]
    fn ignored_metrics_are_skipped() {
        let mut stats = QcStats::new(4, 33);
        ingest(&mut stats, b"ACGT", b"IIII");
        stats.finish();

        let mut config = config();
        let mut text = String::new();
        for metric in Metric::ALL {
            text.push_str(&format!("{name} warn 10\n{name} error 20\n", name = metric.name()));
        }
        text.push_str("duplication ignore 1\n");
        config.limits = crate::config::Limits::parse(&text, "limits.txt").unwrap();

        let model = summarize(&stats, &config, "reads.fastq").unwrap();
        assert_eq!(model.verdicts.get(Metric::Duplication), None);
    }

    #[test]
    fn adapter_content_accumulates_by_position() {
        let mut config = config();
        config.adapters = vec![crate::config::Adapter {
            name:        "Test Adapter".to_string(),
            prefix_hash: crate::qc::hash_kmer(b"ACGT"),
        }];

        let mut stats = QcStats::new(4, 33);
        // Record 0 is k-mer sampled; ACGT ends at positions 3 and 7
        ingest(&mut stats, b"ACGTACGT", b"IIIIIIII");
        stats.finish();

        let model = summarize(&stats, &config, "adapters.fastq").unwrap();
        assert_eq!(model.adapter_content.rows.len(), 8);
        let shares: Vec<f64> = model.adapter_content.rows.iter().map(|(_, row)| row[0]).collect();
        assert_eq!(shares, vec![0.0, 0.0, 0.0, 100.0, 100.0, 100.0, 100.0, 200.0]);
    }

    #[test]
    fn contaminant_sources_are_matched_by_substring() {
        let contaminants = vec![Contaminant {
            name:     "Synthetic Vector".to_string(),
            sequence: b"TTACGTACGTTT".to_vec(),
        }];
        assert_eq!(
            contaminant_source(b"ACGTACGT", &contaminants).as_deref(),
            Some("Synthetic Vector")
        );
        assert_eq!(contaminant_source(b"GGGGGGGG", &contaminants), None);
    }
}
