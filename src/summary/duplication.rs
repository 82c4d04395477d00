use std::collections::BTreeMap;

/// Number of duplication buckets: occurrence counts 1..=9 map to their own
/// buckets, then >=10, >=50, >=100, >=500, >=1000, >=5000, >=10000.
pub const DUPLICATION_BUCKETS: usize = 16;

/// Display labels for the duplication buckets, in bucket order.
pub const BUCKET_LABELS: [&str; DUPLICATION_BUCKETS] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", ">10", ">50", ">100", ">500", ">1k", ">5k", ">10k",
];

const BUCKET_THRESHOLDS: [u64; 7] = [10, 50, 100, 500, 1000, 5000, 10000];

/// Duplication summary derived from the capped prefix map: per-bucket shares
/// of unique sequences and of total observations, both after extrapolation,
/// plus the overall percentage of the library remaining if deduplicated.
#[derive(Clone, Debug, PartialEq)]
pub struct DuplicationSummary {
    pub pct_deduplicated:      [f64; DUPLICATION_BUCKETS],
    pub pct_total:             [f64; DUPLICATION_BUCKETS],
    pub total_deduplicated_pct: f64,
}

fn bucket_index(occurrences: u64) -> usize {
    if occurrences <= 9 {
        (occurrences - 1) as usize
    } else {
        let above = BUCKET_THRESHOLDS.iter().take_while(|&&t| occurrences >= t).count();
        8 + above
    }
}

/// Extrapolates an observed count of distinct sequences seen `occurrences`
/// times each to the count that a scan without the unique-key cap would have
/// seen.
///
/// `count_at_limit` is the number of reads that had been scanned when the cap
/// was reached (the whole scan if it never was). The correction divides the
/// observed count by the probability that a sequence of this duplication
/// level was seen at least once among those reads, with an early exit to
/// certainty once the complement becomes negligible.
pub fn corrected_count(occurrences: u64, observed: f64, num_reads: u64, count_at_limit: u64) -> f64 {
    if count_at_limit == num_reads {
        return observed;
    }
    if (num_reads as f64) - observed < count_at_limit as f64 {
        return observed;
    }

    let limit_of_caring = 1.0 - observed / (observed + 0.01);
    let mut p_not_seen = 1.0f64;
    for i in 0..count_at_limit {
        let remaining = num_reads as f64 - i as f64;
        p_not_seen *= (remaining - occurrences as f64) / remaining;
        if p_not_seen < limit_of_caring {
            p_not_seen = 0.0;
            break;
        }
    }

    observed / (1.0 - p_not_seen)
}

/// Groups the prefix map's occurrence counts by duplication level, corrects
/// each level, and folds them into the sixteen report buckets.
pub fn duplication_summary(
    occurrence_counts: impl Iterator<Item = u64>, num_reads: u64, count_at_limit: u64,
) -> DuplicationSummary {
    let mut counts_by_freq: BTreeMap<u64, u64> = BTreeMap::new();
    for occurrences in occurrence_counts {
        *counts_by_freq.entry(occurrences).or_insert(0) += 1;
    }

    let mut dedup_buckets = [0.0f64; DUPLICATION_BUCKETS];
    let mut total_buckets = [0.0f64; DUPLICATION_BUCKETS];
    for (&occurrences, &observed) in &counts_by_freq {
        let corrected = corrected_count(occurrences, observed as f64, num_reads, count_at_limit);
        let bucket = bucket_index(occurrences);
        dedup_buckets[bucket] += corrected;
        total_buckets[bucket] += corrected * occurrences as f64;
    }

    let dedup_sum: f64 = dedup_buckets.iter().sum();
    let total_sum: f64 = total_buckets.iter().sum();

    let mut summary = DuplicationSummary {
        pct_deduplicated:      [0.0; DUPLICATION_BUCKETS],
        pct_total:             [0.0; DUPLICATION_BUCKETS],
        total_deduplicated_pct: 100.0,
    };
    if total_sum == 0.0 {
        return summary;
    }

    for bucket in 0..DUPLICATION_BUCKETS {
        summary.pct_deduplicated[bucket] = 100.0 * dedup_buckets[bucket] / dedup_sum;
        summary.pct_total[bucket] = 100.0 * total_buckets[bucket] / total_sum;
    }
    summary.total_deduplicated_pct = 100.0 * dedup_sum / total_sum;

    summary
}
