use crate::{
    errors::QcError,
    io::source::{LineSource, RecordSource},
    qc::stats::QcStats,
};

/// Number of tab-delimited alignment metadata fields between the record
/// identifier and the sequence.
const ALIGN_SKIP_FIELDS: usize = 8;

/// Resolves and applies the tile split point across a scan.
///
/// The split point is chosen once, on the first sampled header: six or more
/// colons select field index 4, four or more select field index 2, anything
/// else disables per-tile statistics for the rest of the run. Later sampled
/// headers only parse the chosen field.
pub(crate) struct TileTracker {
    mode: TileMode,
}

enum TileMode {
    Undecided,
    Field(usize),
    Disabled,
}

impl TileTracker {
    pub(crate) fn new() -> Self {
        TileTracker { mode: TileMode::Undecided }
    }

    /// Whether tile extraction is still worth attempting.
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self.mode, TileMode::Disabled)
    }

    /// Extracts the tile number from a sampled header. Non-numeric fields
    /// yield `None` and are dropped, like out-of-range tile values.
    pub(crate) fn extract(&mut self, header: &[u8]) -> Option<u32> {
        let field = match self.mode {
            TileMode::Field(field) => field,
            TileMode::Disabled => return None,
            TileMode::Undecided => {
                let colons = header.iter().filter(|&&b| b == b':').count();
                let field = if colons >= 6 {
                    4
                } else if colons >= 4 {
                    2
                } else {
                    self.mode = TileMode::Disabled;
                    return None;
                };
                self.mode = TileMode::Field(field);
                field
            }
        };

        let bytes = header.split(|&b| b == b':').nth(field)?;
        std::str::from_utf8(bytes).ok()?.parse().ok()
    }
}

/// Drives a full scan of `source` into `stats`, dispatching on the record
/// shape. The accumulator is frozen before returning.
pub fn scan(source: &mut RecordSource, stats: &mut QcStats) -> Result<(), QcError> {
    let mut tiles = TileTracker::new();

    if source.is_alignment() {
        scan_alignment(source, stats, &mut tiles)?;
    } else {
        scan_fastq(source, stats, &mut tiles)?;
    }

    stats.finish();
    Ok(())
}

#[inline]
fn malformed(stats: &QcStats, reason: &'static str) -> QcError {
    QcError::MalformedRecord {
        record: stats.num_reads() + 1,
        reason,
    }
}

/// Four-line records: identifier, sequence, quality descriptor (skipped),
/// quality.
fn scan_fastq(source: &mut impl LineSource, stats: &mut QcStats, tiles: &mut TileTracker) -> Result<(), QcError> {
    loop {
        stats.begin_record();

        let Some(header) = source.next_line()? else { break };
        if header.is_empty() {
            break;
        }
        if stats.is_tile_sampled()
            && tiles.enabled()
            && let Some(tile) = tiles.extract(header)
        {
            stats.set_tile(tile);
        }

        let Some(sequence) = source.next_line()? else {
            return Err(malformed(stats, "input ends before the sequence line"));
        };
        for &byte in sequence {
            stats.push_sequence_byte(byte);
        }

        if source.next_line()?.is_none() {
            return Err(malformed(stats, "input ends before the quality descriptor line"));
        }

        let Some(quality) = source.next_line()? else {
            return Err(malformed(stats, "input ends before the quality line"));
        };
        for &byte in quality {
            stats.push_quality_byte(byte).map_err(|reason| malformed(stats, reason))?;
        }

        stats.end_record().map_err(|reason| malformed(stats, reason))?;
    }

    Ok(())
}

/// Tab-delimited alignment records: `@`-prefixed header lines are skipped;
/// per record the identifier comes first, eight metadata fields are skipped,
/// the sequence follows, and the quality runs to the end of the line. There
/// is no quality descriptor line in this layout.
fn scan_alignment(source: &mut impl LineSource, stats: &mut QcStats, tiles: &mut TileTracker) -> Result<(), QcError> {
    let mut in_header = true;

    loop {
        stats.begin_record();

        let Some(line) = source.next_line()? else { break };
        if line.is_empty() {
            break;
        }
        if in_header && line[0] == b'@' {
            continue;
        }
        in_header = false;

        let mut fields = line.splitn(ALIGN_SKIP_FIELDS + 3, |&b| b == b'\t');

        // `splitn` always yields a first chunk
        let identifier = fields.next().unwrap();
        if stats.is_tile_sampled()
            && tiles.enabled()
            && let Some(tile) = tiles.extract(identifier)
        {
            stats.set_tile(tile);
        }

        for _ in 0..ALIGN_SKIP_FIELDS {
            if fields.next().is_none() {
                return Err(malformed(stats, "alignment record has too few fields"));
            }
        }

        let Some(sequence) = fields.next() else {
            return Err(malformed(stats, "alignment record is missing its sequence field"));
        };
        for &byte in sequence {
            stats.push_sequence_byte(byte);
        }

        let Some(quality) = fields.next() else {
            return Err(malformed(stats, "alignment record is missing its quality field"));
        };
        for &byte in quality {
            stats.push_quality_byte(byte).map_err(|reason| malformed(stats, reason))?;
        }

        stats.end_record().map_err(|reason| malformed(stats, reason))?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    struct MemLines {
        lines: Vec<Vec<u8>>,
        pos:   usize,
    }

    impl MemLines {
        fn new(text: &str) -> Self {
            MemLines {
                lines: text.lines().map(|l| l.as_bytes().to_vec()).collect(),
                pos:   0,
            }
        }
    }

    impl LineSource for MemLines {
        fn next_line(&mut self) -> Result<Option<&[u8]>, QcError> {
            let line = self.lines.get(self.pos).map(|l| l.as_slice());
            self.pos += 1;
            Ok(line)
        }
    }

    #[test]
    fn fastq_records_feed_the_accumulator() {
        let mut source = MemLines::new("@r1\nACGT\n+\nIIII\n@r2\nGG\n+\nII\n");
        let mut stats = QcStats::new(2, 33);
        scan_fastq(&mut source, &mut stats, &mut TileTracker::new()).unwrap();
        stats.finish();

        assert_eq!(stats.num_reads(), 2);
        assert_eq!(stats.max_read_length(), 4);
        assert_eq!(stats.read_length_freq(1), 1);
        assert_eq!(stats.read_length_freq(3), 1);
    }

    #[test]
    fn truncated_fastq_record_is_malformed() {
        let mut source = MemLines::new("@r1\nACGT\n+\n");
        let mut stats = QcStats::new(2, 33);
        let err = scan_fastq(&mut source, &mut stats, &mut TileTracker::new()).unwrap_err();
        assert!(matches!(err, QcError::MalformedRecord { record: 1, .. }), "{err}");
    }

    #[test]
    fn mismatched_quality_length_is_malformed() {
        let mut source = MemLines::new("@r1\nACGT\n+\nIII\n");
        let mut stats = QcStats::new(2, 33);
        assert!(scan_fastq(&mut source, &mut stats, &mut TileTracker::new()).is_err());
    }

    #[test]
    fn alignment_records_skip_headers_and_metadata() {
        let mut source = MemLines::new(
            "@HD\tVN:1.6\n@SQ\tSN:chr1\tLN:1000\nr1\t0\tchr1\t1\t60\t4M\t*\t0\t0\tACGT\tIIII\n",
        );
        let mut stats = QcStats::new(2, 33);
        scan_alignment(&mut source, &mut stats, &mut TileTracker::new()).unwrap();
        stats.finish();

        assert_eq!(stats.num_reads(), 1);
        assert_eq!(stats.max_read_length(), 4);
        assert_eq!(stats.base_count(0, 0), 1);
    }

    #[test]
    fn alignment_trailing_fields_fail_the_length_check() {
        // Quality runs to end of line, so extra trailing fields surface as a
        // sequence/quality length mismatch
        let mut source = MemLines::new("r1\t0\tchr1\t1\t60\t4M\t*\t0\t0\tACGT\tIIII\tNM:i:0\n");
        let mut stats = QcStats::new(2, 33);
        assert!(scan_alignment(&mut source, &mut stats, &mut TileTracker::new()).is_err());
    }

    #[test]
    fn tile_split_point_with_six_colons() {
        let mut tiles = TileTracker::new();
        assert_eq!(tiles.extract(b"@m:28:000-KP3NB:1:2101:10138:2117"), Some(2101));
        // Later sampled headers reuse the resolved field
        assert_eq!(tiles.extract(b"@m:28:000-KP3NB:1:2102:9:9"), Some(2102));
    }

    #[test]
    fn tile_split_point_with_four_colons() {
        let mut tiles = TileTracker::new();
        assert_eq!(tiles.extract(b"@m:1:2101:10138:2117"), Some(2101));
    }

    #[test]
    fn tiles_disable_permanently_without_enough_colons() {
        let mut tiles = TileTracker::new();
        assert_eq!(tiles.extract(b"@SRR000001.1"), None);
        assert!(!tiles.enabled());
        assert_eq!(tiles.extract(b"@m:1:2101:10138:2117"), None);
    }

    #[test]
    fn non_numeric_tile_fields_are_dropped() {
        let mut tiles = TileTracker::new();
        assert_eq!(tiles.extract(b"@m:1:tile:10138:2117"), None);
        assert!(tiles.enabled(), "the split point stays resolved");
        assert_eq!(tiles.extract(b"@m:1:7:1:1"), Some(7));
    }

    #[test]
    fn tile_extraction_only_on_sampled_records() {
        let mut stats = QcStats::new(2, 33);
        let mut tiles = TileTracker::new();
        let mut text = String::new();
        for i in 0..16 {
            text.push_str(&format!("@m:1:{}:0:0\nAA\n+\nII\n", 100 + i));
        }
        let mut source = MemLines::new(&text);
        scan_fastq(&mut source, &mut stats, &mut tiles).unwrap();
        stats.finish();

        // Records 0 and 8 are the sampled ones
        assert_eq!(stats.tile_counts().len(), 2);
        assert_eq!(stats.tile_counts().get(&100), Some(&1));
        assert_eq!(stats.tile_counts().get(&108), Some(&1));
    }
}
