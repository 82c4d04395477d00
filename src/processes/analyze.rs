// Description:      Scan a sequencing read file once and emit text and HTML
//                   quality-control reports.

use crate::{
    config::{DEFAULT_KMER_LEN, DEFAULT_POOR_QUALITY, Limits, Metric, QcConfig, load_adapters, load_contaminants},
    errors::QcError,
    io::{InputFormat, create_report_writer, open_source},
    qc::{stats::QcStats, tokenizer::scan},
    report::{ReportModel, html::write_html, text::write_text},
    summary::summarize,
};
use clap::{Args, ValueHint};
use std::path::{Path, PathBuf};

static MODULE: &str = module_path!();

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Sequencing read file to analyze (FASTQ, gzipped FASTQ, or SAM).
    pub input: PathBuf,

    #[arg(short = 't', long, value_hint = ValueHint::FilePath)]
    /// Text report path. Defaults to `<input stem>_qc_data.txt`.
    pub text: Option<PathBuf>,

    #[arg(short = 'w', long, value_hint = ValueHint::FilePath)]
    /// HTML report path. Defaults to `<input stem>_qc_report.html`.
    pub html: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum)]
    /// Override the input format detected from the filename suffix.
    pub format: Option<InputFormat>,

    #[arg(short = 'k', long, default_value_t = DEFAULT_KMER_LEN)]
    /// K-mer length for adapter and enrichment accounting (2 to 10).
    pub kmer_length: usize,

    #[arg(short = 'p', long, default_value_t = DEFAULT_POOR_QUALITY)]
    /// Reads with a mean quality below this threshold are flagged as poor.
    pub poor_quality: u8,

    #[arg(long, value_hint = ValueHint::FilePath)]
    /// Limits file overriding the stock warn/error/ignore thresholds.
    pub limits: Option<PathBuf>,

    #[arg(long, value_hint = ValueHint::FilePath)]
    /// Adapters file overriding the stock adapter list.
    pub adapters: Option<PathBuf>,

    #[arg(long, value_hint = ValueHint::FilePath)]
    /// Contaminants file used to name overrepresented sequences.
    pub contaminants: Option<PathBuf>,

    #[arg(short, long)]
    /// Suppress the end-of-run summary lines.
    pub quiet: bool,
}

struct ParsedAnalyzeArgs {
    input:     PathBuf,
    format:    InputFormat,
    text_path: PathBuf,
    html_path: PathBuf,
    config:    QcConfig,
    quiet:     bool,
}

fn parse_analyze_args(args: AnalyzeArgs) -> Result<ParsedAnalyzeArgs, QcError> {
    let AnalyzeArgs {
        input,
        text,
        html,
        format,
        kmer_length,
        poor_quality,
        limits,
        adapters,
        contaminants,
        quiet,
    } = args;

    let format = match format {
        Some(format) => format,
        None => InputFormat::from_path(&input)?,
    };

    let mut config = QcConfig::new(kmer_length)?;
    config.poor_quality_threshold = poor_quality;
    if let Some(path) = limits {
        config.limits = Limits::from_file(&path)?;
    }

    // When adapter analysis is ignored, neither list is loaded
    if config.limits.is_ignored(Metric::Adapter) {
        config.adapters = Vec::new();
        config.contaminants = Vec::new();
    } else {
        if let Some(path) = adapters {
            config.adapters = load_adapters(&path, config.kmer_len)?;
        }
        if let Some(path) = contaminants {
            config.contaminants = load_contaminants(&path)?;
        }
    }

    let text_path = text.unwrap_or_else(|| derived_path(&input, "_qc_data.txt"));
    let html_path = html.unwrap_or_else(|| derived_path(&input, "_qc_report.html"));

    Ok(ParsedAnalyzeArgs {
        input,
        format,
        text_path,
        html_path,
        config,
        quiet,
    })
}

/// Places a report artifact next to the input, named from the input stem
/// (compound suffixes like `.fastq.gz` are fully stripped).
fn derived_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().and_then(|stem| stem.to_str()).unwrap_or("reads");
    let stem = stem
        .strip_suffix(".fastq")
        .or_else(|| stem.strip_suffix(".fq"))
        .unwrap_or(stem);
    input.with_file_name(format!("{stem}{suffix}"))
}

/// Sub-program for the single-pass quality-control scan.
pub fn analyze_process(args: AnalyzeArgs) -> Result<(), QcError> {
    let ParsedAnalyzeArgs {
        input,
        format,
        text_path,
        html_path,
        config,
        quiet,
    } = parse_analyze_args(args)?;

    let mut source = open_source(&input, format)?;
    let mut stats = QcStats::new(config.kmer_len, config.quality_offset);
    scan(&mut source, &mut stats)?;

    let filename = input.file_name().and_then(|name| name.to_str()).unwrap_or_default();
    let model = summarize(&stats, &config, filename)?;

    // A writer failure is reported without discarding the model or skipping
    // the other writer; the first failure becomes the process result
    let mut failure: Option<QcError> = None;
    for (path, write) in [
        (&text_path, write_text_report as fn(&Path, &ReportModel) -> Result<(), QcError>),
        (&html_path, write_html_report),
    ] {
        if let Err(error) = write(path, &model) {
            eprintln!("{MODULE} WARNING! Report writer failed: {error}");
            failure.get_or_insert(error);
        }
    }
    if let Some(error) = failure {
        return Err(error);
    }

    if !quiet {
        eprintln!(
            "{MODULE}: scanned {} reads ({} bases) from {}",
            stats.num_reads(),
            model.total_bases,
            input.display()
        );
        eprintln!("{MODULE}: wrote {} and {}", text_path.display(), html_path.display());
    }

    Ok(())
}

fn write_text_report(path: &Path, model: &ReportModel) -> Result<(), QcError> {
    let mut writer = create_report_writer(path)?;
    write_text(&mut writer, model).map_err(QcError::io_at(path))
}

fn write_html_report(path: &Path, model: &ReportModel) -> Result<(), QcError> {
    let mut writer = create_report_writer(path)?;
    write_html(&mut writer, model).map_err(QcError::io_at(path))
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use std::{fs, io::Write};

    const TWO_RECORDS: &str = "@r1\nACGT\n+\nIIII\n@r2\nGGCC\nIIII\n";

    fn args(input: PathBuf, dir: &Path) -> AnalyzeArgs {
        AnalyzeArgs {
            input,
            text: Some(dir.join("out.txt")),
            html: Some(dir.join("out.html")),
            format: None,
            kmer_length: 4,
            poor_quality: DEFAULT_POOR_QUALITY,
            limits: None,
            adapters: None,
            contaminants: None,
            quiet: true,
        }
    }

    #[test]
    fn plain_fastq_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reads.fastq");
        fs::write(&input, "@r1\nACGT\n+\nIIII\n@r2\nGGCC\n+\nIIII\n").unwrap();

        analyze_process(args(input, dir.path())).unwrap();

        let text = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert!(text.contains(">>Basic Statistics\tpass"));
        assert!(text.contains("Total Sequences\t2"));
        assert!(text.contains(">>END_MODULE"));

        let html = fs::read_to_string(dir.path().join("out.html")).unwrap();
        assert!(html.contains("<table>"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn gzipped_fastq_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reads.fastq.gz");
        let mut encoder = GzEncoder::new(fs::File::create(&input).unwrap(), Compression::default());
        encoder.write_all(b"@r1\nACGT\n+\nIIII\n").unwrap();
        encoder.finish().unwrap();

        analyze_process(args(input, dir.path())).unwrap();

        let text = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert!(text.contains("Total Sequences\t1"));
    }

    #[test]
    fn sam_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("aln.sam");
        fs::write(
            &input,
            "@HD\tVN:1.6\nr1\t0\tchr1\t1\t60\t4M\t*\t0\t0\tACGT\tIIII\n",
        )
        .unwrap();

        analyze_process(args(input, dir.path())).unwrap();

        let text = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert!(text.contains("Total Sequences\t1"));
        assert!(text.contains("%GC\t50"));
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = analyze_process(args(dir.path().join("absent.fastq"), dir.path())).unwrap_err();
        assert!(matches!(err, QcError::Io { .. }), "{err}");
    }

    #[test]
    fn truncated_input_is_a_malformed_record() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reads.fastq");
        fs::write(&input, TWO_RECORDS).unwrap();
        // r2 is missing its descriptor line, so its quality is consumed as
        // the descriptor and the file ends mid-record
        let err = analyze_process(args(input, dir.path())).unwrap_err();
        assert!(matches!(err, QcError::MalformedRecord { .. }), "{err}");
    }

    #[test]
    fn ignoring_adapters_skips_both_list_loads() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reads.fastq");
        fs::write(&input, "@r1\nACGT\n+\nIIII\n").unwrap();

        let mut limits_text = String::new();
        for metric in Metric::ALL {
            limits_text.push_str(&format!("{name} warn 10\n{name} error 20\n", name = metric.name()));
        }
        limits_text.push_str("adapter ignore 1\n");
        let limits = dir.path().join("limits.txt");
        fs::write(&limits, limits_text).unwrap();

        let mut args = args(input, dir.path());
        args.limits = Some(limits);
        // Deliberately point at files that do not exist: the ignore flag must
        // keep them from being opened at all
        args.adapters = Some(dir.path().join("no-such-adapters.txt"));
        args.contaminants = Some(dir.path().join("no-such-contaminants.txt"));

        analyze_process(args).unwrap();

        let text = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert!(!text.contains(">>Adapter Content"), "adapter module must be skipped");
    }

    #[test]
    fn derived_paths_strip_compound_suffixes() {
        assert_eq!(
            derived_path(Path::new("/data/reads.fastq.gz"), "_qc_data.txt"),
            PathBuf::from("/data/reads_qc_data.txt")
        );
        assert_eq!(
            derived_path(Path::new("reads.fastq"), "_qc_report.html"),
            PathBuf::from("reads_qc_report.html")
        );
        assert_eq!(
            derived_path(Path::new("aln.sam"), "_qc_data.txt"),
            PathBuf::from("aln_qc_data.txt")
        );
    }
}
