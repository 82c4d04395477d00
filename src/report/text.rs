use crate::{
    config::Metric,
    report::{ReportModel, Verdict},
    summary::duplication::BUCKET_LABELS,
};
use std::io::{self, Write};

static VERSION: &str = env!("CARGO_PKG_VERSION");

/// Writes the structured text report: one `>>Module\t<verdict>` ...
/// `>>END_MODULE` section per evaluated module, with fixed column orders.
/// Modules without a verdict (ignored, or no data) are omitted.
pub fn write_text<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    writeln!(out, "##readqc\t{VERSION}")?;

    basic_statistics(out, model)?;
    per_base_quality(out, model)?;
    per_tile_quality(out, model)?;
    per_sequence_quality(out, model)?;
    per_base_content(out, model)?;
    per_sequence_gc(out, model)?;
    per_base_n_content(out, model)?;
    length_distribution(out, model)?;
    duplication_levels(out, model)?;
    overrepresented(out, model)?;
    adapter_content(out, model)?;
    kmer_content(out, model)?;

    out.flush()
}

fn open_module<W: Write>(out: &mut W, name: &str, verdict: Verdict) -> io::Result<()> {
    writeln!(out, ">>{name}\t{}", verdict.label())
}

fn close_module<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, ">>END_MODULE")
}

fn basic_statistics<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    open_module(out, "Basic Statistics", Verdict::Pass)?;
    writeln!(out, "#Measure\tValue")?;
    writeln!(out, "Filename\t{}", model.filename)?;
    writeln!(out, "File type\t{}", model.file_type)?;
    writeln!(out, "Encoding\t{}", model.encoding)?;
    writeln!(out, "Total Sequences\t{}", model.num_reads)?;
    writeln!(out, "Sequences flagged as poor quality\t{}", model.num_poor)?;
    writeln!(out, "Sequence length\t{}", sequence_length_value(model))?;
    writeln!(out, "%GC\t{:.0}", model.avg_gc)?;
    close_module(out)
}

fn sequence_length_value(model: &ReportModel) -> String {
    if model.min_read_length == model.max_read_length {
        model.max_read_length.to_string()
    } else {
        format!("{}-{}", model.min_read_length, model.max_read_length)
    }
}

fn per_base_quality<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    let Some(verdict) = model.verdicts.combined(Metric::QualityBaseLower, Metric::QualityBaseMedian) else {
        return Ok(());
    };

    open_module(out, "Per base sequence quality", verdict)?;
    writeln!(
        out,
        "#Base\tMean\tMedian\tLower Quartile\tUpper Quartile\t10th Percentile\t90th Percentile"
    )?;
    for (p, pq) in model.per_base_quality.iter().enumerate() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            p + 1,
            pq.mean,
            pq.median,
            pq.lower_quartile,
            pq.upper_quartile,
            pq.decile_low,
            pq.decile_high
        )?;
    }
    close_module(out)
}

fn per_tile_quality<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    let (Some(verdict), Some(tiles)) = (model.verdicts.get(Metric::Tile), &model.tile_quality) else {
        return Ok(());
    };

    open_module(out, "Per tile sequence quality", verdict)?;
    writeln!(out, "#Tile\tBase\tMean")?;
    for (tile, deviations) in tiles {
        for (p, deviation) in deviations.iter().enumerate() {
            writeln!(out, "{tile}\t{}\t{deviation}", p + 1)?;
        }
    }
    close_module(out)
}

fn per_sequence_quality<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    let Some(verdict) = model.verdicts.get(Metric::QualitySequence) else {
        return Ok(());
    };

    open_module(out, "Per sequence quality scores", verdict)?;
    writeln!(out, "#Quality\tCount")?;
    for &(q, count) in &model.quality_histogram {
        writeln!(out, "{q}\t{count}")?;
    }
    close_module(out)
}

fn per_base_content<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    let Some(verdict) = model.verdicts.get(Metric::Sequence) else {
        return Ok(());
    };

    open_module(out, "Per base sequence content", verdict)?;
    writeln!(out, "#Base\tG\tA\tT\tC")?;
    for (p, row) in model.per_base_content.iter().enumerate() {
        writeln!(out, "{}\t{}\t{}\t{}\t{}", p + 1, row.g, row.a, row.t, row.c)?;
    }
    close_module(out)
}

fn per_sequence_gc<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    let Some(verdict) = model.verdicts.get(Metric::GcSequence) else {
        return Ok(());
    };

    open_module(out, "Per sequence GC content", verdict)?;
    writeln!(out, "#GC Content\tCount")?;
    for (gc, &count) in model.gc_histogram.iter().enumerate() {
        writeln!(out, "{gc}\t{count}")?;
    }
    close_module(out)
}

fn per_base_n_content<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    let Some(verdict) = model.verdicts.get(Metric::NContent) else {
        return Ok(());
    };

    open_module(out, "Per base N content", verdict)?;
    writeln!(out, "#Base\tN-Count")?;
    for (p, row) in model.per_base_content.iter().enumerate() {
        writeln!(out, "{}\t{}", p + 1, row.n)?;
    }
    close_module(out)
}

fn length_distribution<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    let Some(verdict) = model.verdicts.get(Metric::SequenceLength) else {
        return Ok(());
    };

    open_module(out, "Sequence Length Distribution", verdict)?;
    writeln!(out, "#Length\tCount")?;
    for &(length, count) in &model.length_distribution {
        writeln!(out, "{length}\t{count}")?;
    }
    close_module(out)
}

fn duplication_levels<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    let Some(verdict) = model.verdicts.get(Metric::Duplication) else {
        return Ok(());
    };

    open_module(out, "Sequence Duplication Levels", verdict)?;
    writeln!(out, "#Total Deduplicated Percentage\t{}", model.duplication.total_deduplicated_pct)?;
    writeln!(out, "#Duplication Level\tPercentage of deduplicated\tPercentage of total")?;
    for (bucket, label) in BUCKET_LABELS.iter().enumerate() {
        writeln!(
            out,
            "{label}\t{}\t{}",
            model.duplication.pct_deduplicated[bucket], model.duplication.pct_total[bucket]
        )?;
    }
    close_module(out)
}

fn overrepresented<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    let Some(verdict) = model.verdicts.get(Metric::Overrepresented) else {
        return Ok(());
    };

    open_module(out, "Overrepresented sequences", verdict)?;
    writeln!(out, "#Sequence\tCount\tPercentage\tPossible Source")?;
    for entry in &model.overrepresented {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            entry.sequence,
            entry.count,
            entry.percentage,
            entry.source.as_deref().unwrap_or("No Hit")
        )?;
    }
    close_module(out)
}

fn adapter_content<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    let Some(verdict) = model.verdicts.get(Metric::Adapter) else {
        return Ok(());
    };

    open_module(out, "Adapter Content", verdict)?;
    write!(out, "#Position")?;
    for name in &model.adapter_content.names {
        write!(out, "\t{name}")?;
    }
    writeln!(out)?;
    for (p, row) in &model.adapter_content.rows {
        write!(out, "{}", p + 1)?;
        for value in row {
            write!(out, "\t{value}")?;
        }
        writeln!(out)?;
    }
    close_module(out)
}

fn kmer_content<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    let Some(verdict) = model.verdicts.get(Metric::Kmer) else {
        return Ok(());
    };

    open_module(out, "Kmer Content", verdict)?;
    writeln!(out, "#Sequence\tCount\tObs/Exp Max\tMax Obs/Exp Position")?;
    for hit in &model.kmer_hits {
        writeln!(out, "{}\t{}\t{}\t{}", hit.sequence, hit.count, hit.obs_exp_max, hit.max_position)?;
    }
    close_module(out)
}
