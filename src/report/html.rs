use crate::{
    config::Metric,
    report::{ReportModel, Verdict},
    summary::duplication::BUCKET_LABELS,
};
use std::io::{self, Write};

/// The bundled report template. Rendering is pure placeholder substitution:
/// each `{{TOKEN}}` below is replaced by a serialized data expression.
static TEMPLATE: &str = include_str!("../../assets/report_template.html");

const NOT_EVALUATED: &str = "<p class=\"skipped\">Not evaluated</p>";

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn table(headers: &[&str], rows: impl Iterator<Item = Vec<String>>) -> String {
    let mut html = String::from("<table><thead><tr>");
    for header in headers {
        html.push_str(&format!("<th>{}</th>", escape(header)));
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape(&cell)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn module_table(verdict: Option<Verdict>, headers: &[&str], rows: impl Iterator<Item = Vec<String>>) -> String {
    match verdict {
        Some(_) => table(headers, rows),
        None => NOT_EVALUATED.to_string(),
    }
}

fn summary_list(model: &ReportModel) -> String {
    let modules: [(&str, Option<Verdict>); 12] = [
        ("Basic Statistics", Some(Verdict::Pass)),
        (
            "Per base sequence quality",
            model.verdicts.combined(Metric::QualityBaseLower, Metric::QualityBaseMedian),
        ),
        ("Per tile sequence quality", model.verdicts.get(Metric::Tile)),
        ("Per sequence quality scores", model.verdicts.get(Metric::QualitySequence)),
        ("Per base sequence content", model.verdicts.get(Metric::Sequence)),
        ("Per sequence GC content", model.verdicts.get(Metric::GcSequence)),
        ("Per base N content", model.verdicts.get(Metric::NContent)),
        ("Sequence Length Distribution", model.verdicts.get(Metric::SequenceLength)),
        ("Sequence Duplication Levels", model.verdicts.get(Metric::Duplication)),
        ("Overrepresented sequences", model.verdicts.get(Metric::Overrepresented)),
        ("Adapter Content", model.verdicts.get(Metric::Adapter)),
        ("Kmer Content", model.verdicts.get(Metric::Kmer)),
    ];

    let mut html = String::from("<ul class=\"summary\">");
    for (name, verdict) in modules {
        let label = verdict.map_or("skipped", Verdict::label);
        html.push_str(&format!("<li class=\"{label}\">{label}: {}</li>", escape(name)));
    }
    html.push_str("</ul>");
    html
}

/// Renders the HTML report by substituting the closed token set into the
/// bundled template.
pub fn render_html(model: &ReportModel) -> String {
    let basic = table(
        &["Measure", "Value"],
        [
            vec!["Filename".to_string(), model.filename.clone()],
            vec!["File type".to_string(), model.file_type.clone()],
            vec!["Encoding".to_string(), model.encoding.clone()],
            vec!["Total Sequences".to_string(), model.num_reads.to_string()],
            vec!["Sequences flagged as poor quality".to_string(), model.num_poor.to_string()],
            vec!["%GC".to_string(), format!("{:.0}", model.avg_gc)],
        ]
        .into_iter(),
    );

    let per_base_quality = module_table(
        model.verdicts.combined(Metric::QualityBaseLower, Metric::QualityBaseMedian),
        &["Base", "Mean", "Median", "Lower Quartile", "Upper Quartile"],
        model.per_base_quality.iter().enumerate().map(|(p, pq)| {
            vec![
                (p + 1).to_string(),
                pq.mean.to_string(),
                pq.median.to_string(),
                pq.lower_quartile.to_string(),
                pq.upper_quartile.to_string(),
            ]
        }),
    );

    let tile_quality = match (&model.tile_quality, model.verdicts.get(Metric::Tile)) {
        (Some(tiles), Some(_)) => table(
            &["Tile", "Base", "Mean"],
            tiles.iter().flat_map(|(tile, deviations)| {
                deviations
                    .iter()
                    .enumerate()
                    .map(move |(p, d)| vec![tile.to_string(), (p + 1).to_string(), d.to_string()])
            }),
        ),
        _ => NOT_EVALUATED.to_string(),
    };

    let sequence_quality = module_table(
        model.verdicts.get(Metric::QualitySequence),
        &["Quality", "Count"],
        model.quality_histogram.iter().map(|&(q, c)| vec![q.to_string(), c.to_string()]),
    );

    let base_content = module_table(
        model.verdicts.get(Metric::Sequence),
        &["Base", "G", "A", "T", "C"],
        model.per_base_content.iter().enumerate().map(|(p, row)| {
            vec![
                (p + 1).to_string(),
                row.g.to_string(),
                row.a.to_string(),
                row.t.to_string(),
                row.c.to_string(),
            ]
        }),
    );

    let gc_content = module_table(
        model.verdicts.get(Metric::GcSequence),
        &["GC Content", "Count"],
        model.gc_histogram.iter().enumerate().map(|(gc, c)| vec![gc.to_string(), c.to_string()]),
    );

    let n_content = module_table(
        model.verdicts.get(Metric::NContent),
        &["Base", "N-Count"],
        model
            .per_base_content
            .iter()
            .enumerate()
            .map(|(p, row)| vec![(p + 1).to_string(), row.n.to_string()]),
    );

    let lengths = module_table(
        model.verdicts.get(Metric::SequenceLength),
        &["Length", "Count"],
        model.length_distribution.iter().map(|&(len, c)| vec![len.to_string(), c.to_string()]),
    );

    let duplication = module_table(
        model.verdicts.get(Metric::Duplication),
        &["Duplication Level", "Percentage of deduplicated", "Percentage of total"],
        BUCKET_LABELS.iter().enumerate().map(|(bucket, label)| {
            vec![
                label.to_string(),
                model.duplication.pct_deduplicated[bucket].to_string(),
                model.duplication.pct_total[bucket].to_string(),
            ]
        }),
    );

    let overrepresented = module_table(
        model.verdicts.get(Metric::Overrepresented),
        &["Sequence", "Count", "Percentage", "Possible Source"],
        model.overrepresented.iter().map(|entry| {
            vec![
                entry.sequence.clone(),
                entry.count.to_string(),
                entry.percentage.to_string(),
                entry.source.clone().unwrap_or_else(|| "No Hit".to_string()),
            ]
        }),
    );

    let adapter_headers: Vec<&str> = std::iter::once("Position")
        .chain(model.adapter_content.names.iter().map(String::as_str))
        .collect();
    let adapters = module_table(
        model.verdicts.get(Metric::Adapter),
        &adapter_headers,
        model.adapter_content.rows.iter().map(|(p, row)| {
            std::iter::once((p + 1).to_string())
                .chain(row.iter().map(|v| v.to_string()))
                .collect()
        }),
    );

    let kmers = module_table(
        model.verdicts.get(Metric::Kmer),
        &["Sequence", "Count", "Obs/Exp Max", "Max Obs/Exp Position"],
        model.kmer_hits.iter().map(|hit| {
            vec![
                hit.sequence.clone(),
                hit.count.to_string(),
                hit.obs_exp_max.to_string(),
                hit.max_position.to_string(),
            ]
        }),
    );

    let substitutions = [
        ("{{VERSION}}", env!("CARGO_PKG_VERSION").to_string()),
        ("{{FILENAME}}", escape(&model.filename)),
        ("{{SUMMARY}}", summary_list(model)),
        ("{{BASICSTATSDATA}}", basic),
        ("{{PERBASEQUALITYDATA}}", per_base_quality),
        ("{{PERTILEQUALITYDATA}}", tile_quality),
        ("{{PERSEQUENCEQUALITYDATA}}", sequence_quality),
        ("{{PERBASECONTENTDATA}}", base_content),
        ("{{PERSEQUENCEGCDATA}}", gc_content),
        ("{{PERBASENCONTENTDATA}}", n_content),
        ("{{LENGTHDISTDATA}}", lengths),
        ("{{DUPLICATIONDATA}}", duplication),
        ("{{OVERREPRESENTEDDATA}}", overrepresented),
        ("{{ADAPTERDATA}}", adapters),
        ("{{KMERDATA}}", kmers),
    ];

    let mut html = TEMPLATE.to_string();
    for (token, value) in substitutions {
        html = html.replace(token, &value);
    }
    html
}

/// Writes the rendered HTML report.
pub fn write_html<W: Write>(out: &mut W, model: &ReportModel) -> io::Result<()> {
    out.write_all(render_html(model).as_bytes())?;
    out.flush()
}
