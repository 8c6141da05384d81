use anyhow::Result;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analyzer::{analyze_content_patterns, analyze_network};
use crate::collector::DayOutcome;
use crate::config::GraphExport;
use crate::export;
use crate::graph::build_video_graph;
use crate::record::VideoRecord;
use crate::report::{self, Report};

/// Files produced by one run.
#[derive(Debug)]
pub struct Artifacts {
    pub report: PathBuf,
    pub graph_export: Option<PathBuf>,
}

/// Build, analyze and report on an already collected table.
pub fn analyze_and_report(
    records: &[VideoRecord],
    failed_days: Vec<&DayOutcome>,
    output_dir: &Path,
    graph_export: GraphExport,
) -> Result<Artifacts> {
    let graph = build_video_graph(records);
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph built"
    );

    let metrics = analyze_network(&graph);
    let patterns = analyze_content_patterns(records);
    info!(
        density = metrics.density,
        communities = metrics.communities.len(),
        "network analyzed"
    );

    let generated_at = Local::now().naive_local();
    let report_path = Report::new(&metrics, &patterns, records)
        .with_failed_days(failed_days)
        .write(output_dir, generated_at)?;
    info!("report written to {}", report_path.display());

    let stamp = report::timestamp(generated_at);
    let graph_export = export::write_graph_export(output_dir, &graph, graph_export, &stamp)?;
    if let Some(p) = &graph_export {
        info!("graph exported to {}", p.display());
    }

    Ok(Artifacts {
        report: report_path,
        graph_export,
    })
}
