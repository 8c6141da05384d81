use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::analyzer::{Metrics, Patterns};
use crate::collector::DayOutcome;
use crate::record::VideoRecord;

const TOP_VIDEOS: usize = 10;

/// Video details by id. A video recurs once per collection day; the first
/// matching row in table order answers.
pub struct VideoLookup<'a> {
    by_id: HashMap<&'a str, &'a VideoRecord>,
}

impl<'a> VideoLookup<'a> {
    pub fn new(records: &'a [VideoRecord]) -> Self {
        let mut by_id = HashMap::new();
        for r in records {
            by_id.entry(r.video_id.as_str()).or_insert(r);
        }
        Self { by_id }
    }

    pub fn get(&self, video_id: &str) -> Option<&'a VideoRecord> {
        self.by_id.get(video_id).copied()
    }
}

/// Everything the text report is rendered from.
pub struct Report<'a> {
    pub metrics: &'a Metrics,
    pub patterns: &'a Patterns,
    pub records: &'a [VideoRecord],
    /// Collection days that were skipped; empty for offline runs.
    pub failed_days: Vec<&'a DayOutcome>,
}

impl<'a> Report<'a> {
    pub fn new(metrics: &'a Metrics, patterns: &'a Patterns, records: &'a [VideoRecord]) -> Self {
        Self {
            metrics,
            patterns,
            records,
            failed_days: Vec::new(),
        }
    }

    pub fn with_failed_days(mut self, failed: Vec<&'a DayOutcome>) -> Self {
        self.failed_days = failed;
        self
    }

    /// Top videos by degree centrality, ties broken by video id.
    pub fn top_by_degree(&self, limit: usize) -> Vec<(&'a str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .metrics
            .degree_centrality
            .iter()
            .map(|(id, &c)| (id.as_str(), c))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked.truncate(limit);
        ranked
    }

    pub fn render(&self, generated_at: NaiveDateTime) -> String {
        let m = self.metrics;
        let p = self.patterns;
        let lookup = VideoLookup::new(self.records);
        let total = p.total_rows();
        let mut out = String::new();

        let _ = writeln!(out, "YouTube Trending Network Report");
        let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Rows analyzed: {total}");
        if !self.failed_days.is_empty() {
            let _ = writeln!(out, "Skipped collection days: {}", self.failed_days.len());
            for d in &self.failed_days {
                if let Err(reason) = &d.result {
                    let _ = writeln!(out, "  {}: {reason}", d.date);
                }
            }
        }

        let _ = writeln!(out, "\n== Network Metrics ==");
        let _ = writeln!(out, "Nodes (videos):      {}", m.num_nodes);
        let _ = writeln!(out, "Edges:               {}", m.num_edges);
        let _ = writeln!(out, "Density:             {:.4}", m.density);
        let _ = writeln!(out, "Average clustering:  {:.4}", m.avg_clustering);
        let _ = writeln!(out, "Modularity:          {:.4}", m.modularity);
        let _ = writeln!(out, "Communities:         {}", m.communities.len());

        let _ = writeln!(out, "\n== Top {TOP_VIDEOS} Videos by Degree Centrality ==");
        let top = self.top_by_degree(TOP_VIDEOS);
        if top.is_empty() {
            let _ = writeln!(out, "  (no videos)");
        }
        for (rank, (id, centrality)) in top.iter().enumerate() {
            let betweenness = m.betweenness_centrality.get(*id).copied().unwrap_or(0.0);
            match lookup.get(id) {
                Some(v) => {
                    let _ = writeln!(
                        out,
                        "{:>2}. {} | {} | {} views | degree {:.4} | betweenness {:.4}",
                        rank + 1,
                        v.title,
                        v.channel_title,
                        v.view_count,
                        centrality,
                        betweenness
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "{:>2}. {id} | degree {:.4} | betweenness {:.4}",
                        rank + 1,
                        centrality,
                        betweenness
                    );
                }
            }
        }

        let _ = writeln!(out, "\n== Category Distribution ==");
        write_distribution(&mut out, &p.category_distribution, total);

        let _ = writeln!(out, "\n== Channel Activity ==");
        write_distribution(&mut out, &p.channel_videos, total);

        let _ = writeln!(out, "\n== Daily Trending Counts ==");
        if p.daily_trends.is_empty() {
            let _ = writeln!(out, "  (no data)");
        }
        for (date, count) in &p.daily_trends {
            let _ = writeln!(out, "  {date}: {count} videos");
        }

        let _ = writeln!(out, "\n== Communities ==");
        if m.communities.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for (i, c) in m.communities.iter().enumerate() {
            let _ = writeln!(out, "  Community {}: {} videos", i + 1, c.len());
        }
        out
    }

    /// Write `trending_report_<timestamp>.txt` under `dir`, creating it if
    /// needed. `generated_at` names the file and heads the report. Returns the
    /// file path.
    pub fn write(&self, dir: &Path, generated_at: NaiveDateTime) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(format!("trending_report_{}.txt", timestamp(generated_at)));
        std::fs::write(&path, self.render(generated_at))
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

/// File-name timestamp shared by the report and the graph export.
pub fn timestamp(at: NaiveDateTime) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

fn write_distribution(out: &mut String, counts: &[(String, usize)], total: usize) {
    if counts.is_empty() {
        let _ = writeln!(out, "  (no data)");
        return;
    }
    for (name, count) in counts {
        let pct = if total > 0 {
            100.0 * *count as f64 / total as f64
        } else {
            0.0
        };
        let _ = writeln!(out, "  {name}: {count} ({pct:.1}%)");
    }
}
