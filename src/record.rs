use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// One row of the trending table: a video as observed on one collection day.
///
/// `video_id` is unique within a `collection_date` only; a video that stays
/// on the chart for several days appears once per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub channel_id: String,
    pub channel_title: String,
    pub category_id: String,
    pub category_name: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub publish_time: DateTime<Utc>,
    pub collection_date: NaiveDate,
}

/// Raw table columns, in `VideoRecord` field order.
pub const COLUMNS: [&str; 11] = [
    "video_id",
    "title",
    "channel_id",
    "channel_title",
    "category_id",
    "category_name",
    "view_count",
    "like_count",
    "comment_count",
    "publish_time",
    "collection_date",
];

/// Persist the table verbatim as CSV. The header is always written, so an
/// empty collection still leaves a file naming its columns. Creates the
/// parent directory when missing.
pub fn save_table(path: &Path, records: &[VideoRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(COLUMNS).context("writing header")?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("writing row for video {}", record.video_id))?;
    }
    writer.flush()?;
    Ok(())
}

/// Load a table previously written by [`save_table`].
pub fn load_table(path: &Path) -> Result<Vec<VideoRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for (line, row) in reader.deserialize().enumerate() {
        let record: VideoRecord =
            row.with_context(|| format!("parsing row {} of {}", line + 1, path.display()))?;
        records.push(record);
    }
    Ok(records)
}
