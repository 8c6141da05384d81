use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::record::VideoRecord;

const USER_AGENT: &str = "trendgraph/0.1 (trending-video-analysis)";
const API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// Longest accepted collection window, in days.
pub const MAX_WINDOW_DAYS: u32 = 3650;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed video {video_id}: {reason}")]
    Malformed { video_id: String, reason: String },

    #[error("no API key configured (set api_key or YOUTUBE_API_KEY)")]
    MissingApiKey,

    #[error("collection window of {days} days is out of range (max {max})", max = MAX_WINDOW_DAYS)]
    WindowOutOfRange { days: u32 },
}

/// Where the daily trending chart comes from.
#[allow(async_fn_in_trait)]
pub trait TrendingSource {
    /// Category id → display name for the configured region.
    async fn category_names(&self) -> Result<HashMap<String, String>, CollectError>;

    /// Current trending chart, every row stamped with `date`.
    async fn daily_trending(
        &self,
        categories: &HashMap<String, String>,
        date: NaiveDate,
    ) -> Result<Vec<VideoRecord>, CollectError>;
}

/// Outcome of one collection day: rows collected, or why the day was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub result: Result<usize, String>,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    pub records: Vec<VideoRecord>,
    pub days: Vec<DayOutcome>,
}

impl CollectionReport {
    pub fn failed_days(&self) -> Vec<&DayOutcome> {
        self.days.iter().filter(|d| d.result.is_err()).collect()
    }

    pub fn succeeded_days(&self) -> usize {
        self.days.iter().filter(|d| d.result.is_ok()).count()
    }
}

/// Collect one snapshot per day for `today - days ..= today`.
///
/// The platform only serves the current chart, so each day's snapshot is the
/// chart at collection time labelled with that day. A failing day is logged,
/// recorded in the report and skipped; it never aborts the run. A failed
/// category lookup degrades to "Unknown" names. A window longer than
/// [`MAX_WINDOW_DAYS`] or reaching before the calendar's start is rejected
/// before any request is made.
pub async fn collect_trending_videos<S: TrendingSource>(
    source: &S,
    days: u32,
    today: NaiveDate,
) -> Result<CollectionReport, CollectError> {
    let start = (days <= MAX_WINDOW_DAYS)
        .then(|| today.checked_sub_days(Days::new(u64::from(days))))
        .flatten()
        .ok_or(CollectError::WindowOutOfRange { days })?;

    let categories = match source.category_names().await {
        Ok(c) => c,
        Err(e) => {
            warn!("Error fetching categories: {e}");
            HashMap::new()
        }
    };

    let mut report = CollectionReport::default();
    for date in start.iter_days().take_while(|d| *d <= today) {
        match source.daily_trending(&categories, date).await {
            Ok(rows) => {
                debug!(%date, rows = rows.len(), "collected daily chart");
                report.days.push(DayOutcome {
                    date,
                    result: Ok(rows.len()),
                });
                report.records.extend(rows);
            }
            Err(e) => {
                warn!("Error collecting data for {date}: {e}");
                report.days.push(DayOutcome {
                    date,
                    result: Err(e.to_string()),
                });
            }
        }
    }

    info!(
        rows = report.records.len(),
        days_ok = report.succeeded_days(),
        days_failed = report.failed_days().len(),
        "collection finished"
    );
    Ok(report)
}

// ── YouTube Data API v3 ──

pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    region_code: String,
    max_results: u32,
}

impl YouTubeClient {
    pub fn from_config(cfg: &Config) -> Result<Self, CollectError> {
        if cfg.api_key.trim().is_empty() {
            return Err(CollectError::MissingApiKey);
        }
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        let mut base = cfg.collect.api_base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            api_key: cfg.api_key.clone(),
            region_code: cfg.collect.region_code.clone(),
            max_results: cfg.collect.max_results.min(50),
        })
    }

    /// Request URL without credentials; the key travels in a header so it
    /// never shows up in URLs carried by errors and logs.
    fn endpoint(&self, resource: &str, params: &[(&str, String)]) -> Result<Url, CollectError> {
        let mut url = self.base_url.join(resource)?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T, CollectError> {
        let resp = self
            .client
            .get(url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CollectError::Status {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }
        Ok(resp.json::<T>().await.map_err(reqwest::Error::without_url)?)
    }
}

impl TrendingSource for YouTubeClient {
    async fn category_names(&self) -> Result<HashMap<String, String>, CollectError> {
        let url = self.endpoint(
            "videoCategories",
            &[
                ("part", "snippet".to_string()),
                ("regionCode", self.region_code.clone()),
            ],
        )?;
        let resp: ListResponse<ApiCategory> = self.get_json(url).await?;
        Ok(resp
            .items
            .into_iter()
            .map(|c| (c.id, c.snippet.title))
            .collect())
    }

    async fn daily_trending(
        &self,
        categories: &HashMap<String, String>,
        date: NaiveDate,
    ) -> Result<Vec<VideoRecord>, CollectError> {
        let url = self.endpoint(
            "videos",
            &[
                ("part", "snippet,statistics,contentDetails".to_string()),
                ("chart", "mostPopular".to_string()),
                ("regionCode", self.region_code.clone()),
                ("maxResults", self.max_results.to_string()),
            ],
        )?;
        let resp: ListResponse<ApiVideo> = self.get_json(url).await?;
        resp.items
            .into_iter()
            .map(|v| v.into_record(categories, date))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiCategory {
    id: String,
    snippet: CategorySnippet,
}

#[derive(Debug, Deserialize)]
struct CategorySnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiVideo {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    channel_id: String,
    channel_title: String,
    category_id: String,
    published_at: DateTime<Utc>,
}

/// The API sends counts as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

impl ApiVideo {
    fn into_record(
        self,
        categories: &HashMap<String, String>,
        date: NaiveDate,
    ) -> Result<VideoRecord, CollectError> {
        let stats = &self.statistics;
        let view_count = match stats.view_count.as_deref() {
            Some(v) => parse_count(&self.id, "viewCount", v)?,
            None => {
                return Err(CollectError::Malformed {
                    video_id: self.id,
                    reason: "missing viewCount".into(),
                })
            }
        };
        let like_count = match stats.like_count.as_deref() {
            Some(v) => parse_count(&self.id, "likeCount", v)?,
            None => 0,
        };
        let comment_count = match stats.comment_count.as_deref() {
            Some(v) => parse_count(&self.id, "commentCount", v)?,
            None => 0,
        };
        let category_name = categories
            .get(&self.snippet.category_id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        Ok(VideoRecord {
            video_id: self.id,
            title: self.snippet.title,
            channel_id: self.snippet.channel_id,
            channel_title: self.snippet.channel_title,
            category_id: self.snippet.category_id,
            category_name,
            view_count,
            like_count,
            comment_count,
            publish_time: self.snippet.published_at,
            collection_date: date,
        })
    }
}

fn parse_count(video_id: &str, field: &str, raw: &str) -> Result<u64, CollectError> {
    raw.trim().parse().map_err(|_| CollectError::Malformed {
        video_id: video_id.to_string(),
        reason: format!("{field} is not a count: {raw:?}"),
    })
}

/// Pull `error.message` out of an API error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
