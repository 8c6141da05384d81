use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `api_key` from the config file.
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// YouTube Data API key. Only the collector reads it.
    #[serde(default)]
    pub api_key: String,

    /// Directory receiving the raw trending table (CSV).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub collect: CollectConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Length of the collection window in days.
    #[serde(default = "default_days")]
    pub days: u32,

    /// Region whose trending chart is fetched.
    #[serde(default = "default_region_code")]
    pub region_code: String,

    /// Videos requested per daily chart (API maximum is 50).
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory receiving the timestamped report.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Companion graph export: `none`, `graphml` or `json`.
    #[serde(default)]
    pub graph_export: GraphExport,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphExport {
    #[default]
    None,
    Graphml,
    Json,
}

// ── defaults ──

fn default_data_dir() -> String {
    "data/raw".to_string()
}
fn default_days() -> u32 {
    14
}
fn default_region_code() -> String {
    "ID".to_string()
}
fn default_max_results() -> u32 {
    50
}
fn default_api_base_url() -> String {
    "https://www.googleapis.com/youtube/v3/".to_string()
}
fn default_output_dir() -> String {
    "output/reports".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            data_dir: default_data_dir(),
            collect: CollectConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            region_code: default_region_code(),
            max_results: default_max_results(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            graph_export: GraphExport::default(),
        }
    }
}

impl Config {
    /// Default config file path: `~/.trendgraph/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".trendgraph")
            .join("config.toml")
    }

    /// Load config from the default path, falling back to defaults if the file
    /// does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path (falls back to defaults when missing).
    /// A non-empty `YOUTUBE_API_KEY` replaces the file's key.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        } else {
            Config::default()
        };
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                cfg.api_key = key.trim().to_string();
            }
        }
        Ok(cfg)
    }

    /// Write the default config to `~/.trendgraph/config.toml`, creating the
    /// directory if needed. Returns the path written.
    pub fn write_default() -> Result<PathBuf> {
        let path = Self::default_path();
        Self::write_default_to(&path)?;
        Ok(path)
    }

    pub fn write_default_to(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let cfg = Config::default();
        let text = toml::to_string_pretty(&cfg).context("serialising default config")?;
        std::fs::write(path, &text).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
