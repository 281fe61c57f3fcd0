use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::indicators::DEFAULT_INDICATORS;

pub const DEFAULT_INSIGHT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_INSIGHT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_DATA_URL: &str = "https://api.worldbank.org/v2";

/// Settings for the AI provider.
#[derive(Debug, Clone)]
pub struct InsightConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    /// Abort the network call of a request once a newer one is submitted.
    pub abort_superseded: bool,
}

/// What to fetch from the indicator data provider at startup.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub base_url: String,
    pub country: String,
    pub start_year: i32,
    pub end_year: i32,
    pub indicators: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub insight: InsightConfig,
    pub data: DataConfig,
    pub export_dir: PathBuf,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to honor a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout_secs: u64 = parse_or(non_empty("INSIGHT_TIMEOUT_SECS"), "INSIGHT_TIMEOUT_SECS", 30)?;
        let abort_superseded = match non_empty("INSIGHT_ABORT_SUPERSEDED") {
            Some(v) => parse_flag(&v).with_context(|| format!("INSIGHT_ABORT_SUPERSEDED={v}"))?,
            None => true,
        };

        let insight = InsightConfig {
            api_key: non_empty("OPENAI_API_KEY"),
            endpoint: non_empty("INSIGHT_ENDPOINT").unwrap_or_else(|| DEFAULT_INSIGHT_ENDPOINT.to_string()),
            model: non_empty("INSIGHT_MODEL").unwrap_or_else(|| DEFAULT_INSIGHT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            abort_superseded,
        };

        let start_year: i32 = parse_or(non_empty("ECON_START_YEAR"), "ECON_START_YEAR", 2000)?;
        let end_year: i32 = parse_or(non_empty("ECON_END_YEAR"), "ECON_END_YEAR", 2022)?;
        if start_year > end_year {
            bail!("ECON_START_YEAR ({start_year}) is after ECON_END_YEAR ({end_year})");
        }

        let indicators: Vec<String> = match non_empty("ECON_INDICATORS") {
            Some(list) => list
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            None => DEFAULT_INDICATORS.iter().map(|c| c.to_string()).collect(),
        };
        if indicators.is_empty() {
            bail!("ECON_INDICATORS lists no indicator codes");
        }

        let data = DataConfig {
            base_url: non_empty("ECON_DATA_URL").unwrap_or_else(|| DEFAULT_DATA_URL.to_string()),
            country: non_empty("ECON_COUNTRY").unwrap_or_else(|| "US".to_string()),
            start_year,
            end_year,
            indicators,
        };

        let export_dir = non_empty("ECON_EXPORT_DIR")
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Config {
            insight,
            data,
            export_dir,
        })
    }
}

/// Scratch directory for the data cache and log files.
pub fn cache_dir() -> PathBuf {
    PathBuf::from("/tmp/econ-tui")
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v.parse().with_context(|| format!("{key}={v} is not a valid number")),
        None => Ok(default),
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got {other:?}"),
    }
}
