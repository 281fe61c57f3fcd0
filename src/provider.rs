use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::DataConfig;
use crate::error::ProviderError;
use crate::indicators::{IndicatorStore, Observation};

const CACHE_DURATION_SECS: u64 = 6 * 60 * 60;
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Deserialize)]
struct WorldBankRow {
    date: String,
    value: Option<f64>,
}

/// Parses a World Bank v2 JSON payload: `[meta, [rows...]]`.
/// Rows without a value or with a non-numeric date are skipped.
pub fn parse_payload(code: &str, body: &str) -> Result<Vec<Observation>, ProviderError> {
    let payload: serde_json::Value = serde_json::from_str(body)?;
    let pages = payload
        .as_array()
        .ok_or_else(|| ProviderError::InvalidResponse("expected a JSON array".to_string()))?;

    let rows = match pages.get(1) {
        Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(rows) => rows,
        None => {
            let message = pages
                .first()
                .and_then(|meta| meta["message"][0]["value"].as_str())
                .unwrap_or("missing data page");
            return Err(ProviderError::InvalidResponse(message.to_string()));
        }
    };

    let rows: Vec<WorldBankRow> = serde_json::from_value(rows.clone())?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            Some(Observation {
                year: row.date.trim().parse().ok()?,
                code: code.to_string(),
                value: row.value?,
            })
        })
        .collect())
}

/// Indicator data source backed by the World Bank open data API.
pub struct WorldBankProvider {
    client: reqwest::blocking::Client,
    config: DataConfig,
    cache_dir: PathBuf,
}

impl WorldBankProvider {
    pub fn new(config: DataConfig, cache_dir: PathBuf) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            config,
            cache_dir,
        })
    }

    fn cache_file(&self, code: &str) -> PathBuf {
        self.cache_dir.join(format!(
            "{}_{}_{}_{}.json",
            code.replace('.', "_"),
            self.config.country,
            self.config.start_year,
            self.config.end_year
        ))
    }

    fn read_cache(&self, code: &str) -> Option<Vec<Observation>> {
        let cache_file = self.cache_file(code);
        let modified = fs::metadata(&cache_file).ok()?.modified().ok()?;
        let fresh = modified
            .elapsed()
            .map(|d| d.as_secs() < CACHE_DURATION_SECS)
            .unwrap_or(false);
        if !fresh {
            return None;
        }
        let content = fs::read_to_string(&cache_file).ok()?;
        parse_payload(code, &content).ok()
    }

    /// Fetches one indicator, preferring a fresh on-disk copy.
    pub fn fetch_indicator(&self, code: &str) -> Result<Vec<Observation>, ProviderError> {
        if let Some(rows) = self.read_cache(code) {
            tracing::debug!(code, rows = rows.len(), "indicator loaded from cache");
            return Ok(rows);
        }

        let url = format!(
            "{}/country/{}/indicator/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.country,
            code
        );
        let date = format!("{}:{}", self.config.start_year, self.config.end_year);

        let response = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("date", date.as_str()), ("per_page", "1000")])
            .send()?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        let body = response.text()?;
        let rows = parse_payload(code, &body)?;

        if fs::create_dir_all(&self.cache_dir).is_ok() {
            let _ = fs::write(self.cache_file(code), &body);
        }

        tracing::debug!(code, rows = rows.len(), "indicator fetched");
        Ok(rows)
    }

    /// Loads every configured indicator. Failed indicators are logged and left out.
    pub fn load(&self) -> IndicatorStore {
        let mut rows = Vec::new();
        for code in &self.config.indicators {
            match self.fetch_indicator(code) {
                Ok(fetched) => rows.extend(fetched),
                Err(e) => tracing::error!(code = %code, "failed to load indicator: {e}"),
            }
        }
        IndicatorStore::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"[
        {"page":1,"pages":1,"per_page":1000,"total":3},
        [
            {"indicator":{"id":"NY.GDP.MKTP.CD","value":"GDP (current US$)"},"country":{"id":"US","value":"United States"},"date":"2002","value":10.9},
            {"indicator":{"id":"NY.GDP.MKTP.CD","value":"GDP (current US$)"},"country":{"id":"US","value":"United States"},"date":"2001","value":null},
            {"indicator":{"id":"NY.GDP.MKTP.CD","value":"GDP (current US$)"},"country":{"id":"US","value":"United States"},"date":"2000","value":10.2}
        ]
    ]"#;

    #[test]
    fn parse_skips_missing_values() {
        let rows = parse_payload("NY.GDP.MKTP.CD", PAYLOAD).unwrap();
        let years: Vec<i32> = rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2002, 2000]);
        assert!(rows.iter().all(|r| r.code == "NY.GDP.MKTP.CD"));
    }

    #[test]
    fn parse_handles_empty_and_error_payloads() {
        let empty = r#"[{"page":0,"pages":0,"total":0}, null]"#;
        assert!(parse_payload("X", empty).unwrap().is_empty());

        let error = r#"[{"message":[{"id":"120","key":"Invalid value","value":"The provided parameter value is not valid"}]}]"#;
        match parse_payload("X", error) {
            Err(ProviderError::InvalidResponse(msg)) => assert!(msg.contains("not valid")),
            other => panic!("unexpected: {other:?}"),
        }

        assert!(matches!(parse_payload("X", "{}"), Err(ProviderError::InvalidResponse(_))));
        assert!(matches!(parse_payload("X", "<html>"), Err(ProviderError::Serialization(_))));
    }

    #[test]
    fn fresh_cache_is_used_without_network() {
        let cache_dir = std::env::temp_dir().join(format!("econ-tui-provider-{}", std::process::id()));
        fs::create_dir_all(&cache_dir).unwrap();

        let config = DataConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            country: "US".to_string(),
            start_year: 2000,
            end_year: 2002,
            indicators: vec!["NY.GDP.MKTP.CD".to_string(), "FP.CPI.TOTL.ZG".to_string()],
        };
        let provider = WorldBankProvider::new(config, cache_dir.clone()).unwrap();
        fs::write(provider.cache_file("NY.GDP.MKTP.CD"), PAYLOAD).unwrap();

        // GDP comes from the cache; CPI has no cache and an unreachable host.
        let store = provider.load();
        assert_eq!(store.codes(), &["NY.GDP.MKTP.CD".to_string()]);
        assert_eq!(
            store.series_for("NY.GDP.MKTP.CD").unwrap().points(),
            &[(2000, 10.2), (2002, 10.9)]
        );

        let _ = fs::remove_dir_all(&cache_dir);
    }
}
