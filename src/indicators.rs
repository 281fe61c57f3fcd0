use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};

/// Well-known World Bank indicator codes and their display names.
const CATALOG: &[(&str, &str)] = &[
    ("NY.GDP.MKTP.CD", "GDP (current US$)"),
    ("NY.GDP.MKTP.KD.ZG", "GDP growth (annual %)"),
    ("NY.GDP.PCAP.CD", "GDP per capita (current US$)"),
    ("FP.CPI.TOTL", "Consumer price index (2010 = 100)"),
    ("FP.CPI.TOTL.ZG", "Inflation, consumer prices (annual %)"),
    ("NE.EXP.GNFS.CD", "Exports of goods and services (current US$)"),
    ("NE.IMP.GNFS.CD", "Imports of goods and services (current US$)"),
    ("SL.UEM.TOTL.ZS", "Unemployment (% of labor force)"),
    ("GC.DOD.TOTL.GD.ZS", "Central government debt (% of GDP)"),
];

pub const DEFAULT_INDICATORS: &[&str] = &[
    "NY.GDP.MKTP.CD",
    "FP.CPI.TOTL.ZG",
    "NE.EXP.GNFS.CD",
    "SL.UEM.TOTL.ZS",
];

pub fn label_for(code: &str) -> String {
    CATALOG
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// One row as delivered by the data provider.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub year: i32,
    pub code: String,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndicatorSeries {
    pub code: String,
    pub label: String,
    points: Vec<(i32, f64)>,
}

impl IndicatorSeries {
    /// Builds a series ordered by year. A repeated year keeps the last value seen.
    pub fn new(code: impl Into<String>, points: impl IntoIterator<Item = (i32, f64)>) -> Self {
        let code = code.into();
        let by_year: BTreeMap<i32, f64> = points.into_iter().collect();
        Self {
            label: label_for(&code),
            code,
            points: by_year.into_iter().collect(),
        }
    }

    pub fn points(&self) -> &[(i32, f64)] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<(i32, f64)> {
        self.points.last().copied()
    }

    /// Returns ((min_year, max_year), (min_value, max_value)) for chart axes
    pub fn bounds(&self) -> Option<((i32, i32), (f64, f64))> {
        let (first_year, _) = *self.points.first()?;
        let (last_year, _) = *self.points.last()?;
        let min = self.points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max = self.points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        Some(((first_year, last_year), (min, max)))
    }

    /// Percent change from the first to the last observation.
    pub fn change_over_range(&self) -> Option<f64> {
        let (_, first) = *self.points.first()?;
        let (_, last) = *self.points.last()?;
        if self.points.len() < 2 || first == 0.0 {
            return None;
        }
        Some(((last - first) / first.abs()) * 100.0)
    }
}

/// Fetched once at startup and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct IndicatorStore {
    order: Vec<String>,
    series: BTreeMap<String, IndicatorSeries>,
}

impl IndicatorStore {
    /// Groups provider rows by indicator. Codes keep the order they first appear in.
    pub fn from_rows(rows: impl IntoIterator<Item = Observation>) -> Self {
        let mut order: Vec<String> = Vec::new();
        let mut grouped: BTreeMap<String, Vec<(i32, f64)>> = BTreeMap::new();

        for row in rows {
            if !grouped.contains_key(&row.code) {
                order.push(row.code.clone());
            }
            grouped.entry(row.code).or_default().push((row.year, row.value));
        }

        let series = grouped
            .into_iter()
            .map(|(code, points)| (code.clone(), IndicatorSeries::new(code, points)))
            .collect();

        Self { order, series }
    }

    pub fn series_for(&self, code: &str) -> StoreResult<&IndicatorSeries> {
        self.series
            .get(code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))
    }

    pub fn codes(&self) -> &[String] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Every observation, ordered by indicator then year.
    pub fn rows(&self) -> Vec<Observation> {
        self.order
            .iter()
            .filter_map(|code| self.series.get(code))
            .flat_map(|s| {
                s.points.iter().map(move |&(year, value)| Observation {
                    year,
                    code: s.code.clone(),
                    value,
                })
            })
            .collect()
    }
}
