//! Terminal dashboard for macroeconomic indicators.
//!
//! Indicator series are fetched once at startup into an [`IndicatorStore`].
//! Questions typed by the user go through the [`InsightOrchestrator`], which
//! calls the AI provider off the UI thread and publishes results into the
//! shared [`UiState`] using last-submitted-wins ordering.

pub mod app;
pub mod config;
pub mod error;
pub mod export;
pub mod indicators;
pub mod insight;
pub mod logging;
pub mod provider;
pub mod state;
pub mod ui;

pub use error::{ExportError, InsightError, ProviderError, StoreError};
pub use indicators::{IndicatorSeries, IndicatorStore, Observation};
pub use insight::{ChatCompletionClient, InsightClient, InsightOrchestrator};
pub use state::{InsightResult, InsightView, RequestId, Snapshot, UiState};
