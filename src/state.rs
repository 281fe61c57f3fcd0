use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::sync::watch;

/// Generation token for insight requests. Starts at 1 and only grows.
pub type RequestId = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsightResult {
    Pending,
    Success(String),
    Failure(String),
}

impl InsightResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InsightResult::Pending)
    }
}

/// The insight currently on display, tagged with the request that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsightView {
    pub request_id: RequestId,
    pub prompt: String,
    /// When the request was submitted. Carried unchanged into its result.
    pub issued_at: DateTime<Local>,
    pub result: InsightResult,
}

/// Immutable view of everything the renderer reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub selection: Option<String>,
    pub insight: Option<InsightView>,
}

/// Observable dashboard state.
///
/// Every write replaces the snapshot under the channel's lock, so readers
/// never observe a torn update. Selection is written by UI actions; the
/// insight slot is written only by the orchestrator.
#[derive(Clone)]
pub struct UiState {
    tx: Arc<watch::Sender<Snapshot>>,
}

impl UiState {
    pub fn new(selection: Option<String>) -> Self {
        let (tx, _rx) = watch::channel(Snapshot {
            selection,
            insight: None,
        });
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    pub fn select(&self, code: impl Into<String>) {
        let code = code.into();
        self.tx.send_if_modified(|snap| {
            if snap.selection.as_deref() == Some(code.as_str()) {
                return false;
            }
            snap.selection = Some(code);
            true
        });
    }

    pub(crate) fn publish_insight(&self, view: InsightView) {
        self.tx.send_modify(|snap| snap.insight = Some(view));
    }
}
