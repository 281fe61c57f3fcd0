use chrono::Local;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::client::InsightClient;
use crate::error::InsightError;
use crate::state::{InsightResult, InsightView, RequestId, UiState};

struct Inner {
    client: Arc<dyn InsightClient>,
    ui: UiState,
    runtime: Handle,
    abort_superseded: bool,
    // Highest token handed out. Held across publishes so completions and
    // submits are serialised.
    latest: Mutex<RequestId>,
    // Requests that may still publish. Never locked before `latest`.
    tasks: Mutex<Vec<(RequestId, JoinHandle<()>)>>,
    // Spawned futures not yet dropped, aborted ones included.
    active: watch::Sender<usize>,
}

/// Held by each spawned request; dropped when its future finishes, panics or is aborted.
struct TaskGuard {
    inner: Arc<Inner>,
    id: RequestId,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.inner.tasks().retain(|(task, _)| *task != self.id);
        self.inner.active.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Turns submitted prompts into insight results on the [`UiState`].
///
/// Each `submit` takes the next generation token and publishes `Pending`
/// before returning. The client call runs on the tokio runtime; when it
/// resolves, its outcome is published only if no newer request has been
/// submitted in the meantime (last submitted wins, not last completed).
/// Token allocation and the staleness check both happen under the same
/// lock as the publish, so a stale completion can never land between a
/// newer request's allocation and its `Pending` write.
#[derive(Clone)]
pub struct InsightOrchestrator {
    inner: Arc<Inner>,
}

impl InsightOrchestrator {
    /// With `abort_superseded`, the network call of an older request is
    /// aborted as soon as a newer one is submitted. Either way an older
    /// request never reaches the UI once a newer one exists.
    pub fn new(
        client: Arc<dyn InsightClient>,
        ui: UiState,
        runtime: Handle,
        abort_superseded: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                ui,
                runtime,
                abort_superseded,
                latest: Mutex::new(0),
                tasks: Mutex::new(Vec::new()),
                active: watch::channel(0).0,
            }),
        }
    }

    /// Starts a request and returns its id without waiting for the provider.
    pub fn submit(&self, prompt: impl Into<String>) -> RequestId {
        let prompt = prompt.into();
        let mut latest = self.inner.latest();

        *latest += 1;
        let id = *latest;

        if self.inner.abort_superseded {
            for (old, handle) in self.inner.tasks().drain(..) {
                handle.abort();
                tracing::debug!(request_id = old, "aborted superseded insight request");
            }
        }

        let pending = InsightView {
            request_id: id,
            prompt,
            issued_at: Local::now(),
            result: InsightResult::Pending,
        };
        self.inner.ui.publish_insight(pending.clone());
        tracing::info!(request_id = id, prompt_len = pending.prompt.trim().len(), "insight requested");

        self.inner.active.send_modify(|n| *n += 1);
        let guard = TaskGuard {
            inner: Arc::clone(&self.inner),
            id,
        };
        let handle = self.inner.runtime.spawn(async move {
            let inner = &guard.inner;
            let outcome = AssertUnwindSafe(inner.client.fetch_insight(&pending.prompt))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::error!(request_id = id, "insight client panicked");
                    Err(InsightError::ServiceUnavailable)
                });
            inner.complete(pending, outcome);
            drop(guard);
        });
        self.inner.tasks().push((id, handle));

        id
    }

    /// Highest id handed out so far.
    pub fn latest(&self) -> Option<RequestId> {
        match *self.inner.latest() {
            0 => None,
            id => Some(id),
        }
    }

    /// Requests still running that have not been aborted.
    pub fn in_flight(&self) -> usize {
        self.inner
            .tasks()
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .count()
    }

    /// Waits until every spawned request has completed or been aborted.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.active.subscribe();
        // The sender lives in `inner`, so this only returns once the count hits zero.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Aborts every outstanding request. The UI keeps whatever it shows.
    pub fn shutdown(&self) {
        for (id, handle) in self.inner.tasks().drain(..) {
            handle.abort();
            tracing::debug!(request_id = id, "aborted insight request on shutdown");
        }
    }
}

impl Inner {
    fn latest(&self) -> MutexGuard<'_, RequestId> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<(RequestId, JoinHandle<()>)>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes the outcome of `request` unless it has been superseded.
    /// Returns whether the UI was updated.
    fn complete(&self, request: InsightView, outcome: Result<String, InsightError>) -> bool {
        let id = request.request_id;
        let latest = self.latest();
        if id < *latest {
            tracing::debug!(request_id = id, latest = *latest, "insight request superseded");
            return false;
        }

        let result = match outcome {
            Ok(text) => {
                tracing::info!(request_id = id, "insight received");
                InsightResult::Success(text)
            }
            Err(e) => {
                tracing::info!(request_id = id, "insight failed: {e}");
                InsightResult::Failure(e.to_string())
            }
        };

        self.ui.publish_insight(InsightView { result, ..request });
        true
    }
}
