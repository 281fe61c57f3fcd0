use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use econ_tui::{InsightClient, InsightError, InsightOrchestrator, InsightResult, InsightView, RequestId, Snapshot, UiState};

type Outcome = Result<String, InsightError>;

/// Fake client whose responses are released by the test, per prompt.
#[derive(Default)]
struct GatedClient {
    gates: Mutex<HashMap<String, oneshot::Receiver<Outcome>>>,
}

impl GatedClient {
    fn gate(&self, prompt: &str) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(prompt.to_string(), rx);
        tx
    }
}

#[async_trait]
impl InsightClient for GatedClient {
    async fn fetch_insight(&self, prompt: &str) -> Outcome {
        let gate = self.gates.lock().unwrap().remove(prompt);
        match gate {
            Some(rx) => rx.await.unwrap_or(Err(InsightError::ServiceUnavailable)),
            None => Err(InsightError::ServiceUnavailable),
        }
    }
}

struct Canned(&'static str);

#[async_trait]
impl InsightClient for Canned {
    async fn fetch_insight(&self, _prompt: &str) -> Outcome {
        Ok(self.0.to_string())
    }
}

struct AlwaysFails;

#[async_trait]
impl InsightClient for AlwaysFails {
    async fn fetch_insight(&self, _prompt: &str) -> Outcome {
        Err(InsightError::ServiceUnavailable)
    }
}

struct Panics;

#[async_trait]
impl InsightClient for Panics {
    async fn fetch_insight(&self, _prompt: &str) -> Outcome {
        panic!("client bug")
    }
}

/// Never answers.
struct Stalled;

#[async_trait]
impl InsightClient for Stalled {
    async fn fetch_insight(&self, _prompt: &str) -> Outcome {
        std::future::pending().await
    }
}

/// Answers "q<n>" after a delay that shrinks as n grows, so later requests finish first.
struct ReverseDelay {
    total: u64,
}

#[async_trait]
impl InsightClient for ReverseDelay {
    async fn fetch_insight(&self, prompt: &str) -> Outcome {
        let n: u64 = prompt.trim_start_matches('q').parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis((self.total - n) * 3)).await;
        Ok(format!("answer {n}"))
    }
}

fn setup(client: Arc<dyn InsightClient>, abort_superseded: bool) -> (InsightOrchestrator, UiState) {
    let ui = UiState::new(Some("NY.GDP.MKTP.CD".to_string()));
    let orch = InsightOrchestrator::new(client, ui.clone(), Handle::current(), abort_superseded);
    (orch, ui)
}

async fn terminal_view(ui: &UiState, id: RequestId) -> InsightView {
    let mut rx = ui.subscribe();
    let snapshot = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| {
            s.insight
                .as_ref()
                .is_some_and(|v| v.request_id == id && v.result.is_terminal())
        }),
    )
    .await
    .expect("timed out waiting for insight")
    .expect("ui state dropped");
    Snapshot::clone(&snapshot).insight.unwrap()
}

#[tokio::test]
async fn request_ids_strictly_increase() {
    let (orch, _ui) = setup(Arc::new(Canned("ok")), true);
    let ids: Vec<RequestId> = (0..5).map(|i| orch.submit(format!("q{i}"))).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    orch.wait_idle().await;
}

#[tokio::test]
async fn pending_is_visible_as_soon_as_submit_returns() {
    let client = Arc::new(GatedClient::default());
    let gate = client.gate("What are GDP trends?");
    let (orch, ui) = setup(client, true);

    let id = orch.submit("What are GDP trends?");
    let insight = ui.snapshot().insight.unwrap();
    assert_eq!(insight.request_id, id);
    assert_eq!(insight.result, InsightResult::Pending);
    assert_eq!(orch.in_flight(), 1);

    gate.send(Ok("done".into())).unwrap();
    orch.wait_idle().await;
    assert_eq!(orch.in_flight(), 0);
}

#[tokio::test]
async fn successful_insight_is_displayed_verbatim() {
    let (orch, ui) = setup(Arc::new(Canned("GDP rose steadily")), true);
    let id = orch.submit("What are GDP trends?");

    let view = terminal_view(&ui, id).await;
    assert_eq!(view.result, InsightResult::Success("GDP rose steadily".into()));
    assert_eq!(view.prompt, "What are GDP trends?");
    assert_eq!(ui.snapshot().selection.as_deref(), Some("NY.GDP.MKTP.CD"));
}

#[tokio::test]
async fn failures_become_terminal_state() {
    let (orch, ui) = setup(Arc::new(AlwaysFails), true);
    let id = orch.submit("anything");
    assert_eq!(id, 1);

    let view = terminal_view(&ui, id).await;
    assert_eq!(view.result, InsightResult::Failure("service unavailable".into()));
}

#[tokio::test]
async fn blank_prompt_is_accepted() {
    let (orch, ui) = setup(Arc::new(Canned("still answered")), true);
    let id = orch.submit("   ");
    let view = terminal_view(&ui, id).await;
    assert_eq!(view.result, InsightResult::Success("still answered".into()));
}

#[tokio::test]
async fn late_older_result_never_overwrites_newer() {
    let client = Arc::new(GatedClient::default());
    let q1 = client.gate("Q1");
    let q2 = client.gate("Q2");
    let (orch, ui) = setup(client, false);

    let first = orch.submit("Q1");
    let second = orch.submit("Q2");
    assert!(first < second);

    q2.send(Ok("Q2 answer".into())).unwrap();
    let view = terminal_view(&ui, second).await;
    assert_eq!(view.result, InsightResult::Success("Q2 answer".into()));

    let mut rx = ui.subscribe();
    rx.borrow_and_update();

    q1.send(Ok("Q1 answer".into())).unwrap();
    orch.wait_idle().await;

    assert!(!rx.has_changed().unwrap(), "superseded request touched the UI state");
    assert_eq!(ui.snapshot().insight.unwrap(), view);
}

#[tokio::test]
async fn older_success_cannot_replace_newer_failure() {
    let client = Arc::new(GatedClient::default());
    let q1 = client.gate("Q1");
    let q2 = client.gate("Q2");
    let (orch, ui) = setup(client, false);

    orch.submit("Q1");
    let second = orch.submit("Q2");

    q2.send(Err(InsightError::ServiceUnavailable)).unwrap();
    terminal_view(&ui, second).await;
    q1.send(Ok("Q1 answer".into())).unwrap();
    orch.wait_idle().await;

    let insight = ui.snapshot().insight.unwrap();
    assert_eq!(insight.request_id, second);
    assert_eq!(insight.result, InsightResult::Failure("service unavailable".into()));
}

#[tokio::test]
async fn older_result_arriving_before_newer_is_suppressed() {
    let client = Arc::new(GatedClient::default());
    let q1 = client.gate("Q1");
    let q2 = client.gate("Q2");
    let (orch, ui) = setup(client, false);

    orch.submit("Q1");
    let second = orch.submit("Q2");

    // Q1 resolves first, but Q2 was already issued: UI stays pending on Q2.
    q1.send(Ok("Q1 answer".into())).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let pending = ui.snapshot().insight.unwrap();
    assert_eq!(pending.request_id, second);
    assert_eq!(pending.result, InsightResult::Pending);

    q2.send(Ok("Q2 answer".into())).unwrap();
    let view = terminal_view(&ui, second).await;
    assert_eq!(view.result, InsightResult::Success("Q2 answer".into()));
}

#[tokio::test]
async fn superseded_call_is_aborted_when_enabled() {
    let client = Arc::new(GatedClient::default());
    let q1 = client.gate("Q1");
    let q2 = client.gate("Q2");
    let (orch, ui) = setup(client, true);

    orch.submit("Q1");
    let second = orch.submit("Q2");
    assert_eq!(orch.in_flight(), 1);

    q2.send(Ok("Q2 answer".into())).unwrap();
    orch.wait_idle().await;

    // The aborted request never completes, even if its response shows up.
    let _ = q1.send(Ok("Q1 answer".into()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(orch.in_flight(), 0);

    let insight = ui.snapshot().insight.unwrap();
    assert_eq!(insight.request_id, second);
    assert_eq!(insight.result, InsightResult::Success("Q2 answer".into()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_submitted_wins_under_reversed_completion() {
    const TOTAL: u64 = 20;
    let (orch, ui) = setup(Arc::new(ReverseDelay { total: TOTAL }), false);

    let mut rx = ui.subscribe();
    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let id = rx.borrow_and_update().insight.as_ref().map(|v| v.request_id);
            if let Some(id) = id {
                seen.push(id);
            }
        }
        seen
    });

    let mut last = 0;
    for n in 1..=TOTAL {
        last = orch.submit(format!("q{n}"));
    }
    orch.wait_idle().await;

    let insight = ui.snapshot().insight.unwrap();
    assert_eq!(insight.request_id, last);
    assert_eq!(insight.result, InsightResult::Success(format!("answer {TOTAL}")));

    drop(orch);
    drop(ui);
    let seen = observer.await.unwrap();
    assert!(
        seen.windows(2).all(|w| w[0] <= w[1]),
        "displayed request id went backwards: {seen:?}"
    );
}

#[tokio::test]
async fn panicking_client_ends_in_failure() {
    let (orch, ui) = setup(Arc::new(Panics), true);
    let id = orch.submit("q");
    orch.wait_idle().await;

    let insight = ui.snapshot().insight.unwrap();
    assert_eq!(insight.request_id, id);
    assert_eq!(insight.result, InsightResult::Failure("service unavailable".into()));
    assert_eq!(orch.in_flight(), 0);
}

#[tokio::test]
async fn waiting_for_idle_keeps_requests_abortable() {
    let (orch, _ui) = setup(Arc::new(Stalled), false);
    orch.submit("q");

    let waiter = tokio::spawn({
        let orch = orch.clone();
        async move { orch.wait_idle().await }
    });
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());
    assert_eq!(orch.in_flight(), 1);

    orch.shutdown();
    assert_eq!(orch.in_flight(), 0);
    tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("wait_idle never returned after shutdown")
        .unwrap();
}

#[tokio::test]
async fn result_keeps_submission_time() {
    let client = Arc::new(GatedClient::default());
    let gate = client.gate("q");
    let (orch, ui) = setup(client, true);

    let before = chrono::Local::now();
    let id = orch.submit("q");
    let issued_at = ui.snapshot().insight.unwrap().issued_at;
    assert!(issued_at >= before);

    tokio::time::sleep(Duration::from_millis(10)).await;
    gate.send(Ok("done".into())).unwrap();
    let view = terminal_view(&ui, id).await;
    assert_eq!(view.issued_at, issued_at);
}
