use anyhow::Result;
use chrono::{DateTime, Local};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind};
use ratatui::{backend::Backend, layout::Rect, Terminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::export::{self, ExportFormat};
use crate::indicators::{IndicatorSeries, IndicatorStore};
use crate::insight::InsightOrchestrator;
use crate::state::{Snapshot, UiState};
use crate::ui;

const STATUS_DURATION_SECS: u64 = 5;
const POLL_INTERVAL_MS: u64 = 100;

/// Tracks clickable UI regions for mouse interaction
#[derive(Default, Clone)]
pub struct ClickableRegions {
    /// Indicator tab areas: (rect, indicator_index)
    pub indicator_tabs: Vec<(Rect, usize)>,
    /// Footer button regions: (rect, action_name)
    pub footer_buttons: Vec<(Rect, &'static str)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Query(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Select(usize),
    SubmitQuery(String),
    Export(ExportFormat),
}

pub struct App {
    pub store: Arc<IndicatorStore>,
    pub ui_state: UiState,
    snapshot_rx: watch::Receiver<Snapshot>,
    /// Latest snapshot seen by the renderer.
    pub snapshot: Snapshot,
    pub orchestrator: InsightOrchestrator,
    pub input_mode: InputMode,
    pub export_dir: PathBuf,
    /// e.g. "US 2000-2022"
    pub source_label: String,
    pub loaded_at: DateTime<Local>,
    pub status: Option<(String, Instant)>,
    pub clickable_regions: ClickableRegions,
}

impl App {
    pub fn new(
        store: Arc<IndicatorStore>,
        ui_state: UiState,
        orchestrator: InsightOrchestrator,
        export_dir: PathBuf,
        source_label: String,
    ) -> Self {
        if ui_state.snapshot().selection.is_none() {
            if let Some(first) = store.codes().first() {
                ui_state.select(first.clone());
            }
        }

        let mut snapshot_rx = ui_state.subscribe();
        let snapshot = snapshot_rx.borrow_and_update().clone();

        App {
            store,
            ui_state,
            snapshot_rx,
            snapshot,
            orchestrator,
            input_mode: InputMode::Normal,
            export_dir,
            source_label,
            loaded_at: Local::now(),
            status: None,
            clickable_regions: ClickableRegions::default(),
        }
    }

    /// Picks up any snapshot published since the last frame.
    /// Returns true if something changed.
    pub fn sync_snapshot(&mut self) -> bool {
        if !self.snapshot_rx.has_changed().unwrap_or(false) {
            return false;
        }
        self.snapshot = self.snapshot_rx.borrow_and_update().clone();
        true
    }

    pub fn selected_index(&self) -> Option<usize> {
        let selection = self.snapshot.selection.as_deref()?;
        self.store.codes().iter().position(|c| c == selection)
    }

    pub fn selected_series(&self) -> Option<&IndicatorSeries> {
        let code = self.snapshot.selection.as_deref()?;
        self.store.series_for(code).ok()
    }

    fn select_index(&mut self, idx: usize) {
        if let Some(code) = self.store.codes().get(idx) {
            self.ui_state.select(code.clone());
            self.sync_snapshot();
        }
    }

    fn next_indicator(&self) -> Action {
        let len = self.store.codes().len();
        if len == 0 {
            return Action::None;
        }
        let idx = self.selected_index().map(|i| (i + 1) % len).unwrap_or(0);
        Action::Select(idx)
    }

    fn prev_indicator(&self) -> Action {
        let len = self.store.codes().len();
        if len == 0 {
            return Action::None;
        }
        let idx = match self.selected_index() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        Action::Select(idx)
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), Instant::now()));
    }

    pub fn active_status(&self) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, at)| at.elapsed().as_secs() < STATUS_DURATION_SECS)
            .map(|(msg, _)| msg.as_str())
    }

    /// Applies an action. Returns true when the app should exit.
    pub fn perform(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return true,
            Action::Select(idx) => self.select_index(idx),
            Action::SubmitQuery(text) => {
                self.orchestrator.submit(text);
                self.sync_snapshot();
            }
            Action::Export(format) => match export::export(&self.store, format, &self.export_dir) {
                Ok(path) => self.set_status(format!("Exported to {}", path.display())),
                Err(e) => {
                    tracing::warn!("export failed: {e}");
                    self.set_status(format!("Export failed: {e}"));
                }
            },
            Action::None => {}
        }
        false
    }
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        // Pick up insight results published by background requests (non-blocking)
        app.sync_snapshot();

        terminal.draw(|f| ui::ui(f, app))?;

        if event::poll(Duration::from_millis(POLL_INTERVAL_MS))? {
            let action = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_input(app, key.code),
                Event::Mouse(mouse) => handle_mouse(app, mouse.kind, mouse.column, mouse.row),
                _ => Action::None,
            };

            if app.perform(action) {
                return Ok(());
            }
        }
    }
}

pub fn handle_input(app: &mut App, key: KeyCode) -> Action {
    match &mut app.input_mode {
        InputMode::Normal => match key {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char(c) if ('1'..='9').contains(&c) => {
                let idx = c as usize - '1' as usize;
                if idx < app.store.codes().len() {
                    Action::Select(idx)
                } else {
                    Action::None
                }
            }
            KeyCode::Right | KeyCode::Tab | KeyCode::Char('l') => app.next_indicator(),
            KeyCode::Left | KeyCode::BackTab | KeyCode::Char('h') => app.prev_indicator(),
            KeyCode::Char('/') | KeyCode::Char('i') => {
                app.input_mode = InputMode::Query(String::new());
                Action::None
            }
            KeyCode::Char('c') => Action::Export(ExportFormat::Csv),
            KeyCode::Char('p') => Action::Export(ExportFormat::Prn),
            _ => Action::None,
        },
        InputMode::Query(text) => match key {
            KeyCode::Enter => {
                let text = std::mem::take(text);
                app.input_mode = InputMode::Normal;
                Action::SubmitQuery(text)
            }
            KeyCode::Esc => {
                app.input_mode = InputMode::Normal;
                Action::None
            }
            KeyCode::Backspace => {
                text.pop();
                Action::None
            }
            KeyCode::Char(c) => {
                text.push(c);
                Action::None
            }
            _ => Action::None,
        },
    }
}

/// Check if a point (x, y) is inside a Rect
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

pub fn handle_mouse(app: &mut App, kind: MouseEventKind, x: u16, y: u16) -> Action {
    if !matches!(kind, MouseEventKind::Down(MouseButton::Left)) {
        return Action::None;
    }

    let regions = &app.clickable_regions;

    for (rect, idx) in &regions.indicator_tabs {
        if point_in_rect(x, y, *rect) {
            return Action::Select(*idx);
        }
    }

    for (rect, action_name) in &regions.footer_buttons {
        if point_in_rect(x, y, *rect) {
            return match *action_name {
                "ask" => {
                    app.input_mode = InputMode::Query(String::new());
                    Action::None
                }
                "csv" => Action::Export(ExportFormat::Csv),
                "prn" => Action::Export(ExportFormat::Prn),
                "quit" => Action::Quit,
                _ => Action::None,
            };
        }
    }

    Action::None
}
