use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;

use econ_tui::app::{run_app, App};
use econ_tui::config::{self, Config};
use econ_tui::provider::WorldBankProvider;
use econ_tui::{logging, ChatCompletionClient, InsightOrchestrator, UiState};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("invalid configuration")?;
    logging::init(&config::cache_dir().join("logs"))?;

    if config.insight.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; insight requests will fail");
    }

    // The UI loop stays on this thread; insight requests run on the runtime's workers.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let source_label = format!(
        "{} {}-{}",
        config.data.country, config.data.start_year, config.data.end_year
    );
    let provider = WorldBankProvider::new(config.data.clone(), config::cache_dir())
        .context("failed to build data provider")?;
    let store = Arc::new(provider.load());
    tracing::info!(indicators = store.codes().len(), "indicator data loaded");

    let client = ChatCompletionClient::new(&config.insight).context("failed to build HTTP client")?;
    let ui_state = UiState::new(None);
    let orchestrator = InsightOrchestrator::new(
        Arc::new(client),
        ui_state.clone(),
        runtime.handle().clone(),
        config.insight.abort_superseded,
    );

    let mut app = App::new(
        store.clone(),
        ui_state,
        orchestrator.clone(),
        config.export_dir.clone(),
        source_label,
    );
    if store.is_empty() {
        app.set_status("Failed to load indicator data, see log for details");
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    orchestrator.shutdown();
    runtime.shutdown_background();

    if let Err(err) = res {
        tracing::error!("application error: {err:?}");
        eprintln!("Error: {err:?}");
    }

    Ok(())
}
