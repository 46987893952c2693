use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use case_graph::config::AppConfig;
use case_graph::core::logging;
use case_graph::core::network::{
    Dataset, GraphBuilder, LayoutEngine, MemoryGateway, NetworkController,
};
use case_graph::tui::app::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, notices) = AppConfig::load();
    let _log_guard = logging::init_tui(&config.logging, &config.data_dir());
    log::info!("{} v{} starting", case_graph::NAME, case_graph::VERSION);
    for notice in &notices {
        notice.emit();
    }

    // A path on the command line wins over the configured dataset.
    let dataset_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.data.dataset_path.clone());
    let dataset = match dataset_path {
        Some(path) => Dataset::load(&path)
            .with_context(|| format!("loading dataset {}", path.display()))?,
        None => {
            log::info!("No dataset configured; using the demo case");
            Dataset::demo()
        }
    };

    let network = &config.network;
    let controller = NetworkController::new(
        Arc::new(MemoryGateway::new(dataset)),
        network.workflow,
        LayoutEngine::new(network.layout_config()),
        GraphBuilder::new(network.default_confidence),
    )
    .with_layout(network.default_layout);
    let mut app = App::new(controller);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if config.tui.mouse_enabled {
        execute!(stdout, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app
        .run(&mut terminal, Duration::from_millis(config.tui.tick_rate_ms))
        .await;

    // Restore terminal
    disable_raw_mode()?;
    if config.tui.mouse_enabled {
        execute!(terminal.backend_mut(), DisableMouseCapture)?;
    }
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        log::error!("TUI exited with error: {e}");
        return Err(e.into());
    }

    log::info!("Shutting down");
    Ok(())
}
