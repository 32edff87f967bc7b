//! bsa-tui: Terminal admin dashboard for the BSA API
//!
//! - Login and registration
//! - Dashboard totals
//! - Browse, create, edit and delete products, categories and brands
//!
//! Environment:
//! - `BSA_CONFIG`: config file path
//! - `BSA_API_URL`: API base URL, overriding the config
//! - `BSA_EPHEMERAL=1`: keep the session in memory only

mod app;
mod form;
mod input;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bsa_core::{ApiClient, Config, FileSessionStore, MemorySessionStore, SessionStore};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::{App, AppResult};
use crate::input::handle_key;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing to file (not stdout, would interfere with TUI)
    let log_dir = dirs::cache_dir()
        .map(|d| d.join("bsa"))
        .unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::never(&log_dir, "tui.log");

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bsa_tui=debug,bsa_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(file_appender))
        .init();

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    info!(api = %config.api.base_url, "Starting");

    let store = session_store(&config);
    let client = ApiClient::from_config(&config, store)?;
    let mut app = App::new(config, client);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return Err(e);
    }

    Ok(())
}

/// File-backed store unless `BSA_EPHEMERAL=1`
fn session_store(config: &Config) -> Arc<dyn SessionStore> {
    if std::env::var("BSA_EPHEMERAL").is_ok_and(|v| v == "1") {
        info!("Using in-memory session store");
        return Arc::new(MemorySessionStore::new());
    }

    match config.session_path() {
        Ok(path) => {
            info!(path = %path.display(), "Using session file");
            Arc::new(FileSessionStore::new(path))
        }
        Err(e) => {
            warn!("No session location ({}), session will not persist", e);
            Arc::new(MemorySessionStore::new())
        }
    }
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // Poll with a timeout so spawned calls can settle between keys
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let AppResult::Quit = handle_key(app, key) {
                        return Ok(());
                    }
                }
            }
        }

        app.tick();
        tokio::task::yield_now().await;
    }
}
