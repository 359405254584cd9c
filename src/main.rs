use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

mod api;
mod app;
mod config;
mod handler;
mod message;
mod tui;
mod turn;
mod ui;

use app::App;
use config::Config;
use tui::{EventHandler, Tui};

/// Log to a file: the TUI owns the terminal, so nothing may print to it.
/// `RUST_LOG` controls the level, default `info`.
fn init_tracing() -> Result<()> {
    let log_dir = Config::data_dir()?;
    std::fs::create_dir_all(&log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("bankchat.log"))?;
    let file = Arc::new(file);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true);

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = Config::load().unwrap_or_default();
    info!(base_url = %config.base_url(), "starting bankchat");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &config).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut Tui, config: &Config) -> Result<()> {
    let mut app = App::new(config);
    app.spawn_health_probe();

    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event).await,
            None => break,
        }
    }

    info!("session ended");
    Ok(())
}
