use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

mod api;
mod app;
mod config;
mod dispatch;
mod error;
mod format;
mod handler;
mod input;
mod logging;
mod model;
mod transcript;
mod tui;
mod ui;

use api::TeyaClient;
use app::App;
use config::{Config, BASE_URL_ENV};

#[derive(Parser, Debug)]
#[command(name = "teya")]
#[command(version, about = "Terminal client for the Teya story-chat backend")]
struct Cli {
    /// Backend address, e.g. http://127.0.0.1:5000
    #[arg(short, long)]
    base_url: Option<String>,
    /// Directory for log files
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Remember the backend address in the config file
    #[arg(long)]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = Config::get_config_path()?;
    let (mut config, config_error) = Config::load_or_default(&config_path);
    let base_url = config.resolve_base_url(cli.base_url.as_deref(), std::env::var(BASE_URL_ENV).ok());
    let log_dir = config.resolve_log_dir(cli.log_dir)?;
    let _guard = logging::setup_logging(&log_dir)?;
    if let Some(e) = config_error {
        tracing::warn!(path = %config_path.display(), "ignoring unreadable config: {:#}", e);
    }

    if cli.save {
        config.base_url = Some(base_url.clone());
        config.save()?;
    }

    tracing::info!(%base_url, "starting");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &base_url).await;
    tui::restore()?;

    if let Err(e) = &result {
        tracing::error!("exited with error: {:#}", e);
    }
    result
}

async fn run(terminal: &mut tui::Tui, base_url: &str) -> Result<()> {
    let mut events = tui::EventHandler::new();
    let backend = Arc::new(TeyaClient::new(base_url));
    let mut app = App::new(backend, events.sender());

    app.load_chats();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event),
            None => break,
        }
    }

    Ok(())
}
