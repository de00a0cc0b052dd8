use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

mod app;
mod config;
mod controller;
mod error;
mod handler;
mod input;
mod logging;
mod message;
mod responder;
mod storage;
mod theme;
mod transcript;
mod tui;
mod ui;

use app::App;
use config::{Config, Overrides, Settings};
use controller::ReplyReady;
use responder::KeywordResponder;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "chat")]
#[command(about = "Terminal chat with a simulated assistant", version)]
struct Cli {
    /// Delay before the assistant replies, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Keep the theme choice for this session only
    #[arg(long)]
    no_persist: bool,

    /// Hide the theme selector
    #[arg(long)]
    no_themes: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            reply_delay_ms: self.delay_ms,
            no_persist: self.no_persist,
            no_themes: self.no_themes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("Logging disabled: {}", e);
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Using default config: {}", e);
        Config::new()
    });
    let settings = Settings::resolve(&config, &cli.overrides());
    tracing::debug!(?settings, "Resolved settings");

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let mut app = App::new(
        &settings,
        storage::open_default(settings.persist_theme),
        Arc::new(KeywordResponder::new(settings.reply_delay)),
        reply_tx,
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(tui::TICK_RATE);

    let result = run(&mut terminal, &mut app, &mut events, &mut reply_rx).await;

    app.shutdown();
    tui::restore()?;
    tracing::info!("Exiting");
    result
}

async fn run(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
    replies: &mut mpsc::UnboundedReceiver<ReplyReady>,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event),
            Some(reply) = replies.recv() => app.handle_reply(reply),
            else => break,
        }
    }

    Ok(())
}
