use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

mod ui;
mod utils;

use crate::ui::{ChatUI, UiAction};
use palaver::config::{ClientConfig, DEFAULT_SERVER_URL};
use palaver::events::AppEvent;
use palaver::{ChatController, HttpChatApi, Screen, SendOutcome, TokenStore};

/// Command line arguments for Palaver
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Palaver: a terminal client for a simple two-party chat server.",
    long_about = "Palaver logs in to a chat server over HTTP, lists your contacts and \
    polls the open conversation for new messages.\n\n\
    The server URL can also be given through the PALAVER_SERVER environment variable."
)]
struct Args {
    /// Base URL of the chat server
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Screen to open: login, signup or chat
    #[arg(long, default_value = "chat")]
    screen: Screen,

    /// Directory for the session file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    config_dir: Option<PathBuf>,

    /// How often the open conversation is refreshed
    #[arg(long, value_name = "MS", default_value_t = 3000)]
    poll_interval_ms: u64,

    #[arg(long, value_name = "PATH", default_value = "palaver.log")]
    log_file: PathBuf,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let server = self
            .server
            .clone()
            .or_else(|| env::var("PALAVER_SERVER").ok())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        ClientConfig::new(server)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_config_dir(self.config_dir.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(&args.log_file, args.log_level)
        .with_context(|| format!("Failed to open log file {}", args.log_file.display()))?;

    let config = args.client_config();
    info!("Palaver starting, server {}", config.server_url);

    let tokens = match &config.config_dir {
        Some(dir) => TokenStore::in_dir(dir),
        None => TokenStore::default_location()?,
    };
    info!("Session file: {}", tokens.path().display());

    let api = HttpChatApi::new(&config)?;
    let (mut controller, mut events) =
        ChatController::new(Arc::new(api), tokens, config.poll_interval);
    controller.bootstrap(args.screen).await;

    let mut terminal = ui::setup_terminal()?;
    let mut chat_ui = ChatUI::new();

    let result = run_main_loop(&mut chat_ui, &mut terminal, &mut controller, &mut events).await;

    // Restore terminal even if the loop failed
    ui::restore_terminal(terminal)?;
    if let Err(e) = &result {
        error!("Main loop exited with error: {}", e);
    }

    println!("Chat session ended.");
    result
}

async fn run_main_loop(
    chat_ui: &mut ChatUI,
    terminal: &mut ui::Terminal<ui::CrosstermBackend<io::Stdout>>,
    controller: &mut ChatController,
    events: &mut mpsc::Receiver<AppEvent>,
) -> Result<()> {
    loop {
        controller.state_mut().expire_banner(Instant::now());
        terminal.draw(|f| chat_ui.draw(f, controller.state()))?;

        if let Some(action) = chat_ui.handle_input(controller.state())? {
            if action == UiAction::Quit {
                info!("Quit requested");
                return Ok(());
            }
            apply_action(action, chat_ui, controller).await;
        }

        // Drain whatever the background tasks delivered
        while let Ok(event) = events.try_recv() {
            controller.handle_event(event);
        }
    }
}

async fn apply_action(action: UiAction, chat_ui: &mut ChatUI, controller: &mut ChatController) {
    match action {
        UiAction::Quit => {}
        UiAction::Login { username, password } => {
            controller.login(&username, &password).await;
            let logged_in = controller.state().screen == Screen::Chat;
            chat_ui.clear_login_form(logged_in);
        }
        UiAction::Signup { username, password } => {
            controller.signup(&username, &password).await;
            chat_ui.clear_login_form(false);
        }
        UiAction::OpenScreen(screen) => controller.open_screen(screen),
        UiAction::SendMessage(input) => {
            if controller.send_message(&input).await == SendOutcome::Sent {
                chat_ui.clear_message_input();
            }
        }
        UiAction::SelectContact { id, username } => controller.select_contact(id, &username),
        UiAction::ShowAddContact => controller.show_add_contact(),
        UiAction::CloseAddContact => controller.close_add_contact(),
        UiAction::AddContact(username) => {
            if controller.add_contact(&username).await {
                chat_ui.clear_add_contact_input();
            }
        }
        UiAction::DismissAlert => controller.dismiss_alert(),
        UiAction::Logout => {
            controller.logout();
            chat_ui.reset();
        }
    }
}
