mod app;
mod client;
mod config;
mod editor;
mod error;
mod logging;
mod modal_ui;
mod modals;
mod protocol;
mod render;
mod session;
mod ui;
mod validators;

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture, Event,
    KeyCode, KeyEventKind, KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{DefaultTerminal, Terminal};
use tracing::{debug, info, warn};

use crate::app::{App, View};
use crate::client::PrioritizationClient;
use crate::config::{CliOverrides, ConfigLoadStatus};
use crate::modals::{handle_clarification_modal_input, handle_question_modal_input};
use crate::session::Phase;
use crate::ui::draw_ui;
use crate::validators::validate_service_url;

/// Rate requirements and rank them with a prioritization service
#[derive(Parser, Debug)]
#[command(name = "reqrank", version, about)]
struct Cli {
    /// Base URL of the prioritization service
    #[arg(long)]
    url: Option<String>,

    /// Path of the prioritize endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Request timeout in seconds (0 disables it)
    #[arg(long)]
    timeout: Option<u64>,

    /// File to pre-fill the requirements editor with, one requirement per line
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Alternate global config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Contract a path by replacing the home directory with `~` for display.
fn contract_path(path: &std::path::Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(suffix) = path.strip_prefix(&home)
    {
        return format!("~/{}", suffix.display());
    }
    path.display().to_string()
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    // Initialize logging before anything else
    let logging = match logging::init("info") {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };
    let session_id = logging
        .as_ref()
        .map(|ctx| ctx.session_id.clone())
        .unwrap_or_else(|| "no-log".to_string());
    let log_directory = logging.as_ref().map(|ctx| ctx.log_directory.clone());

    // Load configuration
    let mut loaded_config = config::load_config(cli.config.as_deref());
    let overrides = CliOverrides {
        url: cli.url,
        endpoint: cli.endpoint,
        timeout_secs: cli.timeout,
    };
    loaded_config.config = config::apply_cli_overrides(loaded_config.config, &overrides);
    debug!(
        config_path = %contract_path(&loaded_config.config_path),
        project_config = ?loaded_config.project_config_path,
        status = ?loaded_config.status,
        "config_loaded"
    );
    if let ConfigLoadStatus::Error(message) = &loaded_config.status {
        warn!(error = %message, "config_fallback_to_defaults");
    }

    if let Some(ctx) = &logging {
        logging::set_level(&ctx.reload_handle, &loaded_config.config.logging.level);
        logging::cleanup_old_logs(&ctx.log_directory);
    }

    if let Some(message) = validate_service_url(&loaded_config.config.service.url) {
        bail!("{}", message);
    }

    let initial_text = match &cli.input {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let client = PrioritizationClient::new(&loaded_config.config.service)
        .context("Failed to build HTTP client")?;
    info!(url = %client.url(), "service_configured");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let terminal = Terminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

    let mut app = App::new(
        session_id.clone(),
        log_directory,
        loaded_config,
        client,
        runtime.handle().clone(),
    );
    if let Some(text) = initial_text {
        app.editor.set_text(&text);
    }

    let result = run_app(terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        io::stdout(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;

    info!(
        session_id = %session_id,
        requests = app.request_count,
        duration_secs = start_time.elapsed().as_secs_f64(),
        "session_end"
    );

    // Requests still in flight are abandoned
    runtime.shutdown_timeout(Duration::from_millis(100));

    result
}

fn run_app(mut terminal: DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        // Pick up a finished request, if any
        app.poll_request();

        terminal.draw(|f| draw_ui(f, app))?;

        // Poll for events with a short timeout so request results show promptly
        if crossterm::event::poll(Duration::from_millis(50))? {
            match crossterm::event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key(app, key.code, key.modifiers);
                }
                Event::Paste(text) => {
                    if editor_accepts_input(app) {
                        for c in text.chars() {
                            match c {
                                '\n' => app.editor.newline(),
                                '\r' => {}
                                c => app.editor.insert_char(c),
                            }
                        }
                    }
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => app.scroll_up(3),
                    MouseEventKind::ScrollDown => app.scroll_down(3),
                    _ => {}
                },
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Whether keystrokes go to the requirements editor.
fn editor_accepts_input(app: &App) -> bool {
    app.view() == View::Editor
        && app.session.phase() == Phase::Idle
        && app.question_modal_state.is_none()
        && !app.show_help_modal
}

/// Route a key press to whatever has focus.
fn handle_key(app: &mut App, key_code: KeyCode, modifiers: KeyModifiers) {
    if key_code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        info!("quit_requested");
        app.should_quit = true;
        return;
    }

    if app.show_help_modal {
        if matches!(
            key_code,
            KeyCode::Esc | KeyCode::Enter | KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Char('q')
        ) {
            app.show_help_modal = false;
        }
        return;
    }

    if app.question_modal_state.is_some() {
        handle_question_modal_input(app, key_code, modifiers);
        return;
    }

    if app.show_clarification_modal {
        handle_clarification_modal_input(app, key_code, modifiers);
        return;
    }

    match app.view() {
        View::Editor => handle_editor_input(app, key_code, modifiers),
        View::Results => handle_results_input(app, key_code, modifiers),
    }
}

fn handle_editor_input(app: &mut App, key_code: KeyCode, modifiers: KeyModifiers) {
    if !editor_accepts_input(app) {
        return;
    }
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);

    match key_code {
        KeyCode::Char('s') if ctrl => app.submit_requirements(),
        KeyCode::Char('q') if ctrl => app.should_quit = true,
        KeyCode::F(1) => app.show_help_modal = true,
        KeyCode::Char(c) if !ctrl => app.editor.insert_char(c),
        KeyCode::Enter => app.editor.newline(),
        KeyCode::Backspace => app.editor.backspace(),
        KeyCode::Delete => app.editor.delete(),
        KeyCode::Left => app.editor.move_left(),
        KeyCode::Right => app.editor.move_right(),
        KeyCode::Up => app.editor.move_up(),
        KeyCode::Down => app.editor.move_down(),
        KeyCode::Home => app.editor.home(),
        KeyCode::End => app.editor.end(),
        _ => {}
    }
}

fn handle_results_input(app: &mut App, key_code: KeyCode, modifiers: KeyModifiers) {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    let half_page = app.main_pane_height / 2;

    match key_code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') | KeyCode::F(1) => app.show_help_modal = true,
        KeyCode::Char('c') => app.open_clarification_modal(),
        KeyCode::Char('r') => app.retry(),
        KeyCode::Char('n') => app.new_cycle(),
        KeyCode::Char('u') if ctrl => app.scroll_up(half_page),
        KeyCode::Char('d') if ctrl => app.scroll_down(half_page),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.main_pane_height),
        KeyCode::PageDown => app.scroll_down(app.main_pane_height),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
        _ => {}
    }
}
