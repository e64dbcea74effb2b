//! Application state and core logic.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Instant;

use ratatui::style::Color;
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Wrap};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::client::PrioritizationClient;
use crate::config::{Config, LoadedConfig};
use crate::editor::RequirementsEditor;
use crate::error::SessionError;
use crate::modals::{ClarificationFocus, ClarificationModalState, QuestionModalState};
use crate::protocol::{PrioritizationRequest, PrioritizationResult};
use crate::render::{render_clarification_requests, render_result};
use crate::session::{Phase, Session, Step};

/// Application status states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Idle,
    Busy,
    Error,
}

impl AppStatus {
    pub fn border_type(&self) -> BorderType {
        match self {
            AppStatus::Idle => BorderType::Rounded,
            AppStatus::Busy | AppStatus::Error => BorderType::Double,
        }
    }

    /// Returns the color for this status, with pulsing effect for Error state.
    /// The pulse alternates between red and dark red every 15 frames.
    pub fn pulsing_color(&self, frame_count: u64) -> Color {
        match self {
            AppStatus::Idle => Color::Cyan,
            AppStatus::Busy => Color::Green,
            AppStatus::Error => {
                if (frame_count / 15).is_multiple_of(2) {
                    Color::Red
                } else {
                    Color::Rgb(128, 0, 0)
                }
            }
        }
    }
}

/// What occupies the main pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Editor,
    Results,
}

/// Outcome of a request, sent back from the runtime.
#[derive(Debug)]
pub enum RequestOutcome {
    Completed(PrioritizationResult),
    Failed(String),
}

/// Main application state.
pub struct App {
    pub session: Session,
    pub editor: RequirementsEditor,
    /// State for the question modal (open while rating).
    pub question_modal_state: Option<QuestionModalState>,
    pub show_clarification_modal: bool,
    /// Kept while hidden so typed answers survive closing the modal.
    pub clarification_modal_state: Option<ClarificationModalState>,
    pub show_help_modal: bool,
    pub result_lines: Vec<String>,
    pub scroll_offset: u16,
    pub main_pane_height: u16,
    pub main_pane_width: u16,
    /// Session ID for this invocation (always populated).
    pub session_id: String,
    /// Directory where logs are written.
    pub log_directory: Option<PathBuf>,
    pub config: Config,
    pub config_path: PathBuf,
    /// Message from the last failed request.
    pub last_error: Option<String>,
    pub request_receiver: Option<Receiver<RequestOutcome>>,
    /// Requests sent this run, including retries.
    pub request_count: u64,
    pub request_started_at: Option<Instant>,
    /// Frame counter for animations (incremented each render cycle).
    pub frame_count: u64,
    pub should_quit: bool,
    client: PrioritizationClient,
    runtime: Handle,
}

impl App {
    pub fn new(
        session_id: String,
        log_directory: Option<PathBuf>,
        loaded_config: LoadedConfig,
        client: PrioritizationClient,
        runtime: Handle,
    ) -> Self {
        let session = Session::new(loaded_config.config.ratings.default);
        Self {
            session,
            editor: RequirementsEditor::new(),
            question_modal_state: None,
            show_clarification_modal: false,
            clarification_modal_state: None,
            show_help_modal: false,
            result_lines: Vec::new(),
            scroll_offset: 0,
            main_pane_height: 0,
            main_pane_width: 0,
            session_id,
            log_directory,
            config: loaded_config.config,
            config_path: loaded_config.config_path,
            last_error: None,
            request_receiver: None,
            request_count: 0,
            request_started_at: None,
            frame_count: 0,
            should_quit: false,
            client,
            runtime,
        }
    }

    pub fn status(&self) -> AppStatus {
        match self.session.phase() {
            Phase::Submitting => AppStatus::Busy,
            Phase::Failed => AppStatus::Error,
            _ => AppStatus::Idle,
        }
    }

    pub fn view(&self) -> View {
        match self.session.phase() {
            Phase::Idle | Phase::Collecting => View::Editor,
            Phase::Submitting if self.session.last_result().is_none() => View::Editor,
            _ => View::Results,
        }
    }

    pub fn service_url(&self) -> &str {
        self.client.url()
    }

    /// Start a cycle from the editor contents.
    pub fn submit_requirements(&mut self) {
        if self.session.phase() == Phase::Submitting {
            debug!("submit_ignored_request_in_flight");
            return;
        }
        let text = self.editor.text();
        match self.session.submit_requirements(&text) {
            Ok(step) => self.apply_step(step),
            Err(e) => warn!(error = %e, "submit_requirements_rejected"),
        }
    }

    /// Submit the open question modal.
    pub fn submit_answer(&mut self) {
        let Some(state) = &self.question_modal_state else {
            return;
        };
        let input = state.to_rating_input();

        match self.session.submit_answer(&input) {
            Ok(step) => self.apply_step(step),
            Err(SessionError::InvalidRating { field, message }) => {
                if let Some(state) = &mut self.question_modal_state {
                    state.validation_errors.insert(field.into(), message);
                    state.focus_field(field.into());
                }
            }
            Err(e) => {
                if let Some(state) = &mut self.question_modal_state {
                    state.error = Some(e.to_string());
                }
            }
        }
    }

    /// Close the question modal and go back to editing.
    pub fn cancel_questions(&mut self) {
        self.session.cancel();
        self.question_modal_state = None;
    }

    /// Submit the clarification modal.
    pub fn submit_clarifications(&mut self) {
        let Some(state) = &self.clarification_modal_state else {
            return;
        };
        let answers = state.answers();
        for (prompt, answer) in state.prompts.iter().zip(&answers) {
            if answer.text.trim().is_empty() {
                debug!(input = %prompt.input_id(), "clarification_left_blank");
            }
        }

        match self.session.submit_clarifications(&answers) {
            Ok(step) => self.apply_step(step),
            Err(e) => {
                if let Some(state) = &mut self.clarification_modal_state {
                    if let SessionError::MissingTarget { index } = e {
                        state.focus = ClarificationFocus::Target(index);
                    }
                    state.error = Some(e.to_string());
                }
            }
        }
    }

    /// Re-open the clarification modal after it was hidden.
    pub fn open_clarification_modal(&mut self) {
        if self.session.phase() == Phase::Clarifying && self.clarification_modal_state.is_some() {
            self.show_clarification_modal = true;
        }
    }

    /// Re-send the request that failed.
    pub fn retry(&mut self) {
        match self.session.retry() {
            Ok(step) => self.apply_step(step),
            Err(e) => debug!(error = %e, "retry_ignored"),
        }
    }

    /// Drop the current result and return to the editor, keeping its text.
    pub fn new_cycle(&mut self) {
        if self.session.phase() == Phase::Submitting {
            return;
        }
        info!("new_cycle");
        self.session.reset();
        self.question_modal_state = None;
        self.clarification_modal_state = None;
        self.show_clarification_modal = false;
        self.result_lines.clear();
        self.scroll_offset = 0;
        self.last_error = None;
    }

    /// Act on what the session asked for.
    pub fn apply_step(&mut self, step: Step) {
        match step {
            Step::Ask {
                index,
                total,
                requirement,
            } => {
                self.question_modal_state = Some(QuestionModalState::new(index, total, requirement));
            }
            Step::Send(request) => {
                self.question_modal_state = None;
                self.show_clarification_modal = false;
                self.send_request(request);
            }
            Step::Display => {
                self.clarification_modal_state = None;
                self.show_clarification_modal = false;
                self.refresh_results();
            }
            Step::Clarify(prompts) => {
                self.clarification_modal_state = Some(ClarificationModalState::new(
                    prompts,
                    self.session.requirements().to_vec(),
                ));
                self.show_clarification_modal = true;
                self.refresh_results();
            }
        }
    }

    /// Spawn the request on the runtime; the outcome arrives through a channel.
    fn send_request(&mut self, request: PrioritizationRequest) {
        self.request_count += 1;
        self.last_error = None;
        self.request_started_at = Some(Instant::now());

        let (tx, rx) = mpsc::channel();
        let client = self.client.clone();
        let request_number = self.request_count;
        info!(request_number, url = %client.url(), "request_dispatched");

        self.runtime.spawn(async move {
            let outcome = match client.prioritize(&request).await {
                Ok(result) => RequestOutcome::Completed(result),
                Err(e) => RequestOutcome::Failed(e.to_string()),
            };
            // Receiver is gone if the app quit mid-request
            let _ = tx.send(outcome);
        });

        self.request_receiver = Some(rx);
    }

    /// Check for a finished request. Called every tick of the event loop.
    pub fn poll_request(&mut self) {
        let Some(rx) = &self.request_receiver else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                RequestOutcome::Failed("Request ended without a response".to_string())
            }
        };
        self.request_receiver = None;
        self.handle_outcome(outcome);
    }

    pub fn handle_outcome(&mut self, outcome: RequestOutcome) {
        let elapsed_ms = self
            .request_started_at
            .take()
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0);

        match outcome {
            RequestOutcome::Completed(result) => {
                info!(elapsed_ms, "request_completed");
                self.last_error = None;
                let step = self.session.receive_result(result);
                self.apply_step(step);
            }
            RequestOutcome::Failed(message) => {
                warn!(elapsed_ms, error = %message, "request_failed");
                self.session.request_failed(&message);
                self.last_error = Some(message);
                self.refresh_results();
            }
        }
    }

    /// Rebuild the results pane from the session.
    pub fn refresh_results(&mut self) {
        let mut lines = match self.session.last_result() {
            Some(result) => render_result(result),
            None => Vec::new(),
        };
        // Prompts are only answerable while the round is open
        if self.session.phase() == Phase::Clarifying {
            lines.extend(render_clarification_requests(
                self.session.clarifications(),
                self.session.requirements(),
            ));
        }
        if let Some(error) = &self.last_error {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("Request failed: {}", error));
            lines.push("Press r to retry or n to edit the requirements.".to_string());
        }
        self.result_lines = lines;
        self.scroll_offset = 0;
    }

    pub fn visual_line_count(&self) -> u16 {
        if self.main_pane_width == 0 {
            return 0;
        }
        let content: Vec<Line> = self.result_lines.iter().map(Line::raw).collect();
        let paragraph = Paragraph::new(content)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false });
        paragraph.line_count(self.main_pane_width) as u16
    }

    pub fn max_scroll(&self) -> u16 {
        self.visual_line_count()
            .saturating_sub(self.main_pane_height)
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
    }

    pub fn scroll_down(&mut self, amount: u16) {
        let max = self.max_scroll();
        self.scroll_offset = (self.scroll_offset + amount).min(max);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_scroll();
    }
}
