//! UI rendering functions.

use std::time::Duration;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, AppStatus, View};
use crate::modal_ui::{draw_clarification_modal, draw_help_modal, draw_question_modal};
use crate::session::Phase;

/// Formats a duration as M:SS (under 1 hour) or H:MM:SS (1+ hours).
pub fn format_elapsed(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Truncates a string to the given display width, appending "..." if truncated.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    // Replace newlines with spaces for single-line display
    let single_line: String = s.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();

    if single_line.width() <= max_width {
        return single_line;
    }

    let budget = max_width.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for c in single_line.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push_str("...");
    out
}

/// Calculate a centered rectangle within the given area.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// Key hints for the footer, by what is on screen.
fn shortcuts(app: &App) -> &'static str {
    match (app.view(), app.session.phase()) {
        (View::Editor, Phase::Submitting) => "Submitting...  [Ctrl+C] Quit",
        (View::Editor, _) => "[Ctrl+S] Submit  [F1] Help  [Ctrl+Q] Quit",
        (View::Results, Phase::Submitting) => "[↑↓] Scroll  [?] Help  [q] Quit",
        (View::Results, Phase::Failed) => "[r] Retry  [n] New  [?] Help  [q] Quit",
        (View::Results, Phase::Clarifying) => "[c] Clarify  [n] New  [?] Help  [q] Quit",
        (View::Results, _) => "[↑↓] Scroll  [n] New  [?] Help  [q] Quit",
    }
}

/// Draw the main UI.
pub fn draw_ui(f: &mut Frame, app: &mut App) {
    // Increment frame counter for animations
    app.frame_count = app.frame_count.wrapping_add(1);

    // Two-panel layout: main (flexible) + command (fixed height 3)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Main panel (flexible)
            Constraint::Length(3), // Command panel (border + 1 content row + border)
        ])
        .split(f.area());

    // Update main pane dimensions for scroll calculations
    app.main_pane_height = chunks[0].height.saturating_sub(2); // Account for borders
    app.main_pane_width = chunks[0].width;

    let status = app.status();
    let border_color = status.pulsing_color(app.frame_count);

    match app.view() {
        View::Editor => draw_editor(f, app, chunks[0], border_color),
        View::Results => draw_results(f, app, chunks[0], border_color),
    }

    // Status indicator: colored dot + text (elapsed time while submitting)
    let status_dot = "● ";
    let status_text = match (status, app.request_started_at) {
        (AppStatus::Busy, Some(start)) => format_elapsed(start.elapsed()),
        _ if app.session.phase() == Phase::Collecting => format!(
            "{} {}/{}",
            Phase::Collecting.label(),
            app.session.cursor() + 1,
            app.session.requirements().len()
        ),
        _ => app.session.phase().label().to_string(),
    };

    let shortcuts = shortcuts(app);
    let inner_width = chunks[1].width.saturating_sub(2) as usize;
    let status_len = status_dot.width() + status_text.width();
    let spacing = inner_width.saturating_sub(shortcuts.width() + status_len);

    let command_line = Line::from(vec![
        Span::styled(shortcuts, Style::default().fg(Color::DarkGray)),
        Span::raw(" ".repeat(spacing)),
        Span::styled(status_dot, Style::default().fg(border_color)),
        Span::styled(status_text, Style::default().fg(border_color)),
    ]);

    let command_panel = Paragraph::new(command_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(status.border_type())
            .border_style(Style::default().fg(border_color)),
    );

    f.render_widget(command_panel, chunks[1]);

    if let Some(state) = &app.question_modal_state {
        draw_question_modal(f, state);
    }

    if app.show_clarification_modal
        && let Some(state) = &app.clarification_modal_state
    {
        draw_clarification_modal(f, state);
    }

    if app.show_help_modal {
        draw_help_modal(f, app);
    }
}

/// Requirements editor, one requirement per line.
fn draw_editor(f: &mut Frame, app: &App, area: Rect, border_color: Color) {
    let inner_height = area.height.saturating_sub(2) as usize;
    let (row, col) = app.editor.cursor();
    // Keep the cursor row in view
    let top = row.saturating_sub(inner_height.saturating_sub(1));

    let content: Vec<Line> = app.editor.lines().iter().map(Line::raw).collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.status().border_type())
        .border_style(Style::default().fg(border_color))
        .title(Line::from(format!(" {} ", app.session_id)).left_aligned())
        .title(Line::from(" Requirements (one per line) ").right_aligned())
        .title_bottom(Line::from(format!(" {} ", truncate_str(app.service_url(), 50))).right_aligned());

    let editor = Paragraph::new(content)
        .block(block)
        .scroll((top as u16, 0));
    f.render_widget(editor, area);

    let modal_open = app.question_modal_state.is_some() || app.show_help_modal;
    if app.session.phase() == Phase::Idle && !modal_open {
        let line = &app.editor.lines()[row];
        let prefix_width: usize = line.chars().take(col).map(|c| c.width().unwrap_or(0)).sum();
        let x = area.x + 1 + prefix_width as u16;
        let y = area.y + 1 + (row - top) as u16;
        if x < area.right().saturating_sub(1) && y < area.bottom().saturating_sub(1) {
            f.set_cursor_position(Position::new(x, y));
        }
    }
}

/// Results pane with scrollbar.
fn draw_results(f: &mut Frame, app: &App, area: Rect, border_color: Color) {
    let content: Vec<Line> = app.result_lines.iter().map(Line::raw).collect();

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.status().border_type())
        .border_style(Style::default().fg(border_color))
        .title(Line::from(format!(" {} ", app.session_id)).left_aligned())
        .title(Line::from(" Results ").right_aligned());

    if app.session.round() > 0 {
        block = block.title_bottom(
            Line::from(format!(" clarification round {} ", app.session.round())).left_aligned(),
        );
    }
    if let Some(error) = &app.last_error {
        block = block.title_bottom(
            Line::from(Span::styled(
                format!(" {} ", truncate_str(error, 60)),
                Style::default().fg(Color::Red),
            ))
            .right_aligned(),
        );
    }

    let results = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset, 0));
    f.render_widget(results, area);

    // Scrollbar - only visible when content exceeds viewport
    let visual_lines = app.visual_line_count();
    if visual_lines > app.main_pane_height {
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"));

        let mut scrollbar_state = ScrollbarState::default()
            .content_length(visual_lines as usize)
            .position(app.scroll_offset as usize)
            .viewport_content_length(app.main_pane_height as usize);

        f.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}
