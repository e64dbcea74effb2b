//! Modal UI rendering functions.

use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::App;
use crate::modals::{
    ClarificationFocus, ClarificationModalState, QuestionModalField, QuestionModalState, TextInput,
};
use crate::ui::{centered_rect, truncate_str};

/// Visible width of a text field.
const FIELD_WIDTH: usize = 40;

/// Render a text input field, with a block cursor when focused.
fn render_field(input: &TextInput, focused: bool) -> Vec<Span<'static>> {
    let chars: Vec<char> = input.value.chars().collect();
    let cursor = input.cursor_pos.min(chars.len());

    // Scroll horizontally so the cursor stays visible
    let start = if chars.len() > FIELD_WIDTH {
        let start = cursor.saturating_sub(FIELD_WIDTH / 2);
        let end = (start + FIELD_WIDTH).min(chars.len());
        end.saturating_sub(FIELD_WIDTH)
    } else {
        0
    };
    let end = (start + FIELD_WIDTH).min(chars.len());

    if !focused {
        let shown: String = chars[start..end].iter().collect();
        return vec![Span::styled(shown, Style::default().fg(Color::White))];
    }

    let before: String = chars[start..cursor].iter().collect();
    let cursor_char = chars.get(cursor).copied().unwrap_or(' ').to_string();
    let rest: String = if cursor < end {
        chars[cursor + 1..end].iter().collect()
    } else {
        String::new()
    };

    vec![
        Span::styled(before, Style::default().fg(Color::White)),
        Span::styled(
            cursor_char,
            Style::default().fg(Color::Black).bg(Color::White),
        ),
        Span::styled(rest, Style::default().fg(Color::White)),
    ]
}

fn label_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn button_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

/// Draw the rating modal for one requirement.
pub fn draw_question_modal(f: &mut Frame, state: &QuestionModalState) {
    let modal_width: u16 = 64;
    let modal_height: u16 = 16;
    let modal_area = centered_rect(modal_width, modal_height, f.area());

    // Clear the area behind the modal
    f.render_widget(Clear, modal_area);

    let error_style = Style::default().fg(Color::Yellow);
    let mut content: Vec<Line> = Vec::new();

    content.push(Line::from(vec![
        Span::styled("  Question for: ", label_style(false)),
        Span::styled(
            truncate_str(&state.requirement, modal_width.saturating_sub(20) as usize),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ]));
    content.push(Line::from(Span::styled(
        format!(
            "  Requirement {} of {}. Rate each from 1 to 5; blank uses the default.",
            state.index + 1,
            state.total
        ),
        label_style(false),
    )));
    content.push(Line::from(""));

    for (field, label) in [
        (QuestionModalField::Importance, "  Importance: "),
        (QuestionModalField::Complexity, "  Complexity: "),
        (QuestionModalField::Urgency, "  Urgency:    "),
    ] {
        let focused = state.focus == field;
        let mut line = vec![Span::styled(label, label_style(focused))];
        if let Some(input) = state.input(field) {
            line.extend(render_field(input, focused));
        }
        content.push(Line::from(line));
        if let Some(error) = state.validation_errors.get(&field) {
            content.push(Line::from(Span::styled(
                format!("                \u{26a0} {}", error),
                error_style,
            )));
        }
    }

    content.push(Line::from(""));
    if let Some(error) = &state.error {
        content.push(Line::from(Span::styled(
            format!("  Error: {}", error),
            Style::default().fg(Color::Red),
        )));
    } else {
        content.push(Line::from(""));
    }

    let submit_style = if state.has_validation_errors() {
        Style::default().fg(Color::DarkGray)
    } else {
        button_style(state.focus == QuestionModalField::SubmitButton)
    };
    content.push(Line::from(vec![
        Span::raw("                         "),
        Span::styled(" Submit ", submit_style),
    ]));
    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  [Tab] Next field  [Enter] Submit  [Esc] Back to editor",
        label_style(false),
    )));

    let modal = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Rate Requirement ")
            .title_alignment(Alignment::Center)
            .style(Style::default().fg(Color::White)),
    );

    f.render_widget(modal, modal_area);
}

/// Draw the modal asking for additional information.
pub fn draw_clarification_modal(f: &mut Frame, state: &ClarificationModalState) {
    let modal_width: u16 = 76;
    let rows_per_prompt = 4;
    let modal_height = (state.prompts.len() as u16 * rows_per_prompt + 8).min(f.area().height);
    let modal_area = centered_rect(modal_width, modal_height, f.area());

    f.render_widget(Clear, modal_area);

    let question_width = modal_width.saturating_sub(8) as usize;
    let mut content: Vec<Line> = Vec::new();

    content.push(Line::from(Span::styled(
        "  The service needs more information to rank these requirements.",
        label_style(false),
    )));
    content.push(Line::from(""));

    for (i, prompt) in state.prompts.iter().enumerate() {
        let input_focused = state.focus == ClarificationFocus::Input(i);
        let target_focused = state.focus == ClarificationFocus::Target(i);

        content.push(Line::from(vec![
            Span::styled(format!("  {}. ", i + 1), label_style(false)),
            Span::styled(
                truncate_str(&prompt.question, question_width),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
        ]));

        let mut answer_line = vec![Span::styled("     Answer: ", label_style(input_focused))];
        if let Some(input) = state.inputs.get(i) {
            answer_line.extend(render_field(input, input_focused));
        }
        content.push(Line::from(answer_line));

        let target = truncate_str(state.target_label(i), 50);
        let target_display = if target_focused {
            format!("< {} >", target)
        } else {
            target
        };
        let target_style = if target_focused {
            Style::default().fg(Color::Cyan)
        } else if state.targets.get(i).copied().flatten().is_none() {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        content.push(Line::from(vec![
            Span::styled("     About:  ", label_style(target_focused)),
            Span::styled(target_display, target_style),
        ]));
        content.push(Line::from(""));
    }

    if let Some(error) = &state.error {
        content.push(Line::from(Span::styled(
            format!("  Error: {}", error),
            Style::default().fg(Color::Red),
        )));
    } else {
        content.push(Line::from(""));
    }

    content.push(Line::from(vec![
        Span::raw("                            "),
        Span::styled(
            " Submit All ",
            button_style(state.focus == ClarificationFocus::SubmitButton),
        ),
    ]));
    content.push(Line::from(Span::styled(
        "  [Tab] Next  [←→] Change requirement  [Esc] Hide (c reopens)",
        label_style(false),
    )));

    let modal = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Additional Information Needed ")
            .title_alignment(Alignment::Center)
            .style(Style::default().fg(Color::White)),
    );

    f.render_widget(modal, modal_area);
}

/// Draw the key binding reference, with where config and logs live.
pub fn draw_help_modal(f: &mut Frame, app: &App) {
    let modal_width: u16 = 64;
    let modal_area = centered_rect(modal_width, 25, f.area());
    f.render_widget(Clear, modal_area);

    let key_style = Style::default().fg(Color::Cyan);
    let rows = [
        ("Editor", ""),
        ("  Ctrl+S", "Submit requirements"),
        ("  Enter", "New line"),
        ("  F1", "Toggle this help"),
        ("  Ctrl+Q", "Quit"),
        ("Rating", ""),
        ("  Tab / Shift+Tab", "Move between fields"),
        ("  Enter on Submit", "Save ratings"),
        ("  Esc", "Back to editor"),
        ("Results", ""),
        ("  ↑ ↓ PgUp PgDn", "Scroll"),
        ("  c", "Answer follow-up questions"),
        ("  r", "Retry a failed request"),
        ("  n", "Start over from the editor"),
        ("  ? / q", "Help / Quit"),
    ];

    let mut content: Vec<Line> = rows
        .iter()
        .map(|(key, description)| {
            if description.is_empty() {
                Line::from(Span::styled(
                    format!(" {}", key),
                    Style::default().add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(vec![
                    Span::styled(format!(" {:<20}", key), key_style),
                    Span::raw(*description),
                ])
            }
        })
        .collect();
    let label_style = Style::default().fg(Color::DarkGray);
    let path_width = modal_width.saturating_sub(18) as usize;
    let log_dir_display = app
        .log_directory
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not configured)".to_string());
    let separator = "\u{2500}".repeat(modal_width.saturating_sub(4) as usize);

    content.push(Line::from(Span::styled(format!(" {}", separator), label_style)));
    for (label, value) in [
        (" Service:       ", app.config.service.prioritize_url()),
        (" Config file:   ", app.config_path.display().to_string()),
        (" Log directory: ", log_dir_display),
    ] {
        content.push(Line::from(vec![
            Span::styled(label, label_style),
            Span::raw(truncate_str(&value, path_width)),
        ]));
    }
    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        " Press Esc to close",
        Style::default().fg(Color::DarkGray),
    )));

    let modal = Paragraph::new(content).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .title_alignment(Alignment::Center)
            .style(Style::default().fg(Color::White)),
    );

    f.render_widget(modal, modal_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(value: &str, cursor_pos: usize) -> TextInput {
        TextInput {
            value: value.to_string(),
            cursor_pos,
        }
    }

    fn text(spans: &[Span]) -> Vec<String> {
        spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_render_field_unfocused() {
        assert_eq!(text(&render_field(&input("42", 2), false)), vec!["42"]);
    }

    #[test]
    fn test_render_field_cursor_at_end() {
        assert_eq!(
            text(&render_field(&input("42", 2), true)),
            vec!["42", " ", ""]
        );
    }

    #[test]
    fn test_render_field_cursor_in_middle() {
        assert_eq!(
            text(&render_field(&input("abc", 1), true)),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_render_field_scrolls_long_value() {
        let long = "x".repeat(100);
        let spans = render_field(&input(&long, 100), true);
        let shown: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        // Visible window plus the cursor cell past the end
        assert_eq!(shown, FIELD_WIDTH + 1);
    }
}
