//! Modal dialog state and input handling.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyModifiers};
use tracing::debug;

use crate::app::App;
use crate::session::{ClarificationAnswer, ClarificationPrompt, RatingField, RatingInput};
use crate::validators::validate_rating;

/// Single-line text field with a char-indexed cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    /// Cursor position in chars.
    pub cursor_pos: usize,
}

impl TextInput {
    fn byte_index(&self, pos: usize) -> usize {
        self.value
            .char_indices()
            .nth(pos)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor_pos);
        self.value.insert(at, c);
        self.cursor_pos += 1;
    }

    /// Delete the character before the cursor (backspace).
    pub fn delete_char_before(&mut self) -> bool {
        if self.cursor_pos == 0 {
            return false;
        }
        let at = self.byte_index(self.cursor_pos - 1);
        self.value.remove(at);
        self.cursor_pos -= 1;
        true
    }

    /// Delete the character at the cursor position (delete key).
    pub fn delete_char_at(&mut self) -> bool {
        if self.cursor_pos >= self.char_count() {
            return false;
        }
        let at = self.byte_index(self.cursor_pos);
        self.value.remove(at);
        true
    }

    pub fn cursor_left(&mut self) {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor_pos < self.char_count() {
            self.cursor_pos += 1;
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor_pos = self.char_count();
    }
}

/// Which field is focused in the question modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionModalField {
    Importance,
    Complexity,
    Urgency,
    SubmitButton,
}

impl QuestionModalField {
    pub fn next(self) -> Self {
        match self {
            Self::Importance => Self::Complexity,
            Self::Complexity => Self::Urgency,
            Self::Urgency => Self::SubmitButton,
            Self::SubmitButton => Self::Importance,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Importance => Self::SubmitButton,
            Self::Complexity => Self::Importance,
            Self::Urgency => Self::Complexity,
            Self::SubmitButton => Self::Urgency,
        }
    }
}

impl From<RatingField> for QuestionModalField {
    fn from(field: RatingField) -> Self {
        match field {
            RatingField::Importance => Self::Importance,
            RatingField::Complexity => Self::Complexity,
            RatingField::Urgency => Self::Urgency,
        }
    }
}

/// State for the question modal: three ratings for one requirement.
#[derive(Debug, Clone)]
pub struct QuestionModalState {
    /// Position of the requirement in the list.
    pub index: usize,
    pub total: usize,
    pub requirement: String,
    pub focus: QuestionModalField,
    pub importance: TextInput,
    pub complexity: TextInput,
    pub urgency: TextInput,
    /// Error message to display (e.g., submission rejected).
    pub error: Option<String>,
    /// Validation errors per field.
    pub validation_errors: HashMap<QuestionModalField, String>,
}

impl QuestionModalState {
    /// Fresh, empty fields for the given requirement.
    pub fn new(index: usize, total: usize, requirement: String) -> Self {
        Self {
            index,
            total,
            requirement,
            focus: QuestionModalField::Importance,
            importance: TextInput::default(),
            complexity: TextInput::default(),
            urgency: TextInput::default(),
            error: None,
            validation_errors: HashMap::new(),
        }
    }

    pub fn input(&self, field: QuestionModalField) -> Option<&TextInput> {
        match field {
            QuestionModalField::Importance => Some(&self.importance),
            QuestionModalField::Complexity => Some(&self.complexity),
            QuestionModalField::Urgency => Some(&self.urgency),
            QuestionModalField::SubmitButton => None,
        }
    }

    fn focused_input_mut(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            QuestionModalField::Importance => Some(&mut self.importance),
            QuestionModalField::Complexity => Some(&mut self.complexity),
            QuestionModalField::Urgency => Some(&mut self.urgency),
            QuestionModalField::SubmitButton => None,
        }
    }

    /// Move focus to the next field.
    /// Validates the field being left (blur validation).
    pub fn focus_next(&mut self) {
        let leaving_field = self.focus;
        self.focus = self.focus.next();
        self.update_cursor_for_new_focus();
        self.validate_field(leaving_field);
    }

    /// Move focus to the previous field.
    /// Validates the field being left (blur validation).
    pub fn focus_prev(&mut self) {
        let leaving_field = self.focus;
        self.focus = self.focus.prev();
        self.update_cursor_for_new_focus();
        self.validate_field(leaving_field);
    }

    /// Focus a field directly, e.g. the one that failed validation.
    pub fn focus_field(&mut self, field: QuestionModalField) {
        self.focus = field;
        self.update_cursor_for_new_focus();
    }

    fn update_cursor_for_new_focus(&mut self) {
        if let Some(input) = self.focused_input_mut() {
            input.cursor_end();
        }
    }

    pub fn insert_char(&mut self, c: char) {
        if let Some(input) = self.focused_input_mut() {
            input.insert_char(c);
            self.clear_current_field_error();
        }
    }

    pub fn delete_char_before(&mut self) {
        if self
            .focused_input_mut()
            .is_some_and(TextInput::delete_char_before)
        {
            self.clear_current_field_error();
        }
    }

    pub fn delete_char_at(&mut self) {
        if self
            .focused_input_mut()
            .is_some_and(TextInput::delete_char_at)
        {
            self.clear_current_field_error();
        }
    }

    pub fn cursor_left(&mut self) {
        if let Some(input) = self.focused_input_mut() {
            input.cursor_left();
        }
    }

    pub fn cursor_right(&mut self) {
        if let Some(input) = self.focused_input_mut() {
            input.cursor_right();
        }
    }

    pub fn cursor_home(&mut self) {
        if let Some(input) = self.focused_input_mut() {
            input.cursor_home();
        }
    }

    pub fn cursor_end(&mut self) {
        if let Some(input) = self.focused_input_mut() {
            input.cursor_end();
        }
    }

    /// Check if there are any validation errors.
    pub fn has_validation_errors(&self) -> bool {
        !self.validation_errors.is_empty()
    }

    /// Validate a specific field and update validation_errors.
    pub fn validate_field(&mut self, field: QuestionModalField) {
        let error = self.input(field).and_then(|i| validate_rating(&i.value));
        if let Some(msg) = error {
            self.validation_errors.insert(field, msg);
        } else {
            self.validation_errors.remove(&field);
        }
    }

    /// Clear validation error for the current field (called when value changes).
    fn clear_current_field_error(&mut self) {
        self.validation_errors.remove(&self.focus);
    }

    /// Raw values of the three fields.
    pub fn to_rating_input(&self) -> RatingInput {
        RatingInput::new(
            &self.importance.value,
            &self.complexity.value,
            &self.urgency.value,
        )
    }
}

/// Which element is focused in the clarification modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClarificationFocus {
    /// Answer text of a prompt.
    Input(usize),
    /// Requirement the answer is attached to.
    Target(usize),
    SubmitButton,
}

/// State for the clarification modal: one answer per follow-up question.
#[derive(Debug, Clone)]
pub struct ClarificationModalState {
    pub prompts: Vec<ClarificationPrompt>,
    pub inputs: Vec<TextInput>,
    pub targets: Vec<Option<usize>>,
    /// Requirements a target can point at.
    pub requirements: Vec<String>,
    pub focus: ClarificationFocus,
    pub error: Option<String>,
}

impl ClarificationModalState {
    pub fn new(prompts: Vec<ClarificationPrompt>, requirements: Vec<String>) -> Self {
        let targets = prompts.iter().map(|p| p.target).collect();
        let inputs = vec![TextInput::default(); prompts.len()];
        let focus = if prompts.is_empty() {
            ClarificationFocus::SubmitButton
        } else {
            ClarificationFocus::Input(0)
        };
        Self {
            prompts,
            inputs,
            targets,
            requirements,
            focus,
            error: None,
        }
    }

    /// Next element in Input, Target, ..., Submit order.
    pub fn next_focus(&self, focus: ClarificationFocus) -> ClarificationFocus {
        let count = self.prompts.len();
        match focus {
            ClarificationFocus::Input(i) => ClarificationFocus::Target(i),
            ClarificationFocus::Target(i) if i + 1 < count => ClarificationFocus::Input(i + 1),
            ClarificationFocus::Target(_) => ClarificationFocus::SubmitButton,
            ClarificationFocus::SubmitButton if count > 0 => ClarificationFocus::Input(0),
            ClarificationFocus::SubmitButton => ClarificationFocus::SubmitButton,
        }
    }

    pub fn prev_focus(&self, focus: ClarificationFocus) -> ClarificationFocus {
        let count = self.prompts.len();
        match focus {
            ClarificationFocus::Input(0) => ClarificationFocus::SubmitButton,
            ClarificationFocus::Input(i) => ClarificationFocus::Target(i - 1),
            ClarificationFocus::Target(i) => ClarificationFocus::Input(i),
            ClarificationFocus::SubmitButton if count > 0 => ClarificationFocus::Target(count - 1),
            ClarificationFocus::SubmitButton => ClarificationFocus::SubmitButton,
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.next_focus(self.focus);
        self.update_cursor_for_new_focus();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.prev_focus(self.focus);
        self.update_cursor_for_new_focus();
    }

    fn update_cursor_for_new_focus(&mut self) {
        if let Some(input) = self.focused_input_mut() {
            input.cursor_end();
        }
    }

    fn focused_input_mut(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            ClarificationFocus::Input(i) => self.inputs.get_mut(i),
            _ => None,
        }
    }

    /// Cycle a prompt's target through none and every requirement.
    pub fn cycle_target(&mut self, index: usize, forward: bool) {
        let count = self.requirements.len();
        let Some(target) = self.targets.get_mut(index) else {
            return;
        };
        if count == 0 {
            return;
        }
        *target = match (*target, forward) {
            (None, true) => Some(0),
            (Some(t), true) if t + 1 < count => Some(t + 1),
            (Some(_), true) => None,
            (None, false) => Some(count - 1),
            (Some(0), false) => None,
            (Some(t), false) => Some(t - 1),
        };
        self.error = None;
    }

    /// Display text for a prompt's target.
    pub fn target_label(&self, index: usize) -> &str {
        self.targets
            .get(index)
            .copied()
            .flatten()
            .and_then(|t| self.requirements.get(t))
            .map(String::as_str)
            .unwrap_or("(choose requirement)")
    }

    /// Answers in prompt order.
    pub fn answers(&self) -> Vec<ClarificationAnswer> {
        self.inputs
            .iter()
            .zip(&self.targets)
            .map(|(input, target)| ClarificationAnswer {
                target: *target,
                text: input.value.clone(),
            })
            .collect()
    }
}

/// Handle keyboard input for the question modal.
pub fn handle_question_modal_input(app: &mut App, key_code: KeyCode, modifiers: KeyModifiers) {
    let Some(state) = &mut app.question_modal_state else {
        return;
    };

    // Clear any previous error when user takes action
    if state.error.is_some() && key_code != KeyCode::Esc {
        state.error = None;
    }

    match key_code {
        // Navigation between fields
        KeyCode::Tab => {
            if modifiers.contains(KeyModifiers::SHIFT) {
                state.focus_prev();
            } else {
                state.focus_next();
            }
        }
        KeyCode::BackTab => {
            state.focus_prev();
        }

        // Abandon the question phase
        KeyCode::Esc => {
            app.cancel_questions();
        }

        // Enter - context-dependent
        KeyCode::Enter => match state.focus {
            QuestionModalField::SubmitButton => {
                app.submit_answer();
            }
            _ => {
                // Enter in text fields moves to next field
                state.focus_next();
            }
        },

        KeyCode::Char(c) => {
            state.insert_char(c);
        }

        KeyCode::Backspace => {
            state.delete_char_before();
        }

        KeyCode::Delete => {
            state.delete_char_at();
        }

        KeyCode::Left => {
            state.cursor_left();
        }

        KeyCode::Right => {
            state.cursor_right();
        }

        KeyCode::Home => {
            state.cursor_home();
        }

        KeyCode::End => {
            state.cursor_end();
        }

        KeyCode::Up => {
            state.focus_prev();
        }

        KeyCode::Down => {
            state.focus_next();
        }

        _ => {}
    }
}

/// Handle keyboard input for the clarification modal.
pub fn handle_clarification_modal_input(
    app: &mut App,
    key_code: KeyCode,
    modifiers: KeyModifiers,
) {
    let Some(state) = &mut app.clarification_modal_state else {
        return;
    };

    if state.error.is_some() && key_code != KeyCode::Esc {
        state.error = None;
    }

    match key_code {
        KeyCode::Tab => {
            if modifiers.contains(KeyModifiers::SHIFT) {
                state.focus_prev();
            } else {
                state.focus_next();
            }
        }
        KeyCode::BackTab => {
            state.focus_prev();
        }

        // Hide; typed answers are kept until the round ends
        KeyCode::Esc => {
            debug!("clarification_modal_hidden");
            app.show_clarification_modal = false;
        }

        KeyCode::Enter => match state.focus {
            ClarificationFocus::SubmitButton => {
                app.submit_clarifications();
            }
            _ => state.focus_next(),
        },

        KeyCode::Char(c) => {
            if let Some(input) = state.focused_input_mut() {
                input.insert_char(c);
            }
        }

        KeyCode::Backspace => {
            if let Some(input) = state.focused_input_mut() {
                input.delete_char_before();
            }
        }

        KeyCode::Delete => {
            if let Some(input) = state.focused_input_mut() {
                input.delete_char_at();
            }
        }

        KeyCode::Left => match state.focus {
            ClarificationFocus::Target(i) => state.cycle_target(i, false),
            _ => {
                if let Some(input) = state.focused_input_mut() {
                    input.cursor_left();
                }
            }
        },

        KeyCode::Right => match state.focus {
            ClarificationFocus::Target(i) => state.cycle_target(i, true),
            _ => {
                if let Some(input) = state.focused_input_mut() {
                    input.cursor_right();
                }
            }
        },

        KeyCode::Home => {
            if let Some(input) = state.focused_input_mut() {
                input.cursor_home();
            }
        }

        KeyCode::End => {
            if let Some(input) = state.focused_input_mut() {
                input.cursor_end();
            }
        }

        KeyCode::Up => state.focus_prev(),
        KeyCode::Down => state.focus_next(),

        _ => {}
    }
}
