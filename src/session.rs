//! Session state machine for one prioritization cycle.
//!
//! A `Session` owns the requirements under review, the question cursor and
//! the answers collected so far. Each user or network event is a method call
//! that returns the next [`Step`] for the caller to act on, so the whole flow
//! runs without a terminal attached.
//!
//! ```text
//! Idle -> Collecting(0..N) -> Submitting -> Displaying
//!                                  ^            |
//!                                  |            v
//!                               Failed     Clarifying -> Submitting -> ...
//! ```

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::protocol::{
    Answer, DEFAULT_RATING, InformationRequest, PrioritizationRequest, PrioritizationResult,
    Responses,
};
use crate::validators::parse_rating_or_default;

/// Where the session is in the submission cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for a list of requirements.
    #[default]
    Idle,
    /// Asking one rating question per requirement.
    Collecting,
    /// A request is in flight.
    Submitting,
    /// A result is on screen and nothing else was asked.
    Displaying,
    /// A result is on screen and the service asked follow-up questions.
    Clarifying,
    /// The last request failed; it can be retried.
    Failed,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "READY",
            Phase::Collecting => "RATING",
            Phase::Submitting => "SUBMITTING",
            Phase::Displaying => "RESULTS",
            Phase::Clarifying => "CLARIFY",
            Phase::Failed => "FAILED",
        }
    }
}

/// What the caller should do after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Open the question modal for a requirement.
    Ask {
        index: usize,
        total: usize,
        requirement: String,
    },
    /// POST this request to the service.
    Send(PrioritizationRequest),
    /// Show the stored result; no clarification needed.
    Display,
    /// Show the stored result and ask these follow-up questions.
    Clarify(Vec<ClarificationPrompt>),
}

/// One of the three rating axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingField {
    Importance,
    Complexity,
    Urgency,
}

impl RatingField {
    pub const ALL: [RatingField; 3] = [
        RatingField::Importance,
        RatingField::Complexity,
        RatingField::Urgency,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RatingField::Importance => "Importance",
            RatingField::Complexity => "Complexity",
            RatingField::Urgency => "Urgency",
        }
    }
}

impl fmt::Display for RatingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw text of the three rating inputs, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingInput {
    pub importance: String,
    pub complexity: String,
    pub urgency: String,
}

impl RatingInput {
    pub fn new(importance: &str, complexity: &str, urgency: &str) -> Self {
        Self {
            importance: importance.to_string(),
            complexity: complexity.to_string(),
            urgency: urgency.to_string(),
        }
    }

    pub fn get(&self, field: RatingField) -> &str {
        match field {
            RatingField::Importance => &self.importance,
            RatingField::Complexity => &self.complexity,
            RatingField::Urgency => &self.urgency,
        }
    }
}

/// A follow-up question bound to the requirement its answer belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClarificationPrompt {
    /// Position in the service's `information_requests` list.
    pub index: usize,
    pub question: String,
    /// Index into the session's requirements, if one could be determined.
    pub target: Option<usize>,
}

impl ClarificationPrompt {
    /// Name of the input field rendered for this prompt.
    pub fn input_id(&self) -> String {
        format!("clarification{}", self.index)
    }
}

/// The user's answer to a clarification prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClarificationAnswer {
    pub target: Option<usize>,
    pub text: String,
}

/// State of one prioritization cycle.
#[derive(Debug, Clone)]
pub struct Session {
    requirements: Vec<String>,
    cursor: usize,
    responses: Responses,
    phase: Phase,
    default_rating: i32,
    last_result: Option<PrioritizationResult>,
    clarifications: Vec<ClarificationPrompt>,
    /// Request kept after a failure so it can be re-sent.
    pending: Option<PrioritizationRequest>,
    /// Clarification rounds submitted in this cycle.
    round: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_RATING)
    }
}

impl Session {
    pub fn new(default_rating: i32) -> Self {
        Self {
            requirements: Vec::new(),
            cursor: 0,
            responses: Responses::new(),
            phase: Phase::Idle,
            default_rating,
            last_result: None,
            clarifications: Vec::new(),
            pending: None,
            round: 0,
        }
    }

    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_result(&self) -> Option<&PrioritizationResult> {
        self.last_result.as_ref()
    }

    pub fn clarifications(&self) -> &[ClarificationPrompt] {
        &self.clarifications
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// The requirement the open question is about.
    pub fn current_requirement(&self) -> Option<&str> {
        if self.phase != Phase::Collecting {
            return None;
        }
        self.requirements.get(self.cursor).map(String::as_str)
    }

    /// Start a new cycle from the editor text.
    ///
    /// Resets the cursor and every answer, then asks the first question. With
    /// no requirements the cycle goes straight to submission.
    pub fn submit_requirements(&mut self, raw: &str) -> Result<Step, SessionError> {
        if self.phase == Phase::Submitting {
            return Err(SessionError::Busy);
        }

        self.requirements = split_requirements(raw);
        self.cursor = 0;
        self.responses = Responses::new();
        self.clarifications.clear();
        self.pending = None;
        self.round = 0;
        self.phase = Phase::Collecting;

        info!(count = self.requirements.len(), "requirements_submitted");
        Ok(self.ask_next_question())
    }

    /// Ask about the requirement under the cursor, or finalize once every
    /// requirement has an answer.
    pub fn ask_next_question(&mut self) -> Step {
        match self.requirements.get(self.cursor) {
            Some(requirement) => {
                debug!(index = self.cursor, "question_asked");
                Step::Ask {
                    index: self.cursor,
                    total: self.requirements.len(),
                    requirement: requirement.clone(),
                }
            }
            None => self.finalize_prioritization(),
        }
    }

    /// Record ratings for the current requirement and move to the next one.
    ///
    /// Blank fields take the default rating. On a validation error nothing
    /// changes and the same question stays open.
    pub fn submit_answer(&mut self, input: &RatingInput) -> Result<Step, SessionError> {
        let Some(requirement) = self.current_requirement().map(String::from) else {
            return Err(SessionError::NotCollecting);
        };

        let mut ratings = [0; 3];
        for (slot, field) in ratings.iter_mut().zip(RatingField::ALL) {
            *slot = parse_rating_or_default(input.get(field), self.default_rating)
                .map_err(|message| SessionError::InvalidRating { field, message })?;
        }
        let [importance, complexity, urgency] = ratings;

        if self.responses.contains_key(&requirement) {
            debug!(index = self.cursor, "duplicate_requirement_overwritten");
        }
        self.responses.insert(
            requirement,
            Answer::new(importance, complexity, urgency),
        );
        self.cursor += 1;

        Ok(self.ask_next_question())
    }

    /// Abandon the question phase and return to the editor.
    pub fn cancel(&mut self) {
        if self.phase == Phase::Collecting {
            info!(answered = self.cursor, "questions_cancelled");
            self.phase = Phase::Idle;
        }
    }

    /// Build the request carrying every requirement and answer.
    pub fn finalize_prioritization(&mut self) -> Step {
        let request = self.build_request();
        self.pending = Some(request.clone());
        self.phase = Phase::Submitting;
        info!(
            requirements = request.requirements.len(),
            responses = request.responses.len(),
            round = self.round,
            "prioritization_finalized"
        );
        Step::Send(request)
    }

    pub fn build_request(&self) -> PrioritizationRequest {
        PrioritizationRequest {
            requirements: self.requirements.clone(),
            responses: self.responses.clone(),
        }
    }

    /// Store a result from the service.
    ///
    /// Follow-up questions open a clarification round. Without them, any
    /// earlier prompts are cleared.
    pub fn receive_result(&mut self, result: PrioritizationResult) -> Step {
        if self.phase != Phase::Submitting {
            warn!(phase = ?self.phase, "result_received_outside_submission");
        }

        self.pending = None;
        self.clarifications = self.display_clarification_requests(result.information_requests());
        info!(
            prioritized = result.prioritized.len(),
            information_requests = self.clarifications.len(),
            "result_received"
        );
        self.last_result = Some(result);

        if self.clarifications.is_empty() {
            self.phase = Phase::Displaying;
            Step::Display
        } else {
            self.phase = Phase::Clarifying;
            Step::Clarify(self.clarifications.clone())
        }
    }

    /// Record a failed request. The previous result, if any, is kept and the
    /// request can be re-sent with [`Session::retry`].
    pub fn request_failed(&mut self, message: &str) {
        warn!(error = %message, "prioritization_failed");
        self.phase = Phase::Failed;
    }

    /// Re-send the request that failed.
    pub fn retry(&mut self) -> Result<Step, SessionError> {
        if self.phase != Phase::Failed {
            return Err(SessionError::NothingToRetry);
        }
        let request = self.pending.clone().ok_or(SessionError::NothingToRetry)?;
        info!(round = self.round, "prioritization_retried");
        self.phase = Phase::Submitting;
        Ok(Step::Send(request))
    }

    /// Bind each follow-up question to the requirement it is about.
    pub fn display_clarification_requests(
        &self,
        requests: &[InformationRequest],
    ) -> Vec<ClarificationPrompt> {
        requests
            .iter()
            .enumerate()
            .map(|(index, request)| ClarificationPrompt {
                index,
                question: request.question().to_string(),
                target: resolve_target(request, &self.requirements),
            })
            .collect()
    }

    /// Merge clarification answers into the stored ratings and re-send.
    ///
    /// Blank answers are skipped. An answer with text but no target is
    /// rejected before anything is merged.
    pub fn submit_clarifications(
        &mut self,
        answers: &[ClarificationAnswer],
    ) -> Result<Step, SessionError> {
        if self.phase != Phase::Clarifying {
            return Err(SessionError::NotClarifying);
        }

        let mut merges = Vec::new();
        for (index, answer) in answers.iter().enumerate() {
            let text = answer.text.trim();
            if text.is_empty() {
                continue;
            }
            let requirement = answer
                .target
                .and_then(|target| self.requirements.get(target))
                .ok_or(SessionError::MissingTarget { index })?;
            merges.push((requirement.clone(), text.to_string()));
        }

        let default_rating = self.default_rating;
        for (requirement, text) in merges {
            self.responses
                .entry(requirement)
                .or_insert_with(|| Answer::uniform(default_rating))
                .merge_clarification(&text);
        }

        self.round += 1;
        info!(round = self.round, answered = answers.len(), "clarifications_submitted");
        Ok(self.finalize_prioritization())
    }

    /// Forget the current cycle.
    pub fn reset(&mut self) {
        *self = Self::new(self.default_rating);
    }
}

/// Split editor text into requirements, one per non-blank line.
pub fn split_requirements(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Words too common to tie a question to a requirement.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "what", "which", "with", "this", "that", "how", "does", "should",
    "will", "you", "your", "about", "any", "there", "from",
];

/// Lowercased words of three or more letters, minus stop words.
fn significant_words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

/// Find the requirement a follow-up question belongs to.
///
/// An explicit index or requirement text from the service wins. Otherwise the
/// requirement sharing the most words with the question is chosen. A tie or
/// no overlap at all leaves the target for the user to pick.
pub fn resolve_target(request: &InformationRequest, requirements: &[String]) -> Option<usize> {
    if let InformationRequest::Targeted {
        requirement_index,
        requirement,
        ..
    } = request
    {
        if let Some(index) = requirement_index.and_then(|i| usize::try_from(i).ok())
            && index < requirements.len()
        {
            return Some(index);
        }
        if let Some(text) = requirement {
            let text = text.trim();
            if let Some(index) = requirements
                .iter()
                .position(|r| r == text || r.eq_ignore_ascii_case(text))
            {
                return Some(index);
            }
        }
    }

    let question_words = significant_words(request.question());
    let mut best: Option<usize> = None;
    let mut best_overlap = 0;
    let mut tied = false;

    for (index, requirement) in requirements.iter().enumerate() {
        let overlap = significant_words(requirement)
            .intersection(&question_words)
            .count();
        if overlap > best_overlap {
            best = Some(index);
            best_overlap = overlap;
            tied = false;
        } else if overlap == best_overlap && overlap > 0 {
            tied = true;
        }
    }

    if tied { None } else { best }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PrioritizedItem;

    fn result_with(
        items: &[(&str, f64)],
        information_requests: Vec<InformationRequest>,
    ) -> PrioritizationResult {
        PrioritizationResult {
            prioritized: items
                .iter()
                .map(|(requirement, score)| PrioritizedItem {
                    requirement: requirement.to_string(),
                    score: *score,
                    explanation: String::new(),
                })
                .collect(),
            information_requests: Some(information_requests),
            prioritized_explanations: None,
        }
    }

    fn answer_all(session: &mut Session, input: &RatingInput) -> Step {
        loop {
            match session.submit_answer(input).unwrap() {
                Step::Ask { .. } => continue,
                step => return step,
            }
        }
    }

    // split_requirements tests

    #[test]
    fn test_split_requirements_drops_blank_lines() {
        let requirements = split_requirements("Fast login\n\nOffline mode\n   \nExport CSV\n");
        assert_eq!(requirements, vec!["Fast login", "Offline mode", "Export CSV"]);
    }

    #[test]
    fn test_split_requirements_handles_crlf() {
        let requirements = split_requirements("Fast login\r\nOffline mode\r\n");
        assert_eq!(requirements, vec!["Fast login", "Offline mode"]);
    }

    #[test]
    fn test_split_requirements_empty() {
        assert!(split_requirements("").is_empty());
        assert!(split_requirements("\n\n").is_empty());
    }

    // Question phase tests

    #[test]
    fn test_submit_requirements_asks_first_question() {
        let mut session = Session::default();
        let step = session.submit_requirements("Fast login\nOffline mode").unwrap();
        assert_eq!(
            step,
            Step::Ask {
                index: 0,
                total: 2,
                requirement: "Fast login".to_string()
            }
        );
        assert_eq!(session.phase(), Phase::Collecting);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.current_requirement(), Some("Fast login"));
    }

    #[test]
    fn test_empty_requirements_finalize_immediately() {
        let mut session = Session::default();
        let step = session.submit_requirements("\n\n").unwrap();
        match step {
            Step::Send(request) => {
                assert!(request.requirements.is_empty());
                assert!(request.responses.is_empty());
            }
            other => panic!("expected Send, got {:?}", other),
        }
        assert_eq!(session.phase(), Phase::Submitting);
    }

    #[test]
    fn test_questions_asked_in_order_and_answers_recorded() {
        let mut session = Session::default();
        session.submit_requirements("Fast login\nOffline mode").unwrap();

        let step = session
            .submit_answer(&RatingInput::new("5", "2", "4"))
            .unwrap();
        assert_eq!(
            step,
            Step::Ask {
                index: 1,
                total: 2,
                requirement: "Offline mode".to_string()
            }
        );

        let step = session
            .submit_answer(&RatingInput::new("1", "1", "1"))
            .unwrap();
        let Step::Send(request) = step else {
            panic!("expected Send");
        };

        let mut expected = Responses::new();
        expected.insert("Fast login".to_string(), Answer::new(5, 2, 4));
        expected.insert("Offline mode".to_string(), Answer::new(1, 1, 1));
        assert_eq!(session.responses(), &expected);
        assert_eq!(request.responses, expected);
        assert_eq!(request.requirements, vec!["Fast login", "Offline mode"]);
        assert_eq!(session.cursor(), 2);
    }

    #[test]
    fn test_blank_rating_defaults_to_three() {
        let mut session = Session::default();
        session.submit_requirements("Fast login").unwrap();
        session.submit_answer(&RatingInput::new("", "4", "")).unwrap();
        assert_eq!(session.responses()["Fast login"], Answer::new(3, 4, 3));
    }

    #[test]
    fn test_configured_default_rating() {
        let mut session = Session::new(1);
        session.submit_requirements("Fast login").unwrap();
        session.submit_answer(&RatingInput::default()).unwrap();
        assert_eq!(session.responses()["Fast login"], Answer::uniform(1));
    }

    #[test]
    fn test_zero_rating_is_kept() {
        let mut session = Session::default();
        session.submit_requirements("Fast login").unwrap();
        session.submit_answer(&RatingInput::new("0", "0", "0")).unwrap();
        assert_eq!(session.responses()["Fast login"], Answer::uniform(0));
    }

    #[test]
    fn test_invalid_rating_leaves_cursor_in_place() {
        let mut session = Session::default();
        session.submit_requirements("Fast login").unwrap();
        let err = session
            .submit_answer(&RatingInput::new("5", "lots", "1"))
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidRating {
                field: RatingField::Complexity,
                message: "Rating must be a number".to_string()
            }
        );
        assert_eq!(session.cursor(), 0);
        assert!(session.responses().is_empty());
        assert_eq!(session.phase(), Phase::Collecting);
    }

    #[test]
    fn test_duplicate_requirement_text_collides() {
        let mut session = Session::default();
        session.submit_requirements("Sync\nSync\nExport").unwrap();
        session.submit_answer(&RatingInput::new("1", "1", "1")).unwrap();
        session.submit_answer(&RatingInput::new("5", "5", "5")).unwrap();
        let step = session.submit_answer(&RatingInput::new("2", "2", "2")).unwrap();

        assert!(matches!(step, Step::Send(_)));
        assert_eq!(session.cursor(), session.requirements().len());
        assert_eq!(session.responses().len(), 2);
        assert_eq!(session.responses()["Sync"], Answer::uniform(5));
    }

    #[test]
    fn test_submit_answer_outside_question_phase() {
        let mut session = Session::default();
        assert_eq!(
            session.submit_answer(&RatingInput::default()),
            Err(SessionError::NotCollecting)
        );
    }

    #[test]
    fn test_new_cycle_resets_state() {
        let mut session = Session::default();
        session.submit_requirements("A\nB").unwrap();
        session.submit_answer(&RatingInput::new("1", "1", "1")).unwrap();
        session.cancel();
        assert_eq!(session.phase(), Phase::Idle);

        session.submit_requirements("C").unwrap();
        assert_eq!(session.requirements(), ["C".to_string()]);
        assert_eq!(session.cursor(), 0);
        assert!(session.responses().is_empty());
    }

    #[test]
    fn test_submit_requirements_rejected_while_submitting() {
        let mut session = Session::default();
        session.submit_requirements("").unwrap();
        assert_eq!(session.submit_requirements("A"), Err(SessionError::Busy));
    }

    // Result and failure tests

    #[test]
    fn test_receive_result_without_requests_displays() {
        let mut session = Session::default();
        session.submit_requirements("A").unwrap();
        answer_all(&mut session, &RatingInput::default());

        let step = session.receive_result(result_with(&[("A", 1.0)], vec![]));
        assert_eq!(step, Step::Display);
        assert_eq!(session.phase(), Phase::Displaying);
        assert!(session.clarifications().is_empty());
        assert!(session.last_result().is_some());
    }

    #[test]
    fn test_failure_then_retry_resends_same_request() {
        let mut session = Session::default();
        session.submit_requirements("A").unwrap();
        let Step::Send(original) = answer_all(&mut session, &RatingInput::new("2", "2", "2"))
        else {
            panic!("expected Send");
        };

        session.request_failed("connection refused");
        assert_eq!(session.phase(), Phase::Failed);

        let step = session.retry().unwrap();
        assert_eq!(step, Step::Send(original));
        assert_eq!(session.phase(), Phase::Submitting);
    }

    #[test]
    fn test_retry_without_failure() {
        let mut session = Session::default();
        assert_eq!(session.retry(), Err(SessionError::NothingToRetry));
    }

    #[test]
    fn test_failure_keeps_previous_result() {
        let mut session = Session::default();
        session.submit_requirements("A").unwrap();
        answer_all(&mut session, &RatingInput::default());
        session.receive_result(result_with(
            &[("A", 1.0)],
            vec![InformationRequest::Question("Why A?".to_string())],
        ));
        session
            .submit_clarifications(&[ClarificationAnswer {
                target: Some(0),
                text: "because".to_string(),
            }])
            .unwrap();

        session.request_failed("timeout");
        assert_eq!(session.last_result().unwrap().prioritized[0].requirement, "A");
    }

    // Clarification tests

    #[test]
    fn test_clarification_round_merges_without_losing_ratings() {
        let mut session = Session::default();
        session.submit_requirements("Fast login\nOffline mode").unwrap();
        session.submit_answer(&RatingInput::new("5", "2", "4")).unwrap();
        session.submit_answer(&RatingInput::new("1", "1", "1")).unwrap();

        let step = session.receive_result(result_with(
            &[("Fast login", 2.33), ("Offline mode", 0.33)],
            vec![InformationRequest::Question(
                "What is the expected offline duration?".to_string(),
            )],
        ));

        let Step::Clarify(prompts) = step else {
            panic!("expected Clarify");
        };
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].input_id(), "clarification0");
        assert_eq!(prompts[0].target, Some(1));
        assert_eq!(session.phase(), Phase::Clarifying);

        let step = session
            .submit_clarifications(&[ClarificationAnswer {
                target: prompts[0].target,
                text: "24 hours".to_string(),
            }])
            .unwrap();

        let Step::Send(request) = step else {
            panic!("expected Send");
        };
        let offline = &request.responses["Offline mode"];
        assert_eq!(offline.importance, 1);
        assert_eq!(offline.complexity, 1);
        assert_eq!(offline.urgency, 1);
        assert_eq!(offline.clarification.as_deref(), Some("24 hours"));
        assert_eq!(request.responses["Fast login"], Answer::new(5, 2, 4));
        assert_eq!(session.round(), 1);
    }

    #[test]
    fn test_clarification_without_target_is_rejected() {
        let mut session = Session::default();
        session.submit_requirements("A\nB").unwrap();
        answer_all(&mut session, &RatingInput::default());
        session.receive_result(result_with(
            &[],
            vec![InformationRequest::Question("Anything else?".to_string())],
        ));

        let err = session
            .submit_clarifications(&[ClarificationAnswer {
                target: None,
                text: "no".to_string(),
            }])
            .unwrap_err();
        assert_eq!(err, SessionError::MissingTarget { index: 0 });
        assert!(session.responses().values().all(|a| a.clarification.is_none()));
        assert_eq!(session.phase(), Phase::Clarifying);
    }

    #[test]
    fn test_blank_clarification_is_skipped() {
        let mut session = Session::default();
        session.submit_requirements("A").unwrap();
        answer_all(&mut session, &RatingInput::default());
        session.receive_result(result_with(
            &[],
            vec![InformationRequest::Question("More?".to_string())],
        ));

        let step = session
            .submit_clarifications(&[ClarificationAnswer {
                target: None,
                text: "  ".to_string(),
            }])
            .unwrap();
        assert!(matches!(step, Step::Send(_)));
        assert_eq!(session.responses()["A"].clarification, None);
    }

    #[test]
    fn test_clarification_rounds_repeat() {
        let mut session = Session::default();
        session.submit_requirements("Offline mode").unwrap();
        answer_all(&mut session, &RatingInput::default());

        for (round, text) in ["24 hours", "on mobile only"].iter().enumerate() {
            let step = session.receive_result(result_with(
                &[("Offline mode", 1.0)],
                vec![InformationRequest::Targeted {
                    question: "Tell me more".to_string(),
                    requirement_index: Some(0),
                    requirement: None,
                }],
            ));
            assert!(matches!(step, Step::Clarify(_)));
            session
                .submit_clarifications(&[ClarificationAnswer {
                    target: Some(0),
                    text: text.to_string(),
                }])
                .unwrap();
            assert_eq!(session.round(), round as u32 + 1);
        }

        assert_eq!(
            session.responses()["Offline mode"].clarification.as_deref(),
            Some("24 hours\non mobile only")
        );

        let step = session.receive_result(result_with(&[("Offline mode", 1.0)], vec![]));
        assert_eq!(step, Step::Display);
        assert!(session.clarifications().is_empty());
    }

    #[test]
    fn test_submit_clarifications_outside_round() {
        let mut session = Session::default();
        assert_eq!(
            session.submit_clarifications(&[]),
            Err(SessionError::NotClarifying)
        );
    }

    // resolve_target tests

    fn reqs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_target_explicit_index() {
        let request = InformationRequest::Targeted {
            question: "Anything?".to_string(),
            requirement_index: Some(1),
            requirement: None,
        };
        assert_eq!(resolve_target(&request, &reqs(&["A", "B"])), Some(1));
    }

    #[test]
    fn test_resolve_target_out_of_range_index_falls_back() {
        let request = InformationRequest::Targeted {
            question: "How fast should login be?".to_string(),
            requirement_index: Some(7),
            requirement: None,
        };
        assert_eq!(
            resolve_target(&request, &reqs(&["Fast login", "Offline mode"])),
            Some(0)
        );
    }

    #[test]
    fn test_resolve_target_negative_index_falls_back() {
        let request = InformationRequest::Targeted {
            question: "Which offline features?".to_string(),
            requirement_index: Some(-1),
            requirement: None,
        };
        assert_eq!(
            resolve_target(&request, &reqs(&["Fast login", "Offline mode"])),
            Some(1)
        );
    }

    #[test]
    fn test_resolve_target_by_requirement_text() {
        let request = InformationRequest::Targeted {
            question: "Which devices?".to_string(),
            requirement_index: None,
            requirement: Some("offline mode".to_string()),
        };
        assert_eq!(
            resolve_target(&request, &reqs(&["Fast login", "Offline mode"])),
            Some(1)
        );
    }

    #[test]
    fn test_resolve_target_by_word_overlap() {
        let request =
            InformationRequest::Question("What is the expected offline duration?".to_string());
        assert_eq!(
            resolve_target(&request, &reqs(&["Fast login", "Offline mode"])),
            Some(1)
        );
    }

    #[test]
    fn test_resolve_target_tie_is_unresolved() {
        let request = InformationRequest::Question("Which export format?".to_string());
        assert_eq!(
            resolve_target(&request, &reqs(&["Export CSV", "Export PDF"])),
            None
        );
    }

    #[test]
    fn test_resolve_target_no_overlap() {
        let request = InformationRequest::Question("What is the budget?".to_string());
        assert_eq!(
            resolve_target(&request, &reqs(&["Fast login", "Offline mode"])),
            None
        );
    }
}
