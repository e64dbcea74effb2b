//! Wire types for the prioritization service.
//!
//! The service receives every requirement together with the ratings collected
//! for it and answers with a ranked list. It may also ask for more information
//! before it settles on a ranking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rating stored for a field the user left blank.
pub const DEFAULT_RATING: i32 = 3;

/// Ratings collected for a single requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub importance: i32,
    pub complexity: i32,
    pub urgency: i32,
    /// Free-text answer from a clarification round. Absent until one adds it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<String>,
}

impl Answer {
    pub fn new(importance: i32, complexity: i32, urgency: i32) -> Self {
        Self {
            importance,
            complexity,
            urgency,
            clarification: None,
        }
    }

    /// An answer with every rating set to `rating`.
    pub fn uniform(rating: i32) -> Self {
        Self::new(rating, rating, rating)
    }

    /// Merge clarification text into this answer, keeping the ratings and any
    /// earlier clarification.
    pub fn merge_clarification(&mut self, text: &str) {
        self.clarification = match self.clarification.take() {
            Some(existing) if !existing.is_empty() => Some(format!("{}\n{}", existing, text)),
            _ => Some(text.to_string()),
        };
    }
}

impl Default for Answer {
    fn default() -> Self {
        Self::uniform(DEFAULT_RATING)
    }
}

/// Answers keyed by requirement text.
pub type Responses = BTreeMap<String, Answer>;

/// Body of `POST /prioritize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritizationRequest {
    pub requirements: Vec<String>,
    pub responses: Responses,
}

/// One ranked entry returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedItem {
    pub requirement: String,
    pub score: f64,
    #[serde(default)]
    pub explanation: String,
}

/// A follow-up question from the service.
///
/// Older services send bare strings. Newer ones may name the requirement the
/// question is about, either by position or by text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InformationRequest {
    Question(String),
    Targeted {
        question: String,
        /// Signed so a bad hint like `-1` is ignored instead of failing the
        /// whole result.
        #[serde(default)]
        requirement_index: Option<i64>,
        #[serde(default)]
        requirement: Option<String>,
    },
}

impl InformationRequest {
    pub fn question(&self) -> &str {
        match self {
            Self::Question(question) => question,
            Self::Targeted { question, .. } => question,
        }
    }
}

/// Response of `POST /prioritize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizationResult {
    pub prioritized: Vec<PrioritizedItem>,
    #[serde(default)]
    pub information_requests: Option<Vec<InformationRequest>>,
    /// Comparative notes about the ranking as a whole.
    #[serde(default)]
    pub prioritized_explanations: Option<Vec<String>>,
}

impl PrioritizationResult {
    /// Follow-up questions, empty when the service asked for nothing.
    pub fn information_requests(&self) -> &[InformationRequest] {
        self.information_requests.as_deref().unwrap_or(&[])
    }

    pub fn explanations(&self) -> &[String] {
        self.prioritized_explanations.as_deref().unwrap_or(&[])
    }
}
