use thiserror::Error;

use crate::session::RatingField;

/// Failure talking to the prioritization service.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Service returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("Failed to decode service response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// An event the session cannot accept in its current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("{field}: {message}")]
    InvalidRating { field: RatingField, message: String },

    #[error("No question is waiting for an answer")]
    NotCollecting,

    #[error("A request is already in flight")]
    Busy,

    #[error("No failed request to retry")]
    NothingToRetry,

    #[error("No clarification round is open")]
    NotClarifying,

    #[error("Choose a requirement for clarification {index}")]
    MissingTarget { index: usize },
}
