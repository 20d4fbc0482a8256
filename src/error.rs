//! Error types for the Vowza site.

use uuid::Uuid;

/// Draft storage errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failures reported by the lead sink.
#[derive(Debug, thiserror::Error)]
pub enum LeadSinkError {
    #[error("{sink} request failed: {reason}")]
    RequestFailed { sink: String, reason: String },

    #[error("{sink} rejected the record ({status}): {message}")]
    Rejected {
        sink: String,
        status: u16,
        message: String,
    },

    #[error("{0}")]
    Unavailable(String),
}

impl LeadSinkError {
    /// Message suitable for showing to the visitor.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Unavailable(message) if !message.trim().is_empty() => message.clone(),
            Self::RequestFailed { reason, .. } if !reason.trim().is_empty() => reason.clone(),
            _ => "Failed to submit form. Please try again.".to_string(),
        }
    }
}

/// Human-verification errors.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Verification token is empty")]
    EmptyToken,

    #[error("Verification rejected: {codes:?}")]
    Rejected { codes: Vec<String> },

    #[error("Verification provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },
}

/// Intake session errors.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Intake session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Submission rejected: {0}")]
    SubmitRejected(#[from] crate::intake::SubmitRejected),

    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),
}
