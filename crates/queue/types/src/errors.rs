//! Error types for the service queue

use crate::{CounterNumber, DepartmentId, TokenId, TokenNumber, TokenStatus};

/// Errors that can occur in queue operations.
///
/// None of these are fatal; all are surfaced to the caller with no state
/// mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No waiting token for department: {0}")]
    NoWaitingToken(DepartmentId),

    #[error("Illegal transition for token #{token_number}: {from} -> {to} ({reason})")]
    IllegalTransition {
        token_number: TokenNumber,
        from: TokenStatus,
        to: TokenStatus,
        reason: String,
    },

    #[error("Token not found: {0}")]
    TokenNotFound(TokenId),

    #[error("Department not found: {0}")]
    DepartmentNotFound(DepartmentId),

    #[error("Counter {counter} is not configured for department {department}")]
    CounterNotFound {
        department: DepartmentId,
        counter: CounterNumber,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification used by callers to pick a presentation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NoWaitingToken,
    IllegalTransition,
    NotFound,
    Config,
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::Validation(_) => ErrorKind::Validation,
            QueueError::NoWaitingToken(_) => ErrorKind::NoWaitingToken,
            QueueError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            QueueError::TokenNotFound(_)
            | QueueError::DepartmentNotFound(_)
            | QueueError::CounterNotFound { .. } => ErrorKind::NotFound,
            QueueError::Config(_) => ErrorKind::Config,
        }
    }

    /// Shown as a transient notice rather than an error
    pub fn is_advisory(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::NoWaitingToken
        )
    }
}

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
