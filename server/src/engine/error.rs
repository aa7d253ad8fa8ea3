use std::fmt;

/// Error taxonomy for engine operations. Every failure is a caller-input
/// problem: the engine has no fallible I/O, so there is no internal or
/// retryable category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Missing/empty required field, malformed input. No state change.
    Validation(String),
    /// No established identity.
    Auth,
    /// Authenticated but lacking ownership or privilege. No state change.
    Forbidden(String),
    /// Target (message, room) does not exist.
    NotFound(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Validation(msg) => write!(f, "{msg}"),
            ChatError::Auth => write!(f, "Not authenticated"),
            ChatError::Forbidden(msg) => write!(f, "{msg}"),
            ChatError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ChatError {}
