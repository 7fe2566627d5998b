use std::fmt;

use thiserror::Error;

/// Bare classification of a failed fetch, without the message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response was received (connection refused, DNS, timeout).
    Network,
    /// The resource does not exist for the subject.
    NotFound,
    /// 5xx, business rejection, or a payload that failed validation.
    Server,
    /// 401 from the backend; re-authentication happens upstream.
    Unauthorized,
    /// The subject changed while the fetch was in flight.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Network => "network",
            ErrorKind::NotFound => "notFound",
            ErrorKind::Server => "server",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// What a consumer should offer the user after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryHint {
    /// Transient fault: offer "try again".
    Retry,
    /// Nothing computed yet: offer "calculate now".
    ComputeNow,
    /// Credentials rejected: offer "sign in again".
    SignIn,
    /// Nothing to offer (the request was abandoned on purpose).
    None,
}

/// Classified error returned by every fetch and stored on resource slots.
///
/// `Clone` because a single failure is shared between coalesced callers,
/// the slot that records it, and every observer notified of the transition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// No response received from the backend
    #[error("network error: {message}")]
    Network { message: String },

    /// Resource absent for the subject
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Server-side or business failure, including malformed payloads
    #[error("server error (status {status:?}): {message}")]
    Server { status: Option<u16>, message: String },

    /// Backend rejected the credentials attached to the request
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Fetch discarded because the subject changed mid-flight
    #[error("fetch cancelled: subject changed while request was in flight")]
    Cancelled,
}

// Convenience constructors for common error patterns
impl Error {
    /// Create a network (no response) error
    pub fn network(msg: impl Into<String>) -> Self {
        Error::Network {
            message: msg.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound {
            message: msg.into(),
        }
    }

    /// Create a server error with the HTTP status that produced it
    pub fn server_error(status: u16, msg: impl Into<String>) -> Self {
        Error::Server {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a server error for a payload that could not be decoded or validated
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::Server {
            status: None,
            message: msg.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Error::Unauthorized {
            message: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network { .. } => ErrorKind::Network,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Server { .. } => ErrorKind::Server,
            Error::Unauthorized { .. } => ErrorKind::Unauthorized,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Map the classification onto the action a consumer should offer.
    pub fn recovery(&self) -> RecoveryHint {
        match self.kind() {
            ErrorKind::Network | ErrorKind::Server => RecoveryHint::Retry,
            ErrorKind::NotFound => RecoveryHint::ComputeNow,
            ErrorKind::Unauthorized => RecoveryHint::SignIn,
            ErrorKind::Cancelled => RecoveryHint::None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_hints() {
        assert_eq!(Error::network("refused").recovery(), RecoveryHint::Retry);
        assert_eq!(Error::server_error(503, "down").recovery(), RecoveryHint::Retry);
        assert_eq!(Error::malformed("bad json").recovery(), RecoveryHint::Retry);
        assert_eq!(
            Error::not_found("no score").recovery(),
            RecoveryHint::ComputeNow
        );
        assert_eq!(
            Error::unauthorized("expired").recovery(),
            RecoveryHint::SignIn
        );
        assert_eq!(Error::Cancelled.recovery(), RecoveryHint::None);
    }

    #[test]
    fn test_kind_display_matches_taxonomy() {
        assert_eq!(Error::not_found("x").kind().to_string(), "notFound");
        assert_eq!(Error::Cancelled.kind().to_string(), "cancelled");
        assert_eq!(Error::malformed("x").kind(), ErrorKind::Server);
    }

    #[test]
    fn test_error_display() {
        let err = Error::server_error(500, "boom");
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));
    }
}
