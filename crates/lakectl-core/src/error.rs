//! Error taxonomy and message classification.
//!
//! Remote failures arrive here as free text (the platform wraps most backend
//! errors in a message string rather than a typed payload), so classification
//! is an ordered list of case-insensitive substring predicates. The order is
//! the precedence: the first matching category wins.
//!
//! # Example
//!
//! ```rust
//! use lakectl_core::{ClassifiedError, ErrorKind};
//!
//! let err = ClassifiedError::classify("connection reset by peer");
//! assert_eq!(err.kind, ErrorKind::Network);
//! assert!(err.is_retryable());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure category for a remote call.
///
/// The discriminant order is the classification precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    RateLimit,
    TransientServer,
    NotReady,
    Auth,
    Permission,
    NotFound,
    BadRequest,
    Unknown,
}

/// Ordered (category, keywords) table. First match wins, so broader
/// keywords belong to the higher-precedence category that owns them
/// ("invalid token" must hit Auth before BadRequest's "invalid").
const KEYWORD_GROUPS: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::Network,
        &[
            "connection",
            "timed out",
            "timeout",
            "broken pipe",
            "unreachable",
            "dns",
            "tls handshake",
        ],
    ),
    (
        ErrorKind::RateLimit,
        &["rate limit", "too many requests", "429"],
    ),
    (
        ErrorKind::TransientServer,
        &[
            "internal server error",
            "service unavailable",
            "bad gateway",
            "temporarily unavailable",
            "500",
            "502",
            "503",
            "504",
        ],
    ),
    (
        ErrorKind::NotReady,
        &[
            "not ready",
            "pending",
            "provisioning",
            "still starting",
            "in progress",
            "resizing",
        ],
    ),
    (
        ErrorKind::Auth,
        &[
            "unauthorized",
            "authentication",
            "invalid token",
            "token expired",
            "401",
        ],
    ),
    (
        ErrorKind::Permission,
        &["permission", "forbidden", "access denied", "403"],
    ),
    (
        ErrorKind::NotFound,
        &["not found", "does not exist", "no such", "404"],
    ),
    (
        ErrorKind::BadRequest,
        &["bad request", "invalid", "malformed", "400"],
    ),
];

impl ErrorKind {
    /// Classify a raw failure message. Deterministic, never fails; messages
    /// matching no keyword group land in `Unknown`.
    #[must_use]
    pub fn classify(message: &str) -> ErrorKind {
        let lowered = message.to_lowercase();
        for (kind, keywords) in KEYWORD_GROUPS {
            if keywords.iter().any(|k| lowered.contains(k)) {
                return *kind;
            }
        }
        ErrorKind::Unknown
    }

    /// Whether a failure of this category is worth retrying. The mapping is
    /// fixed: transient backend and transport conditions retry, caller
    /// mistakes and credential problems do not.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network
                | ErrorKind::RateLimit
                | ErrorKind::TransientServer
                | ErrorKind::NotReady
        )
    }

    /// Short remediation hint for user-facing error output.
    #[must_use]
    pub fn hint(self) -> Option<&'static str> {
        match self {
            ErrorKind::Network => Some("check network connectivity and the configured host URL"),
            ErrorKind::RateLimit => Some("the backend is rate limiting; retry later or reduce batch concurrency"),
            ErrorKind::TransientServer => Some("the backend reported a transient server error; retrying usually succeeds"),
            ErrorKind::NotReady => Some("the resource is not in a terminal state yet; wait and retry"),
            ErrorKind::Auth => Some("verify the token with 'lakectl profile show' or the LAKEHOUSE_TOKEN variable"),
            ErrorKind::Permission => Some("the token lacks permission for this operation"),
            ErrorKind::NotFound => Some("verify the resource identifier"),
            ErrorKind::BadRequest => Some("the request arguments were rejected; check the operation input"),
            ErrorKind::Unknown => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::TransientServer => "transient_server",
            ErrorKind::NotReady => "not_ready",
            ErrorKind::Auth => "auth",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote-call failure with an established category.
///
/// Created fresh per failure and never mutated in place; marking retry
/// exhaustion consumes the value. Classification is idempotent: the retry
/// executor is generic over `E: Into<ClassifiedError>`, and a value that is
/// already a `ClassifiedError` converts via the identity `From` impl without
/// being reclassified.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error(
    "{kind} error: {message}{}",
    if *retries_exhausted { " (retries exhausted)" } else { "" }
)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    /// Set when the retry executor gave up after its last attempt. Rendered
    /// as an explicit marker so callers can tell exhaustion apart from a
    /// first-failure surfacing.
    pub retries_exhausted: bool,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retries_exhausted: false,
        }
    }

    /// Classify a raw message and wrap it.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ErrorKind::classify(&message),
            message,
            retries_exhausted: false,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Mark this error as the survivor of an exhausted retry budget.
    #[must_use]
    pub fn exhausted(mut self) -> Self {
        self.retries_exhausted = true;
        self
    }
}
