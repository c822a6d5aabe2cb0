//! Error taxonomy shared by authentication and claim flows.
//!
//! Every failure aborts the whole attempt; nothing here is retried.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result alias used across the crate.
pub type ClaimResult<T> = Result<T, ClaimError>;

/// Provider call that produced an unexpected status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderStage {
    CredentialExchange,
    ChallengeListing,
    ChallengeProbe,
    AnswerSubmission,
    ProfileRead,
    NameChangeInfo,
}

impl fmt::Display for ProviderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProviderStage::CredentialExchange => "credential exchange",
            ProviderStage::ChallengeListing => "security challenge listing",
            ProviderStage::ChallengeProbe => "security challenge probe",
            ProviderStage::AnswerSubmission => "security answer submission",
            ProviderStage::ProfileRead => "profile read",
            ProviderStage::NameChangeInfo => "name change info",
        };
        f.write_str(label)
    }
}

/// Authentication-level rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("account is not authenticated")]
    NotAuthenticated,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("wrong answer")]
    WrongAnswer,
    #[error("account does not own the game")]
    NoGameOwnership,
}

/// Network level failures (DNS, TLS, resets, timeouts).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tls error: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Other(String),
}

/// Coarse classification of a [`ClaimError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InputValidation,
    AuthFailure,
    TransportFailure,
    UnexpectedProviderState,
    MalformedResponse,
}

/// Top level error surfaced to callers.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("invalid input: {0}")]
    InputValidation(String),
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected status {status} during {stage}")]
    UnexpectedProviderState { stage: ProviderStage, status: u16 },
    #[error("malformed status line {prefix:?}")]
    MalformedResponse {
        sent_at: Option<DateTime<Utc>>,
        prefix: Vec<u8>,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("header conversion failed: {0}")]
    InvalidHeader(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClaimError {
    pub fn unexpected(stage: ProviderStage, status: u16) -> Self {
        ClaimError::UnexpectedProviderState { stage, status }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClaimError::InputValidation(_) | ClaimError::Config(_) => ErrorKind::InputValidation,
            ClaimError::Auth(_) => ErrorKind::AuthFailure,
            ClaimError::Transport(_) => ErrorKind::TransportFailure,
            ClaimError::UnexpectedProviderState { .. }
            | ClaimError::Json(_)
            | ClaimError::Url(_)
            | ClaimError::InvalidHeader(_) => ErrorKind::UnexpectedProviderState,
            ClaimError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    /// Send timestamp captured before the failure, if the request made it onto the wire.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ClaimError::MalformedResponse { sent_at, .. } => *sent_at,
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClaimError {
    fn from(err: std::io::Error) -> Self {
        ClaimError::Transport(TransportError::Io(err))
    }
}
