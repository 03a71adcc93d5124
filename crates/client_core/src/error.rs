use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Auth,
    Transport,
    Backend,
    Validation,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid backend url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("not logged in")]
    NoSession,
    #[error("backend rejected session ({status})")]
    Unauthorized { status: StatusCode },
    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body for {endpoint}: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
    #[error("{0}")]
    Validation(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoSession | Self::Unauthorized { .. } => ErrorCategory::Auth,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Status { .. } | Self::Decode { .. } => ErrorCategory::Backend,
            Self::InvalidBaseUrl { .. } | Self::Validation(_) | Self::Io { .. } => {
                ErrorCategory::Validation
            }
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category() == ErrorCategory::Auth
    }

    /// True when the backend was reached and answered, whatever it said.
    pub fn backend_responded(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::Status { .. } | Self::Decode { .. }
        )
    }
}
