use thiserror::Error;

/// Detail used when the authorization server gives no usable message.
pub const GENERIC_DETAIL: &str = "Authorization server error";

/// Failure talking to the authorization server.
///
/// Only [`UpstreamAuthError::Rejected`] carries text that came from the
/// server. Transport and decoding failures are logged where they happen and
/// surface with a fixed message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamAuthError {
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    #[error("Authorization server is unavailable")]
    Unavailable,

    #[error("Authorization server returned an invalid response")]
    InvalidResponse,

    #[error("Failed to build authorization server client: {0}")]
    Client(String),
}

impl UpstreamAuthError {
    /// Text safe to return to the caller.
    pub fn detail(&self) -> &str {
        match self {
            UpstreamAuthError::Rejected { detail, .. } => detail,
            _ => GENERIC_DETAIL,
        }
    }

    /// Transport failures and 5xx answers are worth another attempt on
    /// idempotent calls.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamAuthError::Unavailable => true,
            UpstreamAuthError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
