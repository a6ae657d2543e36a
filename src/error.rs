use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("daily limit reached ({used}/{limit})")]
    QuotaExceeded { used: u64, limit: u64 },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("failed to send HTTP request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("empty prompt")]
    EmptyPrompt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = QuotaError::QuotaExceeded { used: 20, limit: 20 };
        assert_eq!(err.to_string(), "daily limit reached (20/20)");

        let err = QuotaError::Api { status: 429, body: "slow down".into() };
        assert_eq!(err.to_string(), "API error: 429 slow down");
    }

    #[test]
    fn storage_errors_pass_through() {
        let err: QuotaError = StoreError::Poisoned.into();
        assert_eq!(err.to_string(), "storage lock poisoned");
    }
}
