use thiserror::Error;

/// Errors a translation backend can raise for a single chunk.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("DeepL API key is required. Please configure it in Settings.")]
    MissingCredentials,

    #[error("Unknown translation backend: {0}")]
    UnknownBackend(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} error {status}: {body}")]
    Provider {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl TranslateError {
    /// Whether another attempt could possibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            TranslateError::MissingCredentials | TranslateError::UnknownBackend(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_fatal() {
        assert!(!TranslateError::MissingCredentials.is_retryable());
        assert!(!TranslateError::UnknownBackend("bing".into()).is_retryable());
        assert!(TranslateError::UnexpectedResponse("empty".into()).is_retryable());
        assert!(TranslateError::Provider {
            provider: "DeepL",
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        }
        .is_retryable());
    }

    #[test]
    fn missing_key_message_is_user_facing() {
        assert_eq!(
            TranslateError::MissingCredentials.to_string(),
            "DeepL API key is required. Please configure it in Settings."
        );
    }
}
