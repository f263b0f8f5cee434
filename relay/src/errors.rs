use http::StatusCode;
use thiserror::Error;

/// Result of handing a payload to the upstream.
pub type RelayOutcome = Result<(), RelayError>;

/// Errors that can occur while handling a single request.
///
/// None of these are fatal to the listener; each one becomes a
/// `{"success": false, "error": ...}` response.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] telemetry::ValidationError),

    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("Failed to read request body: {0}")]
    RequestBody(String),

    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("Upstream not configured: missing {}", .0.join(", "))]
    Configuration(Vec<&'static str>),

    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Upstream timeout after {0}s")]
    Timeout(u64),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) | RelayError::RequestBody(_) => StatusCode::BAD_REQUEST,
            RelayError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Configuration(_)
            | RelayError::Upstream { .. }
            | RelayError::Transport(_)
            | RelayError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => "validation",
            RelayError::BodyTooLarge(_) => "body_too_large",
            RelayError::RequestBody(_) => "request_body",
            RelayError::MethodNotAllowed(_) => "method_not_allowed",
            RelayError::Configuration(_) => "configuration",
            RelayError::Upstream { .. } => "upstream",
            RelayError::Transport(_) => "transport",
            RelayError::Timeout(_) => "timeout",
        }
    }
}

/// Errors that stop the relay itself.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_and_status() {
        let err = RelayError::Upstream {
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "Upstream error 503: unavailable");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = RelayError::Configuration(vec!["url", "api_key"]);
        assert_eq!(err.to_string(), "Upstream not configured: missing url, api_key");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = RelayError::from(telemetry::ValidationError::MissingActivityCode);
        assert_eq!(
            err.to_string(),
            "Missing activity data. Send POST with activityCode."
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "validation");
    }
}
