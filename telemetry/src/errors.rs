use thiserror::Error;

/// Errors raised while validating an incoming telemetry body.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Missing activity data. Send POST with activityCode.")]
    MissingActivityCode,

    #[error("{0}")]
    InvalidBody(String),
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        ValidationError::InvalidBody(e.to_string())
    }
}
