use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum AppError {
    /// The service could not be reached or the exchange broke off mid-flight.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),
    /// The service answered, but not in a shape we can use.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("malformed date `{0}`")]
    MalformedDate(String),
    /// The service reported a status other than in-progress or completed.
    #[error("extraction job failed with status `{status}`")]
    JobFailed { status: String, body: String },
    #[error("poll loop cancelled")]
    Cancelled,
    #[error("job still in progress after {attempts} poll attempts")]
    PollTimeout { attempts: u32 },
    #[error("invalid job state: {0}")]
    InvalidState(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }

    pub fn transport<E: Into<BoxError>>(err: E) -> Self {
        AppError::Transport(err.into())
    }

    pub fn malformed<T: Into<String>>(msg: T) -> Self {
        AppError::MalformedResponse(msg.into())
    }

    /// True for failures worth retrying at the caller's discretion.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Transport(_) | AppError::PollTimeout { .. })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::MalformedResponse(err.to_string())
        } else {
            AppError::Transport(Box::new(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_transient() {
        let err = AppError::transport(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(err.is_transient());
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn job_failures_are_not_transient() {
        let err = AppError::JobFailed {
            status: "Error".to_string(),
            body: "{\"message\":\"bad field\"}".to_string(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "extraction job failed with status `Error`");
    }
}
