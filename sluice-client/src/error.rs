//! Failures reported by [`SluiceClient`](crate::SluiceClient)

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached or the connection broke
    #[error("unable to reach the Sluice API: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    ///
    /// `messages` holds the error text, preceded by any import messages the
    /// server produced before rejecting the document.
    #[error("{status}: {}", .messages.join("; "))]
    Rejected {
        status: StatusCode,
        messages: Vec<String>,
    },

    /// A success response whose body did not have the expected shape
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The request could not be built from the given arguments
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub fn rejected(status: StatusCode, messages: Vec<String>) -> Self {
        Self::Rejected { status, messages }
    }

    /// Status of a rejected request
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The project or pipeline does not exist
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// The pipeline already exists and `force` was not given
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }

    /// Missing or unknown token, or too weak a permission on the project
    pub fn is_denied(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s.is_server_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = ClientError::rejected(
            StatusCode::CONFLICT,
            vec!["pipeline build already exists".to_string()],
        );
        assert!(err.is_conflict());
        assert!(!err.is_denied());
        assert!(!err.is_server_error());

        let err = ClientError::rejected(StatusCode::NOT_FOUND, vec!["PRJ does not exist".into()]);
        assert!(err.is_not_found());

        assert!(ClientError::rejected(StatusCode::FORBIDDEN, Vec::new()).is_denied());
        assert!(ClientError::rejected(StatusCode::BAD_GATEWAY, Vec::new()).is_server_error());
        assert_eq!(ClientError::Decode("x".into()).status(), None);
    }

    #[test]
    fn test_rejected_display_joins_messages() {
        let err = ClientError::rejected(
            StatusCode::BAD_REQUEST,
            vec![
                "Stage compile added to pipeline build".to_string(),
                "invalid pipeline: stage b is not declared".to_string(),
            ],
        );
        assert_eq!(
            err.to_string(),
            "400 Bad Request: Stage compile added to pipeline build; invalid pipeline: stage b is not declared"
        );
    }
}
