//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sluice_core::export::ExportError;
use thiserror::Error;

use crate::i18n::{self, ErrorKey, Language};
use crate::repository::StoreError;
use crate::service::import::ImportError;
use crate::service::pipeline::PipelineError;
use crate::service::project::ProjectError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("wrong request: {0}")]
    WrongRequest(String),

    #[error("unsupported format")]
    UnsupportedFormat,

    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("pipeline {0} already exists")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::WrongRequest(_)
            | ApiError::UnsupportedFormat
            | ApiError::InvalidPipeline(_) => StatusCode::BAD_REQUEST,
            ApiError::AlreadyExists(_) | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the client, in `lang`
    ///
    /// Internal failures never leak their details.
    pub fn localized(&self, lang: Language) -> String {
        let (key, args) = match self {
            ApiError::Unauthorized => (ErrorKey::Unauthorized, vec![]),
            ApiError::Forbidden(d) => (ErrorKey::Forbidden, vec![d.clone()]),
            ApiError::NotFound(d) => (ErrorKey::NotFound, vec![d.clone()]),
            ApiError::WrongRequest(d) => (ErrorKey::WrongRequest, vec![d.clone()]),
            ApiError::UnsupportedFormat => (ErrorKey::UnsupportedFormat, vec![]),
            ApiError::InvalidPipeline(d) => (ErrorKey::InvalidPipeline, vec![d.clone()]),
            ApiError::AlreadyExists(n) => (ErrorKey::PipelineAlreadyExists, vec![n.clone()]),
            ApiError::Conflict(d) => (ErrorKey::Conflict, vec![d.clone()]),
            ApiError::Store(_) | ApiError::Internal(_) => (ErrorKey::Internal, vec![]),
        };
        i18n::translate_error(key, &args, lang)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Store(err) => tracing::error!("Store error: {:?}", err),
            ApiError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            other => tracing::debug!("Request failed with {}: {}", status, other),
        }

        let message = self.localized(Language::En);
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Store(other),
        }
    }
}

impl From<ProjectError> for ApiError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::NotFound(key) => ApiError::NotFound(format!("project {key}")),
            err @ ProjectError::Forbidden { .. } => ApiError::Forbidden(err.to_string()),
            ProjectError::Store(err) => err.into(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(name) => ApiError::NotFound(format!("pipeline {name}")),
            PipelineError::Export(err) => err.into(),
            PipelineError::Store(err) => err.into(),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::WrongRequest(msg) => ApiError::WrongRequest(msg),
            ImportError::InvalidPipeline(msg) => ApiError::InvalidPipeline(msg),
            ImportError::AlreadyExists(name) => ApiError::AlreadyExists(name),
            ImportError::Store(err) => err.into(),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnsupportedFormat => ApiError::UnsupportedFormat,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(ImportError::WrongRequest("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ImportError::AlreadyExists("build".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ProjectError::NotFound("PRJ".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ExportError::UnsupportedFormat).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StoreError::Internal("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = ApiError::Internal("connection refused at 10.0.0.1".into());
        assert_eq!(err.localized(Language::En), "internal server error");
        assert_eq!(
            ApiError::NotFound("project PRJ".into()).localized(Language::En),
            "project PRJ does not exist"
        );
    }
}
