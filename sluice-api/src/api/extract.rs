//! Request extractors shared by the handlers

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{ACCEPT_LANGUAGE, AUTHORIZATION};
use axum::http::request::Parts;
use sluice_core::domain::consumer::Consumer;

use crate::api::error::ApiError;
use crate::i18n::Language;
use crate::state::AppState;

/// Consumer authenticated by the `Authorization: Bearer <token>` header
pub struct AuthConsumer(pub Consumer);

impl FromRequestParts<AppState> for AuthConsumer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let consumer = state
            .store
            .load_consumer_by_token(token)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(AuthConsumer(consumer))
    }
}

/// Language negotiated from `Accept-Language`
pub struct Lang(pub Language);

impl<S: Send + Sync> FromRequestParts<S> for Lang {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Language::from_accept_language)
            .unwrap_or_default();
        Ok(Lang(lang))
    }
}
