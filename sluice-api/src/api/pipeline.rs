//! Pipeline API Handlers
//!
//! HTTP endpoints for previewing, importing, listing and exporting
//! pipelines.
//!
//! Import requests follow a fixed order: the project is loaded (and access
//! checked) before the body is read, the document is decoded and converted
//! before a transaction opens, and the `PipelineAdd` event is published only
//! once the transaction has committed. Commit and publish run in their own
//! task so that a client hanging up cannot interrupt them halfway.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use sluice_core::domain::consumer::Consumer;
use sluice_core::domain::pipeline::Pipeline;
use sluice_core::domain::project::{Permission, Project};
use sluice_core::dto::pipeline::{ImportOptions, PipelineSummary};
use sluice_core::export::Format;

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{AuthConsumer, Lang};
use crate::event::Event;
use crate::i18n::{self, Language};
use crate::repository::{StoreError, StoreTx};
use crate::service::{import_service, pipeline_service, project_service};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    pub format: Option<String>,
    /// `true`, `1`, `yes` or `on`; anything else means false
    pub force: Option<String>,
}

/// POST /pipeline/preview
/// Convert a pipeline document without storing it
pub async fn preview_pipeline(
    State(state): State<AppState>,
    AuthConsumer(_consumer): AuthConsumer,
    Query(query): Query<FormatQuery>,
    body: Body,
) -> ApiResult<Json<Pipeline>> {
    let bytes = read_body(body, state.config.max_body_bytes).await?;
    let payload = import_service::decode_payload(query.format.as_deref(), &bytes)?;
    let pipeline = import_service::to_pipeline(&payload)?;

    tracing::debug!("Previewed pipeline {}", pipeline.name);
    Ok(Json(pipeline))
}

/// POST /project/{key}/pipeline/import
/// Create a pipeline, or overwrite it when `force` is set
pub async fn import_pipeline(
    State(state): State<AppState>,
    AuthConsumer(consumer): AuthConsumer,
    Lang(lang): Lang,
    Path(key): Path<String>,
    Query(query): Query<ImportQuery>,
    body: Body,
) -> ApiResult<Response> {
    let project = project_service::load(
        state.store.as_ref(),
        &key,
        &consumer,
        Permission::ReadWriteExecute,
    )
    .await?;

    let bytes = read_body(body, state.config.max_body_bytes).await?;
    let payload = import_service::decode_payload(query.format.as_deref(), &bytes)?;
    let pipeline = match import_service::to_pipeline(&payload) {
        Ok(pipeline) => pipeline,
        Err(err) => return user_error(err, Vec::new(), lang),
    };

    let opts = ImportOptions {
        force: query.force.as_deref().is_some_and(parse_flag),
        pipeline_name: None,
    };
    tracing::info!(
        "Importing pipeline {} into project {} (force: {})",
        pipeline.name,
        project.key,
        opts.force
    );

    let mut tx = state.store.begin().await?;
    let mut messages = Vec::new();
    let result = import_service::parse_and_import(
        tx.as_mut(),
        &project,
        pipeline,
        &consumer,
        &opts,
        &mut messages,
    )
    .await;
    let texts = i18n::translate(&messages, lang);

    let saved = match result {
        Ok(saved) => saved,
        Err(err) => {
            rollback(tx).await;
            return user_error(err, texts, lang);
        }
    };

    // Nothing was stored, so the messages describing the import are dropped.
    if let Err(err) = commit_and_publish(&state, tx, &project, saved, consumer).await {
        return user_error(err, Vec::new(), lang);
    }

    Ok(Json(texts).into_response())
}

/// PUT /project/{key}/pipeline/{pipeline_key}/import
/// Overwrite the named pipeline; the URL name wins over the document's
pub async fn replace_pipeline(
    State(state): State<AppState>,
    AuthConsumer(consumer): AuthConsumer,
    Lang(lang): Lang,
    Path((key, pipeline_key)): Path<(String, String)>,
    Query(query): Query<FormatQuery>,
    body: Body,
) -> ApiResult<Json<Vec<String>>> {
    let project = project_service::load(
        state.store.as_ref(),
        &key,
        &consumer,
        Permission::ReadWriteExecute,
    )
    .await?;

    let bytes = read_body(body, state.config.max_body_bytes).await?;
    let payload = import_service::decode_payload(query.format.as_deref(), &bytes)?;
    let pipeline = import_service::to_pipeline(&payload).map_err(collapse)?;

    let opts = ImportOptions {
        force: true,
        pipeline_name: Some(pipeline_key),
    };

    let mut tx = state.store.begin().await?;
    let mut messages = Vec::new();
    let result = import_service::parse_and_import(
        tx.as_mut(),
        &project,
        pipeline,
        &consumer,
        &opts,
        &mut messages,
    )
    .await;

    // Replace is all or nothing: every failure reports as an invalid pipeline.
    let saved = match result {
        Ok(saved) => saved,
        Err(err) => {
            rollback(tx).await;
            return Err(collapse(err));
        }
    };

    commit_and_publish(&state, tx, &project, saved, consumer).await?;

    Ok(Json(i18n::translate(&messages, lang)))
}

/// GET /project/{key}/pipeline
/// List the pipelines of a project
pub async fn list_pipelines(
    State(state): State<AppState>,
    AuthConsumer(consumer): AuthConsumer,
    Path(key): Path<String>,
) -> ApiResult<Json<Vec<PipelineSummary>>> {
    let project = load_readable(&state, &key, &consumer).await?;
    let pipelines = pipeline_service::list_pipelines(state.store.as_ref(), &project).await?;
    Ok(Json(pipelines))
}

/// GET /project/{key}/pipeline/{pipeline_key}
/// Get a pipeline by name
pub async fn get_pipeline(
    State(state): State<AppState>,
    AuthConsumer(consumer): AuthConsumer,
    Path((key, pipeline_key)): Path<(String, String)>,
) -> ApiResult<Json<Pipeline>> {
    let project = load_readable(&state, &key, &consumer).await?;
    let pipeline =
        pipeline_service::get_pipeline(state.store.as_ref(), &project, &pipeline_key).await?;
    Ok(Json(pipeline))
}

/// GET /project/{key}/pipeline/{pipeline_key}/export
/// Render a pipeline as a declarative document
pub async fn export_pipeline(
    State(state): State<AppState>,
    AuthConsumer(consumer): AuthConsumer,
    Path((key, pipeline_key)): Path<(String, String)>,
    Query(query): Query<FormatQuery>,
) -> ApiResult<Response> {
    let format = match query.format.as_deref().map(str::trim) {
        None | Some("") => Format::Yaml,
        Some(tag) => Format::from_path(tag)?,
    };

    let project = load_readable(&state, &key, &consumer).await?;
    let bytes =
        pipeline_service::export_pipeline(state.store.as_ref(), &project, &pipeline_key, format)
            .await?;

    Ok(([(header::CONTENT_TYPE, format.content_type())], bytes).into_response())
}

// =============================================================================
// Helpers
// =============================================================================

async fn load_readable(state: &AppState, key: &str, consumer: &Consumer) -> ApiResult<Project> {
    Ok(project_service::load(state.store.as_ref(), key, consumer, Permission::Read).await?)
}

/// Lenient boolean for query flags: `true`, `1`, `yes` and `on` in any case
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

async fn read_body(body: Body, limit: usize) -> ApiResult<axum::body::Bytes> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| ApiError::WrongRequest(format!("unable to read body: {e}")))
}

/// Answer a failed import with the messages gathered so far
///
/// Internal failures go through the regular error path instead.
fn user_error(
    err: import_service::ImportError,
    mut texts: Vec<String>,
    lang: Language,
) -> ApiResult<Response> {
    if err.is_unknown() {
        return Err(err.into());
    }

    let err = ApiError::from(err);
    tracing::debug!("Import rejected: {}", err);
    texts.push(err.localized(lang));
    Ok((err.status(), Json(texts)).into_response())
}

fn collapse(err: import_service::ImportError) -> ApiError {
    tracing::debug!("Unable to replace pipeline: {}", err);
    ApiError::InvalidPipeline(format!("unable to parse and import pipeline: {err}"))
}

async fn rollback(tx: Box<dyn StoreTx>) {
    if let Err(err) = tx.rollback().await {
        tracing::debug!("Rollback failed: {}", err);
    }
}

/// Commit the transaction, then publish `PipelineAdd`
///
/// Runs detached from the request future and is only awaited here.
async fn commit_and_publish(
    state: &AppState,
    tx: Box<dyn StoreTx>,
    project: &Project,
    pipeline: Pipeline,
    consumer: Consumer,
) -> Result<(), import_service::ImportError> {
    let events = Arc::clone(&state.events);
    let project_key = project.key.clone();
    let name = pipeline.name.clone();

    let task = tokio::spawn(async move {
        tx.commit().await?;

        let event = Event::pipeline_add(&project_key, &pipeline, &consumer);
        if let Err(err) = events.publish(event).await {
            tracing::warn!(
                "Pipeline {} committed but its event was not delivered: {}",
                pipeline.name,
                err
            );
        }
        Ok::<_, StoreError>(())
    });

    match task.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(StoreError::Conflict(_))) => Err(import_service::ImportError::AlreadyExists(name)),
        Ok(Err(err)) => Err(err.into()),
        Err(err) => Err(StoreError::Internal(format!("commit task failed: {err}")).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_user_error_appends_localized_error() {
        let response = user_error(
            import_service::ImportError::AlreadyExists("build".into()),
            vec!["first".to_string()],
            Language::En,
        )
        .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_parse_flag() {
        for value in ["true", "TRUE", "1", "yes", " on "] {
            assert!(parse_flag(value), "{value}");
        }
        for value in ["", "false", "0", "no", "maybe"] {
            assert!(!parse_flag(value), "{value}");
        }
    }

    #[test]
    fn test_user_error_escalates_unknown() {
        let result = user_error(
            import_service::ImportError::Store(StoreError::Internal("boom".into())),
            Vec::new(),
            Language::En,
        );
        assert!(matches!(result, Err(ApiError::Store(_))));
    }
}
