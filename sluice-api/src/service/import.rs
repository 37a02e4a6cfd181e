//! Import Service
//!
//! Decodes declarative pipeline documents and writes them into a project.
//!
//! [`parse_and_import`] runs inside a caller-owned transaction and never
//! commits; the caller decides whether the writes become durable. Messages
//! describing what changed are appended as the import proceeds and stay
//! available to the caller even when the import fails.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use sluice_core::domain::consumer::Consumer;
use sluice_core::domain::message::{ImportMessage, MessageId};
use sluice_core::domain::pipeline::Pipeline;
use sluice_core::domain::project::Project;
use sluice_core::dto::pipeline::ImportOptions;
use sluice_core::export::{Format, PipelineV1, format};
use thiserror::Error;

use crate::repository::{AuditAction, PipelineAudit, StoreError, StoreTx};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("valid pipeline name pattern"));

/// Import error type
#[derive(Debug, Error)]
pub enum ImportError {
    /// Body unreadable or not a pipeline document
    #[error("wrong request: {0}")]
    WrongRequest(String),

    /// Document parsed but cannot be imported
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("pipeline {0} already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ImportError {
    /// True for failures the client cannot act on
    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            ImportError::Store(StoreError::Database(_) | StoreError::Internal(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;

/// Decode a request body in the requested format
///
/// An absent or empty `format` selects YAML.
pub fn decode_payload(format: Option<&str>, body: &[u8]) -> Result<PipelineV1> {
    let format = match format.map(str::trim) {
        None | Some("") => Format::Yaml,
        Some(tag) => Format::from_path(tag)
            .map_err(|e| ImportError::WrongRequest(format!("{e}: {tag}")))?,
    };

    format::decode(body, format).map_err(|e| ImportError::WrongRequest(e.to_string()))
}

/// Convert a decoded document into an unsaved pipeline
pub fn to_pipeline(payload: &PipelineV1) -> Result<Pipeline> {
    payload
        .to_domain()
        .map_err(|e| ImportError::InvalidPipeline(format!("unable to parse pipeline: {e}")))
}

/// Create or update `pipeline` in `project`
///
/// Fails with [`ImportError::AlreadyExists`] when a pipeline of the same
/// name exists and `opts.force` is unset. When `opts.pipeline_name` is set
/// it replaces the name carried by the document.
pub async fn parse_and_import(
    tx: &mut dyn StoreTx,
    project: &Project,
    mut pipeline: Pipeline,
    consumer: &Consumer,
    opts: &ImportOptions,
    messages: &mut Vec<ImportMessage>,
) -> Result<Pipeline> {
    if let Some(target) = opts.pipeline_name.as_deref() {
        if pipeline.name != target {
            messages.push(ImportMessage::warning(
                MessageId::PipelineNameOverridden,
                vec![pipeline.name.clone(), target.to_string()],
            ));
            pipeline.name = target.to_string();
        }
    }

    if !NAME_PATTERN.is_match(&pipeline.name) {
        return Err(ImportError::InvalidPipeline(format!(
            "invalid pipeline name {:?}",
            pipeline.name
        )));
    }

    pipeline.last_modified_by = Some(consumer.username.clone());

    let existing = tx.find_pipeline(project.id, &pipeline.name).await?;

    let (saved, action) = match existing {
        None => {
            let saved = tx
                .insert_pipeline(project.id, &pipeline)
                .await
                .map_err(|e| conflict_as_exists(e, &pipeline.name))?;
            created_messages(&saved, messages);
            (saved, AuditAction::Create)
        }
        Some(_) if !opts.force => {
            return Err(ImportError::AlreadyExists(pipeline.name));
        }
        Some(old) => {
            pipeline.id = old.id;
            pipeline.project_id = old.project_id;
            pipeline.created_at = old.created_at;
            let saved = tx.update_pipeline(&pipeline).await?;
            updated_messages(&old, &saved, messages);
            (saved, AuditAction::Update)
        }
    };

    tx.insert_audit(&PipelineAudit {
        pipeline_id: saved.id,
        action,
        username: consumer.username.clone(),
        created_at: Utc::now(),
    })
    .await?;

    tracing::info!(
        "Pipeline {} imported into project {} by {} ({})",
        saved.name,
        project.key,
        consumer.username,
        action.as_str()
    );

    Ok(saved)
}

fn conflict_as_exists(err: StoreError, name: &str) -> ImportError {
    match err {
        StoreError::Conflict(_) => ImportError::AlreadyExists(name.to_string()),
        other => ImportError::Store(other),
    }
}

fn created_messages(pipeline: &Pipeline, messages: &mut Vec<ImportMessage>) {
    messages.push(ImportMessage::info(
        MessageId::PipelineCreated,
        vec![pipeline.name.clone()],
    ));

    for param in &pipeline.parameters {
        messages.push(ImportMessage::info(
            MessageId::ParameterAdded,
            vec![param.name.clone(), pipeline.name.clone()],
        ));
    }

    for stage in &pipeline.stages {
        messages.push(ImportMessage::info(
            MessageId::StageAdded,
            vec![stage.name.clone(), pipeline.name.clone()],
        ));
        for job in &stage.jobs {
            messages.push(ImportMessage::info(
                MessageId::JobAdded,
                vec![job.name.clone(), stage.name.clone()],
            ));
        }
    }
}

fn updated_messages(old: &Pipeline, new: &Pipeline, messages: &mut Vec<ImportMessage>) {
    messages.push(ImportMessage::info(
        MessageId::PipelineUpdated,
        vec![new.name.clone()],
    ));

    let old_params: HashSet<&str> = old.parameters.iter().map(|p| p.name.as_str()).collect();
    let new_params: HashSet<&str> = new.parameters.iter().map(|p| p.name.as_str()).collect();

    for param in &new.parameters {
        if !old_params.contains(param.name.as_str()) {
            messages.push(ImportMessage::info(
                MessageId::ParameterAdded,
                vec![param.name.clone(), new.name.clone()],
            ));
        }
    }
    for param in &old.parameters {
        if !new_params.contains(param.name.as_str()) {
            messages.push(ImportMessage::info(
                MessageId::ParameterDeleted,
                vec![param.name.clone(), new.name.clone()],
            ));
        }
    }

    for stage in &new.stages {
        let previous = old.stage(&stage.name);
        let id = if previous.is_some() {
            MessageId::StageUpdated
        } else {
            MessageId::StageAdded
        };
        messages.push(ImportMessage::info(
            id,
            vec![stage.name.clone(), new.name.clone()],
        ));

        for job in &stage.jobs {
            let known = previous.is_some_and(|s| s.jobs.iter().any(|j| j.name == job.name));
            if !known {
                messages.push(ImportMessage::info(
                    MessageId::JobAdded,
                    vec![job.name.clone(), stage.name.clone()],
                ));
            }
        }
    }

    for stage in &old.stages {
        if new.stage(&stage.name).is_none() {
            messages.push(ImportMessage::info(
                MessageId::StageDeleted,
                vec![stage.name.clone(), new.name.clone()],
            ));
        }
    }
}
