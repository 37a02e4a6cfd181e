//! Pipeline Service
//!
//! Read access to the pipelines of a project.

use sluice_core::domain::pipeline::Pipeline;
use sluice_core::domain::project::Project;
use sluice_core::dto::pipeline::PipelineSummary;
use sluice_core::export::{ExportError, Format, PipelineV1, format};
use thiserror::Error;

use crate::repository::{Store, StoreError};

/// Service error type
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// List the pipelines of a project
pub async fn list_pipelines(store: &dyn Store, project: &Project) -> Result<Vec<PipelineSummary>> {
    let pipelines = store.list_pipelines(project.id).await?;
    Ok(pipelines.into_iter().map(PipelineSummary::from).collect())
}

/// Get a pipeline by name
pub async fn get_pipeline(store: &dyn Store, project: &Project, name: &str) -> Result<Pipeline> {
    store
        .find_pipeline(project.id, name)
        .await?
        .ok_or_else(|| PipelineError::NotFound(name.to_string()))
}

/// Render a stored pipeline as a declarative document
pub async fn export_pipeline(
    store: &dyn Store,
    project: &Project,
    name: &str,
    format: Format,
) -> Result<Vec<u8>> {
    // encode() yields an empty buffer for Unknown; refuse it up front.
    format.as_str()?;

    let pipeline = get_pipeline(store, project, name).await?;
    let document = PipelineV1::from_domain(&pipeline);

    tracing::debug!("Exporting pipeline {} as {}", pipeline.name, format);
    Ok(format::encode(&document, format)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use uuid::Uuid;

    async fn seeded() -> (MemoryStore, Project) {
        let store = MemoryStore::new();
        let project = Project {
            id: Uuid::new_v4(),
            key: "PRJ".to_string(),
            name: "Project".to_string(),
            groups: Vec::new(),
        };

        let document: PipelineV1 = format::decode(
            b"name: build\nstages: [compile]\njobs:\n- job: make\n  steps:\n  - script: make all\n",
            Format::Yaml,
        )
        .unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_pipeline(project.id, &document.to_domain().unwrap())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        (store, project)
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let (store, project) = seeded().await;

        let summaries = list_pipelines(&store, &project).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].job_count, 1);

        let pipeline = get_pipeline(&store, &project, "build").await.unwrap();
        assert_eq!(pipeline.stages[0].name, "compile");

        let err = get_pipeline(&store, &project, "deploy").await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_export_reimports_to_same_pipeline() {
        let (store, project) = seeded().await;
        let stored = get_pipeline(&store, &project, "build").await.unwrap();

        let bytes = export_pipeline(&store, &project, "build", Format::Json)
            .await
            .unwrap();
        let document: PipelineV1 = format::decode(&bytes, Format::Json).unwrap();
        let reimported = document.to_domain().unwrap();

        assert_eq!(reimported.name, stored.name);
        assert_eq!(reimported.stages, stored.stages);
    }

    #[tokio::test]
    async fn test_export_unknown_format() {
        let (store, project) = seeded().await;
        let err = export_pipeline(&store, &project, "build", Format::Unknown)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Export(ExportError::UnsupportedFormat)
        ));
    }
}
