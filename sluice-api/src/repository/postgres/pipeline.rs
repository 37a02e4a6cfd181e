//! Pipeline queries

use chrono::{DateTime, Utc};
use sluice_core::domain::pipeline::{Pipeline, PipelineDefinition};
use sqlx::PgExecutor;
use uuid::Uuid;

/// List the pipelines of a project, ordered by name
pub async fn list_by_project<'e, E: PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
) -> Result<Vec<Pipeline>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PipelineRow>(
        r#"
        SELECT id, project_id, name, description, definition,
               created_at, updated_at, last_modified_by
        FROM pipelines
        WHERE project_id = $1
        ORDER BY name
        "#,
    )
    .bind(project_id)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(Pipeline::try_from).collect()
}

/// Find a pipeline by name within a project
pub async fn find_by_name<'e, E: PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    name: &str,
) -> Result<Option<Pipeline>, sqlx::Error> {
    let row = sqlx::query_as::<_, PipelineRow>(
        r#"
        SELECT id, project_id, name, description, definition,
               created_at, updated_at, last_modified_by
        FROM pipelines
        WHERE project_id = $1 AND name = $2
        "#,
    )
    .bind(project_id)
    .bind(name)
    .fetch_optional(executor)
    .await?;

    row.map(Pipeline::try_from).transpose()
}

/// Insert a new pipeline under a project
pub async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    pipeline: &Pipeline,
) -> Result<Pipeline, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let definition = encode_definition(&pipeline.definition())?;

    sqlx::query(
        r#"
        INSERT INTO pipelines (
            id, project_id, name, description, definition,
            created_at, updated_at, last_modified_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(project_id)
    .bind(&pipeline.name)
    .bind(&pipeline.description)
    .bind(definition)
    .bind(now)
    .bind(now)
    .bind(&pipeline.last_modified_by)
    .execute(executor)
    .await?;

    Ok(Pipeline {
        id,
        project_id,
        created_at: now,
        updated_at: now,
        ..pipeline.clone()
    })
}

/// Overwrite a stored pipeline in place
pub async fn update<'e, E: PgExecutor<'e>>(
    executor: E,
    pipeline: &Pipeline,
) -> Result<Pipeline, sqlx::Error> {
    let now = Utc::now();
    let definition = encode_definition(&pipeline.definition())?;

    let result = sqlx::query(
        r#"
        UPDATE pipelines
        SET name = $1, description = $2, definition = $3,
            updated_at = $4, last_modified_by = $5
        WHERE id = $6
        "#,
    )
    .bind(&pipeline.name)
    .bind(&pipeline.description)
    .bind(definition)
    .bind(now)
    .bind(&pipeline.last_modified_by)
    .bind(pipeline.id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }

    Ok(Pipeline {
        updated_at: now,
        ..pipeline.clone()
    })
}

fn encode_definition(definition: &PipelineDefinition) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(definition).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    project_id: Uuid,
    name: String,
    description: Option<String>,
    definition: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_modified_by: Option<String>,
}

impl TryFrom<PipelineRow> for Pipeline {
    type Error = sqlx::Error;

    fn try_from(row: PipelineRow) -> Result<Self, Self::Error> {
        let definition: PipelineDefinition = serde_json::from_value(row.definition)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Pipeline {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            description: row.description,
            parameters: definition.parameters,
            stages: definition.stages,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_modified_by: row.last_modified_by,
        })
    }
}
