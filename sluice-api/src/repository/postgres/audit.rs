//! Pipeline audit queries

use sqlx::PgExecutor;

use crate::repository::PipelineAudit;

/// Append an audit entry
pub async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    audit: &PipelineAudit,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO pipeline_audits (pipeline_id, action, username, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(audit.pipeline_id)
    .bind(audit.action.as_str())
    .bind(&audit.username)
    .bind(audit.created_at)
    .execute(executor)
    .await?;

    Ok(())
}
