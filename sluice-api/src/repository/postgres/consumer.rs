//! Consumer queries

use sluice_core::domain::consumer::Consumer;
use sluice_core::domain::project::Group;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::hash_token;

/// Resolve an API token to its consumer and groups
pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<Consumer>, sqlx::Error> {
    let row = sqlx::query_as::<_, ConsumerRow>(
        "SELECT id, username FROM consumers WHERE token_hash = $1",
    )
    .bind(hash_token(token))
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let groups = sqlx::query_as::<_, GroupRow>(
        r#"
        SELECT g.id, g.name
        FROM consumer_groups cg
        JOIN groups g ON g.id = cg.group_id
        WHERE cg.consumer_id = $1
        ORDER BY g.name
        "#,
    )
    .bind(row.id)
    .fetch_all(pool)
    .await?;

    Ok(Some(Consumer {
        id: row.id,
        username: row.username,
        groups: groups
            .into_iter()
            .map(|g| Group {
                id: g.id,
                name: g.name,
            })
            .collect(),
    }))
}

#[derive(sqlx::FromRow)]
struct ConsumerRow {
    id: Uuid,
    username: String,
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
}
