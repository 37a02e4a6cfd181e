//! Project queries

use sluice_core::domain::project::{Group, GroupPermission, Permission, Project};
use sqlx::PgPool;
use uuid::Uuid;

/// Load a project and its group bindings by key
pub async fn find_by_key(pool: &PgPool, key: &str) -> Result<Option<Project>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProjectRow>("SELECT id, key, name FROM projects WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let bindings = sqlx::query_as::<_, GroupPermissionRow>(
        r#"
        SELECT g.id, g.name, pg.permission
        FROM project_groups pg
        JOIN groups g ON g.id = pg.group_id
        WHERE pg.project_id = $1
        ORDER BY g.name
        "#,
    )
    .bind(row.id)
    .fetch_all(pool)
    .await?;

    let groups = bindings
        .into_iter()
        .filter_map(|b| match Permission::from_level(b.permission) {
            Some(permission) => Some(GroupPermission {
                group: Group {
                    id: b.id,
                    name: b.name,
                },
                permission,
            }),
            None => {
                tracing::warn!(
                    "Ignoring group {} on project {}: unknown permission level {}",
                    b.name,
                    row.key,
                    b.permission
                );
                None
            }
        })
        .collect();

    Ok(Some(Project {
        id: row.id,
        key: row.key,
        name: row.name,
        groups,
    }))
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    key: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct GroupPermissionRow {
    id: Uuid,
    name: String,
    permission: i32,
}
