//! Project Service
//!
//! Loads the project a request targets and checks the consumer's access.

use sluice_core::domain::consumer::Consumer;
use sluice_core::domain::project::{Permission, Project};
use thiserror::Error;

use crate::repository::{Store, StoreError};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project {0} not found")]
    NotFound(String),

    #[error("{username} lacks {required} permission on project {key}")]
    Forbidden {
        key: String,
        username: String,
        required: Permission,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Load a project with its groups, requiring at least `required` access
pub async fn load(
    store: &dyn Store,
    key: &str,
    consumer: &Consumer,
    required: Permission,
) -> Result<Project, ProjectError> {
    let project = store
        .load_project(key)
        .await?
        .ok_or_else(|| ProjectError::NotFound(key.to_string()))?;

    match project.permission_for(consumer) {
        Some(granted) if granted >= required => Ok(project),
        granted => {
            tracing::debug!(
                "Consumer {} denied on project {}: has {:?}, needs {}",
                consumer.username,
                key,
                granted,
                required
            );
            Err(ProjectError::Forbidden {
                key: key.to_string(),
                username: consumer.username.clone(),
                required,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use sluice_core::domain::project::{Group, GroupPermission};
    use uuid::Uuid;

    fn setup(permission: Permission) -> (MemoryStore, Consumer) {
        let group = Group {
            id: Uuid::new_v4(),
            name: "devs".to_string(),
        };
        let store = MemoryStore::new();
        store
            .add_project(Project {
                id: Uuid::new_v4(),
                key: "PRJ".to_string(),
                name: "Project".to_string(),
                groups: vec![GroupPermission {
                    group: group.clone(),
                    permission,
                }],
            })
            .unwrap();
        let consumer = Consumer {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            groups: vec![group],
        };
        (store, consumer)
    }

    #[tokio::test]
    async fn test_load_with_sufficient_permission() {
        let (store, consumer) = setup(Permission::ReadWriteExecute);
        let project = load(&store, "PRJ", &consumer, Permission::Read)
            .await
            .unwrap();
        assert_eq!(project.key, "PRJ");
    }

    #[tokio::test]
    async fn test_load_forbidden() {
        let (store, consumer) = setup(Permission::ReadExecute);
        let err = load(&store, "PRJ", &consumer, Permission::ReadWriteExecute)
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_load_unknown_project() {
        let (store, consumer) = setup(Permission::Read);
        let err = load(&store, "NOPE", &consumer, Permission::Read)
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectError::NotFound(key) if key == "NOPE"));
    }
}
