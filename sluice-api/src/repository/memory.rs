//! In-memory Store
//!
//! Keeps projects, consumers and pipelines in process memory. Writes made
//! through a [`MemoryTx`] are staged and only applied, all at once, when
//! the transaction commits; dropping the transaction discards them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use sluice_core::domain::consumer::Consumer;
use sluice_core::domain::pipeline::Pipeline;
use sluice_core::domain::project::{Group, GroupPermission, Permission, Project};
use uuid::Uuid;

use super::{PipelineAudit, Store, StoreError, StoreResult, StoreTx, hash_token};

#[derive(Default)]
struct State {
    projects: HashMap<String, Project>,
    /// Keyed by token digest
    consumers: HashMap<String, Consumer>,
    pipelines: HashMap<Uuid, Pipeline>,
    audits: Vec<PipelineAudit>,
}

impl State {
    fn find_pipeline(&self, project_id: Uuid, name: &str) -> Option<&Pipeline> {
        self.pipelines
            .values()
            .find(|p| p.project_id == project_id && p.name == name)
    }
}

fn lock(state: &Mutex<State>) -> StoreResult<MutexGuard<'_, State>> {
    state
        .lock()
        .map_err(|_| StoreError::Internal("memory store lock poisoned".to_string()))
}

/// Store kept entirely in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a project, replacing any project with the same key
    pub fn add_project(&self, project: Project) -> StoreResult<()> {
        lock(&self.state)?
            .projects
            .insert(project.key.clone(), project);
        Ok(())
    }

    /// Registers a consumer reachable through `token`
    pub fn add_consumer(&self, token: &str, consumer: Consumer) -> StoreResult<()> {
        lock(&self.state)?
            .consumers
            .insert(hash_token(token), consumer);
        Ok(())
    }

    /// Seeds project `DEV` and a consumer holding full access to it
    pub fn seed_development(&self, token: &str) -> StoreResult<Project> {
        let group = Group {
            id: Uuid::new_v4(),
            name: "developers".to_string(),
        };
        let project = Project {
            id: Uuid::new_v4(),
            key: "DEV".to_string(),
            name: "Development".to_string(),
            groups: vec![GroupPermission {
                group: group.clone(),
                permission: Permission::ReadWriteExecute,
            }],
        };

        self.add_project(project.clone())?;
        self.add_consumer(
            token,
            Consumer {
                id: Uuid::new_v4(),
                username: "developer".to_string(),
                groups: vec![group],
            },
        )?;
        Ok(project)
    }

    /// Committed audit entries, oldest first
    pub fn audits(&self) -> StoreResult<Vec<PipelineAudit>> {
        Ok(lock(&self.state)?.audits.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        lock(&self.state).map(|_| ())
    }

    async fn load_project(&self, key: &str) -> StoreResult<Option<Project>> {
        Ok(lock(&self.state)?.projects.get(key).cloned())
    }

    async fn load_consumer_by_token(&self, token: &str) -> StoreResult<Option<Consumer>> {
        Ok(lock(&self.state)?.consumers.get(&hash_token(token)).cloned())
    }

    async fn list_pipelines(&self, project_id: Uuid) -> StoreResult<Vec<Pipeline>> {
        let state = lock(&self.state)?;
        let mut pipelines: Vec<Pipeline> = state
            .pipelines
            .values()
            .filter(|p| p.project_id == project_id)
            .cloned()
            .collect();
        pipelines.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pipelines)
    }

    async fn find_pipeline(&self, project_id: Uuid, name: &str) -> StoreResult<Option<Pipeline>> {
        Ok(lock(&self.state)?.find_pipeline(project_id, name).cloned())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        Ok(Box::new(MemoryTx {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
        }))
    }
}

enum Write {
    Insert(Pipeline),
    Update(Pipeline),
    Audit(PipelineAudit),
}

/// Transaction over a [`MemoryStore`]
pub struct MemoryTx {
    state: Arc<Mutex<State>>,
    staged: Vec<Write>,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_pipeline(
        &mut self,
        project_id: Uuid,
        name: &str,
    ) -> StoreResult<Option<Pipeline>> {
        // Writes staged in this transaction are visible to it.
        let staged = self.staged.iter().rev().find_map(|w| match w {
            Write::Insert(p) | Write::Update(p)
                if p.project_id == project_id && p.name == name =>
            {
                Some(p.clone())
            }
            _ => None,
        });
        if staged.is_some() {
            return Ok(staged);
        }

        Ok(lock(&self.state)?.find_pipeline(project_id, name).cloned())
    }

    async fn insert_pipeline(
        &mut self,
        project_id: Uuid,
        pipeline: &Pipeline,
    ) -> StoreResult<Pipeline> {
        let now = Utc::now();
        let inserted = Pipeline {
            id: Uuid::new_v4(),
            project_id,
            created_at: now,
            updated_at: now,
            ..pipeline.clone()
        };
        self.staged.push(Write::Insert(inserted.clone()));
        Ok(inserted)
    }

    async fn update_pipeline(&mut self, pipeline: &Pipeline) -> StoreResult<Pipeline> {
        let updated = Pipeline {
            updated_at: Utc::now(),
            ..pipeline.clone()
        };
        self.staged.push(Write::Update(updated.clone()));
        Ok(updated)
    }

    async fn insert_audit(&mut self, audit: &PipelineAudit) -> StoreResult<()> {
        self.staged.push(Write::Audit(audit.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { state, staged } = *self;
        let mut state = lock(&state)?;

        // Apply to a copy so a failing write leaves the store untouched.
        let mut pipelines = state.pipelines.clone();
        let mut audits = Vec::new();

        for write in staged {
            match write {
                Write::Insert(p) => {
                    let taken = pipelines
                        .values()
                        .any(|e| e.project_id == p.project_id && e.name == p.name);
                    if taken {
                        return Err(StoreError::Conflict(format!(
                            "pipeline {} already exists",
                            p.name
                        )));
                    }
                    pipelines.insert(p.id, p);
                }
                Write::Update(p) => {
                    if !pipelines.contains_key(&p.id) {
                        return Err(StoreError::Internal(format!(
                            "pipeline {} no longer exists",
                            p.id
                        )));
                    }
                    pipelines.insert(p.id, p);
                }
                Write::Audit(a) => audits.push(a),
            }
        }

        state.pipelines = pipelines;
        state.audits.extend(audits);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project {
            id: Uuid::new_v4(),
            key: "PRJ".to_string(),
            name: "Project".to_string(),
            groups: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = MemoryStore::new();
        let project = project();
        store.add_project(project.clone()).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_pipeline(project.id, &Pipeline::new("build"))
            .await
            .unwrap();

        // Visible inside the transaction, not outside.
        assert!(tx.find_pipeline(project.id, "build").await.unwrap().is_some());
        assert!(store.find_pipeline(project.id, "build").await.unwrap().is_none());

        drop(tx);
        assert!(store.list_pipelines(project.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_applies_writes() {
        let store = MemoryStore::new();
        let project = project();

        let mut tx = store.begin().await.unwrap();
        let inserted = tx
            .insert_pipeline(project.id, &Pipeline::new("build"))
            .await
            .unwrap();
        assert!(inserted.is_persisted());
        tx.insert_audit(&PipelineAudit {
            pipeline_id: inserted.id,
            action: crate::repository::AuditAction::Create,
            username: "alice".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let found = store.find_pipeline(project.id, "build").await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(inserted.id));
        assert_eq!(store.audits().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_insert_conflicts_at_commit() {
        let store = MemoryStore::new();
        let project = project();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first
            .insert_pipeline(project.id, &Pipeline::new("build"))
            .await
            .unwrap();
        second
            .insert_pipeline(project.id, &Pipeline::new("build"))
            .await
            .unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_pipelines(project.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_seed_development_grants_full_access() {
        let store = MemoryStore::new();
        let project = store.seed_development("dev").unwrap();

        let consumer = store.load_consumer_by_token("dev").await.unwrap().unwrap();
        assert_eq!(
            project.permission_for(&consumer),
            Some(Permission::ReadWriteExecute)
        );
        assert!(store.load_project("DEV").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_consumer_lookup_by_token() {
        let store = MemoryStore::new();
        let consumer = Consumer {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            groups: Vec::new(),
        };
        store.add_consumer("secret", consumer.clone()).unwrap();

        let found = store.load_consumer_by_token("secret").await.unwrap();
        assert_eq!(found, Some(consumer));
        assert!(store.load_consumer_by_token("other").await.unwrap().is_none());
    }
}
