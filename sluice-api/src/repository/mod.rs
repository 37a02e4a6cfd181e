//! Repository Module
//!
//! Data access layer for the API server.
//!
//! Services talk to the store through the [`Store`] and [`StoreTx`] traits.
//! Two implementations are provided:
//! - [`postgres::PgStore`]: sqlx over Postgres
//! - [`memory::MemoryStore`]: process-local, used by tests and development runs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sluice_core::domain::consumer::Consumer;
use sluice_core::domain::pipeline::Pipeline;
use sluice_core::domain::project::Project;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A uniqueness constraint was violated
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Audit record written alongside every pipeline import
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineAudit {
    pub pipeline_id: Uuid,
    pub action: AuditAction,
    pub username: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
        }
    }
}

/// Digest under which API tokens are stored
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Process-wide store handle, safe for concurrent use
#[async_trait]
pub trait Store: Send + Sync {
    /// Checks that the store answers
    async fn ping(&self) -> StoreResult<()>;

    /// Loads a project together with its group bindings
    async fn load_project(&self, key: &str) -> StoreResult<Option<Project>>;

    /// Resolves an API token to its consumer
    async fn load_consumer_by_token(&self, token: &str) -> StoreResult<Option<Consumer>>;

    async fn list_pipelines(&self, project_id: Uuid) -> StoreResult<Vec<Pipeline>>;

    async fn find_pipeline(&self, project_id: Uuid, name: &str) -> StoreResult<Option<Pipeline>>;

    /// Opens a transaction
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

/// A single request's transaction
///
/// Dropping the transaction without calling [`StoreTx::commit`] discards
/// every write made through it.
#[async_trait]
pub trait StoreTx: Send {
    async fn find_pipeline(&mut self, project_id: Uuid, name: &str)
    -> StoreResult<Option<Pipeline>>;

    /// Inserts a new pipeline and returns it with its identifier set
    async fn insert_pipeline(&mut self, project_id: Uuid, pipeline: &Pipeline)
    -> StoreResult<Pipeline>;

    /// Replaces the stored pipeline identified by `pipeline.id`
    async fn update_pipeline(&mut self, pipeline: &Pipeline) -> StoreResult<Pipeline>;

    async fn insert_audit(&mut self, audit: &PipelineAudit) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
