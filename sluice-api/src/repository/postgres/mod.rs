//! Postgres Store
//!
//! [`Store`] implementation backed by a sqlx connection pool. Query code
//! lives in one module per table group; each query is a free function over
//! a `PgExecutor` so it runs equally against the pool or a transaction.

mod audit;
mod consumer;
mod pipeline;
mod project;

use async_trait::async_trait;
use sluice_core::domain::consumer::Consumer;
use sluice_core::domain::pipeline::Pipeline;
use sluice_core::domain::project::Project;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{PipelineAudit, Store, StoreResult, StoreTx};

/// Store backed by Postgres
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn load_project(&self, key: &str) -> StoreResult<Option<Project>> {
        Ok(project::find_by_key(&self.pool, key).await?)
    }

    async fn load_consumer_by_token(&self, token: &str) -> StoreResult<Option<Consumer>> {
        Ok(consumer::find_by_token(&self.pool, token).await?)
    }

    async fn list_pipelines(&self, project_id: Uuid) -> StoreResult<Vec<Pipeline>> {
        Ok(pipeline::list_by_project(&self.pool, project_id).await?)
    }

    async fn find_pipeline(&self, project_id: Uuid, name: &str) -> StoreResult<Option<Pipeline>> {
        Ok(pipeline::find_by_name(&self.pool, project_id, name).await?)
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// Open Postgres transaction; rolled back by sqlx when dropped uncommitted
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn find_pipeline(
        &mut self,
        project_id: Uuid,
        name: &str,
    ) -> StoreResult<Option<Pipeline>> {
        Ok(pipeline::find_by_name(&mut *self.tx, project_id, name).await?)
    }

    async fn insert_pipeline(
        &mut self,
        project_id: Uuid,
        pipeline: &Pipeline,
    ) -> StoreResult<Pipeline> {
        Ok(pipeline::insert(&mut *self.tx, project_id, pipeline).await?)
    }

    async fn update_pipeline(&mut self, pipeline: &Pipeline) -> StoreResult<Pipeline> {
        Ok(pipeline::update(&mut *self.tx, pipeline).await?)
    }

    async fn insert_audit(&mut self, audit: &PipelineAudit) -> StoreResult<()> {
        Ok(audit::insert(&mut *self.tx, audit).await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        Ok(self.tx.commit().await?)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(self.tx.rollback().await?)
    }
}
