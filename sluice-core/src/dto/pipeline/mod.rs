//! Pipeline DTOs for inter-service communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pipeline::Pipeline;

/// Options recognized by the import protocol
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Permit overwriting an existing pipeline of the same name
    pub force: bool,
    /// Target name, taking precedence over the name inside the document
    pub pipeline_name: Option<String>,
}

/// Lightweight pipeline summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub stage_count: usize,
    pub job_count: usize,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub last_modified_by: Option<String>,
}

impl From<Pipeline> for PipelineSummary {
    fn from(pipeline: Pipeline) -> Self {
        Self {
            id: pipeline.id,
            stage_count: pipeline.stages.len(),
            job_count: pipeline.job_count(),
            name: pipeline.name,
            description: pipeline.description,
            updated_at: pipeline.updated_at,
            last_modified_by: pipeline.last_modified_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipeline::{Job, Stage};
    use std::collections::BTreeMap;

    #[test]
    fn test_pipeline_summary_conversion() {
        let mut pipeline = Pipeline::new("build");
        pipeline.stages.push(Stage {
            name: "compile".to_string(),
            build_order: 1,
            enabled: true,
            conditions: BTreeMap::new(),
            jobs: vec![Job {
                name: "make".to_string(),
                description: None,
                enabled: true,
                requirements: vec![],
                steps: vec![],
            }],
        });

        let summary: PipelineSummary = pipeline.clone().into();
        assert_eq!(summary.name, "build");
        assert_eq!(summary.stage_count, 1);
        assert_eq!(summary.job_count, 1);
        assert_eq!(summary.id, pipeline.id);
    }
}
