//! Pipeline domain types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline definition
///
/// Internal entity persisted by the store. `id` and `project_id` stay nil
/// until the pipeline has been written under a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parameters: Vec<Parameter>,
    pub stages: Vec<Stage>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Username of the consumer behind the last import
    pub last_modified_by: Option<String>,
}

impl Pipeline {
    /// Creates an unsaved pipeline with no stages
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Uuid::nil(),
            project_id: Uuid::nil(),
            name: name.into(),
            description: None,
            parameters: Vec::new(),
            stages: Vec::new(),
            created_at: now,
            updated_at: now,
            last_modified_by: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        !self.id.is_nil()
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn job_count(&self) -> usize {
        self.stages.iter().map(|s| s.jobs.len()).sum()
    }

    /// Parts of the pipeline that are stored as a single JSON document
    pub fn definition(&self) -> PipelineDefinition {
        PipelineDefinition {
            parameters: self.parameters.clone(),
            stages: self.stages.clone(),
        }
    }
}

/// Stored body of a pipeline (parameters and stages)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

/// Pipeline parameter with its default value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    #[default]
    String,
    Text,
    Number,
    Boolean,
    List,
}

/// Ordered group of jobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    /// 1-based position of the stage in the pipeline
    pub build_order: u32,
    pub enabled: bool,
    /// Variable name to expected value; all must match for the stage to run
    pub conditions: BTreeMap<String, String>,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub requirements: Vec<Requirement>,
    pub steps: Vec<Action>,
}

/// Worker requirement, e.g. `binary: git`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub kind: String,
    pub value: String,
}

/// A single step of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub kind: ActionKind,
    pub enabled: bool,
    pub optional: bool,
    pub always_executed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Script {
        lines: Vec<String>,
    },
    Builtin {
        action: String,
        params: BTreeMap<String, String>,
    },
}
