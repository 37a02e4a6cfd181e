//! Import message domain types
//!
//! Messages are produced while a pipeline is imported and rendered in the
//! caller's language at the HTTP boundary. Emission order is significant.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMessage {
    pub id: MessageId,
    pub level: MessageLevel,
    /// Positional arguments substituted into the catalog entry
    pub args: Vec<String>,
}

impl ImportMessage {
    pub fn info(id: MessageId, args: Vec<String>) -> Self {
        Self {
            id,
            level: MessageLevel::Info,
            args,
        }
    }

    pub fn warning(id: MessageId, args: Vec<String>) -> Self {
        Self {
            id,
            level: MessageLevel::Warning,
            args,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Catalog key of an import message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageId {
    /// args: pipeline
    PipelineCreated,
    /// args: pipeline
    PipelineUpdated,
    /// args: document name, target name
    PipelineNameOverridden,
    /// args: stage, pipeline
    StageAdded,
    /// args: stage, pipeline
    StageUpdated,
    /// args: stage, pipeline
    StageDeleted,
    /// args: job, stage
    JobAdded,
    /// args: parameter, pipeline
    ParameterAdded,
    /// args: parameter, pipeline
    ParameterDeleted,
}
