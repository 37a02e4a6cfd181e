//! Service Module
//!
//! Business logic layer for the API server.
//! Services orchestrate between the store and the core export entities.

pub mod import;
pub mod pipeline;
pub mod project;

// Re-export for convenience
pub use import as import_service;
pub use pipeline as pipeline_service;
pub use project as project_service;
