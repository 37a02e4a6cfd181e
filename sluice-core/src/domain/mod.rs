//! Core domain types
//!
//! This module contains the core domain structures shared by the API server
//! (for persistence) and the client tooling (for display).

pub mod consumer;
pub mod message;
pub mod pipeline;
pub mod project;
