//! Sluice Core
//!
//! Core types and abstractions for the Sluice pipeline import service.
//!
//! This crate contains:
//! - Domain types: Core business entities (Pipeline, Project, Consumer, ...)
//! - DTOs: Data transfer objects exchanged with the API
//! - Export: the declarative pipeline format, its codec and source opener

pub mod domain;
pub mod dto;
pub mod export;
