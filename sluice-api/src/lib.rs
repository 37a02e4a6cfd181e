//! Sluice API
//!
//! HTTP service that imports declarative pipeline documents into projects.

pub mod api;
pub mod config;
pub mod db;
pub mod event;
pub mod i18n;
pub mod repository;
pub mod service;
pub mod state;
