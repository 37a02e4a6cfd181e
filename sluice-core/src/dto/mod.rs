//! Data Transfer Objects for inter-service communication
//!
//! DTOs exchanged between the API server and its clients.

pub mod pipeline;
