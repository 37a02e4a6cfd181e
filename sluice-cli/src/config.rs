//! Configuration module
//!
//! Handles CLI configuration: where the API lives, how to authenticate and
//! how long remote pipeline sources may take.

use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the Sluice API
    pub url: String,

    /// API token sent as a bearer token
    pub token: Option<String>,

    /// Deadline for reading remote pipeline sources
    pub fetch_timeout: Duration,
}
