//! Sluice HTTP Client
//!
//! A simple, type-safe HTTP client for the Sluice pipeline import API.
//!
//! # Example
//!
//! ```no_run
//! use sluice_client::SluiceClient;
//! use sluice_core::export::Format;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = SluiceClient::new("http://localhost:8080").with_token("secret");
//!
//!     let doc = b"name: build\nstages: [compile]\n".to_vec();
//!     let messages = client.import_pipeline("PRJ", doc, Format::Yaml, false).await?;
//!
//!     for message in messages {
//!         println!("{message}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod pipelines;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

/// HTTP client for the Sluice API
#[derive(Debug, Clone)]
pub struct SluiceClient {
    /// Base URL of the API (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Bearer token sent with every request
    token: Option<String>,
}

impl SluiceClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use sluice_client::SluiceClient;
    ///
    /// let client = SluiceClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token: None,
        }
    }

    /// Authenticate requests with an API token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid base URL: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidRequest("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    /// Attach the bearer token when one is configured
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Handle an API response and return the raw body
    async fn handle_bytes(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        let response = self.check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ClientError::rejected(status, error_messages(&body)))
    }
}

/// Extract the human-readable part of an error body
///
/// The API answers `{"error": ...}` for most failures and a list of
/// messages for rejected imports.
fn error_messages(body: &str) -> Vec<String> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("error").and_then(|e| e.as_str()) {
            Some(message) => vec![message.to_string()],
            None => vec![body.to_string()],
        },
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|m| m.as_str())
            .map(str::to_string)
            .collect(),
        _ => vec![body.to_string()],
    }
}
