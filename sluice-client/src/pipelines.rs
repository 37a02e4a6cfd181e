//! Pipeline-related API endpoints

use crate::SluiceClient;
use crate::error::{ClientError, Result};
use sluice_core::domain::pipeline::Pipeline;
use sluice_core::dto::pipeline::PipelineSummary;
use sluice_core::export::Format;

impl SluiceClient {
    // =============================================================================
    // Import
    // =============================================================================

    /// Convert a pipeline document without storing it
    pub async fn preview_pipeline(&self, body: Vec<u8>, format: Format) -> Result<Pipeline> {
        let url = self.endpoint(&["pipeline", "preview"])?;
        let request = self
            .client
            .post(url)
            .query(&[("format", format_tag(format)?)])
            .body(body);
        let response = self.authorize(request).send().await?;

        self.handle_response(response).await
    }

    /// Import a pipeline document into a project
    ///
    /// # Arguments
    /// * `project` - The project key
    /// * `body` - The pipeline document
    /// * `format` - Format of `body`
    /// * `force` - Overwrite an existing pipeline of the same name
    ///
    /// # Returns
    /// The messages describing what changed
    ///
    /// # Example
    /// ```no_run
    /// # use sluice_client::SluiceClient;
    /// # use sluice_core::export::Format;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = SluiceClient::new("http://localhost:8080").with_token("secret");
    /// let doc = br#"{"name": "build", "stages": ["compile"]}"#.to_vec();
    /// match client.import_pipeline("PRJ", doc, Format::Json, false).await {
    ///     Err(e) if e.is_conflict() => println!("already there"),
    ///     other => { other?; }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn import_pipeline(
        &self,
        project: &str,
        body: Vec<u8>,
        format: Format,
        force: bool,
    ) -> Result<Vec<String>> {
        let url = self.endpoint(&["project", project, "pipeline", "import"])?;
        let force = if force { "true" } else { "false" };
        let request = self
            .client
            .post(url)
            .query(&[("format", format_tag(format)?), ("force", force)])
            .body(body);

        tracing::debug!("Importing pipeline into project {}", project);
        let response = self.authorize(request).send().await?;

        self.handle_response(response).await
    }

    /// Overwrite the named pipeline with a document
    ///
    /// The pipeline takes `name` whatever name the document declares.
    pub async fn replace_pipeline(
        &self,
        project: &str,
        name: &str,
        body: Vec<u8>,
        format: Format,
    ) -> Result<Vec<String>> {
        let url = self.endpoint(&["project", project, "pipeline", name, "import"])?;
        let request = self
            .client
            .put(url)
            .query(&[("format", format_tag(format)?)])
            .body(body);

        tracing::debug!("Replacing pipeline {} in project {}", name, project);
        let response = self.authorize(request).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Read Access
    // =============================================================================

    /// List the pipelines of a project
    pub async fn list_pipelines(&self, project: &str) -> Result<Vec<PipelineSummary>> {
        let url = self.endpoint(&["project", project, "pipeline"])?;
        let response = self.authorize(self.client.get(url)).send().await?;

        self.handle_response(response).await
    }

    /// Get a pipeline by name
    pub async fn get_pipeline(&self, project: &str, name: &str) -> Result<Pipeline> {
        let url = self.endpoint(&["project", project, "pipeline", name])?;
        let response = self.authorize(self.client.get(url)).send().await?;

        self.handle_response(response).await
    }

    /// Export a pipeline as a declarative document
    pub async fn export_pipeline(
        &self,
        project: &str,
        name: &str,
        format: Format,
    ) -> Result<Vec<u8>> {
        let url = self.endpoint(&["project", project, "pipeline", name, "export"])?;
        let request = self
            .client
            .get(url)
            .query(&[("format", format_tag(format)?)]);
        let response = self.authorize(request).send().await?;

        self.handle_bytes(response).await
    }
}

fn format_tag(format: Format) -> Result<&'static str> {
    format
        .as_str()
        .map_err(|e| ClientError::InvalidRequest(e.to_string()))
}
