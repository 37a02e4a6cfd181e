//! Pipeline command handlers
//!
//! Handles all pipeline-related CLI commands: previewing, importing and
//! replacing documents, listing, viewing and exporting stored pipelines.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use sluice_client::SluiceClient;
use sluice_core::domain::pipeline::{ActionKind, Pipeline};
use sluice_core::dto::pipeline::PipelineSummary;
use sluice_core::export::{Format, Opener};

use super::source;
use crate::config::Config;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Show how a pipeline document would be imported, without storing it
    Preview {
        /// Local path or http(s) URL of the pipeline document
        source: String,

        /// Document format (json, yaml, yml); inferred from the source otherwise
        #[arg(short, long)]
        format: Option<String>,
    },
    /// Import a pipeline document into a project
    Import {
        /// Project key
        project: String,

        /// Local path or http(s) URL of the pipeline document
        source: String,

        /// Document format (json, yaml, yml); inferred from the source otherwise
        #[arg(short, long)]
        format: Option<String>,

        /// Overwrite an existing pipeline of the same name
        #[arg(long)]
        force: bool,
    },
    /// Overwrite a named pipeline with a document
    Replace {
        /// Project key
        project: String,

        /// Pipeline name; takes precedence over the name in the document
        name: String,

        /// Local path or http(s) URL of the pipeline document
        source: String,

        /// Document format (json, yaml, yml); inferred from the source otherwise
        #[arg(short, long)]
        format: Option<String>,
    },
    /// List the pipelines of a project
    List {
        /// Project key
        project: String,
    },
    /// Get pipeline details
    Get {
        /// Project key
        project: String,

        /// Pipeline name
        name: String,
    },
    /// Export a pipeline as a declarative document
    Export {
        /// Project key
        project: String,

        /// Pipeline name
        name: String,

        /// Output format (json, yaml, yml)
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Handle pipeline commands
///
/// Routes pipeline subcommands to their respective handlers.
pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let mut client = SluiceClient::new(&config.url);
    if let Some(token) = &config.token {
        client = client.with_token(token);
    }

    match command {
        PipelineCommands::Preview { source, format } => {
            let opener = opener(config)?;
            preview_pipeline(&client, &opener, &source, format.as_deref()).await
        }
        PipelineCommands::Import {
            project,
            source,
            format,
            force,
        } => {
            let opener = opener(config)?;
            import_pipeline(&client, &opener, &project, &source, format.as_deref(), force).await
        }
        PipelineCommands::Replace {
            project,
            name,
            source,
            format,
        } => {
            let opener = opener(config)?;
            replace_pipeline(&client, &opener, &project, &name, &source, format.as_deref()).await
        }
        PipelineCommands::List { project } => list_pipelines(&client, &project).await,
        PipelineCommands::Get { project, name } => get_pipeline(&client, &project, &name).await,
        PipelineCommands::Export {
            project,
            name,
            format,
            output,
        } => export_pipeline(&client, &project, &name, &format, output.as_deref()).await,
    }
}

fn opener(config: &Config) -> Result<Opener> {
    Opener::with_timeout(config.fetch_timeout).context("Failed to create HTTP client")
}

/// Preview a pipeline document
async fn preview_pipeline(
    client: &SluiceClient,
    opener: &Opener,
    source: &str,
    format: Option<&str>,
) -> Result<()> {
    let (bytes, format) = source::load(opener, source, format).await?;
    let pipeline = client.preview_pipeline(bytes, format).await?;

    print_pipeline_details(&pipeline);

    Ok(())
}

/// Import a pipeline document
async fn import_pipeline(
    client: &SluiceClient,
    opener: &Opener,
    project: &str,
    source: &str,
    format: Option<&str>,
    force: bool,
) -> Result<()> {
    let (bytes, format) = source::load(opener, source, format).await?;

    let messages = match client.import_pipeline(project, bytes, format, force).await {
        Ok(messages) => messages,
        Err(e) if e.is_conflict() => {
            anyhow::bail!("{}\nUse --force to overwrite it.", e);
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", "✓ Pipeline imported successfully!".green().bold());
    print_messages(&messages);

    Ok(())
}

/// Replace a named pipeline
async fn replace_pipeline(
    client: &SluiceClient,
    opener: &Opener,
    project: &str,
    name: &str,
    source: &str,
    format: Option<&str>,
) -> Result<()> {
    let (bytes, format) = source::load(opener, source, format).await?;
    let messages = client.replace_pipeline(project, name, bytes, format).await?;

    println!(
        "{}",
        format!("✓ Pipeline {} replaced successfully!", name)
            .green()
            .bold()
    );
    print_messages(&messages);

    Ok(())
}

/// List the pipelines of a project
async fn list_pipelines(client: &SluiceClient, project: &str) -> Result<()> {
    let pipelines = client.list_pipelines(project).await?;

    if pipelines.is_empty() {
        println!("{}", "No pipelines found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} pipeline(s):", pipelines.len()).bold()
        );
        println!();
        for pipeline in pipelines {
            print_pipeline_summary(&pipeline);
        }
    }

    Ok(())
}

/// Get and display a single pipeline
async fn get_pipeline(client: &SluiceClient, project: &str, name: &str) -> Result<()> {
    let pipeline = client.get_pipeline(project, name).await?;

    print_pipeline_details(&pipeline);

    Ok(())
}

/// Export a pipeline to stdout or a file
async fn export_pipeline(
    client: &SluiceClient,
    project: &str,
    name: &str,
    format: &str,
    output: Option<&str>,
) -> Result<()> {
    let format = Format::from_path(format).with_context(|| format!("Unknown format: {}", format))?;
    let bytes = client.export_pipeline(project, name, format).await?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path))?;
            println!(
                "{}",
                format!("✓ Pipeline {} exported to {}", name, path)
                    .green()
                    .bold()
            );
        }
        None => print!("{}", String::from_utf8_lossy(&bytes)),
    }

    Ok(())
}

fn print_messages(messages: &[String]) {
    for message in messages {
        println!("  {} {}", "•".cyan(), message);
    }
}

/// Print a pipeline summary
fn print_pipeline_summary(pipeline: &PipelineSummary) {
    println!("  {} {}", "▸".cyan(), pipeline.name.bold());
    println!(
        "    Stages:  {}  Jobs: {}",
        pipeline.stage_count.to_string().dimmed(),
        pipeline.job_count.to_string().dimmed()
    );
    println!(
        "    Updated: {}",
        pipeline
            .updated_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(user) = &pipeline.last_modified_by {
        println!("    By:      {}", user.dimmed());
    }
    if let Some(desc) = &pipeline.description {
        println!("    Description: {}", desc.dimmed());
    }
    println!();
}

/// Print detailed pipeline information
fn print_pipeline_details(pipeline: &Pipeline) {
    println!("{}", "Pipeline Details:".bold());
    println!("  Name:        {}", pipeline.name.bold());
    if pipeline.is_persisted() {
        println!("  ID:          {}", pipeline.id.to_string().cyan());
        println!(
            "  Updated:     {}",
            pipeline.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    if let Some(desc) = &pipeline.description {
        println!("  Description: {}", desc);
    }

    if !pipeline.parameters.is_empty() {
        println!("\n{}", "Parameters:".bold());
        for param in &pipeline.parameters {
            let value = if param.value.is_empty() {
                String::new()
            } else {
                format!(" = {}", param.value)
            };
            println!(
                "    - {}: {:?}{}",
                param.name.cyan(),
                param.param_type,
                value.dimmed()
            );
        }
    }

    println!("\n{}", "Stages:".bold());
    for stage in &pipeline.stages {
        let state = if stage.enabled { "" } else { " (disabled)" };
        println!(
            "  {}. {}{}",
            stage.build_order,
            stage.name.bold(),
            state.yellow()
        );
        for job in &stage.jobs {
            println!("     {} {}", "▸".cyan(), job.name);
            for step in &job.steps {
                let detail = match &step.kind {
                    ActionKind::Script { lines } => format!("script, {} line(s)", lines.len()),
                    ActionKind::Builtin { action, .. } => format!("action {}", action),
                };
                println!("       - {} {}", step.name, format!("({})", detail).dimmed());
            }
        }
    }
}
