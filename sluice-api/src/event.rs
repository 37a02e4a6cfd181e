//! Event Module
//!
//! Notifications emitted after a pipeline change has been committed.
//! Publishers fan events out over a tokio broadcast channel; any number of
//! listeners may subscribe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sluice_core::domain::consumer::Consumer;
use sluice_core::domain::pipeline::Pipeline;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A pipeline was created or overwritten by an import
    PipelineAdd {
        project_key: String,
        pipeline: Pipeline,
        consumer: Consumer,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn pipeline_add(project_key: &str, pipeline: &Pipeline, consumer: &Consumer) -> Self {
        Event::PipelineAdd {
            project_key: project_key.to_string(),
            pipeline: pipeline.clone(),
            consumer: consumer.clone(),
            timestamp: Utc::now(),
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::PipelineAdd {
                project_key,
                pipeline,
                consumer,
                ..
            } => write!(
                f,
                "PipelineAdd({}/{} by {})",
                project_key, pipeline.name, consumer.username
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("no subscriber is listening for events")]
    NoSubscribers,
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: Event) -> Result<(), EventError>;
}

/// Publisher backed by a tokio broadcast channel
#[derive(Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<Event>,
}

impl BroadcastPublisher {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, event: Event) -> Result<(), EventError> {
        tracing::debug!(
            "Publishing {} to {} subscribers",
            event,
            self.sender.receiver_count()
        );
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|_| EventError::NoSubscribers)
    }
}

/// Logs every event published on `receiver` until the channel closes
pub fn spawn_event_logger(mut receiver: broadcast::Receiver<Event>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => tracing::info!("Event: {}", event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event logger lagged by {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn consumer() -> Consumer {
        Consumer {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            groups: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let publisher = BroadcastPublisher::new(8);
        let mut receiver = publisher.subscribe();

        publisher
            .publish(Event::pipeline_add("PRJ", &Pipeline::new("build"), &consumer()))
            .await
            .unwrap();

        let Event::PipelineAdd {
            project_key,
            pipeline,
            ..
        } = receiver.recv().await.unwrap();
        assert_eq!(project_key, "PRJ");
        assert_eq!(pipeline.name, "build");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let publisher = BroadcastPublisher::new(8);
        let err = publisher
            .publish(Event::pipeline_add("PRJ", &Pipeline::new("build"), &consumer()))
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::NoSubscribers));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = Event::pipeline_add("PRJ", &Pipeline::new("build"), &consumer());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "pipeline_add");
        assert_eq!(value["project_key"], "PRJ");
        assert_eq!(event.to_string(), "PipelineAdd(PRJ/build by alice)");
    }
}
