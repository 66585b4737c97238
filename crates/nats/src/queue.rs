//! Stream and consumer provisioning, fetching, and publishing.

use async_nats::jetstream::{
    self,
    consumer::{pull, AckPolicy, PullConsumer},
    stream::{RetentionPolicy, StorageType},
    AckKind,
};
use async_trait::async_trait;
use facto_core::{EventQueue, QueueError, QueueMessage};
use facto_types::Event;
use futures::StreamExt;
use std::time::Duration;
use tracing::{info, warn};

/// Connection and consumer settings for the event stream.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Broker URL, e.g. `nats://127.0.0.1:4222`.
    pub url: String,

    /// Stream name.
    pub stream_name: String,

    /// Subjects bound to the stream.
    pub subjects: Vec<String>,

    /// Subject filter for the durable consumer.
    pub filter_subject: String,

    /// Durable consumer name; the only identity shared across restarts.
    pub durable_name: String,

    /// How long the broker waits for an ack before redelivering. Must
    /// exceed the worst-case batch latency.
    pub ack_wait: Duration,

    /// Cap on unacknowledged deliveries in flight.
    pub max_ack_pending: i64,

    /// Delete and recreate the durable consumer on startup.
    pub reset_consumer: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            stream_name: "FACTO_EVENTS".to_string(),
            subjects: vec!["facto.events.>".to_string()],
            filter_subject: "facto.events.>".to_string(),
            durable_name: "processor".to_string(),
            ack_wait: Duration::from_secs(30),
            max_ack_pending: 2000,
            reset_consumer: false,
        }
    }
}

/// Pull-based durable consumer over the event stream.
pub struct JetStreamQueue {
    consumer: PullConsumer,
}

impl JetStreamQueue {
    /// Connect to the broker and ensure the stream and durable consumer
    /// exist, creating either on absence.
    pub async fn connect(config: QueueConfig) -> Result<Self, QueueError> {
        let client = async_nats::connect(&config.url)
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;
        let context = jetstream::new(client);

        let stream = context
            .get_or_create_stream(jetstream::stream::Config {
                name: config.stream_name.clone(),
                subjects: config.subjects.clone(),
                retention: RetentionPolicy::WorkQueue,
                storage: StorageType::File,
                ..Default::default()
            })
            .await
            .map_err(|e| QueueError::Stream(e.to_string()))?;

        if config.reset_consumer {
            // Ignore absence; the goal is a clean slate.
            if stream.delete_consumer(&config.durable_name).await.is_ok() {
                info!(durable = %config.durable_name, "deleted existing consumer");
            }
        }

        let consumer = stream
            .get_or_create_consumer(
                &config.durable_name,
                pull::Config {
                    durable_name: Some(config.durable_name.clone()),
                    ack_policy: AckPolicy::Explicit,
                    filter_subject: config.filter_subject.clone(),
                    ack_wait: config.ack_wait,
                    max_ack_pending: config.max_ack_pending,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| QueueError::Consumer(e.to_string()))?;

        info!(
            stream = %config.stream_name,
            durable = %config.durable_name,
            filter = %config.filter_subject,
            "work queue ready"
        );

        Ok(Self { consumer })
    }
}

#[async_trait]
impl EventQueue for JetStreamQueue {
    type Message = JetStreamMessage;

    async fn fetch(
        &self,
        max_messages: usize,
        max_wait: Duration,
    ) -> Result<Vec<Self::Message>, QueueError> {
        let mut batch = self
            .consumer
            .fetch()
            .max_messages(max_messages)
            .expires(max_wait)
            .messages()
            .await
            .map_err(|e| QueueError::Fetch(e.to_string()))?;

        let mut messages = Vec::new();
        while let Some(next) = batch.next().await {
            match next {
                Ok(message) => messages.push(JetStreamMessage(message)),
                Err(e) => {
                    // A partial batch is still usable; the rest redelivers.
                    warn!(error = %e, "error mid-fetch; returning partial batch");
                    break;
                }
            }
        }
        Ok(messages)
    }
}

/// One delivered JetStream message.
pub struct JetStreamMessage(jetstream::Message);

#[async_trait]
impl QueueMessage for JetStreamMessage {
    fn payload(&self) -> &[u8] {
        &self.0.payload
    }

    async fn ack(&self) -> Result<(), QueueError> {
        self.0
            .ack()
            .await
            .map_err(|e| QueueError::Ack(e.to_string()))
    }

    async fn nak(&self) -> Result<(), QueueError> {
        self.0
            .ack_with(AckKind::Nak(None))
            .await
            .map_err(|e| QueueError::Ack(e.to_string()))
    }
}

/// Producer-side publisher onto the event stream.
pub struct EventPublisher {
    context: jetstream::Context,
    subject_prefix: String,
}

impl EventPublisher {
    /// Connect a publisher. `subject_prefix` is joined with the agent id,
    /// e.g. `facto.events` -> `facto.events.<agent_id>`.
    pub async fn connect(url: &str, subject_prefix: &str) -> Result<Self, QueueError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;
        Ok(Self {
            context: jetstream::new(client),
            subject_prefix: subject_prefix.trim_end_matches('.').to_string(),
        })
    }

    /// Publish one signed event and wait for the stream's ack.
    pub async fn publish(&self, event: &Event) -> Result<(), QueueError> {
        let subject = format!("{}.{}", self.subject_prefix, event.agent_id);
        let payload =
            serde_json::to_vec(event).map_err(|e| QueueError::Publish(e.to_string()))?;

        self.context
            .publish(subject, payload.into())
            .await
            .map_err(|e| QueueError::Publish(e.to_string()))?
            .await
            .map_err(|e| QueueError::Publish(e.to_string()))?;
        Ok(())
    }
}
