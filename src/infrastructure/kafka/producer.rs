use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::try_join_all;
use log::{error, info};
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use serde_json::Value;

use super::retry::{retry_with_backoff, RetryPolicy};
use crate::config::KafkaSettings;
use crate::domain::errors::PublishError;
use crate::domain::ports::{EventPublisher, OutboundMessage};

pub const EVENT_TIME_HEADER: &str = "event-time";

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// One long-lived Kafka producer shared by the relay and the transformer.
pub struct KafkaEventProducer {
    producer: FutureProducer,
    retry: RetryPolicy,
}

impl KafkaEventProducer {
    /// Creates the producer and waits until the cluster answers a metadata
    /// request, retrying with backoff.
    pub async fn connect(settings: &KafkaSettings, retry: RetryPolicy) -> Result<Self, PublishError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", settings.brokers.join(","))
            .set("client.id", &settings.client_id)
            .set("message.timeout.ms", DELIVERY_TIMEOUT.as_millis().to_string())
            .create()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        retry_with_backoff(
            || probe(producer.clone()),
            &retry,
            "Kafka producer connect",
        )
        .await?;
        info!(
            "Kafka producer connected to {}",
            settings.brokers.join(",")
        );

        Ok(Self { producer, retry })
    }

    async fn send_once(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PublishError> {
        let event_time = Utc::now().to_rfc3339();
        let record = FutureRecord::to(topic)
            .key(key)
            .payload(payload)
            .headers(OwnedHeaders::new().insert(Header {
                key: EVENT_TIME_HEADER,
                value: Some(event_time.as_str()),
            }));

        self.producer
            .send(record, Timeout::After(DELIVERY_TIMEOUT))
            .await
            .map(|_| ())
            .map_err(|(e, _)| PublishError::Transport(e.to_string()))
    }

    /// Flushes anything still queued. Call once at shutdown.
    pub fn close(&self) {
        match self.producer.flush(Timeout::After(FLUSH_TIMEOUT)) {
            Ok(()) => info!("Kafka producer disconnected"),
            Err(e) => error!("Failed to flush Kafka producer: {}", e),
        }
    }
}

async fn probe(producer: FutureProducer) -> Result<(), PublishError> {
    tokio::task::spawn_blocking(move || {
        producer
            .client()
            .fetch_metadata(None, METADATA_TIMEOUT)
            .map(|_| ())
    })
    .await
    .map_err(|e| PublishError::Transport(e.to_string()))?
    .map_err(|e| PublishError::Transport(e.to_string()))
}

#[async_trait]
impl EventPublisher for KafkaEventProducer {
    async fn send(&self, topic: &str, key: &str, value: &Value) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(value)?;
        let context = format!("Send to topic {topic} with key {key}");

        if let Err(e) = retry_with_backoff(
            || self.send_once(topic, key, &payload),
            &self.retry,
            &context,
        )
        .await
        {
            error!("Failed to send message to topic {}: {}", topic, e);
            return Err(e);
        }

        info!("Message sent to topic {} with key {}", topic, key);
        Ok(())
    }

    async fn send_batch(
        &self,
        topic: &str,
        messages: &[OutboundMessage],
    ) -> Result<(), PublishError> {
        let payloads = messages
            .iter()
            .map(|m| serde_json::to_vec(&m.value).map(|bytes| (m.key.as_str(), bytes)))
            .collect::<Result<Vec<_>, _>>()?;

        // Each message is delivered on its own; a failure does not recall the
        // ones that already landed.
        let sends = payloads
            .iter()
            .map(|(key, bytes)| self.send_once(topic, key, bytes));
        if let Err(e) = try_join_all(sends).await {
            error!("Failed to send batch to topic {}: {}", topic, e);
            return Err(e);
        }

        info!("Batch sent to topic {}, {} messages", topic, messages.len());
        Ok(())
    }
}
