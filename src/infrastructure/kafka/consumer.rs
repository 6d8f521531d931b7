use std::time::Duration;

use log::{error, info};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::Message;
use tokio::sync::watch;

use crate::application::event_transformer::OrderEventTransformer;
use crate::config::KafkaSettings;
use crate::domain::events::ORDER_EVENTS_TOPIC;
use crate::domain::ports::{EventPublisher, OrderLookup};

const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Subscription to the raw order events topic within the transformer's
/// consumer group. Starts from the latest offset; history is not replayed.
pub struct KafkaEventConsumer {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaEventConsumer {
    pub fn new(settings: &KafkaSettings) -> KafkaResult<Self> {
        let consumer: StreamConsumer = client_config(settings).create()?;

        Ok(Self {
            consumer,
            topic: ORDER_EVENTS_TOPIC.to_string(),
        })
    }

    /// Hands messages to `transformer` one at a time, in delivery order, until
    /// `shutdown` flips. A failing message never ends the loop.
    pub async fn run<L, P>(
        self,
        transformer: OrderEventTransformer<L, P>,
        mut shutdown: watch::Receiver<bool>,
    ) -> KafkaResult<()>
    where
        L: OrderLookup,
        P: EventPublisher,
    {
        self.consumer.subscribe(&[self.topic.as_str()])?;
        info!("Subscribed to {} topic", self.topic);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = self.consumer.recv() => {
                    let message = match received {
                        Ok(message) => message.detach(),
                        Err(e) => {
                            error!("Kafka consumer error on {}: {}", self.topic, e);
                            tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                            continue;
                        }
                    };
                    transformer
                        .handle_message(
                            message.topic(),
                            message.partition(),
                            message.key(),
                            message.payload(),
                        )
                        .await;
                    // Stored offsets are the next one to read; the auto-commit
                    // timer only ever commits messages that were handled.
                    if let Err(e) = self.consumer.store_offset(
                        message.topic(),
                        message.partition(),
                        message.offset() + 1,
                    ) {
                        error!(
                            "Failed to store offset {} for {}-{}: {}",
                            message.offset(),
                            message.topic(),
                            message.partition(),
                            e
                        );
                    }
                }
            }
        }

        self.consumer.unsubscribe();
        info!("Kafka consumer disconnected");
        Ok(())
    }
}

/// Offsets are committed periodically but stored by hand after each message
/// is handled, so a crash mid-message replays it instead of skipping it.
fn client_config(settings: &KafkaSettings) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", settings.brokers.join(","))
        .set("client.id", &settings.client_id)
        .set("group.id", &settings.consumer_group)
        .set("auto.offset.reset", "latest")
        .set("enable.auto.commit", "true")
        .set("enable.auto.offset.store", "false")
        .set("session.timeout.ms", "30000")
        .set("heartbeat.interval.ms", "3000");
    config
}
