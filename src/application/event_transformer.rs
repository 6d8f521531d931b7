use std::sync::Arc;

use bigdecimal::ToPrimitive;
use chrono::Utc;
use log::{error, info, warn};
use serde_json::Value;
use uuid::Uuid;

use super::run_blocking;
use crate::domain::errors::{PublishError, TransformError};
use crate::domain::events::{
    AnalyticsEvent, AnalyticsEventType, OrderCreated, OrderDeleted, OrderEvent,
    DEFAULT_PAYMENT_METHOD, DEFAULT_PAYMENT_STATUS, ORDERS_ANALYTICS_TOPIC, UNKNOWN_USER_EMAIL,
};
use crate::domain::ports::{EventPublisher, OrderLookup};

/// What happened to one consumed message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    Published(AnalyticsEvent),
    /// Unknown event kind; dropped on purpose.
    Ignored,
    /// Logged and discarded. There is no dead-letter topic.
    Failed,
}

/// Turns raw hybrid order events into enriched analytics events by joining
/// against the relational store, then republishes them.
pub struct OrderEventTransformer<L, P> {
    lookup: Arc<L>,
    publisher: Arc<P>,
    analytics_topic: String,
}

impl<L: OrderLookup, P: EventPublisher> OrderEventTransformer<L, P> {
    pub fn new(lookup: Arc<L>, publisher: Arc<P>) -> Self {
        Self {
            lookup,
            publisher,
            analytics_topic: ORDERS_ANALYTICS_TOPIC.to_string(),
        }
    }

    /// Per-message boundary: every failure is logged with its topic and
    /// partition and swallowed so the subscription keeps going.
    pub async fn handle_message(
        &self,
        topic: &str,
        partition: i32,
        key: Option<&[u8]>,
        payload: Option<&[u8]>,
    ) -> MessageOutcome {
        let key = key.map(String::from_utf8_lossy).unwrap_or_default();
        info!("Received message from {}-{} | Key: {}", topic, partition, key);

        match self.process(payload).await {
            Ok(Some(event)) => MessageOutcome::Published(event),
            Ok(None) => MessageOutcome::Ignored,
            Err(e) => {
                error!(
                    "Failed to process message from {}-{} (key {}): {}",
                    topic, partition, key, e
                );
                MessageOutcome::Failed
            }
        }
    }

    async fn process(&self, payload: Option<&[u8]>) -> Result<Option<AnalyticsEvent>, TransformError> {
        let bytes = payload.ok_or_else(|| TransformError::Malformed("empty payload".to_string()))?;
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| TransformError::Malformed(e.to_string()))?;
        let Some(event_type) = value.get("eventType").and_then(Value::as_str) else {
            warn!("Message without an eventType discriminator, dropping it");
            return Ok(None);
        };
        let event_type = event_type.to_string();
        let event: OrderEvent =
            serde_json::from_value(value).map_err(|e| TransformError::Malformed(e.to_string()))?;

        let analytics = match event {
            OrderEvent::OrderCreated(created) => self.transform_created(created).await?,
            OrderEvent::OrderDeleted(deleted) => self.transform_deleted(deleted).await?,
            OrderEvent::Unknown => {
                warn!("Unknown event type: {}", event_type);
                return Ok(None);
            }
        };

        let value = serde_json::to_value(&analytics).map_err(PublishError::from)?;
        self.publisher
            .send(&self.analytics_topic, &analytics.order_id, &value)
            .await?;

        info!(
            "Transformed {} event | Order: {} | User: {} | Items: {}",
            event_type, analytics.order_id, analytics.user_email, analytics.items_count
        );
        Ok(Some(analytics))
    }

    async fn transform_created(&self, event: OrderCreated) -> Result<AnalyticsEvent, TransformError> {
        if event.order_id.is_empty() {
            return Err(TransformError::MissingField("orderId"));
        }
        if event.user_id.is_empty() {
            return Err(TransformError::MissingField("userId"));
        }
        let user_id = parse_id("userId", &event.user_id)?;
        let user_email = self.resolve_email(user_id).await?;

        let created_at = event.created_at.unwrap_or_else(Utc::now);

        Ok(AnalyticsEvent {
            order_id: event.order_id,
            user_id: event.user_id,
            user_email,
            order_date: created_at.timestamp(),
            total_amount: event.total_amount,
            items_count: event.items_count,
            status: event.status,
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
            payment_status: DEFAULT_PAYMENT_STATUS.to_string(),
            version: created_at.timestamp_millis(),
            event_type: AnalyticsEventType::Created,
            is_deleted: 0,
            deleted_at: None,
        })
    }

    async fn transform_deleted(&self, event: OrderDeleted) -> Result<AnalyticsEvent, TransformError> {
        if event.order_id.is_empty() {
            return Err(TransformError::MissingField("orderId"));
        }
        let order_id = parse_id("orderId", &event.order_id)?;

        let lookup = Arc::clone(&self.lookup);
        let order = run_blocking(move || lookup.order(order_id))
            .await?
            .ok_or(TransformError::OrderNotFound(order_id))?;

        let user_email = self.resolve_email(order.user_id).await?;
        let lookup = Arc::clone(&self.lookup);
        let items_count = run_blocking(move || lookup.count_items(order_id)).await?;

        let deleted_at = event
            .deleted_at
            .or(order.deleted_at)
            .unwrap_or_else(Utc::now);

        Ok(AnalyticsEvent {
            order_id: event.order_id,
            user_id: order.user_id.to_string(),
            user_email,
            order_date: order.created_at.timestamp(),
            total_amount: order.total_amount.to_f64().unwrap_or_default(),
            items_count,
            status: order.status,
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
            payment_status: DEFAULT_PAYMENT_STATUS.to_string(),
            version: event.version,
            event_type: AnalyticsEventType::Deleted,
            is_deleted: 1,
            deleted_at: Some(deleted_at.timestamp()),
        })
    }

    async fn resolve_email(&self, user_id: Uuid) -> Result<String, TransformError> {
        let lookup = Arc::clone(&self.lookup);
        let email = run_blocking(move || lookup.user_email(user_id)).await?;
        Ok(email.unwrap_or_else(|| {
            warn!("User {} not found, recording email as {}", user_id, UNKNOWN_USER_EMAIL);
            UNKNOWN_USER_EMAIL.to_string()
        }))
    }
}

fn parse_id(field: &'static str, value: &str) -> Result<Uuid, TransformError> {
    Uuid::parse_str(value).map_err(|_| TransformError::InvalidIdentifier {
        field,
        value: value.to_string(),
    })
}
