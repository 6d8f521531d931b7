//! Broker payloads.
//!
//! Raw order events travel on [`ORDER_EVENTS_TOPIC`] as "hybrid" payloads: they
//! carry only the fields that change over an order's lifetime, and the
//! transformer joins the rest back in from the relational store before
//! publishing an [`AnalyticsEvent`] on [`ORDERS_ANALYTICS_TOPIC`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::OrderStatus;
use super::outbox::NewOutboxMessage;

pub const ORDER_AGGREGATE_TYPE: &str = "Order";
pub const ORDER_EVENTS_TOPIC: &str = "order.events";
pub const ORDERS_ANALYTICS_TOPIC: &str = "orders_analytics";

/// Email recorded when the owning user can no longer be resolved.
pub const UNKNOWN_USER_EMAIL: &str = "UNKNOWN";
pub const DEFAULT_PAYMENT_METHOD: &str = "UNKNOWN";
pub const DEFAULT_PAYMENT_STATUS: &str = "PENDING";

/// An event that is written to the outbox alongside a domain mutation.
pub trait OutboxEvent: Serialize {
    const AGGREGATE_TYPE: &'static str;
    const EVENT_TYPE: &'static str;

    fn aggregate_id(&self) -> String;

    /// The stored payload excludes `eventType`; the relay merges it back in.
    fn to_outbox_message(&self) -> Result<NewOutboxMessage, serde_json::Error> {
        Ok(NewOutboxMessage {
            aggregate_id: self.aggregate_id(),
            aggregate_type: Self::AGGREGATE_TYPE.to_string(),
            event_type: Self::EVENT_TYPE.to_string(),
            payload: serde_json::to_value(self)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub items_count: i64,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl OutboxEvent for OrderCreated {
    const AGGREGATE_TYPE: &'static str = ORDER_AGGREGATE_TYPE;
    const EVENT_TYPE: &'static str = "OrderCreated";

    fn aggregate_id(&self) -> String {
        self.order_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDeleted {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_by: String,
    /// Epoch milliseconds minted when the deletion was committed.
    #[serde(default)]
    pub version: i64,
}

impl OutboxEvent for OrderDeleted {
    const AGGREGATE_TYPE: &'static str = ORDER_AGGREGATE_TYPE;
    const EVENT_TYPE: &'static str = "OrderDeleted";

    fn aggregate_id(&self) -> String {
        self.order_id.clone()
    }
}

/// A raw message on the order events topic, discriminated by `eventType`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "eventType")]
pub enum OrderEvent {
    OrderCreated(OrderCreated),
    OrderDeleted(OrderDeleted),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalyticsEventType {
    Created,
    Deleted,
}

/// Enriched, denormalised order row for the analytical sink. The sink keeps
/// the row with the highest `version` per `order_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub order_id: String,
    pub user_id: String,
    pub user_email: String,
    /// Seconds since epoch.
    pub order_date: i64,
    pub total_amount: f64,
    pub items_count: i64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub payment_status: String,
    pub version: i64,
    pub event_type: AnalyticsEventType,
    pub is_deleted: u8,
    /// Seconds since epoch.
    pub deleted_at: Option<i64>,
}
