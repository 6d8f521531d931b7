use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::errors::{DomainError, PublishError};
use super::order::{NewOrder, OrderView};
use super::outbox::OutboxRecord;

pub trait OrderRepository: Send + Sync + 'static {
    fn user_exists(&self, user_id: Uuid) -> Result<bool, DomainError>;
    /// Inserts the order, its items and an `OrderCreated` outbox record in one
    /// transaction.
    fn create(&self, order: NewOrder) -> Result<OrderView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn find_by_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError>;
    /// Stamps `deleted_at` and writes an `OrderDeleted` outbox record in one
    /// transaction. Fails with `AlreadyDeleted` on a second call.
    fn soft_delete(&self, id: Uuid, deleted_by: &str) -> Result<(), DomainError>;
}

pub trait OutboxStore: Send + Sync + 'static {
    /// Unprocessed records, oldest first, at most `limit`.
    fn find_unprocessed(&self, limit: i64) -> Result<Vec<OutboxRecord>, DomainError>;
    /// Flags every id as processed in one statement. Re-marking is harmless.
    fn mark_processed(&self, ids: &[i64]) -> Result<(), DomainError>;
}

/// Read-only relational lookups used to enrich raw order events.
pub trait OrderLookup: Send + Sync + 'static {
    fn user_email(&self, user_id: Uuid) -> Result<Option<String>, DomainError>;
    /// Includes soft-deleted orders.
    fn order(&self, order_id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn count_items(&self, order_id: Uuid) -> Result<i64, DomainError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub key: String,
    pub value: Value,
}

#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    async fn send(&self, topic: &str, key: &str, value: &Value) -> Result<(), PublishError>;

    /// Sends every message to `topic` concurrently, each as its own broker
    /// message. Any failure fails the call, but the other messages of the
    /// batch may already have been delivered; callers must tolerate that the
    /// same way they tolerate redelivery.
    async fn send_batch(&self, topic: &str, messages: &[OutboundMessage])
        -> Result<(), PublishError>;
}
