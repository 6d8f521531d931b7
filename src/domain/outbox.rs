use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A notification waiting in the outbox to be relayed to the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    pub id: i64,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    pub payload: Value,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

/// An outbox entry as handed to the writer, before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxMessage {
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    pub payload: Value,
}

impl OutboxRecord {
    /// Topic the record is published to: `"{aggregate_type lower-cased}.events"`.
    pub fn topic(&self) -> String {
        format!("{}.events", self.aggregate_type.to_lowercase())
    }

    /// Broker message body: the stored payload with `eventType` merged in.
    /// Fields already present in the payload win over the merged tag.
    pub fn message(&self) -> Value {
        match &self.payload {
            Value::Object(fields) => {
                let mut merged = Map::with_capacity(fields.len() + 1);
                merged.insert("eventType".to_string(), Value::String(self.event_type.clone()));
                merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                Value::Object(merged)
            }
            other => {
                let mut wrapped = Map::with_capacity(2);
                wrapped.insert("eventType".to_string(), Value::String(self.event_type.clone()));
                wrapped.insert("payload".to_string(), other.clone());
                Value::Object(wrapped)
            }
        }
    }
}
