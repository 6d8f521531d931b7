use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("User {0} not found")]
    UserNotFound(Uuid),
    #[error("Order {0} not found")]
    OrderNotFound(Uuid),
    #[error("Order {0} is already deleted")]
    AlreadyDeleted(Uuid),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure to hand a message to the broker.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Broker transport error: {0}")]
    Transport(String),
}

/// Failure while turning a raw order event into an analytics event.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Malformed message: {0}")]
    Malformed(String),
    #[error("Missing required field `{0}`")]
    MissingField(&'static str),
    #[error("Invalid identifier in `{field}`: {value}")]
    InvalidIdentifier { field: &'static str, value: String },
    #[error("Order {0} not found")]
    OrderNotFound(Uuid),
    #[error("Lookup failed: {0}")]
    Lookup(#[from] DomainError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}
