pub mod event_transformer;
pub mod order_service;
pub mod outbox_relay;

use crate::domain::errors::DomainError;

/// Runs a synchronous store call on the blocking pool so async flows (relay,
/// consumer) never stall the runtime on a database round-trip.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(format!("blocking task failed: {e}")))?
}
