use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use super::run_blocking;
use crate::domain::outbox::OutboxRecord;
use crate::domain::ports::{EventPublisher, OutboxStore};

pub const DEFAULT_BATCH_SIZE: i64 = 100;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was still in flight.
    Skipped,
    /// Nothing to relay.
    Idle,
    Completed { published: usize, failed: usize },
    /// A store error ended the cycle; outbox state is unchanged.
    Aborted,
}

/// Drains the outbox into the broker, one cycle at a time.
pub struct OutboxRelay<S, P> {
    store: Arc<S>,
    publisher: Arc<P>,
    batch_size: i64,
    in_flight: AtomicBool,
}

/// Releases the in-flight flag when the cycle ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: OutboxStore, P: EventPublisher> OutboxRelay<S, P> {
    pub fn new(store: Arc<S>, publisher: Arc<P>, batch_size: i64) -> Self {
        Self {
            store,
            publisher,
            batch_size,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Fires a cycle every `cadence` until `shutdown` flips, then waits for
    /// the in-flight cycle to finish. Ticks that land while a cycle is still
    /// running are skipped, not queued.
    pub async fn run(self: Arc<Self>, cadence: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = JoinSet::new();

        info!(
            "Outbox relay started (every {:?}, batch size {})",
            cadence, self.batch_size
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    while cycles.try_join_next().is_some() {}
                    let relay = Arc::clone(&self);
                    cycles.spawn(async move {
                        relay.run_cycle().await;
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        while cycles.join_next().await.is_some() {}
        info!("Outbox relay stopped");
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Previous relay cycle is still processing, skipping this cycle");
            return CycleOutcome::Skipped;
        }
        let _guard = CycleGuard(&self.in_flight);

        let store = Arc::clone(&self.store);
        let limit = self.batch_size;
        let records = match run_blocking(move || store.find_unprocessed(limit)).await {
            Ok(records) => records,
            Err(e) => {
                error!("Outbox relay cycle failed while fetching records: {}", e);
                return CycleOutcome::Aborted;
            }
        };

        if records.is_empty() {
            return CycleOutcome::Idle;
        }

        info!("Processing {} outbox records", records.len());

        let mut published = Vec::with_capacity(records.len());
        for record in &records {
            if self.relay(record).await {
                published.push(record.id);
            }
        }

        let failed = records.len() - published.len();
        if !published.is_empty() {
            let store = Arc::clone(&self.store);
            let ids = published.clone();
            if let Err(e) = run_blocking(move || store.mark_processed(&ids)).await {
                error!(
                    "Outbox relay cycle failed while marking {} records processed: {}",
                    published.len(),
                    e
                );
                return CycleOutcome::Aborted;
            }
            info!("Marked {} outbox records as processed", published.len());
        }
        if failed > 0 {
            warn!("{} outbox records failed to relay and stay pending", failed);
        }

        CycleOutcome::Completed {
            published: published.len(),
            failed,
        }
    }

    async fn relay(&self, record: &OutboxRecord) -> bool {
        let topic = record.topic();
        match self
            .publisher
            .send(&topic, &record.aggregate_id, &record.message())
            .await
        {
            Ok(()) => {
                debug!(
                    "Relayed outbox record {}: {} for {}:{} to {}",
                    record.id, record.event_type, record.aggregate_type, record.aggregate_id, topic
                );
                true
            }
            Err(e) => {
                error!(
                    "Failed to relay outbox record {} ({}): {}",
                    record.id, record.event_type, e
                );
                false
            }
        }
    }
}
