use diesel::pg::PgConnection;
use diesel::prelude::*;
use log::info;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::events::OutboxEvent;
use crate::domain::outbox::{NewOutboxMessage, OutboxRecord};
use crate::domain::ports::OutboxStore;
use crate::schema::outbox;

use super::models::{NewOutboxRow, OutboxRow};

/// Appends an outbox record on `conn`.
///
/// Call this inside the caller's transaction: it never commits on its own, so
/// the record lands if and only if the surrounding domain mutation does.
pub fn append(conn: &mut PgConnection, message: NewOutboxMessage) -> Result<OutboxRecord, DomainError> {
    let row = diesel::insert_into(outbox::table)
        .values(&NewOutboxRow::from(message))
        .returning(OutboxRow::as_returning())
        .get_result(conn)?;

    info!(
        "Published event: {} for {}:{}",
        row.event_type, row.aggregate_type, row.aggregate_id
    );
    Ok(row.into())
}

/// Serializes `event` and appends it; see [`append`].
pub fn publish<E: OutboxEvent>(conn: &mut PgConnection, event: &E) -> Result<OutboxRecord, DomainError> {
    append(conn, event.to_outbox_message()?)
}

pub struct DieselOutboxStore {
    pool: DbPool,
}

impl DieselOutboxStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OutboxStore for DieselOutboxStore {
    fn find_unprocessed(&self, limit: i64) -> Result<Vec<OutboxRecord>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = outbox::table
            .filter(outbox::processed.eq(false))
            .order((outbox::created_at.asc(), outbox::id.asc()))
            .limit(limit)
            .select(OutboxRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(OutboxRecord::from).collect())
    }

    fn mark_processed(&self, ids: &[i64]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get()?;

        diesel::update(outbox::table.filter(outbox::id.eq_any(ids)))
            .set(outbox::processed.eq(true))
            .execute(&mut conn)?;
        Ok(())
    }
}
