use bigdecimal::ToPrimitive;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::events::{OrderCreated, OrderDeleted};
use crate::domain::order::{NewOrder, OrderView};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_items, orders, users};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};
use super::outbox_repo;

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn user_exists(&self, user_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let found = users::table
            .find(user_id)
            .filter(users::deleted_at.is_null())
            .select(users::id)
            .first::<Uuid>(&mut conn)
            .optional()?;
        Ok(found.is_some())
    }

    fn create(&self, order: NewOrder) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order
            let row = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: Uuid::new_v4(),
                    user_id: order.user_id,
                    total_amount: order.total_amount.clone(),
                    status: order.status.as_str().to_string(),
                    shipping_address: Some(order.shipping_address.clone()),
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            // 2. Insert order items
            let new_items: Vec<NewOrderItemRow> = order
                .items
                .iter()
                .map(|item| NewOrderItemRow {
                    order_id: row.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.price.clone(),
                })
                .collect();
            let items = if new_items.is_empty() {
                vec![]
            } else {
                diesel::insert_into(order_items::table)
                    .values(&new_items)
                    .returning(OrderItemRow::as_returning())
                    .get_results(conn)?
            };

            // 3. Hybrid OrderCreated event in the same transaction. The user's
            //    email is left out; the transformer resolves it.
            outbox_repo::publish(
                conn,
                &OrderCreated {
                    order_id: row.id.to_string(),
                    user_id: row.user_id.to_string(),
                    total_amount: row.total_amount.to_f64().unwrap_or_default(),
                    items_count: items.len() as i64,
                    status: order.status,
                    created_at: Some(row.created_at),
                },
            )?;

            row.into_view(items)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = OrderItemRow::belonging_to(&order)
            .select(OrderItemRow::as_select())
            .order(order_items::id.asc())
            .load(&mut conn)?;

        order.into_view(items).map(Some)
    }

    fn find_by_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = orders::table
            .filter(orders::user_id.eq(user_id))
            .select(OrderRow::as_select())
            .order(orders::created_at.desc())
            .load(&mut conn)?;

        rows.into_iter().map(|o| o.into_view(vec![])).collect()
    }

    fn soft_delete(&self, id: Uuid, deleted_by: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Row lock so two concurrent deletes cannot both pass the guard.
            let order = orders::table
                .find(id)
                .select(OrderRow::as_select())
                .for_update()
                .get_result(conn)
                .optional()?
                .ok_or(DomainError::OrderNotFound(id))?;

            if order.deleted_at.is_some() {
                return Err(DomainError::AlreadyDeleted(id));
            }

            let now = Utc::now();
            diesel::update(orders::table.find(id))
                .set((
                    orders::deleted_at.eq(Some(now)),
                    orders::updated_at.eq(now),
                ))
                .execute(conn)?;

            outbox_repo::publish(
                conn,
                &OrderDeleted {
                    order_id: id.to_string(),
                    deleted_at: Some(now),
                    deleted_by: deleted_by.to_string(),
                    version: now.timestamp_millis(),
                },
            )?;

            Ok(())
        })
    }
}
