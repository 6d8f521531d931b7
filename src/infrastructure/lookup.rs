use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::OrderView;
use crate::domain::ports::OrderLookup;
use crate::schema::{order_items, orders, users};

use super::models::OrderRow;

/// Relational reads backing event enrichment.
pub struct DieselOrderLookup {
    pool: DbPool,
}

impl DieselOrderLookup {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderLookup for DieselOrderLookup {
    fn user_email(&self, user_id: Uuid) -> Result<Option<String>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(users::table
            .find(user_id)
            .filter(users::deleted_at.is_null())
            .select(users::email)
            .first::<String>(&mut conn)
            .optional()?)
    }

    fn order(&self, order_id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        orders::table
            .find(order_id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(|row| row.into_view(vec![]))
            .transpose()
    }

    fn count_items(&self, order_id: Uuid) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(order_items::table
            .filter(order_items::order_id.eq(order_id))
            .count()
            .get_result(&mut conn)?)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::DieselOrderLookup;
    use crate::domain::order::{NewOrder, OrderItemInput, OrderStatus};
    use crate::domain::ports::{OrderLookup, OrderRepository};
    use crate::infrastructure::order_repo::DieselOrderRepository;
    use crate::test_support::{insert_user, setup_db};

    #[tokio::test]
    async fn resolves_email_order_and_item_count_including_deleted_orders() {
        let (_container, pool) = setup_db().await;
        let user_id = insert_user(&pool, "u@example.com");
        let repo = DieselOrderRepository::new(pool.clone());
        let created = repo
            .create(NewOrder {
                user_id,
                total_amount: BigDecimal::from_str("30.00").expect("valid decimal"),
                status: OrderStatus::Shipped,
                shipping_address: "1 Main St".to_string(),
                items: (0..3)
                    .map(|_| OrderItemInput {
                        product_id: Uuid::new_v4(),
                        quantity: 1,
                        price: BigDecimal::from_str("10.00").expect("valid decimal"),
                    })
                    .collect(),
            })
            .expect("create failed");
        repo.soft_delete(created.id, "admin-1")
            .expect("delete failed");
        let lookup = DieselOrderLookup::new(pool);

        assert_eq!(
            lookup.user_email(user_id).expect("lookup failed").as_deref(),
            Some("u@example.com")
        );
        assert_eq!(lookup.user_email(Uuid::new_v4()).expect("lookup failed"), None);

        let order = lookup
            .order(created.id)
            .expect("lookup failed")
            .expect("deleted order is still readable");
        assert!(order.is_deleted());
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(lookup.count_items(created.id).expect("count failed"), 3);
        assert!(lookup.order(Uuid::new_v4()).expect("lookup failed").is_none());
    }
}
