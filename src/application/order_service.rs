use bigdecimal::{BigDecimal, Zero};
use log::info;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, OrderView};
use crate::domain::ports::OrderRepository;

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates the order; the repository commits the order, its items and the
    /// `OrderCreated` outbox record together or not at all.
    pub fn create_order(&self, order: NewOrder) -> Result<OrderView, DomainError> {
        validate(&order)?;

        if !self.repo.user_exists(order.user_id)? {
            return Err(DomainError::UserNotFound(order.user_id));
        }

        let created = self.repo.create(order)?;
        info!(
            "Order created: {} for user {} ({} items)",
            created.id,
            created.user_id,
            created.items.len()
        );
        Ok(created)
    }

    pub fn get_order(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        self.repo.find_by_id(id)
    }

    pub fn list_user_orders(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        self.repo.find_by_user(user_id)
    }

    /// Soft-deletes the order on behalf of `deleted_by` (an admin id kept for
    /// audit). A second delete of the same order is rejected.
    pub fn delete_order(&self, id: Uuid, deleted_by: &str) -> Result<(), DomainError> {
        if deleted_by.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "deleting actor id must not be empty".to_string(),
            ));
        }

        self.repo.soft_delete(id, deleted_by)?;
        info!("Order {} soft-deleted by {}", id, deleted_by);
        Ok(())
    }
}

fn validate(order: &NewOrder) -> Result<(), DomainError> {
    if order.total_amount <= BigDecimal::zero() {
        return Err(DomainError::InvalidInput(
            "total_amount must be positive".to_string(),
        ));
    }
    for item in &order.items {
        if item.quantity <= 0 {
            return Err(DomainError::InvalidInput(format!(
                "quantity for product {} must be positive",
                item.product_id
            )));
        }
        if item.price <= BigDecimal::zero() {
            return Err(DomainError::InvalidInput(format!(
                "price for product {} must be positive",
                item.product_id
            )));
        }
    }
    Ok(())
}
