use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

pub const DEFAULT_SHIPPING_ADDRESS: &str = "Not provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    PaymentProcessing,
    PaymentConfirmed,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::PaymentProcessing => "PAYMENT_PROCESSING",
            OrderStatus::PaymentConfirmed => "PAYMENT_CONFIRMED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }

    /// Maps a client-facing status label to a status. Labels are matched
    /// case-insensitively; anything unrecognised starts the order as pending.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "processing" | "preparing" => OrderStatus::Preparing,
            "completed" | "delivered" => OrderStatus::Delivered,
            "cancelled" => OrderStatus::Cancelled,
            "payment_processing" => OrderStatus::PaymentProcessing,
            "payment_confirmed" => OrderStatus::PaymentConfirmed,
            "shipped" => OrderStatus::Shipped,
            "refunded" => OrderStatus::Refunded,
            _ => OrderStatus::Pending,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PAYMENT_PROCESSING" => Ok(OrderStatus::PaymentProcessing),
            "PAYMENT_CONFIRMED" => Ok(OrderStatus::PaymentConfirmed),
            "PREPARING" => Ok(OrderStatus::Preparing),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "REFUNDED" => Ok(OrderStatus::Refunded),
            other => Err(DomainError::Internal(format!("unknown order status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub total_amount: BigDecimal,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: i64,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: BigDecimal,
    pub status: OrderStatus,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemView>,
}

impl OrderView {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_column_text() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::PaymentProcessing,
            OrderStatus::PaymentConfirmed,
            OrderStatus::Preparing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_column_text_is_an_internal_error() {
        assert!(matches!(
            "ARCHIVED".parse::<OrderStatus>(),
            Err(DomainError::Internal(_))
        ));
    }

    #[test]
    fn labels_map_case_insensitively_with_aliases() {
        assert_eq!(OrderStatus::from_label("Processing"), OrderStatus::Preparing);
        assert_eq!(OrderStatus::from_label("COMPLETED"), OrderStatus::Delivered);
        assert_eq!(OrderStatus::from_label("shipped"), OrderStatus::Shipped);
        assert_eq!(
            OrderStatus::from_label("payment_confirmed"),
            OrderStatus::PaymentConfirmed
        );
    }

    #[test]
    fn unknown_label_falls_back_to_pending() {
        assert_eq!(OrderStatus::from_label("teleported"), OrderStatus::Pending);
    }

    #[test]
    fn status_serializes_in_screaming_snake_case() {
        let json = serde_json::to_string(&OrderStatus::PaymentProcessing).unwrap();
        assert_eq!(json, "\"PAYMENT_PROCESSING\"");
    }
}
