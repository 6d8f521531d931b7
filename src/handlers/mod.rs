pub mod admin_orders;
pub mod orders;
