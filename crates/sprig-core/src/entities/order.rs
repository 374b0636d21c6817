use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{OrderStatus, RecurringFrequency};

/// A customer order, or a recurring order template (`status == template`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub harvest_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub is_recurring: bool,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub recurring_start_date: Option<NaiveDate>,
    pub recurring_end_date: Option<NaiveDate>,
    /// Next occurrence a template will generate.
    pub next_generation_date: Option<NaiveDate>,
    pub is_recurring_active: bool,
    /// Template this order was generated from.
    pub parent_recurring_order_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product line on an order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Number of product units.
    pub quantity: i64,
    /// Price per unit at the time of ordering.
    pub price_cents: i64,
}

/// An order together with its items.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub total_cents: i64,
}
