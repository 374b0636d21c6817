use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::ConsumableType;

/// Inventory item (seed, soil, packaging) with optional lot tracking.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Consumable {
    pub id: String,
    pub consumable_type: ConsumableType,
    pub name: String,
    /// Unit of `quantity`, e.g. `g`, `kg`, `bag`.
    pub unit: String,
    pub quantity: f64,
    pub restock_threshold: f64,
    /// Normalized (upper-case) supplier lot number.
    pub lot_number: Option<String>,
    pub supplier: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Consumable {
    #[must_use]
    pub fn needs_restock(&self) -> bool {
        self.quantity <= self.restock_threshold
    }
}
