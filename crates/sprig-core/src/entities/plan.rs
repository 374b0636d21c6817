use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::CropPlanStatus;

/// Forecasted planting derived from one order item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CropPlan {
    pub id: String,
    pub order_id: String,
    pub order_item_id: String,
    pub recipe_id: String,
    pub trays: i64,
    pub grams_needed: f64,
    /// Latest date seeds must go in to make `harvest_date`.
    pub plant_by: NaiveDate,
    pub harvest_date: NaiveDate,
    pub status: CropPlanStatus,
    pub batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
