use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Recorded harvest of a whole batch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Harvest {
    pub id: String,
    pub batch_id: String,
    pub recipe_id: String,
    pub trays: i64,
    pub total_weight_grams: f64,
    pub harvested_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
