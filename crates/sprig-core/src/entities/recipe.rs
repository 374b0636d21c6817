use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Growing-parameter template for a seed variety.
///
/// Day counts are fractional; a recipe requires soaking when
/// `seed_soak_hours > 0`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub seed_variety: String,
    pub seed_consumable_id: Option<String>,
    pub soil_consumable_id: Option<String>,
    /// Grams of seed sown per tray.
    pub seed_density_grams: f64,
    pub seed_soak_hours: f64,
    pub germination_days: f64,
    pub blackout_days: f64,
    pub light_days: f64,
    /// Expected harvest weight per tray, in grams.
    pub expected_yield_grams: f64,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    #[must_use]
    pub fn requires_soaking(&self) -> bool {
        self.seed_soak_hours > 0.0
    }
}

/// One entry of a recipe's watering schedule.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct WateringStep {
    pub id: String,
    pub recipe_id: String,
    /// Day after planting, starting at 0.
    pub day_number: i64,
    pub amount_ml: f64,
    pub note: Option<String>,
}
