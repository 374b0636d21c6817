use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::CropStage;

/// Crops created together from the same recipe (and optionally order).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CropBatch {
    pub id: String,
    pub recipe_id: String,
    pub order_id: Option<String>,
    pub tray_count: i64,
    /// Set while soaking seed has not been assigned to physical trays yet.
    pub awaiting_trays: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One production tray.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Crop {
    pub id: String,
    pub batch_id: String,
    pub recipe_id: String,
    pub order_id: Option<String>,
    pub tray_number: String,
    pub stage: CropStage,
    pub planted_at: DateTime<Utc>,
    pub soaking_at: Option<DateTime<Utc>>,
    pub germination_at: Option<DateTime<Utc>>,
    pub blackout_at: Option<DateTime<Utc>>,
    pub light_at: Option<DateTime<Utc>>,
    pub harvested_at: Option<DateTime<Utc>>,
    pub harvest_weight_grams: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Crop {
    /// When the crop entered `stage`, if it has.
    #[must_use]
    pub const fn entered_at(&self, stage: CropStage) -> Option<DateTime<Utc>> {
        match stage {
            CropStage::Soaking => self.soaking_at,
            CropStage::Germination => self.germination_at,
            CropStage::Blackout => self.blackout_at,
            CropStage::Light => self.light_at,
            CropStage::Harvested => self.harvested_at,
        }
    }
}

/// A batch with its crops and derived schedule.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchDetail {
    #[serde(flatten)]
    pub batch: CropBatch,
    pub recipe_name: String,
    /// Shared stage of all crops; `None` when crops diverged.
    pub stage: Option<CropStage>,
    pub stage_due_at: Option<DateTime<Utc>>,
    pub expected_harvest_at: Option<DateTime<Utc>>,
    pub crops: Vec<Crop>,
}
