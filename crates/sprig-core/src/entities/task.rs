use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{CropStage, CropTaskKind};

/// A scheduled action on a crop batch, picked up by the task processor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CropTask {
    pub id: String,
    pub batch_id: String,
    pub kind: CropTaskKind,
    /// Stage the batch was in when the task was scheduled.
    pub expected_stage: CropStage,
    pub scheduled_at: DateTime<Utc>,
    pub is_active: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
