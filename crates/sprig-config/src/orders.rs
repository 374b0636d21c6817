//! Order and recurring-order settings.

use serde::{Deserialize, Serialize};

const fn default_harvest_lead_days() -> i64 {
    1
}

const fn default_max_catch_up() -> u32 {
    12
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrdersConfig {
    /// Days between harvest and delivery when an order gives no harvest date.
    #[serde(default = "default_harvest_lead_days")]
    pub harvest_lead_days: i64,

    /// Maximum missed occurrences a single template may generate per run.
    #[serde(default = "default_max_catch_up")]
    pub max_catch_up: u32,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            harvest_lead_days: default_harvest_lead_days(),
            max_catch_up: default_max_catch_up(),
        }
    }
}
