//! Crop task processor settings.

use serde::{Deserialize, Serialize};

const fn default_batch_limit() -> u32 {
    200
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TasksConfig {
    /// Maximum due tasks handled by one `sprig task process` run.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_batch_limit(),
        }
    }
}
