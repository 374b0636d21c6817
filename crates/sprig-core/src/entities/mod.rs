//! Entity structs for all Sprig domain objects.
//!
//! Each entity maps to a table in the libSQL database (see
//! `sprig-db/migrations/001_initial.sql`). All structs derive `Serialize`,
//! `Deserialize`, and `JsonSchema` for JSON output, bundle rows, and schema checks.

mod batch;
mod consumable;
mod harvest;
mod order;
mod plan;
mod product;
mod recipe;
mod task;

pub use batch::{BatchDetail, Crop, CropBatch};
pub use consumable::Consumable;
pub use harvest::Harvest;
pub use order::{Order, OrderDetail, OrderItem};
pub use plan::CropPlan;
pub use product::Product;
pub use recipe::{Recipe, WateringStep};
pub use task::CropTask;
