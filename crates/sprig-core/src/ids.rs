//! ID prefixes for every stored entity.
//!
//! IDs are generated in SQL as `<prefix>-<8 hex chars>`.

pub const PREFIX_RECIPE: &str = "rcp";
pub const PREFIX_WATERING_STEP: &str = "wst";
pub const PREFIX_CONSUMABLE: &str = "con";
pub const PREFIX_PRODUCT: &str = "prd";
pub const PREFIX_ORDER: &str = "ord";
pub const PREFIX_ORDER_ITEM: &str = "itm";
pub const PREFIX_BATCH: &str = "bat";
pub const PREFIX_CROP: &str = "crp";
pub const PREFIX_CROP_PLAN: &str = "pln";
pub const PREFIX_CROP_TASK: &str = "ctk";
pub const PREFIX_HARVEST: &str = "hvs";

pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_RECIPE,
    PREFIX_WATERING_STEP,
    PREFIX_CONSUMABLE,
    PREFIX_PRODUCT,
    PREFIX_ORDER,
    PREFIX_ORDER_ITEM,
    PREFIX_BATCH,
    PREFIX_CROP,
    PREFIX_CROP_PLAN,
    PREFIX_CROP_TASK,
    PREFIX_HARVEST,
];
