mod batch;
mod consumable;
mod order;
mod plan;
mod product;
mod recipe;
mod stats;
mod task;

pub use batch::BatchCommands;
pub use consumable::ConsumableCommands;
pub use order::OrderCommands;
pub use plan::PlanCommands;
pub use product::ProductCommands;
pub use recipe::RecipeCommands;
pub use stats::StatsCommands;
pub use task::TaskCommands;
