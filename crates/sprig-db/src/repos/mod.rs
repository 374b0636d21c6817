//! Repository modules implementing storage operations for all Sprig entities.
//!
//! Each module adds methods to `SprigService` via `impl SprigService` blocks.
//! Public methods that write more than one row open a transaction and call
//! crate-private helpers that assume one is already open.

pub mod batch;
pub mod consumable;
pub mod order;
pub mod plan;
pub mod product;
pub mod recipe;
pub mod stats;
pub mod task;
