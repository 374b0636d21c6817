pub mod batch;
pub mod consumable;
pub mod dispatch;
pub mod export;
pub mod import;
pub mod init;
pub mod order;
pub mod plan;
pub mod product;
pub mod recipe;
pub mod shared;
pub mod stats;
pub mod task;
