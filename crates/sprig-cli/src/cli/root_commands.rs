use clap::{Args, Subcommand};

use crate::cli::subcommands::{
    BatchCommands, ConsumableCommands, OrderCommands, PlanCommands, ProductCommands,
    RecipeCommands, StatsCommands, TaskCommands,
};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Create the .sprig project directory, config, and database.
    Init(InitArgs),
    /// Growing recipes and watering schedules.
    Recipe {
        #[command(subcommand)]
        action: RecipeCommands,
    },
    /// Seed, soil, and packaging inventory.
    Consumable {
        #[command(subcommand)]
        action: ConsumableCommands,
    },
    /// Sellable products.
    Product {
        #[command(subcommand)]
        action: ProductCommands,
    },
    /// Customer orders and recurring templates.
    Order {
        #[command(subcommand)]
        action: OrderCommands,
    },
    /// Crop batches and their lifecycle.
    Batch {
        #[command(subcommand)]
        action: BatchCommands,
    },
    /// Crop plans derived from orders.
    Plan {
        #[command(subcommand)]
        action: PlanCommands,
    },
    /// Scheduled crop tasks.
    Task {
        #[command(subcommand)]
        action: TaskCommands,
    },
    /// Reports.
    Stats {
        #[command(subcommand)]
        action: StatsCommands,
    },
    /// Export the database to a bundle.
    Export(ExportArgs),
    /// Import a bundle into the database.
    Import(ImportArgs),
}

#[derive(Clone, Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing .sprig/config.toml with defaults.
    #[arg(long)]
    pub force: bool,
}

#[derive(Clone, Debug, Args)]
pub struct ExportArgs {
    /// Bundle file to write (defaults to a timestamped file in the export directory).
    #[arg(short, long)]
    pub output: Option<String>,
    /// Only export these tables (repeatable).
    #[arg(long = "table", value_delimiter = ',')]
    pub tables: Vec<String>,
    /// Print the manifest of an existing bundle instead of exporting.
    #[arg(long, conflicts_with_all = ["output", "tables"])]
    pub inspect: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ImportArgs {
    /// Bundle file to read.
    pub file: String,
    /// Replace rows in non-empty tables.
    #[arg(long)]
    pub force: bool,
    /// Validate the bundle without writing.
    #[arg(long)]
    pub dry_run: bool,
}
