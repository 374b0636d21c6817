use clap::Subcommand;

/// Crop batch commands.
#[derive(Clone, Debug, Subcommand)]
pub enum BatchCommands {
    /// Plant trays from a recipe.
    Create {
        #[arg(long)]
        recipe: String,
        /// Tray numbers, repeatable or comma separated.
        #[arg(long = "tray", value_delimiter = ',', required = true)]
        trays: Vec<String>,
        /// RFC 3339 or `YYYY-MM-DD HH:MM` (UTC). Defaults to now.
        #[arg(long)]
        planted_at: Option<String>,
        #[arg(long)]
        order: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Start soaking seed before tray numbers are known.
    Soak {
        #[arg(long)]
        recipe: String,
        #[arg(long)]
        trays: u32,
        #[arg(long)]
        at: Option<String>,
    },
    /// Move a soaking batch into germination.
    EndSoak {
        id: String,
        /// Tray numbers for a batch started with `soak`.
        #[arg(long = "tray", value_delimiter = ',')]
        trays: Vec<String>,
        #[arg(long)]
        at: Option<String>,
    },
    /// Move a batch to its next stage.
    Advance {
        id: String,
        #[arg(long)]
        at: Option<String>,
    },
    /// Record the harvest of a batch under light.
    Harvest {
        id: String,
        /// Total weight in grams across all trays.
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Get a batch with its crops.
    Get { id: String },
    /// List batches, newest first.
    List {
        #[arg(long)]
        stage: Option<String>,
    },
    /// Delete a batch and its crops.
    Delete { id: String },
}
