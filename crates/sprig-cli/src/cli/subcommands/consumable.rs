use clap::Subcommand;

/// Consumable inventory commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ConsumableCommands {
    /// Create a consumable.
    Create {
        /// seed, soil, packaging, other
        #[arg(long = "type")]
        consumable_type: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "g")]
        unit: String,
        #[arg(long, default_value_t = 0.0)]
        quantity: f64,
        #[arg(long, default_value_t = 0.0)]
        restock_threshold: f64,
        #[arg(long)]
        lot: Option<String>,
        #[arg(long)]
        supplier: Option<String>,
    },
    /// Get a consumable by ID.
    Get { id: String },
    /// List consumables.
    List {
        #[arg(long = "type")]
        consumable_type: Option<String>,
    },
    /// Update a consumable. Empty strings clear lot and supplier.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        restock_threshold: Option<f64>,
        #[arg(long)]
        lot: Option<String>,
        #[arg(long)]
        supplier: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Add to (positive) or draw down (negative) stock.
    Adjust {
        id: String,
        #[arg(long, allow_hyphen_values = true)]
        delta: f64,
    },
    /// Active consumables at or below their restock threshold.
    LowStock,
    /// Normalize and validate a lot number and look it up.
    CheckLot {
        lot: String,
        #[arg(long = "type")]
        consumable_type: Option<String>,
    },
}
