use clap::Subcommand;

/// Product commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ProductCommands {
    /// Create a product.
    Create {
        #[arg(long)]
        name: String,
        /// Recipe that grows this product (needed for crop plans).
        #[arg(long)]
        recipe: Option<String>,
        /// Grams of greens in one unit.
        #[arg(long)]
        unit_weight: f64,
        #[arg(long)]
        price_cents: i64,
    },
    /// Get a product by ID.
    Get { id: String },
    /// List products.
    List {
        /// Include inactive products.
        #[arg(long)]
        all: bool,
    },
    /// Make a product orderable again.
    Activate { id: String },
    /// Stop offering a product.
    Deactivate { id: String },
}
