use clap::Subcommand;

/// Crop plan commands.
#[derive(Clone, Debug, Subcommand)]
pub enum PlanCommands {
    /// Generate draft plans for an order.
    Generate { order_id: String },
    /// Get a plan by ID.
    Get { id: String },
    /// List plans by plant-by date.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        order: Option<String>,
    },
    /// Approve a draft plan.
    Approve { id: String },
    /// Cancel a draft or approved plan.
    Cancel { id: String },
    /// Plant an approved plan as a crop batch.
    Plant {
        id: String,
        #[arg(long = "tray", value_delimiter = ',', required = true)]
        trays: Vec<String>,
        #[arg(long)]
        at: Option<String>,
    },
    /// Trays to plant per day.
    Calendar {
        /// First day, YYYY-MM-DD (default today).
        #[arg(long)]
        from: Option<String>,
        /// Last day, YYYY-MM-DD (default two weeks after --from).
        #[arg(long)]
        to: Option<String>,
    },
}
