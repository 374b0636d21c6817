use clap::Subcommand;

/// Order commands.
#[derive(Clone, Debug, Subcommand)]
pub enum OrderCommands {
    /// Create a one-off order.
    Create {
        #[arg(long)]
        customer: String,
        /// YYYY-MM-DD
        #[arg(long)]
        delivery: String,
        /// YYYY-MM-DD (defaults to delivery minus the configured lead days)
        #[arg(long)]
        harvest: Option<String>,
        /// `PRODUCT_ID:QTY[:PRICE_CENTS]`, repeatable.
        #[arg(long = "item", required = true)]
        items: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Create a recurring order template.
    Recurring {
        #[arg(long)]
        customer: String,
        /// weekly, biweekly, monthly
        #[arg(long)]
        frequency: String,
        /// First delivery date, YYYY-MM-DD.
        #[arg(long)]
        start: String,
        /// Last possible delivery date, YYYY-MM-DD.
        #[arg(long)]
        end: Option<String>,
        /// `PRODUCT_ID:QTY[:PRICE_CENTS]`, repeatable.
        #[arg(long = "item", required = true)]
        items: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Get an order with its items.
    Get { id: String },
    /// List orders, latest delivery first.
    List {
        #[arg(long)]
        status: Option<String>,
        /// Substring of the customer name.
        #[arg(long)]
        customer: Option<String>,
        /// true for templates only, false for everything else.
        #[arg(long)]
        recurring: Option<bool>,
    },
    /// Move an order to a new status.
    Transition { id: String, status: String },
    /// Generate child orders from due recurring templates.
    ProcessRecurring {
        #[arg(long)]
        dry_run: bool,
        /// Evaluate as of this day (YYYY-MM-DD, default today).
        #[arg(long)]
        date: Option<String>,
    },
}
