use clap::Subcommand;

/// Recipe commands.
#[derive(Clone, Debug, Subcommand)]
pub enum RecipeCommands {
    /// Create a recipe.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        variety: String,
        /// Seed consumable drawn down when batches are planted.
        #[arg(long)]
        seed_consumable: Option<String>,
        #[arg(long)]
        soil_consumable: Option<String>,
        /// Grams of seed per tray.
        #[arg(long)]
        density: f64,
        #[arg(long, default_value_t = 0.0)]
        soak_hours: f64,
        #[arg(long)]
        germination_days: f64,
        #[arg(long, default_value_t = 0.0)]
        blackout_days: f64,
        #[arg(long)]
        light_days: f64,
        /// Expected harvest weight per tray in grams.
        #[arg(long, default_value_t = 0.0)]
        expected_yield: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Get a recipe with its watering schedule.
    Get { id: String },
    /// List recipes.
    List {
        /// Include inactive recipes.
        #[arg(long)]
        all: bool,
    },
    /// Update a recipe. Empty strings clear optional fields.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        variety: Option<String>,
        #[arg(long)]
        seed_consumable: Option<String>,
        #[arg(long)]
        soil_consumable: Option<String>,
        #[arg(long)]
        density: Option<f64>,
        #[arg(long)]
        soak_hours: Option<f64>,
        #[arg(long)]
        germination_days: Option<f64>,
        #[arg(long)]
        blackout_days: Option<f64>,
        #[arg(long)]
        light_days: Option<f64>,
        #[arg(long)]
        expected_yield: Option<f64>,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Copy a recipe and its watering schedule under a new name.
    Clone {
        id: String,
        #[arg(long)]
        name: String,
    },
    /// Show, or with --step replace, a recipe's watering schedule.
    Watering {
        id: String,
        /// `DAY:ML[:NOTE]`, repeatable.
        #[arg(long = "step")]
        steps: Vec<String>,
    },
}
