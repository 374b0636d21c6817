use clap::Subcommand;

/// Report commands.
#[derive(Clone, Debug, Subcommand)]
pub enum StatsCommands {
    /// Harvest results per recipe.
    Harvest {
        /// First harvest day, YYYY-MM-DD.
        #[arg(long)]
        from: Option<String>,
        /// Last harvest day, YYYY-MM-DD.
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        recipe: Option<String>,
    },
}
