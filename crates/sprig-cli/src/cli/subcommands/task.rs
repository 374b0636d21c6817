use clap::Subcommand;

/// Crop task commands.
#[derive(Clone, Debug, Subcommand)]
pub enum TaskCommands {
    /// List crop tasks by schedule.
    List {
        /// Include processed tasks.
        #[arg(long)]
        all: bool,
        #[arg(long)]
        batch: Option<String>,
    },
    /// Act on every due task.
    Process {
        #[arg(long)]
        dry_run: bool,
        /// Evaluate as of this instant (default now).
        #[arg(long)]
        now: Option<String>,
    },
}
