#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

mod cli;
mod commands;
mod context;
mod output;
mod progress;
mod ui;
mod write_lock;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("sprig error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let flags = cli.global_flags();
    ui::init(&flags);

    if let cli::Commands::Init(args) = &cli.command {
        return commands::init::handle(args, &flags).await;
    }

    let project_root = resolve_project_root(flags.project.as_deref())?;
    let config = sprig_config::SprigConfig::load_with_dotenv(&project_root)
        .context("failed to load sprig configuration")?;

    let command = cli.command;
    let write_lock = if command_requires_write_lock(&command) {
        Some(write_lock::acquire_for_project(&project_root).await?)
    } else {
        None
    };

    let ctx = context::AppContext::init(project_root, config)
        .await
        .context("failed to initialize sprig application context")?;

    let result = commands::dispatch::dispatch(command, &ctx, &flags).await;
    drop(write_lock);
    result
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("SPRIG_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn resolve_project_root(project_override: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(path) = project_override {
        let explicit = PathBuf::from(path);

        if explicit
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name == context::PROJECT_DIR)
        {
            return explicit
                .parent()
                .map(std::path::Path::to_path_buf)
                .context("invalid --project path: '.sprig' directory has no parent");
        }

        if explicit.join(context::PROJECT_DIR).is_dir() {
            return Ok(explicit);
        }

        anyhow::bail!(
            "invalid --project '{}': no .sprig directory (run 'sprig init' there first)",
            explicit.display()
        );
    }

    let start = std::env::current_dir().context("failed to read current directory")?;
    context::find_project_root(&start)
        .context("not a sprig project (no .sprig directory found). Run 'sprig init' first.")
}

fn command_requires_write_lock(command: &cli::Commands) -> bool {
    use crate::cli::subcommands::{
        BatchCommands, ConsumableCommands, OrderCommands, PlanCommands, ProductCommands,
        RecipeCommands, StatsCommands, TaskCommands,
    };

    match command {
        cli::Commands::Recipe { action } => match action {
            RecipeCommands::Get { .. } | RecipeCommands::List { .. } => false,
            RecipeCommands::Watering { steps, .. } => !steps.is_empty(),
            _ => true,
        },
        cli::Commands::Consumable { action } => !matches!(
            action,
            ConsumableCommands::Get { .. }
                | ConsumableCommands::List { .. }
                | ConsumableCommands::LowStock
                | ConsumableCommands::CheckLot { .. }
        ),
        cli::Commands::Product { action } => !matches!(
            action,
            ProductCommands::Get { .. } | ProductCommands::List { .. }
        ),
        cli::Commands::Order { action } => match action {
            OrderCommands::Get { .. } | OrderCommands::List { .. } => false,
            OrderCommands::ProcessRecurring { dry_run, .. } => !dry_run,
            _ => true,
        },
        cli::Commands::Batch { action } => !matches!(
            action,
            BatchCommands::Get { .. } | BatchCommands::List { .. }
        ),
        cli::Commands::Plan { action } => !matches!(
            action,
            PlanCommands::Get { .. } | PlanCommands::List { .. } | PlanCommands::Calendar { .. }
        ),
        cli::Commands::Task { action } => match action {
            TaskCommands::List { .. } => false,
            TaskCommands::Process { dry_run, .. } => !dry_run,
        },
        cli::Commands::Stats { action } => match action {
            StatsCommands::Harvest { .. } => false,
        },
        cli::Commands::Import(args) => !args.dry_run,
        cli::Commands::Export(_) | cli::Commands::Init(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::command_requires_write_lock;
    use crate::cli::Cli;

    fn needs_lock(args: &[&str]) -> bool {
        let cli = Cli::try_parse_from(args).expect("cli should parse");
        command_requires_write_lock(&cli.command)
    }

    #[test]
    fn reads_do_not_take_the_write_lock() {
        assert!(!needs_lock(&["sprig", "recipe", "list"]));
        assert!(!needs_lock(&["sprig", "order", "get", "ord-1"]));
        assert!(!needs_lock(&["sprig", "plan", "calendar"]));
        assert!(!needs_lock(&["sprig", "stats", "harvest"]));
        assert!(!needs_lock(&["sprig", "export", "--output", "x.tar.gz"]));
    }

    #[test]
    fn dry_runs_do_not_take_the_write_lock() {
        assert!(!needs_lock(&["sprig", "order", "process-recurring", "--dry-run"]));
        assert!(!needs_lock(&["sprig", "task", "process", "--dry-run"]));
        assert!(!needs_lock(&["sprig", "import", "b.tar.gz", "--dry-run"]));
    }

    #[test]
    fn writes_take_the_write_lock() {
        assert!(needs_lock(&["sprig", "order", "process-recurring"]));
        assert!(needs_lock(&["sprig", "task", "process"]));
        assert!(needs_lock(&["sprig", "batch", "advance", "bat-1"]));
        assert!(needs_lock(&["sprig", "import", "b.tar.gz"]));
        assert!(needs_lock(&["sprig", "recipe", "watering", "rcp-1", "--step", "1:500"]));
        assert!(!needs_lock(&["sprig", "recipe", "watering", "rcp-1"]));
    }
}
