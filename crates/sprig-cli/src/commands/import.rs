use std::path::Path;

use anyhow::Context;
use sprig_db::bundle::ImportOptions;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ImportArgs;
use crate::context::AppContext;
use crate::output::output;
use crate::progress::Progress;

/// Handle `sprig import`.
pub async fn handle(args: &ImportArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let options = ImportOptions {
        force: args.force,
        dry_run: args.dry_run,
    };
    let progress = Progress::spinner(if args.dry_run {
        "Validating bundle"
    } else {
        "Importing bundle"
    });
    let report = match ctx.service.import_bundle(Path::new(&args.file), options).await {
        Ok(report) => report,
        Err(error) => {
            progress.finish_err("Import failed");
            return Err(error).with_context(|| format!("failed to import {}", args.file));
        }
    };
    progress.finish_ok(&format!("{} rows", report.rows_imported));
    tracing::info!(
        file = %args.file,
        dry_run = report.dry_run,
        rows = report.rows_imported,
        "bundle import finished"
    );

    output(&report, flags.format)
}
