use anyhow::Context;
use serde::Serialize;
use sprig_core::entities::CropTask;
use sprig_db::jobs::tasks::TaskRunOptions;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::TaskCommands;
use crate::commands::shared::parse::datetime_or_now;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct TaskListResponse {
    tasks: Vec<CropTask>,
}

/// Handle `sprig task`.
pub async fn handle(
    action: &TaskCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        TaskCommands::List { all, batch } => {
            let tasks = ctx
                .service
                .list_crop_tasks(!*all, batch.as_deref(), ctx.limit(flags.limit))
                .await?;
            output(&TaskListResponse { tasks }, flags.format)
        }
        TaskCommands::Process { dry_run, now } => {
            let now = datetime_or_now(now.as_deref(), "now")?;
            let options = TaskRunOptions {
                dry_run: *dry_run,
                limit: ctx.config.tasks.batch_limit,
            };
            let report = ctx
                .service
                .process_crop_tasks(now, options)
                .await
                .context("crop task run failed")?;
            tracing::info!(
                due = report.due,
                processed = report.processed.len(),
                deactivated = report.deactivated.len(),
                failed = report.failed.len(),
                "crop task run finished"
            );
            output(&report, flags.format)
        }
    }
}
