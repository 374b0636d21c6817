//! Processing of due crop tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sprig_core::entities::CropTask;
use sprig_core::enums::{CropStage, CropTaskKind};
use sprig_core::growth::next_stage;

use crate::error::DatabaseError;
use crate::helpers::stored_precision;
use crate::service::SprigService;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskRunOptions {
    pub dry_run: bool,
    /// Most due tasks handled in one run.
    pub limit: u32,
}

impl Default for TaskRunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            limit: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTask {
    pub task_id: String,
    pub batch_id: String,
    pub kind: CropTaskKind,
    /// Stage the batch moved into; `None` for harvest reminders.
    pub new_stage: Option<CropStage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTask {
    pub task_id: String,
    pub batch_id: String,
    pub kind: CropTaskKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTask {
    pub task_id: String,
    pub batch_id: String,
    pub kind: CropTaskKind,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRunReport {
    pub now: DateTime<Utc>,
    pub dry_run: bool,
    pub due: usize,
    pub processed: Vec<ProcessedTask>,
    /// Tasks closed without acting on the batch.
    pub deactivated: Vec<SkippedTask>,
    /// Tasks that errored; they stay active for the next run.
    pub failed: Vec<FailedTask>,
}

enum Outcome {
    Processed(Option<CropStage>),
    Deactivated(&'static str),
}

impl SprigService {
    /// Act on every active crop task scheduled at or before `now`.
    pub async fn process_crop_tasks(
        &self,
        now: DateTime<Utc>,
        options: TaskRunOptions,
    ) -> Result<TaskRunReport, DatabaseError> {
        let now = stored_precision(now);
        let due = self.due_tasks(now, options.limit).await?;
        let mut report = TaskRunReport {
            now,
            dry_run: options.dry_run,
            due: due.len(),
            processed: Vec::new(),
            deactivated: Vec::new(),
            failed: Vec::new(),
        };

        for task in &due {
            match self.process_task(task, now, options.dry_run).await {
                Ok(None) => {}
                Ok(Some(Outcome::Processed(new_stage))) => report.processed.push(ProcessedTask {
                    task_id: task.id.clone(),
                    batch_id: task.batch_id.clone(),
                    kind: task.kind,
                    new_stage,
                }),
                Ok(Some(Outcome::Deactivated(reason))) => report.deactivated.push(SkippedTask {
                    task_id: task.id.clone(),
                    batch_id: task.batch_id.clone(),
                    kind: task.kind,
                    reason: reason.to_string(),
                }),
                Err(error) => {
                    tracing::warn!(task_id = %task.id, batch_id = %task.batch_id, %error, "crop task failed");
                    report.failed.push(FailedTask {
                        task_id: task.id.clone(),
                        batch_id: task.batch_id.clone(),
                        kind: task.kind,
                        error: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            dry_run = options.dry_run,
            due = report.due,
            processed = report.processed.len(),
            deactivated = report.deactivated.len(),
            failed = report.failed.len(),
            "crop tasks processed"
        );
        Ok(report)
    }

    /// `Ok(None)` when an earlier task in the same run already closed this one.
    async fn process_task(
        &self,
        task: &CropTask,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<Option<Outcome>, DatabaseError> {
        if !dry_run && !self.get_crop_task(&task.id).await?.is_active {
            return Ok(None);
        }

        let batch = match self.get_batch_row(&task.batch_id).await {
            Ok(batch) => batch,
            Err(DatabaseError::NotFound { .. }) => {
                return self.skip_task(task, "batch missing", now, dry_run).await;
            }
            Err(e) => return Err(e),
        };
        let stage = self.batch_stage(&task.batch_id).await?;
        if stage != task.expected_stage {
            return self.skip_task(task, "stale", now, dry_run).await;
        }

        match task.kind {
            CropTaskKind::EndSoaking if batch.awaiting_trays => {
                tracing::warn!(batch_id = %batch.id, "soaking finished; batch needs tray numbers");
                self.skip_task(task, "needs tray assignment", now, dry_run).await
            }
            CropTaskKind::EndSoaking => {
                if !dry_run {
                    let tx = self.begin().await?;
                    let result = self.advance_from_soaking_rows(&batch.id, None, now).await;
                    Self::finish(tx, result).await?;
                    tracing::info!(batch_id = %batch.id, "soaking ended by task");
                }
                Ok(Some(Outcome::Processed(Some(CropStage::Germination))))
            }
            CropTaskKind::AdvanceStage => {
                let next = if dry_run {
                    let recipe = self.get_recipe(&batch.recipe_id).await?;
                    next_stage(&recipe, stage).ok_or_else(|| {
                        DatabaseError::InvalidState(format!(
                            "batch {} has no stage after {stage}",
                            batch.id
                        ))
                    })?
                } else {
                    let tx = self.begin().await?;
                    let result = self.advance_stage_rows(&batch.id, now).await;
                    let next = Self::finish(tx, result).await?;
                    tracing::info!(batch_id = %batch.id, stage = %next, "batch advanced by task");
                    next
                };
                Ok(Some(Outcome::Processed(Some(next))))
            }
            CropTaskKind::HarvestDue => {
                if !dry_run {
                    self.close_task(&task.id, Some("harvest due"), now).await?;
                }
                tracing::info!(batch_id = %batch.id, "batch is ready to harvest");
                Ok(Some(Outcome::Processed(None)))
            }
        }
    }

    async fn skip_task(
        &self,
        task: &CropTask,
        reason: &'static str,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<Option<Outcome>, DatabaseError> {
        if !dry_run {
            self.close_task(&task.id, Some(reason), now).await?;
        }
        tracing::warn!(task_id = %task.id, reason, "crop task closed without action");
        Ok(Some(Outcome::Deactivated(reason)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::batch::NewCropBatch;
    use crate::test_support::helpers::{
        at, plain_recipe_input, seed_recipe, soaking_recipe_input, test_service, trays,
    };
    use pretty_assertions::assert_eq;

    async fn plant(svc: &SprigService, recipe_id: &str, labels: &[&str]) -> String {
        svc.create_crop_batch(&NewCropBatch {
            recipe_id: recipe_id.to_string(),
            tray_numbers: trays(labels),
            planted_at: at(2026, 5, 1, 8),
            order_id: None,
            notes: None,
        })
        .await
        .unwrap()
        .batch
        .id
    }

    #[tokio::test]
    async fn nothing_due_before_schedule() {
        let svc = test_service().await;
        let recipe = seed_recipe(&svc, plain_recipe_input("Radish")).await;
        plant(&svc, &recipe.id, &["A1"]).await;

        let report = svc
            .process_crop_tasks(at(2026, 5, 2, 8), TaskRunOptions::default())
            .await
            .unwrap();
        assert_eq!(report.due, 0);
    }

    #[tokio::test]
    async fn end_soaking_moves_batch_to_germination() {
        let svc = test_service().await;
        let recipe = seed_recipe(&svc, soaking_recipe_input("Sunflower")).await;
        let batch_id = plant(&svc, &recipe.id, &["S1", "S2"]).await;

        let report = svc
            .process_crop_tasks(at(2026, 5, 1, 18), TaskRunOptions::default())
            .await
            .unwrap();

        assert_eq!(report.due, 1);
        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.processed[0].kind, CropTaskKind::EndSoaking);
        assert_eq!(report.processed[0].new_stage, Some(CropStage::Germination));
        assert_eq!(svc.batch_stage(&batch_id).await.unwrap(), CropStage::Germination);

        // The germination task is now the only open one.
        let open = svc.list_crop_tasks(true, Some(&batch_id), 10).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].kind, CropTaskKind::AdvanceStage);
        assert_eq!(open[0].expected_stage, CropStage::Germination);
        assert_eq!(open[0].scheduled_at, at(2026, 5, 3, 18));
    }

    #[tokio::test]
    async fn advance_stage_task_moves_batch_on() {
        let svc = test_service().await;
        let recipe = seed_recipe(&svc, plain_recipe_input("Radish")).await;
        let batch_id = plant(&svc, &recipe.id, &["A1"]).await;

        let report = svc
            .process_crop_tasks(at(2026, 5, 3, 9), TaskRunOptions::default())
            .await
            .unwrap();

        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.processed[0].new_stage, Some(CropStage::Light));
        assert_eq!(svc.batch_stage(&batch_id).await.unwrap(), CropStage::Light);
    }

    #[tokio::test]
    async fn harvest_due_is_a_reminder_only() {
        let svc = test_service().await;
        let recipe = seed_recipe(&svc, plain_recipe_input("Radish")).await;
        let batch_id = plant(&svc, &recipe.id, &["A1"]).await;
        svc.advance_stage(&batch_id, at(2026, 5, 3, 8)).await.unwrap();

        let report = svc
            .process_crop_tasks(at(2026, 5, 9, 9), TaskRunOptions::default())
            .await
            .unwrap();

        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.processed[0].kind, CropTaskKind::HarvestDue);
        assert_eq!(report.processed[0].new_stage, None);
        assert_eq!(svc.batch_stage(&batch_id).await.unwrap(), CropStage::Light);

        let task = svc.get_crop_task(&report.processed[0].task_id).await.unwrap();
        assert!(!task.is_active);
        assert_eq!(task.note.as_deref(), Some("harvest due"));
    }

    #[tokio::test]
    async fn soaking_without_trays_is_flagged_not_advanced() {
        let svc = test_service().await;
        let recipe = seed_recipe(&svc, soaking_recipe_input("Sunflower")).await;
        let batch = svc
            .start_soaking(&recipe.id, 3, at(2026, 5, 1, 8))
            .await
            .unwrap();

        let report = svc
            .process_crop_tasks(at(2026, 5, 1, 20), TaskRunOptions::default())
            .await
            .unwrap();

        assert!(report.processed.is_empty());
        assert_eq!(report.deactivated.len(), 1);
        assert_eq!(report.deactivated[0].reason, "needs tray assignment");
        assert_eq!(svc.batch_stage(&batch.batch.id).await.unwrap(), CropStage::Soaking);
    }

    #[tokio::test]
    async fn missing_batch_and_stale_stage_close_the_task() {
        let svc = test_service().await;
        let recipe = seed_recipe(&svc, plain_recipe_input("Radish")).await;
        let batch_id = plant(&svc, &recipe.id, &["A1"]).await;
        let stale = svc
            .schedule_task(&batch_id, CropTaskKind::AdvanceStage, CropStage::Blackout, at(2026, 5, 2, 8))
            .await
            .unwrap();
        let orphan = svc
            .schedule_task("bat-gone", CropTaskKind::AdvanceStage, CropStage::Germination, at(2026, 5, 2, 8))
            .await
            .unwrap();

        let report = svc
            .process_crop_tasks(at(2026, 5, 2, 12), TaskRunOptions::default())
            .await
            .unwrap();

        let mut reasons: Vec<_> = report
            .deactivated
            .iter()
            .map(|s| (s.task_id.clone(), s.reason.clone()))
            .collect();
        reasons.sort();
        let mut expected = vec![
            (stale.id.clone(), "stale".to_string()),
            (orphan.id.clone(), "batch missing".to_string()),
        ];
        expected.sort();
        assert_eq!(reasons, expected);
        assert!(!svc.get_crop_task(&orphan.id).await.unwrap().is_active);
        assert_eq!(svc.batch_stage(&batch_id).await.unwrap(), CropStage::Germination);
    }

    #[tokio::test]
    async fn dry_run_reports_without_writing() {
        let svc = test_service().await;
        let recipe = seed_recipe(&svc, plain_recipe_input("Radish")).await;
        let batch_id = plant(&svc, &recipe.id, &["A1"]).await;

        let report = svc
            .process_crop_tasks(
                at(2026, 5, 3, 9),
                TaskRunOptions {
                    dry_run: true,
                    limit: 10,
                },
            )
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.processed[0].new_stage, Some(CropStage::Light));
        assert_eq!(svc.batch_stage(&batch_id).await.unwrap(), CropStage::Germination);
        assert_eq!(svc.list_crop_tasks(true, Some(&batch_id), 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_task_stays_active() {
        let svc = test_service().await;
        let recipe = seed_recipe(&svc, plain_recipe_input("Radish")).await;
        let batch_id = plant(&svc, &recipe.id, &["A1"]).await;
        // Mixed stages make the batch impossible to act on.
        svc.db()
            .conn()
            .execute(
                "INSERT INTO crops (id, batch_id, recipe_id, tray_number, stage, planted_at,
                                    light_at, created_at, updated_at)
                 SELECT 'crp-odd', batch_id, recipe_id, 'A9', 'light', planted_at, planted_at,
                        created_at, updated_at
                 FROM crops WHERE batch_id = ?1",
                [batch_id.as_str()],
            )
            .await
            .unwrap();

        let report = svc
            .process_crop_tasks(at(2026, 5, 3, 9), TaskRunOptions::default())
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        let task = svc.get_crop_task(&report.failed[0].task_id).await.unwrap();
        assert!(task.is_active);
    }
}
