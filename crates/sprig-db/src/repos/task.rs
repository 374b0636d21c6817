//! Crop task repository: scheduling, listing, and closing tasks.

use chrono::{DateTime, Utc};

use sprig_core::entities::{CropTask, Recipe};
use sprig_core::enums::{CropStage, CropTaskKind};
use sprig_core::growth::stage_due_at;
use sprig_core::ids::PREFIX_CROP_TASK;

use crate::error::DatabaseError;
use crate::helpers::{
    get_bool, get_opt_string, now, parse_datetime, parse_enum, parse_optional_datetime, ts,
};
use crate::service::SprigService;

const SELECT_COLS: &str =
    "id, batch_id, kind, expected_stage, scheduled_at, is_active, processed_at, note, created_at";

fn row_to_task(row: &libsql::Row) -> Result<CropTask, DatabaseError> {
    Ok(CropTask {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        kind: parse_enum(&row.get::<String>(2)?)?,
        expected_stage: parse_enum(&row.get::<String>(3)?)?,
        scheduled_at: parse_datetime(&row.get::<String>(4)?)?,
        is_active: get_bool(row, 5)?,
        processed_at: parse_optional_datetime(get_opt_string(row, 6)?.as_deref())?,
        note: get_opt_string(row, 7)?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

/// Task kind that ends `stage`, if any.
const fn task_kind_for(stage: CropStage) -> Option<CropTaskKind> {
    match stage {
        CropStage::Soaking => Some(CropTaskKind::EndSoaking),
        CropStage::Germination | CropStage::Blackout => Some(CropTaskKind::AdvanceStage),
        CropStage::Light => Some(CropTaskKind::HarvestDue),
        CropStage::Harvested => None,
    }
}

impl SprigService {
    pub(crate) async fn schedule_task(
        &self,
        batch_id: &str,
        kind: CropTaskKind,
        expected_stage: CropStage,
        scheduled_at: DateTime<Utc>,
    ) -> Result<CropTask, DatabaseError> {
        let task = CropTask {
            id: self.db().generate_id(PREFIX_CROP_TASK).await?,
            batch_id: batch_id.to_string(),
            kind,
            expected_stage,
            scheduled_at,
            is_active: true,
            processed_at: None,
            note: None,
            created_at: now(),
        };
        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO crop_tasks ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, 1, NULL, NULL, ?6)"
                ),
                libsql::params![
                    task.id.as_str(),
                    batch_id,
                    kind.as_str(),
                    expected_stage.as_str(),
                    ts(scheduled_at),
                    ts(task.created_at)
                ],
            )
            .await?;
        tracing::debug!(
            task_id = %task.id,
            batch_id,
            kind = %kind,
            scheduled_at = %ts(scheduled_at),
            "crop task scheduled"
        );
        Ok(task)
    }

    /// Schedule the task that ends `stage` for a batch that entered it at `entered_at`.
    pub(crate) async fn schedule_stage_task(
        &self,
        recipe: &Recipe,
        batch_id: &str,
        stage: CropStage,
        entered_at: DateTime<Utc>,
    ) -> Result<Option<CropTask>, DatabaseError> {
        let (Some(kind), Some(due)) = (task_kind_for(stage), stage_due_at(recipe, stage, entered_at))
        else {
            return Ok(None);
        };
        self.schedule_task(batch_id, kind, stage, due).await.map(Some)
    }

    /// Close every open task of a batch.
    pub(crate) async fn deactivate_batch_tasks(
        &self,
        batch_id: &str,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        Ok(self
            .db()
            .conn()
            .execute(
                "UPDATE crop_tasks SET is_active = 0, processed_at = ?1, note = ?2
                 WHERE batch_id = ?3 AND is_active = 1",
                libsql::params![ts(at), note, batch_id],
            )
            .await?)
    }

    /// Close a single task, recording when and why.
    pub(crate) async fn close_task(
        &self,
        task_id: &str,
        note: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                "UPDATE crop_tasks SET is_active = 0, processed_at = ?1, note = ?2 WHERE id = ?3",
                libsql::params![ts(at), note, task_id],
            )
            .await?;
        Ok(())
    }

    /// Active tasks scheduled at or before `now`, oldest first.
    pub(crate) async fn due_tasks(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<CropTask>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM crop_tasks
                     WHERE is_active = 1 AND scheduled_at <= ?1
                     ORDER BY scheduled_at, created_at LIMIT {limit}"
                ),
                [ts(now)],
            )
            .await?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(row_to_task(&row)?);
        }
        Ok(tasks)
    }

    pub async fn get_crop_task(&self, id: &str) -> Result<CropTask, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM crop_tasks WHERE id = ?1"), [id])
            .await?;
        let row = rows.next().await?.ok_or_else(|| DatabaseError::NotFound {
            entity: "crop task",
            id: id.to_string(),
        })?;
        row_to_task(&row)
    }

    pub async fn list_crop_tasks(
        &self,
        active_only: bool,
        batch_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<CropTask>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM crop_tasks
                     WHERE (?1 = 0 OR is_active = 1) AND (?2 = '' OR batch_id = ?2)
                     ORDER BY scheduled_at LIMIT {limit}"
                ),
                libsql::params![i64::from(active_only), batch_id.unwrap_or("")],
            )
            .await?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(row_to_task(&row)?);
        }
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{at, test_service};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn due_tasks_are_ordered_and_bounded_by_time() {
        let svc = test_service().await;
        let late = svc
            .schedule_task("bat-1", CropTaskKind::AdvanceStage, CropStage::Germination, at(2026, 4, 3, 8))
            .await
            .unwrap();
        let early = svc
            .schedule_task("bat-2", CropTaskKind::EndSoaking, CropStage::Soaking, at(2026, 4, 1, 8))
            .await
            .unwrap();
        svc.schedule_task("bat-3", CropTaskKind::HarvestDue, CropStage::Light, at(2026, 4, 9, 8))
            .await
            .unwrap();

        let due = svc.due_tasks(at(2026, 4, 5, 0), 10).await.unwrap();
        let ids: Vec<_> = due.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![early.id.as_str(), late.id.as_str()]);

        assert_eq!(svc.due_tasks(at(2026, 4, 5, 0), 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn closed_tasks_are_not_due() {
        let svc = test_service().await;
        let task = svc
            .schedule_task("bat-1", CropTaskKind::AdvanceStage, CropStage::Germination, at(2026, 4, 1, 8))
            .await
            .unwrap();
        svc.close_task(&task.id, Some("done"), at(2026, 4, 1, 9))
            .await
            .unwrap();

        assert!(svc.due_tasks(at(2026, 4, 2, 0), 10).await.unwrap().is_empty());
        let closed = svc.get_crop_task(&task.id).await.unwrap();
        assert!(!closed.is_active);
        assert_eq!(closed.processed_at, Some(at(2026, 4, 1, 9)));
        assert_eq!(closed.note.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn deactivate_batch_tasks_only_touches_that_batch() {
        let svc = test_service().await;
        for batch in ["bat-1", "bat-1", "bat-2"] {
            svc.schedule_task(batch, CropTaskKind::AdvanceStage, CropStage::Germination, at(2026, 4, 1, 8))
                .await
                .unwrap();
        }
        let closed = svc
            .deactivate_batch_tasks("bat-1", "superseded", at(2026, 4, 1, 9))
            .await
            .unwrap();
        assert_eq!(closed, 2);

        let active = svc.list_crop_tasks(true, None, 10).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].batch_id, "bat-2");
        assert_eq!(svc.list_crop_tasks(false, Some("bat-1"), 10).await.unwrap().len(), 2);
    }
}
