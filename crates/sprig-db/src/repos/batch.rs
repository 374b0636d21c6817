//! Crop batch repository and crop lifecycle actions.
//!
//! A batch is a set of trays planted together from one recipe. Every crop in
//! a batch moves through the stages in lockstep:
//!
//! ```text
//! soaking → germination → blackout → light → harvested
//! ```
//!
//! Each lifecycle action runs in one transaction: it updates the crops,
//! closes the batch's open crop tasks, and schedules the task that ends the
//! new stage.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sprig_core::entities::{BatchDetail, Crop, CropBatch, Harvest, Recipe};
use sprig_core::enums::CropStage;
use sprig_core::growth::{expected_harvest_at, initial_stage, next_stage, stage_due_at};
use sprig_core::ids::{PREFIX_BATCH, PREFIX_CROP, PREFIX_HARVEST};

use crate::error::DatabaseError;
use crate::helpers::{
    clean_opt, get_bool, get_opt_f64, get_opt_string, now, parse_datetime, parse_enum,
    parse_optional_datetime, stored_precision, ts,
};
use crate::service::SprigService;

const BATCH_COLS: &str = "id, recipe_id, order_id, tray_count, awaiting_trays, notes, created_at";

const CROP_COLS: &str = "id, batch_id, recipe_id, order_id, tray_number, stage, planted_at, \
     soaking_at, germination_at, blackout_at, light_at, harvested_at, harvest_weight_grams, \
     created_at, updated_at";

fn row_to_batch(row: &libsql::Row) -> Result<CropBatch, DatabaseError> {
    Ok(CropBatch {
        id: row.get(0)?,
        recipe_id: row.get(1)?,
        order_id: get_opt_string(row, 2)?,
        tray_count: row.get(3)?,
        awaiting_trays: get_bool(row, 4)?,
        notes: get_opt_string(row, 5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

fn row_to_crop(row: &libsql::Row) -> Result<Crop, DatabaseError> {
    Ok(Crop {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        recipe_id: row.get(2)?,
        order_id: get_opt_string(row, 3)?,
        tray_number: row.get(4)?,
        stage: parse_enum(&row.get::<String>(5)?)?,
        planted_at: parse_datetime(&row.get::<String>(6)?)?,
        soaking_at: parse_optional_datetime(get_opt_string(row, 7)?.as_deref())?,
        germination_at: parse_optional_datetime(get_opt_string(row, 8)?.as_deref())?,
        blackout_at: parse_optional_datetime(get_opt_string(row, 9)?.as_deref())?,
        light_at: parse_optional_datetime(get_opt_string(row, 10)?.as_deref())?,
        harvested_at: parse_optional_datetime(get_opt_string(row, 11)?.as_deref())?,
        harvest_weight_grams: get_opt_f64(row, 12)?,
        created_at: parse_datetime(&row.get::<String>(13)?)?,
        updated_at: parse_datetime(&row.get::<String>(14)?)?,
    })
}

/// Input for [`SprigService::create_crop_batch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCropBatch {
    pub recipe_id: String,
    pub tray_numbers: Vec<String>,
    pub planted_at: DateTime<Utc>,
    pub order_id: Option<String>,
    pub notes: Option<String>,
}

/// Rows for a batch about to be inserted.
struct BatchRows<'a> {
    recipe: &'a Recipe,
    batch_id: String,
    order_id: Option<&'a str>,
    trays: Vec<String>,
    stage: CropStage,
    planted_at: DateTime<Utc>,
    awaiting_trays: bool,
    notes: Option<String>,
}

/// Single stage shared by all crops. Mixed or empty batches cannot be acted on.
fn common_stage(batch_id: &str, crops: &[Crop]) -> Result<CropStage, DatabaseError> {
    let first = crops
        .first()
        .ok_or_else(|| DatabaseError::InvalidState(format!("batch {batch_id} has no crops")))?;
    if let Some(other) = crops.iter().find(|c| c.stage != first.stage) {
        return Err(DatabaseError::InvalidState(format!(
            "batch {batch_id} has crops in mixed stages ({} and {})",
            first.stage, other.stage
        )));
    }
    Ok(first.stage)
}

fn check_not_before(
    batch_id: &str,
    crops: &[Crop],
    stage: CropStage,
    at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let entered = crops.iter().filter_map(|c| c.entered_at(stage)).max();
    if let Some(entered) = entered.filter(|entered| at < *entered) {
        return Err(DatabaseError::Validation(format!(
            "batch {batch_id} entered {stage} at {}; cannot leave it at {}",
            ts(entered),
            ts(at)
        )));
    }
    Ok(())
}

impl SprigService {
    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub(crate) async fn get_batch_row(&self, batch_id: &str) -> Result<CropBatch, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {BATCH_COLS} FROM crop_batches WHERE id = ?1"),
                [batch_id],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| DatabaseError::NotFound {
            entity: "crop batch",
            id: batch_id.to_string(),
        })?;
        row_to_batch(&row)
    }

    pub async fn batch_crops(&self, batch_id: &str) -> Result<Vec<Crop>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {CROP_COLS} FROM crops WHERE batch_id = ?1 ORDER BY tray_number"),
                [batch_id],
            )
            .await?;

        let mut crops = Vec::new();
        while let Some(row) = rows.next().await? {
            crops.push(row_to_crop(&row)?);
        }
        Ok(crops)
    }

    /// Stage shared by every crop of the batch.
    pub async fn batch_stage(&self, batch_id: &str) -> Result<CropStage, DatabaseError> {
        let crops = self.batch_crops(batch_id).await?;
        common_stage(batch_id, &crops)
    }

    async fn batch_detail(&self, batch: CropBatch) -> Result<BatchDetail, DatabaseError> {
        let recipe = self.get_recipe(&batch.recipe_id).await?;
        let crops = self.batch_crops(&batch.id).await?;
        let stage = common_stage(&batch.id, &crops).ok();

        let (stage_due, expected_harvest) = match (stage, crops.first()) {
            (Some(CropStage::Harvested), Some(crop)) => (None, crop.harvested_at),
            (Some(stage), Some(crop)) => (
                crop.entered_at(stage)
                    .and_then(|entered| stage_due_at(&recipe, stage, entered)),
                Some(expected_harvest_at(&recipe, crop.planted_at)),
            ),
            _ => (None, None),
        };

        Ok(BatchDetail {
            batch,
            recipe_name: recipe.name,
            stage,
            stage_due_at: stage_due,
            expected_harvest_at: expected_harvest,
            crops,
        })
    }

    pub async fn get_batch(&self, batch_id: &str) -> Result<BatchDetail, DatabaseError> {
        let batch = self.get_batch_row(batch_id).await?;
        self.batch_detail(batch).await
    }

    /// Newest batches first, optionally only those with crops in `stage`.
    pub async fn list_batches(
        &self,
        stage: Option<CropStage>,
        limit: u32,
    ) -> Result<Vec<BatchDetail>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {BATCH_COLS} FROM crop_batches
                     WHERE (?1 = '' OR id IN (SELECT batch_id FROM crops WHERE stage = ?1))
                     ORDER BY created_at DESC LIMIT {limit}"
                ),
                [stage.map_or("", CropStage::as_str)],
            )
            .await?;

        let mut batches = Vec::new();
        while let Some(row) = rows.next().await? {
            batches.push(row_to_batch(&row)?);
        }

        let mut details = Vec::with_capacity(batches.len());
        for batch in batches {
            details.push(self.batch_detail(batch).await?);
        }
        Ok(details)
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Trim and check tray numbers. A tray may only hold one growing crop.
    async fn validate_tray_numbers(
        &self,
        trays: &[String],
        exclude_batch: Option<&str>,
    ) -> Result<Vec<String>, DatabaseError> {
        let mut seen = HashSet::new();
        let mut cleaned = Vec::with_capacity(trays.len());
        for raw in trays {
            let tray = raw.trim();
            if tray.is_empty() {
                return Err(DatabaseError::Validation("tray number must not be empty".into()));
            }
            if !seen.insert(tray.to_string()) {
                return Err(DatabaseError::Validation(format!(
                    "tray {tray} is listed more than once"
                )));
            }
            cleaned.push(tray.to_string());
        }
        if cleaned.is_empty() {
            return Err(DatabaseError::Validation("at least one tray is required".into()));
        }

        for tray in &cleaned {
            let mut rows = self
                .db()
                .conn()
                .query(
                    "SELECT batch_id FROM crops
                     WHERE tray_number = ?1 AND stage <> 'harvested' AND batch_id <> ?2",
                    libsql::params![tray.as_str(), exclude_batch.unwrap_or("")],
                )
                .await?;
            if let Some(row) = rows.next().await? {
                let holder: String = row.get(0)?;
                return Err(DatabaseError::InvalidState(format!(
                    "tray {tray} is still growing in batch {holder}"
                )));
            }
        }
        Ok(cleaned)
    }

    async fn insert_batch_rows(&self, rows: BatchRows<'_>) -> Result<(), DatabaseError> {
        let recipe = rows.recipe;
        let tray_count = i64::try_from(rows.trays.len())
            .map_err(|_| DatabaseError::Validation("too many trays".into()))?;

        if let Some(ref seed_id) = recipe.seed_consumable_id {
            #[allow(clippy::cast_precision_loss)]
            let grams = recipe.seed_density_grams * tray_count as f64;
            if grams > 0.0 {
                self.apply_stock_delta(seed_id, -grams).await?;
                tracing::debug!(seed_id = %seed_id, grams, "seed deducted for batch");
            }
        }

        let now = now();
        self.db()
            .conn()
            .execute(
                &format!("INSERT INTO crop_batches ({BATCH_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                libsql::params![
                    rows.batch_id.as_str(),
                    recipe.id.as_str(),
                    rows.order_id,
                    tray_count,
                    i64::from(rows.awaiting_trays),
                    rows.notes.as_deref(),
                    ts(now)
                ],
            )
            .await?;

        let stage_column = rows.stage.timestamp_column();
        for tray in &rows.trays {
            let crop_id = self.db().generate_id(PREFIX_CROP).await?;
            self.db()
                .conn()
                .execute(
                    &format!(
                        "INSERT INTO crops (id, batch_id, recipe_id, order_id, tray_number, stage,
                                            planted_at, {stage_column}, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8, ?8)"
                    ),
                    libsql::params![
                        crop_id.as_str(),
                        rows.batch_id.as_str(),
                        recipe.id.as_str(),
                        rows.order_id,
                        tray.as_str(),
                        rows.stage.as_str(),
                        ts(rows.planted_at),
                        ts(now)
                    ],
                )
                .await?;
        }

        self.schedule_stage_task(recipe, &rows.batch_id, rows.stage, rows.planted_at)
            .await?;
        Ok(())
    }

    /// Create a batch without opening a transaction. Returns the batch id.
    pub(crate) async fn insert_crop_batch(
        &self,
        input: &NewCropBatch,
    ) -> Result<String, DatabaseError> {
        let recipe = self.get_recipe(&input.recipe_id).await?;
        if !recipe.is_active {
            return Err(DatabaseError::InvalidState(format!(
                "recipe {} ({}) is inactive",
                recipe.name, recipe.id
            )));
        }
        if let Some(ref order_id) = input.order_id {
            self.get_order_row(order_id).await?;
        }
        let trays = self.validate_tray_numbers(&input.tray_numbers, None).await?;
        let batch_id = self.db().generate_id(PREFIX_BATCH).await?;

        self.insert_batch_rows(BatchRows {
            recipe: &recipe,
            batch_id: batch_id.clone(),
            order_id: input.order_id.as_deref(),
            trays,
            stage: initial_stage(&recipe),
            planted_at: stored_precision(input.planted_at),
            awaiting_trays: false,
            notes: clean_opt(input.notes.as_deref()),
        })
        .await?;
        Ok(batch_id)
    }

    /// Plant trays from a recipe. Crops start in the recipe's first stage.
    pub async fn create_crop_batch(
        &self,
        input: &NewCropBatch,
    ) -> Result<BatchDetail, DatabaseError> {
        let tx = self.begin().await?;
        let result = self.insert_crop_batch(input).await;
        let batch_id = Self::finish(tx, result).await?;

        tracing::info!(
            batch_id = %batch_id,
            recipe_id = %input.recipe_id,
            trays = input.tray_numbers.len(),
            "crop batch created"
        );
        self.get_batch(&batch_id).await
    }

    /// Start soaking seed for `tray_count` trays before tray numbers are known.
    ///
    /// Crops get provisional labels `<batch_id>/<n>` until
    /// [`SprigService::advance_from_soaking`] assigns real trays.
    pub async fn start_soaking(
        &self,
        recipe_id: &str,
        tray_count: u32,
        at: DateTime<Utc>,
    ) -> Result<BatchDetail, DatabaseError> {
        let recipe = self.get_recipe(recipe_id).await?;
        if !recipe.is_active {
            return Err(DatabaseError::InvalidState(format!(
                "recipe {} ({}) is inactive",
                recipe.name, recipe.id
            )));
        }
        if !recipe.requires_soaking() {
            return Err(DatabaseError::InvalidState(format!(
                "recipe {} does not soak its seed",
                recipe.name
            )));
        }
        if tray_count == 0 {
            return Err(DatabaseError::Validation("at least one tray is required".into()));
        }

        let batch_id = self.db().generate_id(PREFIX_BATCH).await?;
        let trays = (1..=tray_count).map(|n| format!("{batch_id}/{n}")).collect();

        let tx = self.begin().await?;
        let result = self
            .insert_batch_rows(BatchRows {
                recipe: &recipe,
                batch_id: batch_id.clone(),
                order_id: None,
                trays,
                stage: CropStage::Soaking,
                planted_at: stored_precision(at),
                awaiting_trays: true,
                notes: None,
            })
            .await;
        Self::finish(tx, result).await?;

        tracing::info!(batch_id = %batch_id, recipe_id, tray_count, "soaking started");
        self.get_batch(&batch_id).await
    }

    // -----------------------------------------------------------------------
    // Stage changes
    // -----------------------------------------------------------------------

    async fn set_stage(
        &self,
        batch_id: &str,
        stage: CropStage,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let column = stage.timestamp_column();
        self.db()
            .conn()
            .execute(
                &format!(
                    "UPDATE crops SET stage = ?1, {column} = ?2, updated_at = ?3 WHERE batch_id = ?4"
                ),
                libsql::params![stage.as_str(), ts(at), ts(now()), batch_id],
            )
            .await?;
        Ok(())
    }

    pub(crate) async fn advance_from_soaking_rows(
        &self,
        batch_id: &str,
        tray_numbers: Option<&[String]>,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let batch = self.get_batch_row(batch_id).await?;
        let crops = self.batch_crops(batch_id).await?;
        let stage = common_stage(batch_id, &crops)?;
        if stage != CropStage::Soaking {
            return Err(DatabaseError::InvalidState(format!(
                "batch {batch_id} is in {stage}, not soaking"
            )));
        }
        check_not_before(batch_id, &crops, stage, at)?;
        let recipe = self.get_recipe(&batch.recipe_id).await?;

        match (batch.awaiting_trays, tray_numbers) {
            (true, None) => {
                return Err(DatabaseError::Validation(format!(
                    "batch {batch_id} needs {} tray numbers before germination",
                    crops.len()
                )));
            }
            (true, Some(trays)) => {
                if trays.len() != crops.len() {
                    return Err(DatabaseError::Validation(format!(
                        "batch {batch_id} has {} crops but {} tray numbers were given",
                        crops.len(),
                        trays.len()
                    )));
                }
                let trays = self.validate_tray_numbers(trays, Some(batch_id)).await?;
                for (crop, tray) in crops.iter().zip(&trays) {
                    self.db()
                        .conn()
                        .execute(
                            "UPDATE crops SET tray_number = ?1 WHERE id = ?2",
                            libsql::params![tray.as_str(), crop.id.as_str()],
                        )
                        .await?;
                }
                self.db()
                    .conn()
                    .execute(
                        "UPDATE crop_batches SET awaiting_trays = 0 WHERE id = ?1",
                        [batch_id],
                    )
                    .await?;
            }
            (false, Some(_)) => {
                return Err(DatabaseError::Validation(format!(
                    "batch {batch_id} already has tray numbers"
                )));
            }
            (false, None) => {}
        }

        self.set_stage(batch_id, CropStage::Germination, at).await?;
        self.deactivate_batch_tasks(batch_id, "stage advanced", at)
            .await?;
        self.schedule_stage_task(&recipe, batch_id, CropStage::Germination, at)
            .await?;
        Ok(())
    }

    /// Move a soaking batch into germination, assigning tray numbers if it awaits them.
    pub async fn advance_from_soaking(
        &self,
        batch_id: &str,
        tray_numbers: Option<&[String]>,
        at: DateTime<Utc>,
    ) -> Result<BatchDetail, DatabaseError> {
        let at = stored_precision(at);
        let tx = self.begin().await?;
        let result = self.advance_from_soaking_rows(batch_id, tray_numbers, at).await;
        Self::finish(tx, result).await?;

        tracing::info!(batch_id, "soaking ended");
        self.get_batch(batch_id).await
    }

    /// Returns the stage the batch moved into.
    pub(crate) async fn advance_stage_rows(
        &self,
        batch_id: &str,
        at: DateTime<Utc>,
    ) -> Result<CropStage, DatabaseError> {
        let batch = self.get_batch_row(batch_id).await?;
        let crops = self.batch_crops(batch_id).await?;
        let stage = common_stage(batch_id, &crops)?;
        match stage {
            CropStage::Soaking => {
                return Err(DatabaseError::InvalidState(format!(
                    "batch {batch_id} is soaking; end soaking to move it to germination"
                )));
            }
            CropStage::Harvested => {
                return Err(DatabaseError::InvalidState(format!(
                    "batch {batch_id} is already harvested"
                )));
            }
            CropStage::Germination | CropStage::Blackout | CropStage::Light => {}
        }
        check_not_before(batch_id, &crops, stage, at)?;
        let recipe = self.get_recipe(&batch.recipe_id).await?;
        let next = next_stage(&recipe, stage).ok_or_else(|| {
            DatabaseError::InvalidState(format!("batch {batch_id} has no stage after {stage}"))
        })?;

        self.set_stage(batch_id, next, at).await?;
        self.deactivate_batch_tasks(batch_id, "stage advanced", at)
            .await?;
        self.schedule_stage_task(&recipe, batch_id, next, at).await?;
        if next == CropStage::Harvested {
            self.complete_batch_plans(batch_id, at).await?;
        }
        Ok(next)
    }

    /// Move a batch to the recipe's next stage.
    pub async fn advance_stage(
        &self,
        batch_id: &str,
        at: DateTime<Utc>,
    ) -> Result<BatchDetail, DatabaseError> {
        let at = stored_precision(at);
        let tx = self.begin().await?;
        let result = self.advance_stage_rows(batch_id, at).await;
        let next = Self::finish(tx, result).await?;

        tracing::info!(batch_id, stage = %next, "batch advanced");
        self.get_batch(batch_id).await
    }

    /// Harvest a batch under light, splitting the weight evenly across its trays.
    pub async fn record_harvest(
        &self,
        batch_id: &str,
        total_weight_grams: f64,
        at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<Harvest, DatabaseError> {
        if !total_weight_grams.is_finite() || total_weight_grams <= 0.0 {
            return Err(DatabaseError::Validation(format!(
                "harvest weight must be positive (got {total_weight_grams})"
            )));
        }
        let at = stored_precision(at);
        let batch = self.get_batch_row(batch_id).await?;
        let crops = self.batch_crops(batch_id).await?;
        let stage = common_stage(batch_id, &crops)?;
        if stage != CropStage::Light {
            return Err(DatabaseError::InvalidState(format!(
                "batch {batch_id} is in {stage}; only batches under light can be harvested"
            )));
        }
        check_not_before(batch_id, &crops, stage, at)?;

        let trays = i64::try_from(crops.len())
            .map_err(|_| DatabaseError::Validation("too many trays".into()))?;
        #[allow(clippy::cast_precision_loss)]
        let per_tray = total_weight_grams / trays as f64;
        let now = now();
        let harvest = Harvest {
            id: self.db().generate_id(PREFIX_HARVEST).await?,
            batch_id: batch_id.to_string(),
            recipe_id: batch.recipe_id.clone(),
            trays,
            total_weight_grams,
            harvested_at: at,
            notes: clean_opt(notes),
            created_at: now,
        };

        let tx = self.begin().await?;
        let result = async {
            self.db()
                .conn()
                .execute(
                    "UPDATE crops SET stage = ?1, harvested_at = ?2, harvest_weight_grams = ?3,
                                      updated_at = ?4
                     WHERE batch_id = ?5",
                    libsql::params![
                        CropStage::Harvested.as_str(),
                        ts(at),
                        per_tray,
                        ts(now),
                        batch_id
                    ],
                )
                .await?;
            self.db()
                .conn()
                .execute(
                    "INSERT INTO harvests (id, batch_id, recipe_id, trays, total_weight_grams,
                                           harvested_at, notes, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    libsql::params![
                        harvest.id.as_str(),
                        batch_id,
                        harvest.recipe_id.as_str(),
                        trays,
                        total_weight_grams,
                        ts(at),
                        harvest.notes.as_deref(),
                        ts(now)
                    ],
                )
                .await?;
            self.deactivate_batch_tasks(batch_id, "harvested", at).await?;
            self.complete_batch_plans(batch_id, at).await
        }
        .await;
        Self::finish(tx, result).await?;

        tracing::info!(batch_id, total_weight_grams, trays, "batch harvested");
        Ok(harvest)
    }

    /// Delete a batch and its crops. Open tasks are left for the task processor.
    ///
    /// Batches with a recorded harvest or a linked crop plan are kept so
    /// harvest statistics and plan history stay intact.
    pub async fn delete_batch(&self, batch_id: &str) -> Result<(), DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT (SELECT COUNT(*) FROM harvests WHERE batch_id = ?1),
                        (SELECT COUNT(*) FROM crop_plans WHERE batch_id = ?1)",
                [batch_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let (harvests, plans): (i64, i64) = (row.get(0)?, row.get(1)?);
        if harvests > 0 {
            return Err(DatabaseError::InvalidState(format!(
                "batch {batch_id} has a recorded harvest and cannot be deleted"
            )));
        }
        if plans > 0 {
            return Err(DatabaseError::InvalidState(format!(
                "batch {batch_id} was planted from a crop plan and cannot be deleted"
            )));
        }

        let changed = self
            .db()
            .conn()
            .execute("DELETE FROM crop_batches WHERE id = ?1", [batch_id])
            .await?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "crop batch",
                id: batch_id.to_string(),
            });
        }
        tracing::info!(batch_id, "crop batch deleted");
        Ok(())
    }
}
