//! Growth schedule math.
//!
//! Everything here is derived from a [`Recipe`]'s stage lengths. Stages with a
//! zero length (no soaking, no blackout) are skipped when walking forward.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::entities::Recipe;
use crate::enums::CropStage;
use crate::errors::CoreError;

#[allow(clippy::cast_possible_truncation)]
fn hours(value: f64) -> Duration {
    Duration::seconds((value * 3600.0).round() as i64)
}

fn days(value: f64) -> Duration {
    hours(value * 24.0)
}

/// How long a crop following `recipe` spends in `stage`.
#[must_use]
pub fn stage_duration(recipe: &Recipe, stage: CropStage) -> Duration {
    match stage {
        CropStage::Soaking => hours(recipe.seed_soak_hours.max(0.0)),
        CropStage::Germination => days(recipe.germination_days.max(0.0)),
        CropStage::Blackout => days(recipe.blackout_days.max(0.0)),
        CropStage::Light => days(recipe.light_days.max(0.0)),
        CropStage::Harvested => Duration::zero(),
    }
}

/// Stage a new crop starts in.
#[must_use]
pub fn initial_stage(recipe: &Recipe) -> CropStage {
    if recipe.requires_soaking() {
        CropStage::Soaking
    } else {
        CropStage::Germination
    }
}

/// Recipe-aware successor of `stage`. Skips blackout for recipes without one.
#[must_use]
pub fn next_stage(recipe: &Recipe, stage: CropStage) -> Option<CropStage> {
    match stage {
        CropStage::Soaking => Some(CropStage::Germination),
        CropStage::Germination if recipe.blackout_days > 0.0 => Some(CropStage::Blackout),
        CropStage::Germination | CropStage::Blackout => Some(CropStage::Light),
        CropStage::Light => Some(CropStage::Harvested),
        CropStage::Harvested => None,
    }
}

/// When a crop that entered `stage` at `entered_at` is due to leave it.
#[must_use]
pub fn stage_due_at(
    recipe: &Recipe,
    stage: CropStage,
    entered_at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if stage == CropStage::Harvested {
        return None;
    }
    Some(entered_at + stage_duration(recipe, stage))
}

/// Total growing time from soaking (or sowing) to harvest, in days.
#[must_use]
pub fn days_to_maturity(recipe: &Recipe) -> f64 {
    recipe.seed_soak_hours.max(0.0) / 24.0
        + recipe.germination_days.max(0.0)
        + recipe.blackout_days.max(0.0)
        + recipe.light_days.max(0.0)
}

/// Expected harvest time for a crop planted at `planted_at`.
#[must_use]
pub fn expected_harvest_at(recipe: &Recipe, planted_at: DateTime<Utc>) -> DateTime<Utc> {
    let total = [
        CropStage::Soaking,
        CropStage::Germination,
        CropStage::Blackout,
        CropStage::Light,
    ]
    .into_iter()
    .map(|stage| stage_duration(recipe, stage))
    .fold(Duration::zero(), |acc, d| acc + d);
    planted_at + total
}

/// Latest planting date that still reaches `harvest_date`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn plant_by(recipe: &Recipe, harvest_date: NaiveDate) -> NaiveDate {
    let lead = days_to_maturity(recipe).ceil() as i64;
    harvest_date - Duration::days(lead)
}

/// Trays required to produce `grams` of harvest.
///
/// # Errors
///
/// Returns `CoreError::Validation` if the recipe has no positive expected
/// yield or `grams` is negative.
#[allow(clippy::cast_possible_truncation)]
pub fn trays_needed(recipe: &Recipe, grams: f64) -> Result<i64, CoreError> {
    if recipe.expected_yield_grams <= 0.0 {
        return Err(CoreError::Validation(format!(
            "recipe '{}' has no expected yield; cannot size trays",
            recipe.name
        )));
    }
    if grams < 0.0 {
        return Err(CoreError::Validation(format!(
            "grams needed must not be negative (got {grams})"
        )));
    }
    Ok((grams / recipe.expected_yield_grams).ceil() as i64)
}
