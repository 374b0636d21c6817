//! Harvest statistics per recipe.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;
use crate::helpers::{get_f64, get_opt_string, parse_datetime, parse_optional_datetime, ts};
use crate::service::SprigService;

/// Restricts which harvests are counted. Dates are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestStatsFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub recipe_id: Option<String>,
}

/// Aggregated harvest results of one recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeHarvestStats {
    pub recipe_id: String,
    pub recipe_name: String,
    pub batches: i64,
    pub trays: i64,
    pub total_weight_grams: f64,
    pub avg_weight_per_tray: f64,
    /// Mean time from planting to harvest. `None` when no planting time is known.
    pub avg_days_to_harvest: Option<f64>,
    pub expected_yield_grams: f64,
    /// `avg_weight_per_tray / expected_yield_grams`; `None` without an expected yield.
    pub yield_ratio: Option<f64>,
}

#[derive(Default)]
struct Accumulator {
    recipe_name: String,
    expected_yield_grams: f64,
    batches: i64,
    trays: i64,
    total_weight_grams: f64,
    growing_days: Vec<f64>,
}

fn midnight(date: NaiveDate) -> String {
    ts(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

impl SprigService {
    pub async fn harvest_stats(
        &self,
        filter: &HarvestStatsFilter,
    ) -> Result<Vec<RecipeHarvestStats>, DatabaseError> {
        let from = filter.from.map(midnight).unwrap_or_default();
        let to = match filter.to {
            Some(to) => to
                .checked_add_days(Days::new(1))
                .map(midnight)
                .ok_or_else(|| DatabaseError::Validation(format!("date {to} is out of range")))?,
            None => String::new(),
        };

        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT h.recipe_id, r.name, r.expected_yield_grams, h.trays, h.total_weight_grams,
                        h.harvested_at,
                        (SELECT MIN(c.planted_at) FROM crops c WHERE c.batch_id = h.batch_id)
                 FROM harvests h JOIN recipes r ON r.id = h.recipe_id
                 WHERE (?1 = '' OR h.harvested_at >= ?1)
                   AND (?2 = '' OR h.harvested_at < ?2)
                   AND (?3 = '' OR h.recipe_id = ?3)",
                libsql::params![from, to, filter.recipe_id.as_deref().unwrap_or("")],
            )
            .await?;

        let mut per_recipe: BTreeMap<String, Accumulator> = BTreeMap::new();
        while let Some(row) = rows.next().await? {
            let recipe_id: String = row.get(0)?;
            let acc = per_recipe.entry(recipe_id).or_default();
            acc.recipe_name = row.get(1)?;
            acc.expected_yield_grams = get_f64(&row, 2)?;
            acc.batches += 1;
            acc.trays += row.get::<i64>(3)?;
            acc.total_weight_grams += get_f64(&row, 4)?;

            let harvested_at = parse_datetime(&row.get::<String>(5)?)?;
            if let Some(planted_at) = parse_optional_datetime(get_opt_string(&row, 6)?.as_deref())? {
                #[allow(clippy::cast_precision_loss)]
                let days = (harvested_at - planted_at).num_seconds() as f64 / 86_400.0;
                acc.growing_days.push(days);
            }
        }

        let mut stats: Vec<RecipeHarvestStats> = per_recipe
            .into_iter()
            .map(|(recipe_id, acc)| {
                #[allow(clippy::cast_precision_loss)]
                let avg_weight_per_tray = if acc.trays > 0 {
                    acc.total_weight_grams / acc.trays as f64
                } else {
                    0.0
                };
                #[allow(clippy::cast_precision_loss)]
                let avg_days_to_harvest = (!acc.growing_days.is_empty()).then(|| {
                    acc.growing_days.iter().sum::<f64>() / acc.growing_days.len() as f64
                });
                let yield_ratio = (acc.expected_yield_grams > 0.0)
                    .then(|| avg_weight_per_tray / acc.expected_yield_grams);
                RecipeHarvestStats {
                    recipe_id,
                    recipe_name: acc.recipe_name,
                    batches: acc.batches,
                    trays: acc.trays,
                    total_weight_grams: acc.total_weight_grams,
                    avg_weight_per_tray,
                    avg_days_to_harvest,
                    expected_yield_grams: acc.expected_yield_grams,
                    yield_ratio,
                }
            })
            .collect();
        stats.sort_by(|a, b| a.recipe_name.cmp(&b.recipe_name));
        Ok(stats)
    }
}
