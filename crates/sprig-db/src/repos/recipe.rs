//! Recipe repository: CRUD, watering schedules, and cloning.

use serde::{Deserialize, Serialize};

use sprig_core::entities::{Recipe, WateringStep};
use sprig_core::ids::{PREFIX_RECIPE, PREFIX_WATERING_STEP};

use crate::error::DatabaseError;
use crate::helpers::{clean_opt, get_bool, get_f64, get_opt_string, now, parse_datetime, ts};
use crate::service::SprigService;
use crate::updates::recipe::RecipeUpdate;

const SELECT_COLS: &str = "id, name, seed_variety, seed_consumable_id, soil_consumable_id, \
     seed_density_grams, seed_soak_hours, germination_days, blackout_days, light_days, \
     expected_yield_grams, is_active, notes, created_at, updated_at";

const STEP_COLS: &str = "id, recipe_id, day_number, amount_ml, note";

pub(crate) fn row_to_recipe(row: &libsql::Row) -> Result<Recipe, DatabaseError> {
    Ok(Recipe {
        id: row.get(0)?,
        name: row.get(1)?,
        seed_variety: row.get(2)?,
        seed_consumable_id: get_opt_string(row, 3)?,
        soil_consumable_id: get_opt_string(row, 4)?,
        seed_density_grams: get_f64(row, 5)?,
        seed_soak_hours: get_f64(row, 6)?,
        germination_days: get_f64(row, 7)?,
        blackout_days: get_f64(row, 8)?,
        light_days: get_f64(row, 9)?,
        expected_yield_grams: get_f64(row, 10)?,
        is_active: get_bool(row, 11)?,
        notes: get_opt_string(row, 12)?,
        created_at: parse_datetime(&row.get::<String>(13)?)?,
        updated_at: parse_datetime(&row.get::<String>(14)?)?,
    })
}

fn row_to_step(row: &libsql::Row) -> Result<WateringStep, DatabaseError> {
    Ok(WateringStep {
        id: row.get(0)?,
        recipe_id: row.get(1)?,
        day_number: row.get(2)?,
        amount_ml: get_f64(row, 3)?,
        note: get_opt_string(row, 4)?,
    })
}

/// Input for [`SprigService::create_recipe`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub seed_variety: String,
    pub seed_consumable_id: Option<String>,
    pub soil_consumable_id: Option<String>,
    pub seed_density_grams: f64,
    pub seed_soak_hours: f64,
    pub germination_days: f64,
    pub blackout_days: f64,
    pub light_days: f64,
    pub expected_yield_grams: f64,
    pub notes: Option<String>,
}

/// One entry of a watering schedule to store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWateringStep {
    pub day_number: i64,
    pub amount_ml: f64,
    pub note: Option<String>,
}

fn check_non_negative(field: &str, value: f64) -> Result<(), DatabaseError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DatabaseError::Validation(format!(
            "{field} must be a non-negative number (got {value})"
        )));
    }
    Ok(())
}

fn check_steps(steps: &[NewWateringStep]) -> Result<(), DatabaseError> {
    let mut seen = std::collections::HashSet::new();
    for step in steps {
        if step.day_number < 0 {
            return Err(DatabaseError::Validation(format!(
                "watering day must not be negative (got {})",
                step.day_number
            )));
        }
        check_non_negative("amount_ml", step.amount_ml)?;
        if !seen.insert(step.day_number) {
            return Err(DatabaseError::Validation(format!(
                "watering day {} appears more than once",
                step.day_number
            )));
        }
    }
    Ok(())
}

impl SprigService {
    pub async fn create_recipe(&self, input: &NewRecipe) -> Result<Recipe, DatabaseError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("recipe name must not be empty".into()));
        }
        let seed_variety = input.seed_variety.trim();
        if seed_variety.is_empty() {
            return Err(DatabaseError::Validation("seed variety must not be empty".into()));
        }
        for (field, value) in [
            ("seed_density_grams", input.seed_density_grams),
            ("seed_soak_hours", input.seed_soak_hours),
            ("germination_days", input.germination_days),
            ("blackout_days", input.blackout_days),
            ("light_days", input.light_days),
            ("expected_yield_grams", input.expected_yield_grams),
        ] {
            check_non_negative(field, value)?;
        }
        self.ensure_recipe_name_free(name, None).await?;
        self.ensure_consumable_ref(input.seed_consumable_id.as_deref()).await?;
        self.ensure_consumable_ref(input.soil_consumable_id.as_deref()).await?;

        let now = now();
        let recipe = Recipe {
            id: self.db().generate_id(PREFIX_RECIPE).await?,
            name: name.to_string(),
            seed_variety: seed_variety.to_string(),
            seed_consumable_id: input.seed_consumable_id.clone(),
            soil_consumable_id: input.soil_consumable_id.clone(),
            seed_density_grams: input.seed_density_grams,
            seed_soak_hours: input.seed_soak_hours,
            germination_days: input.germination_days,
            blackout_days: input.blackout_days,
            light_days: input.light_days,
            expected_yield_grams: input.expected_yield_grams,
            is_active: true,
            notes: clean_opt(input.notes.as_deref()),
            created_at: now,
            updated_at: now,
        };
        self.insert_recipe(&recipe).await?;
        tracing::debug!(recipe_id = %recipe.id, name = %recipe.name, "recipe created");
        Ok(recipe)
    }

    async fn insert_recipe(&self, recipe: &Recipe) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO recipes ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
                ),
                libsql::params![
                    recipe.id.as_str(),
                    recipe.name.as_str(),
                    recipe.seed_variety.as_str(),
                    recipe.seed_consumable_id.as_deref(),
                    recipe.soil_consumable_id.as_deref(),
                    recipe.seed_density_grams,
                    recipe.seed_soak_hours,
                    recipe.germination_days,
                    recipe.blackout_days,
                    recipe.light_days,
                    recipe.expected_yield_grams,
                    i64::from(recipe.is_active),
                    recipe.notes.as_deref(),
                    ts(recipe.created_at),
                    ts(recipe.updated_at)
                ],
            )
            .await?;
        Ok(())
    }

    async fn ensure_recipe_name_free(
        &self,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id FROM recipes WHERE name = ?1 AND id <> ?2",
                libsql::params![name, exclude_id.unwrap_or("")],
            )
            .await?;
        if let Some(row) = rows.next().await? {
            let existing: String = row.get(0)?;
            return Err(DatabaseError::Validation(format!(
                "recipe name '{name}' is already used by {existing}"
            )));
        }
        Ok(())
    }

    async fn ensure_consumable_ref(&self, id: Option<&str>) -> Result<(), DatabaseError> {
        let Some(id) = id else {
            return Ok(());
        };
        if !self.db().row_exists("consumables", id).await? {
            return Err(DatabaseError::NotFound {
                entity: "consumable",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    pub async fn get_recipe(&self, id: &str) -> Result<Recipe, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM recipes WHERE id = ?1"), [id])
            .await?;
        let row = rows.next().await?.ok_or_else(|| DatabaseError::NotFound {
            entity: "recipe",
            id: id.to_string(),
        })?;
        row_to_recipe(&row)
    }

    pub async fn list_recipes(
        &self,
        active_only: bool,
        limit: u32,
    ) -> Result<Vec<Recipe>, DatabaseError> {
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM recipes {filter} ORDER BY name LIMIT {limit}"),
                (),
            )
            .await?;

        let mut recipes = Vec::new();
        while let Some(row) = rows.next().await? {
            recipes.push(row_to_recipe(&row)?);
        }
        Ok(recipes)
    }

    pub async fn update_recipe(
        &self,
        recipe_id: &str,
        update: RecipeUpdate,
    ) -> Result<Recipe, DatabaseError> {
        // Existence check first so an empty update on a missing id still fails.
        self.get_recipe(recipe_id).await?;

        let mut sets = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();
        let mut idx = 1usize;

        if let Some(ref name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DatabaseError::Validation("recipe name must not be empty".into()));
            }
            self.ensure_recipe_name_free(name, Some(recipe_id)).await?;
            sets.push(format!("name = ?{idx}"));
            params.push(name.into());
            idx += 1;
        }
        if let Some(ref variety) = update.seed_variety {
            sets.push(format!("seed_variety = ?{idx}"));
            params.push(variety.trim().into());
            idx += 1;
        }
        if let Some(ref seed) = update.seed_consumable_id {
            self.ensure_consumable_ref(seed.as_deref()).await?;
            sets.push(format!("seed_consumable_id = ?{idx}"));
            params.push(seed.clone().map_or(libsql::Value::Null, Into::into));
            idx += 1;
        }
        if let Some(ref soil) = update.soil_consumable_id {
            self.ensure_consumable_ref(soil.as_deref()).await?;
            sets.push(format!("soil_consumable_id = ?{idx}"));
            params.push(soil.clone().map_or(libsql::Value::Null, Into::into));
            idx += 1;
        }
        for (column, value) in update.numeric_fields() {
            if let Some(value) = value {
                check_non_negative(column, value)?;
                sets.push(format!("{column} = ?{idx}"));
                params.push(value.into());
                idx += 1;
            }
        }
        if let Some(active) = update.is_active {
            sets.push(format!("is_active = ?{idx}"));
            params.push(i64::from(active).into());
            idx += 1;
        }
        if let Some(ref notes) = update.notes {
            sets.push(format!("notes = ?{idx}"));
            params.push(clean_opt(notes.as_deref()).map_or(libsql::Value::Null, Into::into));
            idx += 1;
        }

        if sets.is_empty() {
            return self.get_recipe(recipe_id).await;
        }

        sets.push(format!("updated_at = ?{idx}"));
        params.push(ts(now()).into());
        idx += 1;

        params.push(recipe_id.into());
        let sql = format!("UPDATE recipes SET {} WHERE id = ?{idx}", sets.join(", "));
        self.db()
            .conn()
            .execute(&sql, libsql::params_from_iter(params))
            .await?;

        self.get_recipe(recipe_id).await
    }

    /// Replace a recipe's watering schedule.
    pub async fn set_watering_schedule(
        &self,
        recipe_id: &str,
        steps: &[NewWateringStep],
    ) -> Result<Vec<WateringStep>, DatabaseError> {
        self.get_recipe(recipe_id).await?;
        check_steps(steps)?;

        let tx = self.begin().await?;
        let result = self.replace_watering_steps(recipe_id, steps).await;
        Self::finish(tx, result).await?;

        self.watering_schedule(recipe_id).await
    }

    async fn replace_watering_steps(
        &self,
        recipe_id: &str,
        steps: &[NewWateringStep],
    ) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute("DELETE FROM watering_steps WHERE recipe_id = ?1", [recipe_id])
            .await?;
        for step in steps {
            let id = self.db().generate_id(PREFIX_WATERING_STEP).await?;
            self.db()
                .conn()
                .execute(
                    &format!("INSERT INTO watering_steps ({STEP_COLS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                    libsql::params![
                        id.as_str(),
                        recipe_id,
                        step.day_number,
                        step.amount_ml,
                        clean_opt(step.note.as_deref())
                    ],
                )
                .await?;
        }
        Ok(())
    }

    pub async fn watering_schedule(
        &self,
        recipe_id: &str,
    ) -> Result<Vec<WateringStep>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {STEP_COLS} FROM watering_steps WHERE recipe_id = ?1 ORDER BY day_number"
                ),
                [recipe_id],
            )
            .await?;

        let mut steps = Vec::new();
        while let Some(row) = rows.next().await? {
            steps.push(row_to_step(&row)?);
        }
        Ok(steps)
    }

    /// Copy a recipe's growing parameters and watering schedule under a new name.
    pub async fn clone_recipe(&self, source_id: &str, new_name: &str) -> Result<Recipe, DatabaseError> {
        let source = self.get_recipe(source_id).await?;
        let name = new_name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("recipe name must not be empty".into()));
        }
        self.ensure_recipe_name_free(name, None).await?;
        let steps: Vec<NewWateringStep> = self
            .watering_schedule(source_id)
            .await?
            .into_iter()
            .map(|s| NewWateringStep {
                day_number: s.day_number,
                amount_ml: s.amount_ml,
                note: s.note,
            })
            .collect();

        let now = now();
        let recipe = Recipe {
            id: self.db().generate_id(PREFIX_RECIPE).await?,
            name: name.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
            ..source
        };

        let tx = self.begin().await?;
        let result = async {
            self.insert_recipe(&recipe).await?;
            self.replace_watering_steps(&recipe.id, &steps).await
        }
        .await;
        Self::finish(tx, result).await?;

        tracing::info!(source = %source_id, recipe_id = %recipe.id, "recipe cloned");
        Ok(recipe)
    }
}
