//! Recipe update builder.

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecipeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_variety: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_consumable_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_consumable_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_density_grams: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_soak_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub germination_days: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blackout_days: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_days: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_yield_grams: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl RecipeUpdate {
    /// Numeric fields that must not be negative, with their names.
    pub(crate) fn numeric_fields(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("seed_density_grams", self.seed_density_grams),
            ("seed_soak_hours", self.seed_soak_hours),
            ("germination_days", self.germination_days),
            ("blackout_days", self.blackout_days),
            ("light_days", self.light_days),
            ("expected_yield_grams", self.expected_yield_grams),
        ]
    }
}

pub struct RecipeUpdateBuilder(RecipeUpdate);

impl RecipeUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(RecipeUpdate::default())
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn seed_variety(mut self, variety: impl Into<String>) -> Self {
        self.0.seed_variety = Some(variety.into());
        self
    }

    #[must_use]
    pub fn seed_consumable_id(mut self, id: Option<String>) -> Self {
        self.0.seed_consumable_id = Some(id);
        self
    }

    #[must_use]
    pub fn soil_consumable_id(mut self, id: Option<String>) -> Self {
        self.0.soil_consumable_id = Some(id);
        self
    }

    #[must_use]
    pub const fn seed_density_grams(mut self, grams: f64) -> Self {
        self.0.seed_density_grams = Some(grams);
        self
    }

    #[must_use]
    pub const fn seed_soak_hours(mut self, hours: f64) -> Self {
        self.0.seed_soak_hours = Some(hours);
        self
    }

    #[must_use]
    pub const fn germination_days(mut self, days: f64) -> Self {
        self.0.germination_days = Some(days);
        self
    }

    #[must_use]
    pub const fn blackout_days(mut self, days: f64) -> Self {
        self.0.blackout_days = Some(days);
        self
    }

    #[must_use]
    pub const fn light_days(mut self, days: f64) -> Self {
        self.0.light_days = Some(days);
        self
    }

    #[must_use]
    pub const fn expected_yield_grams(mut self, grams: f64) -> Self {
        self.0.expected_yield_grams = Some(grams);
        self
    }

    #[must_use]
    pub const fn is_active(mut self, active: bool) -> Self {
        self.0.is_active = Some(active);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.0.notes = Some(notes);
        self
    }

    #[must_use]
    pub fn build(self) -> RecipeUpdate {
        self.0
    }
}

impl Default for RecipeUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
