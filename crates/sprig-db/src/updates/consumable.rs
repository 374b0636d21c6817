//! Consumable update builder.

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsumableUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restock_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

pub struct ConsumableUpdateBuilder(ConsumableUpdate);

impl ConsumableUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(ConsumableUpdate::default())
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.0.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub const fn restock_threshold(mut self, threshold: f64) -> Self {
        self.0.restock_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn lot_number(mut self, lot: Option<String>) -> Self {
        self.0.lot_number = Some(lot);
        self
    }

    #[must_use]
    pub fn supplier(mut self, supplier: Option<String>) -> Self {
        self.0.supplier = Some(supplier);
        self
    }

    #[must_use]
    pub const fn is_active(mut self, active: bool) -> Self {
        self.0.is_active = Some(active);
        self
    }

    #[must_use]
    pub fn build(self) -> ConsumableUpdate {
        self.0
    }
}

impl Default for ConsumableUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
