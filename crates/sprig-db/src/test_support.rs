//! Shared test utilities for sprig-db tests.

#[cfg(test)]
pub(crate) mod helpers {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use sprig_core::entities::{Consumable, Product, Recipe};
    use sprig_core::enums::ConsumableType;

    use crate::SprigDb;
    use crate::repos::consumable::NewConsumable;
    use crate::repos::product::NewProduct;
    use crate::repos::recipe::NewRecipe;
    use crate::service::{ServiceSettings, SprigService};

    /// Create an in-memory `SprigService` with default settings.
    pub async fn test_service() -> SprigService {
        let db = SprigDb::open_local(":memory:").await.unwrap();
        SprigService::from_db(db, ServiceSettings::default())
    }

    pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Sunflower-like recipe: 8h soak, 2 days germination, 2 blackout, 4 light.
    pub fn soaking_recipe_input(name: &str) -> NewRecipe {
        NewRecipe {
            name: name.to_string(),
            seed_variety: "Black oil sunflower".to_string(),
            seed_density_grams: 100.0,
            seed_soak_hours: 8.0,
            germination_days: 2.0,
            blackout_days: 2.0,
            light_days: 4.0,
            expected_yield_grams: 400.0,
            ..NewRecipe::default()
        }
    }

    /// Radish-like recipe: no soak, 2 days germination, no blackout, 6 light.
    pub fn plain_recipe_input(name: &str) -> NewRecipe {
        NewRecipe {
            name: name.to_string(),
            seed_variety: "China rose".to_string(),
            seed_density_grams: 30.0,
            germination_days: 2.0,
            light_days: 6.0,
            expected_yield_grams: 250.0,
            ..NewRecipe::default()
        }
    }

    pub async fn seed_recipe(svc: &SprigService, input: NewRecipe) -> Recipe {
        svc.create_recipe(&input).await.unwrap()
    }

    pub async fn seed_consumable(
        svc: &SprigService,
        name: &str,
        quantity: f64,
        lot: Option<&str>,
    ) -> Consumable {
        svc.create_consumable(&NewConsumable {
            consumable_type: ConsumableType::Seed,
            name: name.to_string(),
            unit: "g".to_string(),
            quantity,
            restock_threshold: 100.0,
            lot_number: lot.map(String::from),
            supplier: None,
        })
        .await
        .unwrap()
    }

    pub async fn seed_product(
        svc: &SprigService,
        name: &str,
        recipe_id: Option<&str>,
        unit_weight_grams: f64,
        price_cents: i64,
    ) -> Product {
        svc.create_product(&NewProduct {
            name: name.to_string(),
            recipe_id: recipe_id.map(String::from),
            unit_weight_grams,
            price_cents,
        })
        .await
        .unwrap()
    }

    pub fn trays(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| (*s).to_string()).collect()
    }
}
