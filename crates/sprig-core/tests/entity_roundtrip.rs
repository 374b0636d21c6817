//! Serde roundtrip and JsonSchema validation tests for entity types.

use chrono::{NaiveDate, Utc};
use schemars::schema_for;
use sprig_core::entities::*;
use sprig_core::enums::*;

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(
                recovered,
                val,
                "serde roundtrip failed for {}",
                stringify!($ty)
            );

            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

roundtrip_and_validate!(
    recipe_roundtrip,
    Recipe,
    Recipe {
        id: "rcp-a3f8b2c1".into(),
        name: "Pea shoots".into(),
        seed_variety: "Dun pea".into(),
        seed_consumable_id: Some("con-11112222".into()),
        soil_consumable_id: None,
        seed_density_grams: 300.0,
        seed_soak_hours: 8.0,
        germination_days: 2.0,
        blackout_days: 3.0,
        light_days: 5.5,
        expected_yield_grams: 500.0,
        is_active: true,
        notes: Some("Weigh down for 2 days".into()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    consumable_roundtrip,
    Consumable,
    Consumable {
        id: "con-a3f8b2c1".into(),
        consumable_type: ConsumableType::Seed,
        name: "Radish seed".into(),
        unit: "g".into(),
        quantity: 5000.0,
        restock_threshold: 1000.0,
        lot_number: Some("RAD-2026-01".into()),
        supplier: Some("True Leaf".into()),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    recurring_order_roundtrip,
    Order,
    Order {
        id: "ord-a3f8b2c1".into(),
        customer_name: "Corner Bistro".into(),
        status: OrderStatus::Template,
        harvest_date: date(2026, 5, 4),
        delivery_date: date(2026, 5, 5),
        is_recurring: true,
        recurring_frequency: Some(RecurringFrequency::Weekly),
        recurring_start_date: Some(date(2026, 5, 5)),
        recurring_end_date: None,
        next_generation_date: Some(date(2026, 5, 5)),
        is_recurring_active: true,
        parent_recurring_order_id: None,
        notes: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    crop_roundtrip,
    Crop,
    Crop {
        id: "crp-a3f8b2c1".into(),
        batch_id: "bat-a3f8b2c1".into(),
        recipe_id: "rcp-a3f8b2c1".into(),
        order_id: None,
        tray_number: "T-14".into(),
        stage: CropStage::Blackout,
        planted_at: Utc::now(),
        soaking_at: None,
        germination_at: Some(Utc::now()),
        blackout_at: Some(Utc::now()),
        light_at: None,
        harvested_at: None,
        harvest_weight_grams: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    crop_plan_roundtrip,
    CropPlan,
    CropPlan {
        id: "pln-a3f8b2c1".into(),
        order_id: "ord-a3f8b2c1".into(),
        order_item_id: "itm-a3f8b2c1".into(),
        recipe_id: "rcp-a3f8b2c1".into(),
        trays: 3,
        grams_needed: 1200.0,
        plant_by: date(2026, 4, 20),
        harvest_date: date(2026, 5, 1),
        status: CropPlanStatus::Draft,
        batch_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    crop_task_roundtrip,
    CropTask,
    CropTask {
        id: "ctk-a3f8b2c1".into(),
        batch_id: "bat-a3f8b2c1".into(),
        kind: CropTaskKind::AdvanceStage,
        expected_stage: CropStage::Germination,
        scheduled_at: Utc::now(),
        is_active: true,
        processed_at: None,
        note: None,
        created_at: Utc::now(),
    }
);

#[test]
fn order_detail_flattens_order_fields() {
    let order = Order {
        id: "ord-00000001".into(),
        customer_name: "Farmers market".into(),
        status: OrderStatus::Pending,
        harvest_date: date(2026, 6, 1),
        delivery_date: date(2026, 6, 2),
        is_recurring: false,
        recurring_frequency: None,
        recurring_start_date: None,
        recurring_end_date: None,
        next_generation_date: None,
        is_recurring_active: false,
        parent_recurring_order_id: None,
        notes: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let detail = OrderDetail {
        order,
        items: vec![],
        total_cents: 0,
    };
    let json = serde_json::to_value(&detail).unwrap();
    assert_eq!(json["customer_name"], "Farmers market");
    assert_eq!(json["status"], "pending");
    assert_eq!(json["delivery_date"], "2026-06-02");
}
