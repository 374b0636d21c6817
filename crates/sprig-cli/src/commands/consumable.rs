use serde::Serialize;
use sprig_core::entities::Consumable;
use sprig_core::enums::ConsumableType;
use sprig_db::repos::consumable::NewConsumable;
use sprig_db::updates::consumable::ConsumableUpdateBuilder;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ConsumableCommands;
use crate::commands::shared::parse::{clearable, parse_enum};
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ConsumableListResponse {
    consumables: Vec<Consumable>,
}

fn parse_type(raw: Option<&str>) -> anyhow::Result<Option<ConsumableType>> {
    raw.map(|value| parse_enum::<ConsumableType>(value, "consumable type"))
        .transpose()
}

/// Handle `sprig consumable`.
pub async fn handle(
    action: &ConsumableCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        ConsumableCommands::Create {
            consumable_type,
            name,
            unit,
            quantity,
            restock_threshold,
            lot,
            supplier,
        } => {
            let input = NewConsumable {
                consumable_type: parse_enum(consumable_type, "consumable type")?,
                name: name.clone(),
                unit: unit.clone(),
                quantity: *quantity,
                restock_threshold: *restock_threshold,
                lot_number: lot.clone(),
                supplier: supplier.clone(),
            };
            let consumable = ctx.service.create_consumable(&input).await?;
            output(&consumable, flags.format)
        }
        ConsumableCommands::Get { id } => {
            output(&ctx.service.get_consumable(id).await?, flags.format)
        }
        ConsumableCommands::List { consumable_type } => {
            let consumables = ctx
                .service
                .list_consumables(
                    parse_type(consumable_type.as_deref())?,
                    ctx.limit(flags.limit),
                )
                .await?;
            output(&ConsumableListResponse { consumables }, flags.format)
        }
        ConsumableCommands::Update {
            id,
            name,
            unit,
            restock_threshold,
            lot,
            supplier,
            active,
        } => {
            let mut builder = ConsumableUpdateBuilder::new();
            if let Some(name) = name {
                builder = builder.name(name.as_str());
            }
            if let Some(unit) = unit {
                builder = builder.unit(unit.as_str());
            }
            if let Some(threshold) = restock_threshold {
                builder = builder.restock_threshold(*threshold);
            }
            if let Some(lot) = clearable(lot.as_deref()) {
                builder = builder.lot_number(lot);
            }
            if let Some(supplier) = clearable(supplier.as_deref()) {
                builder = builder.supplier(supplier);
            }
            if let Some(active) = active {
                builder = builder.is_active(*active);
            }
            let consumable = ctx.service.update_consumable(id, builder.build()).await?;
            output(&consumable, flags.format)
        }
        ConsumableCommands::Adjust { id, delta } => {
            let consumable = ctx.service.adjust_stock(id, *delta).await?;
            if consumable.needs_restock() {
                tracing::warn!(
                    id = %consumable.id,
                    quantity = consumable.quantity,
                    threshold = consumable.restock_threshold,
                    "consumable is at or below its restock threshold"
                );
            }
            output(&consumable, flags.format)
        }
        ConsumableCommands::LowStock => {
            let consumables = ctx.service.list_low_stock().await?;
            output(&ConsumableListResponse { consumables }, flags.format)
        }
        ConsumableCommands::CheckLot {
            lot,
            consumable_type,
        } => {
            let check = ctx
                .service
                .check_lot(lot, parse_type(consumable_type.as_deref())?)
                .await?;
            output(&check, flags.format)
        }
    }
}
