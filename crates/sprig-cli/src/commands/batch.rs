use serde::Serialize;
use sprig_core::entities::BatchDetail;
use sprig_core::enums::CropStage;
use sprig_db::repos::batch::NewCropBatch;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::BatchCommands;
use crate::commands::shared::parse::{datetime_or_now, parse_enum};
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct BatchListResponse {
    batches: Vec<BatchDetail>,
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    id: String,
    deleted: bool,
}

/// Handle `sprig batch`.
pub async fn handle(
    action: &BatchCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let detail = match action {
        BatchCommands::Create {
            recipe,
            trays,
            planted_at,
            order,
            notes,
        } => {
            let input = NewCropBatch {
                recipe_id: recipe.clone(),
                tray_numbers: trays.clone(),
                planted_at: datetime_or_now(planted_at.as_deref(), "planted at")?,
                order_id: order.clone(),
                notes: notes.clone(),
            };
            ctx.service.create_crop_batch(&input).await?
        }
        BatchCommands::Soak { recipe, trays, at } => {
            let at = datetime_or_now(at.as_deref(), "at")?;
            ctx.service.start_soaking(recipe, *trays, at).await?
        }
        BatchCommands::EndSoak { id, trays, at } => {
            let at = datetime_or_now(at.as_deref(), "at")?;
            let trays = (!trays.is_empty()).then_some(trays.as_slice());
            ctx.service.advance_from_soaking(id, trays, at).await?
        }
        BatchCommands::Advance { id, at } => {
            let at = datetime_or_now(at.as_deref(), "at")?;
            ctx.service.advance_stage(id, at).await?
        }
        BatchCommands::Harvest {
            id,
            weight,
            at,
            notes,
        } => {
            let at = datetime_or_now(at.as_deref(), "at")?;
            let harvest = ctx
                .service
                .record_harvest(id, *weight, at, notes.as_deref())
                .await?;
            return output(&harvest, flags.format);
        }
        BatchCommands::Get { id } => ctx.service.get_batch(id).await?,
        BatchCommands::List { stage } => {
            let stage = stage
                .as_deref()
                .map(|value| parse_enum::<CropStage>(value, "stage"))
                .transpose()?;
            let batches = ctx
                .service
                .list_batches(stage, ctx.limit(flags.limit))
                .await?;
            return output(&BatchListResponse { batches }, flags.format);
        }
        BatchCommands::Delete { id } => {
            ctx.service.delete_batch(id).await?;
            return output(
                &DeletedResponse {
                    id: id.clone(),
                    deleted: true,
                },
                flags.format,
            );
        }
    };
    output(&detail, flags.format)
}
