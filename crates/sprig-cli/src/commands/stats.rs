use serde::Serialize;
use sprig_db::repos::stats::{HarvestStatsFilter, RecipeHarvestStats};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::StatsCommands;
use crate::commands::shared::parse::parse_optional_date;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct HarvestStatsResponse {
    recipes: Vec<RecipeHarvestStats>,
}

/// Handle `sprig stats`.
pub async fn handle(
    action: &StatsCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        StatsCommands::Harvest { from, to, recipe } => {
            let filter = HarvestStatsFilter {
                from: parse_optional_date(from.as_deref(), "from")?,
                to: parse_optional_date(to.as_deref(), "to")?,
                recipe_id: recipe.clone(),
            };
            let recipes = ctx.service.harvest_stats(&filter).await?;
            output(&HarvestStatsResponse { recipes }, flags.format)
        }
    }
}
