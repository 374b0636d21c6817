use serde::Serialize;
use sprig_core::entities::{Recipe, WateringStep};
use sprig_core::growth::days_to_maturity;
use sprig_db::repos::recipe::NewRecipe;
use sprig_db::updates::recipe::RecipeUpdateBuilder;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::RecipeCommands;
use crate::commands::shared::parse::{clearable, parse_watering_step};
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct RecipeResponse {
    recipe: Recipe,
    days_to_maturity: f64,
    watering: Vec<WateringStep>,
}

#[derive(Debug, Serialize)]
struct RecipeListResponse {
    recipes: Vec<Recipe>,
}

#[derive(Debug, Serialize)]
struct WateringResponse {
    recipe_id: String,
    steps: Vec<WateringStep>,
}

/// Handle `sprig recipe`.
pub async fn handle(
    action: &RecipeCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        RecipeCommands::Create {
            name,
            variety,
            seed_consumable,
            soil_consumable,
            density,
            soak_hours,
            germination_days,
            blackout_days,
            light_days,
            expected_yield,
            notes,
        } => {
            let input = NewRecipe {
                name: name.clone(),
                seed_variety: variety.clone(),
                seed_consumable_id: seed_consumable.clone(),
                soil_consumable_id: soil_consumable.clone(),
                seed_density_grams: *density,
                seed_soak_hours: *soak_hours,
                germination_days: *germination_days,
                blackout_days: *blackout_days,
                light_days: *light_days,
                expected_yield_grams: *expected_yield,
                notes: notes.clone(),
            };
            let recipe = ctx.service.create_recipe(&input).await?;
            respond(recipe, Vec::new(), flags)
        }
        RecipeCommands::Get { id } => {
            let recipe = ctx.service.get_recipe(id).await?;
            let watering = ctx.service.watering_schedule(id).await?;
            respond(recipe, watering, flags)
        }
        RecipeCommands::List { all } => {
            let recipes = ctx
                .service
                .list_recipes(!*all, ctx.limit(flags.limit))
                .await?;
            output(&RecipeListResponse { recipes }, flags.format)
        }
        RecipeCommands::Update {
            id,
            name,
            variety,
            seed_consumable,
            soil_consumable,
            density,
            soak_hours,
            germination_days,
            blackout_days,
            light_days,
            expected_yield,
            active,
            notes,
        } => {
            let mut builder = RecipeUpdateBuilder::new();
            if let Some(name) = name {
                builder = builder.name(name.as_str());
            }
            if let Some(variety) = variety {
                builder = builder.seed_variety(variety.as_str());
            }
            if let Some(seed) = clearable(seed_consumable.as_deref()) {
                builder = builder.seed_consumable_id(seed);
            }
            if let Some(soil) = clearable(soil_consumable.as_deref()) {
                builder = builder.soil_consumable_id(soil);
            }
            if let Some(grams) = density {
                builder = builder.seed_density_grams(*grams);
            }
            if let Some(hours) = soak_hours {
                builder = builder.seed_soak_hours(*hours);
            }
            if let Some(days) = germination_days {
                builder = builder.germination_days(*days);
            }
            if let Some(days) = blackout_days {
                builder = builder.blackout_days(*days);
            }
            if let Some(days) = light_days {
                builder = builder.light_days(*days);
            }
            if let Some(grams) = expected_yield {
                builder = builder.expected_yield_grams(*grams);
            }
            if let Some(active) = active {
                builder = builder.is_active(*active);
            }
            if let Some(notes) = clearable(notes.as_deref()) {
                builder = builder.notes(notes);
            }

            let recipe = ctx.service.update_recipe(id, builder.build()).await?;
            let watering = ctx.service.watering_schedule(id).await?;
            respond(recipe, watering, flags)
        }
        RecipeCommands::Clone { id, name } => {
            let recipe = ctx.service.clone_recipe(id, name).await?;
            let watering = ctx.service.watering_schedule(&recipe.id).await?;
            respond(recipe, watering, flags)
        }
        RecipeCommands::Watering { id, steps } => {
            let steps = if steps.is_empty() {
                ctx.service.watering_schedule(id).await?
            } else {
                let parsed = steps
                    .iter()
                    .map(|raw| parse_watering_step(raw.as_str()))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                ctx.service.set_watering_schedule(id, &parsed).await?
            };
            output(
                &WateringResponse {
                    recipe_id: id.clone(),
                    steps,
                },
                flags.format,
            )
        }
    }
}

fn respond(recipe: Recipe, watering: Vec<WateringStep>, flags: &GlobalFlags) -> anyhow::Result<()> {
    output(
        &RecipeResponse {
            days_to_maturity: days_to_maturity(&recipe),
            recipe,
            watering,
        },
        flags.format,
    )
}
