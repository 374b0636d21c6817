use serde::Serialize;
use sprig_core::entities::Product;
use sprig_db::repos::product::NewProduct;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ProductCommands;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ProductListResponse {
    products: Vec<Product>,
}

/// Handle `sprig product`.
pub async fn handle(
    action: &ProductCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let product = match action {
        ProductCommands::Create {
            name,
            recipe,
            unit_weight,
            price_cents,
        } => {
            let input = NewProduct {
                name: name.clone(),
                recipe_id: recipe.clone(),
                unit_weight_grams: *unit_weight,
                price_cents: *price_cents,
            };
            ctx.service.create_product(&input).await?
        }
        ProductCommands::Get { id } => ctx.service.get_product(id).await?,
        ProductCommands::List { all } => {
            let products = ctx
                .service
                .list_products(!*all, ctx.limit(flags.limit))
                .await?;
            return output(&ProductListResponse { products }, flags.format);
        }
        ProductCommands::Activate { id } => ctx.service.set_product_active(id, true).await?,
        ProductCommands::Deactivate { id } => ctx.service.set_product_active(id, false).await?,
    };
    output(&product, flags.format)
}
