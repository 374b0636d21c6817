use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use sprig_core::entities::Order;
use sprig_core::enums::{OrderStatus, RecurringFrequency};
use sprig_db::jobs::recurring::RecurringOptions;
use sprig_db::repos::order::{NewOrder, NewOrderItem, NewRecurringOrder, OrderFilter};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::OrderCommands;
use crate::commands::shared::parse::{parse_date, parse_enum, parse_optional_date, parse_order_item};
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct OrderListResponse {
    orders: Vec<Order>,
}

fn parse_items(raw: &[String]) -> anyhow::Result<Vec<NewOrderItem>> {
    raw.iter().map(String::as_str).map(parse_order_item).collect()
}

/// Handle `sprig order`.
pub async fn handle(
    action: &OrderCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        OrderCommands::Create {
            customer,
            delivery,
            harvest,
            items,
            notes,
        } => {
            let input = NewOrder {
                customer_name: customer.clone(),
                delivery_date: parse_date(delivery, "delivery date")?,
                harvest_date: parse_optional_date(harvest.as_deref(), "harvest date")?,
                items: parse_items(items)?,
                notes: notes.clone(),
            };
            let detail = ctx.service.create_order(&input).await?;
            output(&detail, flags.format)
        }
        OrderCommands::Recurring {
            customer,
            frequency,
            start,
            end,
            items,
            notes,
        } => {
            let input = NewRecurringOrder {
                customer_name: customer.clone(),
                frequency: parse_enum::<RecurringFrequency>(frequency, "frequency")?,
                start_date: parse_date(start, "start date")?,
                end_date: parse_optional_date(end.as_deref(), "end date")?,
                items: parse_items(items)?,
                notes: notes.clone(),
            };
            let detail = ctx.service.create_recurring_order(&input).await?;
            output(&detail, flags.format)
        }
        OrderCommands::Get { id } => output(&ctx.service.get_order(id).await?, flags.format),
        OrderCommands::List {
            status,
            customer,
            recurring,
        } => {
            let filter = OrderFilter {
                status: status
                    .as_deref()
                    .map(|value| parse_enum::<OrderStatus>(value, "status"))
                    .transpose()?,
                customer: customer.clone(),
                recurring: *recurring,
            };
            let orders = ctx
                .service
                .list_orders(&filter, ctx.limit(flags.limit))
                .await?;
            output(&OrderListResponse { orders }, flags.format)
        }
        OrderCommands::Transition { id, status } => {
            let status = parse_enum::<OrderStatus>(status, "status")?;
            let order = ctx.service.transition_order(id, status).await?;
            output(&order, flags.format)
        }
        OrderCommands::ProcessRecurring { dry_run, date } => {
            let today = parse_optional_date(date.as_deref(), "date")?
                .unwrap_or_else(|| Utc::now().date_naive());
            let options = RecurringOptions {
                dry_run: *dry_run,
                max_catch_up: ctx.config.orders.max_catch_up,
            };
            let report = ctx
                .service
                .process_recurring_orders(today, options)
                .await
                .context("recurring order run failed")?;
            tracing::info!(
                generated = report.generated.len(),
                deactivated = report.deactivated.len(),
                failed = report.failed.len(),
                "recurring order run finished"
            );
            output(&report, flags.format)
        }
    }
}
