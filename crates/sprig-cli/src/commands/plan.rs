use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use sprig_core::entities::CropPlan;
use sprig_core::enums::CropPlanStatus;
use sprig_db::repos::plan::CalendarDay;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::PlanCommands;
use crate::commands::shared::parse::{datetime_or_now, parse_enum, parse_optional_date};
use crate::context::AppContext;
use crate::output::output;

/// Calendar span shown when `--to` is omitted, counting the first day.
const CALENDAR_DAYS: u64 = 14;

#[derive(Debug, Serialize)]
struct PlanListResponse {
    plans: Vec<CropPlan>,
}

#[derive(Debug, Serialize)]
struct CalendarResponse {
    from: NaiveDate,
    to: NaiveDate,
    days: Vec<CalendarDay>,
}

/// Handle `sprig plan`.
pub async fn handle(
    action: &PlanCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let plan = match action {
        PlanCommands::Generate { order_id } => {
            let plans = ctx.service.generate_crop_plans(order_id).await?;
            return output(&PlanListResponse { plans }, flags.format);
        }
        PlanCommands::Get { id } => ctx.service.get_crop_plan(id).await?,
        PlanCommands::List { status, order } => {
            let status = status
                .as_deref()
                .map(|value| parse_enum::<CropPlanStatus>(value, "status"))
                .transpose()?;
            let plans = ctx
                .service
                .list_crop_plans(status, order.as_deref(), ctx.limit(flags.limit))
                .await?;
            return output(&PlanListResponse { plans }, flags.format);
        }
        PlanCommands::Approve { id } => {
            ctx.service
                .transition_crop_plan(id, CropPlanStatus::Approved)
                .await?
        }
        PlanCommands::Cancel { id } => {
            ctx.service
                .transition_crop_plan(id, CropPlanStatus::Cancelled)
                .await?
        }
        PlanCommands::Plant { id, trays, at } => {
            let at = datetime_or_now(at.as_deref(), "at")?;
            ctx.service.plant_crop_plan(id, trays, at).await?
        }
        PlanCommands::Calendar { from, to } => {
            let (from, to) = calendar_range(
                parse_optional_date(from.as_deref(), "from")?,
                parse_optional_date(to.as_deref(), "to")?,
                Utc::now().date_naive(),
            )?;
            let days = ctx.service.crop_plan_calendar(from, to).await?;
            return output(&CalendarResponse { from, to, days }, flags.format);
        }
    };
    output(&plan, flags.format)
}

fn calendar_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let from = from.unwrap_or(today);
    let to = match to {
        Some(to) => to,
        None => from
            .checked_add_days(Days::new(CALENDAR_DAYS - 1))
            .ok_or_else(|| anyhow::anyhow!("date {from} is out of range"))?,
    };
    if to < from {
        anyhow::bail!("--to ({to}) is before --from ({from})");
    }
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::calendar_range;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn defaults_to_two_weeks_from_today() {
        let range = calendar_range(None, None, d(2026, 4, 1)).expect("range");
        assert_eq!(range, (d(2026, 4, 1), d(2026, 4, 14)));
    }

    #[test]
    fn open_end_counts_from_given_start() {
        let range = calendar_range(Some(d(2026, 4, 25)), None, d(2026, 4, 1)).expect("range");
        assert_eq!(range, (d(2026, 4, 25), d(2026, 5, 8)));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = calendar_range(Some(d(2026, 4, 5)), Some(d(2026, 4, 4)), d(2026, 4, 1))
            .expect_err("reversed range");
        assert!(err.to_string().contains("before"));
    }
}
