use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;

use sprig_db::repos::order::NewOrderItem;
use sprig_db::repos::recipe::NewWateringStep;

/// Parse a snake_case enum value using serde-deserialization.
pub fn parse_enum<T>(raw: &str, field: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
    let json = format!("\"{normalized}\"");
    serde_json::from_str(&json).map_err(|error| anyhow::anyhow!("invalid {field} '{raw}': {error}"))
}

pub fn parse_date(raw: &str, field: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid {field} '{raw}': expected YYYY-MM-DD"))
}

pub fn parse_optional_date(raw: Option<&str>, field: &str) -> anyhow::Result<Option<NaiveDate>> {
    raw.map(|value| parse_date(value, field)).transpose()
}

/// RFC 3339, or `YYYY-MM-DD HH:MM[:SS]` / `YYYY-MM-DD` read as UTC.
pub fn parse_datetime(raw: &str, field: &str) -> anyhow::Result<DateTime<Utc>> {
    let value = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    anyhow::bail!("invalid {field} '{raw}': expected RFC 3339 or 'YYYY-MM-DD HH:MM'")
}

/// Parse an optional instant, defaulting to now.
pub fn datetime_or_now(raw: Option<&str>, field: &str) -> anyhow::Result<DateTime<Utc>> {
    raw.map_or_else(|| Ok(Utc::now()), |value| parse_datetime(value, field))
}

/// `PRODUCT_ID:QTY[:PRICE_CENTS]`
pub fn parse_order_item(raw: &str) -> anyhow::Result<NewOrderItem> {
    let mut parts = raw.split(':').map(str::trim);
    let (Some(product_id), Some(quantity)) = (parts.next(), parts.next()) else {
        anyhow::bail!("invalid item '{raw}': expected PRODUCT_ID:QTY[:PRICE_CENTS]");
    };
    if product_id.is_empty() {
        anyhow::bail!("invalid item '{raw}': product ID is empty");
    }
    let quantity = quantity
        .parse::<i64>()
        .with_context(|| format!("invalid item '{raw}': quantity must be a whole number"))?;
    let price_cents = parts
        .next()
        .map(|price| {
            price
                .parse::<i64>()
                .with_context(|| format!("invalid item '{raw}': price must be whole cents"))
        })
        .transpose()?;
    if parts.next().is_some() {
        anyhow::bail!("invalid item '{raw}': too many ':' separated parts");
    }
    Ok(NewOrderItem {
        product_id: product_id.to_string(),
        quantity,
        price_cents,
    })
}

/// `DAY:ML[:NOTE]`; the note may itself contain colons.
pub fn parse_watering_step(raw: &str) -> anyhow::Result<NewWateringStep> {
    let mut parts = raw.splitn(3, ':');
    let (Some(day), Some(amount)) = (parts.next(), parts.next()) else {
        anyhow::bail!("invalid step '{raw}': expected DAY:ML[:NOTE]");
    };
    let day_number = day
        .trim()
        .parse::<i64>()
        .with_context(|| format!("invalid step '{raw}': day must be a whole number"))?;
    let amount_ml = amount
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid step '{raw}': amount must be a number of ml"))?;
    let note = parts
        .next()
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(String::from);
    Ok(NewWateringStep {
        day_number,
        amount_ml,
        note,
    })
}

/// `None` leaves a field alone, `""` clears it, anything else sets it.
pub fn clearable(raw: Option<&str>) -> Option<Option<String>> {
    raw.map(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use sprig_core::enums::{ConsumableType, OrderStatus};

    use super::*;

    #[test]
    fn parses_snake_case_enum() {
        let status: OrderStatus = parse_enum("confirmed", "status").expect("status should parse");
        assert_eq!(status, OrderStatus::Confirmed);
        let kind: ConsumableType = parse_enum("Packaging", "type").expect("type should parse");
        assert_eq!(kind, ConsumableType::Packaging);
    }

    #[test]
    fn errors_on_invalid_enum() {
        let err = parse_enum::<OrderStatus>("shipped", "status").expect_err("should fail");
        assert!(err.to_string().contains("invalid status 'shipped'"));
    }

    #[test]
    fn datetime_accepts_common_shapes() {
        let expected = Utc.with_ymd_and_hms(2026, 4, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_datetime("2026-04-01T08:30:00Z", "at").unwrap(), expected);
        assert_eq!(parse_datetime("2026-04-01T10:30:00+02:00", "at").unwrap(), expected);
        assert_eq!(parse_datetime("2026-04-01 08:30", "at").unwrap(), expected);
        assert_eq!(
            parse_datetime("2026-04-01", "at").unwrap(),
            Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_datetime("yesterday", "at").is_err());
    }

    #[test]
    fn date_rejects_garbage() {
        assert!(parse_date("2026-02-30", "delivery").is_err());
        assert_eq!(
            parse_optional_date(Some("2026-02-28"), "delivery").unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28)
        );
    }

    #[test]
    fn order_item_with_and_without_price() {
        let item = parse_order_item("prd-1:3").unwrap();
        assert_eq!(item.product_id, "prd-1");
        assert_eq!(item.quantity, 3);
        assert_eq!(item.price_cents, None);

        let priced = parse_order_item("prd-2:10:375").unwrap();
        assert_eq!(priced.price_cents, Some(375));

        assert!(parse_order_item("prd-1").is_err());
        assert!(parse_order_item("prd-1:two").is_err());
        assert!(parse_order_item("prd-1:2:3:4").is_err());
    }

    #[test]
    fn watering_step_keeps_colons_in_note() {
        let step = parse_watering_step("3:450:bottom water: from tray").unwrap();
        assert_eq!(step.day_number, 3);
        assert_eq!(step.amount_ml, 450.0);
        assert_eq!(step.note.as_deref(), Some("bottom water: from tray"));
        assert!(parse_watering_step("3").is_err());
    }

    #[test]
    fn clearable_distinguishes_unset_empty_and_value() {
        assert_eq!(clearable(None), None);
        assert_eq!(clearable(Some("  ")), Some(None));
        assert_eq!(clearable(Some("LOT-1")), Some(Some("LOT-1".to_string())));
    }
}
