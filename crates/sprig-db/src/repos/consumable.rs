//! Consumable repository: inventory, stock movements, and lot validation.

use serde::{Deserialize, Serialize};

use sprig_core::entities::Consumable;
use sprig_core::enums::ConsumableType;
use sprig_core::ids::PREFIX_CONSUMABLE;
use sprig_core::lot::{lot_format_problems, normalize_lot_number};

use crate::error::DatabaseError;
use crate::helpers::{
    clean_opt, get_bool, get_f64, get_opt_string, now, parse_datetime, parse_enum, ts,
};
use crate::service::SprigService;
use crate::updates::consumable::ConsumableUpdate;

const SELECT_COLS: &str = "id, consumable_type, name, unit, quantity, restock_threshold, \
     lot_number, supplier, is_active, created_at, updated_at";

fn row_to_consumable(row: &libsql::Row) -> Result<Consumable, DatabaseError> {
    Ok(Consumable {
        id: row.get(0)?,
        consumable_type: parse_enum(&row.get::<String>(1)?)?,
        name: row.get(2)?,
        unit: row.get(3)?,
        quantity: get_f64(row, 4)?,
        restock_threshold: get_f64(row, 5)?,
        lot_number: get_opt_string(row, 6)?,
        supplier: get_opt_string(row, 7)?,
        is_active: get_bool(row, 8)?,
        created_at: parse_datetime(&row.get::<String>(9)?)?,
        updated_at: parse_datetime(&row.get::<String>(10)?)?,
    })
}

/// Input for [`SprigService::create_consumable`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConsumable {
    pub consumable_type: ConsumableType,
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub restock_threshold: f64,
    pub lot_number: Option<String>,
    pub supplier: Option<String>,
}

/// Outcome of validating a lot number against format rules and stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotCheck {
    pub lot_number: String,
    pub valid: bool,
    pub consumable_id: Option<String>,
    pub quantity: Option<f64>,
    pub problems: Vec<String>,
}

/// Normalize and validate an optional lot number.
fn prepare_lot(raw: Option<&str>) -> Result<Option<String>, DatabaseError> {
    let Some(raw) = clean_opt(raw) else {
        return Ok(None);
    };
    let lot = normalize_lot_number(&raw);
    let problems = lot_format_problems(&lot);
    if !problems.is_empty() {
        return Err(DatabaseError::Validation(format!(
            "invalid lot number '{lot}': {}",
            problems.join("; ")
        )));
    }
    Ok(Some(lot))
}

fn check_amount(field: &str, value: f64) -> Result<(), DatabaseError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DatabaseError::Validation(format!(
            "{field} must be a non-negative number (got {value})"
        )));
    }
    Ok(())
}

impl SprigService {
    pub async fn create_consumable(
        &self,
        input: &NewConsumable,
    ) -> Result<Consumable, DatabaseError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("consumable name must not be empty".into()));
        }
        check_amount("quantity", input.quantity)?;
        check_amount("restock_threshold", input.restock_threshold)?;
        let lot_number = prepare_lot(input.lot_number.as_deref())?;
        if let Some(ref lot) = lot_number {
            self.ensure_lot_free(input.consumable_type, lot, None).await?;
        }

        let now = now();
        let consumable = Consumable {
            id: self.db().generate_id(PREFIX_CONSUMABLE).await?,
            consumable_type: input.consumable_type,
            name: name.to_string(),
            unit: input.unit.trim().to_string(),
            quantity: input.quantity,
            restock_threshold: input.restock_threshold,
            lot_number,
            supplier: clean_opt(input.supplier.as_deref()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO consumables ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                libsql::params![
                    consumable.id.as_str(),
                    consumable.consumable_type.as_str(),
                    consumable.name.as_str(),
                    consumable.unit.as_str(),
                    consumable.quantity,
                    consumable.restock_threshold,
                    consumable.lot_number.as_deref(),
                    consumable.supplier.as_deref(),
                    1i64,
                    ts(now),
                    ts(now)
                ],
            )
            .await?;

        Ok(consumable)
    }

    async fn ensure_lot_free(
        &self,
        consumable_type: ConsumableType,
        lot: &str,
        exclude_id: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id FROM consumables
                 WHERE consumable_type = ?1 AND lot_number = ?2 AND id <> ?3",
                libsql::params![consumable_type.as_str(), lot, exclude_id.unwrap_or("")],
            )
            .await?;
        if let Some(row) = rows.next().await? {
            let existing: String = row.get(0)?;
            return Err(DatabaseError::Validation(format!(
                "{consumable_type} lot '{lot}' is already recorded on {existing}"
            )));
        }
        Ok(())
    }

    pub async fn get_consumable(&self, id: &str) -> Result<Consumable, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM consumables WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| DatabaseError::NotFound {
            entity: "consumable",
            id: id.to_string(),
        })?;
        row_to_consumable(&row)
    }

    pub async fn list_consumables(
        &self,
        consumable_type: Option<ConsumableType>,
        limit: u32,
    ) -> Result<Vec<Consumable>, DatabaseError> {
        let mut rows = match consumable_type {
            Some(kind) => {
                self.db()
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM consumables WHERE consumable_type = ?1
                             ORDER BY name LIMIT {limit}"
                        ),
                        [kind.as_str()],
                    )
                    .await?
            }
            None => {
                self.db()
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM consumables
                             ORDER BY consumable_type, name LIMIT {limit}"
                        ),
                        (),
                    )
                    .await?
            }
        };

        let mut consumables = Vec::new();
        while let Some(row) = rows.next().await? {
            consumables.push(row_to_consumable(&row)?);
        }
        Ok(consumables)
    }

    pub async fn update_consumable(
        &self,
        id: &str,
        update: ConsumableUpdate,
    ) -> Result<Consumable, DatabaseError> {
        let current = self.get_consumable(id).await?;

        let mut sets = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();
        let mut idx = 1usize;

        if let Some(ref name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DatabaseError::Validation(
                    "consumable name must not be empty".into(),
                ));
            }
            sets.push(format!("name = ?{idx}"));
            params.push(name.into());
            idx += 1;
        }
        if let Some(ref unit) = update.unit {
            sets.push(format!("unit = ?{idx}"));
            params.push(unit.trim().into());
            idx += 1;
        }
        if let Some(threshold) = update.restock_threshold {
            check_amount("restock_threshold", threshold)?;
            sets.push(format!("restock_threshold = ?{idx}"));
            params.push(threshold.into());
            idx += 1;
        }
        if let Some(ref lot) = update.lot_number {
            let lot = prepare_lot(lot.as_deref())?;
            if let Some(ref lot) = lot {
                self.ensure_lot_free(current.consumable_type, lot, Some(id))
                    .await?;
            }
            sets.push(format!("lot_number = ?{idx}"));
            params.push(lot.map_or(libsql::Value::Null, Into::into));
            idx += 1;
        }
        if let Some(ref supplier) = update.supplier {
            sets.push(format!("supplier = ?{idx}"));
            params.push(clean_opt(supplier.as_deref()).map_or(libsql::Value::Null, Into::into));
            idx += 1;
        }
        if let Some(active) = update.is_active {
            sets.push(format!("is_active = ?{idx}"));
            params.push(i64::from(active).into());
            idx += 1;
        }

        if sets.is_empty() {
            return Ok(current);
        }

        sets.push(format!("updated_at = ?{idx}"));
        params.push(ts(now()).into());
        idx += 1;

        params.push(id.into());
        let sql = format!("UPDATE consumables SET {} WHERE id = ?{idx}", sets.join(", "));
        self.db()
            .conn()
            .execute(&sql, libsql::params_from_iter(params))
            .await?;

        self.get_consumable(id).await
    }

    /// Add `delta` (negative to consume) to a consumable's quantity.
    pub async fn adjust_stock(&self, id: &str, delta: f64) -> Result<Consumable, DatabaseError> {
        self.apply_stock_delta(id, delta).await?;
        let consumable = self.get_consumable(id).await?;
        if consumable.needs_restock() {
            tracing::warn!(
                consumable_id = %id,
                quantity = consumable.quantity,
                threshold = consumable.restock_threshold,
                "consumable at or below restock threshold"
            );
        }
        Ok(consumable)
    }

    /// Apply a stock movement without opening a transaction. Refuses to go negative.
    pub(crate) async fn apply_stock_delta(&self, id: &str, delta: f64) -> Result<(), DatabaseError> {
        if !delta.is_finite() {
            return Err(DatabaseError::Validation(format!(
                "stock adjustment must be a finite number (got {delta})"
            )));
        }
        let changed = self
            .db()
            .conn()
            .execute(
                "UPDATE consumables SET quantity = quantity + ?1, updated_at = ?2
                 WHERE id = ?3 AND quantity + ?1 >= 0",
                libsql::params![delta, ts(now()), id],
            )
            .await?;
        if changed == 0 {
            let current = self.get_consumable(id).await?;
            return Err(DatabaseError::InvalidState(format!(
                "insufficient stock of {} ({}): have {} {}, need {}",
                current.name,
                current.id,
                current.quantity,
                current.unit,
                -delta
            )));
        }
        Ok(())
    }

    /// Active consumables whose quantity is at or below their restock threshold.
    pub async fn list_low_stock(&self) -> Result<Vec<Consumable>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM consumables
                     WHERE is_active = 1 AND quantity <= restock_threshold
                     ORDER BY consumable_type, name"
                ),
                (),
            )
            .await?;

        let mut consumables = Vec::new();
        while let Some(row) = rows.next().await? {
            consumables.push(row_to_consumable(&row)?);
        }
        Ok(consumables)
    }

    /// Validate a lot number: format, then whether usable stock carries it.
    pub async fn check_lot(
        &self,
        raw: &str,
        consumable_type: Option<ConsumableType>,
    ) -> Result<LotCheck, DatabaseError> {
        let lot_number = normalize_lot_number(raw);
        let mut problems = lot_format_problems(&lot_number);
        let mut check = LotCheck {
            lot_number,
            valid: false,
            consumable_id: None,
            quantity: None,
            problems: Vec::new(),
        };

        if problems.is_empty() {
            let type_filter = consumable_type.map_or("", ConsumableType::as_str);
            let mut rows = self
                .db()
                .conn()
                .query(
                    &format!(
                        "SELECT {SELECT_COLS} FROM consumables
                         WHERE lot_number = ?1 AND (?2 = '' OR consumable_type = ?2)
                         ORDER BY is_active DESC, quantity DESC LIMIT 1"
                    ),
                    libsql::params![check.lot_number.as_str(), type_filter],
                )
                .await?;
            match rows.next().await? {
                None => problems.push(format!("no consumable carries lot {}", check.lot_number)),
                Some(row) => {
                    let consumable = row_to_consumable(&row)?;
                    if !consumable.is_active {
                        problems.push(format!("consumable {} is inactive", consumable.id));
                    }
                    if consumable.quantity <= 0.0 {
                        problems.push(format!("consumable {} is out of stock", consumable.id));
                    }
                    check.consumable_id = Some(consumable.id);
                    check.quantity = Some(consumable.quantity);
                }
            }
        }

        check.valid = problems.is_empty();
        check.problems = problems;
        Ok(check)
    }
}
