//! Crop plan repository: plans derived from orders, planting, and the calendar.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use sprig_core::entities::{CropPlan, Order};
use sprig_core::enums::{CropPlanStatus, OrderStatus};
use sprig_core::growth::{plant_by, trays_needed};
use sprig_core::ids::PREFIX_CROP_PLAN;

use crate::error::DatabaseError;
use crate::helpers::{
    date_str, get_f64, get_opt_string, now, parse_date, parse_datetime, parse_enum, ts,
};
use crate::repos::batch::NewCropBatch;
use crate::service::SprigService;

const SELECT_COLS: &str = "id, order_id, order_item_id, recipe_id, trays, grams_needed, plant_by, \
     harvest_date, status, batch_id, created_at, updated_at";

fn row_to_plan(row: &libsql::Row) -> Result<CropPlan, DatabaseError> {
    Ok(CropPlan {
        id: row.get(0)?,
        order_id: row.get(1)?,
        order_item_id: row.get(2)?,
        recipe_id: row.get(3)?,
        trays: row.get(4)?,
        grams_needed: get_f64(row, 5)?,
        plant_by: parse_date(&row.get::<String>(6)?)?,
        harvest_date: parse_date(&row.get::<String>(7)?)?,
        status: parse_enum(&row.get::<String>(8)?)?,
        batch_id: get_opt_string(row, 9)?,
        created_at: parse_datetime(&row.get::<String>(10)?)?,
        updated_at: parse_datetime(&row.get::<String>(11)?)?,
    })
}

/// Trays of one recipe to plant on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub recipe_id: String,
    pub recipe_name: String,
    pub trays: i64,
    pub plan_ids: Vec<String>,
}

/// Everything due to be planted on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub total_trays: i64,
    pub entries: Vec<CalendarEntry>,
}

impl SprigService {
    /// (Re)build the draft crop plans of an order from its items.
    ///
    /// Existing drafts are replaced. Orders whose plans were already approved
    /// or planted are left alone. Items whose product has no recipe are skipped.
    pub async fn generate_crop_plans(&self, order_id: &str) -> Result<Vec<CropPlan>, DatabaseError> {
        let order = self.get_order_row(order_id).await?;
        if matches!(order.status, OrderStatus::Cancelled | OrderStatus::Template) {
            return Err(DatabaseError::InvalidState(format!(
                "order {order_id} is {}; crop plans cannot be generated",
                order.status
            )));
        }

        let tx = self.begin().await?;
        let result = self.build_crop_plans(&order).await;
        let plans = Self::finish(tx, result).await?;

        tracing::info!(order_id, plans = plans.len(), "crop plans generated");
        Ok(plans)
    }

    async fn build_crop_plans(&self, order: &Order) -> Result<Vec<CropPlan>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT COUNT(*) FROM crop_plans
                 WHERE order_id = ?1 AND status IN (?2, ?3, ?4)",
                libsql::params![
                    order.id.as_str(),
                    CropPlanStatus::Approved.as_str(),
                    CropPlanStatus::Planted.as_str(),
                    CropPlanStatus::Completed.as_str()
                ],
            )
            .await?;
        let committed: i64 = rows
            .next()
            .await?
            .ok_or(DatabaseError::NoResult)?
            .get(0)?;
        if committed > 0 {
            return Err(DatabaseError::InvalidState(format!(
                "order {} already has {committed} approved or planted crop plans",
                order.id
            )));
        }

        self.db()
            .conn()
            .execute(
                "DELETE FROM crop_plans WHERE order_id = ?1 AND status = ?2",
                libsql::params![order.id.as_str(), CropPlanStatus::Draft.as_str()],
            )
            .await?;

        let now = now();
        let mut plans = Vec::new();
        for item in self.order_items(&order.id).await? {
            let product = self.get_product(&item.product_id).await?;
            let Some(recipe_id) = product.recipe_id else {
                tracing::debug!(product_id = %product.id, "product has no recipe; no crop plan");
                continue;
            };
            let recipe = self.get_recipe(&recipe_id).await?;
            #[allow(clippy::cast_precision_loss)]
            let grams_needed = item.quantity as f64 * product.unit_weight_grams;
            let trays = trays_needed(&recipe, grams_needed)?;
            if trays == 0 {
                continue;
            }

            let plan = CropPlan {
                id: self.db().generate_id(PREFIX_CROP_PLAN).await?,
                order_id: order.id.clone(),
                order_item_id: item.id.clone(),
                recipe_id,
                trays,
                grams_needed,
                plant_by: plant_by(&recipe, order.harvest_date),
                harvest_date: order.harvest_date,
                status: CropPlanStatus::Draft,
                batch_id: None,
                created_at: now,
                updated_at: now,
            };
            self.db()
                .conn()
                .execute(
                    &format!(
                        "INSERT INTO crop_plans ({SELECT_COLS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10, ?10)"
                    ),
                    libsql::params![
                        plan.id.as_str(),
                        plan.order_id.as_str(),
                        plan.order_item_id.as_str(),
                        plan.recipe_id.as_str(),
                        plan.trays,
                        plan.grams_needed,
                        date_str(plan.plant_by),
                        date_str(plan.harvest_date),
                        plan.status.as_str(),
                        ts(now)
                    ],
                )
                .await?;
            plans.push(plan);
        }
        Ok(plans)
    }

    pub async fn get_crop_plan(&self, id: &str) -> Result<CropPlan, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM crop_plans WHERE id = ?1"), [id])
            .await?;
        let row = rows.next().await?.ok_or_else(|| DatabaseError::NotFound {
            entity: "crop plan",
            id: id.to_string(),
        })?;
        row_to_plan(&row)
    }

    /// Plans ordered by planting date.
    pub async fn list_crop_plans(
        &self,
        status: Option<CropPlanStatus>,
        order_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<CropPlan>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM crop_plans
                     WHERE (?1 = '' OR status = ?1) AND (?2 = '' OR order_id = ?2)
                     ORDER BY plant_by, created_at LIMIT {limit}"
                ),
                libsql::params![
                    status.map_or("", CropPlanStatus::as_str),
                    order_id.unwrap_or("")
                ],
            )
            .await?;

        let mut plans = Vec::new();
        while let Some(row) = rows.next().await? {
            plans.push(row_to_plan(&row)?);
        }
        Ok(plans)
    }

    /// Approve, cancel, or complete a plan. Planting goes through
    /// [`SprigService::plant_crop_plan`] so a batch is always attached.
    pub async fn transition_crop_plan(
        &self,
        plan_id: &str,
        new_status: CropPlanStatus,
    ) -> Result<CropPlan, DatabaseError> {
        let current = self.get_crop_plan(plan_id).await?;

        if new_status == CropPlanStatus::Planted {
            return Err(DatabaseError::InvalidState(format!(
                "crop plan {plan_id} is planted by creating its batch, not by a status change"
            )));
        }
        if !current.status.can_transition_to(new_status) {
            return Err(DatabaseError::InvalidState(format!(
                "Cannot transition crop plan {} from {} to {}",
                plan_id, current.status, new_status
            )));
        }

        let now = now();
        self.db()
            .conn()
            .execute(
                "UPDATE crop_plans SET status = ?1, updated_at = ?2 WHERE id = ?3",
                libsql::params![new_status.as_str(), ts(now), plan_id],
            )
            .await?;

        Ok(CropPlan {
            status: new_status,
            updated_at: now,
            ..current
        })
    }

    /// Plant an approved plan: create its crop batch and link it.
    pub async fn plant_crop_plan(
        &self,
        plan_id: &str,
        tray_numbers: &[String],
        planted_at: DateTime<Utc>,
    ) -> Result<CropPlan, DatabaseError> {
        let plan = self.get_crop_plan(plan_id).await?;
        if plan.status != CropPlanStatus::Approved {
            return Err(DatabaseError::InvalidState(format!(
                "crop plan {plan_id} is {}; only approved plans can be planted",
                plan.status
            )));
        }
        if i64::try_from(tray_numbers.len()).ok() != Some(plan.trays) {
            tracing::warn!(
                plan_id,
                planned = plan.trays,
                planted = tray_numbers.len(),
                "planting a different number of trays than planned"
            );
        }

        let input = NewCropBatch {
            recipe_id: plan.recipe_id.clone(),
            tray_numbers: tray_numbers.to_vec(),
            planted_at,
            order_id: Some(plan.order_id.clone()),
            notes: Some(format!("crop plan {plan_id}")),
        };
        let now = now();

        let tx = self.begin().await?;
        let result = async {
            let batch_id = self.insert_crop_batch(&input).await?;
            self.db()
                .conn()
                .execute(
                    "UPDATE crop_plans SET status = ?1, batch_id = ?2, updated_at = ?3 WHERE id = ?4",
                    libsql::params![
                        CropPlanStatus::Planted.as_str(),
                        batch_id.as_str(),
                        ts(now),
                        plan_id
                    ],
                )
                .await?;
            Ok(batch_id)
        }
        .await;
        let batch_id = Self::finish(tx, result).await?;

        tracing::info!(plan_id, batch_id = %batch_id, "crop plan planted");
        Ok(CropPlan {
            status: CropPlanStatus::Planted,
            batch_id: Some(batch_id),
            updated_at: now,
            ..plan
        })
    }

    /// Mark the planted plans of a harvested batch completed.
    pub(crate) async fn complete_batch_plans(
        &self,
        batch_id: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let completed = self
            .db()
            .conn()
            .execute(
                "UPDATE crop_plans SET status = ?1, updated_at = ?2
                 WHERE batch_id = ?3 AND status = ?4",
                libsql::params![
                    CropPlanStatus::Completed.as_str(),
                    ts(at),
                    batch_id,
                    CropPlanStatus::Planted.as_str()
                ],
            )
            .await?;
        if completed > 0 {
            tracing::debug!(batch_id, plans = completed, "crop plans completed");
        }
        Ok(completed)
    }

    /// Non-cancelled plans with `plant_by` in `[from, to]`, grouped by day and recipe.
    pub async fn crop_plan_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CalendarDay>, DatabaseError> {
        if to < from {
            return Err(DatabaseError::Validation(format!(
                "calendar end {to} is before start {from}"
            )));
        }
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT p.plant_by, p.recipe_id, r.name, p.trays, p.id
                 FROM crop_plans p JOIN recipes r ON r.id = p.recipe_id
                 WHERE p.plant_by >= ?1 AND p.plant_by <= ?2 AND p.status <> ?3
                 ORDER BY p.plant_by, r.name, p.created_at",
                libsql::params![
                    date_str(from),
                    date_str(to),
                    CropPlanStatus::Cancelled.as_str()
                ],
            )
            .await?;

        let mut days: BTreeMap<NaiveDate, BTreeMap<String, CalendarEntry>> = BTreeMap::new();
        while let Some(row) = rows.next().await? {
            let date = parse_date(&row.get::<String>(0)?)?;
            let recipe_id: String = row.get(1)?;
            let recipe_name: String = row.get(2)?;
            let trays: i64 = row.get(3)?;
            let plan_id: String = row.get(4)?;

            let entry = days
                .entry(date)
                .or_default()
                .entry(recipe_name.clone())
                .or_insert_with(|| CalendarEntry {
                    recipe_id,
                    recipe_name,
                    trays: 0,
                    plan_ids: Vec::new(),
                });
            entry.trays += trays;
            entry.plan_ids.push(plan_id);
        }

        Ok(days
            .into_iter()
            .map(|(date, entries)| {
                let entries: Vec<CalendarEntry> = entries.into_values().collect();
                CalendarDay {
                    date,
                    total_trays: entries.iter().map(|e| e.trays).sum(),
                    entries,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::order::{NewOrder, NewOrderItem};
    use crate::test_support::helpers::{
        at, date, plain_recipe_input, seed_product, seed_recipe, test_service, trays,
    };
    use pretty_assertions::assert_eq;
    use sprig_core::enums::CropStage;

    /// Radish recipe (8 days, 250 g/tray), 100 g product, order of 6 + an
    /// item without a recipe. Harvest 2026-05-20.
    async fn order_with_plans(svc: &SprigService) -> (String, Vec<CropPlan>) {
        let recipe = seed_recipe(svc, plain_recipe_input("Radish")).await;
        let radish = seed_product(svc, "Radish 100g", Some(&recipe.id), 100.0, 450).await;
        let mystery = seed_product(svc, "Gift card", None, 0.0, 2000).await;
        let detail = svc
            .create_order(&NewOrder {
                customer_name: "Bistro".into(),
                delivery_date: date(2026, 5, 21),
                harvest_date: Some(date(2026, 5, 20)),
                items: vec![
                    NewOrderItem {
                        product_id: radish.id,
                        quantity: 6,
                        price_cents: None,
                    },
                    NewOrderItem {
                        product_id: mystery.id,
                        quantity: 1,
                        price_cents: None,
                    },
                ],
                notes: None,
            })
            .await
            .unwrap();
        let plans = svc.generate_crop_plans(&detail.order.id).await.unwrap();
        (detail.order.id, plans)
    }

    #[tokio::test]
    async fn generate_sizes_trays_and_plant_by() {
        let svc = test_service().await;
        let (_, plans) = order_with_plans(&svc).await;

        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert!(plan.id.starts_with("pln-"));
        assert_eq!(plan.grams_needed, 600.0);
        assert_eq!(plan.trays, 3);
        assert_eq!(plan.plant_by, date(2026, 5, 12));
        assert_eq!(plan.status, CropPlanStatus::Draft);
        assert_eq!(svc.get_crop_plan(&plan.id).await.unwrap(), *plan);
    }

    #[tokio::test]
    async fn regenerate_replaces_drafts_but_not_approved_plans() {
        let svc = test_service().await;
        let (order_id, plans) = order_with_plans(&svc).await;

        let again = svc.generate_crop_plans(&order_id).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_ne!(again[0].id, plans[0].id);
        assert_eq!(svc.db().count_rows("crop_plans").await.unwrap(), 1);

        svc.transition_crop_plan(&again[0].id, CropPlanStatus::Approved)
            .await
            .unwrap();
        let err = svc.generate_crop_plans(&order_id).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidState(_)));
        assert_eq!(svc.db().count_rows("crop_plans").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cancelled_order_cancels_open_plans() {
        let svc = test_service().await;
        let (order_id, plans) = order_with_plans(&svc).await;

        svc.transition_order(&order_id, OrderStatus::Cancelled)
            .await
            .unwrap();
        let plan = svc.get_crop_plan(&plans[0].id).await.unwrap();
        assert_eq!(plan.status, CropPlanStatus::Cancelled);

        let err = svc.generate_crop_plans(&order_id).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidState(_)));
    }

    #[tokio::test]
    async fn plant_requires_approval_and_links_batch() {
        let svc = test_service().await;
        let (order_id, plans) = order_with_plans(&svc).await;
        let plan_id = plans[0].id.clone();
        let labels = trays(&["P1", "P2", "P3"]);

        let err = svc
            .plant_crop_plan(&plan_id, &labels, at(2026, 5, 12, 7))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidState(_)));

        svc.transition_crop_plan(&plan_id, CropPlanStatus::Approved)
            .await
            .unwrap();
        let planted = svc
            .plant_crop_plan(&plan_id, &labels, at(2026, 5, 12, 7))
            .await
            .unwrap();
        assert_eq!(planted.status, CropPlanStatus::Planted);
        let batch_id = planted.batch_id.clone().unwrap();

        let batch = svc.get_batch(&batch_id).await.unwrap();
        assert_eq!(batch.batch.order_id.as_deref(), Some(order_id.as_str()));
        assert_eq!(batch.crops.len(), 3);

        svc.advance_stage(&batch_id, at(2026, 5, 14, 7)).await.unwrap();
        svc.record_harvest(&batch_id, 800.0, at(2026, 5, 20, 7), None)
            .await
            .unwrap();
        assert_eq!(
            svc.get_crop_plan(&plan_id).await.unwrap().status,
            CropPlanStatus::Completed
        );
    }

    async fn planted_batch(svc: &SprigService, plan_id: &str) -> String {
        svc.transition_crop_plan(plan_id, CropPlanStatus::Approved)
            .await
            .unwrap();
        svc.plant_crop_plan(plan_id, &trays(&["P1", "P2", "P3"]), at(2026, 5, 12, 7))
            .await
            .unwrap()
            .batch_id
            .unwrap()
    }

    #[tokio::test]
    async fn advancing_batch_to_harvested_completes_plan() {
        let svc = test_service().await;
        let (_, plans) = order_with_plans(&svc).await;
        let plan_id = plans[0].id.clone();
        let batch_id = planted_batch(&svc, &plan_id).await;

        svc.advance_stage(&batch_id, at(2026, 5, 14, 7)).await.unwrap();
        assert_eq!(
            svc.get_crop_plan(&plan_id).await.unwrap().status,
            CropPlanStatus::Planted
        );

        let done = svc.advance_stage(&batch_id, at(2026, 5, 20, 7)).await.unwrap();
        assert_eq!(done.stage, Some(CropStage::Harvested));
        assert_eq!(
            svc.get_crop_plan(&plan_id).await.unwrap().status,
            CropPlanStatus::Completed
        );
    }

    #[tokio::test]
    async fn planted_batch_cannot_be_deleted() {
        let svc = test_service().await;
        let (_, plans) = order_with_plans(&svc).await;
        let plan_id = plans[0].id.clone();
        let batch_id = planted_batch(&svc, &plan_id).await;

        let err = svc.delete_batch(&batch_id).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidState(_)), "{err}");
        let plan = svc.get_crop_plan(&plan_id).await.unwrap();
        assert_eq!(plan.status, CropPlanStatus::Planted);
        assert_eq!(plan.batch_id.as_deref(), Some(batch_id.as_str()));
    }

    #[tokio::test]
    async fn failed_planting_leaves_plan_approved() {
        let svc = test_service().await;
        let (_, plans) = order_with_plans(&svc).await;
        let plan_id = plans[0].id.clone();
        svc.transition_crop_plan(&plan_id, CropPlanStatus::Approved)
            .await
            .unwrap();

        let err = svc
            .plant_crop_plan(&plan_id, &trays(&["P1", "P1"]), at(2026, 5, 12, 7))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
        assert_eq!(
            svc.get_crop_plan(&plan_id).await.unwrap().status,
            CropPlanStatus::Approved
        );
        assert_eq!(svc.db().count_rows("crop_batches").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn transition_to_planted_is_refused() {
        let svc = test_service().await;
        let (_, plans) = order_with_plans(&svc).await;
        svc.transition_crop_plan(&plans[0].id, CropPlanStatus::Approved)
            .await
            .unwrap();
        let err = svc
            .transition_crop_plan(&plans[0].id, CropPlanStatus::Planted)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidState(_)));
    }

    #[tokio::test]
    async fn calendar_groups_by_day_and_recipe() {
        let svc = test_service().await;
        let (order_id, _) = order_with_plans(&svc).await;
        let radish_product = svc.get_order(&order_id).await.unwrap().items[0]
            .product_id
            .clone();
        let cafe = svc
            .create_order(&NewOrder {
                customer_name: "Cafe".into(),
                delivery_date: date(2026, 5, 21),
                harvest_date: Some(date(2026, 5, 20)),
                items: vec![NewOrderItem {
                    product_id: radish_product,
                    quantity: 2,
                    price_cents: None,
                }],
                notes: None,
            })
            .await
            .unwrap();
        svc.generate_crop_plans(&cafe.order.id).await.unwrap();

        let calendar = svc
            .crop_plan_calendar(date(2026, 5, 1), date(2026, 5, 31))
            .await
            .unwrap();
        assert_eq!(calendar.len(), 1);
        assert_eq!(calendar[0].date, date(2026, 5, 12));
        assert_eq!(calendar[0].total_trays, 4);
        assert_eq!(calendar[0].entries.len(), 1);
        assert_eq!(calendar[0].entries[0].plan_ids.len(), 2);

        let empty = svc
            .crop_plan_calendar(date(2026, 6, 1), date(2026, 6, 30))
            .await
            .unwrap();
        assert!(empty.is_empty());
        assert!(svc
            .crop_plan_calendar(date(2026, 6, 2), date(2026, 6, 1))
            .await
            .is_err());
    }
}
