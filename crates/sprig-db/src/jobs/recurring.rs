//! Child order generation from recurring order templates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use sprig_core::entities::Order;
use sprig_core::enums::OrderStatus;
use sprig_core::ids::PREFIX_ORDER;

use crate::error::DatabaseError;
use crate::helpers::{date_str, now, ts};
use crate::repos::order::{ResolvedItem, SELECT_COLS, row_to_order};
use crate::service::SprigService;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecurringOptions {
    pub dry_run: bool,
    /// Most child orders generated per template in one run.
    pub max_catch_up: u32,
}

impl Default for RecurringOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_catch_up: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedOrder {
    pub template_id: String,
    /// `None` in a dry run.
    pub order_id: Option<String>,
    pub delivery_date: NaiveDate,
    pub harvest_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivatedTemplate {
    pub template_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTemplate {
    pub template_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringReport {
    pub today: NaiveDate,
    pub dry_run: bool,
    pub templates_checked: usize,
    pub generated: Vec<GeneratedOrder>,
    pub deactivated: Vec<DeactivatedTemplate>,
    pub failed: Vec<FailedTemplate>,
}

/// What one template owes as of `today`.
#[derive(Debug, PartialEq, Eq)]
struct Schedule {
    occurrences: Vec<NaiveDate>,
    next_generation_date: NaiveDate,
    ended: bool,
}

fn schedule_for(
    template: &Order,
    today: NaiveDate,
    max_catch_up: u32,
) -> Result<Schedule, DatabaseError> {
    let frequency = template.recurring_frequency.ok_or_else(|| {
        DatabaseError::InvalidState(format!("template {} has no frequency", template.id))
    })?;
    let mut next = template.next_generation_date.ok_or_else(|| {
        DatabaseError::InvalidState(format!("template {} has no next generation date", template.id))
    })?;
    let anchor = template.recurring_start_date.unwrap_or(next);
    let end = template.recurring_end_date;
    let past_end = |date: NaiveDate| end.is_some_and(|end| date > end);

    let mut occurrences = Vec::new();
    while next <= today && !past_end(next) && occurrences.len() < max_catch_up as usize {
        occurrences.push(next);
        next = frequency.next_after(anchor, next).ok_or_else(|| {
            DatabaseError::InvalidState(format!("template {} ran past the calendar", template.id))
        })?;
    }

    Ok(Schedule {
        occurrences,
        next_generation_date: next,
        ended: past_end(next),
    })
}

impl SprigService {
    async fn due_templates(&self, today: NaiveDate) -> Result<Vec<Order>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM orders
                     WHERE is_recurring = 1 AND is_recurring_active = 1
                       AND next_generation_date IS NOT NULL AND next_generation_date <= ?1
                     ORDER BY next_generation_date, created_at"
                ),
                [date_str(today)],
            )
            .await?;

        let mut templates = Vec::new();
        while let Some(row) = rows.next().await? {
            templates.push(row_to_order(&row)?);
        }
        Ok(templates)
    }

    /// Generate child orders for every recurring template due on or before `today`.
    ///
    /// Each template is handled in its own transaction; a failing template is
    /// reported and the run continues.
    pub async fn process_recurring_orders(
        &self,
        today: NaiveDate,
        options: RecurringOptions,
    ) -> Result<RecurringReport, DatabaseError> {
        let templates = self.due_templates(today).await?;
        let mut report = RecurringReport {
            today,
            dry_run: options.dry_run,
            templates_checked: templates.len(),
            generated: Vec::new(),
            deactivated: Vec::new(),
            failed: Vec::new(),
        };

        for template in &templates {
            match self.process_template(template, today, options).await {
                Ok((generated, ended)) => {
                    report.generated.extend(generated);
                    if ended {
                        report.deactivated.push(DeactivatedTemplate {
                            template_id: template.id.clone(),
                            reason: "past end date".into(),
                        });
                    }
                }
                Err(error) => {
                    tracing::warn!(template_id = %template.id, %error, "recurring template failed");
                    report.failed.push(FailedTemplate {
                        template_id: template.id.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            today = %today,
            dry_run = options.dry_run,
            checked = report.templates_checked,
            generated = report.generated.len(),
            deactivated = report.deactivated.len(),
            failed = report.failed.len(),
            "recurring orders processed"
        );
        Ok(report)
    }

    async fn process_template(
        &self,
        template: &Order,
        today: NaiveDate,
        options: RecurringOptions,
    ) -> Result<(Vec<GeneratedOrder>, bool), DatabaseError> {
        let schedule = schedule_for(template, today, options.max_catch_up)?;
        let planned: Vec<GeneratedOrder> = schedule
            .occurrences
            .iter()
            .map(|&delivery_date| GeneratedOrder {
                template_id: template.id.clone(),
                order_id: None,
                delivery_date,
                harvest_date: self.default_harvest_date(delivery_date),
            })
            .collect();
        if options.dry_run {
            return Ok((planned, schedule.ended));
        }

        let tx = self.begin().await?;
        let result = self.write_template_run(template, &schedule, planned).await;
        let generated = Self::finish(tx, result).await?;
        Ok((generated, schedule.ended))
    }

    async fn write_template_run(
        &self,
        template: &Order,
        schedule: &Schedule,
        planned: Vec<GeneratedOrder>,
    ) -> Result<Vec<GeneratedOrder>, DatabaseError> {
        let items: Vec<ResolvedItem> = self
            .order_items(&template.id)
            .await?
            .into_iter()
            .map(|item| ResolvedItem {
                product_id: item.product_id,
                quantity: item.quantity,
                price_cents: item.price_cents,
            })
            .collect();

        let now = now();
        let mut generated = Vec::with_capacity(planned.len());
        for mut entry in planned {
            let child = Order {
                id: self.db().generate_id(PREFIX_ORDER).await?,
                customer_name: template.customer_name.clone(),
                status: OrderStatus::Pending,
                harvest_date: entry.harvest_date,
                delivery_date: entry.delivery_date,
                is_recurring: false,
                recurring_frequency: None,
                recurring_start_date: None,
                recurring_end_date: None,
                next_generation_date: None,
                is_recurring_active: false,
                parent_recurring_order_id: Some(template.id.clone()),
                notes: template.notes.clone(),
                created_at: now,
                updated_at: now,
            };
            self.insert_order(&child).await?;
            self.insert_order_items(&child.id, &items).await?;
            tracing::debug!(
                template_id = %template.id,
                order_id = %child.id,
                delivery = %entry.delivery_date,
                "child order generated"
            );
            entry.order_id = Some(child.id);
            generated.push(entry);
        }

        self.db()
            .conn()
            .execute(
                "UPDATE orders SET next_generation_date = ?1, is_recurring_active = ?2,
                                   updated_at = ?3
                 WHERE id = ?4",
                libsql::params![
                    date_str(schedule.next_generation_date),
                    i64::from(!schedule.ended),
                    ts(now),
                    template.id.as_str()
                ],
            )
            .await?;
        if schedule.ended {
            tracing::info!(template_id = %template.id, "recurring template passed its end date");
        }
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::order::{NewOrderItem, NewRecurringOrder, OrderFilter};
    use crate::test_support::helpers::{date, seed_product, test_service};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use sprig_core::enums::RecurringFrequency;

    fn template(
        frequency: RecurringFrequency,
        next: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Order {
        let now = now();
        Order {
            id: "ord-t".into(),
            customer_name: "Box".into(),
            status: OrderStatus::Template,
            harvest_date: next,
            delivery_date: next,
            is_recurring: true,
            recurring_frequency: Some(frequency),
            recurring_start_date: Some(next),
            recurring_end_date: end,
            next_generation_date: Some(next),
            is_recurring_active: true,
            parent_recurring_order_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case::not_due(RecurringFrequency::Weekly, date(2026, 3, 10), None, 0, date(2026, 3, 10), false)]
    #[case::due_today(RecurringFrequency::Weekly, date(2026, 3, 9), None, 1, date(2026, 3, 16), false)]
    #[case::weekly_catch_up(RecurringFrequency::Weekly, date(2026, 2, 16), None, 4, date(2026, 3, 16), false)]
    #[case::biweekly(RecurringFrequency::Biweekly, date(2026, 2, 23), None, 2, date(2026, 3, 23), false)]
    #[case::monthly_keeps_day(RecurringFrequency::Monthly, date(2026, 1, 31), None, 2, date(2026, 3, 31), false)]
    #[case::end_reached(RecurringFrequency::Weekly, date(2026, 3, 2), Some(date(2026, 3, 9)), 2, date(2026, 3, 16), true)]
    #[case::already_past_end(RecurringFrequency::Weekly, date(2026, 3, 2), Some(date(2026, 3, 1)), 0, date(2026, 3, 2), true)]
    fn schedule_cases(
        #[case] frequency: RecurringFrequency,
        #[case] next: NaiveDate,
        #[case] end: Option<NaiveDate>,
        #[case] expected_count: usize,
        #[case] expected_next: NaiveDate,
        #[case] expected_ended: bool,
    ) {
        let today = date(2026, 3, 9);
        let schedule = schedule_for(&template(frequency, next, end), today, 12).unwrap();
        assert_eq!(schedule.occurrences.len(), expected_count);
        assert_eq!(schedule.next_generation_date, expected_next);
        assert_eq!(schedule.ended, expected_ended);
    }

    #[test]
    fn schedule_is_capped_by_max_catch_up() {
        let t = template(RecurringFrequency::Weekly, date(2026, 1, 5), None);
        let schedule = schedule_for(&t, date(2026, 3, 9), 3).unwrap();
        assert_eq!(
            schedule.occurrences,
            vec![date(2026, 1, 5), date(2026, 1, 12), date(2026, 1, 19)]
        );
        assert_eq!(schedule.next_generation_date, date(2026, 1, 26));
        assert!(!schedule.ended);
    }

    #[test]
    fn monthly_schedule_returns_to_the_start_day() {
        let mut t = template(RecurringFrequency::Monthly, date(2026, 2, 28), None);
        t.recurring_start_date = Some(date(2026, 1, 31));
        let schedule = schedule_for(&t, date(2026, 4, 30), 12).unwrap();
        assert_eq!(
            schedule.occurrences,
            vec![date(2026, 2, 28), date(2026, 3, 31), date(2026, 4, 30)]
        );
        assert_eq!(schedule.next_generation_date, date(2026, 5, 31));
    }

    async fn weekly_template(svc: &SprigService, start: NaiveDate, end: Option<NaiveDate>) -> String {
        let p = seed_product(svc, &format!("Pea {start}"), None, 80.0, 400).await;
        svc.create_recurring_order(&NewRecurringOrder {
            customer_name: "Farm box".into(),
            frequency: RecurringFrequency::Weekly,
            start_date: start,
            end_date: end,
            items: vec![NewOrderItem {
                product_id: p.id,
                quantity: 5,
                price_cents: Some(350),
            }],
            notes: Some("leave at back door".into()),
        })
        .await
        .unwrap()
        .order
        .id
    }

    #[tokio::test]
    async fn generates_children_and_advances_template() {
        let svc = test_service().await;
        let template_id = weekly_template(&svc, date(2026, 3, 2), None).await;

        let report = svc
            .process_recurring_orders(date(2026, 3, 9), RecurringOptions::default())
            .await
            .unwrap();

        assert_eq!(report.templates_checked, 1);
        assert_eq!(report.generated.len(), 2);
        assert!(report.failed.is_empty());
        let deliveries: Vec<_> = report.generated.iter().map(|g| g.delivery_date).collect();
        assert_eq!(deliveries, vec![date(2026, 3, 2), date(2026, 3, 9)]);

        let child_id = report.generated[0].order_id.clone().unwrap();
        let child = svc.get_order(&child_id).await.unwrap();
        assert_eq!(child.order.status, OrderStatus::Pending);
        assert_eq!(child.order.parent_recurring_order_id.as_deref(), Some(template_id.as_str()));
        assert_eq!(child.order.harvest_date, date(2026, 3, 1));
        assert_eq!(child.order.notes.as_deref(), Some("leave at back door"));
        assert_eq!(child.items.len(), 1);
        assert_eq!(child.items[0].quantity, 5);
        assert_eq!(child.total_cents, 1750);

        let template = svc.get_order(&template_id).await.unwrap().order;
        assert_eq!(template.next_generation_date, Some(date(2026, 3, 16)));
        assert!(template.is_recurring_active);

        // Re-running the same day generates nothing more.
        let again = svc
            .process_recurring_orders(date(2026, 3, 9), RecurringOptions::default())
            .await
            .unwrap();
        assert_eq!(again.templates_checked, 0);
        assert!(again.generated.is_empty());
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let svc = test_service().await;
        let template_id = weekly_template(&svc, date(2026, 3, 2), None).await;

        let report = svc
            .process_recurring_orders(
                date(2026, 3, 9),
                RecurringOptions {
                    dry_run: true,
                    max_catch_up: 12,
                },
            )
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.generated.len(), 2);
        assert!(report.generated.iter().all(|g| g.order_id.is_none()));
        assert_eq!(svc.db().count_rows("orders").await.unwrap(), 1);
        let template = svc.get_order(&template_id).await.unwrap().order;
        assert_eq!(template.next_generation_date, Some(date(2026, 3, 2)));
    }

    #[tokio::test]
    async fn template_past_end_date_is_deactivated() {
        let svc = test_service().await;
        let template_id = weekly_template(&svc, date(2026, 3, 2), Some(date(2026, 3, 12))).await;

        let report = svc
            .process_recurring_orders(date(2026, 3, 20), RecurringOptions::default())
            .await
            .unwrap();

        assert_eq!(report.generated.len(), 2);
        assert_eq!(report.deactivated.len(), 1);
        assert_eq!(report.deactivated[0].template_id, template_id);
        let template = svc.get_order(&template_id).await.unwrap().order;
        assert!(!template.is_recurring_active);

        let later = svc
            .process_recurring_orders(date(2026, 4, 20), RecurringOptions::default())
            .await
            .unwrap();
        assert_eq!(later.templates_checked, 0);
    }

    #[tokio::test]
    async fn templates_not_yet_due_are_skipped() {
        let svc = test_service().await;
        weekly_template(&svc, date(2026, 3, 10), None).await;

        let report = svc
            .process_recurring_orders(date(2026, 3, 9), RecurringOptions::default())
            .await
            .unwrap();
        assert_eq!(report.templates_checked, 0);

        let children = OrderFilter {
            recurring: Some(false),
            ..OrderFilter::default()
        };
        assert!(svc.list_orders(&children, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn broken_template_does_not_stop_others() {
        let svc = test_service().await;
        let broken = weekly_template(&svc, date(2026, 3, 2), None).await;
        let healthy = weekly_template(&svc, date(2026, 3, 9), None).await;
        svc.db()
            .conn()
            .execute(
                "UPDATE orders SET recurring_frequency = NULL WHERE id = ?1",
                [broken.as_str()],
            )
            .await
            .unwrap();

        let report = svc
            .process_recurring_orders(date(2026, 3, 9), RecurringOptions::default())
            .await
            .unwrap();

        assert_eq!(report.templates_checked, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].template_id, broken);
        assert_eq!(report.generated.len(), 1);
        assert_eq!(report.generated[0].template_id, healthy);
    }
}
