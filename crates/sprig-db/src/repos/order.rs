//! Order repository: one-off orders, recurring templates, and status changes.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use sprig_core::entities::{Order, OrderDetail, OrderItem};
use sprig_core::enums::{CropPlanStatus, OrderStatus, RecurringFrequency};
use sprig_core::ids::{PREFIX_ORDER, PREFIX_ORDER_ITEM};

use crate::error::DatabaseError;
use crate::helpers::{
    clean_opt, date_str, get_bool, get_opt_string, now, parse_date, parse_datetime,
    parse_optional_date, parse_optional_enum, parse_enum, ts,
};
use crate::service::SprigService;

pub(crate) const SELECT_COLS: &str = "id, customer_name, status, harvest_date, delivery_date, \
     is_recurring, recurring_frequency, recurring_start_date, recurring_end_date, \
     next_generation_date, is_recurring_active, parent_recurring_order_id, notes, \
     created_at, updated_at";

const ITEM_COLS: &str = "id, order_id, product_id, quantity, price_cents";

pub(crate) fn row_to_order(row: &libsql::Row) -> Result<Order, DatabaseError> {
    Ok(Order {
        id: row.get(0)?,
        customer_name: row.get(1)?,
        status: parse_enum(&row.get::<String>(2)?)?,
        harvest_date: parse_date(&row.get::<String>(3)?)?,
        delivery_date: parse_date(&row.get::<String>(4)?)?,
        is_recurring: get_bool(row, 5)?,
        recurring_frequency: parse_optional_enum(get_opt_string(row, 6)?.as_deref())?,
        recurring_start_date: parse_optional_date(get_opt_string(row, 7)?.as_deref())?,
        recurring_end_date: parse_optional_date(get_opt_string(row, 8)?.as_deref())?,
        next_generation_date: parse_optional_date(get_opt_string(row, 9)?.as_deref())?,
        is_recurring_active: get_bool(row, 10)?,
        parent_recurring_order_id: get_opt_string(row, 11)?,
        notes: get_opt_string(row, 12)?,
        created_at: parse_datetime(&row.get::<String>(13)?)?,
        updated_at: parse_datetime(&row.get::<String>(14)?)?,
    })
}

fn row_to_item(row: &libsql::Row) -> Result<OrderItem, DatabaseError> {
    Ok(OrderItem {
        id: row.get(0)?,
        order_id: row.get(1)?,
        product_id: row.get(2)?,
        quantity: row.get(3)?,
        price_cents: row.get(4)?,
    })
}

/// A line of a new order. `price_cents` defaults to the product price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: String,
    pub quantity: i64,
    pub price_cents: Option<i64>,
}

/// Input for [`SprigService::create_order`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_name: String,
    pub delivery_date: NaiveDate,
    pub harvest_date: Option<NaiveDate>,
    pub items: Vec<NewOrderItem>,
    pub notes: Option<String>,
}

/// Input for [`SprigService::create_recurring_order`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecurringOrder {
    pub customer_name: String,
    pub frequency: RecurringFrequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub items: Vec<NewOrderItem>,
    pub notes: Option<String>,
}

/// Filter for [`SprigService::list_orders`]. All fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Case-insensitive substring of the customer name.
    pub customer: Option<String>,
    pub recurring: Option<bool>,
}

/// An order line after product and price resolution.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedItem {
    pub product_id: String,
    pub quantity: i64,
    pub price_cents: i64,
}

/// Sum of line totals, saturating at `i64::MAX`.
fn order_total(items: &[OrderItem]) -> i64 {
    items.iter().fold(0_i64, |total, item| {
        total.saturating_add(item.quantity.saturating_mul(item.price_cents))
    })
}

impl SprigService {
    /// Harvest date used when an order does not give one.
    #[must_use]
    pub fn default_harvest_date(&self, delivery_date: NaiveDate) -> NaiveDate {
        delivery_date - Duration::days(self.settings().harvest_lead_days)
    }

    async fn resolve_items(
        &self,
        items: &[NewOrderItem],
    ) -> Result<Vec<ResolvedItem>, DatabaseError> {
        if items.is_empty() {
            return Err(DatabaseError::Validation("an order needs at least one item".into()));
        }
        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
            if item.quantity <= 0 {
                return Err(DatabaseError::Validation(format!(
                    "quantity for {} must be positive (got {})",
                    item.product_id, item.quantity
                )));
            }
            let product = self.get_product(&item.product_id).await?;
            if !product.is_active {
                return Err(DatabaseError::InvalidState(format!(
                    "product {} ({}) is inactive",
                    product.name, product.id
                )));
            }
            let price_cents = item.price_cents.unwrap_or(product.price_cents);
            if price_cents < 0 {
                return Err(DatabaseError::Validation(format!(
                    "price for {} must not be negative",
                    product.id
                )));
            }
            resolved.push(ResolvedItem {
                product_id: product.id,
                quantity: item.quantity,
                price_cents,
            });
        }
        Ok(resolved)
    }

    pub(crate) async fn insert_order(&self, order: &Order) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO orders ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
                ),
                libsql::params![
                    order.id.as_str(),
                    order.customer_name.as_str(),
                    order.status.as_str(),
                    date_str(order.harvest_date),
                    date_str(order.delivery_date),
                    i64::from(order.is_recurring),
                    order.recurring_frequency.map(RecurringFrequency::as_str),
                    order.recurring_start_date.map(date_str),
                    order.recurring_end_date.map(date_str),
                    order.next_generation_date.map(date_str),
                    i64::from(order.is_recurring_active),
                    order.parent_recurring_order_id.as_deref(),
                    order.notes.as_deref(),
                    ts(order.created_at),
                    ts(order.updated_at)
                ],
            )
            .await?;
        Ok(())
    }

    pub(crate) async fn insert_order_items(
        &self,
        order_id: &str,
        items: &[ResolvedItem],
    ) -> Result<Vec<OrderItem>, DatabaseError> {
        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            let stored_item = OrderItem {
                id: self.db().generate_id(PREFIX_ORDER_ITEM).await?,
                order_id: order_id.to_string(),
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                price_cents: item.price_cents,
            };
            self.db()
                .conn()
                .execute(
                    &format!("INSERT INTO order_items ({ITEM_COLS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                    libsql::params![
                        stored_item.id.as_str(),
                        order_id,
                        stored_item.product_id.as_str(),
                        stored_item.quantity,
                        stored_item.price_cents
                    ],
                )
                .await?;
            stored.push(stored_item);
        }
        Ok(stored)
    }

    pub async fn create_order(&self, input: &NewOrder) -> Result<OrderDetail, DatabaseError> {
        let customer_name = input.customer_name.trim();
        if customer_name.is_empty() {
            return Err(DatabaseError::Validation("customer name must not be empty".into()));
        }
        let harvest_date = input
            .harvest_date
            .unwrap_or_else(|| self.default_harvest_date(input.delivery_date));
        if harvest_date > input.delivery_date {
            return Err(DatabaseError::Validation(format!(
                "harvest date {harvest_date} is after delivery date {}",
                input.delivery_date
            )));
        }
        let items = self.resolve_items(&input.items).await?;

        let now = now();
        let order = Order {
            id: self.db().generate_id(PREFIX_ORDER).await?,
            customer_name: customer_name.to_string(),
            status: OrderStatus::Pending,
            harvest_date,
            delivery_date: input.delivery_date,
            is_recurring: false,
            recurring_frequency: None,
            recurring_start_date: None,
            recurring_end_date: None,
            next_generation_date: None,
            is_recurring_active: false,
            parent_recurring_order_id: None,
            notes: clean_opt(input.notes.as_deref()),
            created_at: now,
            updated_at: now,
        };

        let tx = self.begin().await?;
        let result = async {
            self.insert_order(&order).await?;
            self.insert_order_items(&order.id, &items).await
        }
        .await;
        let items = Self::finish(tx, result).await?;

        tracing::debug!(order_id = %order.id, customer = %order.customer_name, "order created");
        let total_cents = order_total(&items);
        Ok(OrderDetail {
            order,
            items,
            total_cents,
        })
    }

    /// Store a recurring order template. Child orders are generated by
    /// [`SprigService::process_recurring_orders`].
    pub async fn create_recurring_order(
        &self,
        input: &NewRecurringOrder,
    ) -> Result<OrderDetail, DatabaseError> {
        let customer_name = input.customer_name.trim();
        if customer_name.is_empty() {
            return Err(DatabaseError::Validation("customer name must not be empty".into()));
        }
        if let Some(end) = input.end_date.filter(|end| *end < input.start_date) {
            return Err(DatabaseError::Validation(format!(
                "end date {end} is before start date {}",
                input.start_date
            )));
        }
        let items = self.resolve_items(&input.items).await?;

        let now = now();
        let order = Order {
            id: self.db().generate_id(PREFIX_ORDER).await?,
            customer_name: customer_name.to_string(),
            status: OrderStatus::Template,
            harvest_date: self.default_harvest_date(input.start_date),
            delivery_date: input.start_date,
            is_recurring: true,
            recurring_frequency: Some(input.frequency),
            recurring_start_date: Some(input.start_date),
            recurring_end_date: input.end_date,
            next_generation_date: Some(input.start_date),
            is_recurring_active: true,
            parent_recurring_order_id: None,
            notes: clean_opt(input.notes.as_deref()),
            created_at: now,
            updated_at: now,
        };

        let tx = self.begin().await?;
        let result = async {
            self.insert_order(&order).await?;
            self.insert_order_items(&order.id, &items).await
        }
        .await;
        let items = Self::finish(tx, result).await?;

        tracing::info!(
            order_id = %order.id,
            frequency = %input.frequency,
            start = %input.start_date,
            "recurring order template created"
        );
        let total_cents = order_total(&items);
        Ok(OrderDetail {
            order,
            items,
            total_cents,
        })
    }

    pub(crate) async fn get_order_row(&self, id: &str) -> Result<Order, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM orders WHERE id = ?1"), [id])
            .await?;
        let row = rows.next().await?.ok_or_else(|| DatabaseError::NotFound {
            entity: "order",
            id: id.to_string(),
        })?;
        row_to_order(&row)
    }

    pub async fn order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {ITEM_COLS} FROM order_items WHERE order_id = ?1 ORDER BY rowid"),
                [order_id],
            )
            .await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(row_to_item(&row)?);
        }
        Ok(items)
    }

    pub async fn get_order(&self, id: &str) -> Result<OrderDetail, DatabaseError> {
        let order = self.get_order_row(id).await?;
        let items = self.order_items(id).await?;
        let total_cents = order_total(&items);
        Ok(OrderDetail {
            order,
            items,
            total_cents,
        })
    }

    pub async fn list_orders(
        &self,
        filter: &OrderFilter,
        limit: u32,
    ) -> Result<Vec<Order>, DatabaseError> {
        let mut clauses = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();
        let mut idx = 1usize;

        if let Some(status) = filter.status {
            clauses.push(format!("status = ?{idx}"));
            params.push(status.as_str().into());
            idx += 1;
        }
        if let Some(ref customer) = filter.customer {
            clauses.push(format!("lower(customer_name) LIKE ?{idx}"));
            params.push(format!("%{}%", customer.trim().to_lowercase()).into());
            idx += 1;
        }
        if let Some(recurring) = filter.recurring {
            clauses.push(format!("is_recurring = ?{idx}"));
            params.push(i64::from(recurring).into());
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM orders {where_sql}
                     ORDER BY delivery_date DESC, created_at DESC LIMIT {limit}"
                ),
                libsql::params_from_iter(params),
            )
            .await?;

        let mut orders = Vec::new();
        while let Some(row) = rows.next().await? {
            orders.push(row_to_order(&row)?);
        }
        Ok(orders)
    }

    /// Move an order to `new_status`. Cancelling also cancels its open crop plans.
    pub async fn transition_order(
        &self,
        order_id: &str,
        new_status: OrderStatus,
    ) -> Result<Order, DatabaseError> {
        let current = self.get_order_row(order_id).await?;

        if !current.status.can_transition_to(new_status) {
            return Err(DatabaseError::InvalidState(format!(
                "Cannot transition order {} from {} to {}",
                order_id, current.status, new_status
            )));
        }

        let now = now();
        let tx = self.begin().await?;
        let result = async {
            self.db()
                .conn()
                .execute(
                    "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    libsql::params![new_status.as_str(), ts(now), order_id],
                )
                .await?;
            if new_status == OrderStatus::Cancelled {
                let cancelled = self
                    .db()
                    .conn()
                    .execute(
                        "UPDATE crop_plans SET status = ?1, updated_at = ?2
                         WHERE order_id = ?3 AND status IN (?4, ?5)",
                        libsql::params![
                            CropPlanStatus::Cancelled.as_str(),
                            ts(now),
                            order_id,
                            CropPlanStatus::Draft.as_str(),
                            CropPlanStatus::Approved.as_str()
                        ],
                    )
                    .await?;
                if cancelled > 0 {
                    tracing::info!(order_id, plans = cancelled, "cancelled crop plans of order");
                }
            }
            Ok(())
        }
        .await;
        Self::finish(tx, result).await?;

        Ok(Order {
            status: new_status,
            updated_at: now,
            ..current
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{date, seed_product, test_service};
    use pretty_assertions::assert_eq;

    #[test]
    fn order_total_saturates_instead_of_overflowing() {
        let line = |quantity, price_cents| OrderItem {
            id: "itm-1".into(),
            order_id: "ord-1".into(),
            product_id: "prd-1".into(),
            quantity,
            price_cents,
        };
        assert_eq!(order_total(&[line(3, 450), line(2, 100)]), 1550);
        assert_eq!(order_total(&[line(i64::MAX, 2)]), i64::MAX);
        assert_eq!(order_total(&[line(i64::MAX / 2, 1), line(i64::MAX / 2, 1), line(5, 1)]), i64::MAX);
    }

    fn item(product_id: &str, quantity: i64) -> NewOrderItem {
        NewOrderItem {
            product_id: product_id.to_string(),
            quantity,
            price_cents: None,
        }
    }

    #[tokio::test]
    async fn create_order_defaults_harvest_date_and_prices() {
        let svc = test_service().await;
        let p = seed_product(&svc, "Radish 100g", None, 100.0, 450).await;

        let detail = svc
            .create_order(&NewOrder {
                customer_name: " Green Bistro ".into(),
                delivery_date: date(2026, 5, 8),
                harvest_date: None,
                items: vec![item(&p.id, 3)],
                notes: None,
            })
            .await
            .unwrap();

        assert!(detail.order.id.starts_with("ord-"));
        assert_eq!(detail.order.customer_name, "Green Bistro");
        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.order.harvest_date, date(2026, 5, 7));
        assert_eq!(detail.items[0].price_cents, 450);
        assert_eq!(detail.total_cents, 1350);

        let fetched = svc.get_order(&detail.order.id).await.unwrap();
        assert_eq!(fetched, detail);
    }

    #[tokio::test]
    async fn create_order_validates_items() {
        let svc = test_service().await;
        let p = seed_product(&svc, "Radish 100g", None, 100.0, 450).await;
        let base = NewOrder {
            customer_name: "Bistro".into(),
            delivery_date: date(2026, 5, 8),
            harvest_date: None,
            items: vec![],
            notes: None,
        };

        let err = svc.create_order(&base).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));

        let zero = NewOrder {
            items: vec![item(&p.id, 0)],
            ..base.clone()
        };
        assert!(matches!(
            svc.create_order(&zero).await.unwrap_err(),
            DatabaseError::Validation(_)
        ));

        svc.set_product_active(&p.id, false).await.unwrap();
        let inactive = NewOrder {
            items: vec![item(&p.id, 1)],
            ..base
        };
        assert!(matches!(
            svc.create_order(&inactive).await.unwrap_err(),
            DatabaseError::InvalidState(_)
        ));
        assert_eq!(svc.db().count_rows("orders").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn harvest_after_delivery_is_rejected() {
        let svc = test_service().await;
        let p = seed_product(&svc, "Radish 100g", None, 100.0, 450).await;
        let err = svc
            .create_order(&NewOrder {
                customer_name: "Bistro".into(),
                delivery_date: date(2026, 5, 8),
                harvest_date: Some(date(2026, 5, 9)),
                items: vec![item(&p.id, 1)],
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[tokio::test]
    async fn recurring_order_is_a_template() {
        let svc = test_service().await;
        let p = seed_product(&svc, "Pea 80g", None, 80.0, 400).await;

        let detail = svc
            .create_recurring_order(&NewRecurringOrder {
                customer_name: "Farm box".into(),
                frequency: RecurringFrequency::Weekly,
                start_date: date(2026, 3, 2),
                end_date: Some(date(2026, 6, 1)),
                items: vec![item(&p.id, 10)],
                notes: None,
            })
            .await
            .unwrap();

        let order = &detail.order;
        assert_eq!(order.status, OrderStatus::Template);
        assert!(order.is_recurring);
        assert!(order.is_recurring_active);
        assert_eq!(order.next_generation_date, Some(date(2026, 3, 2)));
        assert_eq!(order.recurring_frequency, Some(RecurringFrequency::Weekly));
        assert_eq!(svc.get_order(&order.id).await.unwrap(), detail);
    }

    #[tokio::test]
    async fn recurring_order_end_before_start_is_rejected() {
        let svc = test_service().await;
        let p = seed_product(&svc, "Pea 80g", None, 80.0, 400).await;
        let err = svc
            .create_recurring_order(&NewRecurringOrder {
                customer_name: "Farm box".into(),
                frequency: RecurringFrequency::Monthly,
                start_date: date(2026, 3, 2),
                end_date: Some(date(2026, 3, 1)),
                items: vec![item(&p.id, 1)],
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[tokio::test]
    async fn transition_order_enforces_table() {
        let svc = test_service().await;
        let p = seed_product(&svc, "Radish 100g", None, 100.0, 450).await;
        let detail = svc
            .create_order(&NewOrder {
                customer_name: "Bistro".into(),
                delivery_date: date(2026, 5, 8),
                harvest_date: None,
                items: vec![item(&p.id, 1)],
                notes: None,
            })
            .await
            .unwrap();
        let id = detail.order.id;

        let err = svc
            .transition_order(&id, OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidState(_)));

        let confirmed = svc.transition_order(&id, OrderStatus::Confirmed).await.unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        let cancelled = svc.transition_order(&id, OrderStatus::Cancelled).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(svc.transition_order(&id, OrderStatus::Pending).await.is_err());
    }

    #[tokio::test]
    async fn list_orders_filters() {
        let svc = test_service().await;
        let p = seed_product(&svc, "Radish 100g", None, 100.0, 450).await;
        for (customer, day) in [("Green Bistro", 8), ("Corner Cafe", 9)] {
            svc.create_order(&NewOrder {
                customer_name: customer.into(),
                delivery_date: date(2026, 5, day),
                harvest_date: None,
                items: vec![item(&p.id, 1)],
                notes: None,
            })
            .await
            .unwrap();
        }
        svc.create_recurring_order(&NewRecurringOrder {
            customer_name: "Green Bistro".into(),
            frequency: RecurringFrequency::Weekly,
            start_date: date(2026, 5, 1),
            end_date: None,
            items: vec![item(&p.id, 1)],
            notes: None,
        })
        .await
        .unwrap();

        let all = svc.list_orders(&OrderFilter::default(), 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].customer_name, "Corner Cafe");

        let bistro = OrderFilter {
            customer: Some("bistro".into()),
            recurring: Some(false),
            ..OrderFilter::default()
        };
        assert_eq!(svc.list_orders(&bistro, 10).await.unwrap().len(), 1);

        let templates = OrderFilter {
            status: Some(OrderStatus::Template),
            ..OrderFilter::default()
        };
        assert_eq!(svc.list_orders(&templates, 10).await.unwrap().len(), 1);
    }
}
