//! Product repository.

use serde::{Deserialize, Serialize};

use sprig_core::entities::Product;
use sprig_core::ids::PREFIX_PRODUCT;

use crate::error::DatabaseError;
use crate::helpers::{get_bool, get_f64, get_opt_string, now, parse_datetime, ts};
use crate::service::SprigService;

const SELECT_COLS: &str =
    "id, name, recipe_id, unit_weight_grams, price_cents, is_active, created_at, updated_at";

fn row_to_product(row: &libsql::Row) -> Result<Product, DatabaseError> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        recipe_id: get_opt_string(row, 2)?,
        unit_weight_grams: get_f64(row, 3)?,
        price_cents: row.get(4)?,
        is_active: get_bool(row, 5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
        updated_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

/// Input for [`SprigService::create_product`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub recipe_id: Option<String>,
    pub unit_weight_grams: f64,
    pub price_cents: i64,
}

impl SprigService {
    pub async fn create_product(&self, input: &NewProduct) -> Result<Product, DatabaseError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("product name must not be empty".into()));
        }
        if !input.unit_weight_grams.is_finite() || input.unit_weight_grams < 0.0 {
            return Err(DatabaseError::Validation(format!(
                "unit weight must be a non-negative number (got {})",
                input.unit_weight_grams
            )));
        }
        if input.price_cents < 0 {
            return Err(DatabaseError::Validation(format!(
                "price must not be negative (got {})",
                input.price_cents
            )));
        }
        if let Some(ref recipe_id) = input.recipe_id {
            self.get_recipe(recipe_id).await?;
        }
        let mut rows = self
            .db()
            .conn()
            .query("SELECT id FROM products WHERE name = ?1", [name])
            .await?;
        if rows.next().await?.is_some() {
            return Err(DatabaseError::Validation(format!(
                "product name '{name}' is already used"
            )));
        }

        let now = now();
        let product = Product {
            id: self.db().generate_id(PREFIX_PRODUCT).await?,
            name: name.to_string(),
            recipe_id: input.recipe_id.clone(),
            unit_weight_grams: input.unit_weight_grams,
            price_cents: input.price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO products ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                libsql::params![
                    product.id.as_str(),
                    product.name.as_str(),
                    product.recipe_id.as_deref(),
                    product.unit_weight_grams,
                    product.price_cents,
                    1i64,
                    ts(now),
                    ts(now)
                ],
            )
            .await?;

        Ok(product)
    }

    pub async fn get_product(&self, id: &str) -> Result<Product, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM products WHERE id = ?1"), [id])
            .await?;
        let row = rows.next().await?.ok_or_else(|| DatabaseError::NotFound {
            entity: "product",
            id: id.to_string(),
        })?;
        row_to_product(&row)
    }

    pub async fn list_products(
        &self,
        active_only: bool,
        limit: u32,
    ) -> Result<Vec<Product>, DatabaseError> {
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM products {filter} ORDER BY name LIMIT {limit}"),
                (),
            )
            .await?;

        let mut products = Vec::new();
        while let Some(row) = rows.next().await? {
            products.push(row_to_product(&row)?);
        }
        Ok(products)
    }

    pub async fn set_product_active(&self, id: &str, active: bool) -> Result<Product, DatabaseError> {
        let changed = self
            .db()
            .conn()
            .execute(
                "UPDATE products SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
                libsql::params![i64::from(active), ts(now()), id],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "product",
                id: id.to_string(),
            });
        }
        self.get_product(id).await
    }
}
