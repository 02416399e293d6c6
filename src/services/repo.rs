use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;

use super::dto::NewServiceItem;
use super::query::{BuiltQuery, SqlParam};

/// Service record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub image_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceItem {
    pub id: i32,
    pub service_id: i32,
    pub name: String,
    pub price_per_unit: f64,
    pub unit: String,
}

/// One row of the search listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ServiceSummary {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub image_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub category_name: Option<String>,
    pub avg_rating: Option<f64>,
    pub order_count: i64,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

const SERVICE_COLUMNS: &str =
    "id, name, description, category_id, image_url, created_at, updated_at";
const ITEM_COLUMNS: &str =
    "id, service_id, name, price_per_unit::float8 AS price_per_unit, unit";

pub async fn search(db: &PgPool, built: &BuiltQuery) -> anyhow::Result<Vec<ServiceSummary>> {
    let mut query = sqlx::query_as::<_, ServiceSummary>(built.sql());
    for param in built.params() {
        query = match param {
            SqlParam::Text(v) => query.bind(v.clone()),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
        };
    }
    let rows = query.fetch_all(db).await.context("search services")?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: i32) -> anyhow::Result<Option<Service>> {
    let row = sqlx::query_as::<_, Service>(&format!(
        "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find service")?;
    Ok(row)
}

pub async fn category_name(db: &PgPool, category_id: Option<i32>) -> anyhow::Result<Option<String>> {
    let Some(category_id) = category_id else {
        return Ok(None);
    };
    let name = sqlx::query_scalar::<_, String>("SELECT name FROM categories WHERE id = $1")
        .bind(category_id)
        .fetch_optional(db)
        .await
        .context("find category name")?;
    Ok(name)
}

pub async fn list_items(db: &PgPool, service_id: i32) -> anyhow::Result<Vec<ServiceItem>> {
    let rows = sqlx::query_as::<_, ServiceItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM service_items WHERE service_id = $1 ORDER BY id"
    ))
    .bind(service_id)
    .fetch_all(db)
    .await
    .context("list service items")?;
    Ok(rows)
}

pub async fn insert_service_tx(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    description: Option<&str>,
    category_id: i32,
    image_url: &str,
) -> anyhow::Result<Service> {
    let row = sqlx::query_as::<_, Service>(&format!(
        r#"
        INSERT INTO services (name, description, category_id, image_url)
        VALUES ($1, $2, $3, $4)
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(name)
    .bind(description)
    .bind(category_id)
    .bind(image_url)
    .fetch_one(&mut **tx)
    .await
    .context("insert service")?;
    Ok(row)
}

/// All items in one multi-row `INSERT`.
pub async fn insert_items_tx(
    tx: &mut Transaction<'_, Postgres>,
    service_id: i32,
    items: &[NewServiceItem],
) -> anyhow::Result<Vec<ServiceItem>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO service_items (service_id, name, price_per_unit, unit) ");
    qb.push_values(items, |mut row, item| {
        row.push_bind(service_id)
            .push_bind(item.name.clone())
            .push_bind(item.price_per_unit)
            .push_unseparated("::numeric")
            .push_bind(item.unit.clone());
    });
    qb.push(" RETURNING ");
    qb.push(ITEM_COLUMNS);

    let rows = qb
        .build_query_as::<ServiceItem>()
        .fetch_all(&mut **tx)
        .await
        .context("insert service items")?;
    Ok(rows)
}

pub async fn update_service_tx(tx: &mut Transaction<'_, Postgres>, s: &Service) -> anyhow::Result<Service> {
    let row = sqlx::query_as::<_, Service>(&format!(
        r#"
        UPDATE services
           SET name = $1,
               description = $2,
               category_id = $3,
               image_url = $4,
               updated_at = now()
         WHERE id = $5
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(&s.name)
    .bind(&s.description)
    .bind(s.category_id)
    .bind(&s.image_url)
    .bind(s.id)
    .fetch_one(&mut **tx)
    .await
    .context("update service")?;
    Ok(row)
}

pub async fn delete_items_tx(tx: &mut Transaction<'_, Postgres>, service_id: i32) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM service_items WHERE service_id = $1")
        .bind(service_id)
        .execute(&mut **tx)
        .await
        .context("delete service items")?;
    Ok(result.rows_affected())
}

pub async fn delete_service_tx(tx: &mut Transaction<'_, Postgres>, service_id: i32) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(service_id)
        .execute(&mut **tx)
        .await
        .context("delete service")?;
    Ok(result.rows_affected() > 0)
}
