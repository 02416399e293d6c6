use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// An order with its technician and booked service names, as stored.
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: i32,
    pub status: String,
    pub date: OffsetDateTime,
    pub price: f64,
    pub worker: Option<String>,
    pub details: Vec<Option<String>>, // NULL when an order item has no service
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<OrderRow>> {
    let rows = sqlx::query_as::<_, OrderRow>(
        r#"
        SELECT
            o.id,
            o.status,
            o.created_at AS date,
            o.net_price::float8 AS price,
            tp.full_name AS worker,
            array_agg(s.name::text) AS details
        FROM orders o
        LEFT JOIN technician_assignments ta ON o.id = ta.order_id
        LEFT JOIN user_profiles tp ON ta.technician_id = tp.user_id
        LEFT JOIN order_items oi ON o.id = oi.order_id
        LEFT JOIN services s ON oi.service_id = s.id
        WHERE o.user_id = $1
        GROUP BY o.id, o.status, o.created_at, o.net_price, tp.full_name
        ORDER BY o.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list orders by user")?;
    Ok(rows)
}
