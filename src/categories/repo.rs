use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// Category record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub name_th: Option<String>, // localized display name
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Category {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, name_th, created_at
            FROM categories
            ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await
        .context("list categories")?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, id: i32) -> anyhow::Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, name_th, created_at
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find category")?;
        Ok(row)
    }

    pub async fn create(db: &PgPool, name: &str, name_th: Option<&str>) -> anyhow::Result<Category> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, name_th)
            VALUES ($1, $2)
            RETURNING id, name, name_th, created_at
            "#,
        )
        .bind(name)
        .bind(name_th)
        .fetch_one(db)
        .await
        .context("insert category")?;
        Ok(row)
    }

    /// `name_th = None` keeps the stored localized name.
    pub async fn update(
        db: &PgPool,
        id: i32,
        name: &str,
        name_th: Option<&str>,
    ) -> anyhow::Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
               SET name = $1,
                   name_th = COALESCE($2, name_th)
             WHERE id = $3
            RETURNING id, name, name_th, created_at
            "#,
        )
        .bind(name)
        .bind(name_th)
        .bind(id)
        .fetch_optional(db)
        .await
        .context("update category")?;
        Ok(row)
    }

    /// Returns `false` when no row matched.
    pub async fn delete(db: &PgPool, id: i32) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete category")?;
        Ok(result.rows_affected() > 0)
    }
}
