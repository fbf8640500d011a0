use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CreateCategoryParams, RepoError, UpdateCategoryParams,
};
use crate::domain::entities::{CategoryRecord, CategoryWithCounts};
use crate::domain::types::PostStatus;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    created_at: OffsetDateTime,
}

impl From<CategoryRow> for CategoryRecord {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryCountRow {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    created_at: OffsetDateTime,
    published_count: i64,
    total_count: i64,
}

#[async_trait]
impl CategoriesRepo for PostgresRepositories {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description, created_at FROM categories ORDER BY name",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CategoryRecord::from).collect())
    }

    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCounts>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryCountRow>(
            r#"
            SELECT c.id, c.name, c.slug, c.description, c.created_at,
                   COUNT(p.id) FILTER (WHERE p.status = $1) AS published_count,
                   COUNT(p.id) AS total_count
            FROM categories c
            LEFT JOIN posts p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .bind(PostStatus::Published)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(CategoryWithCounts {
                    published_count: Self::convert_count(row.published_count)?,
                    total_count: Self::convert_count(row.total_count)?,
                    category: CategoryRecord {
                        id: row.id,
                        name: row.name,
                        slug: row.slug,
                        description: row.description,
                        created_at: row.created_at,
                    },
                })
            })
            .collect()
    }

    async fn list_with_published_posts(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT c.id, c.name, c.slug, c.description, c.created_at
            FROM categories c
            WHERE EXISTS (
                SELECT 1 FROM posts p WHERE p.category_id = c.id AND p.status = $1
            )
            ORDER BY c.name
            "#,
        )
        .bind(PostStatus::Published)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CategoryRecord::from).collect())
    }

    async fn count_categories(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description, created_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CategoryRecord::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description, created_at FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CategoryRecord::from))
    }
}

#[async_trait]
impl CategoriesWriteRepo for PostgresRepositories {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO categories (name, slug, description, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, slug, description, created_at
            "#,
        )
        .bind(params.name)
        .bind(params.slug)
        .bind(params.description)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CategoryRecord::from(row))
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            UPDATE categories
            SET name = $2, slug = $3, description = $4
            WHERE id = $1
            RETURNING id, name, slug, description, created_at
            "#,
        )
        .bind(params.id)
        .bind(params.name)
        .bind(params.slug)
        .bind(params.description)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(CategoryRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_category_reassigning(
        &self,
        id: i64,
        fallback_id: i64,
    ) -> Result<u64, RepoError> {
        if id == fallback_id {
            return Err(RepoError::InvalidInput {
                message: "a category cannot be reassigned to itself".to_string(),
            });
        }

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let moved = sqlx::query(
            "UPDATE posts SET category_id = $2, updated_at = $3 WHERE category_id = $1",
        )
        .bind(id)
        .bind(fallback_id)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        if deleted == 0 {
            // Dropping `tx` rolls back the reassignment.
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(category_id = id, fallback_id, moved, "category deleted in transaction");
        Ok(moved)
    }
}
