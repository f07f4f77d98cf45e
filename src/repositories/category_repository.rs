use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::category::{Category, CategoryWithSubcategories, DefaultCategory, Subcategory};
use crate::repositories::RepositoryError;

/// Trait defining category repository operations
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Count the categories a user owns
    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, RepositoryError>;

    /// Insert the default template for a user in a single transaction
    async fn seed(
        &self,
        user_id: Uuid,
        template: &[DefaultCategory],
    ) -> Result<(), RepositoryError>;

    /// List a user's categories with their subcategories, ordered by name
    async fn list_with_subcategories(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CategoryWithSubcategories>, RepositoryError>;

    /// Find a category by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepositoryError>;

    /// Create a new category
    async fn create(&self, category: Category) -> Result<Category, RepositoryError>;

    /// Persist changes to an existing category
    async fn update(&self, category: Category) -> Result<Category, RepositoryError>;

    /// Delete a category; subcategories cascade at the database level
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Subcategories of a category, in insertion order
    async fn subcategories_of(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<Subcategory>, RepositoryError>;

    /// Add a subcategory to a category
    async fn add_subcategory(
        &self,
        subcategory: Subcategory,
    ) -> Result<Subcategory, RepositoryError>;

    /// Remove a subcategory
    async fn delete_subcategory(&self, id: Uuid) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of CategoryRepository
pub struct PostgresCategoryRepository {
    pool: PgPool,
}

impl PostgresCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CATEGORY_COLUMNS: &str =
    "id, user_id, name, icon, color, is_default, budget, created_at";

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM categories WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn seed(
        &self,
        user_id: Uuid,
        template: &[DefaultCategory],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for entry in template {
            let category_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO categories (id, user_id, name, icon, color, is_default)
                 VALUES ($1, $2, $3, $4, $5, TRUE)",
            )
            .bind(category_id)
            .bind(user_id)
            .bind(entry.name)
            .bind(entry.icon)
            .bind(entry.color)
            .execute(&mut *tx)
            .await?;

            for subcategory in entry.subcategories {
                sqlx::query("INSERT INTO subcategories (id, category_id, name) VALUES ($1, $2, $3)")
                    .bind(Uuid::new_v4())
                    .bind(category_id)
                    .bind(subcategory)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_with_subcategories(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CategoryWithSubcategories>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE user_id = $1 ORDER BY name ASC",
            CATEGORY_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(categories.len());
        for category in categories {
            let subcategories = self.subcategories_of(category.id).await?;
            result.push(CategoryWithSubcategories {
                category,
                subcategories,
            });
        }

        Ok(result)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE id = $1",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn create(&self, category: Category) -> Result<Category, RepositoryError> {
        let created = sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (id, user_id, name, icon, color, is_default, budget)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(category.id)
        .bind(category.user_id)
        .bind(&category.name)
        .bind(&category.icon)
        .bind(&category.color)
        .bind(category.is_default)
        .bind(category.budget)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(&self, category: Category) -> Result<Category, RepositoryError> {
        let updated = sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET name = $2, icon = $3, color = $4, budget = $5
             WHERE id = $1 RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.icon)
        .bind(&category.color)
        .bind(category.budget)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn subcategories_of(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<Subcategory>, RepositoryError> {
        let subcategories = sqlx::query_as::<_, Subcategory>(
            "SELECT id, category_id, name FROM subcategories WHERE category_id = $1 ORDER BY seq",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subcategories)
    }

    async fn add_subcategory(
        &self,
        subcategory: Subcategory,
    ) -> Result<Subcategory, RepositoryError> {
        let created = sqlx::query_as::<_, Subcategory>(
            "INSERT INTO subcategories (id, category_id, name)
             VALUES ($1, $2, $3) RETURNING id, category_id, name",
        )
        .bind(subcategory.id)
        .bind(subcategory.category_id)
        .bind(&subcategory.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn delete_subcategory(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM subcategories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
