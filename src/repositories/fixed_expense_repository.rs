use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::expense::{Expense, FixedExpense, MonthMarker};
use crate::repositories::RepositoryError;

/// Trait defining fixed-expense repository operations
#[async_trait]
pub trait FixedExpenseRepository: Send + Sync {
    /// Create a new fixed expense
    async fn create(&self, fixed: FixedExpense) -> Result<FixedExpense, RepositoryError>;

    /// Persist changes to an existing fixed expense
    async fn update(&self, fixed: FixedExpense) -> Result<FixedExpense, RepositoryError>;

    /// Find a fixed expense by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<FixedExpense>, RepositoryError>;

    /// All fixed expenses of a user
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<FixedExpense>, RepositoryError>;

    /// Active fixed expenses of a user
    async fn list_active_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FixedExpense>, RepositoryError>;

    /// Distinct ids of users owning at least one active fixed expense
    async fn user_ids_with_active(&self) -> Result<Vec<Uuid>, RepositoryError>;

    /// Insert the posted expense and advance the fixed expense's posted
    /// marker in a single transaction
    async fn post_and_mark(
        &self,
        expense: Expense,
        fixed_expense_id: Uuid,
        month: MonthMarker,
    ) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of FixedExpenseRepository
pub struct PostgresFixedExpenseRepository {
    pool: PgPool,
}

impl PostgresFixedExpenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FIXED_COLUMNS: &str = "id, user_id, description, amount, category_id, day_of_month, \
                             last_posted_year, last_posted_month, is_active, created_at";

#[async_trait]
impl FixedExpenseRepository for PostgresFixedExpenseRepository {
    async fn create(&self, fixed: FixedExpense) -> Result<FixedExpense, RepositoryError> {
        let created = sqlx::query_as::<_, FixedExpense>(&format!(
            "INSERT INTO fixed_expenses
                 (id, user_id, description, amount, category_id, day_of_month, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            FIXED_COLUMNS
        ))
        .bind(fixed.id)
        .bind(fixed.user_id)
        .bind(&fixed.description)
        .bind(fixed.amount)
        .bind(fixed.category_id)
        .bind(fixed.day_of_month)
        .bind(fixed.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(&self, fixed: FixedExpense) -> Result<FixedExpense, RepositoryError> {
        let updated = sqlx::query_as::<_, FixedExpense>(&format!(
            "UPDATE fixed_expenses SET description = $2, amount = $3, category_id = $4,
                 day_of_month = $5, is_active = $6
             WHERE id = $1 RETURNING {}",
            FIXED_COLUMNS
        ))
        .bind(fixed.id)
        .bind(&fixed.description)
        .bind(fixed.amount)
        .bind(fixed.category_id)
        .bind(fixed.day_of_month)
        .bind(fixed.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(updated)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FixedExpense>, RepositoryError> {
        let fixed = sqlx::query_as::<_, FixedExpense>(&format!(
            "SELECT {} FROM fixed_expenses WHERE id = $1",
            FIXED_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(fixed)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<FixedExpense>, RepositoryError> {
        let rows = sqlx::query_as::<_, FixedExpense>(&format!(
            "SELECT {} FROM fixed_expenses WHERE user_id = $1 ORDER BY day_of_month ASC",
            FIXED_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_active_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FixedExpense>, RepositoryError> {
        let rows = sqlx::query_as::<_, FixedExpense>(&format!(
            "SELECT {} FROM fixed_expenses
             WHERE user_id = $1 AND is_active ORDER BY day_of_month ASC",
            FIXED_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn user_ids_with_active(&self) -> Result<Vec<Uuid>, RepositoryError> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT DISTINCT user_id FROM fixed_expenses WHERE is_active")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn post_and_mark(
        &self,
        expense: Expense,
        fixed_expense_id: Uuid,
        month: MonthMarker,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO expenses
                 (id, user_id, description, amount, category_id, subcategory_label, date)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(expense.id)
        .bind(expense.user_id)
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(expense.category_id)
        .bind(&expense.subcategory_label)
        .bind(expense.date)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE fixed_expenses SET last_posted_year = $2, last_posted_month = $3
             WHERE id = $1",
        )
        .bind(fixed_expense_id)
        .bind(month.year)
        .bind(month.month as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
