use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::expense::{Expense, MonthMarker};
use crate::repositories::RepositoryError;

/// Trait defining expense repository operations
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// Create a new expense entry
    async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError>;

    /// Find an expense by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError>;

    /// All expenses of a user, newest first
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Expense>, RepositoryError>;

    /// A user's expenses within one calendar month, newest first
    async fn list_by_user_month(
        &self,
        user_id: Uuid,
        month: MonthMarker,
    ) -> Result<Vec<Expense>, RepositoryError>;

    /// Delete an expense by ID
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of ExpenseRepository
pub struct PostgresExpenseRepository {
    pool: PgPool,
}

impl PostgresExpenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const EXPENSE_COLUMNS: &str =
    "id, user_id, description, amount, category_id, subcategory_label, date, created_at";

#[async_trait]
impl ExpenseRepository for PostgresExpenseRepository {
    async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError> {
        let created = sqlx::query_as::<_, Expense>(&format!(
            "INSERT INTO expenses
                 (id, user_id, description, amount, category_id, subcategory_label, date)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            EXPENSE_COLUMNS
        ))
        .bind(expense.id)
        .bind(expense.user_id)
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(expense.category_id)
        .bind(&expense.subcategory_label)
        .bind(expense.date)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError> {
        let expense = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {} FROM expenses WHERE id = $1",
            EXPENSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(expense)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Expense>, RepositoryError> {
        let expenses = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {} FROM expenses WHERE user_id = $1 ORDER BY date DESC, created_at DESC",
            EXPENSE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    async fn list_by_user_month(
        &self,
        user_id: Uuid,
        month: MonthMarker,
    ) -> Result<Vec<Expense>, RepositoryError> {
        let start = NaiveDate::from_ymd_opt(month.year, month.month, 1)
            .ok_or_else(|| RepositoryError::DatabaseError(format!("invalid month: {}", month)))?;
        let end = NaiveDate::from_ymd_opt(month.year, month.month, month.last_day())
            .ok_or_else(|| RepositoryError::DatabaseError(format!("invalid month: {}", month)))?;

        let expenses = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {} FROM expenses
             WHERE user_id = $1 AND date BETWEEN $2 AND $3
             ORDER BY date DESC, created_at DESC",
            EXPENSE_COLUMNS
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
