use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::expense::{
    CreateExpenseRequest, CreateFixedExpenseRequest, Expense, FixedExpense, MonthMarker,
    UpdateFixedExpenseRequest,
};
use crate::repositories::category_repository::CategoryRepository;
use crate::repositories::expense_repository::ExpenseRepository;
use crate::repositories::fixed_expense_repository::FixedExpenseRepository;
use crate::repositories::RepositoryError;

/// Expense-related errors
#[derive(Debug, thiserror::Error)]
pub enum ExpenseError {
    #[error("Expense not found")]
    NotFound,

    #[error("Category not found or not owned by user")]
    InvalidCategory,

    #[error("Unauthorized access to expense")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for ExpenseError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ExpenseError::NotFound,
            other => ExpenseError::DatabaseError(other.to_string()),
        }
    }
}

/// Trait defining expense service operations
#[async_trait]
pub trait ExpenseService: Send + Sync {
    /// All expenses of the user, newest first
    async fn list(&self, user_id: Uuid) -> Result<Vec<Expense>, ExpenseError>;

    /// The user's expenses within one calendar month
    async fn list_month(
        &self,
        user_id: Uuid,
        month: MonthMarker,
    ) -> Result<Vec<Expense>, ExpenseError>;

    /// Log a new expense against one of the user's categories
    async fn create(
        &self,
        user_id: Uuid,
        request: CreateExpenseRequest,
    ) -> Result<Expense, ExpenseError>;

    /// Delete one of the user's expenses
    async fn delete(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), ExpenseError>;

    /// All fixed-expense templates of the user
    async fn list_fixed(&self, user_id: Uuid) -> Result<Vec<FixedExpense>, ExpenseError>;

    /// Create a fixed-expense template
    async fn create_fixed(
        &self,
        user_id: Uuid,
        request: CreateFixedExpenseRequest,
    ) -> Result<FixedExpense, ExpenseError>;

    /// Partially update a fixed-expense template; deactivation happens here
    /// through `is_active`
    async fn update_fixed(
        &self,
        user_id: Uuid,
        fixed_expense_id: Uuid,
        request: UpdateFixedExpenseRequest,
    ) -> Result<FixedExpense, ExpenseError>;
}

/// Implementation of ExpenseService
pub struct ExpenseServiceImpl {
    expense_repository: Arc<dyn ExpenseRepository>,
    fixed_expense_repository: Arc<dyn FixedExpenseRepository>,
    category_repository: Arc<dyn CategoryRepository>,
}

impl ExpenseServiceImpl {
    pub fn new(
        expense_repository: Arc<dyn ExpenseRepository>,
        fixed_expense_repository: Arc<dyn FixedExpenseRepository>,
        category_repository: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            expense_repository,
            fixed_expense_repository,
            category_repository,
        }
    }

    async fn assert_owned_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
    ) -> Result<(), ExpenseError> {
        let category = self
            .category_repository
            .find_by_id(category_id)
            .await
            .map_err(|e| ExpenseError::DatabaseError(e.to_string()))?
            .ok_or(ExpenseError::InvalidCategory)?;

        if category.user_id != user_id {
            return Err(ExpenseError::InvalidCategory);
        }
        Ok(())
    }

    async fn owned_fixed_expense(
        &self,
        user_id: Uuid,
        fixed_expense_id: Uuid,
    ) -> Result<FixedExpense, ExpenseError> {
        let fixed = self
            .fixed_expense_repository
            .find_by_id(fixed_expense_id)
            .await?
            .ok_or(ExpenseError::NotFound)?;

        if fixed.user_id != user_id {
            return Err(ExpenseError::Unauthorized);
        }
        Ok(fixed)
    }
}

#[async_trait]
impl ExpenseService for ExpenseServiceImpl {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Expense>, ExpenseError> {
        Ok(self.expense_repository.list_by_user(user_id).await?)
    }

    async fn list_month(
        &self,
        user_id: Uuid,
        month: MonthMarker,
    ) -> Result<Vec<Expense>, ExpenseError> {
        Ok(self
            .expense_repository
            .list_by_user_month(user_id, month)
            .await?)
    }

    async fn create(
        &self,
        user_id: Uuid,
        request: CreateExpenseRequest,
    ) -> Result<Expense, ExpenseError> {
        self.assert_owned_category(user_id, request.category_id).await?;

        let expense = Expense {
            id: Uuid::new_v4(),
            user_id,
            description: request.description,
            amount: request.amount,
            category_id: request.category_id,
            subcategory_label: request.subcategory_label,
            date: request.date,
            created_at: Utc::now(),
        };

        Ok(self.expense_repository.create(expense).await?)
    }

    async fn delete(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), ExpenseError> {
        let expense = self
            .expense_repository
            .find_by_id(expense_id)
            .await?
            .ok_or(ExpenseError::NotFound)?;

        if expense.user_id != user_id {
            return Err(ExpenseError::Unauthorized);
        }

        Ok(self.expense_repository.delete(expense_id).await?)
    }

    async fn list_fixed(&self, user_id: Uuid) -> Result<Vec<FixedExpense>, ExpenseError> {
        Ok(self.fixed_expense_repository.list_by_user(user_id).await?)
    }

    async fn create_fixed(
        &self,
        user_id: Uuid,
        request: CreateFixedExpenseRequest,
    ) -> Result<FixedExpense, ExpenseError> {
        self.assert_owned_category(user_id, request.category_id).await?;

        let fixed = FixedExpense {
            id: Uuid::new_v4(),
            user_id,
            description: request.description,
            amount: request.amount,
            category_id: request.category_id,
            day_of_month: request.day_of_month,
            last_posted_year: None,
            last_posted_month: None,
            is_active: true,
            created_at: Utc::now(),
        };

        Ok(self.fixed_expense_repository.create(fixed).await?)
    }

    async fn update_fixed(
        &self,
        user_id: Uuid,
        fixed_expense_id: Uuid,
        request: UpdateFixedExpenseRequest,
    ) -> Result<FixedExpense, ExpenseError> {
        let mut fixed = self.owned_fixed_expense(user_id, fixed_expense_id).await?;

        if let Some(category_id) = request.category_id {
            self.assert_owned_category(user_id, category_id).await?;
            fixed.category_id = category_id;
        }
        if let Some(description) = request.description {
            fixed.description = description;
        }
        if let Some(amount) = request.amount {
            fixed.amount = amount;
        }
        if let Some(day_of_month) = request.day_of_month {
            fixed.day_of_month = day_of_month;
        }
        if let Some(is_active) = request.is_active {
            fixed.is_active = is_active;
        }

        Ok(self.fixed_expense_repository.update(fixed).await?)
    }
}

#[cfg(test)]
pub mod test_support {
    //! In-memory expense/fixed-expense repositories shared with the poster
    //! service tests.

    use super::*;
    use std::sync::Mutex;

    pub struct MemoryExpenseRepository {
        pub expenses: Mutex<Vec<Expense>>,
    }

    impl MemoryExpenseRepository {
        pub fn new() -> Self {
            Self {
                expenses: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExpenseRepository for MemoryExpenseRepository {
        async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError> {
            self.expenses.lock().unwrap().push(expense.clone());
            Ok(expense)
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError> {
            Ok(self
                .expenses
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.id == id)
                .cloned())
        }

        async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Expense>, RepositoryError> {
            let mut rows: Vec<Expense> = self
                .expenses
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.user_id == user_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.date.cmp(&a.date));
            Ok(rows)
        }

        async fn list_by_user_month(
            &self,
            user_id: Uuid,
            month: MonthMarker,
        ) -> Result<Vec<Expense>, RepositoryError> {
            Ok(self
                .expenses
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.user_id == user_id && MonthMarker::from_date(e.date) == month)
                .cloned()
                .collect())
        }

        async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
            let mut expenses = self.expenses.lock().unwrap();
            let before = expenses.len();
            expenses.retain(|e| e.id != id);
            if expenses.len() == before {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        }
    }

    pub struct MemoryFixedExpenseRepository {
        pub fixed: Mutex<Vec<FixedExpense>>,
        pub expenses: Mutex<Vec<Expense>>,
    }

    impl MemoryFixedExpenseRepository {
        pub fn new() -> Self {
            Self {
                fixed: Mutex::new(Vec::new()),
                expenses: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FixedExpenseRepository for MemoryFixedExpenseRepository {
        async fn create(&self, fixed: FixedExpense) -> Result<FixedExpense, RepositoryError> {
            self.fixed.lock().unwrap().push(fixed.clone());
            Ok(fixed)
        }

        async fn update(&self, fixed: FixedExpense) -> Result<FixedExpense, RepositoryError> {
            let mut rows = self.fixed.lock().unwrap();
            let slot = rows
                .iter_mut()
                .find(|f| f.id == fixed.id)
                .ok_or(RepositoryError::NotFound)?;
            *slot = fixed.clone();
            Ok(fixed)
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<FixedExpense>, RepositoryError> {
            Ok(self
                .fixed
                .lock()
                .unwrap()
                .iter()
                .find(|f| f.id == id)
                .cloned())
        }

        async fn list_by_user(
            &self,
            user_id: Uuid,
        ) -> Result<Vec<FixedExpense>, RepositoryError> {
            Ok(self
                .fixed
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn list_active_by_user(
            &self,
            user_id: Uuid,
        ) -> Result<Vec<FixedExpense>, RepositoryError> {
            Ok(self
                .fixed
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.user_id == user_id && f.is_active)
                .cloned()
                .collect())
        }

        async fn user_ids_with_active(&self) -> Result<Vec<Uuid>, RepositoryError> {
            let mut ids: Vec<Uuid> = self
                .fixed
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.is_active)
                .map(|f| f.user_id)
                .collect();
            ids.sort();
            ids.dedup();
            Ok(ids)
        }

        async fn post_and_mark(
            &self,
            expense: Expense,
            fixed_expense_id: Uuid,
            month: MonthMarker,
        ) -> Result<(), RepositoryError> {
            let mut rows = self.fixed.lock().unwrap();
            let slot = rows
                .iter_mut()
                .find(|f| f.id == fixed_expense_id)
                .ok_or(RepositoryError::NotFound)?;
            self.expenses.lock().unwrap().push(expense);
            slot.last_posted_year = Some(month.year);
            slot.last_posted_month = Some(month.month as i32);
            Ok(())
        }
    }
}
