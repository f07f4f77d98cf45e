use chrono::{Datelike, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::category::Subcategory;
use crate::models::expense::{Expense, FixedExpense, MonthMarker};
use crate::repositories::category_repository::CategoryRepository;
use crate::repositories::fixed_expense_repository::FixedExpenseRepository;
use crate::repositories::RepositoryError;

/// Poster errors
#[derive(Debug, thiserror::Error)]
pub enum PosterError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for PosterError {
    fn from(e: RepositoryError) -> Self {
        PosterError::DatabaseError(e.to_string())
    }
}

/// Outcome of one posting run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PostingSummary {
    pub users_processed: usize,
    pub posted: usize,
    pub skipped: usize,
    pub users_failed: usize,
}

const FIXED_SUBCATEGORY: &str = "Gasto Fijo";
const FALLBACK_SUBCATEGORY: &str = "Varios";

/// Label for an auto-posted expense: the category's "Gasto Fijo"
/// subcategory when it has one, otherwise its first subcategory, otherwise
/// a literal fallback.
pub fn resolve_subcategory_label(subcategories: &[Subcategory]) -> String {
    subcategories
        .iter()
        .find(|s| s.name == FIXED_SUBCATEGORY)
        .or_else(|| subcategories.first())
        .map(|s| s.name.clone())
        .unwrap_or_else(|| FALLBACK_SUBCATEGORY.to_string())
}

/// Posts due fixed expenses into the ledger. Invoked by the scheduled job
/// once a day; safe to run more often because posting is keyed by month.
pub struct FixedExpensePoster {
    fixed_expense_repository: Arc<dyn FixedExpenseRepository>,
    category_repository: Arc<dyn CategoryRepository>,
}

impl FixedExpensePoster {
    pub fn new(
        fixed_expense_repository: Arc<dyn FixedExpenseRepository>,
        category_repository: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            fixed_expense_repository,
            category_repository,
        }
    }

    /// Run one posting pass as of `today`. One user's failure never stops
    /// the others.
    pub async fn post_due_fixed_expenses(
        &self,
        today: NaiveDate,
    ) -> Result<PostingSummary, PosterError> {
        let user_ids = self.fixed_expense_repository.user_ids_with_active().await?;
        let mut summary = PostingSummary::default();

        for user_id in user_ids {
            summary.users_processed += 1;
            match self.post_for_user(user_id, today).await {
                Ok((posted, skipped)) => {
                    summary.posted += posted;
                    summary.skipped += skipped;
                }
                Err(e) => {
                    summary.users_failed += 1;
                    error!(%user_id, error = %e, "posting failed for user");
                }
            }
        }

        info!(
            users = summary.users_processed,
            posted = summary.posted,
            skipped = summary.skipped,
            failed = summary.users_failed,
            "posting run finished"
        );
        Ok(summary)
    }

    async fn post_for_user(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<(usize, usize), PosterError> {
        let current_month = MonthMarker::from_date(today);
        let mut posted = 0;
        let mut skipped = 0;

        for fixed in self
            .fixed_expense_repository
            .list_active_by_user(user_id)
            .await?
        {
            match scheduled_date(&fixed, today) {
                Some(date) => {
                    self.post_one(&fixed, date, current_month).await?;
                    posted += 1;
                }
                None => skipped += 1,
            }
        }

        Ok((posted, skipped))
    }

    async fn post_one(
        &self,
        fixed: &FixedExpense,
        date: NaiveDate,
        month: MonthMarker,
    ) -> Result<(), PosterError> {
        let subcategories = self
            .category_repository
            .subcategories_of(fixed.category_id)
            .await?;
        let subcategory_label = resolve_subcategory_label(&subcategories);

        let expense = Expense {
            id: Uuid::new_v4(),
            user_id: fixed.user_id,
            description: fixed.description.clone(),
            amount: fixed.amount,
            category_id: fixed.category_id,
            subcategory_label,
            date,
            created_at: Utc::now(),
        };

        self.fixed_expense_repository
            .post_and_mark(expense, fixed.id, month)
            .await?;

        info!(
            fixed_expense_id = %fixed.id,
            user_id = %fixed.user_id,
            %date,
            "posted fixed expense"
        );
        Ok(())
    }
}

/// The date this template should post on this month, or None when it is not
/// due: either its day has not arrived yet, or it already posted this month.
/// The day is clamped to the month's length, so day 31 posts on Feb 29.
fn scheduled_date(fixed: &FixedExpense, today: NaiveDate) -> Option<NaiveDate> {
    let current_month = MonthMarker::from_date(today);
    if fixed.last_posted() == Some(current_month) {
        return None;
    }

    let day = (fixed.day_of_month as u32).min(current_month.last_day());
    if today.day() < day {
        return None;
    }

    NaiveDate::from_ymd_opt(current_month.year, current_month.month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::{
        Category, CategoryWithSubcategories, DefaultCategory,
    };
    use crate::services::expense_service::test_support::MemoryFixedExpenseRepository;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct MockCategoryRepository {
        subcategories: Mutex<Vec<Subcategory>>,
    }

    impl MockCategoryRepository {
        fn with_subcategories(category_id: Uuid, names: &[&str]) -> Self {
            Self {
                subcategories: Mutex::new(
                    names
                        .iter()
                        .map(|name| Subcategory {
                            id: Uuid::new_v4(),
                            category_id,
                            name: name.to_string(),
                        })
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl CategoryRepository for MockCategoryRepository {
        async fn count_by_user(&self, _user_id: Uuid) -> Result<i64, RepositoryError> {
            unimplemented!("not used by poster")
        }

        async fn seed(
            &self,
            _user_id: Uuid,
            _template: &[DefaultCategory],
        ) -> Result<(), RepositoryError> {
            unimplemented!("not used by poster")
        }

        async fn list_with_subcategories(
            &self,
            _user_id: Uuid,
        ) -> Result<Vec<CategoryWithSubcategories>, RepositoryError> {
            unimplemented!("not used by poster")
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Category>, RepositoryError> {
            unimplemented!("not used by poster")
        }

        async fn create(&self, _category: Category) -> Result<Category, RepositoryError> {
            unimplemented!("not used by poster")
        }

        async fn update(&self, _category: Category) -> Result<Category, RepositoryError> {
            unimplemented!("not used by poster")
        }

        async fn delete(&self, _id: Uuid) -> Result<(), RepositoryError> {
            unimplemented!("not used by poster")
        }

        async fn subcategories_of(
            &self,
            category_id: Uuid,
        ) -> Result<Vec<Subcategory>, RepositoryError> {
            Ok(self
                .subcategories
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.category_id == category_id)
                .cloned()
                .collect())
        }

        async fn add_subcategory(
            &self,
            _subcategory: Subcategory,
        ) -> Result<Subcategory, RepositoryError> {
            unimplemented!("not used by poster")
        }

        async fn delete_subcategory(&self, _id: Uuid) -> Result<(), RepositoryError> {
            unimplemented!("not used by poster")
        }
    }

    fn fixed_expense(user_id: Uuid, category_id: Uuid, day_of_month: i32) -> FixedExpense {
        FixedExpense {
            id: Uuid::new_v4(),
            user_id,
            description: "Alquiler".to_string(),
            amount: dec!(850.00),
            category_id,
            day_of_month,
            last_posted_year: None,
            last_posted_month: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn poster(
        fixed_repo: Arc<MemoryFixedExpenseRepository>,
        categories: MockCategoryRepository,
    ) -> FixedExpensePoster {
        FixedExpensePoster::new(fixed_repo, Arc::new(categories))
    }

    #[tokio::test]
    async fn due_template_posts_on_its_scheduled_date() {
        let user_id = Uuid::new_v4();
        let category_id = Uuid::new_v4();
        let fixed_repo = Arc::new(MemoryFixedExpenseRepository::new());
        fixed_repo
            .fixed
            .lock()
            .unwrap()
            .push(fixed_expense(user_id, category_id, 15));

        let poster = poster(
            fixed_repo.clone(),
            MockCategoryRepository::with_subcategories(category_id, &["Gasto Fijo", "Otro"]),
        );

        // Day 15 has passed; the expense is dated the 15th, not today.
        let summary = poster
            .post_due_fixed_expenses(date(2024, 2, 20))
            .await
            .unwrap();

        assert_eq!(summary.posted, 1);
        assert_eq!(summary.skipped, 0);

        let expenses = fixed_repo.expenses.lock().unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].date, date(2024, 2, 15));
        assert_eq!(expenses[0].subcategory_label, "Gasto Fijo");

        let fixed = fixed_repo.fixed.lock().unwrap();
        assert_eq!(fixed[0].last_posted(), Some(MonthMarker::new(2024, 2)));
    }

    #[tokio::test]
    async fn template_not_yet_due_is_skipped() {
        let user_id = Uuid::new_v4();
        let category_id = Uuid::new_v4();
        let fixed_repo = Arc::new(MemoryFixedExpenseRepository::new());
        fixed_repo
            .fixed
            .lock()
            .unwrap()
            .push(fixed_expense(user_id, category_id, 25));

        let poster = poster(
            fixed_repo.clone(),
            MockCategoryRepository::with_subcategories(category_id, &["Gasto Fijo"]),
        );

        let summary = poster
            .post_due_fixed_expenses(date(2024, 2, 20))
            .await
            .unwrap();

        assert_eq!(summary.posted, 0);
        assert_eq!(summary.skipped, 1);
        assert!(fixed_repo.expenses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn already_posted_month_is_not_posted_twice() {
        let user_id = Uuid::new_v4();
        let category_id = Uuid::new_v4();
        let fixed_repo = Arc::new(MemoryFixedExpenseRepository::new());
        let mut fixed = fixed_expense(user_id, category_id, 15);
        fixed.last_posted_year = Some(2024);
        fixed.last_posted_month = Some(2);
        fixed_repo.fixed.lock().unwrap().push(fixed);

        let poster = poster(
            fixed_repo.clone(),
            MockCategoryRepository::with_subcategories(category_id, &["Gasto Fijo"]),
        );

        let summary = poster
            .post_due_fixed_expenses(date(2024, 2, 20))
            .await
            .unwrap();

        assert_eq!(summary.posted, 0);
        assert_eq!(summary.skipped, 1);
        assert!(fixed_repo.expenses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_template_posts_again_next_month() {
        let user_id = Uuid::new_v4();
        let category_id = Uuid::new_v4();
        let fixed_repo = Arc::new(MemoryFixedExpenseRepository::new());
        let mut fixed = fixed_expense(user_id, category_id, 15);
        fixed.last_posted_year = Some(2024);
        fixed.last_posted_month = Some(2);
        fixed_repo.fixed.lock().unwrap().push(fixed);

        let poster = poster(
            fixed_repo.clone(),
            MockCategoryRepository::with_subcategories(category_id, &["Gasto Fijo"]),
        );

        let summary = poster
            .post_due_fixed_expenses(date(2024, 3, 16))
            .await
            .unwrap();

        assert_eq!(summary.posted, 1);
        let expenses = fixed_repo.expenses.lock().unwrap();
        assert_eq!(expenses[0].date, date(2024, 3, 15));
    }

    #[tokio::test]
    async fn day_31_clamps_to_month_end() {
        let user_id = Uuid::new_v4();
        let category_id = Uuid::new_v4();
        let fixed_repo = Arc::new(MemoryFixedExpenseRepository::new());
        fixed_repo
            .fixed
            .lock()
            .unwrap()
            .push(fixed_expense(user_id, category_id, 31));

        let poster = poster(
            fixed_repo.clone(),
            MockCategoryRepository::with_subcategories(category_id, &["Gasto Fijo"]),
        );

        // 2024 is a leap year: day 31 becomes Feb 29.
        let summary = poster
            .post_due_fixed_expenses(date(2024, 2, 29))
            .await
            .unwrap();

        assert_eq!(summary.posted, 1);
        assert_eq!(
            fixed_repo.expenses.lock().unwrap()[0].date,
            date(2024, 2, 29)
        );
    }

    #[tokio::test]
    async fn inactive_templates_are_ignored() {
        let user_id = Uuid::new_v4();
        let category_id = Uuid::new_v4();
        let fixed_repo = Arc::new(MemoryFixedExpenseRepository::new());
        let mut fixed = fixed_expense(user_id, category_id, 15);
        fixed.is_active = false;
        fixed_repo.fixed.lock().unwrap().push(fixed);

        let poster = poster(
            fixed_repo.clone(),
            MockCategoryRepository::with_subcategories(category_id, &["Gasto Fijo"]),
        );

        let summary = poster
            .post_due_fixed_expenses(date(2024, 2, 20))
            .await
            .unwrap();

        // No active templates means no users to process at all.
        assert_eq!(summary.users_processed, 0);
        assert_eq!(summary.posted, 0);
    }

    #[test]
    fn subcategory_fallback_prefers_gasto_fijo() {
        let category_id = Uuid::new_v4();
        let subs = |names: &[&str]| -> Vec<Subcategory> {
            names
                .iter()
                .map(|name| Subcategory {
                    id: Uuid::new_v4(),
                    category_id,
                    name: name.to_string(),
                })
                .collect()
        };

        assert_eq!(
            resolve_subcategory_label(&subs(&["Luz", "Gasto Fijo", "Agua"])),
            "Gasto Fijo"
        );
        assert_eq!(resolve_subcategory_label(&subs(&["Luz", "Agua"])), "Luz");
        assert_eq!(resolve_subcategory_label(&subs(&[])), "Varios");
    }
}
