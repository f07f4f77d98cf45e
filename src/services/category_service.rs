use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::category::{
    Category, CategoryWithSubcategories, CreateCategoryRequest, CreateSubcategoryRequest,
    Subcategory, UpdateCategoryRequest,
};
use crate::repositories::category_repository::CategoryRepository;
use crate::repositories::RepositoryError;

/// Category service errors
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("Category not found")]
    NotFound,

    #[error("Category with this name already exists")]
    DuplicateName,

    #[error("Unauthorized to access this category")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for CategoryError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => CategoryError::NotFound,
            RepositoryError::ConstraintViolation(_) => CategoryError::DuplicateName,
            RepositoryError::DatabaseError(msg) => CategoryError::DatabaseError(msg),
        }
    }
}

/// Change notification for one user's category set. Carries no payload: the
/// client refetches and replaces its whole list on every notification.
#[derive(Debug, Clone, Copy)]
pub struct CategoryEvent {
    pub user_id: Uuid,
}

/// Broadcast hub for category changes, shared by every publisher
pub struct CategoryEvents {
    sender: broadcast::Sender<CategoryEvent>,
}

impl CategoryEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    pub fn publish(&self, user_id: Uuid) {
        // No subscribers is fine.
        let _ = self.sender.send(CategoryEvent { user_id });
    }

    pub fn subscribe(&self, user_id: Uuid) -> CategoryFeed {
        CategoryFeed {
            user_id,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for CategoryEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-user subscription to category changes. Dropping the feed tears the
/// underlying channel subscription down immediately.
pub struct CategoryFeed {
    user_id: Uuid,
    receiver: broadcast::Receiver<CategoryEvent>,
}

impl CategoryFeed {
    /// Waits for the next change to this user's categories. Returns None
    /// when the hub has shut down. A lagged receiver is reported as a
    /// change, since the client refetches the full list anyway.
    pub async fn changed(&mut self) -> Option<()> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.user_id == self.user_id => return Some(()),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => return Some(()),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Trait defining category service operations
#[async_trait]
pub trait CategoryService: Send + Sync {
    /// A user's categories with subcategories, ordered by name
    async fn list(&self, user_id: Uuid)
        -> Result<Vec<CategoryWithSubcategories>, CategoryError>;

    /// Create a custom category
    async fn create(
        &self,
        user_id: Uuid,
        request: CreateCategoryRequest,
    ) -> Result<Category, CategoryError>;

    /// Update a category the user owns
    async fn update(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<Category, CategoryError>;

    /// Delete a category the user owns
    async fn delete(&self, user_id: Uuid, category_id: Uuid) -> Result<(), CategoryError>;

    /// Add a subcategory to a category the user owns
    async fn add_subcategory(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        request: CreateSubcategoryRequest,
    ) -> Result<Subcategory, CategoryError>;

    /// Remove a subcategory from a category the user owns
    async fn remove_subcategory(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        subcategory_id: Uuid,
    ) -> Result<(), CategoryError>;

    /// Subscribe to change notifications for a user's categories
    fn subscribe(&self, user_id: Uuid) -> CategoryFeed;
}

/// Implementation of CategoryService
pub struct CategoryServiceImpl {
    category_repository: Arc<dyn CategoryRepository>,
    events: Arc<CategoryEvents>,
}

impl CategoryServiceImpl {
    pub fn new(category_repository: Arc<dyn CategoryRepository>, events: Arc<CategoryEvents>) -> Self {
        Self {
            category_repository,
            events,
        }
    }

    /// Fetch a category and verify the caller owns it
    async fn owned_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
    ) -> Result<Category, CategoryError> {
        let category = self
            .category_repository
            .find_by_id(category_id)
            .await?
            .ok_or(CategoryError::NotFound)?;

        if category.user_id != user_id {
            return Err(CategoryError::Unauthorized);
        }
        Ok(category)
    }
}

#[async_trait]
impl CategoryService for CategoryServiceImpl {
    async fn list(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CategoryWithSubcategories>, CategoryError> {
        Ok(self
            .category_repository
            .list_with_subcategories(user_id)
            .await?)
    }

    async fn create(
        &self,
        user_id: Uuid,
        request: CreateCategoryRequest,
    ) -> Result<Category, CategoryError> {
        let category = self
            .category_repository
            .create(Category {
                id: Uuid::new_v4(),
                user_id,
                name: request.name,
                icon: request.icon,
                color: request.color,
                is_default: false,
                budget: request.budget,
                created_at: chrono::Utc::now(),
            })
            .await?;

        self.events.publish(user_id);
        Ok(category)
    }

    async fn update(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<Category, CategoryError> {
        let existing = self.owned_category(user_id, category_id).await?;

        let updated = self
            .category_repository
            .update(Category {
                name: request.name.unwrap_or(existing.name),
                icon: request.icon.unwrap_or(existing.icon),
                color: request.color.unwrap_or(existing.color),
                budget: request.budget.or(existing.budget),
                ..existing
            })
            .await?;

        self.events.publish(user_id);
        Ok(updated)
    }

    async fn delete(&self, user_id: Uuid, category_id: Uuid) -> Result<(), CategoryError> {
        self.owned_category(user_id, category_id).await?;

        // Subcategories cascade at the database level.
        self.category_repository.delete(category_id).await?;
        self.events.publish(user_id);
        Ok(())
    }

    async fn add_subcategory(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        request: CreateSubcategoryRequest,
    ) -> Result<Subcategory, CategoryError> {
        self.owned_category(user_id, category_id).await?;

        let subcategory = self
            .category_repository
            .add_subcategory(Subcategory {
                id: Uuid::new_v4(),
                category_id,
                name: request.name,
            })
            .await?;

        self.events.publish(user_id);
        Ok(subcategory)
    }

    async fn remove_subcategory(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        subcategory_id: Uuid,
    ) -> Result<(), CategoryError> {
        self.owned_category(user_id, category_id).await?;

        let belongs = self
            .category_repository
            .subcategories_of(category_id)
            .await?
            .iter()
            .any(|s| s.id == subcategory_id);
        if !belongs {
            return Err(CategoryError::NotFound);
        }

        self.category_repository
            .delete_subcategory(subcategory_id)
            .await?;
        self.events.publish(user_id);
        Ok(())
    }

    fn subscribe(&self, user_id: Uuid) -> CategoryFeed {
        self.events.subscribe(user_id)
    }
}
