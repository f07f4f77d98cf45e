//! End-to-end router tests over in-memory repositories.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use gastos_hormigas::handlers::auth_handlers::{
    guest_handler, login_handler, logout_handler, register_handler,
};
use gastos_hormigas::handlers::category_handlers::{
    create_category_handler, list_categories_handler,
};
use gastos_hormigas::handlers::expense_handlers::{
    create_expense_handler, create_fixed_expense_handler, delete_expense_handler,
    list_expenses_handler, list_fixed_expenses_handler, update_fixed_expense_handler,
};
use gastos_hormigas::handlers::profile_handlers::{get_profile_handler, update_profile_handler};
use gastos_hormigas::handlers::AppState;
use gastos_hormigas::middleware::auth_middleware::auth_middleware;
use gastos_hormigas::models::category::{
    Category, CategoryWithSubcategories, DefaultCategory, Subcategory,
};
use gastos_hormigas::models::expense::{Expense, FixedExpense, MonthMarker};
use gastos_hormigas::models::user::{Profile, UpdateProfileRequest, UserAccount};
use gastos_hormigas::repositories::category_repository::CategoryRepository;
use gastos_hormigas::repositories::expense_repository::ExpenseRepository;
use gastos_hormigas::repositories::fixed_expense_repository::FixedExpenseRepository;
use gastos_hormigas::repositories::profile_repository::ProfileRepository;
use gastos_hormigas::repositories::user_repository::UserRepository;
use gastos_hormigas::repositories::RepositoryError;
use gastos_hormigas::services::auth_service::{AuthService, AuthServiceImpl};
use gastos_hormigas::services::bootstrap_service::{BootstrapService, BootstrapServiceImpl};
use gastos_hormigas::services::category_service::{
    CategoryEvents, CategoryService, CategoryServiceImpl,
};
use gastos_hormigas::services::expense_service::{ExpenseService, ExpenseServiceImpl};
use gastos_hormigas::services::identity_verifier::DisabledIdentityVerifier;
use gastos_hormigas::services::profile_service::{ProfileService, ProfileServiceImpl};

struct MemoryUserRepository {
    accounts: Mutex<HashMap<Uuid, UserAccount>>,
}

impl MemoryUserRepository {
    fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_anonymous(&self) -> Result<UserAccount, RepositoryError> {
        let account = UserAccount {
            id: Uuid::new_v4(),
            email: None,
            password_hash: None,
            google_subject: None,
            is_anonymous: true,
            created_at: Utc::now(),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id, account.clone());
        Ok(account)
    }

    async fn create_with_email(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<UserAccount, RepositoryError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.values().any(|a| a.email.as_deref() == Some(email)) {
            return Err(RepositoryError::ConstraintViolation(
                "Email already exists".to_string(),
            ));
        }
        let account = UserAccount {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            password_hash: Some(password_hash.to_string()),
            google_subject: None,
            is_anonymous: false,
            created_at: Utc::now(),
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn create_with_google(
        &self,
        subject: &str,
        email: Option<&str>,
    ) -> Result<UserAccount, RepositoryError> {
        let account = UserAccount {
            id: Uuid::new_v4(),
            email: email.map(str::to_string),
            password_hash: None,
            google_subject: Some(subject.to_string()),
            is_anonymous: false,
            created_at: Utc::now(),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self.accounts.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_by_google_subject(
        &self,
        subject: &str,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.google_subject.as_deref() == Some(subject))
            .cloned())
    }

    async fn attach_email_credential(
        &self,
        user_id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<UserAccount, RepositoryError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts
            .values()
            .any(|a| a.id != user_id && a.email.as_deref() == Some(email))
        {
            return Err(RepositoryError::ConstraintViolation(
                "Email already exists".to_string(),
            ));
        }
        let account = accounts.get_mut(&user_id).ok_or(RepositoryError::NotFound)?;
        account.email = Some(email.to_string());
        account.password_hash = Some(password_hash.to_string());
        account.is_anonymous = false;
        Ok(account.clone())
    }

    async fn attach_google_identity(
        &self,
        user_id: Uuid,
        subject: &str,
        email: Option<&str>,
    ) -> Result<UserAccount, RepositoryError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(&user_id).ok_or(RepositoryError::NotFound)?;
        account.google_subject = Some(subject.to_string());
        if account.email.is_none() {
            account.email = email.map(str::to_string);
        }
        account.is_anonymous = false;
        Ok(account.clone())
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), RepositoryError> {
        self.accounts
            .lock()
            .unwrap()
            .remove(&user_id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

struct MemoryProfileRepository {
    profiles: Mutex<HashMap<Uuid, Profile>>,
}

impl MemoryProfileRepository {
    fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfileRepository {
    async fn create_if_absent(&self, profile: Profile) -> Result<bool, RepositoryError> {
        let mut profiles = self.profiles.lock().unwrap();
        if profiles.contains_key(&profile.user_id) {
            return Ok(false);
        }
        profiles.insert(profile.user_id, profile);
        Ok(true)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }

    async fn update(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<Profile, RepositoryError> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.get_mut(&user_id).ok_or(RepositoryError::NotFound)?;
        if let Some(name) = request.display_name {
            profile.display_name = name;
        }
        if let Some(currency) = request.currency {
            profile.currency = currency;
        }
        if let Some(theme) = request.theme {
            profile.theme = theme;
        }
        if let Some(language) = request.language {
            profile.language = language;
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}

struct MemoryCategoryRepository {
    categories: Mutex<Vec<Category>>,
    subcategories: Mutex<Vec<Subcategory>>,
}

impl MemoryCategoryRepository {
    fn new() -> Self {
        Self {
            categories: Mutex::new(Vec::new()),
            subcategories: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CategoryRepository for MemoryCategoryRepository {
    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id)
            .count() as i64)
    }

    async fn seed(
        &self,
        user_id: Uuid,
        template: &[DefaultCategory],
    ) -> Result<(), RepositoryError> {
        let mut categories = self.categories.lock().unwrap();
        let mut subcategories = self.subcategories.lock().unwrap();
        for entry in template {
            let category_id = Uuid::new_v4();
            categories.push(Category {
                id: category_id,
                user_id,
                name: entry.name.to_string(),
                icon: entry.icon.to_string(),
                color: entry.color.to_string(),
                is_default: true,
                budget: None,
                created_at: Utc::now(),
            });
            for name in entry.subcategories {
                subcategories.push(Subcategory {
                    id: Uuid::new_v4(),
                    category_id,
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn list_with_subcategories(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CategoryWithSubcategories>, RepositoryError> {
        let subcategories = self.subcategories.lock().unwrap();
        let mut rows: Vec<CategoryWithSubcategories> = self
            .categories
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|category| CategoryWithSubcategories {
                category: category.clone(),
                subcategories: subcategories
                    .iter()
                    .filter(|s| s.category_id == category.id)
                    .cloned()
                    .collect(),
            })
            .collect();
        rows.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepositoryError> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn create(&self, category: Category) -> Result<Category, RepositoryError> {
        let mut categories = self.categories.lock().unwrap();
        if categories
            .iter()
            .any(|c| c.user_id == category.user_id && c.name == category.name)
        {
            return Err(RepositoryError::ConstraintViolation(
                "Category name already exists".to_string(),
            ));
        }
        categories.push(category.clone());
        Ok(category)
    }

    async fn update(&self, category: Category) -> Result<Category, RepositoryError> {
        let mut categories = self.categories.lock().unwrap();
        let slot = categories
            .iter_mut()
            .find(|c| c.id == category.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = category.clone();
        Ok(category)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut categories = self.categories.lock().unwrap();
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Err(RepositoryError::NotFound);
        }
        self.subcategories
            .lock()
            .unwrap()
            .retain(|s| s.category_id != id);
        Ok(())
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
        subcategory: Subcategory,
    ) -> Result<Subcategory, RepositoryError> {
        self.subcategories.lock().unwrap().push(subcategory.clone());
        Ok(subcategory)
    }

    async fn delete_subcategory(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut subcategories = self.subcategories.lock().unwrap();
        let before = subcategories.len();
        subcategories.retain(|s| s.id != id);
        if subcategories.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

struct MemoryExpenseRepository {
    expenses: Mutex<Vec<Expense>>,
}

impl MemoryExpenseRepository {
    fn new() -> Self {
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
        Ok(self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
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

struct MemoryFixedExpenseRepository {
    fixed: Mutex<Vec<FixedExpense>>,
}

impl MemoryFixedExpenseRepository {
    fn new() -> Self {
        Self {
            fixed: Mutex::new(Vec::new()),
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

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<FixedExpense>, RepositoryError> {
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
        _expense: Expense,
        fixed_expense_id: Uuid,
        month: MonthMarker,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.fixed.lock().unwrap();
        let slot = rows
            .iter_mut()
            .find(|f| f.id == fixed_expense_id)
            .ok_or(RepositoryError::NotFound)?;
        slot.last_posted_year = Some(month.year);
        slot.last_posted_month = Some(month.month as i32);
        Ok(())
    }
}

fn create_app() -> Router {
    let user_repository = Arc::new(MemoryUserRepository::new());
    let profile_repository = Arc::new(MemoryProfileRepository::new());
    let category_repository = Arc::new(MemoryCategoryRepository::new());
    let expense_repository = Arc::new(MemoryExpenseRepository::new());
    let fixed_expense_repository = Arc::new(MemoryFixedExpenseRepository::new());

    let category_events = Arc::new(CategoryEvents::new());
    let bootstrap: Arc<dyn BootstrapService> = Arc::new(BootstrapServiceImpl::new(
        profile_repository.clone(),
        category_repository.clone(),
        category_events.clone(),
    ));
    let auth_service: Arc<dyn AuthService> = Arc::new(AuthServiceImpl::new(
        user_repository,
        profile_repository.clone(),
        bootstrap,
        Arc::new(DisabledIdentityVerifier),
        "integration_test_secret".to_string(),
    ));
    let category_service: Arc<dyn CategoryService> = Arc::new(CategoryServiceImpl::new(
        category_repository.clone(),
        category_events,
    ));
    let expense_service: Arc<dyn ExpenseService> = Arc::new(ExpenseServiceImpl::new(
        expense_repository,
        fixed_expense_repository,
        category_repository,
    ));
    let profile_service: Arc<dyn ProfileService> =
        Arc::new(ProfileServiceImpl::new(profile_repository));

    let state = AppState {
        auth_service: auth_service.clone(),
        category_service,
        expense_service,
        profile_service,
    };

    let protected = Router::new()
        .route(
            "/api/profile",
            get(get_profile_handler).patch(update_profile_handler),
        )
        .route(
            "/api/categories",
            get(list_categories_handler).post(create_category_handler),
        )
        .route(
            "/api/expenses",
            get(list_expenses_handler).post(create_expense_handler),
        )
        .route("/api/expenses/:id", delete(delete_expense_handler))
        .route(
            "/api/fixed-expenses",
            get(list_fixed_expenses_handler).post(create_fixed_expense_handler),
        )
        .route("/api/fixed-expenses/:id", patch(update_fixed_expense_handler))
        .layer(middleware::from_fn_with_state(
            auth_service.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/api/auth/guest", post(guest_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler))
        .merge(protected)
        .with_state(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn register_body() -> Value {
    json!({
        "display_name": "María García",
        "email": "maria@example.com",
        "password": "Tr3bol!verde"
    })
}

#[tokio::test]
async fn guest_flow_seeds_defaults_and_accepts_expenses() {
    let app = create_app();

    let (status, guest) = send(&app, post_json("/api/auth/guest", None, json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(guest["is_anonymous"], true);
    let token = guest["token"].as_str().unwrap().to_string();

    // Bootstrap seeded the default category template.
    let (status, categories) = send(&app, get_with_token("/api/categories", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let categories = categories.as_array().unwrap().clone();
    assert_eq!(categories.len(), 8);
    assert!(categories.iter().any(|c| c["name"] == "Alimentación"));

    // A guest can log expenses like any other user.
    let category_id = categories[0]["id"].as_str().unwrap();
    let (status, expense) = send(
        &app,
        post_json(
            "/api/expenses",
            Some(&token),
            json!({
                "description": "Café con leche",
                "amount": 1.80,
                "category_id": category_id,
                "subcategory_label": "Café",
                "date": "2024-01-15"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expense["description"], "Café con leche");
}

#[tokio::test]
async fn linking_preserves_guest_data_across_upgrade() {
    let app = create_app();

    let (_, guest) = send(&app, post_json("/api/auth/guest", None, json!({}))).await;
    let guest_token = guest["token"].as_str().unwrap().to_string();
    let guest_id = guest["user_id"].as_str().unwrap().to_string();

    let (_, categories) = send(&app, get_with_token("/api/categories", &guest_token)).await;
    let category_id = categories[0]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        post_json(
            "/api/expenses",
            Some(&guest_token),
            json!({
                "description": "Menú del día",
                "amount": 12.50,
                "category_id": category_id,
                "subcategory_label": "Restaurantes",
                "date": "2024-01-10"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Upgrade the guest with email credentials; same user id, fresh token.
    let (status, session) = send(
        &app,
        post_json("/api/auth/register", Some(&guest_token), register_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["user_id"], guest_id.as_str());
    assert_eq!(session["is_anonymous"], false);

    let new_token = session["token"].as_str().unwrap();
    let (status, expenses) = send(&app, get_with_token("/api/expenses", new_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(expenses.as_array().unwrap().len(), 1);
    assert_eq!(expenses[0]["description"], "Menú del día");
}

#[tokio::test]
async fn register_login_and_profile_roundtrip() {
    let app = create_app();

    let (status, _) = send(&app, post_json("/api/auth/register", None, register_body())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, session) = send(
        &app,
        post_json(
            "/api/auth/login",
            None,
            json!({ "email": "maria@example.com", "password": "Tr3bol!verde" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = session["token"].as_str().unwrap();

    let (status, profile) = send(&app, get_with_token("/api/profile", token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["display_name"], "María García");
    assert_eq!(profile["currency"], "EUR");
    assert_eq!(profile["language"], "es");
}

#[tokio::test]
async fn weak_password_is_rejected_with_reason() {
    let app = create_app();

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/register",
            None,
            json!({
                "display_name": "María García",
                "email": "maria@example.com",
                "password": "password123"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "weak_password");
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_unauthorized() {
    let app = create_app();

    let (_, _) = send(&app, post_json("/api/auth/register", None, register_body())).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            None,
            json!({ "email": "maria@example.com", "password": "Wr0ng!password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");

    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/login",
            None,
            json!({ "email": "nadie@example.com", "password": "Tr3bol!verde" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = create_app();

    let request = Request::builder()
        .uri("/api/categories")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn month_filter_narrows_expense_listing() {
    let app = create_app();

    let (_, guest) = send(&app, post_json("/api/auth/guest", None, json!({}))).await;
    let token = guest["token"].as_str().unwrap().to_string();
    let (_, categories) = send(&app, get_with_token("/api/categories", &token)).await;
    let category_id = categories[0]["id"].as_str().unwrap().to_string();

    for (date, description) in [("2024-01-15", "Enero"), ("2024-02-03", "Febrero")] {
        let (status, _) = send(
            &app,
            post_json(
                "/api/expenses",
                Some(&token),
                json!({
                    "description": description,
                    "amount": 5.00,
                    "category_id": category_id,
                    "subcategory_label": "Varios",
                    "date": date
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, expenses) =
        send(&app, get_with_token("/api/expenses?month=2024-01", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let expenses = expenses.as_array().unwrap().clone();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0]["description"], "Enero");

    let (status, body) =
        send(&app, get_with_token("/api/expenses?month=2024-13", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_month");
}

#[tokio::test]
async fn fixed_expense_lifecycle_over_http() {
    let app = create_app();

    let (_, guest) = send(&app, post_json("/api/auth/guest", None, json!({}))).await;
    let token = guest["token"].as_str().unwrap().to_string();
    let (_, categories) = send(&app, get_with_token("/api/categories", &token)).await;
    let category_id = categories[0]["id"].as_str().unwrap().to_string();

    let (status, fixed) = send(
        &app,
        post_json(
            "/api/fixed-expenses",
            Some(&token),
            json!({
                "description": "Alquiler",
                "amount": 850.00,
                "category_id": category_id,
                "day_of_month": 1
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(fixed["is_active"], true);
    let fixed_id = fixed["id"].as_str().unwrap().to_string();

    // Deactivate through a partial update.
    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/api/fixed-expenses/{}", fixed_id))
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::from(json!({ "is_active": false }).to_string()))
        .unwrap();
    let (status, updated) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_active"], false);

    let (_, listed) = send(&app, get_with_token("/api/fixed-expenses", &token)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn logout_is_always_no_content() {
    let app = create_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
