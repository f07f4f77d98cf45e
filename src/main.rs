use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use jsonwebtoken::DecodingKey;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use gastos_hormigas::config::Config;
use gastos_hormigas::debug_registry;
use gastos_hormigas::handlers::auth_handlers::{
    delete_account_handler, google_handler, guest_handler, login_handler, logout_handler,
    oauth_flow_handler, register_handler, ErrorResponse, OAuthFlowResponse,
};
use gastos_hormigas::handlers::category_handlers::{
    add_subcategory_handler, category_changes_handler, create_category_handler,
    delete_category_handler, list_categories_handler, remove_subcategory_handler,
    update_category_handler, ChangesResponse,
};
use gastos_hormigas::handlers::expense_handlers::{
    create_expense_handler, create_fixed_expense_handler, delete_expense_handler,
    list_expenses_handler, list_fixed_expenses_handler, update_fixed_expense_handler,
};
use gastos_hormigas::handlers::profile_handlers::{get_profile_handler, update_profile_handler};
use gastos_hormigas::handlers::AppState;
use gastos_hormigas::middleware::auth_middleware::auth_middleware;
use gastos_hormigas::models::auth::{
    GoogleSignInRequest, LoginRequest, OAuthFlow, Session, SignUpRequest,
};
use gastos_hormigas::models::category::{
    Category, CategoryWithSubcategories, CreateCategoryRequest, CreateSubcategoryRequest,
    Subcategory, UpdateCategoryRequest,
};
use gastos_hormigas::models::expense::{
    CreateExpenseRequest, CreateFixedExpenseRequest, Expense, FixedExpense,
    UpdateFixedExpenseRequest,
};
use gastos_hormigas::models::user::{Profile, UpdateProfileRequest};
use gastos_hormigas::repositories::category_repository::PostgresCategoryRepository;
use gastos_hormigas::repositories::expense_repository::PostgresExpenseRepository;
use gastos_hormigas::repositories::fixed_expense_repository::PostgresFixedExpenseRepository;
use gastos_hormigas::repositories::profile_repository::PostgresProfileRepository;
use gastos_hormigas::repositories::user_repository::PostgresUserRepository;
use gastos_hormigas::services::auth_service::{AuthService, AuthServiceImpl};
use gastos_hormigas::services::bootstrap_service::{BootstrapService, BootstrapServiceImpl};
use gastos_hormigas::services::category_service::{
    CategoryEvents, CategoryService, CategoryServiceImpl,
};
use gastos_hormigas::services::expense_service::{ExpenseService, ExpenseServiceImpl};
use gastos_hormigas::services::identity_verifier::{
    DisabledIdentityVerifier, GoogleIdTokenVerifier, IdentityVerifier,
};
use gastos_hormigas::services::profile_service::{ProfileService, ProfileServiceImpl};
use gastos_hormigas::validation::PasswordIssue;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        gastos_hormigas::handlers::auth_handlers::guest_handler,
        gastos_hormigas::handlers::auth_handlers::register_handler,
        gastos_hormigas::handlers::auth_handlers::login_handler,
        gastos_hormigas::handlers::auth_handlers::google_handler,
        gastos_hormigas::handlers::auth_handlers::logout_handler,
        gastos_hormigas::handlers::auth_handlers::oauth_flow_handler,
        gastos_hormigas::handlers::auth_handlers::delete_account_handler,
        gastos_hormigas::handlers::profile_handlers::get_profile_handler,
        gastos_hormigas::handlers::profile_handlers::update_profile_handler,
        gastos_hormigas::handlers::category_handlers::list_categories_handler,
        gastos_hormigas::handlers::category_handlers::create_category_handler,
        gastos_hormigas::handlers::category_handlers::update_category_handler,
        gastos_hormigas::handlers::category_handlers::delete_category_handler,
        gastos_hormigas::handlers::category_handlers::add_subcategory_handler,
        gastos_hormigas::handlers::category_handlers::remove_subcategory_handler,
        gastos_hormigas::handlers::category_handlers::category_changes_handler,
        gastos_hormigas::handlers::expense_handlers::list_expenses_handler,
        gastos_hormigas::handlers::expense_handlers::create_expense_handler,
        gastos_hormigas::handlers::expense_handlers::delete_expense_handler,
        gastos_hormigas::handlers::expense_handlers::list_fixed_expenses_handler,
        gastos_hormigas::handlers::expense_handlers::create_fixed_expense_handler,
        gastos_hormigas::handlers::expense_handlers::update_fixed_expense_handler,
    ),
    components(
        schemas(
            Session, SignUpRequest, LoginRequest, GoogleSignInRequest, OAuthFlow,
            OAuthFlowResponse, PasswordIssue, ErrorResponse,
            Profile, UpdateProfileRequest,
            Category, Subcategory, CategoryWithSubcategories, CreateCategoryRequest,
            UpdateCategoryRequest, CreateSubcategoryRequest, ChangesResponse,
            Expense, CreateExpenseRequest, FixedExpense, CreateFixedExpenseRequest,
            UpdateFixedExpenseRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication and account linking"),
        (name = "profile", description = "User profile"),
        (name = "categories", description = "Expense categories"),
        (name = "expenses", description = "Expenses and fixed expenses")
    ),
    info(
        title = "Gastos Hormigas API",
        version = "0.1.0",
        description = "REST API for the Gastos Hormigas personal finance tracker",
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Load Google's RSA public keys from a PEM bundle
fn load_google_keys(path: &str) -> Result<Vec<DecodingKey>, Box<dyn std::error::Error>> {
    let bundle = std::fs::read_to_string(path)?;
    let mut keys = Vec::new();
    for block in bundle.split_inclusive("-----END PUBLIC KEY-----") {
        let block = block.trim();
        if block.starts_with("-----BEGIN PUBLIC KEY-----") {
            keys.push(DecodingKey::from_rsa_pem(block.as_bytes())?);
        }
    }
    if keys.is_empty() {
        return Err(format!("no public keys found in {}", path).into());
    }
    Ok(keys)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Fail fast on incomplete configuration
    let config = Config::from_env()?;

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    info!("connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("migrations completed");

    // Initialize repositories
    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));
    let profile_repository = Arc::new(PostgresProfileRepository::new(pool.clone()));
    let category_repository = Arc::new(PostgresCategoryRepository::new(pool.clone()));
    let expense_repository = Arc::new(PostgresExpenseRepository::new(pool.clone()));
    let fixed_expense_repository = Arc::new(PostgresFixedExpenseRepository::new(pool.clone()));

    // Google sign-in is optional; without a client id the endpoint answers 503
    let verifier: Arc<dyn IdentityVerifier> =
        match (&config.google_client_id, &config.google_jwks_pem) {
            (Some(client_id), Some(pem_path)) => {
                let keys = load_google_keys(pem_path)?;
                info!(keys = keys.len(), "Google sign-in enabled");
                Arc::new(GoogleIdTokenVerifier::new(client_id.clone(), keys))
            }
            _ => {
                warn!("GOOGLE_CLIENT_ID/GOOGLE_JWKS_PEM not set, Google sign-in disabled");
                Arc::new(DisabledIdentityVerifier)
            }
        };

    // Initialize services
    let category_events = Arc::new(CategoryEvents::new());

    let bootstrap_impl = Arc::new(BootstrapServiceImpl::new(
        profile_repository.clone(),
        category_repository.clone(),
        category_events.clone(),
    ));
    let auth_impl = Arc::new(AuthServiceImpl::new(
        user_repository,
        profile_repository.clone(),
        bootstrap_impl.clone() as Arc<dyn BootstrapService>,
        verifier,
        config.jwt_secret.clone(),
    ));
    let category_impl = Arc::new(CategoryServiceImpl::new(
        category_repository.clone(),
        category_events,
    ));
    let expense_impl = Arc::new(ExpenseServiceImpl::new(
        expense_repository,
        fixed_expense_repository,
        category_repository,
    ));
    let profile_impl = Arc::new(ProfileServiceImpl::new(profile_repository));

    // Debug builds expose service handles to diagnostic tooling
    debug_registry::register("auth_service", auth_impl.clone());
    debug_registry::register("category_service", category_impl.clone());
    debug_registry::register("expense_service", expense_impl.clone());
    debug_registry::register("profile_service", profile_impl.clone());

    let auth_service: Arc<dyn AuthService> = auth_impl;
    let state = AppState {
        auth_service: auth_service.clone(),
        category_service: category_impl as Arc<dyn CategoryService>,
        expense_service: expense_impl as Arc<dyn ExpenseService>,
        profile_service: profile_impl as Arc<dyn ProfileService>,
    };

    // Routes that require a session token
    let protected = Router::new()
        .route("/api/auth/account", delete(delete_account_handler))
        .route(
            "/api/profile",
            get(get_profile_handler).patch(update_profile_handler),
        )
        .route(
            "/api/categories",
            get(list_categories_handler).post(create_category_handler),
        )
        .route("/api/categories/changes", get(category_changes_handler))
        .route(
            "/api/categories/:id",
            patch(update_category_handler).delete(delete_category_handler),
        )
        .route(
            "/api/categories/:id/subcategories",
            post(add_subcategory_handler),
        )
        .route(
            "/api/categories/:id/subcategories/:subcategory_id",
            delete(remove_subcategory_handler),
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

    // Build router with routes
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/guest", post(guest_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/google", post(google_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/oauth-flow", get(oauth_flow_handler))
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive());

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("server running on http://{}", addr);
    info!("API docs at http://{}/api/docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
