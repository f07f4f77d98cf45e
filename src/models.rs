pub mod auth;
pub mod category;
pub mod expense;
pub mod user;

pub use auth::{
    GoogleSignInRequest, LoginRequest, OAuthFlow, Session, SignUpRequest, VerifiedIdentity,
};
pub use category::{
    Category, CategoryWithSubcategories, CreateCategoryRequest, CreateSubcategoryRequest,
    Subcategory, UpdateCategoryRequest, DEFAULT_CATEGORY_TEMPLATE,
};
pub use expense::{
    CreateExpenseRequest, CreateFixedExpenseRequest, Expense, FixedExpense, MonthMarker,
    UpdateFixedExpenseRequest,
};
pub use user::{Profile, UpdateProfileRequest, UserAccount};
