pub mod auth_service;
pub mod bootstrap_service;
pub mod category_service;
pub mod expense_service;
pub mod identity_verifier;
pub mod poster_service;
pub mod profile_service;
