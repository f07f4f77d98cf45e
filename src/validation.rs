use iso_currency::Currency;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{ValidateEmail, ValidationError};

/// Validates that a currency code is a valid ISO 4217 currency code
pub fn validate_currency_code(code: &str) -> Result<(), ValidationError> {
    Currency::from_code(code).ok_or_else(|| {
        let mut error = ValidationError::new("invalid_currency");
        error.message = Some(format!("'{}' is not a valid ISO 4217 currency code", code).into());
        error
    })?;
    Ok(())
}

/// Validates that an amount is positive (greater than 0)
pub fn validate_positive_amount(amount: &rust_decimal::Decimal) -> Result<(), ValidationError> {
    if *amount <= rust_decimal::Decimal::ZERO {
        let mut error = ValidationError::new("invalid_amount");
        error.message = Some("Amount must be greater than 0".into());
        return Err(error);
    }
    Ok(())
}

/// Checks email shape locally, before any database round trip
pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}

/// Base words that make a password weak regardless of character classes
const WEAK_BASE_WORDS: &[&str] = &[
    "password",
    "contrasena",
    "qwerty",
    "123456",
    "abc123",
    "admin",
    "letmein",
    "welcome",
];

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// One specific reason a password was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PasswordIssue {
    TooShort,
    NoLowercase,
    NoUppercase,
    NoDigit,
    NoSpecialChar,
    CommonPattern,
}

impl PasswordIssue {
    /// Human-readable reason, as surfaced in error responses
    pub fn describe(&self) -> &'static str {
        match self {
            PasswordIssue::TooShort => "must be at least 8 characters",
            PasswordIssue::NoLowercase => "must contain a lowercase letter",
            PasswordIssue::NoUppercase => "must contain an uppercase letter",
            PasswordIssue::NoDigit => "must contain a digit",
            PasswordIssue::NoSpecialChar => "must contain a special character",
            PasswordIssue::CommonPattern => "is based on a common password",
        }
    }
}

/// Checks a password against the local policy and returns every issue found,
/// so the UI can enumerate them. Empty result means the password is accepted.
pub fn check_password(password: &str) -> Vec<PasswordIssue> {
    let mut issues = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        issues.push(PasswordIssue::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        issues.push(PasswordIssue::NoLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        issues.push(PasswordIssue::NoUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        issues.push(PasswordIssue::NoDigit);
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        issues.push(PasswordIssue::NoSpecialChar);
    }

    // Strip everything but letters and digits so "Pass-word123" still matches
    // the "password" base word.
    let normalized: String = password
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    if WEAK_BASE_WORDS.iter().any(|word| normalized.contains(word)) {
        issues.push(PasswordIssue::CommonPattern);
    }

    issues
}
