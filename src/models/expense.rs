use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_positive_amount;

/// Calendar month a fixed expense was last posted in. Stored as two integer
/// columns; month is 1-12. Rendered as `YYYY-MM` for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthMarker {
    pub year: i32,
    pub month: u32,
}

impl MonthMarker {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Number of days in this month, accounting for leap years
    pub fn last_day(&self) -> u32 {
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        };
        next.and_then(|d| d.pred_opt()).map(|d| d.day()).unwrap_or(28)
    }
}

impl fmt::Display for MonthMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthMarker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid month marker: {}", s))?;
        let year: i32 = year.parse().map_err(|_| format!("invalid year in: {}", s))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month in: {}", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in: {}", s));
        }
        Ok(Self { year, month })
    }
}

/// Expense ledger entry, created by user action or by the scheduled poster
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub category_id: Uuid,
    pub subcategory_label: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Request payload for logging an expense
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "description": "Café con leche",
    "amount": 1.80,
    "category_id": "550e8400-e29b-41d4-a716-446655440000",
    "subcategory_label": "Café",
    "date": "2024-01-15"
}))]
pub struct CreateExpenseRequest {
    #[validate(length(min = 1, max = 255, message = "Description is required"))]
    pub description: String,

    #[validate(custom(function = "validate_positive_amount"))]
    #[schema(example = 1.80)]
    pub amount: Decimal,

    pub category_id: Uuid,

    #[validate(length(min = 1, max = 100))]
    pub subcategory_label: String,

    #[schema(format = "date", example = "2024-01-15")]
    pub date: NaiveDate,
}

/// Recurring monthly expense template, posted by the scheduled job when due
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FixedExpense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub category_id: Uuid,
    pub day_of_month: i32,
    pub last_posted_year: Option<i32>,
    pub last_posted_month: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl FixedExpense {
    /// Marker of the month this template was last posted in, if ever
    pub fn last_posted(&self) -> Option<MonthMarker> {
        match (self.last_posted_year, self.last_posted_month) {
            (Some(year), Some(month)) => Some(MonthMarker::new(year, month as u32)),
            _ => None,
        }
    }
}

/// Request payload for creating a fixed expense
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "description": "Alquiler",
    "amount": 850.00,
    "category_id": "550e8400-e29b-41d4-a716-446655440000",
    "day_of_month": 1
}))]
pub struct CreateFixedExpenseRequest {
    #[validate(length(min = 1, max = 255, message = "Description is required"))]
    pub description: String,

    #[validate(custom(function = "validate_positive_amount"))]
    #[schema(example = 850.00)]
    pub amount: Decimal,

    pub category_id: Uuid,

    #[validate(range(min = 1, max = 31, message = "Day of month must be between 1 and 31"))]
    pub day_of_month: i32,
}

/// Request payload for updating a fixed expense
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateFixedExpenseRequest {
    #[validate(length(min = 1, max = 255, message = "Description is required"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Option<Decimal>,

    pub category_id: Option<Uuid>,

    #[validate(range(min = 1, max = 31, message = "Day of month must be between 1 and 31"))]
    pub day_of_month: Option<i32>,

    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_marker_renders_zero_padded() {
        assert_eq!(MonthMarker::new(2024, 2).to_string(), "2024-02");
        assert_eq!(MonthMarker::new(2024, 11).to_string(), "2024-11");
    }

    #[test]
    fn month_marker_round_trips_through_string() {
        let marker = MonthMarker::new(2024, 7);
        assert_eq!(marker.to_string().parse::<MonthMarker>().unwrap(), marker);
    }

    #[test]
    fn month_marker_rejects_out_of_range_month() {
        assert!("2024-13".parse::<MonthMarker>().is_err());
        assert!("2024-00".parse::<MonthMarker>().is_err());
        assert!("garbage".parse::<MonthMarker>().is_err());
    }

    #[test]
    fn last_day_handles_month_lengths_and_leap_years() {
        assert_eq!(MonthMarker::new(2024, 2).last_day(), 29);
        assert_eq!(MonthMarker::new(2023, 2).last_day(), 28);
        assert_eq!(MonthMarker::new(2024, 4).last_day(), 30);
        assert_eq!(MonthMarker::new(2024, 12).last_day(), 31);
    }

    #[test]
    fn from_date_uses_one_indexed_months() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        assert_eq!(MonthMarker::from_date(date), MonthMarker::new(2024, 1));
    }

    #[test]
    fn request_payloads_derive_openapi_schemas() {
        let (name, _) = CreateExpenseRequest::schema();
        assert_eq!(name, "CreateExpenseRequest");
        let (name, _) = CreateFixedExpenseRequest::schema();
        assert_eq!(name, "CreateFixedExpenseRequest");
    }
}
