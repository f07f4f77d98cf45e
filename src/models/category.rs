use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_positive_amount;

/// One entry of the default template seeded for every new user
pub struct DefaultCategory {
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub subcategories: &'static [&'static str],
}

/// Fixed template seeded on first sign-in. The "Gasto Fijo" subcategory is
/// the preferred target when the scheduled poster resolves a label.
pub const DEFAULT_CATEGORY_TEMPLATE: &[DefaultCategory] = &[
    DefaultCategory {
        name: "Alimentación",
        icon: "restaurant",
        color: "#FF6B6B",
        subcategories: &["Supermercado", "Restaurantes", "Café", "Gasto Fijo"],
    },
    DefaultCategory {
        name: "Transporte",
        icon: "directions_car",
        color: "#4ECDC4",
        subcategories: &["Gasolina", "Transporte público", "Parking", "Gasto Fijo"],
    },
    DefaultCategory {
        name: "Hogar",
        icon: "home",
        color: "#45B7D1",
        subcategories: &["Alquiler", "Mantenimiento", "Muebles", "Gasto Fijo"],
    },
    DefaultCategory {
        name: "Ocio",
        icon: "sports_esports",
        color: "#96CEB4",
        subcategories: &["Cine", "Suscripciones", "Viajes"],
    },
    DefaultCategory {
        name: "Salud",
        icon: "favorite",
        color: "#FF8A80",
        subcategories: &["Farmacia", "Médico", "Deporte"],
    },
    DefaultCategory {
        name: "Servicios",
        icon: "bolt",
        color: "#FFD93D",
        subcategories: &["Luz", "Agua", "Internet", "Gasto Fijo"],
    },
    DefaultCategory {
        name: "Educación",
        icon: "school",
        color: "#B39DDB",
        subcategories: &["Cursos", "Libros"],
    },
    DefaultCategory {
        name: "Otros",
        icon: "category",
        color: "#A0A0A0",
        subcategories: &["Varios"],
    },
];

/// Category entity owned by a single user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub is_default: bool,
    pub budget: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Subcategory entity; deletion cascades from the category at the database level
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subcategory {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
}

/// Category together with its subcategories, as the client consumes it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryWithSubcategories {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<Subcategory>,
}

/// Request payload for creating a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Mascotas",
    "icon": "pets",
    "color": "#8D6E63",
    "budget": 50.0
}))]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 50))]
    pub icon: String,

    #[validate(length(min = 1, max = 20))]
    pub color: String,

    #[validate(custom(function = "validate_positive_amount"))]
    pub budget: Option<Decimal>,
}

/// Request payload for updating a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub icon: Option<String>,

    #[validate(length(min = 1, max = 20))]
    pub color: Option<String>,

    #[validate(custom(function = "validate_positive_amount"))]
    pub budget: Option<Decimal>,
}

/// Request payload for adding a subcategory
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({ "name": "Veterinario" }))]
pub struct CreateSubcategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
}
