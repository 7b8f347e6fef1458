use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation::validate_not_blank;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GroceryItem {
    /// Filled in after generation when the model omits it.
    #[serde(default)]
    pub id: String,

    #[validate(
        length(min = 1, message = "Item name is required"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,

    #[validate(
        length(min = 1, message = "Item category is required"),
        custom(function = "validate_not_blank")
    )]
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The user's current grocery list; regenerating replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryList {
    pub user_id: String,
    pub items: Vec<GroceryItem>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub generated_at: DateTime<Utc>,
}
