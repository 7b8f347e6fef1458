//! Shopping list for the meals in a wellness plan.

use super::Flow;
use crate::models::{GroceryItem, Meal};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GroceryListInput {
    #[validate(length(min = 1, message = "At least one meal is required"), nested)]
    pub meals: Vec<Meal>,

    #[validate(length(max = 500))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_preferences: Option<String>,

    #[validate(length(max = 100))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GroceryListOutput {
    #[validate(length(min = 1, message = "Grocery list is empty"), nested)]
    pub items: Vec<GroceryItem>,
}

pub struct GroceryListFlow;

impl Flow for GroceryListFlow {
    const NAME: &'static str = "grocery_list";

    type Input = GroceryListInput;
    type Output = GroceryListOutput;

    fn prompt(input: &GroceryListInput) -> String {
        let meals = input
            .meals
            .iter()
            .map(|m| {
                format!(
                    "- {}: breakfast: {}; lunch: {}; dinner: {}",
                    m.day, m.breakfast, m.lunch, m.dinner
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut prompt = format!(
            "You are GroZen, a practical meal-prep helper for teenagers and their families.\n\
             Build one consolidated grocery list covering every ingredient needed for these meals:\n\n\
             {meals}\n"
        );
        if let Some(diet) = input.diet_preferences.as_deref().filter(|d| !d.trim().is_empty()) {
            prompt.push_str(&format!("\nDiet preferences: {}", diet.trim()));
        }
        if let Some(budget) = input.budget.as_deref().filter(|b| !b.trim().is_empty()) {
            prompt.push_str(&format!("\nBudget: {}", budget.trim()));
        }
        prompt.push_str(
            "\n\nCombine duplicate ingredients into a single item with a total quantity. \
             Give every item a name and a store section as its category \
             (for example Produce, Dairy, Protein, Grains, Pantry, Frozen).\n\
             Respond only with JSON matching the provided schema.",
        );
        prompt
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "items": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "name": { "type": "STRING" },
                            "category": { "type": "STRING" },
                            "quantity": { "type": "STRING" },
                            "notes": { "type": "STRING" }
                        },
                        "required": ["name", "category"],
                    }
                }
            },
            "required": ["items"],
        })
    }

    fn temperature() -> f32 {
        0.3
    }

    fn finalize(output: &mut GroceryListOutput) {
        for item in &mut output.items {
            item.name = item.name.trim().to_string();
            item.category = item.category.trim().to_string();
            if item.id.is_empty() {
                item.id = uuid::Uuid::new_v4().to_string();
            }
        }
    }
}
