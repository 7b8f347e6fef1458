use crate::flows::{run_flow, GroceryListFlow, GroceryListInput};
use crate::middleware::AuthUser;
use crate::models::{GroceryList, Meal};
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde::Deserialize;
use service_core::error::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateGroceryRequest {
    /// Defaults to the meals of the caller's wellness plan.
    #[serde(default)]
    pub meals: Option<Vec<Meal>>,
}

/// Build a grocery list from the plan's meals and store it, replacing the
/// previous list.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.user_id()))]
pub async fn generate_grocery_list(
    State(state): State<AppState>,
    user: AuthUser,
    req: Option<Json<GenerateGroceryRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let snapshot = state
        .plan_contexts
        .get(user.user_id())
        .await?
        .snapshot()
        .await;

    let meals = match req.meals {
        Some(meals) => meals,
        None => snapshot
            .wellness_plan
            .map(|plan| plan.meals)
            .ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!(
                    "Generate a wellness plan before creating a grocery list"
                ))
            })?,
    };

    let input = GroceryListInput {
        meals,
        diet_preferences: snapshot.onboarding.as_ref().map(|o| o.diet_preferences.clone()),
        budget: snapshot.onboarding.as_ref().map(|o| o.budget.clone()),
    };
    let output = run_flow::<GroceryListFlow>(state.text_provider.as_ref(), &input).await?;

    let list = GroceryList {
        user_id: user.user_id().to_string(),
        items: output.items,
        generated_at: Utc::now(),
    };
    state.db.save_grocery_list(&list).await?;

    tracing::info!(items = list.items.len(), "Grocery list generated");
    Ok(Json(list))
}

#[axum::debug_handler]
pub async fn get_grocery_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let list = state
        .db
        .find_grocery_list(user.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No grocery list yet")))?;
    Ok(Json(list))
}
