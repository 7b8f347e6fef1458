use crate::middleware::AuthUser;
use crate::models::OnboardingData;
use crate::services::plan_context::{Notice, PlanContextError, PlanSnapshot};
use crate::startup::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use service_core::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanResponse {
    pub state: PlanSnapshot,
    pub notice: Notice,
}

#[axum::debug_handler]
pub async fn get_plan(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.plan_contexts.get(user.user_id()).await?;
    Ok(Json(ctx.snapshot().await))
}

#[tracing::instrument(skip(state, user, data), fields(user_id = %user.user_id()))]
pub async fn complete_onboarding(
    State(state): State<AppState>,
    user: AuthUser,
    Json(data): Json<OnboardingData>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.plan_contexts.get(user.user_id()).await?;
    ctx.complete_onboarding(data).await?;
    Ok(Json(ctx.snapshot().await))
}

/// Generate a wellness plan. The body always carries the context state and a
/// notice; the status reflects the outcome.
#[tracing::instrument(skip(state, user), fields(user_id = %user.user_id()))]
pub async fn generate_plan(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    let ctx = state.plan_contexts.get(user.user_id()).await?;

    match ctx.generate_plan(state.text_provider.as_ref()).await {
        Ok((_, notice)) => {
            let body = GeneratePlanResponse {
                state: ctx.snapshot().await,
                notice,
            };
            Ok((StatusCode::OK, Json(body)).into_response())
        }
        Err(PlanContextError::Generation { source, notice }) => {
            let status = AppError::from(source).into_response().status();
            let body = GeneratePlanResponse {
                state: ctx.snapshot().await,
                notice,
            };
            Ok((status, Json(body)).into_response())
        }
        Err(other) => Err(other.into()),
    }
}

/// Start over: forget onboarding answers and the plan.
#[tracing::instrument(skip(state, user), fields(user_id = %user.user_id()))]
pub async fn clear_plan(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.plan_contexts.get(user.user_id()).await?;
    ctx.clear_plan().await?;
    Ok(StatusCode::NO_CONTENT)
}
