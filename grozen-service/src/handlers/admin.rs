use crate::models::UserListItem;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

#[axum::debug_handler]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users: Vec<UserListItem> = state
        .db
        .list_users()
        .await?
        .into_iter()
        .map(UserListItem::from)
        .collect();
    Ok(Json(users))
}

#[tracing::instrument(skip(state))]
pub async fn get_user_detail(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state
        .db
        .full_user_detail(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User {} not found", user_id)))?;
    Ok(Json(detail))
}
