use crate::flows::{generate_share_image, ShareImageInput};
use crate::middleware::AuthUser;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

#[tracing::instrument(skip(state, user, input), fields(user_id = %user.user_id()))]
pub async fn create_share_image(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ShareImageInput>,
) -> Result<impl IntoResponse, AppError> {
    let output = generate_share_image(state.image_provider.as_ref(), &input).await?;
    Ok(Json(output))
}
