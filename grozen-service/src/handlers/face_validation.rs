use crate::flows::{validate_face, FaceValidationInput};
use crate::middleware::AuthUser;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};

/// Always 200: failures come back as `isHumanFace: false` with a reason.
#[tracing::instrument(skip(state, user, input), fields(user_id = %user.user_id()))]
pub async fn check_face(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<FaceValidationInput>,
) -> impl IntoResponse {
    Json(validate_face(state.text_provider.as_ref(), &input).await)
}
