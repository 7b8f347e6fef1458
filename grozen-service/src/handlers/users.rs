use crate::middleware::AuthUser;
use crate::models::UserProfile;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use service_core::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub level: i64,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            level: profile.level(),
            profile,
        }
    }
}

/// Create or refresh the caller's profile from their token claims.
#[tracing::instrument(skip(state, user), fields(user_id = %user.user_id()))]
pub async fn sync_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let claims = &user.0;
    let profile = state
        .db
        .upsert_user(
            &claims.sub,
            &claims.email,
            &claims.display_name(),
            claims.picture.as_deref(),
        )
        .await?;

    tracing::info!("Profile synced");
    Ok((StatusCode::OK, Json(ProfileResponse::from(profile))))
}

#[axum::debug_handler]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .db
        .find_user(user.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Profile not found")))?;

    Ok(Json(ProfileResponse::from(profile)))
}
