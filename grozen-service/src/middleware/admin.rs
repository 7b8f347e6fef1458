use super::auth::Claims;
use crate::startup::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

/// Requires an authenticated admin. Must run inside [`super::auth_middleware`].
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = request.extensions().get::<Claims>().ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
    })?;
    let is_admin = claims.admin || state.config.auth.is_admin_email(&claims.email);
    let user_id = claims.sub.clone();

    if is_admin {
        return Ok(next.run(request).await);
    }

    tracing::warn!(user_id = %user_id, "Non-admin attempted admin access");
    Err(AppError::Forbidden(anyhow::anyhow!("Admin access required")))
}
