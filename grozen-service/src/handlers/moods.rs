use crate::flows::{run_flow, validate_face, FaceValidationInput, MoodFeedback, MoodFeedbackInput};
use crate::middleware::AuthUser;
use crate::models::validation::validate_image_data_uri;
use crate::models::MoodLog;
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

const DEFAULT_LIMIT: i64 = 30;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogMoodRequest {
    #[validate(nested)]
    #[serde(flatten)]
    pub entry: MoodFeedbackInput,

    #[validate(custom(function = "validate_image_data_uri"))]
    pub selfie_data_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// Log a mood. A selfie, when attached, must show a face; the AI feedback
/// is stored with the log.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.user_id(), has_selfie))]
pub async fn log_mood(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<LogMoodRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    tracing::Span::current().record("has_selfie", req.selfie_data_uri.is_some());

    if let Some(selfie) = &req.selfie_data_uri {
        let check = validate_face(
            state.text_provider.as_ref(),
            &FaceValidationInput {
                photo_data_uri: selfie.clone(),
            },
        )
        .await;
        if !check.is_human_face {
            tracing::info!(reason = %check.reason, "Selfie rejected");
            return Err(AppError::BadRequest(anyhow::anyhow!(check.reason)));
        }
    }

    let feedback = run_flow::<MoodFeedback>(state.text_provider.as_ref(), &req.entry).await?;

    let log = MoodLog::new(
        user.user_id().to_string(),
        req.entry.mood,
        req.entry.notes,
        req.selfie_data_uri,
        feedback.feedback,
    );
    state.db.insert_mood_log(&log).await?;

    tracing::info!(log_id = %log.id, "Mood logged");
    Ok((StatusCode::CREATED, Json(log)))
}

/// The caller's mood logs, newest first.
#[axum::debug_handler]
pub async fn list_moods(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let logs = state.db.list_mood_logs(user.user_id(), Some(limit)).await?;
    Ok(Json(logs))
}
