use crate::flows::{run_flow, DailyTimetable, DailyTimetableInput};
use crate::middleware::AuthUser;
use crate::models::validation::validate_calendar_date;
use crate::models::DailyPlan;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

fn check_date(date: &str) -> Result<(), AppError> {
    validate_calendar_date(date).map_err(|_| {
        AppError::BadRequest(anyhow::anyhow!("Date must be in YYYY-MM-DD format"))
    })
}

/// Generate the timetable for a day, replacing any earlier one for that date.
#[tracing::instrument(skip(state, user, input), fields(user_id = %user.user_id(), date = %input.date))]
pub async fn generate_schedule(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<DailyTimetableInput>,
) -> Result<impl IntoResponse, AppError> {
    let output = run_flow::<DailyTimetable>(state.text_provider.as_ref(), &input).await?;

    let now = Utc::now();
    let plan = DailyPlan {
        user_id: user.user_id().to_string(),
        date: input.date,
        scheduled_quests: output.scheduled_quests,
        breaks: output.breaks,
        summary: output.summary,
        created_at: now,
        updated_at: now,
    };
    state.db.save_daily_plan(&plan).await?;

    tracing::info!(quests = plan.scheduled_quests.len(), "Daily schedule generated");
    Ok(Json(plan))
}

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<AppState>,
    user: AuthUser,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    check_date(&date)?;
    let plan = state
        .db
        .find_daily_plan(user.user_id(), &date)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No schedule for {}", date)))?;
    Ok(Json(plan))
}

/// Complete a quest and award its xp once.
#[tracing::instrument(skip(state, user), fields(user_id = %user.user_id()))]
pub async fn complete_quest(
    State(state): State<AppState>,
    user: AuthUser,
    Path((date, quest_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    check_date(&date)?;

    // The xp lands on the profile, so make sure there is one.
    let claims = &user.0;
    if state.db.find_user(&claims.sub).await?.is_none() {
        state
            .db
            .upsert_user(
                &claims.sub,
                &claims.email,
                &claims.display_name(),
                claims.picture.as_deref(),
            )
            .await?;
    }

    let completion = state
        .db
        .complete_quest(user.user_id(), &date, &quest_id)
        .await?;
    Ok(Json(completion))
}
