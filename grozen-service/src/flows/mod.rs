//! Prompt flows.
//!
//! A flow is a typed wrapper around one model prompt: a validated input, a
//! prompt template, a JSON response schema and a validated output. Flows are
//! stateless; callers own persistence.

pub mod daily_timetable;
pub mod face_validation;
pub mod grocery_list;
pub mod mood_feedback;
pub mod share_image;
pub mod wellness_plan;

pub use daily_timetable::{DailyTimetable, DailyTimetableInput, DailyTimetableOutput};
pub use face_validation::{validate_face, FaceValidation, FaceValidationInput, FaceValidationOutput};
pub use grocery_list::{GroceryListFlow, GroceryListInput, GroceryListOutput};
pub use mood_feedback::{MoodFeedback, MoodFeedbackInput, MoodFeedbackOutput};
pub use share_image::{generate_share_image, ShareImageInput, ShareImageOutput};
pub use wellness_plan::WellnessPlanFlow;

use crate::services::metrics;
use crate::services::providers::{GenerationParams, MediaPart, ProviderError, TextProvider};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use std::time::Instant;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationErrors),

    #[error("AI request failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("The AI returned an empty response")]
    EmptyResponse,

    #[error("The AI returned a response that is not valid JSON: {0}")]
    MalformedOutput(String),

    #[error("The AI response is missing required fields: {0}")]
    InvalidOutput(ValidationErrors),
}

impl FlowError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::InvalidInput(_) => "invalid_input",
            FlowError::Provider(_) => "provider_error",
            FlowError::EmptyResponse => "empty",
            FlowError::MalformedOutput(_) => "malformed",
            FlowError::InvalidOutput(_) => "invalid_output",
        }
    }

    /// Message safe to show end users. Provider and parser detail stays in
    /// the logs.
    pub fn user_message(&self) -> String {
        match self {
            FlowError::InvalidInput(errors) => format!("Invalid input: {}", errors),
            FlowError::Provider(ProviderError::ContentFiltered) => {
                "The request was blocked by the AI safety filters".to_string()
            }
            FlowError::Provider(ProviderError::RateLimited) => {
                "The AI service is busy, please try again shortly".to_string()
            }
            FlowError::Provider(_) => "The AI service is unavailable".to_string(),
            FlowError::EmptyResponse
            | FlowError::MalformedOutput(_)
            | FlowError::InvalidOutput(_) => {
                "The AI service returned an unusable response, please try again".to_string()
            }
        }
    }
}

impl From<FlowError> for AppError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::InvalidInput(errors) => AppError::ValidationError(errors),
            FlowError::Provider(ProviderError::ContentFiltered) => {
                AppError::BadRequest(anyhow::anyhow!(err.user_message()))
            }
            FlowError::Provider(ProviderError::RateLimited) => {
                AppError::TooManyRequests(err.user_message(), None)
            }
            other => {
                tracing::error!(error = %other, kind = other.kind(), "AI flow failed");
                AppError::BadGateway(other.user_message())
            }
        }
    }
}

/// One prompt template with its typed contract.
pub trait Flow {
    /// Stable name used for logging, metrics and mock fixtures.
    const NAME: &'static str;

    type Input: Validate + Send + Sync;
    type Output: DeserializeOwned + Validate + Send;

    fn prompt(input: &Self::Input) -> String;

    /// JSON schema the model is asked to answer with.
    fn output_schema() -> serde_json::Value;

    fn media(_input: &Self::Input) -> Result<Vec<MediaPart>, FlowError> {
        Ok(Vec::new())
    }

    fn temperature() -> f32 {
        0.7
    }

    /// Post-parse fixups (generated ids, ordering, trimming).
    fn finalize(_output: &mut Self::Output) {}
}

/// Run `F` against `provider`.
#[tracing::instrument(skip(provider, input), fields(flow = F::NAME, provider = provider.name()))]
pub async fn run_flow<F: Flow>(
    provider: &dyn TextProvider,
    input: &F::Input,
) -> Result<F::Output, FlowError> {
    let started = Instant::now();
    let result = execute::<F>(provider, input).await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::record_flow_run(F::NAME, outcome, started.elapsed().as_secs_f64());

    match &result {
        Ok(_) => tracing::info!(
            duration_ms = started.elapsed().as_millis() as u64,
            "Flow completed"
        ),
        Err(e) => tracing::warn!(error = %e, kind = e.kind(), "Flow failed"),
    }

    result
}

async fn execute<F: Flow>(
    provider: &dyn TextProvider,
    input: &F::Input,
) -> Result<F::Output, FlowError> {
    input.validate()?;

    let prompt = F::prompt(input);
    let media = F::media(input)?;
    let params = GenerationParams {
        flow: Some(F::NAME),
        temperature: Some(F::temperature()),
        output_schema: Some(F::output_schema()),
        ..Default::default()
    };

    let call_started = Instant::now();
    let response = provider.generate(&prompt, &media, &params).await;
    metrics::record_provider_latency(
        provider.name(),
        provider.model(),
        call_started.elapsed().as_secs_f64(),
    );

    let response = response.inspect_err(|e| {
        metrics::record_provider_error(provider.name(), e.kind());
    })?;

    metrics::record_tokens(
        F::NAME,
        provider.model(),
        response.input_tokens,
        response.output_tokens,
    );
    tracing::debug!(
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        finish_reason = response.finish_reason.as_str(),
        "Model responded"
    );

    let text = response
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or(FlowError::EmptyResponse)?;

    let mut output: F::Output = serde_json::from_str(extract_json(&text))
        .map_err(|e| FlowError::MalformedOutput(e.to_string()))?;

    F::finalize(&mut output);
    output.validate().map_err(FlowError::InvalidOutput)?;

    Ok(output)
}

/// Strip Markdown code fences and any prose around the top-level JSON value.
pub fn extract_json(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string ("json") up to the first newline.
        body = rest.split_once('\n').map_or("", |(_, tail)| tail);
        body = body.trim_end();
        body = body.strip_suffix("```").unwrap_or(body).trim();
    }

    if body.starts_with('{') || body.starts_with('[') {
        return body;
    }

    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn extracts_fenced_json() {
        let text = "```json\n{\"feedback\": \"hi\"}\n```";
        assert_eq!(extract_json(text), "{\"feedback\": \"hi\"}");
    }

    #[test]
    fn extracts_json_surrounded_by_prose() {
        let text = "Sure! Here it is: {\"a\": 1} Hope that helps.";
        assert_eq!(extract_json(text), "{\"a\": 1}");
    }

    #[test]
    fn plain_json_is_untouched() {
        assert_eq!(extract_json("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn safety_filter_maps_to_bad_request() {
        let err: AppError = FlowError::Provider(ProviderError::ContentFiltered).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn model_failures_map_to_bad_gateway() {
        for err in [
            FlowError::EmptyResponse,
            FlowError::MalformedOutput("eof".to_string()),
            FlowError::Provider(ProviderError::NetworkError("reset".to_string())),
        ] {
            let app: AppError = err.into();
            assert_eq!(app.into_response().status(), StatusCode::BAD_GATEWAY);
        }
    }

    #[tokio::test]
    async fn provider_detail_stays_out_of_response_body() {
        let err = FlowError::Provider(ProviderError::NetworkError(
            "error sending request for url (https://ai.example/models?key=SECRET_KEY_123)"
                .to_string(),
        ));
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("The AI service is unavailable"));
        assert!(!body.contains("SECRET_KEY_123"));
        assert!(!body.contains("ai.example"));
    }

    #[test]
    fn rate_limit_maps_to_429() {
        let err: AppError = FlowError::Provider(ProviderError::RateLimited).into();
        assert_eq!(err.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
