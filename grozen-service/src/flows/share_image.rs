//! Shareable mood card image.
//!
//! Uses the image model, so it sits beside the JSON flows rather than going
//! through [`run_flow`](super::run_flow), but reports the same errors and metrics.

use super::FlowError;
use crate::models::validation::validate_not_blank;
use crate::services::metrics;
use crate::services::providers::{GenerationParams, ImageProvider};
use crate::utils::to_data_uri;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

const FLOW_NAME: &str = "share_image";
const DEFAULT_STYLE: &str = "bright, friendly flat illustration";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShareImageInput {
    #[validate(
        length(min = 1, max = 32, message = "Mood must be 1-32 characters"),
        custom(function = "validate_not_blank")
    )]
    pub mood: String,

    #[validate(length(max = 500))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[validate(length(max = 100))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareImageOutput {
    pub image_data_uri: String,
}

fn prompt(input: &ShareImageInput) -> String {
    let style = input
        .style
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_STYLE);

    let mut prompt = format!(
        "Create a square, uplifting image a teenager could share with friends to express \
         today's mood: {}.\nStyle: {}.\n",
        input.mood.trim(),
        style
    );
    if let Some(notes) = input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        prompt.push_str(&format!("Theme it loosely around: {}.\n", notes));
    }
    prompt.push_str(
        "No text, no real people, no logos. Keep it positive and safe for all ages.",
    );
    prompt
}

/// Generate a share image and return it as a data URI.
#[tracing::instrument(skip(provider, input), fields(flow = FLOW_NAME, provider = provider.name()))]
pub async fn generate_share_image(
    provider: &dyn ImageProvider,
    input: &ShareImageInput,
) -> Result<ShareImageOutput, FlowError> {
    let started = Instant::now();
    let result = execute(provider, input).await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::record_flow_run(FLOW_NAME, outcome, started.elapsed().as_secs_f64());
    if let Err(e) = &result {
        tracing::warn!(error = %e, kind = e.kind(), "Flow failed");
    }

    result
}

async fn execute(
    provider: &dyn ImageProvider,
    input: &ShareImageInput,
) -> Result<ShareImageOutput, FlowError> {
    input.validate()?;

    let params = GenerationParams {
        flow: Some(FLOW_NAME),
        temperature: Some(1.0),
        ..Default::default()
    };

    let call_started = Instant::now();
    let response = provider.generate(&prompt(input), &params).await;
    metrics::record_provider_latency(
        provider.name(),
        provider.model(),
        call_started.elapsed().as_secs_f64(),
    );
    let response = response.inspect_err(|e| {
        metrics::record_provider_error(provider.name(), e.kind());
    })?;

    metrics::record_tokens(
        FLOW_NAME,
        provider.model(),
        response.input_tokens,
        response.output_tokens,
    );

    let image = response
        .image
        .filter(|img| !img.data.is_empty())
        .ok_or(FlowError::EmptyResponse)?;

    tracing::info!(
        mime_type = %image.mime_type,
        bytes = image.data.len(),
        "Share image generated"
    );

    Ok(ShareImageOutput {
        image_data_uri: to_data_uri(&image.mime_type, &image.data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::MockImageProvider;
    use crate::services::providers::{ProviderError, ProviderResponse};
    use crate::utils::parse_data_uri;

    fn happy() -> ShareImageInput {
        ShareImageInput {
            mood: "😊".to_string(),
            notes: Some("aced my chemistry test".to_string()),
            style: None,
        }
    }

    #[tokio::test]
    async fn returns_png_data_uri() {
        let provider = MockImageProvider::new(true);
        let output = generate_share_image(&provider, &happy()).await.unwrap();
        let media = parse_data_uri(&output.image_data_uri).unwrap();
        assert_eq!(media.mime_type, "image/png");
    }

    #[tokio::test]
    async fn text_only_reply_is_empty_response() {
        let provider =
            MockImageProvider::scripted(vec![Ok(ProviderResponse::text("I drew a sun!"))]);
        let err = generate_share_image(&provider, &happy()).await.unwrap_err();
        assert!(matches!(err, FlowError::EmptyResponse));
    }

    #[tokio::test]
    async fn safety_block_is_surfaced() {
        let provider = MockImageProvider::scripted(vec![Err(ProviderError::ContentFiltered)]);
        let err = generate_share_image(&provider, &happy()).await.unwrap_err();
        assert!(matches!(err, FlowError::Provider(ProviderError::ContentFiltered)));
    }

    #[test]
    fn prompt_falls_back_to_default_style() {
        let text = prompt(&happy());
        assert!(text.contains(DEFAULT_STYLE));
        assert!(text.contains("aced my chemistry test"));
    }
}
