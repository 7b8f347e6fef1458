//! Checks that a mood selfie actually shows a human face.
//!
//! Unlike the other flows this one never fails: any error becomes a negative
//! result whose `reason` explains what went wrong, so the caller can always
//! show it to the user.

use super::{run_flow, Flow, FlowError};
use crate::models::validation::validate_image_data_uri;
use crate::services::providers::{MediaPart, TextProvider};
use crate::utils::parse_data_uri;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FaceValidationInput {
    #[validate(custom(function = "validate_image_data_uri"))]
    pub photo_data_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FaceValidationOutput {
    pub is_human_face: bool,

    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
}

impl FaceValidationOutput {
    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_human_face: false,
            reason: reason.into(),
        }
    }
}

pub struct FaceValidation;

impl Flow for FaceValidation {
    const NAME: &'static str = "face_validation";

    type Input = FaceValidationInput;
    type Output = FaceValidationOutput;

    fn prompt(_input: &FaceValidationInput) -> String {
        "You are an image checker for a teen wellness app's mood selfie feature.\n\
         Look at the attached photo and decide whether it clearly shows a real human face.\n\
         Answer false for drawings, cartoons, animals, objects, screenshots, \
         empty scenes or photos where no face is visible.\n\
         Give a short, friendly reason the user can read.\n\
         Respond only with JSON matching the provided schema."
            .to_string()
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "isHumanFace": { "type": "BOOLEAN" },
                "reason": { "type": "STRING" }
            },
            "required": ["isHumanFace", "reason"],
        })
    }

    fn media(input: &FaceValidationInput) -> Result<Vec<MediaPart>, FlowError> {
        let media = parse_data_uri(&input.photo_data_uri).map_err(|_| {
            let mut errors = ValidationErrors::new();
            errors.add("photoDataUri", ValidationError::new("data_uri"));
            FlowError::InvalidInput(errors)
        })?;
        Ok(vec![media])
    }

    fn temperature() -> f32 {
        0.0
    }
}

/// Run face validation, folding every failure into a negative result.
pub async fn validate_face(
    provider: &dyn TextProvider,
    input: &FaceValidationInput,
) -> FaceValidationOutput {
    match run_flow::<FaceValidation>(provider, input).await {
        Ok(output) => output,
        Err(FlowError::InvalidInput(_)) => FaceValidationOutput::rejected(
            "The photo could not be read. Please upload a JPEG or PNG selfie.",
        ),
        Err(e) => {
            tracing::warn!(error = %e, kind = e.kind(), "Face validation fell back to rejection");
            FaceValidationOutput::rejected(format!(
                "Face validation failed: {}. Please try again.",
                e.user_message()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::test_support::reply;
    use crate::services::providers::mock::MockTextProvider;
    use crate::services::providers::ProviderError;

    fn selfie() -> FaceValidationInput {
        FaceValidationInput {
            photo_data_uri: "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQ==".to_string(),
        }
    }

    #[tokio::test]
    async fn face_is_accepted() {
        let provider = MockTextProvider::new(true);
        let output = validate_face(&provider, &selfie()).await;
        assert!(output.is_human_face);
        assert!(!output.reason.is_empty());
    }

    #[tokio::test]
    async fn non_face_is_reported_with_reason() {
        let provider = MockTextProvider::scripted(vec![reply(
            r#"{"isHumanFace": false, "reason": "This looks like a cat."}"#,
        )]);
        let output = validate_face(&provider, &selfie()).await;
        assert_eq!(output, FaceValidationOutput::rejected("This looks like a cat."));
    }

    #[tokio::test]
    async fn provider_failure_becomes_negative_result() {
        let provider = MockTextProvider::scripted(vec![Err(ProviderError::NetworkError(
            "connection reset".to_string(),
        ))]);
        let output = validate_face(&provider, &selfie()).await;
        assert!(!output.is_human_face);
        assert!(output.reason.contains("The AI service is unavailable"));
        assert!(!output.reason.contains("connection reset"));
    }

    #[tokio::test]
    async fn reason_never_carries_provider_urls() {
        let provider = MockTextProvider::scripted(vec![Err(ProviderError::NetworkError(
            "error sending request for url (https://ai.example/models?key=SECRET_KEY_123)"
                .to_string(),
        ))]);
        let output = validate_face(&provider, &selfie()).await;
        assert!(!output.is_human_face);
        assert!(!output.reason.contains("SECRET_KEY_123"));
        assert!(!output.reason.contains("ai.example"));
    }

    #[tokio::test]
    async fn garbage_reply_becomes_negative_result() {
        let provider = MockTextProvider::scripted(vec![reply("yes")]);
        let output = validate_face(&provider, &selfie()).await;
        assert!(!output.is_human_face);
        assert!(!output.reason.is_empty());
    }

    #[tokio::test]
    async fn bad_data_uri_becomes_negative_result() {
        let provider = MockTextProvider::new(true);
        let input = FaceValidationInput {
            photo_data_uri: "not-a-data-uri".to_string(),
        };
        let output = validate_face(&provider, &input).await;
        assert!(!output.is_human_face);
        assert!(output.reason.contains("could not be read"));
    }
}
