//! Mock provider implementations for testing and local development.
//!
//! By default the mock answers each flow with a canned, schema-conforming
//! fixture. Tests that need specific model behaviour (malformed JSON, safety
//! filtering, empty output) queue scripted responses instead.

use super::{
    FinishReason, GeneratedImage, GenerationParams, ImageProvider, MediaPart, ProviderError,
    ProviderResponse, TextProvider,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// 1x1 transparent PNG.
const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

type Scripted = VecDeque<Result<ProviderResponse, ProviderError>>;

/// Canned response for a flow, or `None` for unknown flows.
pub fn fixture_for(flow: &str) -> Option<&'static str> {
    let fixture = match flow {
        "wellness_plan" => {
            r#"{
  "meals": [
    {"day": "Monday", "breakfast": "Overnight oats with berries", "lunch": "Chickpea salad wrap", "dinner": "Veggie stir-fry with rice"},
    {"day": "Tuesday", "breakfast": "Greek yogurt and granola", "lunch": "Lentil soup", "dinner": "Baked salmon with potatoes"}
  ],
  "exercise": [
    {"day": "Monday", "activity": "Brisk walk", "duration": "30 minutes"},
    {"day": "Tuesday", "activity": "Bodyweight circuit", "duration": "20 minutes"}
  ],
  "mindfulness": [
    {"day": "Monday", "practice": "Box breathing", "duration": "5 minutes"},
    {"day": "Tuesday", "practice": "Gratitude journaling", "duration": "10 minutes"}
  ]
}"#
        }
        "mood_feedback" => {
            r#"{"feedback": "Thanks for checking in today. Take a slow breath and give yourself credit for noticing how you feel."}"#
        }
        "grocery_list" => {
            r#"{
  "items": [
    {"name": "Rolled oats", "category": "Pantry", "quantity": "500g"},
    {"name": "Mixed salad greens", "category": "Produce", "quantity": "1 bag"},
    {"name": "Chicken breast", "category": "Protein", "quantity": "2 pieces"},
    {"name": "Brown rice", "category": "Grains", "quantity": "1 kg", "notes": "Cook a double batch"}
  ]
}"#
        }
        "daily_timetable" => {
            r#"{
  "scheduledQuests": [
    {"title": "Math homework", "startTime": "16:00", "endTime": "17:00", "xp": 30, "category": "study"},
    {"title": "Morning stretch", "description": "Gentle full-body stretch", "startTime": "07:15", "endTime": "07:30", "xp": 10, "category": "fitness"},
    {"title": "Tidy room", "startTime": "18:00", "endTime": "18:30", "xp": 15, "category": "chores"}
  ],
  "breaks": [
    {"startTime": "17:00", "endTime": "17:15", "suggestion": "Grab water and a snack"}
  ],
  "summary": "A balanced day with focused study and short movement breaks."
}"#
        }
        "face_validation" => {
            r#"{"isHumanFace": true, "reason": "A single human face is clearly visible."}"#
        }
        _ => return None,
    };
    Some(fixture)
}

/// Mock text provider.
pub struct MockTextProvider {
    enabled: bool,
    scripted: Mutex<Scripted>,
}

impl MockTextProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            scripted: Mutex::new(VecDeque::new()),
        }
    }

    /// Provider that replays `responses` in order before falling back to fixtures.
    pub fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            enabled: true,
            scripted: Mutex::new(responses.into()),
        }
    }

    /// Queue one more scripted response.
    pub async fn push(&self, response: Result<ProviderResponse, ProviderError>) {
        self.scripted.lock().await.push_back(response);
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-text"
    }

    async fn generate(
        &self,
        prompt: &str,
        _media: &[MediaPart],
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock text provider not enabled".to_string(),
            ));
        }

        if let Some(next) = self.scripted.lock().await.pop_front() {
            return next;
        }

        let flow = params.flow.unwrap_or_default();
        let text = fixture_for(flow).ok_or_else(|| {
            ProviderError::InvalidRequest(format!("No mock fixture for flow '{}'", flow))
        })?;

        Ok(ProviderResponse {
            text: Some(text.to_string()),
            image: None,
            input_tokens: prompt.len() as i32 / 4,
            output_tokens: text.len() as i32 / 4,
            finish_reason: FinishReason::Complete,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock text provider not enabled".to_string(),
            ))
        }
    }
}

/// Mock image provider.
pub struct MockImageProvider {
    enabled: bool,
    scripted: Mutex<Scripted>,
}

impl MockImageProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            scripted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            enabled: true,
            scripted: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-image"
    }

    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock image provider not enabled".to_string(),
            ));
        }

        if let Some(next) = self.scripted.lock().await.pop_front() {
            return next;
        }

        Ok(ProviderResponse {
            text: None,
            image: Some(GeneratedImage {
                mime_type: "image/png".to_string(),
                data: PIXEL_PNG.to_vec(),
            }),
            input_tokens: prompt.len() as i32 / 4,
            output_tokens: 0,
            finish_reason: FinishReason::Complete,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock image provider not enabled".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_responses_come_before_fixtures() {
        let provider = MockTextProvider::scripted(vec![Ok(ProviderResponse::text("first"))]);
        let params = GenerationParams {
            flow: Some("mood_feedback"),
            ..Default::default()
        };

        let first = provider.generate("p", &[], &params).await.unwrap();
        assert_eq!(first.text.as_deref(), Some("first"));

        let second = provider.generate("p", &[], &params).await.unwrap();
        assert_eq!(second.text.as_deref(), fixture_for("mood_feedback"));
    }

    #[tokio::test]
    async fn unknown_flow_is_rejected() {
        let provider = MockTextProvider::new(true);
        let err = provider
            .generate("p", &[], &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn disabled_provider_fails_health_check() {
        assert!(MockTextProvider::new(false).health_check().await.is_err());
        assert!(MockImageProvider::new(false).health_check().await.is_err());
    }

    #[test]
    fn fixtures_are_valid_json() {
        for flow in [
            "wellness_plan",
            "mood_feedback",
            "grocery_list",
            "daily_timetable",
            "face_validation",
        ] {
            let raw = fixture_for(flow).unwrap();
            assert!(
                serde_json::from_str::<serde_json::Value>(raw).is_ok(),
                "fixture for {} is not JSON",
                flow
            );
        }
    }
}
