//! Short, supportive reply to a mood check-in.

use super::Flow;
use crate::models::validation::validate_not_blank;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MoodFeedbackInput {
    /// Emoji or short label.
    #[validate(
        length(min = 1, max = 32, message = "Mood must be 1-32 characters"),
        custom(function = "validate_not_blank")
    )]
    pub mood: String,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MoodFeedbackOutput {
    #[validate(
        length(min = 1, message = "Feedback is required"),
        custom(function = "validate_not_blank")
    )]
    pub feedback: String,
}

pub struct MoodFeedback;

impl Flow for MoodFeedback {
    const NAME: &'static str = "mood_feedback";

    type Input = MoodFeedbackInput;
    type Output = MoodFeedbackOutput;

    fn prompt(input: &MoodFeedbackInput) -> String {
        let notes = input
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("(no notes)");

        format!(
            "You are GroZen, a kind and encouraging wellness buddy for teenagers.\n\
             A teen just logged their mood.\n\n\
             Mood: {mood}\n\
             Notes: {notes}\n\n\
             Reply with one or two short sentences of warm, non-judgmental feedback. \
             Acknowledge how they feel and suggest one small, practical thing they could do. \
             If they mention self-harm or being unsafe, gently encourage them to reach out \
             to a trusted adult or a local helpline.\n\
             Respond only with JSON matching the provided schema.",
            mood = input.mood.trim(),
        )
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "feedback": { "type": "STRING" }
            },
            "required": ["feedback"],
        })
    }

    fn finalize(output: &mut MoodFeedbackOutput) {
        output.feedback = output.feedback.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::test_support::reply;
    use crate::flows::{run_flow, FlowError};
    use crate::services::providers::mock::MockTextProvider;
    use crate::services::providers::ProviderError;

    fn stressed() -> MoodFeedbackInput {
        MoodFeedbackInput {
            mood: "😞".to_string(),
            notes: Some("stressed about work".to_string()),
        }
    }

    #[tokio::test]
    async fn feedback_is_non_empty() {
        let provider = MockTextProvider::new(true);
        let output = run_flow::<MoodFeedback>(&provider, &stressed()).await.unwrap();
        assert!(!output.feedback.is_empty());
    }

    #[tokio::test]
    async fn fenced_reply_is_accepted_and_trimmed() {
        let provider = MockTextProvider::scripted(vec![reply(
            "```json\n{\"feedback\": \"  Work stress is real. Try a 5 minute walk.  \"}\n```",
        )]);
        let output = run_flow::<MoodFeedback>(&provider, &stressed()).await.unwrap();
        assert_eq!(output.feedback, "Work stress is real. Try a 5 minute walk.");
    }

    #[tokio::test]
    async fn whitespace_feedback_is_invalid() {
        let provider = MockTextProvider::scripted(vec![reply(r#"{"feedback": "   "}"#)]);
        let err = run_flow::<MoodFeedback>(&provider, &stressed())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn empty_reply_is_reported() {
        let provider = MockTextProvider::scripted(vec![reply("")]);
        let err = run_flow::<MoodFeedback>(&provider, &stressed())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::EmptyResponse));
    }

    #[tokio::test]
    async fn safety_block_is_surfaced() {
        let provider = MockTextProvider::scripted(vec![Err(ProviderError::ContentFiltered)]);
        let err = run_flow::<MoodFeedback>(&provider, &stressed())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Provider(ProviderError::ContentFiltered)));
    }

    #[test]
    fn prompt_marks_missing_notes() {
        let prompt = MoodFeedback::prompt(&MoodFeedbackInput {
            mood: "😊".to_string(),
            notes: None,
        });
        assert!(prompt.contains("Mood: 😊"));
        assert!(prompt.contains("(no notes)"));
    }
}
