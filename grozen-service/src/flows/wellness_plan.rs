//! Onboarding answers in, a week of meals, exercise and mindfulness out.

use super::Flow;
use crate::models::{OnboardingData, WellnessPlan};
use serde_json::json;

pub struct WellnessPlanFlow;

impl Flow for WellnessPlanFlow {
    const NAME: &'static str = "wellness_plan";

    type Input = OnboardingData;
    type Output = WellnessPlan;

    fn prompt(input: &OnboardingData) -> String {
        format!(
            "You are GroZen, a supportive wellness coach for teenagers.\n\
             Create a 7-day wellness plan for a teen with these details.\n\n\
             Goals: {goals}\n\
             Diet preferences: {diet}\n\
             Budget: {budget}\n\n\
             Include one entry per day (Monday to Sunday) in each section:\n\
             - meals: breakfast, lunch and dinner that are affordable within the budget \
             and respect the diet preferences\n\
             - exercise: an age-appropriate activity and its duration\n\
             - mindfulness: a short practice and its duration\n\n\
             Keep suggestions realistic, encouraging and safe. Do not give medical advice.\n\
             Respond only with JSON matching the provided schema.",
            goals = input.goals.trim(),
            diet = input.diet_preferences.trim(),
            budget = input.budget.trim(),
        )
    }

    fn output_schema() -> serde_json::Value {
        let daily = |fields: &[&str]| {
            let properties: serde_json::Map<String, serde_json::Value> = fields
                .iter()
                .map(|f| (f.to_string(), json!({ "type": "STRING" })))
                .collect();
            json!({
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": properties,
                    "required": fields,
                }
            })
        };

        json!({
            "type": "OBJECT",
            "properties": {
                "meals": daily(&["day", "breakfast", "lunch", "dinner"]),
                "exercise": daily(&["day", "activity", "duration"]),
                "mindfulness": daily(&["day", "practice", "duration"]),
            },
            "required": ["meals", "exercise", "mindfulness"],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::run_flow;
    use crate::flows::test_support::reply;
    use crate::flows::FlowError;
    use crate::services::providers::mock::MockTextProvider;

    fn onboarding() -> OnboardingData {
        OnboardingData {
            goals: "Sleep better and have more energy for soccer".to_string(),
            diet_preferences: "vegetarian".to_string(),
            budget: "$40 per week".to_string(),
        }
    }

    #[test]
    fn prompt_interpolates_onboarding() {
        let prompt = WellnessPlanFlow::prompt(&onboarding());
        assert!(prompt.contains("Sleep better and have more energy for soccer"));
        assert!(prompt.contains("vegetarian"));
        assert!(prompt.contains("$40 per week"));
    }

    #[tokio::test]
    async fn fixture_plan_has_every_section() {
        let provider = MockTextProvider::new(true);
        let plan = run_flow::<WellnessPlanFlow>(&provider, &onboarding())
            .await
            .unwrap();
        assert!(!plan.meals.is_empty());
        assert!(!plan.exercise.is_empty());
        assert!(!plan.mindfulness.is_empty());
    }

    #[tokio::test]
    async fn plan_missing_a_section_is_rejected() {
        let provider = MockTextProvider::scripted(vec![reply(
            r#"{"meals":[{"day":"Monday","breakfast":"Eggs","lunch":"Soup","dinner":"Pasta"}],"exercise":[],"mindfulness":[]}"#,
        )]);
        let err = run_flow::<WellnessPlanFlow>(&provider, &onboarding())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn non_json_reply_is_malformed() {
        let provider =
            MockTextProvider::scripted(vec![reply("I can't help with that right now.")]);
        let err = run_flow::<WellnessPlanFlow>(&provider, &onboarding())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn blank_goals_never_reach_the_model() {
        // Calling the disabled provider would surface as a provider error.
        let provider = MockTextProvider::new(false);
        let mut input = onboarding();
        input.goals = "  ".to_string();
        let err = run_flow::<WellnessPlanFlow>(&provider, &input)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
    }
}
