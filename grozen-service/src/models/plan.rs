//! Onboarding data and the generated wellness plan.

use super::validation::validate_not_blank;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// What the user told us during onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingData {
    #[validate(
        length(min = 1, max = 1000, message = "Goals must be 1-1000 characters"),
        custom(function = "validate_not_blank")
    )]
    pub goals: String,

    #[validate(
        length(min = 1, max = 500, message = "Diet preferences must be 1-500 characters"),
        custom(function = "validate_not_blank")
    )]
    pub diet_preferences: String,

    #[validate(
        length(min = 1, max = 100, message = "Budget must be 1-100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub budget: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    #[validate(length(min = 1, message = "Day is required"))]
    pub day: String,
    #[validate(length(min = 1, message = "Breakfast is required"))]
    pub breakfast: String,
    #[validate(length(min = 1, message = "Lunch is required"))]
    pub lunch: String,
    #[validate(length(min = 1, message = "Dinner is required"))]
    pub dinner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[validate(length(min = 1, message = "Day is required"))]
    pub day: String,
    #[validate(length(min = 1, message = "Activity is required"))]
    pub activity: String,
    #[validate(length(min = 1, message = "Duration is required"))]
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Mindfulness {
    #[validate(length(min = 1, message = "Day is required"))]
    pub day: String,
    #[validate(length(min = 1, message = "Practice is required"))]
    pub practice: String,
    #[validate(length(min = 1, message = "Duration is required"))]
    pub duration: String,
}

/// A week of meals, exercise and mindfulness. Replaced wholesale on regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WellnessPlan {
    #[validate(length(min = 1, message = "Plan must contain meals"), nested)]
    pub meals: Vec<Meal>,
    #[validate(length(min = 1, message = "Plan must contain exercise"), nested)]
    pub exercise: Vec<Exercise>,
    #[validate(length(min = 1, message = "Plan must contain mindfulness"), nested)]
    pub mindfulness: Vec<Mindfulness>,
}

/// Persisted plan context for one user. One document per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPlan {
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding: Option<OnboardingData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wellness_plan: Option<WellnessPlan>,

    /// Message of the last failed generation, cleared on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl StoredPlan {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            onboarding: None,
            wellness_plan: None,
            last_error: None,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal() -> Meal {
        Meal {
            day: "Monday".to_string(),
            breakfast: "Oatmeal".to_string(),
            lunch: "Salad".to_string(),
            dinner: "Chicken and rice".to_string(),
        }
    }

    #[test]
    fn onboarding_rejects_blank_goals() {
        let data = OnboardingData {
            goals: "   ".to_string(),
            diet_preferences: "vegetarian".to_string(),
            budget: "$50/week".to_string(),
        };
        let errors = data.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("goals"));
    }

    #[test]
    fn plan_requires_every_section() {
        let plan = WellnessPlan {
            meals: vec![meal()],
            exercise: vec![],
            mindfulness: vec![],
        };
        let errors = plan.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("exercise"));
        assert!(fields.contains_key("mindfulness"));
        assert!(!fields.contains_key("meals"));
    }

    #[test]
    fn plan_validates_nested_entries() {
        let mut bad = meal();
        bad.dinner = String::new();
        let plan = WellnessPlan {
            meals: vec![bad],
            exercise: vec![Exercise {
                day: "Monday".to_string(),
                activity: "Walk".to_string(),
                duration: "30 minutes".to_string(),
            }],
            mindfulness: vec![Mindfulness {
                day: "Monday".to_string(),
                practice: "Breathing".to_string(),
                duration: "5 minutes".to_string(),
            }],
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let data = OnboardingData {
            goals: "Sleep better".to_string(),
            diet_preferences: "none".to_string(),
            budget: "low".to_string(),
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["dietPreferences"], "none");
    }
}
