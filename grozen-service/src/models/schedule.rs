//! Gamified daily timetable: quests and breaks.

use super::validation::{validate_calendar_date, validate_clock_time};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestCategory {
    Study,
    Fitness,
    Wellness,
    Chores,
    Social,
    Creative,
    /// Also absorbs categories the model invents.
    #[serde(other)]
    Personal,
}

impl QuestCategory {
    pub const ALL: [&'static str; 7] = [
        "study", "fitness", "wellness", "chores", "social", "creative", "personal",
    ];
}

/// A time-boxed task worth some XP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledQuest {
    /// Filled in after generation when the model omits it.
    #[serde(default)]
    pub id: String,

    #[validate(length(min = 1, max = 120, message = "Quest title must be 1-120 characters"))]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[validate(custom(function = "validate_clock_time"))]
    pub start_time: String,

    #[validate(custom(function = "validate_clock_time"))]
    pub end_time: String,

    #[validate(range(min = 5, max = 100, message = "Quest XP must be between 5 and 100"))]
    pub xp: i32,

    pub category: QuestCategory,

    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BreakSlot {
    #[serde(default)]
    pub id: String,

    #[validate(custom(function = "validate_clock_time"))]
    pub start_time: String,

    #[validate(custom(function = "validate_clock_time"))]
    pub end_time: String,

    #[validate(length(min = 1, message = "Break suggestion is required"))]
    pub suggestion: String,
}

/// Stored timetable for one user and day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    pub user_id: String,

    #[validate(custom(function = "validate_calendar_date"))]
    pub date: String,

    #[validate(nested)]
    pub scheduled_quests: Vec<ScheduledQuest>,

    #[validate(nested)]
    pub breaks: Vec<BreakSlot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl DailyPlan {
    pub fn quest(&self, quest_id: &str) -> Option<&ScheduledQuest> {
        self.scheduled_quests.iter().find(|q| q.id == quest_id)
    }

    pub fn earned_xp(&self) -> i32 {
        self.scheduled_quests
            .iter()
            .filter(|q| q.completed)
            .map(|q| q.xp)
            .sum()
    }
}

/// Result of completing a quest. `awarded_xp` is zero when it was already done.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestCompletion {
    pub daily_plan: DailyPlan,
    pub awarded_xp: i32,
    pub total_xp: i64,
    pub level: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_category_falls_back_to_personal() {
        let quest: ScheduledQuest = serde_json::from_str(
            r#"{"title":"Call grandma","startTime":"19:00","endTime":"19:20","xp":10,"category":"family"}"#,
        )
        .unwrap();
        assert_eq!(quest.category, QuestCategory::Personal);
        assert!(!quest.completed);
        assert!(quest.id.is_empty());
    }

    #[test]
    fn quest_xp_is_range_checked() {
        let quest = ScheduledQuest {
            id: "q1".to_string(),
            title: "Read".to_string(),
            description: None,
            start_time: "20:00".to_string(),
            end_time: "20:30".to_string(),
            xp: 500,
            category: QuestCategory::Study,
            completed: false,
        };
        assert!(quest.validate().is_err());
    }

    #[test]
    fn earned_xp_counts_completed_quests() {
        let quest = |id: &str, xp: i32, completed: bool| ScheduledQuest {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            start_time: "08:00".to_string(),
            end_time: "08:30".to_string(),
            xp,
            category: QuestCategory::Chores,
            completed,
        };
        let plan = DailyPlan {
            user_id: "u1".to_string(),
            date: "2024-05-01".to_string(),
            scheduled_quests: vec![
                quest("a", 10, true),
                quest("b", 20, false),
                quest("c", 15, true),
            ],
            breaks: vec![],
            summary: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(plan.earned_xp(), 25);
        assert_eq!(plan.quest("b").map(|q| q.xp), Some(20));
        assert!(plan.quest("zzz").is_none());
    }
}
