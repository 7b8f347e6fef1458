//! Turns a free-form task list into a gamified timetable of quests and breaks.

use super::Flow;
use crate::models::validation::{validate_calendar_date, validate_clock_time, validate_not_blank};
use crate::models::{BreakSlot, QuestCategory, ScheduledQuest};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DailyTimetableInput {
    #[validate(
        length(min = 1, max = 2000, message = "Tasks must be 1-2000 characters"),
        custom(function = "validate_not_blank")
    )]
    pub tasks: String,

    #[validate(custom(function = "validate_calendar_date"))]
    pub date: String,

    #[validate(custom(function = "validate_clock_time"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_time: Option<String>,

    #[validate(custom(function = "validate_clock_time"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_time: Option<String>,

    #[validate(length(max = 1000))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DailyTimetableOutput {
    #[validate(length(min = 1, message = "Timetable has no quests"), nested)]
    pub scheduled_quests: Vec<ScheduledQuest>,

    #[validate(nested)]
    #[serde(default)]
    pub breaks: Vec<BreakSlot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

pub struct DailyTimetable;

impl Flow for DailyTimetable {
    const NAME: &'static str = "daily_timetable";

    type Input = DailyTimetableInput;
    type Output = DailyTimetableOutput;

    fn prompt(input: &DailyTimetableInput) -> String {
        let wake = input.wake_time.as_deref().unwrap_or("07:00");
        let sleep = input.sleep_time.as_deref().unwrap_or("22:00");
        let goals = input
            .goals
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or("(none given)");

        format!(
            "You are GroZen, a friendly productivity coach who turns a teenager's day into a game.\n\
             Plan the day {date} between {wake} and {sleep}.\n\n\
             Things to get done:\n{tasks}\n\n\
             Wellness goals: {goals}\n\n\
             Turn each task into a quest with a short motivating title, a start and end time \
             in 24-hour HH:MM format, an xp reward between 5 and 100 that reflects effort, \
             and one category from: {categories}.\n\
             Add short breaks between demanding quests with a suggestion for each \
             (stretching, water, a walk). Keep quests inside the waking hours and avoid overlaps.\n\
             Finish with a one-sentence summary of the day.\n\
             Respond only with JSON matching the provided schema.",
            date = input.date,
            tasks = input.tasks.trim(),
            categories = QuestCategory::ALL.join(", "),
        )
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "scheduledQuests": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "title": { "type": "STRING" },
                            "description": { "type": "STRING" },
                            "startTime": { "type": "STRING" },
                            "endTime": { "type": "STRING" },
                            "xp": { "type": "INTEGER" },
                            "category": { "type": "STRING", "enum": QuestCategory::ALL }
                        },
                        "required": ["title", "startTime", "endTime", "xp", "category"],
                    }
                },
                "breaks": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "startTime": { "type": "STRING" },
                            "endTime": { "type": "STRING" },
                            "suggestion": { "type": "STRING" }
                        },
                        "required": ["startTime", "endTime", "suggestion"],
                    }
                },
                "summary": { "type": "STRING" }
            },
            "required": ["scheduledQuests", "breaks"],
        })
    }

    fn temperature() -> f32 {
        0.5
    }

    /// Ids are generated here, quests start uncompleted and both lists are
    /// ordered by start time. Overlaps are left alone.
    fn finalize(output: &mut DailyTimetableOutput) {
        for quest in &mut output.scheduled_quests {
            if quest.id.is_empty() {
                quest.id = uuid::Uuid::new_v4().to_string();
            }
            quest.completed = false;
        }
        for slot in &mut output.breaks {
            if slot.id.is_empty() {
                slot.id = uuid::Uuid::new_v4().to_string();
            }
        }
        // HH:MM sorts lexicographically.
        output
            .scheduled_quests
            .sort_by(|a, b| a.start_time.cmp(&b.start_time));
        output.breaks.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::test_support::reply;
    use crate::flows::{run_flow, FlowError};
    use crate::services::providers::mock::MockTextProvider;

    fn input() -> DailyTimetableInput {
        DailyTimetableInput {
            tasks: "math homework, stretch, tidy room".to_string(),
            date: "2024-09-14".to_string(),
            wake_time: Some("07:00".to_string()),
            sleep_time: None,
            goals: None,
        }
    }

    #[tokio::test]
    async fn quests_are_sorted_and_get_ids() {
        let provider = MockTextProvider::new(true);
        let output = run_flow::<DailyTimetable>(&provider, &input()).await.unwrap();

        let starts: Vec<&str> = output
            .scheduled_quests
            .iter()
            .map(|q| q.start_time.as_str())
            .collect();
        assert_eq!(starts, vec!["07:15", "16:00", "18:00"]);
        assert!(output.scheduled_quests.iter().all(|q| !q.id.is_empty()));
        assert!(output.breaks.iter().all(|b| !b.id.is_empty()));
    }

    #[tokio::test]
    async fn model_cannot_mark_quests_completed() {
        let provider = MockTextProvider::scripted(vec![reply(
            r#"{"scheduledQuests":[{"id":"q-1","title":"Run","startTime":"06:30","endTime":"07:00","xp":20,"category":"fitness","completed":true}],"breaks":[]}"#,
        )]);
        let output = run_flow::<DailyTimetable>(&provider, &input()).await.unwrap();
        assert_eq!(output.scheduled_quests[0].id, "q-1");
        assert!(!output.scheduled_quests[0].completed);
    }

    #[tokio::test]
    async fn bad_clock_time_is_invalid_output() {
        let provider = MockTextProvider::scripted(vec![reply(
            r#"{"scheduledQuests":[{"title":"Run","startTime":"6:30pm","endTime":"19:00","xp":20,"category":"fitness"}],"breaks":[]}"#,
        )]);
        let err = run_flow::<DailyTimetable>(&provider, &input())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn invalid_date_is_rejected_before_calling_model() {
        let provider = MockTextProvider::new(false);
        let mut bad = input();
        bad.date = "14/09/2024".to_string();
        let err = run_flow::<DailyTimetable>(&provider, &bad).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
    }

    #[test]
    fn prompt_uses_default_sleep_time() {
        let prompt = DailyTimetable::prompt(&input());
        assert!(prompt.contains("between 07:00 and 22:00"));
        assert!(prompt.contains("math homework"));
    }
}
