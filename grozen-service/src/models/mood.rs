use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A daily mood check-in with the AI's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodLog {
    pub id: String,

    pub user_id: String,

    /// Emoji the user picked.
    pub mood: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selfie_data_uri: Option<String>,

    pub ai_feedback: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl MoodLog {
    pub fn new(
        user_id: String,
        mood: String,
        notes: Option<String>,
        selfie_data_uri: Option<String>,
        ai_feedback: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            mood,
            notes,
            selfie_data_uri,
            ai_feedback,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_id_and_camel_case_fields() {
        let log = MoodLog::new(
            "user-1".to_string(),
            "😊".to_string(),
            None,
            None,
            "Nice work checking in.".to_string(),
        );
        let json = serde_json::to_value(&log).unwrap();

        assert_eq!(json["id"], log.id.as_str());
        assert!(json.get("logId").is_none());
        assert_eq!(json["aiFeedback"], "Nice work checking in.");
        assert!(json.get("notes").is_none());
    }
}
