//! User profiles and the admin/leaderboard read models built from them.

use super::{DailyPlan, GroceryList, MoodLog, OnboardingData, WellnessPlan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// XP needed per level.
pub const XP_PER_LEVEL: i64 = 100;

pub fn level_for_xp(xp: i64) -> i64 {
    xp.max(0) / XP_PER_LEVEL + 1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,

    pub email: String,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    #[serde(default)]
    pub xp: i64,

    #[serde(default)]
    pub quests_completed: i64,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn level(&self) -> i64 {
        level_for_xp(self.xp)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListItem {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub xp: i64,
    pub created_at: String,
}

impl From<UserProfile> for UserListItem {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.user_id,
            email: profile.email,
            display_name: profile.display_name,
            xp: profile.xp,
            created_at: profile.created_at.to_rfc3339(),
        }
    }
}

/// Everything stored about one user, for the admin viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullUserDetail {
    pub profile: UserProfile,
    pub onboarding: Option<OnboardingData>,
    pub wellness_plan: Option<WellnessPlan>,
    pub mood_logs: Vec<MoodLog>,
    pub grocery_list: Option<GroceryList>,
    pub daily_plans: Vec<DailyPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub xp: i64,
    pub level: i64,
}

impl LeaderboardEntry {
    /// Rank profiles already sorted by xp descending, starting at 1.
    pub fn rank_all(profiles: Vec<UserProfile>) -> Vec<Self> {
        profiles
            .into_iter()
            .enumerate()
            .map(|(i, p)| LeaderboardEntry {
                rank: i as u32 + 1,
                level: p.level(),
                user_id: p.user_id,
                display_name: p.display_name,
                photo_url: p.photo_url,
                xp: p.xp,
            })
            .collect()
    }
}
