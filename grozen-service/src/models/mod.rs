//! Domain models for the GroZen service.
//!
//! Every record serializes camelCase, both on the wire and in MongoDB, so the
//! shapes the model is asked to produce are the shapes we store and return.

pub mod grocery;
pub mod mood;
pub mod plan;
pub mod schedule;
pub mod user;
pub mod validation;

pub use grocery::{GroceryItem, GroceryList};
pub use mood::MoodLog;
pub use plan::{Exercise, Meal, Mindfulness, OnboardingData, StoredPlan, WellnessPlan};
pub use schedule::{BreakSlot, DailyPlan, QuestCategory, QuestCompletion, ScheduledQuest};
pub use user::{level_for_xp, FullUserDetail, LeaderboardEntry, UserListItem, UserProfile};
