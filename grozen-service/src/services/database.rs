//! Database operations for the GroZen service.
//!
//! Users, plan contexts, mood logs, grocery lists and daily plans live in
//! MongoDB. Per-user singletons (plan, grocery list, daily plan per date) are
//! written with upserts so regenerating never duplicates a record.

use crate::models::{
    level_for_xp, DailyPlan, FullUserDetail, GroceryList, MoodLog, QuestCompletion,
    ScheduledQuest, StoredPlan, UserProfile,
};
use crate::services::metrics;
use crate::services::plan_context::PlanStore;
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{
        FindOneAndUpdateOptions, FindOptions, IndexOptions, ReplaceOptions, ReturnDocument,
    },
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::time::Instant;

const USERS: &str = "users";
const PLANS: &str = "plans";
const MOOD_LOGS: &str = "mood_logs";
const GROCERY_LISTS: &str = "grocery_lists";
const DAILY_PLANS: &str = "daily_plans";

/// Log, count and wrap a driver error.
fn db_error(
    operation: &'static str,
    collection: &'static str,
) -> impl FnOnce(mongodb::error::Error) -> AppError {
    move |e| {
        metrics::record_db_error(operation, collection);
        tracing::error!(operation, collection, error = %e, "Database operation failed");
        AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
    }
}

/// Marker recorded on the profile once a quest's xp has been awarded.
pub fn quest_award_key(date: &str, quest_id: &str) -> String {
    format!("{}/{}", date, quest_id)
}

fn observe(operation: &'static str, collection: &'static str, started: Instant) {
    metrics::record_db_operation(operation, collection, started.elapsed().as_secs_f64());
}

#[derive(Clone)]
pub struct GrozenDb {
    client: MongoClient,
    db: Database,
}

impl GrozenDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for grozen-service");

        self.create_index(USERS, doc! { "userId": 1 }, "user_id_idx", true)
            .await?;
        self.create_index(
            USERS,
            doc! { "xp": -1, "displayName": 1 },
            "leaderboard_idx",
            false,
        )
        .await?;
        self.create_index(PLANS, doc! { "userId": 1 }, "user_id_idx", true)
            .await?;
        self.create_index(GROCERY_LISTS, doc! { "userId": 1 }, "user_id_idx", true)
            .await?;
        self.create_index(
            DAILY_PLANS,
            doc! { "userId": 1, "date": 1 },
            "user_date_idx",
            true,
        )
        .await?;
        self.create_index(
            MOOD_LOGS,
            doc! { "userId": 1, "createdAt": -1 },
            "user_time_idx",
            false,
        )
        .await?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        keys: Document,
        name: &str,
        unique: bool,
    ) -> Result<(), AppError> {
        let index = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .name(name.to_string())
                    .unique(unique)
                    .build(),
            )
            .build();

        self.db
            .collection::<Document>(collection)
            .create_index(index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create {} index on {}: {}", name, collection, e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    // Collection accessors

    pub fn users(&self) -> Collection<UserProfile> {
        self.db.collection(USERS)
    }

    pub fn plans(&self) -> Collection<StoredPlan> {
        self.db.collection(PLANS)
    }

    pub fn mood_logs(&self) -> Collection<MoodLog> {
        self.db.collection(MOOD_LOGS)
    }

    pub fn grocery_lists(&self) -> Collection<GroceryList> {
        self.db.collection(GROCERY_LISTS)
    }

    pub fn daily_plans(&self) -> Collection<DailyPlan> {
        self.db.collection(DAILY_PLANS)
    }

    // User operations

    /// Create or refresh a profile from identity claims. XP and counters are
    /// only initialised on insert.
    pub async fn upsert_user(
        &self,
        user_id: &str,
        email: &str,
        display_name: &str,
        photo_url: Option<&str>,
    ) -> Result<UserProfile, AppError> {
        let started = Instant::now();
        let now = Utc::now().timestamp_millis();

        let mut set = doc! {
            "email": email,
            "displayName": display_name,
            "updatedAt": now,
        };
        if let Some(url) = photo_url {
            set.insert("photoUrl", url);
        }

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let profile = self
            .users()
            .find_one_and_update(
                doc! { "userId": user_id },
                doc! {
                    "$set": set,
                    "$setOnInsert": {
                        "xp": 0_i64,
                        "questsCompleted": 0_i64,
                        "createdAt": now,
                    }
                },
                options,
            )
            .await
            .map_err(db_error("upsert", USERS))?;
        observe("upsert", USERS, started);

        profile.ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!("Upserted user {} not returned", user_id))
        })
    }

    pub async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        let started = Instant::now();
        let user = self
            .users()
            .find_one(doc! { "userId": user_id }, None)
            .await
            .map_err(db_error("find", USERS))?;
        observe("find", USERS, started);
        Ok(user)
    }

    /// All users, newest first.
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, AppError> {
        let started = Instant::now();
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();
        let cursor = self
            .users()
            .find(None, options)
            .await
            .map_err(db_error("list", USERS))?;
        let users: Vec<UserProfile> = cursor
            .try_collect()
            .await
            .map_err(db_error("list", USERS))?;
        observe("list", USERS, started);
        Ok(users)
    }

    /// Top users by xp, ties broken by display name.
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<UserProfile>, AppError> {
        let started = Instant::now();
        let options = FindOptions::builder()
            .sort(doc! { "xp": -1, "displayName": 1 })
            .limit(limit)
            .build();
        let cursor = self
            .users()
            .find(None, options)
            .await
            .map_err(db_error("leaderboard", USERS))?;
        let users: Vec<UserProfile> = cursor
            .try_collect()
            .await
            .map_err(db_error("leaderboard", USERS))?;
        observe("leaderboard", USERS, started);
        Ok(users)
    }

    // Mood log operations

    pub async fn insert_mood_log(&self, log: &MoodLog) -> Result<(), AppError> {
        let started = Instant::now();
        self.mood_logs()
            .insert_one(log, None)
            .await
            .map_err(db_error("insert", MOOD_LOGS))?;
        observe("insert", MOOD_LOGS, started);
        Ok(())
    }

    /// Mood logs for a user, newest first.
    pub async fn list_mood_logs(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<MoodLog>, AppError> {
        let started = Instant::now();
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .limit(limit)
            .build();
        let cursor = self
            .mood_logs()
            .find(doc! { "userId": user_id }, options)
            .await
            .map_err(db_error("list", MOOD_LOGS))?;
        let logs: Vec<MoodLog> = cursor
            .try_collect()
            .await
            .map_err(db_error("list", MOOD_LOGS))?;
        observe("list", MOOD_LOGS, started);
        Ok(logs)
    }

    // Grocery list operations

    pub async fn save_grocery_list(&self, list: &GroceryList) -> Result<(), AppError> {
        let started = Instant::now();
        let options = ReplaceOptions::builder().upsert(true).build();
        self.grocery_lists()
            .replace_one(doc! { "userId": list.user_id.as_str() }, list, options)
            .await
            .map_err(db_error("upsert", GROCERY_LISTS))?;
        observe("upsert", GROCERY_LISTS, started);
        Ok(())
    }

    pub async fn find_grocery_list(&self, user_id: &str) -> Result<Option<GroceryList>, AppError> {
        let started = Instant::now();
        let list = self
            .grocery_lists()
            .find_one(doc! { "userId": user_id }, None)
            .await
            .map_err(db_error("find", GROCERY_LISTS))?;
        observe("find", GROCERY_LISTS, started);
        Ok(list)
    }

    // Daily plan operations

    /// Store the timetable for `plan.date`, replacing any earlier one for that day.
    pub async fn save_daily_plan(&self, plan: &DailyPlan) -> Result<(), AppError> {
        let started = Instant::now();
        let options = ReplaceOptions::builder().upsert(true).build();
        self.daily_plans()
            .replace_one(
                doc! { "userId": plan.user_id.as_str(), "date": plan.date.as_str() },
                plan,
                options,
            )
            .await
            .map_err(db_error("upsert", DAILY_PLANS))?;
        observe("upsert", DAILY_PLANS, started);
        Ok(())
    }

    pub async fn find_daily_plan(
        &self,
        user_id: &str,
        date: &str,
    ) -> Result<Option<DailyPlan>, AppError> {
        let started = Instant::now();
        let plan = self
            .daily_plans()
            .find_one(doc! { "userId": user_id, "date": date }, None)
            .await
            .map_err(db_error("find", DAILY_PLANS))?;
        observe("find", DAILY_PLANS, started);
        Ok(plan)
    }

    /// Daily plans for a user, most recent date first.
    pub async fn list_daily_plans(&self, user_id: &str) -> Result<Vec<DailyPlan>, AppError> {
        let started = Instant::now();
        let options = FindOptions::builder().sort(doc! { "date": -1 }).build();
        let cursor = self
            .daily_plans()
            .find(doc! { "userId": user_id }, options)
            .await
            .map_err(db_error("list", DAILY_PLANS))?;
        let plans: Vec<DailyPlan> = cursor
            .try_collect()
            .await
            .map_err(db_error("list", DAILY_PLANS))?;
        observe("list", DAILY_PLANS, started);
        Ok(plans)
    }

    /// Mark a quest completed and award its xp exactly once.
    ///
    /// Two writes: the quest flag on the daily plan, then the xp on the
    /// profile. The award is keyed by date and quest id in the profile's
    /// `awardedQuests`, so it runs on every call for a completed quest and
    /// only takes effect once. A call that failed between the two writes is
    /// repaired by retrying it.
    pub async fn complete_quest(
        &self,
        user_id: &str,
        date: &str,
        quest_id: &str,
    ) -> Result<QuestCompletion, AppError> {
        let plan = self
            .find_daily_plan(user_id, date)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No schedule for {}", date)))?;
        let quest = plan.quest(quest_id).cloned().ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Quest {} not found", quest_id))
        })?;

        let started = Instant::now();
        let result = self
            .daily_plans()
            .update_one(
                doc! {
                    "userId": user_id,
                    "date": date,
                    "scheduledQuests": { "$elemMatch": { "id": quest_id, "completed": false } },
                },
                doc! {
                    "$set": {
                        "scheduledQuests.$.completed": true,
                        "updatedAt": Utc::now().timestamp_millis(),
                    }
                },
                None,
            )
            .await
            .map_err(db_error("complete_quest", DAILY_PLANS))?;
        observe("complete_quest", DAILY_PLANS, started);
        if result.modified_count == 0 {
            tracing::debug!(quest_id = %quest_id, "Quest was already marked completed");
        }

        let awarded_xp = if self.award_quest_xp(user_id, date, &quest).await? {
            tracing::info!(quest_id = %quest_id, xp = quest.xp, "Quest completed");
            quest.xp
        } else {
            tracing::info!(quest_id = %quest_id, "Quest xp already awarded");
            0
        };

        let daily_plan = self
            .find_daily_plan(user_id, date)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No schedule for {}", date)))?;
        let total_xp = self.find_user(user_id).await?.map_or(0, |u| u.xp);

        Ok(QuestCompletion {
            daily_plan,
            awarded_xp,
            total_xp,
            level: level_for_xp(total_xp),
        })
    }

    /// Add the quest's xp to the profile unless this quest was already
    /// awarded. Returns whether xp was added.
    async fn award_quest_xp(
        &self,
        user_id: &str,
        date: &str,
        quest: &ScheduledQuest,
    ) -> Result<bool, AppError> {
        let award_key = quest_award_key(date, &quest.id);

        let started = Instant::now();
        let result = self
            .users()
            .update_one(
                doc! { "userId": user_id, "awardedQuests": { "$ne": award_key.as_str() } },
                doc! {
                    "$inc": { "xp": i64::from(quest.xp), "questsCompleted": 1_i64 },
                    "$addToSet": { "awardedQuests": award_key.as_str() },
                    "$set": { "updatedAt": Utc::now().timestamp_millis() },
                },
                None,
            )
            .await
            .map_err(db_error("award_xp", USERS))?;
        observe("award_xp", USERS, started);

        Ok(result.modified_count == 1)
    }

    // Admin

    /// Everything stored for one user, or `None` if the profile does not exist.
    pub async fn full_user_detail(
        &self,
        user_id: &str,
    ) -> Result<Option<FullUserDetail>, AppError> {
        let Some(profile) = self.find_user(user_id).await? else {
            return Ok(None);
        };

        let (plan, mood_logs, grocery_list, daily_plans) = tokio::try_join!(
            self.load_plan(user_id),
            self.list_mood_logs(user_id, None),
            self.find_grocery_list(user_id),
            self.list_daily_plans(user_id),
        )?;

        let (onboarding, wellness_plan) = match plan {
            Some(p) => (p.onboarding, p.wellness_plan),
            None => (None, None),
        };

        Ok(Some(FullUserDetail {
            profile,
            onboarding,
            wellness_plan,
            mood_logs,
            grocery_list,
            daily_plans,
        }))
    }
}

#[async_trait]
impl PlanStore for GrozenDb {
    async fn load_plan(&self, user_id: &str) -> Result<Option<StoredPlan>, AppError> {
        let started = Instant::now();
        let plan = self
            .plans()
            .find_one(doc! { "userId": user_id }, None)
            .await
            .map_err(db_error("find", PLANS))?;
        observe("find", PLANS, started);
        Ok(plan)
    }

    async fn save_plan(&self, plan: &StoredPlan) -> Result<(), AppError> {
        let started = Instant::now();
        let options = ReplaceOptions::builder().upsert(true).build();
        self.plans()
            .replace_one(doc! { "userId": plan.user_id.as_str() }, plan, options)
            .await
            .map_err(db_error("upsert", PLANS))?;
        observe("upsert", PLANS, started);
        Ok(())
    }

    async fn delete_plan(&self, user_id: &str) -> Result<(), AppError> {
        let started = Instant::now();
        self.plans()
            .delete_one(doc! { "userId": user_id }, None)
            .await
            .map_err(db_error("delete", PLANS))?;
        observe("delete", PLANS, started);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn award_key_is_per_date_and_quest() {
        assert_eq!(quest_award_key("2026-03-14", "q-1"), "2026-03-14/q-1");
        assert_ne!(
            quest_award_key("2026-03-14", "q-1"),
            quest_award_key("2026-03-15", "q-1")
        );
    }
}
