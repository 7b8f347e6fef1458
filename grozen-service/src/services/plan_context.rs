//! Per-user plan context: onboarding answers, the generated wellness plan and
//! the generation status, mirrored to a [`PlanStore`] on every mutation.

use crate::flows::{run_flow, FlowError, WellnessPlanFlow};
use crate::models::{OnboardingData, StoredPlan, WellnessPlan};
use crate::services::providers::TextProvider;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use validator::Validate;

/// Persistence for plan contexts. One record per user.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn load_plan(&self, user_id: &str) -> Result<Option<StoredPlan>, AppError>;

    /// Insert or replace the user's record.
    async fn save_plan(&self, plan: &StoredPlan) -> Result<(), AppError>;

    async fn delete_plan(&self, user_id: &str) -> Result<(), AppError>;
}

/// Process-local store used by unit tests.
#[derive(Default)]
pub struct InMemoryPlanStore {
    plans: DashMap<String, StoredPlan>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn load_plan(&self, user_id: &str) -> Result<Option<StoredPlan>, AppError> {
        Ok(self.plans.get(user_id).map(|p| p.value().clone()))
    }

    async fn save_plan(&self, plan: &StoredPlan) -> Result<(), AppError> {
        self.plans.insert(plan.user_id.clone(), plan.clone());
        Ok(())
    }

    async fn delete_plan(&self, user_id: &str) -> Result<(), AppError> {
        self.plans.remove(user_id);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Success,
    Destructive,
}

/// User-facing notification (rendered as a toast by clients).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub variant: NoticeVariant,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: NoticeVariant::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: NoticeVariant::Destructive,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Point-in-time view of a plan context.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSnapshot {
    pub onboarding: Option<OnboardingData>,
    pub wellness_plan: Option<WellnessPlan>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum PlanContextError {
    #[error("Complete onboarding before generating a plan")]
    OnboardingRequired,

    #[error("A wellness plan is already being generated")]
    AlreadyGenerating,

    #[error("Cannot start over while a wellness plan is being generated")]
    ClearWhileGenerating,

    #[error(transparent)]
    Store(#[from] AppError),

    #[error("Failed to generate wellness plan: {source}")]
    Generation { source: FlowError, notice: Notice },
}

impl From<PlanContextError> for AppError {
    fn from(err: PlanContextError) -> Self {
        match err {
            PlanContextError::OnboardingRequired => {
                AppError::BadRequest(anyhow::anyhow!(err.to_string()))
            }
            PlanContextError::AlreadyGenerating | PlanContextError::ClearWhileGenerating => {
                AppError::Conflict(anyhow::anyhow!(err.to_string()))
            }
            PlanContextError::Store(e) => e,
            PlanContextError::Generation { source, .. } => source.into(),
        }
    }
}

#[derive(Debug, Default)]
struct PlanState {
    onboarding: Option<OnboardingData>,
    wellness_plan: Option<WellnessPlan>,
    error: Option<String>,
}

pub struct PlanContext {
    user_id: String,
    store: Arc<dyn PlanStore>,
    state: RwLock<PlanState>,
    // Outside the lock so a dropped request can reset it.
    loading: AtomicBool,
}

/// Clears the loading flag when generation finishes or is cancelled.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl PlanContext {
    /// Hydrate the context for `user_id`; empty when nothing is stored.
    pub async fn load(user_id: &str, store: Arc<dyn PlanStore>) -> Result<Self, AppError> {
        let state = match store.load_plan(user_id).await? {
            Some(stored) => PlanState {
                onboarding: stored.onboarding,
                wellness_plan: stored.wellness_plan,
                error: stored.last_error,
            },
            None => PlanState::default(),
        };

        Ok(Self {
            user_id: user_id.to_string(),
            store,
            state: RwLock::new(state),
            loading: AtomicBool::new(false),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> PlanSnapshot {
        let state = self.state.read().await;
        PlanSnapshot {
            onboarding: state.onboarding.clone(),
            wellness_plan: state.wellness_plan.clone(),
            is_loading: self.is_loading(),
            error: state.error.clone(),
        }
    }

    #[tracing::instrument(skip(self, data), fields(user_id = %self.user_id))]
    pub async fn complete_onboarding(&self, data: OnboardingData) -> Result<(), AppError> {
        data.validate()?;

        let mut state = self.state.write().await;
        state.onboarding = Some(data);
        state.error = None;
        self.persist(&state).await?;

        tracing::info!("Onboarding completed");
        Ok(())
    }

    /// Generate a fresh plan from the stored onboarding data, replacing any
    /// previous plan.
    #[tracing::instrument(skip(self, provider), fields(user_id = %self.user_id))]
    pub async fn generate_plan(
        &self,
        provider: &dyn TextProvider,
    ) -> Result<(WellnessPlan, Notice), PlanContextError> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PlanContextError::AlreadyGenerating);
        }
        let _guard = LoadingGuard(&self.loading);

        let onboarding = {
            let mut state = self.state.write().await;
            let onboarding = state
                .onboarding
                .clone()
                .ok_or(PlanContextError::OnboardingRequired)?;
            state.error = None;
            onboarding
        };

        let result = run_flow::<WellnessPlanFlow>(provider, &onboarding).await;

        let mut state = self.state.write().await;
        match result {
            Ok(plan) => {
                state.wellness_plan = Some(plan.clone());
                state.error = None;
                self.persist(&state).await?;

                tracing::info!(
                    meals = plan.meals.len(),
                    exercise = plan.exercise.len(),
                    mindfulness = plan.mindfulness.len(),
                    "Wellness plan generated"
                );
                Ok((
                    plan,
                    Notice::success(
                        "Plan generated!",
                        "Your personalized wellness plan is ready.",
                    ),
                ))
            }
            Err(source) => {
                let message = source.user_message();
                state.error = Some(message.clone());
                if let Err(e) = self.persist(&state).await {
                    tracing::warn!(error = %e, "Failed to persist plan error state");
                }

                tracing::error!(
                    error = %source,
                    kind = source.kind(),
                    "Wellness plan generation failed"
                );
                Err(PlanContextError::Generation {
                    source,
                    notice: Notice::destructive("Error generating plan", message),
                })
            }
        }
    }

    /// Start over: drop onboarding data and plan.
    ///
    /// Rejected while a generation is in flight, which would otherwise write
    /// its plan back over the cleared state.
    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn clear_plan(&self) -> Result<(), PlanContextError> {
        // Checked under the write lock: generation raises the flag before it
        // reads onboarding, so it either sees this clear or is seen here.
        let mut state = self.state.write().await;
        if self.is_loading() {
            return Err(PlanContextError::ClearWhileGenerating);
        }
        self.store.delete_plan(&self.user_id).await?;
        *state = PlanState::default();

        tracing::info!("Plan context cleared");
        Ok(())
    }

    async fn persist(&self, state: &PlanState) -> Result<(), AppError> {
        let record = StoredPlan {
            user_id: self.user_id.clone(),
            onboarding: state.onboarding.clone(),
            wellness_plan: state.wellness_plan.clone(),
            last_error: state.error.clone(),
            updated_at: Utc::now(),
        };
        self.store.save_plan(&record).await
    }
}

/// Plan contexts currently in use, shared across concurrent requests.
///
/// A context stays cached only while a request holds it or a generation is in
/// flight; otherwise it is dropped and the next request hydrates it from the
/// store again, so state written by other replicas is picked up.
#[derive(Clone)]
pub struct PlanContexts {
    store: Arc<dyn PlanStore>,
    contexts: Arc<DashMap<String, Arc<PlanContext>>>,
}

impl PlanContexts {
    pub fn new(store: Arc<dyn PlanStore>) -> Self {
        Self {
            store,
            contexts: Arc::new(DashMap::new()),
        }
    }

    /// Context for `user_id`, shared with any request already holding it.
    pub async fn get(&self, user_id: &str) -> Result<PlanContextHandle, AppError> {
        if let Some(ctx) = self.contexts.get(user_id) {
            return Ok(self.handle(Arc::clone(ctx.value())));
        }

        let loaded = Arc::new(PlanContext::load(user_id, Arc::clone(&self.store)).await?);
        // A concurrent loader may have won; keep whichever got in first.
        let ctx = Arc::clone(
            self.contexts
                .entry(user_id.to_string())
                .or_insert(loaded)
                .value(),
        );
        Ok(self.handle(ctx))
    }

    fn handle(&self, ctx: Arc<PlanContext>) -> PlanContextHandle {
        PlanContextHandle {
            ctx: Some(ctx),
            contexts: Arc::clone(&self.contexts),
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// A request's hold on a cached [`PlanContext`]. Dropping the last handle of
/// an idle context evicts it.
pub struct PlanContextHandle {
    ctx: Option<Arc<PlanContext>>,
    contexts: Arc<DashMap<String, Arc<PlanContext>>>,
}

impl std::ops::Deref for PlanContextHandle {
    type Target = PlanContext;

    fn deref(&self) -> &PlanContext {
        // Only taken in drop.
        self.ctx.as_deref().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PlanContextHandle {
    fn drop(&mut self) {
        let Some(ctx) = self.ctx.take() else {
            return;
        };
        let user_id = ctx.user_id.clone();
        drop(ctx);

        // The map's own reference is the last one once every handle is gone.
        self.contexts.remove_if(&user_id, |_, cached| {
            Arc::strong_count(cached) == 1 && !cached.is_loading()
        });
    }
}
