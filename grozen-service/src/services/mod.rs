pub mod database;
pub mod metrics;
pub mod plan_context;
pub mod providers;

pub use database::GrozenDb;
pub use plan_context::{
    InMemoryPlanStore, Notice, PlanContext, PlanContextHandle, PlanContexts, PlanSnapshot,
    PlanStore,
};
