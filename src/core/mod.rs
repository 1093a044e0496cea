pub mod cache;
pub mod engine;
pub mod export;
pub mod fingerprint;
pub mod orchestrator;
pub mod plan_validator;
pub mod prerequisite;
pub mod prompt;
pub mod ranking;
pub mod requirement;
pub mod special_rules;

#[cfg(test)]
pub(crate) mod fixtures;

pub use crate::domain::ports::{Catalog, Clock, PlanCache, PlanProposer, Storage};
pub use crate::utils::error::Result;
pub use engine::PlannerEngine;
pub use orchestrator::{GenerationSettings, PlanOrchestrator};
