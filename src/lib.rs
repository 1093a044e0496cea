pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{HttpPlanProposer, InMemoryCatalog, LocalStorage, ProposerSettings};
pub use config::PlannerConfig;
pub use core::cache::{InMemoryPlanCache, ManualClock, SystemClock};
pub use core::{GenerationSettings, PlannerEngine};
pub use domain::model::{Course, CourseCode, PrerequisiteFormula, Program, Requirement, Term};
pub use domain::plan::{CreditBand, CreditLoad, GenerationRequest, Plan, Semester};
pub use utils::error::{PlannerError, Result};
