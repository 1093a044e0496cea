use crate::core::orchestrator::{GenerationSettings, PlanOrchestrator};
use crate::core::prerequisite::{self, DEFAULT_TREE_DEPTH};
use crate::core::{plan_validator, ranking, requirement};
use crate::domain::model::{course_set, CourseCode, Program};
use crate::domain::plan::{CreditBand, CreditLoad, GenerationRequest, Plan, Semester};
use crate::domain::ports::{Catalog, Clock, PlanCache, PlanProposer};
use crate::domain::report::{
    PlanValidation, PrerequisiteCheckResult, PrerequisiteNode, RankedCourse,
    RequirementValidationResult,
};
use crate::utils::error::{PlannerError, Result};
use std::sync::Arc;
use tracing::info;

/// Entry point for callers: lookups by code, then the pure evaluators, and
/// plan generation through the orchestrator.
pub struct PlannerEngine<C: ?Sized, P: ?Sized, K: ?Sized> {
    catalog: Arc<C>,
    orchestrator: PlanOrchestrator<C, P, K>,
}

impl<C, P, K> PlannerEngine<C, P, K>
where
    C: Catalog + ?Sized,
    P: PlanProposer + ?Sized,
    K: PlanCache + ?Sized,
{
    pub fn new(catalog: Arc<C>, proposer: Arc<P>, cache: Arc<K>) -> Self {
        Self {
            orchestrator: PlanOrchestrator::new(Arc::clone(&catalog), proposer, cache),
            catalog,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.orchestrator = self.orchestrator.with_clock(clock);
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.orchestrator = self.orchestrator.with_settings(settings);
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    fn program(&self, program_code: &str) -> Result<Program> {
        self.catalog
            .get_program(program_code)
            .ok_or_else(|| PlannerError::program_not_found(program_code))
    }

    pub fn check_prerequisites<I, S>(&self, course_code: &str, completed: I) -> Result<PrerequisiteCheckResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let code = CourseCode::new(course_code);
        let course = self
            .catalog
            .get_course(&code)
            .ok_or_else(|| PlannerError::course_not_found(code.as_str()))?;
        Ok(prerequisite::check_course(&course, &course_set(completed)))
    }

    /// Prerequisite graph below a course, [`DEFAULT_TREE_DEPTH`] levels deep
    /// unless `max_depth` says otherwise.
    pub fn prerequisite_tree(&self, course_code: &str, max_depth: Option<u32>) -> Result<PrerequisiteNode> {
        prerequisite::prerequisite_tree(
            &*self.catalog,
            &CourseCode::new(course_code),
            max_depth.unwrap_or(DEFAULT_TREE_DEPTH),
        )
    }

    pub fn validate_requirements<I, S>(&self, program_code: &str, completed: I) -> Result<RequirementValidationResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let program = self.program(program_code)?;
        Ok(requirement::validate(&program, &course_set(completed), &*self.catalog))
    }

    pub fn next_available_courses<I, S>(&self, program_code: &str, completed: I) -> Result<Vec<RankedCourse>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let program = self.program(program_code)?;
        Ok(ranking::rank(&program, &course_set(completed), &*self.catalog))
    }

    /// Checks a caller-built plan. Without a band the STANDARD credit load applies.
    pub fn validate_plan<I, S>(
        &self,
        program_code: &str,
        semesters: &[Semester],
        completed: I,
        band: Option<CreditBand>,
    ) -> Result<PlanValidation>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let program = self.program(program_code)?;
        let band = band
            .or(self.orchestrator.settings().default_band)
            .unwrap_or_else(|| CreditLoad::default().default_band());
        Ok(plan_validator::validate_plan(
            semesters,
            &program,
            &course_set(completed),
            &*self.catalog,
            band,
        ))
    }

    pub async fn generate_plan(&self, request: &GenerationRequest) -> Result<Plan> {
        info!(
            "Generating plan for {} starting {} {}",
            request.program_code, request.starting_term, request.starting_year
        );
        self.orchestrator.generate(request).await
    }

    pub fn invalidate_plan(&self, request: &GenerationRequest) -> Result<bool> {
        self.orchestrator.invalidate(request)
    }
}
