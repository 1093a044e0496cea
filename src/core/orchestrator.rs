//! Propose, validate and retry loop around the external plan proposer.

use crate::core::cache::SystemClock;
use crate::core::fingerprint::fingerprint;
use crate::core::{plan_validator, ranking, requirement};
use crate::domain::model::{course_set, CourseCode, Program, Term};
use crate::domain::plan::{
    CreditBand, GenerationRequest, Plan, ProposalContext, ProposedPlan, Semester,
};
use crate::domain::ports::{Catalog, Clock, PlanCache, PlanProposer};
use crate::domain::report::{PlanValidation, Warning, WarningKind};
use crate::utils::error::{PlannerError, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Proposer calls per `generate` invocation, first try included.
pub const MAX_PROPOSER_ATTEMPTS: usize = 2;

pub const DEFAULT_PROPOSER_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub proposer_timeout: Duration,
    /// Used when a request names no band of its own.
    pub default_band: Option<CreditBand>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            proposer_timeout: DEFAULT_PROPOSER_TIMEOUT,
            default_band: None,
        }
    }
}

pub struct PlanOrchestrator<C: ?Sized, P: ?Sized, K: ?Sized> {
    catalog: Arc<C>,
    proposer: Arc<P>,
    cache: Arc<K>,
    clock: Arc<dyn Clock>,
    settings: GenerationSettings,
}

/// Last plan seen that failed validation.
struct Attempt {
    proposed: ProposedPlan,
    semesters: Vec<Semester>,
    validation: PlanValidation,
}

impl<C, P, K> PlanOrchestrator<C, P, K>
where
    C: Catalog + ?Sized,
    P: PlanProposer + ?Sized,
    K: PlanCache + ?Sized,
{
    pub fn new(catalog: Arc<C>, proposer: Arc<P>, cache: Arc<K>) -> Self {
        Self {
            catalog,
            proposer,
            cache,
            clock: Arc::new(SystemClock),
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Returns a cached plan when one exists for the request's fingerprint,
    /// otherwise asks the proposer, at most [`MAX_PROPOSER_ATTEMPTS`] times.
    ///
    /// Only valid plans are cached. When every attempt yields an invalid
    /// plan, the last one is returned with its violations as warnings; an
    /// error comes back only if the proposer never produced a plan.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Plan> {
        let fp = fingerprint(request)?;
        if let Some(plan) = self.cache.get(&fp) {
            info!("Cache hit for {} ({})", request.program_code, short(&fp));
            return Ok(plan);
        }
        info!("Cache miss for {} ({})", request.program_code, short(&fp));

        let program = self
            .catalog
            .get_program(&request.program_code)
            .ok_or_else(|| PlannerError::program_not_found(&request.program_code))?;
        let completed = course_set(request.completed_courses.iter().map(CourseCode::as_str));
        let context = self.build_context(&program, request, &completed);

        let mut prior_errors: Vec<String> = Vec::new();
        let mut last_invalid: Option<Attempt> = None;
        let mut last_error: Option<PlannerError> = None;

        for attempt in 1..=MAX_PROPOSER_ATTEMPTS {
            debug!(
                "Proposer attempt {}/{} with {} prior errors",
                attempt,
                MAX_PROPOSER_ATTEMPTS,
                prior_errors.len()
            );
            let call = self.proposer.propose(&context, &prior_errors);
            let outcome = tokio::time::timeout(self.settings.proposer_timeout, call).await;
            let proposed = match outcome {
                Ok(Ok(proposed)) => proposed,
                Ok(Err(e)) => {
                    warn!("Attempt {}/{} failed: {}", attempt, MAX_PROPOSER_ATTEMPTS, e);
                    prior_errors = vec![e.to_string()];
                    last_error = Some(e);
                    continue;
                }
                Err(_) => {
                    let e = PlannerError::ProposerTimeout {
                        seconds: self.settings.proposer_timeout.as_secs(),
                    };
                    warn!("Attempt {}/{} failed: {}", attempt, MAX_PROPOSER_ATTEMPTS, e);
                    prior_errors = vec![e.to_string()];
                    last_error = Some(e);
                    continue;
                }
            };

            let semesters = plan_validator::build_semesters(&proposed, &*self.catalog);
            let validation = plan_validator::validate_plan(
                &semesters,
                &program,
                &completed,
                &*self.catalog,
                context.credit_band,
            );

            if validation.is_valid {
                let plan = self.assemble(&program, request, &fp, semesters, &validation, &proposed);
                self.cache.put(&fp, plan.clone());
                info!(
                    "Generated valid plan for {} on attempt {} ({} semesters, {} credits)",
                    program.code,
                    attempt,
                    plan.semesters.len(),
                    plan.total_credits
                );
                return Ok(plan);
            }

            prior_errors = validation.error_messages();
            let failure = PlannerError::ValidationFailure {
                violations: prior_errors.clone(),
            };
            warn!("Attempt {}/{}: {}", attempt, MAX_PROPOSER_ATTEMPTS, failure);
            last_error = Some(failure);
            last_invalid = Some(Attempt {
                proposed,
                semesters,
                validation,
            });
        }

        match last_invalid {
            Some(attempt) => {
                warn!(
                    "Returning best-effort plan for {} with {} unresolved errors",
                    program.code,
                    attempt.validation.errors.len()
                );
                Ok(self.best_effort(&program, request, &fp, attempt))
            }
            None => {
                let cause = last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no response".to_string());
                Err(PlannerError::proposer(format!(
                    "no plan obtained after {} attempts: {}",
                    MAX_PROPOSER_ATTEMPTS, cause
                )))
            }
        }
    }

    /// Drops the cached plan for this request, if any.
    pub fn invalidate(&self, request: &GenerationRequest) -> Result<bool> {
        Ok(self.cache.invalidate(&fingerprint(request)?))
    }

    pub fn build_context(
        &self,
        program: &Program,
        request: &GenerationRequest,
        completed: &BTreeSet<CourseCode>,
    ) -> ProposalContext {
        let mut completed_courses = Vec::new();
        let mut unknown_completed = Vec::new();
        for code in completed {
            match self.catalog.get_course(code) {
                Some(course) => completed_courses.push(course),
                None => unknown_completed.push(code.clone()),
            }
        }

        let credit_band = match (request.credit_band, self.settings.default_band) {
            (None, Some(band)) => band,
            _ => request.credit_band(),
        };

        ProposalContext {
            program: program.clone(),
            request: request.clone(),
            completed_courses,
            unknown_completed,
            requirement_status: requirement::validate(program, completed, &*self.catalog),
            available_courses: ranking::rank(program, completed, &*self.catalog),
            credit_band,
            semester_count: request.semester_count(),
        }
    }

    fn assemble(
        &self,
        program: &Program,
        request: &GenerationRequest,
        fp: &str,
        semesters: Vec<Semester>,
        validation: &PlanValidation,
        proposed: &ProposedPlan,
    ) -> Plan {
        let mut warnings = validation.warnings.clone();
        warnings.extend(
            proposed
                .warnings
                .iter()
                .map(|text| Warning::new(WarningKind::ProposerNote, text.clone())),
        );
        if let Some(notes) = proposed.notes.as_ref().filter(|n| !n.trim().is_empty()) {
            warnings.push(Warning::new(WarningKind::ProposerNote, notes.clone()));
        }
        let last_year = semesters.iter().map(|s| s.year).max();
        if let Some(last) = last_year.filter(|year| *year > request.max_years) {
            warnings.push(Warning::new(
                WarningKind::PlanViolation,
                format!(
                    "Plan runs to program year {}, past the {} year limit",
                    last, request.max_years
                ),
            ));
        }

        Plan {
            program_code: program.code.clone(),
            program_name: program.name.clone(),
            total_credits: semesters.iter().map(Semester::total_credits).sum(),
            credits_needed: program.total_credits,
            graduation_term: graduation_term(request, &semesters),
            semesters,
            requirement_progress: validation.requirements.requirements.clone(),
            warnings,
            is_valid: validation.is_valid,
            fingerprint: fp.to_string(),
            generated_at: self.clock.now(),
        }
    }

    fn best_effort(
        &self,
        program: &Program,
        request: &GenerationRequest,
        fp: &str,
        attempt: Attempt,
    ) -> Plan {
        let mut plan = self.assemble(
            program,
            request,
            fp,
            attempt.semesters,
            &attempt.validation,
            &attempt.proposed,
        );
        let mut warnings: Vec<Warning> = attempt
            .validation
            .errors
            .iter()
            .map(|e| Warning::new(WarningKind::PlanViolation, e.to_string()))
            .collect();
        warnings.append(&mut plan.warnings);
        plan.warnings = warnings;
        plan.is_valid = false;
        plan
    }
}

/// Calendar term of the plan's last semester, e.g. `Winter 2029`.
pub fn graduation_term(request: &GenerationRequest, semesters: &[Semester]) -> Option<String> {
    let last = semesters.last()?;
    let year = calendar_year(request.starting_term, request.starting_year, last.term, last.year)?;
    Some(format!("{} {}", last.term, year))
}

/// Program years begin with the starting term; after a Fall start the
/// remaining terms of that program year fall in the next calendar year.
/// `None` when the year does not fit in an `i32`.
pub fn calendar_year(
    starting_term: Term,
    starting_year: i32,
    term: Term,
    program_year: u32,
) -> Option<i32> {
    let offset = i32::try_from(program_year.saturating_sub(1)).ok()?;
    let rollover = i32::from(starting_term == Term::Fall && term != Term::Fall);
    starting_year.checked_add(offset)?.checked_add(rollover)
}

fn short(fp: &str) -> &str {
    fp.get(..12).unwrap_or(fp)
}
