//! Result types produced by the evaluators and validators.

use crate::domain::model::{CourseCode, PrerequisiteFormula, RequirementKind, Term};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    UnknownCourse,
    ExcludedCourse,
    Substitution,
    AdditionalRequirement,
    TermNotOffered,
    CreditLoad,
    DuplicateCourse,
    PlanViolation,
    ProposerNote,
}

/// User-visible, non-fatal diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseCode>,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            course: None,
        }
    }

    pub fn for_course(kind: WarningKind, course: &CourseCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            course: Some(course.clone()),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteCheckResult {
    pub course_code: CourseCode,
    pub is_valid: bool,
    pub missing_courses: Vec<CourseCode>,
    pub satisfied_prerequisites: Vec<CourseCode>,
    pub formula_description: String,
}

/// One node of an expanded prerequisite tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteNode {
    pub course_code: CourseCode,
    pub title: String,
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<PrerequisiteFormula>,
    #[serde(default)]
    pub prerequisites: Vec<PrerequisiteNode>,
    /// The course already appears higher up on this path.
    #[serde(default)]
    pub cycle: bool,
    /// Expansion stopped at the depth bound.
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementProgress {
    pub requirement_id: String,
    pub requirement_name: String,
    pub kind: RequirementKind,
    pub credits_completed: u32,
    pub credits_needed: u32,
    pub is_satisfied: bool,
    pub courses_counted: Vec<CourseCode>,
    pub remaining: Vec<CourseCode>,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementValidationResult {
    pub program_code: String,
    pub program_name: String,
    pub total_credits_required: u32,
    pub total_credits_completed: u32,
    pub requirements: Vec<RequirementProgress>,
    pub overall_progress: f64,
    pub is_complete: bool,
    pub excluded_courses: Vec<CourseCode>,
    pub warnings: Vec<Warning>,
}

impl RequirementValidationResult {
    pub fn unsatisfied(&self) -> impl Iterator<Item = &RequirementProgress> {
        self.requirements.iter().filter(|r| !r.is_satisfied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedSubstitution {
    pub original: CourseCode,
    pub substitute: CourseCode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialRulesOutcome {
    pub excluded_courses: Vec<CourseCode>,
    pub warnings: Vec<Warning>,
    pub substitutions: Vec<AppliedSubstitution>,
    pub additional_requirements: Vec<String>,
}

impl SpecialRulesOutcome {
    pub fn is_excluded(&self, code: &CourseCode) -> bool {
        self.excluded_courses.contains(code)
    }

    pub fn substitute_for(&self, original: &CourseCode) -> Option<&CourseCode> {
        self.substitutions
            .iter()
            .find(|s| &s.original == original)
            .map(|s| &s.substitute)
    }
}

/// A course the student could take next, with its ranking score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCourse {
    pub code: CourseCode,
    pub title: String,
    pub credits: u32,
    pub level: u32,
    pub score: f64,
    pub prerequisites_met: bool,
    pub satisfies_requirements: Vec<String>,
    pub typically_offered: Vec<Term>,
}

/// A plan defect that makes the plan invalid and feeds the retry prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanViolation {
    PrerequisiteNotMet {
        course: CourseCode,
        semester: u32,
        missing: Vec<CourseCode>,
    },
    RequirementUnsatisfied {
        requirement_id: String,
        requirement_name: String,
        progress_percentage: f64,
    },
    InsufficientCredits {
        planned: u32,
        required: u32,
    },
}

impl fmt::Display for PlanViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanViolation::PrerequisiteNotMet {
                course,
                semester,
                missing,
            } => {
                let missing: Vec<&str> = missing.iter().map(CourseCode::as_str).collect();
                write!(
                    f,
                    "{} in semester {} is missing prerequisites: {} (they must be completed in an earlier semester)",
                    course,
                    semester,
                    missing.join(", ")
                )
            }
            PlanViolation::RequirementUnsatisfied {
                requirement_name,
                progress_percentage,
                ..
            } => write!(
                f,
                "Requirement '{}' not satisfied: {:.0}% complete",
                requirement_name, progress_percentage
            ),
            PlanViolation::InsufficientCredits { planned, required } => write!(
                f,
                "Plan totals {} credits but the program needs {}",
                planned, required
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanValidation {
    pub is_valid: bool,
    pub errors: Vec<PlanViolation>,
    pub warnings: Vec<Warning>,
    pub requirements: RequirementValidationResult,
    pub special_rules: SpecialRulesOutcome,
}

impl PlanValidation {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}
