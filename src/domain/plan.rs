use crate::domain::model::{Course, CourseCode, Program, Term};
use crate::domain::report::{RankedCourse, RequirementProgress, RequirementValidationResult, Warning};
use crate::utils::error::{PlannerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCourse {
    pub code: CourseCode,
    #[serde(default)]
    pub title: String,
    pub credits: u32,
    pub term: Term,
    pub year: u32,
    pub semester: u32,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default)]
    pub satisfies_requirements: Vec<String>,
}

impl PlannedCourse {
    pub fn counts(&self) -> bool {
        self.status != CourseStatus::Dropped
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    pub number: u32,
    pub term: Term,
    /// Program year, starting at 1.
    pub year: u32,
    #[serde(default)]
    pub courses: Vec<PlannedCourse>,
}

impl Semester {
    pub fn total_credits(&self) -> u32 {
        self.courses
            .iter()
            .filter(|c| c.counts())
            .map(|c| c.credits)
            .sum()
    }
}

/// A generated multi-semester plan, as handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub program_code: String,
    pub program_name: String,
    pub semesters: Vec<Semester>,
    pub requirement_progress: Vec<RequirementProgress>,
    pub warnings: Vec<Warning>,
    pub total_credits: u32,
    pub credits_needed: u32,
    pub graduation_term: Option<String>,
    pub is_valid: bool,
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CreditLoad {
    Light,
    #[default]
    Standard,
    Heavy,
}

impl CreditLoad {
    pub fn target_credits(&self) -> u32 {
        match self {
            CreditLoad::Light => 12,
            CreditLoad::Standard => 15,
            CreditLoad::Heavy => 18,
        }
    }

    pub fn default_band(&self) -> CreditBand {
        match self {
            CreditLoad::Light => CreditBand::new(6, 15),
            CreditLoad::Standard => CreditBand::new(9, 18),
            CreditLoad::Heavy => CreditBand::new(12, 18),
        }
    }
}

impl fmt::Display for CreditLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CreditLoad::Light => "LIGHT",
            CreditLoad::Standard => "STANDARD",
            CreditLoad::Heavy => "HEAVY",
        };
        f.write_str(name)
    }
}

impl FromStr for CreditLoad {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "LIGHT" => Ok(CreditLoad::Light),
            "STANDARD" => Ok(CreditLoad::Standard),
            "HEAVY" => Ok(CreditLoad::Heavy),
            other => Err(PlannerError::configuration(format!(
                "unknown credit load '{}' (expected LIGHT, STANDARD or HEAVY)",
                other
            ))),
        }
    }
}

/// Inclusive per-semester credit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreditBand {
    pub min: u32,
    pub max: u32,
}

impl CreditBand {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, credits: u32) -> bool {
        credits >= self.min && credits <= self.max
    }
}

impl fmt::Display for CreditBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

fn default_max_years() -> u32 {
    4
}

fn default_starting_term() -> Term {
    Term::Fall
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub program_code: String,
    pub starting_year: i32,
    #[serde(default = "default_starting_term")]
    pub starting_term: Term,
    #[serde(default)]
    pub completed_courses: Vec<CourseCode>,
    #[serde(default)]
    pub preferences: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub credit_load: CreditLoad,
    #[serde(default = "default_max_years")]
    pub max_years: u32,
    /// Overrides the band implied by `credit_load`.
    #[serde(default)]
    pub credit_band: Option<CreditBand>,
}

impl GenerationRequest {
    pub fn new(program_code: impl Into<String>, starting_year: i32) -> Self {
        Self {
            program_code: program_code.into(),
            starting_year,
            starting_term: default_starting_term(),
            completed_courses: Vec::new(),
            preferences: BTreeMap::new(),
            credit_load: CreditLoad::default(),
            max_years: default_max_years(),
            credit_band: None,
        }
    }

    pub fn with_completed<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.completed_courses = codes.into_iter().map(CourseCode::new).collect();
        self
    }

    pub fn with_preference(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.preferences.insert(key.into(), value);
        self
    }

    pub fn credit_band(&self) -> CreditBand {
        self.credit_band
            .unwrap_or_else(|| self.credit_load.default_band())
    }

    /// Two terms per program year.
    pub fn semester_count(&self) -> u32 {
        self.max_years * 2
    }
}

/// Raw proposer output before it is checked against the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposedPlan {
    #[serde(default)]
    pub semesters: Vec<ProposedSemester>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedSemester {
    pub number: u32,
    pub term: Term,
    pub year: u32,
    #[serde(default)]
    pub courses: Vec<ProposedCourse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedCourse {
    pub code: CourseCode,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub credits: Option<u32>,
    #[serde(default)]
    pub satisfies_requirements: Vec<String>,
}

/// Everything the proposer is told about the student and the program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalContext {
    pub program: Program,
    pub request: GenerationRequest,
    pub completed_courses: Vec<Course>,
    pub unknown_completed: Vec<CourseCode>,
    pub requirement_status: RequirementValidationResult,
    pub available_courses: Vec<RankedCourse>,
    pub credit_band: CreditBand,
    pub semester_count: u32,
}

impl ProposalContext {
    pub fn completed_credits(&self) -> u32 {
        self.completed_courses.iter().map(|c| c.credits).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_from_json() {
        let json = serde_json::json!({
            "program_code": "honors-cs",
            "starting_year": 2025,
            "completed_courses": ["cmput 174"]
        });
        let request: GenerationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.starting_term, Term::Fall);
        assert_eq!(request.credit_load, CreditLoad::Standard);
        assert_eq!(request.max_years, 4);
        assert_eq!(request.semester_count(), 8);
        assert_eq!(request.completed_courses, vec![CourseCode::new("CMPUT 174")]);
        assert_eq!(request.credit_band(), CreditBand::new(9, 18));
    }

    #[test]
    fn test_explicit_band_wins() {
        let mut request = GenerationRequest::new("honors-cs", 2025);
        request.credit_load = CreditLoad::Heavy;
        request.credit_band = Some(CreditBand::new(3, 9));
        assert_eq!(request.credit_band(), CreditBand::new(3, 9));
    }

    #[test]
    fn test_dropped_courses_do_not_count_toward_semester_credits() {
        let course = |code: &str, status| PlannedCourse {
            code: CourseCode::new(code),
            title: String::new(),
            credits: 3,
            term: Term::Fall,
            year: 1,
            semester: 1,
            status,
            satisfies_requirements: vec![],
        };
        let semester = Semester {
            number: 1,
            term: Term::Fall,
            year: 1,
            courses: vec![
                course("CMPUT 174", CourseStatus::Planned),
                course("MATH 125", CourseStatus::Dropped),
            ],
        };
        assert_eq!(semester.total_credits(), 3);
    }

    #[test]
    fn test_proposed_plan_is_lenient() {
        let json = serde_json::json!({
            "semesters": [
                {"number": 1, "term": "Fall", "year": 1, "courses": [{"code": "cmput 174"}]}
            ]
        });
        let plan: ProposedPlan = serde_json::from_value(json).unwrap();
        assert_eq!(plan.semesters[0].term, Term::Fall);
        assert_eq!(plan.semesters[0].courses[0].code.as_str(), "CMPUT 174");
        assert!(plan.warnings.is_empty());
    }
}
