use crate::utils::error::{PlannerError, Result};
use crate::utils::validation::{require_text, Validate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// Normalized course code: trimmed, upper-cased, inner whitespace collapsed.
///
/// `"cmput  174 "` and `"CMPUT 174"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CourseCode(String);

impl CourseCode {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let collapsed = raw.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
        Self(collapsed.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for CourseCode {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for CourseCode {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<CourseCode> for String {
    fn from(code: CourseCode) -> Self {
        code.0
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds a normalized, de-duplicated set from raw codes.
pub fn course_set<I, S>(codes: I) -> BTreeSet<CourseCode>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(CourseCode::new)
        .filter(|c| !c.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Term {
    #[serde(alias = "Fall", alias = "fall")]
    Fall,
    #[serde(alias = "Winter", alias = "winter")]
    Winter,
    #[serde(alias = "Spring", alias = "spring")]
    Spring,
    #[serde(alias = "Summer", alias = "summer")]
    Summer,
}

impl Term {
    pub fn as_str(&self) -> &'static str {
        match self {
            Term::Fall => "FALL",
            Term::Winter => "WINTER",
            Term::Spring => "SPRING",
            Term::Summer => "SUMMER",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Term::Fall => "Fall",
            Term::Winter => "Winter",
            Term::Spring => "Spring",
            Term::Summer => "Summer",
        };
        f.write_str(name)
    }
}

impl FromStr for Term {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "FALL" => Ok(Term::Fall),
            "WINTER" => Ok(Term::Winter),
            "SPRING" => Ok(Term::Spring),
            "SUMMER" => Ok(Term::Summer),
            other => Err(PlannerError::configuration(format!(
                "unknown term '{}' (expected FALL, WINTER, SPRING or SUMMER)",
                other
            ))),
        }
    }
}

/// Prerequisite logic attached to a course.
///
/// On the wire this is the catalog's loose JSON shape
/// (`{"type": "COURSE", "code": ..}` / `{"type": "AND", "conditions": [..]}`);
/// it is checked once while deserializing, so a loaded formula is always
/// well formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFormula", into = "RawFormula")]
pub enum PrerequisiteFormula {
    Course(CourseCode),
    And(Vec<PrerequisiteFormula>),
    Or(Vec<PrerequisiteFormula>),
}

impl PrerequisiteFormula {
    pub fn course(code: impl AsRef<str>) -> Self {
        PrerequisiteFormula::Course(CourseCode::new(code))
    }

    pub fn all_of<I: IntoIterator<Item = PrerequisiteFormula>>(children: I) -> Self {
        PrerequisiteFormula::And(children.into_iter().collect())
    }

    pub fn any_of<I: IntoIterator<Item = PrerequisiteFormula>>(children: I) -> Self {
        PrerequisiteFormula::Or(children.into_iter().collect())
    }

    /// Every course code mentioned, first occurrence order, no duplicates.
    pub fn course_codes(&self) -> Vec<CourseCode> {
        let mut seen = HashSet::new();
        let mut codes = Vec::new();
        self.collect_codes(&mut seen, &mut codes);
        codes
    }

    fn collect_codes(&self, seen: &mut HashSet<CourseCode>, out: &mut Vec<CourseCode>) {
        match self {
            PrerequisiteFormula::Course(code) => {
                if seen.insert(code.clone()) {
                    out.push(code.clone());
                }
            }
            PrerequisiteFormula::And(children) | PrerequisiteFormula::Or(children) => {
                for child in children {
                    child.collect_codes(seen, out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFormula {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conditions: Option<Vec<RawFormula>>,
}

impl TryFrom<RawFormula> for PrerequisiteFormula {
    type Error = PlannerError;

    fn try_from(raw: RawFormula) -> Result<Self> {
        let kind = raw.kind.trim().to_uppercase();
        match kind.as_str() {
            "COURSE" => match raw.code {
                Some(serde_json::Value::String(code)) if !code.trim().is_empty() => {
                    Ok(PrerequisiteFormula::course(code))
                }
                // Some catalog rows wrap a whole formula inside the code field.
                Some(nested @ serde_json::Value::Object(_)) => {
                    let inner: RawFormula = serde_json::from_value(nested).map_err(|e| {
                        PlannerError::configuration(format!("malformed nested formula: {}", e))
                    })?;
                    PrerequisiteFormula::try_from(inner)
                }
                other => Err(PlannerError::configuration(format!(
                    "COURSE formula node has no usable code: {:?}",
                    other
                ))),
            },
            "AND" | "OR" => {
                let conditions = raw.conditions.unwrap_or_default();
                if conditions.is_empty() {
                    return Err(PlannerError::configuration(format!(
                        "{} formula node has no conditions",
                        kind
                    )));
                }
                let children = conditions
                    .into_iter()
                    .map(PrerequisiteFormula::try_from)
                    .collect::<Result<Vec<_>>>()?;
                if kind == "AND" {
                    Ok(PrerequisiteFormula::And(children))
                } else {
                    Ok(PrerequisiteFormula::Or(children))
                }
            }
            other => Err(PlannerError::configuration(format!(
                "unknown prerequisite formula type '{}'",
                other
            ))),
        }
    }
}

impl From<PrerequisiteFormula> for RawFormula {
    fn from(formula: PrerequisiteFormula) -> Self {
        match formula {
            PrerequisiteFormula::Course(code) => RawFormula {
                kind: "COURSE".to_string(),
                code: Some(serde_json::Value::String(code.into())),
                conditions: None,
            },
            PrerequisiteFormula::And(children) => RawFormula {
                kind: "AND".to_string(),
                code: None,
                conditions: Some(children.into_iter().map(RawFormula::from).collect()),
            },
            PrerequisiteFormula::Or(children) => RawFormula {
                kind: "OR".to_string(),
                code: None,
                conditions: Some(children.into_iter().map(RawFormula::from).collect()),
            },
        }
    }
}

/// Catalog levels arrive as numbers (`300`) or strings (`"300"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum LevelRepr {
    Number(u32),
    Text(String),
}

impl LevelRepr {
    fn into_level<E: serde::de::Error>(self) -> std::result::Result<u32, E> {
        match self {
            LevelRepr::Number(level) => Ok(level),
            LevelRepr::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid course level '{}'", text))),
        }
    }
}

fn deserialize_level<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    LevelRepr::deserialize(d)?.into_level()
}

fn deserialize_levels<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<BTreeSet<u32>, D::Error> {
    Vec::<LevelRepr>::deserialize(d)?
        .into_iter()
        .map(LevelRepr::into_level)
        .collect()
}

fn default_credits() -> u32 {
    3
}

fn default_total_credits() -> u32 {
    120
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub code: CourseCode,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_credits")]
    pub credits: u32,
    #[serde(deserialize_with = "deserialize_level")]
    pub level: u32,
    pub subject: String,
    #[serde(default, alias = "prerequisites")]
    pub prerequisite_formula: Option<PrerequisiteFormula>,
    /// Empty means the course is not tied to particular terms.
    #[serde(default)]
    pub typically_offered: BTreeSet<Term>,
}

impl Course {
    pub fn is_offered_in(&self, term: Term) -> bool {
        self.typically_offered.is_empty() || self.typically_offered.contains(&term)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RequirementKind {
    Required,
    Choice,
    LevelFilter,
    Elective,
}

impl RequirementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementKind::Required => "REQUIRED",
            RequirementKind::Choice => "CHOICE",
            RequirementKind::LevelFilter => "LEVEL_REQUIREMENT",
            RequirementKind::Elective => "ELECTIVE",
        }
    }
}

impl TryFrom<String> for RequirementKind {
    type Error = PlannerError;

    fn try_from(raw: String) -> Result<Self> {
        match raw.trim().to_uppercase().as_str() {
            "REQUIRED" => Ok(RequirementKind::Required),
            "CHOICE" => Ok(RequirementKind::Choice),
            "LEVEL_REQUIREMENT" | "LEVEL_FILTER" => Ok(RequirementKind::LevelFilter),
            "ELECTIVE" => Ok(RequirementKind::Elective),
            _ => Err(PlannerError::configuration(format!(
                "unknown requirement kind '{}'",
                raw
            ))),
        }
    }
}

impl From<RequirementKind> for String {
    fn from(kind: RequirementKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    pub name: String,
    #[serde(rename = "requirement_type", alias = "kind")]
    pub kind: RequirementKind,
    #[serde(default)]
    pub courses: Vec<CourseCode>,
    #[serde(default)]
    pub credits_needed: Option<u32>,
    #[serde(default)]
    pub choose_count: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_levels")]
    pub level_filter: BTreeSet<u32>,
    #[serde(default)]
    pub subject_filter: Option<String>,
    /// Display order only.
    #[serde(default)]
    pub order_index: u32,
}

impl Requirement {
    pub fn lists(&self, code: &CourseCode) -> bool {
        self.courses.iter().any(|c| c == code)
    }

    pub fn choose_count(&self) -> u32 {
        self.choose_count.unwrap_or(1)
    }

    /// Level/subject filter match; an empty level set or missing subject matches anything.
    pub fn matches_filters(&self, course: &Course) -> bool {
        let level_ok = self.level_filter.is_empty() || self.level_filter.contains(&course.level);
        let subject_ok = self
            .subject_filter
            .as_deref()
            .map_or(true, |s| s.trim().eq_ignore_ascii_case(course.subject.trim()));
        level_ok && subject_ok
    }

    pub fn course_filter(&self) -> CourseFilter {
        CourseFilter {
            levels: self.level_filter.clone(),
            subject: self.subject_filter.clone(),
        }
    }
}

impl Validate for Requirement {
    fn validate(&self) -> Result<()> {
        require_text("requirement.id", &self.id)?;
        match self.kind {
            RequirementKind::Choice => {
                let count = self.choose_count();
                if count == 0 {
                    return Err(PlannerError::configuration(format!(
                        "requirement '{}' has choose_count 0",
                        self.id
                    )));
                }
                if count as usize > self.courses.len() {
                    return Err(PlannerError::configuration(format!(
                        "requirement '{}' chooses {} of only {} courses",
                        self.id,
                        count,
                        self.courses.len()
                    )));
                }
            }
            RequirementKind::LevelFilter => {
                if self.credits_needed.is_none() {
                    return Err(PlannerError::configuration(format!(
                        "level requirement '{}' has no credits_needed",
                        self.id
                    )));
                }
            }
            RequirementKind::Required | RequirementKind::Elective => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub original: CourseCode,
    pub alternatives: Vec<CourseCode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialRules {
    /// Mutually exclusive courses; the first-declared present member counts.
    #[serde(default)]
    pub exclusion_groups: Vec<Vec<CourseCode>>,
    #[serde(default)]
    pub substitutions: Vec<Substitution>,
    /// Free text, reported but never checked.
    #[serde(default)]
    pub additional_requirements: Vec<String>,
}

impl SpecialRules {
    pub fn is_empty(&self) -> bool {
        self.exclusion_groups.is_empty()
            && self.substitutions.is_empty()
            && self.additional_requirements.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub code: String,
    pub name: String,
    #[serde(default = "default_total_credits")]
    pub total_credits: u32,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub special_rules: SpecialRules,
}

impl Program {
    /// Requirements in display order (stable for equal indices).
    pub fn ordered_requirements(&self) -> Vec<&Requirement> {
        let mut reqs: Vec<&Requirement> = self.requirements.iter().collect();
        reqs.sort_by_key(|r| r.order_index);
        reqs
    }
}

impl Validate for Program {
    fn validate(&self) -> Result<()> {
        require_text("program.code", &self.code)?;

        let mut ids = HashSet::new();
        for req in &self.requirements {
            req.validate()?;
            if !ids.insert(req.id.as_str()) {
                return Err(PlannerError::configuration(format!(
                    "program '{}' has duplicate requirement id '{}'",
                    self.code, req.id
                )));
            }
        }

        for group in &self.special_rules.exclusion_groups {
            if group.len() < 2 {
                return Err(PlannerError::configuration(format!(
                    "program '{}' has an exclusion group with fewer than two courses",
                    self.code
                )));
            }
        }

        for sub in &self.special_rules.substitutions {
            if sub.alternatives.is_empty() {
                return Err(PlannerError::configuration(format!(
                    "substitution for '{}' lists no alternatives",
                    sub.original
                )));
            }
        }

        Ok(())
    }
}

/// Filter for `Catalog::list_courses`; empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseFilter {
    #[serde(default)]
    pub levels: BTreeSet<u32>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl CourseFilter {
    pub fn matches(&self, course: &Course) -> bool {
        let level_ok = self.levels.is_empty() || self.levels.contains(&course.level);
        let subject_ok = self
            .subject
            .as_deref()
            .map_or(true, |s| s.trim().eq_ignore_ascii_case(course.subject.trim()));
        level_ok && subject_ok
    }
}
