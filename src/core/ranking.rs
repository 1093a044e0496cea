//! Scores the courses a student can take next.

use crate::core::{prerequisite, special_rules};
use crate::domain::model::{Course, CourseCode, Program, RequirementKind};
use crate::domain::ports::Catalog;
use crate::domain::report::RankedCourse;
use std::collections::BTreeSet;
use tracing::debug;

/// Bonus for a course whose prerequisites are already met.
const PREREQUISITES_MET_BONUS: f64 = 3.0;

pub fn kind_weight(kind: RequirementKind) -> f64 {
    match kind {
        RequirementKind::Required => 10.0,
        RequirementKind::Choice => 5.0,
        RequirementKind::LevelFilter => 2.0,
        RequirementKind::Elective => 0.0,
    }
}

/// Lower levels score higher: 100-level gets 5, 500-level gets 1.
fn foundational_bonus(level: u32) -> f64 {
    6.0 - level as f64 / 100.0
}

/// Courses not yet completed, not excluded by a special rule, and whose
/// prerequisites are satisfied by `completed`, best first.
///
/// Ties on score are broken by course code, so the order is total.
pub fn rank<C: Catalog + ?Sized>(
    program: &Program,
    completed: &BTreeSet<CourseCode>,
    catalog: &C,
) -> Vec<RankedCourse> {
    let mut candidates: BTreeSet<CourseCode> = BTreeSet::new();
    for req in &program.requirements {
        candidates.extend(req.courses.iter().cloned());
        if req.kind == RequirementKind::LevelFilter {
            candidates.extend(
                catalog
                    .list_courses(&req.course_filter())
                    .into_iter()
                    .map(|c| c.code),
            );
        }
    }

    let mut ranked: Vec<RankedCourse> = candidates
        .into_iter()
        .filter(|code| !completed.contains(code))
        .filter_map(|code| catalog.get_course(&code))
        .filter(|course| !is_excluded(program, completed, &course.code))
        .filter(|course| prerequisite::satisfied(course.prerequisite_formula.as_ref(), completed))
        .map(|course| score(program, course))
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.code.cmp(&b.code)));
    debug!("Ranked {} available courses for {}", ranked.len(), program.code);
    ranked
}

fn is_excluded(program: &Program, completed: &BTreeSet<CourseCode>, code: &CourseCode) -> bool {
    if program.special_rules.exclusion_groups.is_empty() {
        return false;
    }
    let mut with_candidate = completed.clone();
    with_candidate.insert(code.clone());
    special_rules::apply(program, &with_candidate).is_excluded(code)
}

fn score(program: &Program, course: Course) -> RankedCourse {
    let matched: Vec<_> = program
        .ordered_requirements()
        .into_iter()
        .filter(|req| {
            req.lists(&course.code)
                || (req.kind == RequirementKind::LevelFilter && req.matches_filters(&course))
        })
        .collect();

    let score = matched.iter().map(|req| kind_weight(req.kind)).sum::<f64>()
        + PREREQUISITES_MET_BONUS
        + foundational_bonus(course.level);

    RankedCourse {
        score,
        prerequisites_met: true,
        satisfies_requirements: matched.iter().map(|req| req.id.clone()).collect(),
        typically_offered: course.typically_offered.iter().copied().collect(),
        code: course.code,
        title: course.title,
        credits: course.credits,
        level: course.level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalog::InMemoryCatalog;
    use crate::core::fixtures::{codes, course, program, requirement, sample_catalog, sample_program};
    use crate::domain::model::{PrerequisiteFormula, SpecialRules};

    #[test]
    fn test_rank_orders_by_score_then_code() {
        let ranked = rank(&sample_program(), &codes(&["CMPUT 174"]), &sample_catalog());
        let order: Vec<&str> = ranked.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(order, vec!["CMPUT 175", "MATH 125", "MATH 127"]);

        assert_eq!(ranked[0].score, 18.0);
        assert_eq!(ranked[0].satisfies_requirements, vec!["core".to_string()]);
        assert_eq!(ranked[1].score, 13.0);
        assert_eq!(ranked[1].score, ranked[2].score);
    }

    #[test]
    fn test_rank_includes_level_requirement_matches() {
        let completed = codes(&["CMPUT 174", "CMPUT 175", "CMPUT 201", "CMPUT 204", "MATH 125"]);
        let ranked = rank(&sample_program(), &completed, &sample_catalog());

        let c301 = ranked.iter().find(|r| r.code.as_str() == "CMPUT 301").unwrap();
        assert_eq!(c301.satisfies_requirements, vec!["senior-cmput".to_string()]);
        // LevelFilter weight + prerequisites met + 300-level bonus
        assert_eq!(c301.score, 2.0 + 3.0 + 3.0);
        assert!(ranked.iter().all(|r| !completed.contains(&r.code)));
        // CMPUT 401 still needs CMPUT 301
        assert!(ranked.iter().all(|r| r.code.as_str() != "CMPUT 401"));
    }

    #[test]
    fn test_rank_skips_excluded_courses() {
        let catalog = InMemoryCatalog::new()
            .with_course(course("X 100", 3, 100, "X"))
            .with_course(course("Y 100", 3, 100, "X"))
            .with_course(course("Z 100", 3, 100, "X"));
        let mut p = program(vec![requirement(
            "pick",
            RequirementKind::Choice,
            &["X 100", "Y 100", "Z 100"],
        )]);
        p.special_rules = SpecialRules {
            exclusion_groups: vec![vec![CourseCode::new("X 100"), CourseCode::new("Y 100")]],
            ..Default::default()
        };

        let ranked = rank(&p, &codes(&["X 100"]), &catalog);
        let order: Vec<&str> = ranked.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(order, vec!["Z 100"]);
    }

    #[test]
    fn test_rank_requires_prerequisites() {
        let mut advanced = course("B 200", 3, 200, "B");
        advanced.prerequisite_formula = Some(PrerequisiteFormula::course("A 100"));
        let catalog = InMemoryCatalog::new()
            .with_course(course("A 100", 3, 100, "A"))
            .with_course(advanced);
        let p = program(vec![requirement("core", RequirementKind::Required, &["A 100", "B 200"])]);

        let ranked = rank(&p, &BTreeSet::new(), &catalog);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].code.as_str(), "A 100");

        let ranked = rank(&p, &codes(&["A 100"]), &catalog);
        assert_eq!(ranked[0].code.as_str(), "B 200");
        assert!(ranked[0].prerequisites_met);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let first = rank(&sample_program(), &BTreeSet::new(), &sample_catalog());
        let second = rank(&sample_program(), &BTreeSet::new(), &sample_catalog());
        assert_eq!(first, second);
    }
}
