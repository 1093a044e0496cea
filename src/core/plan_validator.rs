//! Forward check of a multi-semester plan.

use crate::core::{prerequisite, requirement, special_rules};
use crate::domain::model::{CourseCode, Program};
use crate::domain::plan::{CourseStatus, CreditBand, PlannedCourse, ProposedPlan, Semester};
use crate::domain::ports::Catalog;
use crate::domain::report::{PlanValidation, PlanViolation, Warning, WarningKind};
use std::collections::BTreeSet;
use tracing::debug;

/// Turns proposer output into plan semesters.
///
/// Catalog credits and titles win over whatever the proposer claimed; within
/// a semester courses are ordered by level, then code.
pub fn build_semesters<C: Catalog + ?Sized>(proposed: &ProposedPlan, catalog: &C) -> Vec<Semester> {
    proposed
        .semesters
        .iter()
        .map(|semester| {
            let mut courses: Vec<(u32, PlannedCourse)> = semester
                .courses
                .iter()
                .map(|pc| {
                    let known = catalog.get_course(&pc.code);
                    let level = known.as_ref().map_or(u32::MAX, |c| c.level);
                    let course = PlannedCourse {
                        code: pc.code.clone(),
                        title: known
                            .as_ref()
                            .map(|c| c.title.clone())
                            .or_else(|| pc.title.clone())
                            .unwrap_or_default(),
                        credits: known
                            .as_ref()
                            .map(|c| c.credits)
                            .or(pc.credits)
                            .unwrap_or(0),
                        term: semester.term,
                        year: semester.year,
                        semester: semester.number,
                        status: CourseStatus::Planned,
                        satisfies_requirements: pc.satisfies_requirements.clone(),
                    };
                    (level, course)
                })
                .collect();
            courses.sort_by(|(la, a), (lb, b)| la.cmp(lb).then_with(|| a.code.cmp(&b.code)));

            Semester {
                number: semester.number,
                term: semester.term,
                year: semester.year,
                courses: courses.into_iter().map(|(_, c)| c).collect(),
            }
        })
        .collect()
}

/// Folds `semesters` in order on top of `completed_before`.
///
/// A course's prerequisites must be met by courses finished before its
/// semester; anything else found along the way is a warning. The final
/// course set then has to satisfy every requirement and the program's
/// credit total. Dropped courses are ignored.
pub fn validate_plan<C: Catalog + ?Sized>(
    semesters: &[Semester],
    program: &Program,
    completed_before: &BTreeSet<CourseCode>,
    catalog: &C,
    band: CreditBand,
) -> PlanValidation {
    let mut running = completed_before.clone();
    let mut planned = BTreeSet::new();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for semester in semesters {
        let credits = semester.total_credits();
        if !band.contains(credits) {
            warnings.push(Warning::new(
                WarningKind::CreditLoad,
                format!(
                    "Semester {} ({} year {}) has {} credits, outside the {} credit range",
                    semester.number, semester.term, semester.year, credits, band
                ),
            ));
        }

        // courses in the same semester cannot satisfy each other
        let mut finished_this_term = Vec::new();
        for planned_course in semester.courses.iter().filter(|c| c.counts()) {
            let code = &planned_course.code;
            if completed_before.contains(code) {
                warnings.push(Warning::for_course(
                    WarningKind::DuplicateCourse,
                    code,
                    format!("{} is already completed", code),
                ));
                continue;
            }
            if !planned.insert(code.clone()) {
                warnings.push(Warning::for_course(
                    WarningKind::DuplicateCourse,
                    code,
                    format!("{} is planned more than once", code),
                ));
                continue;
            }
            let Some(course) = catalog.get_course(code) else {
                warnings.push(Warning::for_course(
                    WarningKind::UnknownCourse,
                    code,
                    format!("planned course {} is not in the catalog and was ignored", code),
                ));
                continue;
            };

            let evaluation = course
                .prerequisite_formula
                .as_ref()
                .map(|f| prerequisite::evaluate(f, &running));
            if let Some(evaluation) = evaluation.filter(|e| !e.satisfied) {
                errors.push(PlanViolation::PrerequisiteNotMet {
                    course: code.clone(),
                    semester: semester.number,
                    missing: evaluation.missing.into_iter().collect(),
                });
            }

            if !course.is_offered_in(semester.term) {
                let offered: Vec<&str> = course.typically_offered.iter().map(|t| t.as_str()).collect();
                warnings.push(Warning::for_course(
                    WarningKind::TermNotOffered,
                    code,
                    format!(
                        "{} is not typically offered in {} (offered: {})",
                        code,
                        semester.term,
                        offered.join(", ")
                    ),
                ));
            }

            finished_this_term.push(code.clone());
        }
        running.extend(finished_this_term);
    }

    let rules = special_rules::apply(program, &running);
    let requirements = requirement::validate_with_rules(program, &running, catalog, &rules);

    for progress in requirements.unsatisfied() {
        errors.push(PlanViolation::RequirementUnsatisfied {
            requirement_id: progress.requirement_id.clone(),
            requirement_name: progress.requirement_name.clone(),
            progress_percentage: progress.progress_percentage,
        });
    }
    if requirements.total_credits_completed < program.total_credits {
        errors.push(PlanViolation::InsufficientCredits {
            planned: requirements.total_credits_completed,
            required: program.total_credits,
        });
    }

    warnings.extend(requirements.warnings.iter().cloned());
    debug!(
        "Plan check for {}: {} errors, {} warnings",
        program.code,
        errors.len(),
        warnings.len()
    );

    PlanValidation {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        requirements,
        special_rules: rules,
    }
}
