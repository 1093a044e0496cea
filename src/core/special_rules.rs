//! Exclusion groups, substitutions and free-text program rules.

use crate::domain::model::{CourseCode, Program};
use crate::domain::report::{AppliedSubstitution, SpecialRulesOutcome, Warning, WarningKind};
use std::collections::BTreeSet;
use tracing::debug;

/// Applies the program's special rules to a candidate course set.
///
/// In an exclusion group the first-declared member that is present is kept
/// and every other present member is excluded. A substitution applies when
/// the original is absent and one of its alternatives is present; the first
/// such alternative stands in for the original.
pub fn apply(program: &Program, candidates: &BTreeSet<CourseCode>) -> SpecialRulesOutcome {
    let rules = &program.special_rules;
    let mut outcome = SpecialRulesOutcome::default();

    for group in &rules.exclusion_groups {
        let present: Vec<&CourseCode> = group
            .iter()
            .filter(|code| candidates.contains(*code) && !outcome.is_excluded(code))
            .collect();
        let Some((kept, rest)) = present.split_first() else {
            continue;
        };
        for &excluded in rest {
            debug!("Exclusion group: keeping {}, excluding {}", kept, excluded);
            outcome.warnings.push(Warning::for_course(
                WarningKind::ExcludedCourse,
                excluded,
                format!(
                    "{} cannot be counted together with {}; its credits are excluded",
                    excluded, kept
                ),
            ));
            outcome.excluded_courses.push(excluded.clone());
        }
    }

    for sub in &rules.substitutions {
        if candidates.contains(&sub.original) {
            continue;
        }
        let substitute = sub
            .alternatives
            .iter()
            .find(|alt| candidates.contains(*alt) && !outcome.is_excluded(alt));
        if let Some(substitute) = substitute {
            outcome.warnings.push(Warning::for_course(
                WarningKind::Substitution,
                &sub.original,
                format!("{} is accepted in place of {}", substitute, sub.original),
            ));
            outcome.substitutions.push(AppliedSubstitution {
                original: sub.original.clone(),
                substitute: substitute.clone(),
            });
        }
    }

    for text in &rules.additional_requirements {
        outcome
            .warnings
            .push(Warning::new(WarningKind::AdditionalRequirement, text.clone()));
        outcome.additional_requirements.push(text.clone());
    }

    outcome
}
