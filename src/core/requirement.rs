//! Requirement progress for one program against a set of completed (or
//! planned) courses.

use crate::core::special_rules;
use crate::domain::model::{Course, CourseCode, Program, Requirement, RequirementKind};
use crate::domain::ports::Catalog;
use crate::domain::report::{
    RequirementProgress, RequirementValidationResult, SpecialRulesOutcome, Warning, WarningKind,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Upper bound on suggested courses per level requirement.
pub const MAX_SUGGESTIONS: usize = 10;

pub fn validate<C: Catalog + ?Sized>(
    program: &Program,
    completed: &BTreeSet<CourseCode>,
    catalog: &C,
) -> RequirementValidationResult {
    let rules = special_rules::apply(program, completed);
    validate_with_rules(program, completed, catalog, &rules)
}

/// Same as [`validate`] with special rules already applied to `completed`.
pub fn validate_with_rules<C: Catalog + ?Sized>(
    program: &Program,
    completed: &BTreeSet<CourseCode>,
    catalog: &C,
    rules: &SpecialRulesOutcome,
) -> RequirementValidationResult {
    let mut ctx = Tally::new(completed, catalog, rules);

    let ordered = program.ordered_requirements();
    let mut slots: Vec<Option<RequirementProgress>> = vec![None; ordered.len()];

    // Electives only see credits no other requirement claimed, so they go last.
    for (slot, req) in slots.iter_mut().zip(&ordered) {
        *slot = match req.kind {
            RequirementKind::Required => Some(ctx.required(req)),
            RequirementKind::Choice => Some(ctx.choice(req)),
            RequirementKind::LevelFilter => Some(ctx.level_filter(req)),
            RequirementKind::Elective => None,
        };
    }
    for (slot, req) in slots.iter_mut().zip(&ordered) {
        if slot.is_none() {
            *slot = Some(ctx.elective(req));
        }
    }
    let requirements: Vec<RequirementProgress> = slots.into_iter().flatten().collect();

    let satisfied_count = requirements.iter().filter(|r| r.is_satisfied).count();
    let overall_progress = if requirements.is_empty() {
        0.0
    } else {
        satisfied_count as f64 / requirements.len() as f64 * 100.0
    };
    let total_credits_completed: u32 = ctx.counted.values().map(|c| c.credits).sum();
    let is_complete = satisfied_count == requirements.len()
        && total_credits_completed >= program.total_credits;

    debug!(
        "Validated {} requirements for {}: {}/{} satisfied, {} credits",
        requirements.len(),
        program.code,
        satisfied_count,
        requirements.len(),
        total_credits_completed
    );

    let mut warnings = rules.warnings.clone();
    warnings.extend(ctx.warnings);

    RequirementValidationResult {
        program_code: program.code.clone(),
        program_name: program.name.clone(),
        total_credits_required: program.total_credits,
        total_credits_completed,
        requirements,
        overall_progress,
        is_complete,
        excluded_courses: rules.excluded_courses.clone(),
        warnings,
    }
}

pub fn progress_percentage(credits_completed: u32, credits_needed: u32, satisfied: bool) -> f64 {
    if credits_needed > 0 {
        (credits_completed as f64 / credits_needed as f64 * 100.0).min(100.0)
    } else if satisfied {
        100.0
    } else {
        0.0
    }
}

/// Working state for one validation pass.
struct Tally<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    rules: &'a SpecialRulesOutcome,
    /// Completed courses that are known to the catalog and not excluded.
    counted: BTreeMap<CourseCode, Course>,
    /// Courses claimed by a non-elective requirement.
    claimed: BTreeSet<CourseCode>,
    warned: BTreeSet<CourseCode>,
    warnings: Vec<Warning>,
}

impl<'a, C: Catalog + ?Sized> Tally<'a, C> {
    fn new(completed: &BTreeSet<CourseCode>, catalog: &'a C, rules: &'a SpecialRulesOutcome) -> Self {
        let mut tally = Self {
            catalog,
            rules,
            counted: BTreeMap::new(),
            claimed: BTreeSet::new(),
            warned: BTreeSet::new(),
            warnings: Vec::new(),
        };
        for code in completed {
            if rules.is_excluded(code) {
                continue;
            }
            match catalog.get_course(code) {
                Some(course) => {
                    tally.counted.insert(code.clone(), course);
                }
                None => tally.warn_unknown(code, "completed course"),
            }
        }
        tally
    }

    fn warn_unknown(&mut self, code: &CourseCode, role: &str) {
        if self.warned.insert(code.clone()) {
            self.warnings.push(Warning::for_course(
                WarningKind::UnknownCourse,
                code,
                format!("{} {} is not in the catalog and was ignored", role, code),
            ));
        }
    }

    /// Listed courses that exist in the catalog; the rest are warned about.
    fn known_listed(&mut self, req: &Requirement) -> Vec<Course> {
        let mut known = Vec::new();
        for code in &req.courses {
            match self.catalog.get_course(code) {
                Some(course) => known.push(course),
                None => self.warn_unknown(code, "required course"),
            }
        }
        known
    }

    /// The completed course standing for each listed course, directly or
    /// through a substitution. A completed course fills at most one slot:
    /// direct matches are taken first, substitutes only fill what is left.
    fn resolve_listed(&self, listed: &[Course]) -> Vec<Option<Course>> {
        let mut used = BTreeSet::new();
        let mut resolved: Vec<Option<Course>> = listed
            .iter()
            .map(|course| {
                let done = self.counted.get(&course.code)?;
                used.insert(done.code.clone());
                Some(done.clone())
            })
            .collect();

        for (slot, course) in resolved.iter_mut().zip(listed) {
            if slot.is_some() {
                continue;
            }
            let Some(done) = self
                .rules
                .substitute_for(&course.code)
                .and_then(|sub| self.counted.get(sub))
            else {
                continue;
            };
            if used.insert(done.code.clone()) {
                *slot = Some(done.clone());
            }
        }
        resolved
    }

    fn required(&mut self, req: &Requirement) -> RequirementProgress {
        let listed = self.known_listed(req);
        let mut counted = Vec::new();
        let mut remaining = Vec::new();
        let mut credits_completed = 0;
        for (course, resolved) in listed.iter().zip(self.resolve_listed(&listed)) {
            match resolved {
                Some(done) => {
                    credits_completed += done.credits;
                    counted.push(done.code.clone());
                }
                None => remaining.push(course.code.clone()),
            }
        }
        let credits_needed = req
            .credits_needed
            .unwrap_or_else(|| listed.iter().map(|c| c.credits).sum());
        let satisfied = remaining.is_empty();
        self.claimed.extend(counted.iter().cloned());
        progress(req, credits_completed, credits_needed, satisfied, counted, remaining)
    }

    fn choice(&mut self, req: &Requirement) -> RequirementProgress {
        let listed = self.known_listed(req);
        let choose = req.choose_count() as usize;

        let mut matches: Vec<Course> = Vec::new();
        let mut remaining = Vec::new();
        for (course, resolved) in listed.iter().zip(self.resolve_listed(&listed)) {
            match resolved {
                Some(done) => matches.push(done),
                None => remaining.push(course.code.clone()),
            }
        }
        // highest credits first; stable sort keeps declaration order on ties
        matches.sort_by(|a, b| b.credits.cmp(&a.credits));
        let chosen: Vec<&Course> = matches.iter().take(choose).collect();
        let credits_completed: u32 = chosen.iter().map(|c| c.credits).sum();
        let counted: Vec<CourseCode> = chosen.iter().map(|c| c.code.clone()).collect();
        let satisfied = matches.len() >= choose;

        let credits_needed = req.credits_needed.unwrap_or_else(|| {
            let mut credits: Vec<u32> = listed.iter().map(|c| c.credits).collect();
            credits.sort_unstable();
            credits.into_iter().take(choose).sum()
        });

        self.claimed.extend(counted.iter().cloned());
        progress(req, credits_completed, credits_needed, satisfied, counted, remaining)
    }

    fn level_filter(&mut self, req: &Requirement) -> RequirementProgress {
        let credits_needed = req.credits_needed.unwrap_or(0);
        let candidates = self.catalog.list_courses(&req.course_filter());

        let mut counted = Vec::new();
        let mut raw_credits = 0;
        let mut suggestions = Vec::new();
        for course in &candidates {
            if self.counted.contains_key(&course.code) {
                // stop claiming once the cap is reached so overflow can count as elective
                if credits_needed == 0 || raw_credits < credits_needed {
                    raw_credits += course.credits;
                    counted.push(course.code.clone());
                }
            } else if !self.rules.is_excluded(&course.code) && suggestions.len() < MAX_SUGGESTIONS {
                suggestions.push(course.code.clone());
            }
        }

        let credits_completed = if credits_needed > 0 {
            raw_credits.min(credits_needed)
        } else {
            raw_credits
        };
        let satisfied = credits_completed >= credits_needed;
        let remaining = if satisfied { Vec::new() } else { suggestions };

        self.claimed.extend(counted.iter().cloned());
        progress(req, credits_completed, credits_needed, satisfied, counted, remaining)
    }

    fn elective(&mut self, req: &Requirement) -> RequirementProgress {
        let cap = req.credits_needed;
        let listed: BTreeSet<CourseCode> = req.courses.iter().cloned().collect();

        let mut counted = Vec::new();
        let mut tally = 0;
        for (code, course) in &self.counted {
            if self.claimed.contains(code) || !req.matches_filters(course) {
                continue;
            }
            if !listed.is_empty() && !listed.contains(code) {
                continue;
            }
            if cap.is_some_and(|needed| tally >= needed) {
                break;
            }
            tally += course.credits;
            counted.push(code.clone());
        }
        self.claimed.extend(counted.iter().cloned());

        match cap {
            Some(needed) => {
                let satisfied = tally >= needed;
                progress(req, tally.min(needed), needed, satisfied, counted, Vec::new())
            }
            None => progress(req, tally, 0, true, counted, Vec::new()),
        }
    }
}

fn progress(
    req: &Requirement,
    credits_completed: u32,
    credits_needed: u32,
    is_satisfied: bool,
    courses_counted: Vec<CourseCode>,
    remaining: Vec<CourseCode>,
) -> RequirementProgress {
    RequirementProgress {
        requirement_id: req.id.clone(),
        requirement_name: req.name.clone(),
        kind: req.kind,
        credits_completed,
        credits_needed,
        is_satisfied,
        courses_counted,
        remaining,
        progress_percentage: progress_percentage(credits_completed, credits_needed, is_satisfied),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalog::InMemoryCatalog;
    use crate::core::fixtures::{codes, course, program, requirement, sample_catalog, sample_program};
    use crate::domain::model::{SpecialRules, Substitution};

    fn find<'a>(result: &'a RequirementValidationResult, id: &str) -> &'a RequirementProgress {
        result
            .requirements
            .iter()
            .find(|r| r.requirement_id == id)
            .unwrap()
    }

    #[test]
    fn test_choice_counts_only_highest_credit_picks() {
        let catalog = InMemoryCatalog::new()
            .with_course(course("A 100", 3, 100, "A"))
            .with_course(course("B 100", 4, 100, "B"))
            .with_course(course("C 100", 5, 100, "C"));
        let mut req = requirement("pick-two", RequirementKind::Choice, &["A 100", "B 100", "C 100"]);
        req.choose_count = Some(2);
        let p = program(vec![req]);

        let result = validate(&p, &codes(&["A 100", "B 100", "C 100"]), &catalog);
        let choice = find(&result, "pick-two");
        assert!(choice.is_satisfied);
        assert_eq!(choice.credits_completed, 9);
        assert_eq!(choice.credits_needed, 7);
        assert_eq!(choice.courses_counted, vec![CourseCode::new("C 100"), CourseCode::new("B 100")]);
        assert_eq!(choice.progress_percentage, 100.0);
    }

    #[test]
    fn test_level_filter_caps_credits() {
        let mut catalog = InMemoryCatalog::new();
        let mut completed = Vec::new();
        for (i, level) in [300, 300, 300, 400, 400, 400, 400].into_iter().enumerate() {
            let code = format!("CMPUT {}", level + i as u32);
            catalog = catalog.with_course(course(&code, 3, level, "CMPUT"));
            completed.push(code);
        }
        catalog = catalog.with_course(course("MATH 300", 3, 300, "MATH"));
        completed.push("MATH 300".to_string());

        let mut req = requirement("senior", RequirementKind::LevelFilter, &[]);
        req.level_filter = [300, 400].into_iter().collect();
        req.subject_filter = Some("CMPUT".to_string());
        req.credits_needed = Some(18);
        let p = program(vec![req]);

        let completed: BTreeSet<CourseCode> = completed.iter().map(CourseCode::new).collect();
        let result = validate(&p, &completed, &catalog);
        let senior = find(&result, "senior");
        assert!(senior.is_satisfied);
        assert_eq!(senior.credits_completed, 18);
        assert_eq!(senior.courses_counted.len(), 6);
        assert!(!senior.courses_counted.contains(&CourseCode::new("MATH 300")));
        assert_eq!(result.total_credits_completed, 24);
    }

    #[test]
    fn test_level_filter_suggests_uncompleted_matches() {
        let catalog = sample_catalog();
        let result = validate(&sample_program(), &codes(&["CMPUT 301"]), &catalog);
        let senior = find(&result, "senior-cmput");
        assert!(!senior.is_satisfied);
        assert_eq!(senior.credits_completed, 3);
        assert!((senior.progress_percentage - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            senior.remaining,
            vec![
                CourseCode::new("CMPUT 304"),
                CourseCode::new("CMPUT 366"),
                CourseCode::new("CMPUT 401"),
                CourseCode::new("CMPUT 466"),
            ]
        );
    }

    #[test]
    fn test_excluded_course_credits_are_not_counted() {
        let catalog = sample_catalog();
        let result = validate(&sample_program(), &codes(&["CMPUT 201", "CMPUT 275"]), &catalog);

        assert_eq!(result.excluded_courses, vec![CourseCode::new("CMPUT 275")]);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::ExcludedCourse));
        assert_eq!(result.total_credits_completed, 3);
        // CMPUT 275 must not reach the elective pool either
        assert!(find(&result, "open-electives").courses_counted.is_empty());
    }

    #[test]
    fn test_exclusion_applies_to_level_requirements() {
        let catalog = InMemoryCatalog::new()
            .with_course(course("X 300", 3, 300, "X"))
            .with_course(course("Y 300", 3, 300, "X"));
        let mut req = requirement("level", RequirementKind::LevelFilter, &[]);
        req.level_filter = [300].into_iter().collect();
        req.credits_needed = Some(6);
        let mut p = program(vec![req]);
        p.special_rules = SpecialRules {
            exclusion_groups: vec![vec![CourseCode::new("X 300"), CourseCode::new("Y 300")]],
            ..Default::default()
        };

        let result = validate(&p, &codes(&["X 300", "Y 300"]), &catalog);
        let level = find(&result, "level");
        assert!(!level.is_satisfied);
        assert_eq!(level.credits_completed, 3);
    }

    #[test]
    fn test_required_gives_partial_credit() {
        let result = validate(&sample_program(), &codes(&["CMPUT 174", "CMPUT 175"]), &sample_catalog());
        let core = find(&result, "core");
        assert!(!core.is_satisfied);
        assert_eq!(core.credits_completed, 6);
        assert_eq!(core.credits_needed, 12);
        assert_eq!(core.progress_percentage, 50.0);
        assert_eq!(core.remaining, vec![CourseCode::new("CMPUT 201"), CourseCode::new("CMPUT 204")]);
    }

    #[test]
    fn test_unknown_listed_course_is_a_warning() {
        let catalog = InMemoryCatalog::new().with_course(course("A 100", 3, 100, "A"));
        let p = program(vec![requirement("core", RequirementKind::Required, &["A 100", "GHOST 999"])]);

        let result = validate(&p, &codes(&["A 100"]), &catalog);
        assert!(find(&result, "core").is_satisfied);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::UnknownCourse);
        assert_eq!(result.warnings[0].course, Some(CourseCode::new("GHOST 999")));
    }

    #[test]
    fn test_substitute_satisfies_original() {
        let result = validate(
            &sample_program(),
            &codes(&["CMPUT 114", "CMPUT 175", "CMPUT 201", "CMPUT 204"]),
            &sample_catalog(),
        );
        let core = find(&result, "core");
        assert!(core.is_satisfied);
        assert!(core.courses_counted.contains(&CourseCode::new("CMPUT 114")));
        assert!(result.warnings.iter().any(|w| w.kind == WarningKind::Substitution));
    }

    #[test]
    fn test_substitute_already_listed_fills_one_slot() {
        let catalog = InMemoryCatalog::new()
            .with_course(course("MATH 125", 3, 100, "MATH"))
            .with_course(course("MATH 127", 3, 100, "MATH"))
            .with_course(course("STAT 151", 3, 100, "STAT"));
        let mut choice = requirement(
            "math",
            RequirementKind::Choice,
            &["MATH 125", "MATH 127", "STAT 151"],
        );
        choice.choose_count = Some(2);
        let core = requirement("core", RequirementKind::Required, &["MATH 125", "MATH 127"]);
        let mut p = program(vec![choice, core]);
        p.special_rules = SpecialRules {
            substitutions: vec![Substitution {
                original: CourseCode::new("MATH 125"),
                alternatives: vec![CourseCode::new("MATH 127")],
            }],
            ..Default::default()
        };

        let result = validate(&p, &codes(&["MATH 127"]), &catalog);

        let math = find(&result, "math");
        assert!(!math.is_satisfied);
        assert_eq!(math.credits_completed, 3);
        assert_eq!(math.courses_counted, vec![CourseCode::new("MATH 127")]);

        let core = find(&result, "core");
        assert!(!core.is_satisfied);
        assert_eq!(core.credits_completed, 3);
        assert_eq!(core.remaining, vec![CourseCode::new("MATH 125")]);

        // with both courses completed each fills its own slot
        let both = validate(&p, &codes(&["MATH 125", "MATH 127"]), &catalog);
        assert!(find(&both, "math").is_satisfied);
        assert!(find(&both, "core").is_satisfied);
        assert_eq!(find(&both, "core").credits_completed, 6);
    }

    #[test]
    fn test_elective_uses_leftover_credits() {
        let result = validate(&sample_program(), &codes(&["CMPUT 174", "ENGL 103"]), &sample_catalog());
        let electives = find(&result, "open-electives");
        assert!(electives.is_satisfied);
        assert_eq!(electives.courses_counted, vec![CourseCode::new("ENGL 103")]);
    }

    #[test]
    fn test_elective_without_credit_target_is_satisfied() {
        let p = program(vec![requirement("free", RequirementKind::Elective, &[])]);
        let result = validate(&p, &BTreeSet::new(), &InMemoryCatalog::new());
        let free = find(&result, "free");
        assert!(free.is_satisfied);
        assert_eq!(free.progress_percentage, 100.0);
    }

    #[test]
    fn test_full_program_is_complete() {
        let completed = codes(&[
            "CMPUT 174", "CMPUT 175", "CMPUT 201", "CMPUT 204", "CMPUT 272", "MATH 125",
            "ENGL 103", "CMPUT 301", "CMPUT 304", "CMPUT 366", "CMPUT 401", "CMPUT 466",
        ]);
        let result = validate(&sample_program(), &completed, &sample_catalog());

        assert!(result.requirements.iter().all(|r| r.is_satisfied));
        assert_eq!(result.total_credits_completed, 36);
        assert_eq!(result.overall_progress, 100.0);
        assert!(result.is_complete);
        // requirements come back in display order
        let ids: Vec<&str> = result.requirements.iter().map(|r| r.requirement_id.as_str()).collect();
        assert_eq!(ids, vec!["core", "linear-algebra", "senior-cmput", "open-electives"]);
    }

    #[test]
    fn test_overall_progress_counts_requirements() {
        let result = validate(&sample_program(), &codes(&["MATH 127"]), &sample_catalog());
        // only linear algebra is met; MATH 127 is claimed there, not by the electives
        assert_eq!(result.overall_progress, 25.0);
        assert!(!result.is_complete);

        let empty = validate(&program(vec![]), &BTreeSet::new(), &InMemoryCatalog::new());
        assert_eq!(empty.overall_progress, 0.0);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let catalog = sample_catalog();
        let program = sample_program();
        let completed = codes(&["CMPUT 174", "CMPUT 275", "CMPUT 201", "MATH 125", "NOPE 1"]);

        let first = validate(&program, &completed, &catalog);
        let second = validate(&program, &completed, &catalog);
        assert_eq!(first, second);
    }
}
