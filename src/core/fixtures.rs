//! Test data shared by the engine's unit tests.

use crate::adapters::catalog::InMemoryCatalog;
use crate::domain::model::{Course, CourseCode, Program, Requirement, RequirementKind, Term};
use crate::domain::plan::{ProposedCourse, ProposedPlan, ProposedSemester};
use crate::domain::ports::Catalog;
use std::collections::BTreeSet;

pub(crate) const SAMPLE_CATALOG: &str = include_str!("../../demos/catalog.json");

pub(crate) fn sample_catalog() -> InMemoryCatalog {
    InMemoryCatalog::from_json_str(SAMPLE_CATALOG).expect("sample catalog is valid")
}

pub(crate) fn sample_program() -> Program {
    sample_catalog()
        .get_program("honors-cs")
        .expect("sample program exists")
}

pub(crate) fn codes(raw: &[&str]) -> BTreeSet<CourseCode> {
    raw.iter().map(CourseCode::new).collect()
}

pub(crate) fn course(code: &str, credits: u32, level: u32, subject: &str) -> Course {
    Course {
        code: CourseCode::new(code),
        title: format!("{} title", code),
        credits,
        level,
        subject: subject.to_string(),
        prerequisite_formula: None,
        typically_offered: BTreeSet::new(),
    }
}

pub(crate) fn requirement(id: &str, kind: RequirementKind, courses: &[&str]) -> Requirement {
    Requirement {
        id: id.to_string(),
        name: id.to_string(),
        kind,
        courses: courses.iter().map(CourseCode::new).collect(),
        credits_needed: None,
        choose_count: None,
        level_filter: BTreeSet::new(),
        subject_filter: None,
        order_index: 0,
    }
}

pub(crate) fn program(requirements: Vec<Requirement>) -> Program {
    Program {
        code: "test-program".to_string(),
        name: "Test Program".to_string(),
        total_credits: 0,
        requirements,
        special_rules: Default::default(),
    }
}

pub(crate) fn proposal(semesters: &[(Term, u32, &[&str])]) -> ProposedPlan {
    ProposedPlan {
        semesters: semesters
            .iter()
            .enumerate()
            .map(|(i, (term, year, courses))| ProposedSemester {
                number: i as u32 + 1,
                term: *term,
                year: *year,
                courses: courses
                    .iter()
                    .map(|code| ProposedCourse {
                        code: CourseCode::new(code),
                        title: None,
                        credits: None,
                        satisfies_requirements: vec![],
                    })
                    .collect(),
            })
            .collect(),
        warnings: vec![],
        notes: None,
    }
}

/// A six-semester plan that completes `honors-cs` from scratch.
pub(crate) fn valid_proposal() -> ProposedPlan {
    proposal(&[
        (Term::Fall, 1, &["CMPUT 174", "MATH 125", "ENGL 103"][..]),
        (Term::Winter, 1, &["CMPUT 175", "CMPUT 272"][..]),
        (Term::Fall, 2, &["CMPUT 201", "CMPUT 204"][..]),
        (Term::Winter, 2, &["CMPUT 304", "CMPUT 366"][..]),
        (Term::Fall, 3, &["CMPUT 301", "CMPUT 466"][..]),
        (Term::Winter, 3, &["CMPUT 401"][..]),
    ])
}
