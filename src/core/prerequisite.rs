//! Prerequisite formula evaluation and tree expansion.

use crate::domain::model::{Course, CourseCode, PrerequisiteFormula};
use crate::domain::ports::Catalog;
use crate::domain::report::{PrerequisiteCheckResult, PrerequisiteNode};
use crate::utils::error::{PlannerError, Result};
use std::collections::BTreeSet;
use tracing::debug;

pub const DEFAULT_TREE_DEPTH: u32 = 5;
pub const NO_PREREQUISITES: &str = "No prerequisites required";

/// Outcome of evaluating one formula against a completed set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaEvaluation {
    pub satisfied: bool,
    /// One actionable set of courses that would satisfy the formula.
    pub missing: BTreeSet<CourseCode>,
    /// Completed courses that contribute to the formula.
    pub satisfied_courses: BTreeSet<CourseCode>,
}

impl FormulaEvaluation {
    fn vacuous() -> Self {
        Self {
            satisfied: true,
            ..Self::default()
        }
    }
}

pub fn evaluate(formula: &PrerequisiteFormula, completed: &BTreeSet<CourseCode>) -> FormulaEvaluation {
    match formula {
        PrerequisiteFormula::Course(code) => {
            let mut result = FormulaEvaluation::default();
            if completed.contains(code) {
                result.satisfied = true;
                result.satisfied_courses.insert(code.clone());
            } else {
                result.missing.insert(code.clone());
            }
            result
        }
        PrerequisiteFormula::And(children) => {
            children
                .iter()
                .map(|child| evaluate(child, completed))
                .fold(FormulaEvaluation::vacuous(), |mut acc, child| {
                    acc.satisfied &= child.satisfied;
                    acc.missing.extend(child.missing);
                    acc.satisfied_courses.extend(child.satisfied_courses);
                    acc
                })
        }
        PrerequisiteFormula::Or(children) => {
            if children.is_empty() {
                return FormulaEvaluation::vacuous();
            }
            let evaluations: Vec<FormulaEvaluation> =
                children.iter().map(|child| evaluate(child, completed)).collect();

            if let Some(hit) = evaluations.iter().find(|e| e.satisfied) {
                return FormulaEvaluation {
                    satisfied: true,
                    missing: BTreeSet::new(),
                    satisfied_courses: hit.satisfied_courses.clone(),
                };
            }

            // min_by_key keeps the first of equal minima, so declaration order breaks ties
            evaluations
                .into_iter()
                .min_by_key(|e| e.missing.len())
                .unwrap_or_else(FormulaEvaluation::vacuous)
        }
    }
}

/// An absent formula is trivially satisfied.
pub fn satisfied(formula: Option<&PrerequisiteFormula>, completed: &BTreeSet<CourseCode>) -> bool {
    formula.map_or(true, |f| evaluate(f, completed).satisfied)
}

pub fn missing(
    formula: Option<&PrerequisiteFormula>,
    completed: &BTreeSet<CourseCode>,
) -> BTreeSet<CourseCode> {
    formula.map_or_else(BTreeSet::new, |f| evaluate(f, completed).missing)
}

/// Human-readable form, e.g. `CMPUT 175 AND (MATH 125 OR MATH 127)`.
pub fn describe(formula: Option<&PrerequisiteFormula>) -> String {
    match formula {
        Some(f) => describe_node(f, false),
        None => NO_PREREQUISITES.to_string(),
    }
}

fn describe_node(formula: &PrerequisiteFormula, nested: bool) -> String {
    let (children, joiner) = match formula {
        PrerequisiteFormula::Course(code) => return code.to_string(),
        PrerequisiteFormula::And(children) => (children, " AND "),
        PrerequisiteFormula::Or(children) => (children, " OR "),
    };
    if children.len() == 1 {
        return describe_node(&children[0], nested);
    }
    let text = children
        .iter()
        .map(|child| describe_node(child, true))
        .collect::<Vec<_>>()
        .join(joiner);
    if nested {
        format!("({})", text)
    } else {
        text
    }
}

pub fn check_course(course: &Course, completed: &BTreeSet<CourseCode>) -> PrerequisiteCheckResult {
    let formula = course.prerequisite_formula.as_ref();
    let evaluation = formula.map_or_else(FormulaEvaluation::vacuous, |f| evaluate(f, completed));
    debug!(
        "Prerequisite check for {}: satisfied={}, missing={}",
        course.code,
        evaluation.satisfied,
        evaluation.missing.len()
    );
    PrerequisiteCheckResult {
        course_code: course.code.clone(),
        is_valid: evaluation.satisfied,
        missing_courses: evaluation.missing.into_iter().collect(),
        satisfied_prerequisites: evaluation.satisfied_courses.into_iter().collect(),
        formula_description: describe(formula),
    }
}

/// Expands the prerequisite graph below `code`.
///
/// A course met again on the current path is marked `cycle` and not
/// expanded; nodes at `max_depth` that still have prerequisites are marked
/// `truncated`. Codes the catalog does not know are skipped.
pub fn prerequisite_tree<C: Catalog + ?Sized>(
    catalog: &C,
    code: &CourseCode,
    max_depth: u32,
) -> Result<PrerequisiteNode> {
    let root = catalog
        .get_course(code)
        .ok_or_else(|| PlannerError::course_not_found(code.as_str()))?;
    let mut path = Vec::new();
    Ok(expand(catalog, &root, 0, max_depth, &mut path))
}

fn expand<C: Catalog + ?Sized>(
    catalog: &C,
    course: &Course,
    depth: u32,
    max_depth: u32,
    path: &mut Vec<CourseCode>,
) -> PrerequisiteNode {
    let mut node = leaf_node(course, depth);
    let Some(formula) = &course.prerequisite_formula else {
        return node;
    };
    if depth >= max_depth {
        node.truncated = true;
        return node;
    }

    path.push(course.code.clone());
    for child_code in formula.course_codes() {
        let Some(child) = catalog.get_course(&child_code) else {
            debug!("Skipping unknown prerequisite {} of {}", child_code, course.code);
            continue;
        };
        if path.contains(&child_code) {
            let mut cycle = leaf_node(&child, depth + 1);
            cycle.cycle = true;
            node.prerequisites.push(cycle);
        } else {
            node.prerequisites
                .push(expand(catalog, &child, depth + 1, max_depth, path));
        }
    }
    path.pop();
    node
}

fn leaf_node(course: &Course, depth: u32) -> PrerequisiteNode {
    PrerequisiteNode {
        course_code: course.code.clone(),
        title: course.title.clone(),
        depth,
        formula: course.prerequisite_formula.clone(),
        prerequisites: Vec::new(),
        cycle: false,
        truncated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalog::InMemoryCatalog;
    use crate::core::fixtures::{codes, course, sample_catalog};

    fn leaf(code: &str) -> PrerequisiteFormula {
        PrerequisiteFormula::course(code)
    }

    #[test]
    fn test_and_reports_missing_leaf() {
        let formula = PrerequisiteFormula::all_of([leaf("CMPUT 174"), leaf("CMPUT 175")]);
        let completed = codes(&["CMPUT 174"]);

        assert!(!satisfied(Some(&formula), &completed));
        assert_eq!(missing(Some(&formula), &completed), codes(&["CMPUT 175"]));
    }

    #[test]
    fn test_or_satisfied_by_any_child() {
        let formula = PrerequisiteFormula::any_of([leaf("MATH 125"), leaf("MATH 127")]);
        let completed = codes(&["MATH 127"]);

        let result = evaluate(&formula, &completed);
        assert!(result.satisfied);
        assert!(result.missing.is_empty());
        assert_eq!(result.satisfied_courses, codes(&["MATH 127"]));
    }

    #[test]
    fn test_or_suggests_smallest_missing_set() {
        let formula = PrerequisiteFormula::any_of([
            PrerequisiteFormula::all_of([leaf("A 1"), leaf("B 1")]),
            leaf("C 1"),
            leaf("D 1"),
        ]);
        assert_eq!(missing(Some(&formula), &BTreeSet::new()), codes(&["C 1"]));

        // partially completed branch now needs only one course, and wins the tie by order
        assert_eq!(missing(Some(&formula), &codes(&["A 1"])), codes(&["B 1"]));
    }

    #[test]
    fn test_absent_formula_is_satisfied() {
        assert!(satisfied(None, &BTreeSet::new()));
        assert!(missing(None, &BTreeSet::new()).is_empty());
        assert_eq!(describe(None), NO_PREREQUISITES);
    }

    #[test]
    fn test_empty_or_is_vacuous() {
        let formula = PrerequisiteFormula::Or(vec![]);
        assert!(satisfied(Some(&formula), &BTreeSet::new()));
        assert!(missing(Some(&formula), &BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_satisfied_iff_nothing_missing() {
        let formula = PrerequisiteFormula::all_of([
            leaf("CMPUT 175"),
            PrerequisiteFormula::any_of([
                leaf("MATH 125"),
                PrerequisiteFormula::all_of([leaf("MATH 117"), leaf("MATH 118")]),
            ]),
        ]);
        let universe = ["CMPUT 175", "MATH 125", "MATH 117", "MATH 118"];

        for mask in 0u32..(1 << universe.len()) {
            let completed: BTreeSet<CourseCode> = universe
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, c)| CourseCode::new(c))
                .collect();
            let result = evaluate(&formula, &completed);
            assert_eq!(
                result.satisfied,
                result.missing.is_empty(),
                "completed = {:?}",
                completed
            );
        }
    }

    #[test]
    fn test_codes_compare_normalized() {
        let formula = leaf("cmput  174");
        assert!(satisfied(Some(&formula), &codes(&[" CMPUT 174"])));
    }

    #[test]
    fn test_describe_parenthesizes_nested_groups() {
        let formula = PrerequisiteFormula::all_of([
            leaf("CMPUT 175"),
            PrerequisiteFormula::any_of([leaf("MATH 125"), leaf("MATH 127")]),
        ]);
        assert_eq!(
            describe(Some(&formula)),
            "CMPUT 175 AND (MATH 125 OR MATH 127)"
        );
        assert_eq!(
            describe(Some(&PrerequisiteFormula::any_of([leaf("X 1")]))),
            "X 1"
        );
    }

    #[test]
    fn test_check_course_reports_both_sides() {
        let catalog = sample_catalog();
        let cmput204 = catalog.get_course(&CourseCode::new("CMPUT 204")).unwrap();

        let result = check_course(&cmput204, &codes(&["CMPUT 175"]));
        assert!(!result.is_valid);
        assert_eq!(result.missing_courses, vec![CourseCode::new("MATH 125")]);
        assert_eq!(result.satisfied_prerequisites, vec![CourseCode::new("CMPUT 175")]);
        assert_eq!(
            result.formula_description,
            "CMPUT 175 AND (MATH 125 OR MATH 127)"
        );
    }

    #[test]
    fn test_tree_expands_to_leaves() {
        let catalog = sample_catalog();
        let tree = prerequisite_tree(&catalog, &CourseCode::new("CMPUT 301"), DEFAULT_TREE_DEPTH)
            .unwrap();

        assert_eq!(tree.depth, 0);
        let c201 = &tree.prerequisites[0];
        assert_eq!(c201.course_code.as_str(), "CMPUT 201");
        let c175 = &c201.prerequisites[0];
        let c174 = &c175.prerequisites[0];
        assert_eq!(c174.course_code.as_str(), "CMPUT 174");
        assert_eq!(c174.depth, 3);
        assert!(c174.prerequisites.is_empty());
        assert!(!c174.truncated);
    }

    #[test]
    fn test_tree_truncates_at_depth_bound() {
        let catalog = sample_catalog();
        let tree = prerequisite_tree(&catalog, &CourseCode::new("CMPUT 301"), 1).unwrap();

        let c201 = &tree.prerequisites[0];
        assert!(c201.truncated);
        assert!(c201.prerequisites.is_empty());
    }

    #[test]
    fn test_tree_detects_self_reference() {
        let mut looping = course("LOOP 100", 3, 100, "LOOP");
        looping.prerequisite_formula = Some(leaf("LOOP 100"));
        let catalog = InMemoryCatalog::new().with_course(looping);

        let tree = prerequisite_tree(&catalog, &CourseCode::new("LOOP 100"), DEFAULT_TREE_DEPTH)
            .unwrap();
        assert_eq!(tree.prerequisites.len(), 1);
        assert!(tree.prerequisites[0].cycle);
        assert!(tree.prerequisites[0].prerequisites.is_empty());
    }

    #[test]
    fn test_tree_detects_longer_cycle() {
        let mut a = course("A 100", 3, 100, "A");
        a.prerequisite_formula = Some(leaf("B 100"));
        let mut b = course("B 100", 3, 100, "B");
        b.prerequisite_formula = Some(leaf("A 100"));
        let catalog = InMemoryCatalog::new().with_course(a).with_course(b);

        let tree = prerequisite_tree(&catalog, &CourseCode::new("A 100"), DEFAULT_TREE_DEPTH)
            .unwrap();
        let b_node = &tree.prerequisites[0];
        assert!(!b_node.cycle);
        assert!(b_node.prerequisites[0].cycle);
        assert_eq!(b_node.prerequisites[0].course_code.as_str(), "A 100");
    }

    #[test]
    fn test_tree_skips_unknown_children_and_rejects_unknown_root() {
        let mut c = course("C 200", 3, 200, "C");
        c.prerequisite_formula = Some(PrerequisiteFormula::all_of([leaf("GONE 100"), leaf("D 100")]));
        let catalog = InMemoryCatalog::new()
            .with_course(c)
            .with_course(course("D 100", 3, 100, "D"));

        let tree = prerequisite_tree(&catalog, &CourseCode::new("C 200"), DEFAULT_TREE_DEPTH)
            .unwrap();
        assert_eq!(tree.prerequisites.len(), 1);
        assert_eq!(tree.prerequisites[0].course_code.as_str(), "D 100");

        let err = prerequisite_tree(&catalog, &CourseCode::new("NOPE 1"), 5).unwrap_err();
        assert!(matches!(err, PlannerError::NotFound { .. }));
    }
}
