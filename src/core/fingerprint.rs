use crate::domain::model::{course_set, CourseCode, Term};
use crate::domain::plan::{CreditBand, CreditLoad, GenerationRequest};
use crate::utils::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Canonical view of a request; field and collection order are fixed so the
/// serialized form depends only on the logical content.
#[derive(Serialize)]
struct FingerprintInput<'a> {
    program_code: &'a str,
    completed_courses: BTreeSet<CourseCode>,
    preferences: &'a BTreeMap<String, serde_json::Value>,
    credit_load: CreditLoad,
    credit_band: CreditBand,
    max_years: u32,
    starting_term: Term,
    starting_year: i32,
}

/// SHA-256 (hex) identifying requests that must yield the same plan.
///
/// Completed courses are normalized and de-duplicated first, so ordering
/// and spelling differences do not change the result.
pub fn fingerprint(request: &GenerationRequest) -> Result<String> {
    let input = FingerprintInput {
        program_code: request.program_code.trim(),
        completed_courses: course_set(request.completed_courses.iter().map(CourseCode::as_str)),
        preferences: &request.preferences,
        credit_load: request.credit_load,
        credit_band: request.credit_band(),
        max_years: request.max_years,
        starting_term: request.starting_term,
        starting_year: request.starting_year,
    };
    // serde_json writes maps in key order when they are BTreeMaps, which is all we use here
    let canonical = serde_json::to_vec(&input)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_ignores_order_and_spelling() {
        let a = GenerationRequest::new("honors-cs", 2025)
            .with_completed(["CMPUT 174", "MATH 125"])
            .with_preference("avoid_mornings", json!(true))
            .with_preference("focus", json!("ai"));
        let b = GenerationRequest::new("honors-cs", 2025)
            .with_completed(["math 125", "cmput  174", "CMPUT 174"])
            .with_preference("focus", json!("ai"))
            .with_preference("avoid_mornings", json!(true));

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
        assert_eq!(fingerprint(&a).unwrap().len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_inputs() {
        let base = GenerationRequest::new("honors-cs", 2025);
        let base_fp = fingerprint(&base).unwrap();

        let mut heavier = base.clone();
        heavier.credit_load = CreditLoad::Heavy;
        let mut longer = base.clone();
        longer.max_years = 5;
        let mut winter = base.clone();
        winter.starting_term = Term::Winter;
        let later = GenerationRequest::new("honors-cs", 2026);
        let more = base.clone().with_completed(["CMPUT 174"]);

        for other in [heavier, longer, winter, later, more] {
            assert_ne!(base_fp, fingerprint(&other).unwrap());
        }
    }

    #[test]
    fn test_fingerprint_nested_preferences() {
        let request = GenerationRequest::new("honors-cs", 2025)
            .with_preference("avoid", json!({"terms": ["SPRING", "SUMMER"], "max": 1.5}));

        let fp = fingerprint(&request).unwrap();
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(fp, fingerprint(&GenerationRequest::new("honors-cs", 2025)).unwrap());
    }
}
