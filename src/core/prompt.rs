//! Advisor prompt handed to language-model proposers.

use crate::domain::model::RequirementKind;
use crate::domain::plan::ProposalContext;
use crate::domain::report::RankedCourse;
use std::collections::BTreeMap;

/// Per-semester ceiling no plan may exceed.
pub const MAX_SEMESTER_CREDITS: u32 = 18;

pub const SYSTEM_PROMPT: &str =
    "You are an expert academic advisor. Always respond with valid JSON only.";

pub const RETRY_HEADER: &str = "PREVIOUS ATTEMPT HAD ERRORS - PLEASE FIX:";

const RESPONSE_SHAPE: &str = r#"{
  "semesters": [
    {
      "number": 1,
      "term": "FALL",
      "year": 1,
      "courses": [
        {"code": "CMPUT 174", "title": "...", "credits": 3, "satisfies_requirements": ["core"]}
      ]
    }
  ],
  "warnings": ["availability or workload concerns"],
  "notes": "short explanation of how the plan is structured"
}"#;

/// Renders the planning request, with the previous attempt's errors appended
/// when this is a retry.
pub fn render_prompt(ctx: &ProposalContext, prior_errors: &[String]) -> String {
    let program = &ctx.program;
    let request = &ctx.request;
    let band = ctx.credit_band;
    let mut prompt = String::with_capacity(4096);

    prompt.push_str(
        "You are a university academic advisor helping a student plan the rest of their degree.\n\n",
    );

    prompt.push_str("STUDENT PROFILE:\n");
    prompt.push_str(&format!("- Program: {} ({})\n", program.name, program.code));
    prompt.push_str(&format!("- Credits required: {}\n", program.total_credits));
    prompt.push_str(&format!(
        "- Starting: {} {}\n",
        request.starting_term, request.starting_year
    ));
    prompt.push_str(&format!(
        "- Completed: {} courses ({} credits)\n",
        ctx.completed_courses.len(),
        ctx.completed_credits()
    ));
    prompt.push_str(&format!("- Interests: {}\n\n", preferences_text(ctx)));

    prompt.push_str("COMPLETED COURSES:\n");
    if ctx.completed_courses.is_empty() && ctx.unknown_completed.is_empty() {
        prompt.push_str("  None\n");
    }
    for course in &ctx.completed_courses {
        prompt.push_str(&format!(
            "  - {}: {} ({} cr)\n",
            course.code, course.title, course.credits
        ));
    }
    for code in &ctx.unknown_completed {
        prompt.push_str(&format!("  - {}: not in catalog\n", code));
    }
    prompt.push('\n');

    prompt.push_str("DEGREE REQUIREMENTS:\n");
    for progress in &ctx.requirement_status.requirements {
        let status = if progress.is_satisfied {
            "SATISFIED".to_string()
        } else if progress.remaining.is_empty() {
            format!(
                "{}/{} credits completed",
                progress.credits_completed, progress.credits_needed
            )
        } else {
            let remaining: Vec<&str> = progress.remaining.iter().map(|c| c.as_str()).collect();
            format!(
                "{}/{} credits completed (options: {})",
                progress.credits_completed,
                progress.credits_needed,
                remaining.join(", ")
            )
        };
        let detail = match program
            .requirements
            .iter()
            .find(|r| r.id == progress.requirement_id)
        {
            Some(req) if req.kind == RequirementKind::Choice => {
                format!("CHOICE, pick {} of {}", req.choose_count(), req.courses.len())
            }
            _ => progress.kind.to_string(),
        };
        prompt.push_str(&format!(
            "- [{}] {} ({}, {} credits): {}\n",
            progress.requirement_id, progress.requirement_name, detail, progress.credits_needed, status
        ));
    }
    prompt.push('\n');

    prompt.push_str("AVAILABLE COURSES (prerequisites met):\n");
    prompt.push_str(&available_courses_text(&ctx.available_courses));
    prompt.push('\n');

    prompt.push_str("PLANNING CONSTRAINTS:\n");
    prompt.push_str(&format!(
        "- Credit load: {} (aim for about {} credits per semester, stay within {} credits)\n",
        request.credit_load,
        request.credit_load.target_credits(),
        band
    ));
    prompt.push_str(&format!(
        "- Never schedule more than {} credits in one semester\n",
        MAX_SEMESTER_CREDITS.min(band.max)
    ));
    prompt.push_str(&format!("- Time frame: {} years\n", request.max_years));
    prompt.push_str(
        "- A course and its prerequisite may not share a semester; the prerequisite must come earlier\n",
    );
    prompt.push_str("- Only schedule a course in a term where it is typically offered\n");
    prompt.push_str("- Put foundational (100-200 level) courses before advanced ones\n");

    let rules = &program.special_rules;
    if rules.is_empty() {
        prompt.push_str("- Special program rules: none\n");
    } else {
        for group in &rules.exclusion_groups {
            let codes: Vec<&str> = group.iter().map(|c| c.as_str()).collect();
            prompt.push_str(&format!(
                "- Only one of these counts: {}\n",
                codes.join(", ")
            ));
        }
        for sub in &rules.substitutions {
            let alternatives: Vec<&str> = sub.alternatives.iter().map(|c| c.as_str()).collect();
            prompt.push_str(&format!(
                "- {} may be replaced by: {}\n",
                sub.original,
                alternatives.join(", ")
            ));
        }
        for text in &rules.additional_requirements {
            prompt.push_str(&format!("- {}\n", text));
        }
    }
    prompt.push('\n');

    prompt.push_str(&format!(
        "Return a {}-semester plan as JSON in exactly this shape:\n",
        ctx.semester_count
    ));
    prompt.push_str(RESPONSE_SHAPE);
    prompt.push('\n');

    if !prior_errors.is_empty() {
        prompt.push('\n');
        prompt.push_str(RETRY_HEADER);
        prompt.push('\n');
        for error in prior_errors {
            prompt.push_str(&format!("- {}\n", error));
        }
    }

    prompt
}

fn preferences_text(ctx: &ProposalContext) -> String {
    if ctx.request.preferences.is_empty() {
        return "None specified".to_string();
    }
    serde_json::to_string(&ctx.request.preferences).unwrap_or_else(|_| "None specified".to_string())
}

fn available_courses_text(courses: &[RankedCourse]) -> String {
    if courses.is_empty() {
        return "  None\n".to_string();
    }
    let mut by_level: BTreeMap<u32, Vec<&RankedCourse>> = BTreeMap::new();
    for course in courses {
        by_level.entry(course.level).or_default().push(course);
    }

    let mut text = String::new();
    for (level, group) in by_level {
        text.push_str(&format!("{}-level courses:\n", level));
        for course in group {
            let terms = if course.typically_offered.is_empty() {
                "any term".to_string()
            } else {
                course
                    .typically_offered
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let satisfies = if course.satisfies_requirements.is_empty() {
                "none".to_string()
            } else {
                course.satisfies_requirements.join(", ")
            };
            text.push_str(&format!(
                "  - {}: {} ({} cr, typically: {}, satisfies: {})\n",
                course.code, course.title, course.credits, terms, satisfies
            ));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{codes, sample_catalog, sample_program};
    use crate::core::{ranking, requirement};
    use crate::domain::model::CourseCode;
    use crate::domain::plan::GenerationRequest;
    use crate::domain::ports::Catalog;

    fn context() -> ProposalContext {
        let catalog = sample_catalog();
        let program = sample_program();
        let completed = codes(&["CMPUT 174", "PHIL 999"]);
        let request = GenerationRequest::new("honors-cs", 2025)
            .with_completed(["CMPUT 174", "PHIL 999"])
            .with_preference("specialization", serde_json::json!("machine learning"));
        ProposalContext {
            completed_courses: vec![catalog.get_course(&CourseCode::new("CMPUT 174")).unwrap()],
            unknown_completed: vec![CourseCode::new("PHIL 999")],
            requirement_status: requirement::validate(&program, &completed, &catalog),
            available_courses: ranking::rank(&program, &completed, &catalog),
            credit_band: request.credit_band(),
            semester_count: request.semester_count(),
            program,
            request,
        }
    }

    #[test]
    fn test_prompt_describes_student_and_program() {
        let prompt = render_prompt(&context(), &[]);

        assert!(prompt.contains("BSc Honors in Computing Science (honors-cs)"));
        assert!(prompt.contains("Starting: Fall 2025"));
        assert!(prompt.contains("- CMPUT 174: Introduction to the Foundations of Computation I (3 cr)"));
        assert!(prompt.contains("PHIL 999: not in catalog"));
        assert!(prompt.contains("machine learning"));
        assert!(prompt.contains("[linear-algebra] Linear Algebra (CHOICE, pick 1 of 2"));
        assert!(prompt.contains("100-level courses:"));
        assert!(prompt.contains("CMPUT 175"));
        assert!(prompt.contains("Only one of these counts: CMPUT 201, CMPUT 275"));
        assert!(prompt.contains("Return a 8-semester plan"));
        assert!(!prompt.contains(RETRY_HEADER));
    }

    #[test]
    fn test_retry_prompt_lists_prior_errors() {
        let errors = vec![
            "CMPUT 201 in semester 1 is missing prerequisites: CMPUT 175".to_string(),
            "Plan totals 30 credits but the program needs 36".to_string(),
        ];
        let prompt = render_prompt(&context(), &errors);

        let tail = &prompt[prompt.find(RETRY_HEADER).unwrap()..];
        assert!(tail.contains("- CMPUT 201 in semester 1 is missing prerequisites"));
        assert!(tail.contains("- Plan totals 30 credits"));
    }
}
