use crate::domain::plan::{CourseStatus, Plan};
use crate::domain::ports::Storage;
use crate::utils::error::{PlannerError, Result};
use serde::Serialize;
use tracing::debug;

pub const JSON_FILE: &str = "plan.json";
pub const CSV_FILE: &str = "plan.csv";
pub const TSV_FILE: &str = "plan.tsv";

/// One course per row, in plan order.
#[derive(Debug, Serialize)]
struct PlanRow<'a> {
    semester: u32,
    term: &'a str,
    year: u32,
    code: &'a str,
    title: &'a str,
    credits: u32,
    status: CourseStatus,
    satisfies: String,
}

pub fn render_delimited(plan: &Plan, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    for semester in &plan.semesters {
        for course in &semester.courses {
            writer.serialize(PlanRow {
                semester: semester.number,
                term: semester.term.as_str(),
                year: semester.year,
                code: course.code.as_str(),
                title: &course.title,
                credits: course.credits,
                status: course.status,
                satisfies: course.satisfies_requirements.join(";"),
            })?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| PlannerError::IoError(e.into_error()))
}

pub fn render_csv(plan: &Plan) -> Result<Vec<u8>> {
    render_delimited(plan, b',')
}

pub fn render_tsv(plan: &Plan) -> Result<Vec<u8>> {
    render_delimited(plan, b'\t')
}

/// Writes `plan.json`, `plan.csv` and `plan.tsv` through `storage` and
/// returns the paths written.
pub async fn export_plan<S: Storage>(storage: &S, plan: &Plan) -> Result<Vec<String>> {
    // 依序輸出三種格式
    let outputs = [
        (JSON_FILE, serde_json::to_vec_pretty(plan)?),
        (CSV_FILE, render_csv(plan)?),
        (TSV_FILE, render_tsv(plan)?),
    ];

    let mut written = Vec::with_capacity(outputs.len());
    for (path, data) in outputs {
        debug!("Writing {} ({} bytes)", path, data.len());
        storage.write_file(path, &data).await?;
        written.push(path.to_string());
    }
    Ok(written)
}
