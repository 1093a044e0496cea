use crate::domain::model::{Course, CourseCode, CourseFilter, Program};
use crate::domain::ports::{Catalog, Storage};
use crate::utils::error::{PlannerError, Result};
use crate::utils::validation::Validate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    courses: Vec<Course>,
    #[serde(default)]
    programs: Vec<Program>,
}

/// Catalog snapshot held in memory, loaded from a JSON document of the form
/// `{"courses": [..], "programs": [..]}`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    courses: BTreeMap<CourseCode, Course>,
    programs: HashMap<String, Program>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從儲存空間載入 JSON 目錄
    pub async fn load<S: Storage>(storage: &S, path: &str) -> Result<Self> {
        let data = storage.read_file(path).await?;
        let content = std::str::from_utf8(&data).map_err(|e| {
            PlannerError::configuration(format!("catalog {} is not UTF-8: {}", path, e))
        })?;
        let catalog = Self::from_json_str(content)?;
        tracing::info!(
            "Loaded catalog from {}: {} courses, {} programs",
            path,
            catalog.courses.len(),
            catalog.programs.len()
        );
        Ok(catalog)
    }

    /// Parses and validates the whole document; any bad formula or
    /// requirement kind rejects the load.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(content)
            .map_err(|e| PlannerError::configuration(format!("invalid catalog document: {}", e)))?;

        let mut catalog = Self::new();
        for course in file.courses {
            if catalog.courses.contains_key(&course.code) {
                return Err(PlannerError::configuration(format!(
                    "duplicate course '{}' in catalog",
                    course.code
                )));
            }
            catalog.courses.insert(course.code.clone(), course);
        }
        for program in file.programs {
            catalog.insert_program(program)?;
        }
        Ok(catalog)
    }

    pub fn with_course(mut self, course: Course) -> Self {
        self.courses.insert(course.code.clone(), course);
        self
    }

    /// Adds a program without validating it; use `insert_program` for untrusted data.
    pub fn with_program(mut self, program: Program) -> Self {
        self.programs.insert(program.code.clone(), program);
        self
    }

    pub fn insert_program(&mut self, program: Program) -> Result<()> {
        program.validate()?;
        if self.programs.contains_key(&program.code) {
            return Err(PlannerError::configuration(format!(
                "duplicate program '{}' in catalog",
                program.code
            )));
        }
        self.programs.insert(program.code.clone(), program);
        Ok(())
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }
}

impl Catalog for InMemoryCatalog {
    fn get_course(&self, code: &CourseCode) -> Option<Course> {
        self.courses.get(code).cloned()
    }

    fn get_program(&self, code: &str) -> Option<Program> {
        self.programs.get(code.trim()).cloned()
    }

    fn list_courses(&self, filter: &CourseFilter) -> Vec<Course> {
        self.courses
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect()
    }
}
