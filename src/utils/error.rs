use std::fmt;
use thiserror::Error;

/// What kind of reference data a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Course,
    Program,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Course => write!(f, "Course"),
            EntityKind::Program => write!(f, "Program"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("{kind} '{code}' not found")]
    NotFound { kind: EntityKind, code: String },

    #[error("Plan proposer failed: {message}")]
    ProposerError { message: String },

    #[error("Plan proposer timed out after {seconds}s")]
    ProposerTimeout { seconds: u64 },

    #[error("Plan validation failed: {}", violations.join("; "))]
    ValidationFailure { violations: Vec<String> },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Lookup,
    Proposer,
    Validation,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PlannerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        PlannerError::ConfigurationError {
            message: message.into(),
        }
    }

    pub fn course_not_found(code: impl Into<String>) -> Self {
        PlannerError::NotFound {
            kind: EntityKind::Course,
            code: code.into(),
        }
    }

    pub fn program_not_found(code: impl Into<String>) -> Self {
        PlannerError::NotFound {
            kind: EntityKind::Program,
            code: code.into(),
        }
    }

    pub fn proposer(message: impl Into<String>) -> Self {
        PlannerError::ProposerError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PlannerError::ConfigurationError { .. }
            | PlannerError::InvalidConfigValueError { .. }
            | PlannerError::MissingConfigError { .. }
            | PlannerError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            PlannerError::NotFound { .. } => ErrorCategory::Lookup,
            PlannerError::ProposerError { .. }
            | PlannerError::ProposerTimeout { .. }
            | PlannerError::HttpError(_) => ErrorCategory::Proposer,
            PlannerError::ValidationFailure { .. } => ErrorCategory::Validation,
            PlannerError::CsvError(_)
            | PlannerError::IoError(_)
            | PlannerError::SerializationError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Proposer => ErrorSeverity::Medium,
            ErrorCategory::Lookup => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// Whether the generation loop may spend another proposer attempt on this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlannerError::ProposerError { .. }
                | PlannerError::ProposerTimeout { .. }
                | PlannerError::ValidationFailure { .. }
                | PlannerError::HttpError(_)
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PlannerError::ConfigurationError { .. } => {
                "Check the catalog data: requirement kinds and prerequisite formulas must be well formed"
            }
            PlannerError::NotFound {
                kind: EntityKind::Course,
                ..
            } => "Check the course code spelling (e.g. 'CMPUT 174')",
            PlannerError::NotFound {
                kind: EntityKind::Program,
                ..
            } => "Check the program code against the catalog",
            PlannerError::ProposerError { .. } | PlannerError::HttpError(_) => {
                "Verify the proposer endpoint and API key, then retry"
            }
            PlannerError::ProposerTimeout { .. } => {
                "Increase proposer.timeout_seconds or retry later"
            }
            PlannerError::ValidationFailure { .. } => {
                "Review the plan warnings and adjust the request constraints"
            }
            PlannerError::CsvError(_) | PlannerError::IoError(_) => {
                "Check that the file paths exist and are writable"
            }
            PlannerError::SerializationError(_) => "Check that the input is valid JSON",
            PlannerError::InvalidConfigValueError { .. }
            | PlannerError::MissingConfigError { .. }
            | PlannerError::ConfigValidationError { .. } => {
                "Fix the configuration file and run again"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PlannerError::NotFound { kind, code } => {
                format!("{} '{}' does not exist in the catalog", kind, code)
            }
            PlannerError::ProposerError { .. }
            | PlannerError::ProposerTimeout { .. }
            | PlannerError::HttpError(_) => {
                format!("The plan generator is unavailable: {}", self)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
