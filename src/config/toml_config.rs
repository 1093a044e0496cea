use crate::adapters::proposer::{ProposerSettings, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::core::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECONDS};
use crate::core::orchestrator::{GenerationSettings, DEFAULT_PROPOSER_TIMEOUT};
use crate::core::prompt::MAX_SEMESTER_CREDITS;
use crate::domain::plan::CreditBand;
use crate::utils::error::{PlannerError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const ENV_VAR_PATTERN: &str = r"\$\{([^}]+)\}";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub catalog: CatalogSection,
    pub proposer: ProposerSection,
    pub cache: CacheSection,
    pub generation: GenerationSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// JSON catalog file; the CLI `--catalog` flag wins over this.
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposerSection {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub rate_limit_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ProposerSection {
    fn default() -> Self {
        let settings = ProposerSettings::default();
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout_seconds: DEFAULT_PROPOSER_TIMEOUT.as_secs(),
            rate_limit_retries: settings.rate_limit_retries,
            retry_delay_ms: settings.retry_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_seconds: u64,
    pub max_entries: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Per-semester band override. Both ends must be set for it to apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSection {
    pub min_semester_credits: Option<u32>,
    pub max_semester_credits: Option<u32>,
}

impl PlannerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PlannerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(ENV_VAR_PATTERN).map_err(|e| PlannerError::configuration(e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn credit_band(&self) -> Option<CreditBand> {
        match (
            self.generation.min_semester_credits,
            self.generation.max_semester_credits,
        ) {
            (Some(min), Some(max)) => Some(CreditBand::new(min, max)),
            _ => None,
        }
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            proposer_timeout: Duration::from_secs(self.proposer.timeout_seconds),
            default_band: self.credit_band(),
        }
    }

    /// An api key still holding an unexpanded `${VAR}` counts as absent.
    pub fn proposer_settings(&self) -> ProposerSettings {
        let api_key = self
            .proposer
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty() && !key.contains("${"));

        ProposerSettings {
            endpoint: self.proposer.endpoint.clone(),
            api_key,
            model: self.proposer.model.clone(),
            temperature: self.proposer.temperature,
            max_tokens: self.proposer.max_tokens,
            rate_limit_retries: self.proposer.rate_limit_retries,
            retry_delay: Duration::from_millis(self.proposer.retry_delay_ms),
        }
    }
}

impl Validate for PlannerConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.catalog.path {
            validation::require_file_path("catalog.path", path)?;
        }

        validation::require_http_url("proposer.endpoint", &self.proposer.endpoint)?;
        validation::require_text("proposer.model", &self.proposer.model)?;
        validation::require_within("proposer.temperature", self.proposer.temperature, 0.0, 2.0)?;
        validation::require_at_least("proposer.max_tokens", self.proposer.max_tokens, 1)?;
        validation::require_at_least("proposer.timeout_seconds", self.proposer.timeout_seconds, 1)?;

        validation::require_at_least("cache.ttl_seconds", self.cache.ttl_seconds, 1)?;
        validation::require_at_least("cache.max_entries", self.cache.max_entries, 1)?;

        match (
            self.generation.min_semester_credits,
            self.generation.max_semester_credits,
        ) {
            (Some(min), Some(max)) => {
                validation::require_within(
                    "generation.max_semester_credits",
                    max,
                    1,
                    MAX_SEMESTER_CREDITS,
                )?;
                validation::require_within("generation.min_semester_credits", min, 0, max)?;
            }
            (None, None) => {}
            (Some(_), None) => {
                return Err(PlannerError::MissingConfigError {
                    field: "generation.max_semester_credits".to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(PlannerError::MissingConfigError {
                    field: "generation.min_semester_credits".to_string(),
                })
            }
        }

        Ok(())
    }
}
