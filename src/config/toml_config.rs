use crate::core::report::{AlertThresholds, DEFAULT_CURRENCY_SYMBOL};
use crate::core::vector_store::DEFAULT_DIMENSION;
use crate::utils::error::{InsightError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub llm: LlmConfig,
    pub index: IndexConfig,
    pub report: ReportConfig,
    pub alerts: AlertThresholds,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_seconds: u64,
    /// Retries after the first attempt; a request is sent at most `1 + max_retries` times.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.3,
            max_output_tokens: 2000,
            timeout_seconds: 60,
            max_retries: 2,
            retry_base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub dimension: usize,
    /// Snapshots persist here between runs when set.
    pub path: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_path: String,
    pub bundle_name: String,
    pub currency_symbol: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            bundle_name: "portfolio_report.zip".to_string(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: bool,
}

impl InsightConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    /// API key precedence: explicit override, then `[llm].api_key`, then `GEMINI_API_KEY`.
    pub fn resolve_api_key(&self, override_key: Option<&str>) -> Result<String> {
        let usable = |k: &&str| !k.trim().is_empty() && !k.starts_with("${");

        if let Some(key) = override_key.filter(usable) {
            return Ok(key.to_string());
        }
        if let Some(key) = self.llm.api_key.as_deref().filter(usable) {
            return Ok(key.to_string());
        }
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(InsightError::MissingConfigError {
                field: format!("llm.api_key (or {})", API_KEY_ENV),
            }),
        }
    }
}

/// 替換環境變數 (例如 ${GEMINI_API_KEY})；未設定的變數保持原樣
fn substitute_env_vars(content: &str) -> Result<String> {
    use regex::Regex;
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| InsightError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

impl Validate for InsightConfig {
    fn validate(&self) -> Result<()> {
        if self.llm.provider != "gemini" {
            return Err(InsightError::InvalidConfigValueError {
                field: "llm.provider".to_string(),
                value: self.llm.provider.clone(),
                reason: "Supported providers: gemini".to_string(),
            });
        }
        validate_non_empty_string("llm.model", &self.llm.model)?;
        validate_url("llm.base_url", &self.llm.base_url)?;
        validate_range("llm.temperature", self.llm.temperature, 0.0, 2.0)?;
        validate_positive_number("llm.max_output_tokens", self.llm.max_output_tokens as usize, 1)?;
        validate_positive_number("llm.timeout_seconds", self.llm.timeout_seconds as usize, 1)?;

        validate_positive_number("index.dimension", self.index.dimension, 1)?;
        if let Some(path) = &self.index.path {
            validate_path("index.path", path)?;
        }

        validate_path("report.output_path", &self.report.output_path)?;
        validate_non_empty_string("report.bundle_name", &self.report.bundle_name)?;
        validate_range(
            "alerts.max_concentration_risk",
            self.alerts.max_concentration_risk,
            0.0,
            1.0,
        )?;

        Ok(())
    }
}
