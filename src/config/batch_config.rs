use crate::core::registry::ModuleRegistry;
use crate::domain::model::Value;
use crate::utils::error::{ModuleError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_one_of, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub batch: BatchSettings,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    pub name: String,
    pub description: Option<String>,
    pub fail_fast: Option<bool>,
    pub monitor: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

/// 一個批次步驟：要執行的模組名稱與其輸入
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepConfig {
    pub command: String,
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
    #[serde(default)]
    pub preview: bool,
    #[serde(default)]
    pub cancel_after_preview: bool,
}

impl BatchConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ModuleError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${THRESHOLD})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ModuleError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn fail_fast(&self) -> bool {
        self.batch.fail_fast.unwrap_or(false)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.batch.monitor.unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    /// 確認每個步驟都指向已註冊的模組
    pub fn validate_against(&self, registry: &ModuleRegistry) -> Result<()> {
        for step in &self.steps {
            if !registry.contains(&step.command) {
                return Err(ModuleError::UnknownModuleError {
                    name: step.command.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Validate for BatchConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("batch.name", &self.batch.name)?;

        if self.steps.is_empty() {
            return Err(ModuleError::MissingConfigError {
                field: "steps".to_string(),
            });
        }

        if let Some(level) = self.log_level() {
            validate_one_of("logging.level", level, &LOG_LEVELS)?;
        }

        for (index, step) in self.steps.iter().enumerate() {
            validate_non_empty_string(&format!("steps[{}].command", index), &step.command)?;
            if step.cancel_after_preview && !step.preview {
                return Err(ModuleError::InvalidConfigValueError {
                    field: format!("steps[{}].cancel_after_preview", index),
                    value: "true".to_string(),
                    reason: "cancel_after_preview requires preview = true".to_string(),
                });
            }
        }

        Ok(())
    }
}
