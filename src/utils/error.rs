use crate::domain::model::Direction;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Failed to instantiate command '{command}': {source}")]
    InstantiationError {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unknown {direction} parameter: {name}")]
    UnknownParameterError { name: String, direction: Direction },

    #[error("Type mismatch for '{name}': expected {expected}, got {found}")]
    TypeMismatchError {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("Required inputs not resolved: {}", .names.join(", "))]
    NotResolvedError { names: Vec<String> },

    #[error("Duplicate parameter '{name}' in module '{module}'")]
    DuplicateParameterError { module: String, name: String },

    #[error("Unknown module: {name}")]
    UnknownModuleError { name: String },

    #[error("Module already registered: {name}")]
    DuplicateModuleError { name: String },

    #[error("Command fault in '{command}': {message}")]
    CommandFault { command: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Binding,
    Instantiation,
    Execution,
    Registry,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ModuleError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ModuleError::UnknownParameterError { .. }
            | ModuleError::TypeMismatchError { .. }
            | ModuleError::NotResolvedError { .. } => ErrorCategory::Binding,
            ModuleError::InstantiationError { .. } => ErrorCategory::Instantiation,
            ModuleError::CommandFault { .. } => ErrorCategory::Execution,
            ModuleError::DuplicateParameterError { .. }
            | ModuleError::UnknownModuleError { .. }
            | ModuleError::DuplicateModuleError { .. } => ErrorCategory::Registry,
            ModuleError::ConfigValidationError { .. }
            | ModuleError::InvalidConfigValueError { .. }
            | ModuleError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ModuleError::IoError(_) | ModuleError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Execution => ErrorSeverity::Low,
            ErrorCategory::Binding => ErrorSeverity::Medium,
            ErrorCategory::Instantiation
            | ErrorCategory::Registry
            | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ModuleError::UnknownParameterError { name, .. } => {
                format!("Check the parameter name '{}' against the module's declared inputs and outputs", name)
            }
            ModuleError::TypeMismatchError { expected, .. } => {
                format!("Provide a value of type {}", expected)
            }
            ModuleError::NotResolvedError { names } => {
                format!("Set and resolve these inputs before running: {}", names.join(", "))
            }
            ModuleError::UnknownModuleError { .. } => {
                "Run with --list to see the registered modules".to_string()
            }
            ModuleError::InstantiationError { .. } => {
                "Verify the command can be constructed with its default configuration".to_string()
            }
            ModuleError::ConfigValidationError { .. }
            | ModuleError::InvalidConfigValueError { .. }
            | ModuleError::MissingConfigError { .. } => {
                "Fix the batch configuration file and try again".to_string()
            }
            ModuleError::IoError(_) => "Check that the file exists and is readable".to_string(),
            _ => "See the log output for details".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Binding => format!("Parameter binding failed: {}", self),
            ErrorCategory::Instantiation => format!("Could not create module: {}", self),
            ErrorCategory::Execution => format!("Command failed: {}", self),
            ErrorCategory::Registry => format!("Module registry error: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_resolved_message_lists_names() {
        let err = ModuleError::NotResolvedError {
            names: vec!["threshold".to_string(), "values".to_string()],
        };
        assert_eq!(err.to_string(), "Required inputs not resolved: threshold, values");
        assert_eq!(err.category(), ErrorCategory::Binding);
    }

    #[test]
    fn test_severity_ordering() {
        let fault = ModuleError::CommandFault {
            command: "fail".to_string(),
            message: "boom".to_string(),
        };
        let missing = ModuleError::UnknownModuleError {
            name: "nope".to_string(),
        };
        assert!(fault.severity() < missing.severity());
    }

    #[test]
    fn test_unknown_parameter_mentions_direction() {
        let err = ModuleError::UnknownParameterError {
            name: "result".to_string(),
            direction: Direction::Input,
        };
        assert_eq!(err.to_string(), "Unknown input parameter: result");
    }
}
