use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Could not find a backup procedure with the trigger \"{trigger}\".\nHere's a list of available triggers:\n{}", format_triggers(.available))]
    ProcedureNotFound {
        trigger: String,
        available: Vec<String>,
    },

    #[error("Unknown Adapter: \"{0}\".")]
    UnknownAdapter(String),

    #[error("Unknown Storage: \"{0}\".")]
    UnknownStorage(String),

    #[error("Duplicate trigger \"{trigger}\" is declared {count} times")]
    DuplicateTrigger { trigger: String, count: usize },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Command `{program}` failed with {status}: {stderr}")]
    CommandError {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("'{name}' requires the `{feature}` cargo feature")]
    FeatureDisabled { name: String, feature: String },
}

fn format_triggers(triggers: &[String]) -> String {
    triggers.iter().map(|t| format!("- {}\n", t)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lookup,
    Configuration,
    Execution,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BackupError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BackupError::ProcedureNotFound { .. } | BackupError::UnknownAdapter(_) => {
                ErrorCategory::Lookup
            }
            BackupError::UnknownStorage(_)
            | BackupError::DuplicateTrigger { .. }
            | BackupError::TomlError(_)
            | BackupError::ConfigValidationError { .. }
            | BackupError::InvalidConfigValueError { .. }
            | BackupError::MissingConfigError { .. }
            | BackupError::FeatureDisabled { .. } => ErrorCategory::Configuration,
            BackupError::CommandError { .. } | BackupError::ZipError(_) => {
                ErrorCategory::Execution
            }
            BackupError::StorageError { .. } => ErrorCategory::Storage,
            BackupError::IoError(_) | BackupError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Lookup | ErrorCategory::Configuration => ErrorSeverity::High,
            // 遠端傳輸失敗通常重跑即可
            ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::Execution => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BackupError::ProcedureNotFound { available, .. } if available.is_empty() => {
                "No procedures are configured; add a [[procedure]] block to the config file"
                    .to_string()
            }
            BackupError::ProcedureNotFound { .. } => {
                "Run again with one of the listed triggers, or use --list".to_string()
            }
            BackupError::UnknownAdapter(_) => {
                "Valid adapters are: mysql, postgresql, archive, custom".to_string()
            }
            BackupError::UnknownStorage(_) => {
                "Valid storages are: local, scp, sftp, ftp, s3".to_string()
            }
            BackupError::DuplicateTrigger { .. } => {
                "Give every procedure a unique trigger".to_string()
            }
            BackupError::TomlError(_) | BackupError::ConfigValidationError { .. } => {
                "Check the configuration file syntax".to_string()
            }
            BackupError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in the configuration file", field)
            }
            BackupError::MissingConfigError { field } => {
                format!("Add '{}' to the configuration file", field)
            }
            BackupError::CommandError { program, .. } => {
                format!("Make sure `{}` is installed and the credentials are valid", program)
            }
            BackupError::StorageError { .. } => {
                "Check connectivity to the storage destination and retry".to_string()
            }
            BackupError::FeatureDisabled { feature, .. } => {
                format!("Rebuild with `--features {}`", feature)
            }
            BackupError::ZipError(_) | BackupError::IoError(_) => {
                "Check disk space and permissions of the tmp and storage paths".to_string()
            }
            BackupError::SerializationError(_) => {
                "The history file may be corrupted; inspect or remove it".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            // 找不到 trigger 時完整列出可用清單
            ErrorCategory::Lookup => self.to_string(),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Execution => format!("Backup failed: {}", self),
            ErrorCategory::Storage => format!("Could not store the backup: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// 依嚴重程度對應程式結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
