#[cfg(feature = "cli")]
pub mod cli;
pub mod platform;

use crate::domain::model::Procedure;
use crate::utils::error::{BackupError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, validate_positive_number, Validate};
use platform::Platform;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(rename = "procedure", default)]
    pub procedures: Vec<Procedure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub platform: Platform,
    pub root: Option<PathBuf>,
    pub tmp_path: Option<PathBuf>,
    /// 開啟後重複的 trigger 會讓設定驗證失敗；預設只警告，仍以第一個為準
    pub reject_duplicate_triggers: bool,
}

impl Settings {
    pub fn root(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| self.platform.default_root())
    }

    pub fn tmp_path(&self) -> PathBuf {
        self.tmp_path
            .clone()
            .unwrap_or_else(|| self.platform.tmp_path(&self.root()))
    }

    pub fn history_path(&self) -> PathBuf {
        self.platform.log_path(&self.root()).join("history.jsonl")
    }
}

impl BackupConfig {
    /// 平台預設的設定檔位置
    pub fn default_path(platform: Platform) -> PathBuf {
        platform.config_path(&platform.default_root())
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${DB_PASSWORD})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BackupError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 依設定檔順序列出所有 trigger
    pub fn triggers(&self) -> Vec<&str> {
        self.procedures.iter().map(|p| p.trigger.as_str()).collect()
    }

    /// 出現超過一次的 trigger 與次數，依第一次出現的順序
    pub fn duplicate_triggers(&self) -> Vec<(String, usize)> {
        let triggers = self.triggers();
        let mut duplicates: Vec<(String, usize)> = Vec::new();
        for (index, trigger) in triggers.iter().enumerate() {
            if duplicates.iter().any(|(seen, _)| seen == trigger) {
                continue;
            }
            let count = triggers[index..]
                .iter()
                .filter(|other| *other == trigger)
                .count();
            if count > 1 {
                duplicates.push((trigger.to_string(), count));
            }
        }
        duplicates
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(root) = &self.settings.root {
            validate_path("settings.root", &root.to_string_lossy())?;
        }
        if let Some(tmp_path) = &self.settings.tmp_path {
            validate_path("settings.tmp_path", &tmp_path.to_string_lossy())?;
        }

        for (index, procedure) in self.procedures.iter().enumerate() {
            validate_non_empty_string(&format!("procedure[{}].trigger", index), &procedure.trigger)?;
            validate_non_empty_string(
                &format!("procedure.{}.adapter", procedure.trigger),
                &procedure.adapter_name,
            )?;
            if let Some(keep) = procedure.keep_backups {
                validate_positive_number(
                    &format!("procedure.{}.keep_backups", procedure.trigger),
                    keep,
                    1,
                )?;
            }
        }

        for (trigger, count) in self.duplicate_triggers() {
            if self.settings.reject_duplicate_triggers {
                return Err(BackupError::DuplicateTrigger { trigger, count });
            }
            tracing::warn!(
                "⚠️ Trigger '{}' is declared {} times; only the first procedure will run",
                trigger,
                count
            );
        }

        Ok(())
    }
}

impl Validate for BackupConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
