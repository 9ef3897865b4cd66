use crate::utils::error::{BackupError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 一個備份程序：trigger、adapter 種類，以及交給 adapter / storage 的設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub trigger: String,
    #[serde(rename = "adapter")]
    pub adapter_name: String,
    #[serde(default)]
    pub adapter_options: toml::Table,
    #[serde(rename = "storage", default = "default_storage_name")]
    pub storage_name: String,
    #[serde(default)]
    pub storage_options: toml::Table,
    pub keep_backups: Option<usize>,
}

fn default_storage_name() -> String {
    StorageKind::Local.as_str().to_string()
}

impl Procedure {
    pub fn new(trigger: impl Into<String>, adapter_name: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            adapter_name: adapter_name.into(),
            adapter_options: toml::Table::new(),
            storage_name: default_storage_name(),
            storage_options: toml::Table::new(),
            keep_backups: None,
        }
    }

    pub fn with_adapter_option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.adapter_options.insert(key.to_string(), value.into());
        self
    }

    pub fn with_storage(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = storage_name.into();
        self
    }

    pub fn with_storage_option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.storage_options.insert(key.to_string(), value.into());
        self
    }

    pub fn with_keep_backups(mut self, keep: usize) -> Self {
        self.keep_backups = Some(keep);
        self
    }

    /// 把 adapter_options 轉成 adapter 自己的設定型別
    pub fn adapter_options<T: DeserializeOwned>(&self) -> Result<T> {
        decode_options(&self.adapter_options, &self.trigger, "adapter_options")
    }

    /// 把 storage_options 轉成 storage 自己的設定型別
    pub fn storage_options<T: DeserializeOwned>(&self) -> Result<T> {
        decode_options(&self.storage_options, &self.trigger, "storage_options")
    }
}

fn decode_options<T: DeserializeOwned>(table: &toml::Table, trigger: &str, section: &str) -> Result<T> {
    toml::Value::Table(table.clone())
        .try_into()
        .map_err(|e| BackupError::ConfigValidationError {
            field: format!("procedure.{}.{}", trigger, section),
            message: e.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    MySql,
    PostgreSql,
    Archive,
    Custom,
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 4] = [
        AdapterKind::MySql,
        AdapterKind::PostgreSql,
        AdapterKind::Archive,
        AdapterKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::MySql => "mysql",
            AdapterKind::PostgreSql => "postgresql",
            AdapterKind::Archive => "archive",
            AdapterKind::Custom => "custom",
        }
    }
}

impl FromStr for AdapterKind {
    type Err = BackupError;

    fn from_str(tag: &str) -> Result<Self> {
        AdapterKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| BackupError::UnknownAdapter(tag.to_string()))
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Scp,
    Sftp,
    Ftp,
    S3,
}

impl StorageKind {
    pub const ALL: [StorageKind; 5] = [
        StorageKind::Local,
        StorageKind::Scp,
        StorageKind::Sftp,
        StorageKind::Ftp,
        StorageKind::S3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Local => "local",
            StorageKind::Scp => "scp",
            StorageKind::Sftp => "sftp",
            StorageKind::Ftp => "ftp",
            StorageKind::S3 => "s3",
        }
    }
}

impl FromStr for StorageKind {
    type Err = BackupError;

    fn from_str(tag: &str) -> Result<Self> {
        StorageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| BackupError::UnknownStorage(tag.to_string()))
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter 產出的備份檔
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub trigger: String,
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

impl Artifact {
    pub fn from_path(trigger: &str, path: PathBuf) -> Result<Self> {
        let size_bytes = std::fs::metadata(&path)?.len();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| BackupError::ConfigValidationError {
                field: "artifact".to_string(),
                message: format!("artifact path has no file name: {}", path.display()),
            })?;

        Ok(Self {
            trigger: trigger.to_string(),
            path,
            file_name,
            size_bytes,
        })
    }
}

impl Artifact {
    /// 各 adapter 產出檔案的副檔名
    pub const EXTENSIONS: [&'static str; 3] = ["sql", "files", "custom"];

    /// 判斷檔名是否為某個 trigger 的備份檔：`<14 位時間戳>.<trigger>.<ext>.zip`
    pub fn belongs_to(file_name: &str, trigger: &str) -> bool {
        let Some((timestamp, rest)) = file_name.split_once('.') else {
            return false;
        };
        if timestamp.len() != 14 || !timestamp.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }

        Self::EXTENSIONS
            .iter()
            .any(|ext| rest == format!("{}.{}.zip", trigger, ext))
    }
}

/// 單次執行的暫存目錄，adapter 在這裡產生檔案
#[derive(Debug, Clone)]
pub struct Workspace {
    pub dir: PathBuf,
    pub trigger: String,
    pub timestamp: String,
}

impl Workspace {
    pub fn create(tmp_root: &Path, trigger: &str, timestamp: DateTime<Utc>) -> Result<Self> {
        let timestamp = timestamp.format("%Y%m%d%H%M%S").to_string();
        let dir = tmp_root.join(format!("{}.{}", timestamp, trigger));
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            trigger: trigger.to_string(),
            timestamp,
        })
    }

    /// 最終備份檔名，例如 `20240101120000.daily-db.sql.zip`
    pub fn artifact_name(&self, extension: &str) -> String {
        format!("{}.{}.{}.zip", self.timestamp, self.trigger, extension)
    }

    /// 封裝好的 zip 放在工作目錄旁邊，避免被打包進自己
    pub fn artifact_path(&self, extension: &str) -> PathBuf {
        let name = self.artifact_name(extension);
        match self.dir.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }

    /// 刪除工作目錄與本次產生的 zip
    pub fn cleanup(&self) -> Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        for extension in Artifact::EXTENSIONS {
            let path = self.artifact_path(extension);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// 寫入 history 的一筆備份紀錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub trigger: String,
    pub adapter: AdapterKind,
    pub storage: StorageKind,
    pub location: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}
