use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 執行環境，決定預設的根目錄與 config/tmp/log 位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// 獨立安裝，根目錄為 /opt/backup
    #[default]
    Unix,
    /// 放在 Rails 專案內執行，根目錄為目前目錄
    Rails,
}

impl Platform {
    pub fn default_root(&self) -> PathBuf {
        match self {
            Platform::Unix => PathBuf::from("/opt/backup"),
            Platform::Rails => PathBuf::from("."),
        }
    }

    pub fn config_path(&self, root: &Path) -> PathBuf {
        root.join("config").join("backup.toml")
    }

    pub fn tmp_path(&self, root: &Path) -> PathBuf {
        match self {
            Platform::Unix => root.join("tmp"),
            Platform::Rails => root.join("tmp").join("backup"),
        }
    }

    pub fn log_path(&self, root: &Path) -> PathBuf {
        match self {
            Platform::Unix => root.join("log"),
            Platform::Rails => root.join("log").join("backup"),
        }
    }
}
