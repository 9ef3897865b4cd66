use crate::domain::model::{Artifact, Procedure, StorageKind};
use crate::domain::ports::Storage;
use crate::storage::expired_backups;
use crate::utils::error::{BackupError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_required_field,
};
use async_trait::async_trait;
use serde::Deserialize;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};

const DEFAULT_FTP_PORT: u16 = 21;

fn default_passive() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FtpOptions {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub path: String,
    #[serde(default = "default_passive")]
    pub passive: bool,
}

/// 上傳到 FTP 伺服器；suppaftp 是同步 client，整段連線放在 blocking thread 上
#[derive(Clone)]
pub struct FtpStorage {
    host: String,
    port: u16,
    user: String,
    password: String,
    path: String,
    passive: bool,
}

impl FtpStorage {
    pub fn from_procedure(procedure: &Procedure) -> Result<Self> {
        let options: FtpOptions = procedure.storage_options()?;
        let field = |name: &str| format!("procedure.{}.storage_options.{}", procedure.trigger, name);

        validate_non_empty_string(&field("host"), &options.host)?;
        validate_path(&field("path"), &options.path)?;
        if let Some(port) = options.port {
            validate_range(&field("port"), port, 1, u16::MAX)?;
        }
        let user = validate_required_field(&field("user"), &options.user)?.clone();
        let password = validate_required_field(&field("password"), &options.password)?.clone();

        Ok(Self {
            host: options.host,
            port: options.port.unwrap_or(DEFAULT_FTP_PORT),
            user,
            password,
            path: options.path,
            passive: options.passive,
        })
    }

    fn remote_dir(&self) -> String {
        match self.path.trim_end_matches('/') {
            "" => "/".to_string(),
            dir => dir.to_string(),
        }
    }

    pub fn location(&self, file_name: &str) -> String {
        format!(
            "ftp://{}:{}{}/{}",
            self.host,
            self.port,
            self.remote_dir().trim_end_matches('/'),
            file_name
        )
    }

    /// 登入並切到備份目錄後執行 `action`，結束時登出
    async fn with_session<T, F>(&self, action: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FtpStream) -> std::result::Result<T, FtpError> + Send + 'static,
    {
        let storage = self.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut ftp = FtpStream::connect((storage.host.as_str(), storage.port))?;
            ftp.set_mode(if storage.passive { Mode::Passive } else { Mode::Active });
            ftp.login(storage.user.as_str(), storage.password.as_str())?;
            ftp.transfer_type(FileType::Binary)?;

            let dir = storage.remote_dir();
            // 目錄可能已經存在
            if let Err(e) = ftp.mkdir(&dir) {
                tracing::debug!("mkdir {} skipped: {}", dir, e);
            }
            ftp.cwd(&dir)?;

            let result = action(&mut ftp);
            if let Err(e) = ftp.quit() {
                tracing::debug!("FTP quit failed: {}", e);
            }
            result
        })
        .await
        .map_err(|e| BackupError::IoError(std::io::Error::other(e)))?;

        result.map_err(|e| BackupError::StorageError {
            message: format!("FTP {}:{}: {}", self.host, self.port, e),
        })
    }
}

/// NLST 依伺服器不同可能回傳完整路徑
fn listed_name(entry: &str) -> String {
    entry.trim().rsplit('/').next().unwrap_or_default().to_string()
}

#[async_trait]
impl Storage for FtpStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Ftp
    }

    async fn store(&self, artifact: &Artifact) -> Result<String> {
        tracing::info!("📤 Uploading {} to {} via ftp", artifact.file_name, self.host);

        let local = artifact.path.clone();
        let file_name = artifact.file_name.clone();
        self.with_session(move |ftp| {
            let mut file = std::fs::File::open(&local).map_err(FtpError::ConnectionError)?;
            ftp.put_file(file_name.as_str(), &mut file)?;
            Ok(())
        })
        .await?;

        Ok(self.location(&artifact.file_name))
    }

    async fn prune(&self, trigger: &str, keep: usize) -> Result<Vec<String>> {
        let trigger = trigger.to_string();
        let expired = self
            .with_session(move |ftp| {
                let names: Vec<String> = ftp.nlst(None)?.iter().map(|e| listed_name(e)).collect();
                let expired = expired_backups(names, &trigger, keep);
                for name in &expired {
                    ftp.rm(name.as_str())?;
                }
                Ok(expired)
            })
            .await?;

        let removed: Vec<String> = expired.iter().map(|name| self.location(name)).collect();
        for location in &removed {
            tracing::info!("🧹 Removed old backup {}", location);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_procedure() -> Procedure {
        Procedure::new("daily-db", "mysql")
            .with_storage("ftp")
            .with_storage_option("host", "ftp.example.com")
            .with_storage_option("user", "backup")
            .with_storage_option("password", "secret")
            .with_storage_option("path", "/backups/")
    }

    #[test]
    fn test_defaults_and_location() {
        let storage = FtpStorage::from_procedure(&base_procedure()).unwrap();

        assert_eq!(storage.kind(), StorageKind::Ftp);
        assert_eq!(storage.port, 21);
        assert!(storage.passive);
        assert_eq!(
            storage.location("20240101000000.daily-db.sql.zip"),
            "ftp://ftp.example.com:21/backups/20240101000000.daily-db.sql.zip"
        );
    }

    #[test]
    fn test_root_directory() {
        let procedure = base_procedure()
            .with_storage_option("path", "/")
            .with_storage_option("port", 2121i64)
            .with_storage_option("passive", false);
        let storage = FtpStorage::from_procedure(&procedure).unwrap();

        assert_eq!(storage.remote_dir(), "/");
        assert!(!storage.passive);
        assert_eq!(storage.location("a.zip"), "ftp://ftp.example.com:2121/a.zip");
    }

    #[test]
    fn test_requires_credentials() {
        let mut procedure = base_procedure();
        procedure.storage_options.remove("password");

        match FtpStorage::from_procedure(&procedure) {
            Err(BackupError::MissingConfigError { field }) => {
                assert_eq!(field, "procedure.daily-db.storage_options.password")
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("password should be required"),
        }
    }

    #[test]
    fn test_listed_name() {
        assert_eq!(listed_name("/backups/20240101000000.daily-db.sql.zip"), "20240101000000.daily-db.sql.zip");
        assert_eq!(listed_name("20240101000000.daily-db.sql.zip\r"), "20240101000000.daily-db.sql.zip");
    }
}
