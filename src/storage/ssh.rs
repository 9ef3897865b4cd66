use crate::domain::model::{Artifact, Procedure, StorageKind};
use crate::domain::ports::Storage;
use crate::storage::expired_backups;
use crate::utils::error::{BackupError, Result};
use crate::utils::process::run_command;
use crate::utils::validation::{validate_non_empty_string, validate_path, validate_range};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

const DEFAULT_SSH_PORT: u16 = 22;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SshOptions {
    pub host: String,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub path: String,
    pub identity_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshProtocol {
    Scp,
    Sftp,
}

impl SshProtocol {
    fn program(&self) -> &'static str {
        match self {
            SshProtocol::Scp => "scp",
            SshProtocol::Sftp => "sftp",
        }
    }
}

/// 透過系統的 scp / sftp 傳送到遠端主機，以 batch 模式執行，不會詢問密碼
#[derive(Debug, Clone)]
pub struct SshStorage {
    protocol: SshProtocol,
    options: SshOptions,
}

impl SshStorage {
    pub fn new(protocol: SshProtocol, options: SshOptions) -> Self {
        Self { protocol, options }
    }

    pub fn from_procedure(protocol: SshProtocol, procedure: &Procedure) -> Result<Self> {
        let options: SshOptions = procedure.storage_options()?;
        let field = |name: &str| format!("procedure.{}.storage_options.{}", procedure.trigger, name);

        validate_non_empty_string(&field("host"), &options.host)?;
        validate_path(&field("path"), &options.path)?;
        if let Some(port) = options.port {
            validate_range(&field("port"), port, 1, u16::MAX)?;
        }

        Ok(Self::new(protocol, options))
    }

    fn target(&self) -> String {
        match &self.options.user {
            Some(user) => format!("{}@{}", user, self.options.host),
            None => self.options.host.clone(),
        }
    }

    fn port(&self) -> u16 {
        self.options.port.unwrap_or(DEFAULT_SSH_PORT)
    }

    pub fn remote_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.options.path.trim_end_matches('/'), file_name)
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec!["-P".to_string(), self.port().to_string()];
        if let Some(identity) = &self.options.identity_file {
            args.push("-i".to_string());
            args.push(identity.clone());
        }
        args
    }

    pub fn scp_args(&self, artifact: &Artifact) -> Vec<String> {
        let mut args = vec!["-B".to_string()];
        args.extend(self.common_args());
        args.push(artifact.path.display().to_string());
        args.push(format!("{}:{}", self.target(), self.remote_path(&artifact.file_name)));
        args
    }

    pub fn sftp_args(&self) -> Vec<String> {
        let mut args = vec!["-b".to_string(), "-".to_string()];
        args.extend(self.common_args());
        args.push(self.target());
        args
    }

    fn remote_dir(&self) -> &str {
        self.options.path.trim_end_matches('/')
    }

    /// sftp batch：目錄已存在時 mkdir 失敗可忽略（`-` 前綴）
    pub fn sftp_batch(&self, artifact: &Artifact) -> String {
        format!(
            "-mkdir {}\nput {} {}\n",
            quote(self.remote_dir()),
            quote(&artifact.path.display().to_string()),
            quote(&self.remote_path(&artifact.file_name))
        )
    }

    pub fn sftp_list_batch(&self) -> String {
        format!("ls -1 {}\n", quote(self.remote_dir()))
    }

    pub fn sftp_remove_batch(&self, file_names: &[String]) -> String {
        file_names
            .iter()
            .map(|name| format!("rm {}\n", quote(&self.remote_path(name))))
            .collect()
    }

    /// 遠端上傳與清理都走 sftp；scp 無法列目錄，所以 scp storage 清理時也用 sftp
    async fn sftp(&self, batch: &str) -> Result<Vec<u8>> {
        let mut command = Command::new("sftp");
        command.args(self.sftp_args());
        run_command(command, "sftp", Some(batch.as_bytes()))
            .await
            .map_err(|e| BackupError::StorageError {
                message: e.to_string(),
            })
    }
}

/// sftp batch 的路徑一律加上雙引號，避免空白被拆開
fn quote(path: &str) -> String {
    format!("\"{}\"", path.replace('\\', "\\\\").replace('"', "\\\""))
}

/// 解析 `ls -1` 的輸出；batch 模式會回顯指令，而且可能列出完整路徑
fn listed_names(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("sftp>"))
        .filter_map(|line| line.rsplit('/').next())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Storage for SshStorage {
    fn kind(&self) -> StorageKind {
        match self.protocol {
            SshProtocol::Scp => StorageKind::Scp,
            SshProtocol::Sftp => StorageKind::Sftp,
        }
    }

    async fn store(&self, artifact: &Artifact) -> Result<String> {
        let program = self.protocol.program();
        tracing::info!(
            "📤 Transferring {} to {} via {}",
            artifact.file_name,
            self.options.host,
            program
        );

        match self.protocol {
            SshProtocol::Scp => {
                let mut command = Command::new(program);
                command.args(self.scp_args(artifact));
                run_command(command, program, None)
                    .await
                    .map_err(|e| BackupError::StorageError {
                        message: e.to_string(),
                    })?;
            }
            SshProtocol::Sftp => {
                self.sftp(&self.sftp_batch(artifact)).await?;
            }
        }

        Ok(format!(
            "{}:{}",
            self.target(),
            self.remote_path(&artifact.file_name)
        ))
    }

    async fn prune(&self, trigger: &str, keep: usize) -> Result<Vec<String>> {
        let listing = self.sftp(&self.sftp_list_batch()).await?;
        let expired = expired_backups(listed_names(&listing), trigger, keep);
        if expired.is_empty() {
            return Ok(Vec::new());
        }

        self.sftp(&self.sftp_remove_batch(&expired)).await?;

        let removed: Vec<String> = expired
            .iter()
            .map(|name| format!("{}:{}", self.target(), self.remote_path(name)))
            .collect();
        for location in &removed {
            tracing::info!("🧹 Removed old backup {}", location);
        }
        Ok(removed)
    }
}
