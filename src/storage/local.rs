use crate::domain::model::{Artifact, Procedure, StorageKind};
use crate::storage::expired_backups;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use crate::utils::validation::validate_path;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct LocalOptions {
    pub path: String,
}

/// 複製到本機（或掛載的）目錄
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn from_procedure(procedure: &Procedure) -> Result<Self> {
        let options: LocalOptions = procedure.storage_options()?;
        validate_path(
            &format!("procedure.{}.storage_options.path", procedure.trigger),
            &options.path,
        )?;
        Ok(Self::new(options.path))
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    async fn stored_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.base_path.exists() {
            return Ok(names);
        }

        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    async fn store(&self, artifact: &Artifact) -> Result<String> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        let destination = self.base_path.join(&artifact.file_name);
        tokio::fs::copy(&artifact.path, &destination).await?;

        Ok(destination.display().to_string())
    }

    async fn prune(&self, trigger: &str, keep: usize) -> Result<Vec<String>> {
        let expired = expired_backups(self.stored_files().await?, trigger, keep);

        let mut removed = Vec::new();
        for name in expired {
            let path = self.base_path.join(&name);
            tokio::fs::remove_file(&path).await?;
            tracing::info!("🧹 Removed old backup {}", path.display());
            removed.push(path.display().to_string());
        }

        Ok(removed)
    }
}
