use crate::config::BackupConfig;
use crate::core::dispatch::dispatch;
use crate::core::history::History;
use crate::core::lookup::find_procedure;
use crate::domain::model::{AdapterKind, BackupRecord, Procedure, StorageKind, Workspace};
use crate::domain::ports::{Adapter, Storage};
use crate::storage::build_storage;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use chrono::Utc;
use std::path::PathBuf;

/// dry run 時顯示的執行計畫
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub trigger: String,
    pub adapter: AdapterKind,
    pub storage: StorageKind,
    pub keep_backups: Option<usize>,
    pub tmp_path: PathBuf,
}

pub struct BackupEngine {
    config: BackupConfig,
    history: History,
    monitor: SystemMonitor,
}

impl BackupEngine {
    pub fn new(config: BackupConfig) -> Self {
        Self::new_with_monitoring(config, false)
    }

    pub fn new_with_monitoring(config: BackupConfig, monitor_enabled: bool) -> Self {
        let history = History::new(config.settings.history_path());
        Self {
            config,
            history,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn with_history(mut self, history: History) -> Self {
        self.history = history;
        self
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn monitor_enabled(&self) -> bool {
        self.monitor.is_enabled()
    }

    /// 解析程序並建立 adapter 與 storage，但不執行
    pub fn plan(&self, trigger: &str) -> Result<RunPlan> {
        let procedure = find_procedure(trigger, &self.config.procedures)?;
        let adapter = dispatch(trigger, procedure)?;
        let storage = build_storage(procedure)?;

        Ok(RunPlan {
            trigger: trigger.to_string(),
            adapter: adapter.kind(),
            storage: storage.kind(),
            keep_backups: procedure.keep_backups,
            tmp_path: self.config.settings.tmp_path(),
        })
    }

    pub async fn run(&self, trigger: &str) -> Result<BackupRecord> {
        tracing::info!("🚀 Starting backup for trigger '{}'", trigger);

        let procedure = find_procedure(trigger, &self.config.procedures)?;
        let adapter = dispatch(trigger, procedure)?;
        let storage = build_storage(procedure)?;

        let workspace = Workspace::create(&self.config.settings.tmp_path(), trigger, Utc::now())?;
        tracing::debug!("Workspace: {}", workspace.dir.display());
        self.monitor.log_stats("Start");

        let result = self
            .execute(procedure, adapter.as_ref(), storage.as_ref(), &workspace)
            .await;

        // 成功或失敗都清掉暫存檔；清理失敗不影響結果
        if let Err(e) = workspace.cleanup() {
            tracing::warn!("Failed to clean up {}: {}", workspace.dir.display(), e);
        }
        self.monitor.log_final_stats();

        match &result {
            Ok(record) => tracing::info!("✅ Backup '{}' stored at {}", trigger, record.location),
            Err(e) => tracing::error!("❌ Backup '{}' failed: {}", trigger, e),
        }
        result
    }

    async fn execute(
        &self,
        procedure: &Procedure,
        adapter: &dyn Adapter,
        storage: &dyn Storage,
        workspace: &Workspace,
    ) -> Result<BackupRecord> {
        let trigger = adapter.trigger();

        tracing::info!("Performing {} backup", adapter.kind());
        let artifact = adapter.perform(workspace).await?;
        tracing::info!("Created {} ({} bytes)", artifact.file_name, artifact.size_bytes);
        self.monitor.log_stats("Backup created");

        tracing::info!("Storing with {}", storage.kind());
        let location = storage.store(&artifact).await?;
        self.monitor.log_stats("Backup stored");

        let record = BackupRecord {
            trigger: trigger.to_string(),
            adapter: adapter.kind(),
            storage: storage.kind(),
            location,
            size_bytes: artifact.size_bytes,
            created_at: Utc::now(),
        };
        self.history.append(&record).await?;

        // 備份已送達，清理舊檔失敗只記錄警告
        if let Some(keep) = procedure.keep_backups {
            match storage.prune(trigger, keep).await {
                Ok(removed) if !removed.is_empty() => {
                    tracing::info!("Removed {} old backups, keeping {}", removed.len(), keep)
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("⚠️ Failed to remove old backups for '{}': {}", trigger, e),
            }
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Artifact;
    use crate::utils::error::BackupError;
    use async_trait::async_trait;

    struct StaticAdapter;

    #[async_trait]
    impl Adapter for StaticAdapter {
        fn kind(&self) -> AdapterKind {
            AdapterKind::Custom
        }

        fn trigger(&self) -> &str {
            "nightly"
        }

        async fn perform(&self, workspace: &Workspace) -> Result<Artifact> {
            let path = workspace.artifact_path("custom");
            std::fs::write(&path, "zip")?;
            Artifact::from_path("nightly", path)
        }
    }

    /// 上傳成功但清理舊檔一定失敗
    struct UnprunableStorage;

    #[async_trait]
    impl Storage for UnprunableStorage {
        fn kind(&self) -> StorageKind {
            StorageKind::Sftp
        }

        async fn store(&self, artifact: &Artifact) -> Result<String> {
            Ok(format!("backup.example.com:/srv/{}", artifact.file_name))
        }

        async fn prune(&self, _trigger: &str, _keep: usize) -> Result<Vec<String>> {
            Err(BackupError::StorageError {
                message: "Permission denied".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_prune_failure_keeps_successful_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = BackupConfig::default();
        config.settings.root = Some(tmp.path().to_path_buf());
        let engine = BackupEngine::new(config);

        let procedure = Procedure::new("nightly", "custom").with_keep_backups(3);
        let workspace =
            Workspace::create(&engine.config().settings.tmp_path(), "nightly", Utc::now()).unwrap();

        let record = engine
            .execute(&procedure, &StaticAdapter, &UnprunableStorage, &workspace)
            .await
            .unwrap();
        workspace.cleanup().unwrap();

        assert_eq!(record.storage, StorageKind::Sftp);
        assert!(record.location.ends_with(".nightly.custom.zip"));
        assert_eq!(engine.history().records().await.unwrap(), vec![record]);
    }
}
