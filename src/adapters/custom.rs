use crate::adapters::{package, Source};
use crate::domain::model::{AdapterKind, Artifact, Procedure, Workspace};
use crate::domain::ports::Adapter;
use crate::utils::error::{BackupError, Result};
use crate::utils::process::run_command;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CustomOptions {
    pub commands: Vec<String>,
}

/// 依序執行使用者指令，再把工作目錄裡留下的所有檔案打包
pub struct CustomAdapter {
    trigger: String,
    options: CustomOptions,
}

impl CustomAdapter {
    pub fn new(trigger: &str, procedure: &Procedure) -> Result<Self> {
        let options: CustomOptions = procedure.adapter_options()?;
        if options.commands.iter().all(|command| command.trim().is_empty()) {
            return Err(BackupError::InvalidConfigValueError {
                field: format!("procedure.{}.adapter_options.commands", procedure.trigger),
                value: format!("{:?}", options.commands),
                reason: "At least one non-empty command is required".to_string(),
            });
        }

        Ok(Self {
            trigger: trigger.to_string(),
            options,
        })
    }

    pub fn options(&self) -> &CustomOptions {
        &self.options
    }
}

#[async_trait]
impl Adapter for CustomAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Custom
    }

    fn trigger(&self) -> &str {
        &self.trigger
    }

    async fn perform(&self, workspace: &Workspace) -> Result<Artifact> {
        for (index, script) in self.options.commands.iter().enumerate() {
            if script.trim().is_empty() {
                continue;
            }
            tracing::info!("⚙️ Running custom command {}/{}", index + 1, self.options.commands.len());

            let mut command = Command::new("sh");
            command
                .arg("-c")
                .arg(script)
                .current_dir(&workspace.dir)
                .env("BACKUP_WORKSPACE", &workspace.dir)
                .env("BACKUP_TRIGGER", &self.trigger);

            let stdout = run_command(command, "sh", None).await?;
            if !stdout.is_empty() {
                tracing::debug!("{}", String::from_utf8_lossy(&stdout).trim());
            }
        }

        let destination = workspace.artifact_path("custom");
        let sources = vec![Source::new(&workspace.dir, "")];
        let (path, written) = package(sources, Vec::new(), destination).await?;
        if written == 0 {
            tracing::warn!("Custom commands for '{}' produced no files", self.trigger);
        }
        Artifact::from_path(&self.trigger, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs::File;
    use std::io::Read;

    #[tokio::test]
    async fn test_commands_run_inside_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let procedure = Procedure::new("redis-snapshot", "custom").with_adapter_option(
            "commands",
            vec![
                "echo \"$BACKUP_TRIGGER\" > trigger.txt",
                "mkdir -p nested && echo dump > nested/dump.rdb",
            ],
        );

        let adapter = CustomAdapter::new("redis-snapshot", &procedure).unwrap();
        let workspace = Workspace::create(tmp.path(), "redis-snapshot", Utc::now()).unwrap();

        let artifact = adapter.perform(&workspace).await.unwrap();
        assert!(artifact.file_name.ends_with(".redis-snapshot.custom.zip"));

        let mut archive = zip::ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        let mut trigger = String::new();
        archive
            .by_name("trigger.txt")
            .unwrap()
            .read_to_string(&mut trigger)
            .unwrap();
        assert_eq!(trigger.trim(), "redis-snapshot");
        assert!(archive.by_name("nested/dump.rdb").is_ok());
    }

    #[tokio::test]
    async fn test_failing_command_stops_run() {
        let tmp = tempfile::tempdir().unwrap();
        let procedure = Procedure::new("broken", "custom")
            .with_adapter_option("commands", vec!["exit 7", "touch never.txt"]);

        let adapter = CustomAdapter::new("broken", &procedure).unwrap();
        let workspace = Workspace::create(tmp.path(), "broken", Utc::now()).unwrap();

        let err = adapter.perform(&workspace).await.unwrap_err();
        assert!(matches!(err, BackupError::CommandError { .. }));
        assert!(!workspace.dir.join("never.txt").exists());
    }

    #[test]
    fn test_requires_commands() {
        let procedure = Procedure::new("empty", "custom").with_adapter_option("commands", vec![""]);
        assert!(CustomAdapter::new("empty", &procedure).is_err());
    }
}
