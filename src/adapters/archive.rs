use crate::adapters::{entry_name, package, Source};
use crate::domain::model::{AdapterKind, Artifact, Procedure, Workspace};
use crate::domain::ports::Adapter;
use crate::utils::error::{BackupError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArchiveOptions {
    pub files: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// 將指定的檔案與目錄打包成一個 zip
pub struct ArchiveAdapter {
    trigger: String,
    options: ArchiveOptions,
}

impl ArchiveAdapter {
    pub fn new(trigger: &str, procedure: &Procedure) -> Result<Self> {
        let options: ArchiveOptions = procedure.adapter_options()?;
        if options.files.is_empty() {
            return Err(BackupError::InvalidConfigValueError {
                field: format!("procedure.{}.adapter_options.files", procedure.trigger),
                value: "[]".to_string(),
                reason: "At least one file or directory is required".to_string(),
            });
        }

        Ok(Self {
            trigger: trigger.to_string(),
            options,
        })
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    fn sources(&self) -> Result<Vec<Source>> {
        self.options
            .files
            .iter()
            .map(|file| {
                let path = Path::new(file);
                if !path.exists() {
                    return Err(BackupError::InvalidConfigValueError {
                        field: format!("procedure.{}.adapter_options.files", self.trigger),
                        value: file.clone(),
                        reason: "Path does not exist".to_string(),
                    });
                }
                Ok(Source::new(path, entry_name(path)))
            })
            .collect()
    }
}

#[async_trait]
impl Adapter for ArchiveAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Archive
    }

    fn trigger(&self) -> &str {
        &self.trigger
    }

    async fn perform(&self, workspace: &Workspace) -> Result<Artifact> {
        let sources = self.sources()?;
        let exclude: Vec<PathBuf> = self.options.exclude.iter().map(PathBuf::from).collect();

        let destination = workspace.artifact_path("files");
        let (path, written) = package(sources, exclude, destination).await?;
        tracing::info!(
            "📦 Archived {} files from {} paths",
            written,
            self.options.files.len()
        );
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
    async fn test_archive_files_and_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir_all(data.join("uploads")).unwrap();
        std::fs::create_dir_all(data.join("cache")).unwrap();
        std::fs::write(data.join("uploads/a.png"), "png").unwrap();
        std::fs::write(data.join("cache/skip.tmp"), "tmp").unwrap();
        let single = tmp.path().join("nginx.conf");
        std::fs::write(&single, "server {}").unwrap();

        let procedure = Procedure::new("weekly-archive", "archive")
            .with_adapter_option(
                "files",
                vec![data.display().to_string(), single.display().to_string()],
            )
            .with_adapter_option("exclude", vec![data.join("cache").display().to_string()]);

        let adapter = ArchiveAdapter::new("weekly-archive", &procedure).unwrap();
        let tmp_root = tmp.path().join("tmp");
        let workspace = Workspace::create(&tmp_root, "weekly-archive", Utc::now()).unwrap();

        let artifact = adapter.perform(&workspace).await.unwrap();
        assert!(artifact.file_name.ends_with(".weekly-archive.files.zip"));
        assert!(artifact.size_bytes > 0);

        let mut archive = zip::ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                format!("{}/uploads/a.png", entry_name(&data)),
                entry_name(&single),
            ]
        );
    }

    #[tokio::test]
    async fn test_sources_with_same_basename() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("app1/config");
        let second = tmp.path().join("app2/config");
        for dir in [&first, &second] {
            std::fs::create_dir_all(dir).unwrap();
            std::fs::write(dir.join("db.yml"), dir.display().to_string()).unwrap();
        }

        let procedure = Procedure::new("configs", "archive").with_adapter_option(
            "files",
            vec![first.display().to_string(), second.display().to_string()],
        );
        let adapter = ArchiveAdapter::new("configs", &procedure).unwrap();
        let workspace = Workspace::create(&tmp.path().join("tmp"), "configs", Utc::now()).unwrap();

        let artifact = adapter.perform(&workspace).await.unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        for dir in [&first, &second] {
            let mut content = String::new();
            archive
                .by_name(&format!("{}/db.yml", entry_name(dir)))
                .unwrap()
                .read_to_string(&mut content)
                .unwrap();
            assert_eq!(content, dir.display().to_string());
        }
    }

    #[tokio::test]
    async fn test_missing_path_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let procedure = Procedure::new("weekly-archive", "archive")
            .with_adapter_option("files", vec!["/definitely/not/here"]);

        let adapter = ArchiveAdapter::new("weekly-archive", &procedure).unwrap();
        let workspace = Workspace::create(tmp.path(), "weekly-archive", Utc::now()).unwrap();

        let err = adapter.perform(&workspace).await.unwrap_err();
        assert!(matches!(err, BackupError::InvalidConfigValueError { value, .. } if value == "/definitely/not/here"));
    }

    #[test]
    fn test_requires_files() {
        let procedure = Procedure::new("weekly-archive", "archive")
            .with_adapter_option("files", Vec::<String>::new());
        assert!(ArchiveAdapter::new("weekly-archive", &procedure).is_err());
    }
}
