// Adapters layer: concrete backup producers (database dumps, file archives, user commands)
// plus the file collection and zip helpers they share.

pub mod archive;
pub mod custom;
pub mod database;
pub mod mysql;
pub mod postgresql;

pub use archive::ArchiveAdapter;
pub use custom::CustomAdapter;
pub use mysql::MySqlAdapter;
pub use postgresql::PostgreSqlAdapter;

use crate::utils::error::{BackupError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use zip::write::{SimpleFileOptions, ZipWriter};

/// 要打包的檔案或目錄，以及它在 zip 內的名稱
#[derive(Debug, Clone)]
pub(crate) struct Source {
    pub path: PathBuf,
    pub entry_name: String,
}

impl Source {
    pub fn new(path: impl Into<PathBuf>, entry_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entry_name: entry_name.into(),
        }
    }
}

/// zip 內的名稱採用完整路徑（去掉根目錄），不同來源下的同名目錄不會互相覆蓋
pub(crate) fn entry_name(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// 遞迴收集檔案，回傳 (實際路徑, zip 內的名稱)
fn collect_files(
    path: &Path,
    entry_name: &str,
    exclude: &[PathBuf],
    out: &mut Vec<(PathBuf, String)>,
) -> Result<()> {
    if exclude.iter().any(|excluded| path.starts_with(excluded)) {
        tracing::debug!("Excluding {}", path.display());
        return Ok(());
    }

    let metadata = std::fs::metadata(path)?;
    if metadata.is_dir() {
        let mut children: Vec<_> = std::fs::read_dir(path)?
            .collect::<std::io::Result<Vec<_>>>()?;
        children.sort_by_key(|entry| entry.file_name());

        for child in children {
            let child_name = child.file_name().to_string_lossy().to_string();
            let name = if entry_name.is_empty() {
                child_name
            } else {
                format!("{}/{}", entry_name, child_name)
            };
            collect_files(&child.path(), &name, exclude, out)?;
        }
    } else {
        out.push((path.to_path_buf(), entry_name.to_string()));
    }

    Ok(())
}

/// 走訪來源並寫成一個 zip，檔案 I/O 都在 blocking thread 上進行。
///
/// 回傳 zip 路徑與實際寫入的檔案數。
pub(crate) async fn package(
    sources: Vec<Source>,
    exclude: Vec<PathBuf>,
    destination: PathBuf,
) -> Result<(PathBuf, usize)> {
    tokio::task::spawn_blocking(move || -> Result<(PathBuf, usize)> {
        let mut entries = Vec::new();
        for source in &sources {
            collect_files(&source.path, &source.entry_name, &exclude, &mut entries)?;
        }
        let written = write_zip(&entries, &destination)?;
        Ok((destination, written))
    })
    .await
    .map_err(|e| BackupError::IoError(std::io::Error::other(e)))?
}

fn write_zip(entries: &[(PathBuf, String)], destination: &Path) -> Result<usize> {
    tracing::debug!(
        "Creating ZIP file {} with {} files",
        destination.display(),
        entries.len()
    );

    let mut zip = ZipWriter::new(File::create(destination)?);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .large_file(true);

    // 同一個檔案被列了兩次（例如同時列出目錄與其子目錄）只收一份
    let mut seen = HashSet::new();
    for (path, name) in entries {
        if !seen.insert(name.as_str()) {
            tracing::debug!("Skipping duplicate entry {}", name);
            continue;
        }
        zip.start_file(name.as_str(), options)?;
        let mut source = File::open(path)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    let mut file = zip.finish()?;
    file.flush()?;
    Ok(seen.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_collect_files_recurses_and_excludes() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("site");
        std::fs::create_dir_all(root.join("cache")).unwrap();
        std::fs::create_dir_all(root.join("public")).unwrap();
        std::fs::write(root.join("index.html"), "<html/>").unwrap();
        std::fs::write(root.join("public/app.js"), "js").unwrap();
        std::fs::write(root.join("cache/tmp.bin"), "x").unwrap();

        let mut entries = Vec::new();
        collect_files(&root, "site", &[root.join("cache")], &mut entries).unwrap();

        let names: Vec<&str> = entries.iter().map(|(_, name)| name.as_str()).collect();
        assert_eq!(names, vec!["site/index.html", "site/public/app.js"]);
    }

    #[test]
    fn test_entry_name_keeps_full_path() {
        assert_eq!(entry_name(Path::new("/srv/app1/config")), "srv/app1/config");
        assert_eq!(entry_name(Path::new("./www")), "www");
        assert_eq!(entry_name(Path::new("/")), "");
    }

    #[tokio::test]
    async fn test_package_writes_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("dump.sql");
        std::fs::write(&source, "CREATE TABLE users;").unwrap();

        let destination = tmp.path().join("out.zip");
        let sources = vec![Source::new(&source, "dump.sql")];
        let (path, written) = package(sources, Vec::new(), destination.clone())
            .await
            .unwrap();
        assert_eq!(path, destination);
        assert_eq!(written, 1);

        let mut archive = zip::ZipArchive::new(File::open(&destination).unwrap()).unwrap();
        let mut content = String::new();
        archive
            .by_name("dump.sql")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "CREATE TABLE users;");
    }

    #[tokio::test]
    async fn test_package_skips_overlapping_sources() {
        let tmp = tempfile::tempdir().unwrap();
        let site = tmp.path().join("site");
        std::fs::create_dir_all(site.join("public")).unwrap();
        std::fs::write(site.join("public/app.js"), "js").unwrap();

        let sources = vec![
            Source::new(&site, "site"),
            Source::new(site.join("public"), "site/public"),
        ];
        let (_, written) = package(sources, Vec::new(), tmp.path().join("out.zip"))
            .await
            .unwrap();
        assert_eq!(written, 1);
    }
}
