// Storage layer: destinations that receive the produced artifact.

pub mod ftp;
pub mod local;
#[cfg(feature = "s3")]
pub mod s3;
pub mod ssh;

pub use ftp::FtpStorage;
pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;
pub use ssh::{SshProtocol, SshStorage};

use crate::domain::model::{Artifact, Procedure, StorageKind};
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// 依程序的 storage 名稱建立目的地；未知名稱回傳 `UnknownStorage`
pub fn build_storage(procedure: &Procedure) -> Result<Box<dyn Storage>> {
    let kind: StorageKind = procedure.storage_name.parse()?;
    tracing::debug!("Initializing {} storage for '{}'", kind, procedure.trigger);

    let storage: Box<dyn Storage> = match kind {
        StorageKind::Local => Box::new(LocalStorage::from_procedure(procedure)?),
        StorageKind::Scp => Box::new(SshStorage::from_procedure(SshProtocol::Scp, procedure)?),
        StorageKind::Sftp => Box::new(SshStorage::from_procedure(SshProtocol::Sftp, procedure)?),
        StorageKind::Ftp => Box::new(FtpStorage::from_procedure(procedure)?),
        StorageKind::S3 => s3_storage(procedure)?,
    };

    Ok(storage)
}

/// 從目的地上的檔名挑出超過保留份數的舊備份，最舊的在前。
///
/// 只看符合 `<timestamp>.<trigger>.<ext>.zip` 的檔名，其他檔案一律不動。
pub(crate) fn expired_backups<I>(names: I, trigger: &str, keep: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut names: Vec<String> = names
        .into_iter()
        .filter(|name| Artifact::belongs_to(name, trigger))
        .collect();
    // 檔名以時間戳開頭，排序即為時間順序
    names.sort();
    names.dedup();

    let excess = names.len().saturating_sub(keep);
    names.truncate(excess);
    names
}

#[cfg(feature = "s3")]
fn s3_storage(procedure: &Procedure) -> Result<Box<dyn Storage>> {
    Ok(Box::new(S3Storage::from_procedure(procedure)?))
}

#[cfg(not(feature = "s3"))]
fn s3_storage(_procedure: &Procedure) -> Result<Box<dyn Storage>> {
    Err(crate::utils::error::BackupError::FeatureDisabled {
        name: StorageKind::S3.to_string(),
        feature: "s3".to_string(),
    })
}
