use crate::domain::model::{AdapterKind, Artifact, StorageKind, Workspace};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 產生備份檔的 adapter，由 `(trigger, procedure)` 建構
#[async_trait]
pub trait Adapter: Send + Sync {
    fn kind(&self) -> AdapterKind;
    fn trigger(&self) -> &str;
    async fn perform(&self, workspace: &Workspace) -> Result<Artifact>;
}

#[async_trait]
pub trait Storage: Send + Sync {
    fn kind(&self) -> StorageKind;

    /// 傳送備份檔，回傳最終位置
    async fn store(&self, artifact: &Artifact) -> Result<String>;

    /// 只保留該 trigger 最新的 `keep` 份，回傳被刪除的位置
    async fn prune(&self, trigger: &str, keep: usize) -> Result<Vec<String>>;
}
