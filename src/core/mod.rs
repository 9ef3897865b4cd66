pub mod dispatch;
pub mod engine;
pub mod history;
pub mod lookup;

pub use crate::domain::model::{AdapterKind, Artifact, BackupRecord, Procedure, StorageKind, Workspace};
pub use crate::domain::ports::{Adapter, Storage};
pub use crate::utils::error::Result;
