pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod storage;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use config::{platform::Platform, BackupConfig};
pub use crate::core::{
    dispatch::dispatch,
    engine::{BackupEngine, RunPlan},
    history::History,
    lookup::{find_procedure, resolve},
};
pub use domain::model::{AdapterKind, Artifact, BackupRecord, Procedure, StorageKind};
pub use utils::error::{BackupError, Result};
