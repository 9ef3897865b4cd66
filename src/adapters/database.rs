use crate::adapters::{package, Source};
use crate::domain::model::{Artifact, Procedure, Workspace};
use crate::utils::error::Result;
use crate::utils::process::run_command;
use crate::utils::validation::validate_non_empty_string;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;

/// mysql 與 postgresql 共用的連線設定
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DatabaseOptions {
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub socket: Option<String>,
    #[serde(default)]
    pub skip_tables: Vec<String>,
    #[serde(default)]
    pub additional_options: Vec<String>,
}

impl DatabaseOptions {
    pub fn from_procedure(procedure: &Procedure) -> Result<Self> {
        let options: DatabaseOptions = procedure.adapter_options()?;
        validate_non_empty_string(
            &format!("procedure.{}.adapter_options.database", procedure.trigger),
            &options.database,
        )?;
        Ok(options)
    }
}

/// 一次資料庫 dump 所需的指令內容
pub(crate) struct DumpCommand<'a> {
    pub program: &'a str,
    pub args: Vec<String>,
    /// 密碼透過環境變數傳入，不出現在行程參數中
    pub password_env: Option<(&'a str, &'a str)>,
}

pub(crate) async fn dump_to_artifact(
    trigger: &str,
    database: &str,
    dump: DumpCommand<'_>,
    workspace: &Workspace,
) -> Result<Artifact> {
    let dump_path = workspace.dir.join(format!("{}.sql", database));
    tracing::info!("🗄️ Dumping database '{}' with {}", database, dump.program);

    let mut command = Command::new(dump.program);
    command
        .args(&dump.args)
        .stdout(Stdio::from(std::fs::File::create(&dump_path)?))
        .stderr(Stdio::piped());
    if let Some((key, value)) = dump.password_env {
        command.env(key, value);
    }

    run_command(command, dump.program, None).await?;

    let entry_name = format!("{}.sql", database);
    let destination = workspace.artifact_path("sql");
    let sources = vec![Source::new(dump_path, entry_name)];
    let (path, _) = package(sources, Vec::new(), destination).await?;

    Artifact::from_path(trigger, path)
}
