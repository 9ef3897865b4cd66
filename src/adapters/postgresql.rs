use crate::adapters::database::{dump_to_artifact, DatabaseOptions, DumpCommand};
use crate::domain::model::{AdapterKind, Artifact, Procedure, Workspace};
use crate::domain::ports::Adapter;
use crate::utils::error::Result;
use async_trait::async_trait;

const PG_DUMP: &str = "pg_dump";

pub struct PostgreSqlAdapter {
    trigger: String,
    options: DatabaseOptions,
}

impl PostgreSqlAdapter {
    pub fn new(trigger: &str, procedure: &Procedure) -> Result<Self> {
        Ok(Self {
            trigger: trigger.to_string(),
            options: DatabaseOptions::from_procedure(procedure)?,
        })
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    pub fn dump_args(&self) -> Vec<String> {
        let options = &self.options;
        // 不互動詢問密碼，密碼只走 PGPASSWORD
        let mut args = vec!["--no-password".to_string()];

        if let Some(user) = &options.user {
            args.push(format!("--username={}", user));
        }
        // pg_dump 的 socket 目錄也是用 --host 指定
        if let Some(host) = options.host.as_ref().or(options.socket.as_ref()) {
            args.push(format!("--host={}", host));
        }
        if let Some(port) = options.port {
            args.push(format!("--port={}", port));
        }
        args.extend(options.additional_options.iter().cloned());
        for table in &options.skip_tables {
            args.push(format!("--exclude-table={}", table));
        }
        args.push(options.database.clone());

        args
    }
}

#[async_trait]
impl Adapter for PostgreSqlAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::PostgreSql
    }

    fn trigger(&self) -> &str {
        &self.trigger
    }

    async fn perform(&self, workspace: &Workspace) -> Result<Artifact> {
        let dump = DumpCommand {
            program: PG_DUMP,
            args: self.dump_args(),
            password_env: self.options.password.as_deref().map(|pw| ("PGPASSWORD", pw)),
        };
        dump_to_artifact(&self.trigger, &self.options.database, dump, workspace).await
    }
}
