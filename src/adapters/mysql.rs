use crate::adapters::database::{dump_to_artifact, DatabaseOptions, DumpCommand};
use crate::domain::model::{AdapterKind, Artifact, Procedure, Workspace};
use crate::domain::ports::Adapter;
use crate::utils::error::Result;
use async_trait::async_trait;

const MYSQLDUMP: &str = "mysqldump";

pub struct MySqlAdapter {
    trigger: String,
    options: DatabaseOptions,
}

impl MySqlAdapter {
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
        let mut args = Vec::new();

        if let Some(user) = &options.user {
            args.push(format!("--user={}", user));
        }
        if let Some(host) = &options.host {
            args.push(format!("--host={}", host));
        }
        if let Some(port) = options.port {
            args.push(format!("--port={}", port));
        }
        if let Some(socket) = &options.socket {
            args.push(format!("--socket={}", socket));
        }
        args.extend(options.additional_options.iter().cloned());
        for table in &options.skip_tables {
            args.push(format!("--ignore-table={}.{}", options.database, table));
        }
        args.push(options.database.clone());

        args
    }
}

#[async_trait]
impl Adapter for MySqlAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::MySql
    }

    fn trigger(&self) -> &str {
        &self.trigger
    }

    async fn perform(&self, workspace: &Workspace) -> Result<Artifact> {
        let dump = DumpCommand {
            program: MYSQLDUMP,
            args: self.dump_args(),
            password_env: self.options.password.as_deref().map(|pw| ("MYSQL_PWD", pw)),
        };
        dump_to_artifact(&self.trigger, &self.options.database, dump, workspace).await
    }
}
