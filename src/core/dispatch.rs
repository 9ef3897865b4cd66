use crate::adapters::{ArchiveAdapter, CustomAdapter, MySqlAdapter, PostgreSqlAdapter};
use crate::domain::model::{AdapterKind, Procedure};
use crate::domain::ports::Adapter;
use crate::utils::error::Result;

/// 依程序宣告的 adapter 名稱建立對應的 adapter。
///
/// 名稱必須完全符合 `mysql`、`postgresql`、`archive`、`custom` 其中之一，
/// 否則回傳 `UnknownAdapter`。adapter 建構時的錯誤原樣往上傳。
pub fn dispatch(trigger: &str, procedure: &Procedure) -> Result<Box<dyn Adapter>> {
    let kind: AdapterKind = procedure.adapter_name.parse()?;
    build_adapter(kind, trigger, procedure)
}

pub fn build_adapter(kind: AdapterKind, trigger: &str, procedure: &Procedure) -> Result<Box<dyn Adapter>> {
    tracing::debug!("Initializing {} adapter for '{}'", kind, trigger);

    let adapter: Box<dyn Adapter> = match kind {
        AdapterKind::MySql => Box::new(MySqlAdapter::new(trigger, procedure)?),
        AdapterKind::PostgreSql => Box::new(PostgreSqlAdapter::new(trigger, procedure)?),
        AdapterKind::Archive => Box::new(ArchiveAdapter::new(trigger, procedure)?),
        AdapterKind::Custom => Box::new(CustomAdapter::new(trigger, procedure)?),
    };

    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::BackupError;

    fn procedure_for(kind: &str) -> Procedure {
        let procedure = Procedure::new(format!("{}-job", kind), kind);
        match kind {
            "mysql" | "postgresql" => procedure.with_adapter_option("database", "app"),
            "archive" => procedure.with_adapter_option("files", vec!["/etc/hosts"]),
            "custom" => procedure.with_adapter_option("commands", vec!["true"]),
            _ => procedure,
        }
    }

    #[test]
    fn test_dispatch_every_known_kind() {
        for kind in AdapterKind::ALL {
            let procedure = procedure_for(kind.as_str());
            let adapter = dispatch(&procedure.trigger, &procedure).unwrap();

            assert_eq!(adapter.kind(), kind);
            assert_eq!(adapter.trigger(), procedure.trigger);
        }
    }

    #[test]
    fn test_dispatch_passes_trigger_unchanged() {
        let procedure = procedure_for("archive");
        let adapter = dispatch("manual-run", &procedure).unwrap();
        assert_eq!(adapter.trigger(), "manual-run");
    }

    #[test]
    fn test_unknown_adapter_names_tag() {
        let procedure = Procedure::new("legacy", "oracle");

        let err = dispatch("legacy", &procedure).err().unwrap();
        assert!(matches!(err, BackupError::UnknownAdapter(ref tag) if tag == "oracle"));
        assert!(err.to_string().contains("\"oracle\""));
    }

    #[test]
    fn test_tag_is_case_sensitive() {
        let procedure = procedure_for("mysql");
        let procedure = Procedure {
            adapter_name: "MySQL".to_string(),
            ..procedure
        };
        assert!(matches!(
            dispatch("mysql-job", &procedure),
            Err(BackupError::UnknownAdapter(_))
        ));
    }

    #[test]
    fn test_construction_errors_propagate() {
        // mysql 缺少 database
        let procedure = Procedure::new("daily-db", "mysql");
        assert!(matches!(
            dispatch("daily-db", &procedure),
            Err(BackupError::ConfigValidationError { .. })
        ));
    }
}
