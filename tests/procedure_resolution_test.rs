use anyhow::Result;
use small_backup::{dispatch, find_procedure, resolve, AdapterKind, BackupConfig, BackupError, Procedure};

fn example_procedures() -> Vec<Procedure> {
    vec![
        Procedure::new("daily-db", "mysql").with_adapter_option("database", "shop"),
        Procedure::new("weekly-archive", "archive").with_adapter_option("files", vec!["/etc"]),
    ]
}

#[test]
fn test_resolve_returns_matching_procedure() -> Result<()> {
    let procedures = example_procedures();

    let found = resolve(Some("weekly-archive"), &procedures)?.expect("procedure should resolve");
    assert_eq!(found, &procedures[1]);

    let found = find_procedure("daily-db", &procedures)?;
    assert_eq!(found.trigger, "daily-db");
    Ok(())
}

#[test]
fn test_unknown_trigger_lists_all_triggers_in_order() {
    let procedures = example_procedures();

    let err = resolve(Some("monthly"), &procedures).unwrap_err();
    let message = err.to_string();

    assert!(matches!(err, BackupError::ProcedureNotFound { .. }));
    assert!(message.contains("Could not find a backup procedure with the trigger \"monthly\""));
    let daily = message.find("- daily-db\n").expect("daily-db listed");
    let weekly = message.find("- weekly-archive\n").expect("weekly-archive listed");
    assert!(daily < weekly);
}

#[test]
fn test_unknown_trigger_with_no_procedures() {
    let err = find_procedure("daily-db", &[]).unwrap_err();
    match err {
        BackupError::ProcedureNotFound { trigger, available } => {
            assert_eq!(trigger, "daily-db");
            assert!(available.is_empty());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_absent_trigger_skips_resolution() -> Result<()> {
    assert!(resolve(None, &example_procedures())?.is_none());
    Ok(())
}

#[test]
fn test_duplicate_triggers_resolve_to_first() -> Result<()> {
    let config = BackupConfig::from_toml_str(
        r#"
[[procedure]]
trigger = "nightly"
adapter = "postgresql"
[procedure.adapter_options]
database = "first"

[[procedure]]
trigger = "nightly"
adapter = "mysql"
[procedure.adapter_options]
database = "second"
"#,
    )?;

    for _ in 0..5 {
        let procedure = find_procedure("nightly", &config.procedures)?;
        assert_eq!(procedure.adapter_name, "postgresql");

        let adapter = dispatch("nightly", procedure)?;
        assert_eq!(adapter.kind(), AdapterKind::PostgreSql);
    }
    Ok(())
}

#[test]
fn test_resolve_then_dispatch() -> Result<()> {
    let procedures = example_procedures();

    let procedure = find_procedure("weekly-archive", &procedures)?;
    let adapter = dispatch("weekly-archive", procedure)?;

    assert_eq!(adapter.kind(), AdapterKind::Archive);
    assert_eq!(adapter.trigger(), "weekly-archive");
    Ok(())
}

#[test]
fn test_dispatch_unknown_adapter() {
    let procedure = Procedure::new("legacy-db", "oracle");

    match dispatch("legacy-db", &procedure) {
        Err(BackupError::UnknownAdapter(tag)) => assert_eq!(tag, "oracle"),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("oracle should not dispatch"),
    }
}

#[test]
fn test_resolution_is_safe_across_threads() {
    let procedures = std::sync::Arc::new(example_procedures());

    let handles: Vec<_> = ["daily-db", "weekly-archive", "daily-db", "weekly-archive"]
        .into_iter()
        .map(|trigger| {
            let procedures = procedures.clone();
            std::thread::spawn(move || {
                let procedure = find_procedure(trigger, &procedures).unwrap();
                dispatch(trigger, procedure).unwrap().kind()
            })
        })
        .collect();

    let kinds: Vec<AdapterKind> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        kinds,
        vec![
            AdapterKind::MySql,
            AdapterKind::Archive,
            AdapterKind::MySql,
            AdapterKind::Archive
        ]
    );
}
