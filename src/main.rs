use clap::Parser;
use small_backup::utils::{logger, validation::Validate};
use small_backup::{resolve, BackupConfig, BackupEngine, BackupError, CliArgs, RunPlan};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    let config_path = args.config_path();
    tracing::info!("📁 Loading configuration from: {}", config_path.display());

    let mut config = match BackupConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", config_path.display(), e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 命令列指定的平台優先於設定檔
    if let Some(platform) = args.platform {
        config.settings.platform = platform;
    }

    if let Err(e) = config.validate() {
        fail(&e);
    }

    // 沒有指定 trigger（或只要列表）時不解析程序
    let procedure = match resolve(args.requested_trigger(), &config.procedures) {
        Ok(procedure) => procedure,
        Err(e) => fail(&e),
    };
    let Some(procedure) = procedure else {
        print_triggers(&config);
        return Ok(());
    };
    let trigger = procedure.trigger.clone();

    let engine = BackupEngine::new_with_monitoring(config, args.monitor);

    if args.history {
        let records = engine.history().for_trigger(&trigger).await.unwrap_or_else(|e| fail(&e));
        if records.is_empty() {
            println!("No backups recorded for '{}'", trigger);
        }
        for record in records {
            println!(
                "{}  {:<10} {:<6} {:>10} bytes  {}",
                record.created_at.format("%Y-%m-%d %H:%M:%S"),
                record.adapter,
                record.storage,
                record.size_bytes,
                record.location
            );
        }
        return Ok(());
    }

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No backup will be performed");
        let plan = engine.plan(&trigger).unwrap_or_else(|e| fail(&e));
        display_plan(&plan);
        return Ok(());
    }

    if engine.monitor_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    match engine.run(&trigger).await {
        Ok(record) => {
            println!("✅ Backup '{}' completed successfully!", record.trigger);
            println!("📁 Stored at: {}", record.location);
        }
        Err(e) => fail(&e),
    }

    Ok(())
}

fn fail(e: &BackupError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    std::process::exit(e.exit_code())
}

fn print_triggers(config: &BackupConfig) {
    if config.procedures.is_empty() {
        println!("No backup procedures are configured.");
        return;
    }

    println!("📋 Available triggers:");
    for procedure in &config.procedures {
        println!(
            "  - {} ({} -> {})",
            procedure.trigger, procedure.adapter_name, procedure.storage_name
        );
    }
}

fn display_plan(plan: &RunPlan) {
    println!("📋 Backup Plan:");
    println!("  Trigger: {}", plan.trigger);
    println!("  Adapter: {}", plan.adapter);
    println!("  Storage: {}", plan.storage);
    match plan.keep_backups {
        Some(keep) => println!("  Keep: newest {}", keep),
        None => println!("  Keep: all"),
    }
    println!("  Tmp Path: {}", plan.tmp_path.display());
    println!();
    println!("✅ Dry run complete. Run without --dry-run to perform the backup.");
}
