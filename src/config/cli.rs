use crate::config::platform::Platform;
use crate::config::BackupConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "backup")]
#[command(about = "Run configured backup procedures by trigger")]
pub struct CliArgs {
    /// Path to the TOML configuration file (defaults to <root>/config/backup.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Platform layout used for default paths
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// Trigger of the procedure to run
    #[arg(short, long)]
    pub trigger: Option<String>,

    /// List the configured triggers and exit
    #[arg(long)]
    pub list: bool,

    /// Show recorded backups for the trigger
    #[arg(long, requires = "trigger")]
    pub history: bool,

    /// Resolve the procedure and build the adapter without running it
    #[arg(long, requires = "trigger")]
    pub dry_run: bool,

    /// Emit JSON log lines instead of the compact format
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

impl CliArgs {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| BackupConfig::default_path(self.platform.unwrap_or_default()))
    }

    /// 只有真的要執行或查詢某個程序時才需要解析 trigger
    pub fn requested_trigger(&self) -> Option<&str> {
        if self.list {
            None
        } else {
            self.trigger.as_deref()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trigger_run() {
        let args = CliArgs::parse_from(["backup", "-t", "daily-db", "--verbose"]);
        assert_eq!(args.requested_trigger(), Some("daily-db"));
        assert!(args.verbose);
        assert_eq!(
            args.config_path(),
            PathBuf::from("/opt/backup/config/backup.toml")
        );
    }

    #[test]
    fn test_list_skips_resolution() {
        let args = CliArgs::parse_from(["backup", "--list", "-t", "daily-db"]);
        assert_eq!(args.requested_trigger(), None);
    }

    #[test]
    fn test_platform_changes_default_config_path() {
        let args = CliArgs::parse_from(["backup", "--platform", "rails"]);
        assert_eq!(args.platform, Some(Platform::Rails));
        assert_eq!(args.config_path(), PathBuf::from("./config/backup.toml"));
    }

    #[test]
    fn test_dry_run_requires_trigger() {
        assert!(CliArgs::try_parse_from(["backup", "--dry-run"]).is_err());
    }
}
