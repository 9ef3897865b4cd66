use crate::utils::error::{BackupError, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// 執行外部指令並等待結束。
///
/// stdout 若呼叫端沒有另外導向檔案，會收進記憶體回傳；`stdin` 有值時寫入後關閉。
/// 非零結束碼回傳 `CommandError`，附上 stderr。
pub async fn run_command(mut command: Command, program: &str, stdin: Option<&[u8]>) -> Result<Vec<u8>> {
    tracing::debug!("Running command: {:?}", command.as_std());

    let spawn_error = |e: std::io::Error| BackupError::CommandError {
        program: program.to_string(),
        status: "spawn failure".to_string(),
        stderr: e.to_string(),
    };

    command.kill_on_drop(true).stderr(Stdio::piped());
    if stdin.is_some() {
        command.stdin(Stdio::piped());
    }

    let output = match stdin {
        Some(input) => {
            let mut child = command.stdout(Stdio::piped()).spawn().map_err(spawn_error)?;
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input).await?;
            }
            child.wait_with_output().await?
        }
        None => command.output().await.map_err(spawn_error)?,
    };

    if !output.status.success() {
        return Err(BackupError::CommandError {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}
