//! 本机命令执行器
//!
//! 提供统一的本机命令执行接口，支持：
//! - 超时控制
//! - stdout/stderr 分离
//!
//! `LocalShell` 基于它实现 `RemoteHost`，用于目标就是本机的部署。

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::infra::remote::{ChannelError, RemoteCommand, RemoteHost, RemoteOutput};

/// 命令执行器
pub struct CommandRunner;

impl CommandRunner {
    /// 执行简单命令（无流式输出）
    pub async fn run_simple(
        program: &str,
        args: &[&str],
        work_dir: &Path,
        timeout: Duration,
    ) -> Result<std::process::Output, ChannelError> {
        let child = Command::new(program)
            .args(args)
            .current_dir(work_dir)
            .kill_on_drop(true)
            .output();

        tokio::select! {
            result = child => {
                result.map_err(ChannelError::Spawn)
            }
            _ = tokio::time::sleep(timeout) => {
                error!("Command timed out after {:?}", timeout);
                Err(ChannelError::Timeout {
                    command: format!("{} {}", program, args.join(" ")),
                    secs: timeout.as_secs(),
                })
            }
        }
    }

    /// 执行 shell 命令
    ///
    /// 使用 sh -c 执行命令字符串
    pub async fn run_shell(
        command: &str,
        work_dir: &Path,
        timeout: Duration,
    ) -> Result<std::process::Output, ChannelError> {
        Self::run_simple("sh", &["-c", command], work_dir, timeout).await
    }
}

/// 本机 shell 通道
pub struct LocalShell;

#[async_trait]
impl RemoteHost for LocalShell {
    async fn run(&self, command: &RemoteCommand) -> Result<RemoteOutput, ChannelError> {
        let line = command.to_shell();
        debug!(command = %command.describe(), "Running local command");

        let output = CommandRunner::run_shell(&line, Path::new("/"), command.timeout())
            .await
            .map_err(|e| match e {
                ChannelError::Timeout { secs, .. } => ChannelError::Timeout {
                    command: command.describe(),
                    secs,
                },
                other => other,
            })?;

        Ok(RemoteOutput {
            exit_status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
