//! 远程执行通道
//!
//! The reconciler never sends an opaque script. Every step is a typed
//! [`RemoteCommand`] that renders to one shell line, so a [`RemoteHost`]
//! implementation can either execute the line (SSH, local shell) or interpret
//! the variant directly (the in-memory host used in tests).

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::env::constants::{
    COMMAND_TIMEOUT_SECS, LONG_COMMAND_TIMEOUT_SECS, PROBE_TIMEOUT_SECS,
};
use crate::domain::stack::ComposeTool;
use crate::error::{DeployError, DeployResult};

/// hosts 文件条目
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostsEntry {
    pub address: String,
    pub hostname: String,
}

impl HostsEntry {
    pub fn new(address: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            hostname: hostname.into(),
        }
    }

    pub fn line(&self) -> String {
        format!("{} {}", self.address, self.hostname)
    }
}

/// 远程操作
#[derive(Clone, Debug, PartialEq)]
pub enum RemoteCommand {
    /// ICMP 探测
    Ping { address: String },
    /// TCP 连接探测
    TcpConnect { host: String, port: u16 },
    /// 追加 /etc/hosts 条目
    AppendHosts { entries: Vec<HostsEntry> },
    DirExists { path: String },
    PathExists { path: String },
    /// 递归删除
    RemoveAll { path: String },
    CreateDir { path: String },
    /// 覆盖写文件
    WriteFile { path: String, contents: String },
    /// `git -C <dir> <args...>`
    Git { dir: String, args: Vec<String> },
    /// 检测可执行文件是否存在
    CommandExists { program: String },
    /// 安装脚本（固定版本）
    Install { tool: String, script: String },
    /// `cd <dir> && <compose> -p <project> -f <file> <args...>`
    Compose {
        dir: String,
        tool: ComposeTool,
        project: String,
        file: String,
        args: Vec<String>,
    },
    /// `docker <args...>`
    Docker { args: Vec<String> },
}

impl RemoteCommand {
    pub fn git(dir: &str, args: &[&str]) -> Self {
        RemoteCommand::Git {
            dir: dir.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn docker(args: &[&str]) -> Self {
        RemoteCommand::Docker {
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// 渲染为一行 shell
    pub fn to_shell(&self) -> String {
        match self {
            RemoteCommand::Ping { address } => {
                format!("ping -c 1 -W {} {}", PROBE_TIMEOUT_SECS, shell_quote(address))
            }
            RemoteCommand::TcpConnect { host, port } => {
                let probe = format!("exec 3<>/dev/tcp/{}/{}", host, port);
                format!("timeout {} bash -c {}", PROBE_TIMEOUT_SECS, shell_quote(&probe))
            }
            RemoteCommand::AppendHosts { entries } => {
                let lines: Vec<String> = entries.iter().map(|e| shell_quote(&e.line())).collect();
                format!(
                    "if [ \"$(id -u)\" -eq 0 ]; then SUDO=; else SUDO='sudo -n'; fi; \
                     printf '%s\\n' {} | $SUDO tee -a /etc/hosts > /dev/null",
                    lines.join(" ")
                )
            }
            RemoteCommand::DirExists { path } => format!("test -d {}", shell_quote(path)),
            RemoteCommand::PathExists { path } => format!("test -e {}", shell_quote(path)),
            RemoteCommand::RemoveAll { path } => format!("rm -rf {}", shell_quote(path)),
            RemoteCommand::CreateDir { path } => format!("mkdir -p {}", shell_quote(path)),
            RemoteCommand::WriteFile { path, contents } => {
                format!("printf '%s' {} > {}", shell_quote(contents), shell_quote(path))
            }
            RemoteCommand::Git { dir, args } => {
                format!("git -C {} {}", shell_quote(dir), join_quoted(args))
            }
            RemoteCommand::CommandExists { program } => {
                format!("command -v {} > /dev/null 2>&1", shell_quote(program))
            }
            RemoteCommand::Install { script, .. } => script.clone(),
            RemoteCommand::Compose {
                dir,
                tool,
                project,
                file,
                args,
            } => format!(
                "cd {} && {} -p {} -f {} {}",
                shell_quote(dir),
                tool.invocation(),
                shell_quote(project),
                shell_quote(file),
                join_quoted(args)
            ),
            RemoteCommand::Docker { args } => format!("docker {}", join_quoted(args)),
        }
    }

    /// 日志中使用的简短描述（不包含文件内容）
    pub fn describe(&self) -> String {
        match self {
            RemoteCommand::WriteFile { path, contents } => {
                format!("write {} ({} bytes)", path, contents.len())
            }
            RemoteCommand::Install { tool, .. } => format!("install {}", tool),
            RemoteCommand::AppendHosts { entries } => {
                format!("append {} entries to /etc/hosts", entries.len())
            }
            other => other.to_shell(),
        }
    }

    /// 该命令的超时时间
    pub fn timeout(&self) -> Duration {
        let secs = match self {
            RemoteCommand::Ping { .. } | RemoteCommand::TcpConnect { .. } => {
                PROBE_TIMEOUT_SECS * 3
            }
            RemoteCommand::Install { .. } | RemoteCommand::Compose { .. } => {
                LONG_COMMAND_TIMEOUT_SECS
            }
            RemoteCommand::Git { args, .. }
                if matches!(
                    args.first().map(String::as_str),
                    Some("clone" | "fetch" | "pull")
                ) =>
            {
                LONG_COMMAND_TIMEOUT_SECS
            }
            _ => COMMAND_TIMEOUT_SECS,
        };
        Duration::from_secs(secs)
    }
}

/// 远程命令输出
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemoteOutput {
    /// 退出状态，未收到时为 -1
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RemoteOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_status: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    /// stdout + stderr 合并输出
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }
}

/// 通道错误
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },

    #[error("authentication failed for user {user}")]
    Auth { user: String },

    #[error("command `{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("failed to spawn command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ssh protocol error: {0}")]
    Protocol(String),
}

/// 远程主机
///
/// 一次运行只使用一个实例，按顺序调用
#[async_trait]
pub trait RemoteHost: Send + Sync {
    /// 执行命令；非零退出不是错误，由调用方判定
    async fn run(&self, command: &RemoteCommand) -> Result<RemoteOutput, ChannelError>;

    /// 命令是否以 0 退出
    async fn succeeds(&self, command: &RemoteCommand) -> Result<bool, ChannelError> {
        Ok(self.run(command).await?.success())
    }

    /// 执行命令，非零退出视为致命错误
    async fn run_checked(&self, command: &RemoteCommand) -> DeployResult<RemoteOutput> {
        let output = self.run(command).await?;
        if output.success() {
            Ok(output)
        } else {
            tracing::error!(
                command = %command.describe(),
                status = output.exit_status,
                stderr = %output.stderr.trim(),
                "Remote command failed"
            );
            Err(DeployError::RemoteCommandFailed {
                command: command.describe(),
                status: output.exit_status,
            })
        }
    }
}

/// POSIX shell 单引号转义
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn join_quoted(args: &[String]) -> String {
    args.iter()
        .map(|a| shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}
