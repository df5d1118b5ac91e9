//! 统一错误处理
//!
//! 只有致命错误才会出现在这里；降级与尽力而为的步骤以警告形式记录在
//! `DeployReport` 中，不会成为 `DeployError`。

use thiserror::Error;

use crate::infra::remote::ChannelError;

/// 致命部署错误，直接中止本次运行
#[derive(Debug, Error)]
pub enum DeployError {
    /// 目标主机无法访问外网
    #[error("no internet connectivity on target host")]
    NoInternet,

    /// 需要克隆但 origin 不可达
    #[error("repository must be cloned into {path} but origin {origin} is unreachable")]
    CloneUnreachable { path: String, origin: String },

    /// 运行时/编排工具安装失败
    #[error("failed to install {tool} (exit status {status})")]
    InstallFailed { tool: String, status: i32 },

    /// 远程命令非零退出
    #[error("remote command `{command}` failed with exit status {status}")]
    RemoteCommandFailed { command: String, status: i32 },

    /// 执行通道错误（连接、超时等）
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),
}

impl DeployError {
    /// 创建配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// 进程退出码，始终落在 1..=255
    pub fn exit_code(&self) -> u8 {
        let code = match self {
            DeployError::NoInternet => 2,
            DeployError::CloneUnreachable { .. } => 3,
            DeployError::InstallFailed { status, .. } => *status,
            DeployError::RemoteCommandFailed { status, .. } => *status,
            DeployError::Channel(_) => 4,
            DeployError::Config(_) => 5,
        };
        clamp_exit_code(code)
    }
}

fn clamp_exit_code(code: i32) -> u8 {
    if (1..=255).contains(&code) {
        code as u8
    } else {
        1
    }
}

/// 便捷类型别名
pub type DeployResult<T> = Result<T, DeployError>;
