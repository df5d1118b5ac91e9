//! 基础设施模块
//!
//! 封装外部依赖（SSH 会话、本机命令执行等）

pub mod command;
pub mod remote;
pub mod ssh;

#[cfg(test)]
pub(crate) mod fake;

pub use command::{CommandRunner, LocalShell};
pub use remote::{ChannelError, HostsEntry, RemoteCommand, RemoteHost, RemoteOutput};
pub use ssh::SshChannel;
