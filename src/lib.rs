//! Imagegen Deployer - 图像生成服务远程部署工具
//!
//! 将目标主机从未知状态（无检出、损坏的检出、陈旧的检出）推进到
//! 运行中且通过健康检查的容器栈

pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod logging;
pub mod services;

use tracing::info;

use crate::config::env::constants::VERSION;
use crate::config::{EnvConfig, EnvironmentProfile, ProfileFile};
use crate::domain::deploy::DeployReport;
use crate::error::{DeployError, DeployResult};
use crate::infra::{ChannelError, LocalShell, SshChannel};
use crate::services::deploy::{self, DeployContext};

/// 按配置执行一次部署
///
/// 读取 profile、选择执行通道（本机 shell 或 SSH），然后运行部署流水线。
pub async fn run(config: &EnvConfig, ctx: &DeployContext) -> DeployResult<DeployReport> {
    info!(
        version = VERSION,
        run_id = %ctx.run_id,
        host = %config.target.host,
        environment = config.environment.as_str(),
        "Starting deployment"
    );

    let overrides = ProfileFile::load(&config.profile_path)?;
    let profile = EnvironmentProfile::resolve(config.environment, &overrides);
    let descriptor = config.environment.stack();

    if config.use_local_shell() {
        info!("Using local shell");
        return deploy::execute(ctx, &LocalShell, config, &profile, &descriptor).await;
    }

    let channel = SshChannel::connect(&config.target, &config.auth)
        .await
        .map_err(into_channel_error)?;
    let result = deploy::execute(ctx, &channel, config, &profile, &descriptor).await;
    channel.close().await;
    result
}

fn into_channel_error(err: anyhow::Error) -> DeployError {
    match err.downcast::<ChannelError>() {
        Ok(channel) => DeployError::Channel(channel),
        Err(other) => DeployError::Channel(ChannelError::Protocol(format!("{:#}", other))),
    }
}
