//! 环境文件生成
//!
//! 每次运行无条件覆盖 `<workdir>/.env`，从不读取旧文件

use tracing::info;

use crate::config::env::constants::ENV_FILE_NAME;
use crate::config::profile::EnvironmentProfile;
use crate::domain::target::DeploymentTarget;
use crate::error::DeployResult;
use crate::infra::remote::{RemoteCommand, RemoteHost};

/// 渲染为 `KEY=VALUE` 行
pub fn render(profile: &EnvironmentProfile) -> String {
    profile
        .entries()
        .iter()
        .map(|(key, value)| format!("{}={}\n", key, value))
        .collect()
}

/// 写出环境文件，返回目标路径
pub async fn materialize(
    host: &dyn RemoteHost,
    profile: &EnvironmentProfile,
    target: &DeploymentTarget,
) -> DeployResult<String> {
    let path = target.path_in_work_dir(ENV_FILE_NAME);
    host.run_checked(&RemoteCommand::WriteFile {
        path: path.clone(),
        contents: render(profile),
    })
    .await?;

    info!(path = %path, keys = profile.len(), "Environment file written");
    Ok(path)
}
