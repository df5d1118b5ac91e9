//! Docker / Compose 生命周期管理
//!
//! Installs the runtime and the compose tool when missing, then rebuilds the
//! stack from scratch: stop, optional prune, pull, build, start. There is no
//! rollback; a failed build or start aborts the run.

use tracing::{debug, info, warn};

use crate::config::env::constants::{COMPOSE_VERSION, DOCKER_VERSION, LOG_TAIL_LINES};
use crate::domain::stack::{ComposeTool, ContainerStackDescriptor};
use crate::domain::target::DeploymentTarget;
use crate::error::{DeployError, DeployResult};
use crate::infra::remote::{RemoteCommand, RemoteHost};

/// 重新部署结果
#[derive(Clone, Debug, Default)]
pub struct RedeployOutcome {
    /// `ps -q` 列出的已停止容器
    pub stopped: Vec<String>,
    pub prune_attempted: bool,
    /// 非致命问题
    pub warnings: Vec<String>,
    /// 启动后的 `ps` 输出
    pub status: String,
    /// 启动后的最近日志
    pub logs: String,
}

impl RedeployOutcome {
    pub fn nothing_to_stop(&self) -> bool {
        self.stopped.is_empty()
    }
}

fn docker_install_script() -> String {
    format!(
        "curl -fsSL https://get.docker.com -o /tmp/get-docker.sh && \
         sh /tmp/get-docker.sh --version {}",
        DOCKER_VERSION
    )
}

fn compose_install_script() -> String {
    format!(
        "curl -fsSL \"https://github.com/docker/compose/releases/download/{}/docker-compose-$(uname -s | tr '[:upper:]' '[:lower:]')-$(uname -m)\" \
         -o /usr/local/bin/docker-compose && chmod +x /usr/local/bin/docker-compose",
        COMPOSE_VERSION
    )
}

async fn install(host: &dyn RemoteHost, tool: &str, script: String) -> DeployResult<()> {
    info!(tool = %tool, "Installing");
    let output = host
        .run(&RemoteCommand::Install {
            tool: tool.to_string(),
            script,
        })
        .await?;

    if !output.success() {
        warn!(tool = %tool, status = output.exit_status, stderr = %output.stderr.trim(), "Install failed");
        return Err(DeployError::InstallFailed {
            tool: tool.to_string(),
            status: output.exit_status,
        });
    }
    info!(tool = %tool, "Installed");
    Ok(())
}

/// 确保 Docker 已安装
pub async fn ensure_runtime(host: &dyn RemoteHost) -> DeployResult<()> {
    let installed = host
        .succeeds(&RemoteCommand::CommandExists {
            program: "docker".to_string(),
        })
        .await?;

    if installed {
        debug!("Docker already installed");
        return Ok(());
    }
    install(host, "docker", docker_install_script()).await
}

/// 检测编排工具（优先独立的 docker-compose），都没有则安装固定版本
pub async fn ensure_orchestrator(host: &dyn RemoteHost) -> DeployResult<ComposeTool> {
    let standalone = host
        .succeeds(&RemoteCommand::CommandExists {
            program: "docker-compose".to_string(),
        })
        .await?;
    if standalone {
        return Ok(ComposeTool::Standalone);
    }

    if host
        .succeeds(&RemoteCommand::docker(&["compose", "version"]))
        .await?
    {
        return Ok(ComposeTool::Plugin);
    }

    install(host, "docker-compose", compose_install_script()).await?;
    Ok(ComposeTool::Standalone)
}

/// 停止旧栈、重新构建并启动
pub async fn redeploy(
    host: &dyn RemoteHost,
    target: &DeploymentTarget,
    tool: ComposeTool,
    descriptor: &ContainerStackDescriptor,
    prune_images: bool,
) -> DeployResult<RedeployOutcome> {
    let compose = |args: &[&str]| RemoteCommand::Compose {
        dir: target.work_dir.clone(),
        tool,
        project: descriptor.project_name.to_string(),
        file: descriptor.compose_file.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
    };
    let mut outcome = RedeployOutcome::default();

    // 1. 停止正在运行的服务
    let running = host.run(&compose(&["ps", "-q"])).await?;
    outcome.stopped = running
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();

    if outcome.nothing_to_stop() {
        info!(project = descriptor.project_name, "Nothing to stop");
    } else {
        info!(
            project = descriptor.project_name,
            containers = outcome.stopped.len(),
            "Stopping running stack"
        );
        host.run_checked(&compose(&["down", "--remove-orphans"]))
            .await?;
    }

    // 2. 清理悬空镜像（结果丢弃）
    if prune_images {
        outcome.prune_attempted = true;
        let _ = host.run(&RemoteCommand::docker(&["image", "prune", "-f"])).await;
    }

    // 3. 拉取基础镜像，失败不致命
    let pull = host
        .run(&compose(&["pull", "--ignore-pull-failures"]))
        .await?;
    if !pull.success() {
        outcome.warnings.push(format!(
            "compose pull exited with status {}, continuing with local images",
            pull.exit_status
        ));
    }

    // 4. 构建并启动
    info!(project = descriptor.project_name, file = descriptor.compose_file, "Building images");
    host.run_checked(&compose(&["build", "--pull", "--no-cache"]))
        .await?;

    info!(project = descriptor.project_name, "Starting stack");
    host.run_checked(&compose(&["up", "-d"])).await?;

    // 5. 运行状态与最近日志（仅供观察）
    if let Ok(ps) = host.run(&compose(&["ps"])).await {
        outcome.status = ps.combined();
    }
    let tail = format!("--tail={}", LOG_TAIL_LINES);
    if let Ok(logs) = host.run(&compose(&["logs", tail.as_str()])).await {
        outcome.logs = logs.combined();
    }

    Ok(outcome)
}
