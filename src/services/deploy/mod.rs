//! 部署流水线
//!
//! 按顺序驱动 连通性 → 仓库 → 环境文件 → 运行时 → 重新部署 → 健康检查，
//! 每一步是一个阶段，结束时打印阶段摘要、警告与健康检查结果。

pub mod context;

use tracing::{error, info, warn};

use crate::config::env::EnvConfig;
use crate::config::profile::EnvironmentProfile;
use crate::domain::deploy::{DeployReport, DeployStage};
use crate::domain::stack::ContainerStackDescriptor;
use crate::error::DeployResult;
use crate::infra::remote::RemoteHost;
use crate::services::{connectivity, containers, environment, health, repository};

pub use context::DeployContext;

fn stages() -> Vec<DeployStage> {
    vec![
        DeployStage::new("connectivity", "Connectivity Probe"),
        DeployStage::new("repository", "Repository"),
        DeployStage::new("environment", "Environment File"),
        DeployStage::new("runtime", "Container Runtime"),
        DeployStage::new("redeploy", "Redeploy Stack"),
        DeployStage::new("health", "Health Check"),
    ]
}

/// 执行一次完整部署
///
/// 致命错误会中止后续阶段，但阶段摘要总会打印。
/// `descriptor` 决定重建哪个容器栈以及检查哪些端点。
pub async fn execute(
    ctx: &DeployContext,
    host: &dyn RemoteHost,
    config: &EnvConfig,
    profile: &EnvironmentProfile,
    descriptor: &ContainerStackDescriptor,
) -> DeployResult<DeployReport> {
    let target = &config.target;
    let mut report = DeployReport::new(ctx.run_id.clone(), stages());

    ctx.log_stdout(&format!(
        "=== Deploy {} ({}) to {}@{}:{} ===",
        target.branch,
        config.environment.as_str(),
        target.user,
        target.host,
        target.work_dir
    ));
    ctx.log_stdout(&format!("Run: {}", ctx.run_id));
    ctx.log_stdout(&format!("Timestamp: {}", report.started_at.to_rfc3339()));

    let result = run_stages(ctx, host, config, profile, descriptor, &mut report).await;
    match result {
        Ok(()) => {
            report.complete();
            info!(
                run_id = %ctx.run_id,
                status = report.status.as_str(),
                warnings = report.warnings.len(),
                "Deployment finished"
            );
        }
        Err(ref e) => {
            report.fail(&e.to_string());
            error!(run_id = %ctx.run_id, error = %e, "Deployment aborted");
            ctx.log_stderr(&format!("Error: {}", e));
        }
    }

    print_summary(ctx, &report);
    result.map(|()| report)
}

async fn run_stages(
    ctx: &DeployContext,
    host: &dyn RemoteHost,
    config: &EnvConfig,
    profile: &EnvironmentProfile,
    descriptor: &ContainerStackDescriptor,
    report: &mut DeployReport,
) -> DeployResult<()> {
    let target = &config.target;

    // Stage 1: 连通性
    report.stages[0].start();
    ctx.log_stdout("[1/6] Probing connectivity...");
    let status = connectivity::probe(host, target, &config.hosts_entries).await?;
    let origin_reachable = status.origin_reachable;
    if origin_reachable {
        report.stages[0].finish(true, None);
    } else {
        let origin = target.origin_host().unwrap_or_default();
        report.warn(format!(
            "origin {} unreachable from target, static hosts entries appended",
            origin
        ));
        if !status.origin_hosts_entry {
            report.warn(format!(
                "no static hosts entry for {}, set DEPLOY_HOSTS_ENTRIES",
                origin
            ));
        }
        report.stages[0].finish(true, Some("origin unreachable".to_string()));
    }
    report.connectivity = Some(status);

    // Stage 2: 仓库
    report.stages[1].start();
    ctx.log_stdout(&format!("[2/6] Reconciling {}...", target.work_dir));
    let state = repository::classify(host, target).await?;
    ctx.log_stdout(&format!("Detected: {}", state));
    let repo = repository::reconcile(host, target, state, origin_reachable).await?;
    for warning in &repo.warnings {
        ctx.log_stderr(&format!("Warning: {}", warning));
        report.warn(warning.clone());
    }
    let head = repo.head.clone().unwrap_or_else(|| "no commits".to_string());
    report.stages[1].finish(true, Some(format!("{} → {} @ {}", state, repo.branch, head)));
    report.repository = Some(repo);

    // Stage 3: 环境文件
    report.stages[2].start();
    ctx.log_stdout("[3/6] Writing environment file...");
    let path = environment::materialize(host, profile, target).await?;
    report.stages[2].finish(true, Some(path));

    // Stage 4: 运行时
    report.stages[3].start();
    ctx.log_stdout("[4/6] Checking container runtime...");
    containers::ensure_runtime(host).await?;
    let tool = containers::ensure_orchestrator(host).await?;
    ctx.log_stdout(&format!("Using: {}", tool.invocation()));
    report.stages[3].finish(true, Some(tool.invocation().to_string()));

    // Stage 5: 重新部署
    report.stages[4].start();
    ctx.log_stdout(&format!(
        "[5/6] Rebuilding {} [{}] ({})...",
        descriptor.project_name,
        descriptor.service_names().join(", "),
        descriptor.compose_file
    ));
    let outcome =
        containers::redeploy(host, target, tool, descriptor, config.prune_images).await?;
    if outcome.nothing_to_stop() {
        ctx.log_stdout("Nothing to stop");
    } else {
        ctx.log_stdout(&format!("Stopped {} container(s)", outcome.stopped.len()));
    }
    for warning in &outcome.warnings {
        ctx.log_stderr(&format!("Warning: {}", warning));
        report.warn(warning.clone());
    }
    if !outcome.status.is_empty() {
        ctx.log_stdout("");
        ctx.log_stdout(&outcome.status);
    }
    if !outcome.logs.is_empty() {
        ctx.log_stdout("");
        ctx.log_stdout("Container logs:");
        ctx.log_stdout(&outcome.logs);
    }
    report.stages[4].finish(true, None);

    // Stage 6: 健康检查（不影响结果）
    report.stages[5].start();
    let endpoints = descriptor.health_endpoints(&target.host);
    ctx.log_stdout(&format!("[6/6] Checking {} endpoint(s)...", endpoints.len()));
    let results = health::verify(&endpoints, config.settle_delay, config.health_timeout).await;
    let healthy = results.iter().filter(|r| r.reachable).count();
    for result in results.iter().filter(|r| !r.reachable) {
        report.warn(format!("health check failed for {}", result.endpoint));
    }
    report.stages[5].finish(
        healthy == results.len(),
        Some(format!("{}/{} healthy", healthy, results.len())),
    );
    report.health = results;

    Ok(())
}

fn print_summary(ctx: &DeployContext, report: &DeployReport) {
    ctx.log_stdout("");
    ctx.log_stdout("=== Stage Summary ===");
    for stage in &report.stages {
        ctx.log_stdout(&stage.summary_line());
    }

    if !report.health.is_empty() {
        ctx.log_stdout("");
        ctx.log_stdout("=== Health ===");
        for result in &report.health {
            let icon = if result.reachable { "✓" } else { "✗" };
            let status = result
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            ctx.log_stdout(&format!(
                "{} {} [{}] {}",
                icon,
                result.endpoint,
                status,
                result.snippet.as_deref().unwrap_or("").replace('\n', " ")
            ));
        }
    }

    if !report.warnings.is_empty() {
        ctx.log_stdout("");
        ctx.log_stdout("=== Warnings ===");
        for warning in &report.warnings {
            warn!(run_id = %report.run_id, "{}", warning);
            ctx.log_stdout(&format!("- {}", warning));
        }
    }

    ctx.log_stdout("");
    ctx.log_stdout(&format!("Result: {}", report.status.as_str()));
}
