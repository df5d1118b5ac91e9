//! 工作副本状态机
//!
//! `classify` inspects the target once and short-circuits on the first
//! matching condition. `reconcile` takes that classification by value and
//! performs at most one remediation path without re-inspecting the
//! filesystem.
//!
//! Deletion only ever hits content judged unusable: the whole directory when
//! it has no `.git`, or just `.git` when it has no `origin` remote. A valid checkout is
//! only fetched and pulled.

use tracing::{info, warn};

use crate::domain::repo::{ReconciledRepo, RepositoryState};
use crate::domain::target::DeploymentTarget;
use crate::error::{DeployError, DeployResult};
use crate::infra::remote::{RemoteCommand, RemoteHost};

/// 检测工作副本状态
pub async fn classify(
    host: &dyn RemoteHost,
    target: &DeploymentTarget,
) -> DeployResult<RepositoryState> {
    let dir_exists = host
        .succeeds(&RemoteCommand::DirExists {
            path: target.work_dir.clone(),
        })
        .await?;
    if !dir_exists {
        return Ok(RepositoryState::Absent);
    }

    let git_exists = host
        .succeeds(&RemoteCommand::PathExists {
            path: target.git_dir(),
        })
        .await?;
    if !git_exists {
        return Ok(RepositoryState::NotGit);
    }

    // 后续的 fetch / pull 都针对 origin，其他名字的 remote 视同损坏
    let origin = host
        .run(&RemoteCommand::git(
            &target.work_dir,
            &["remote", "get-url", "origin"],
        ))
        .await?;
    if origin.success() && !origin.stdout.trim().is_empty() {
        Ok(RepositoryState::GitValid)
    } else {
        Ok(RepositoryState::GitCorrupted)
    }
}

/// 将工作副本推向“已检出且跟踪远程分支”的状态
pub async fn reconcile(
    host: &dyn RemoteHost,
    target: &DeploymentTarget,
    state: RepositoryState,
    origin_reachable: bool,
) -> DeployResult<ReconciledRepo> {
    info!(
        state = %state,
        path = %target.work_dir,
        branch = %target.branch,
        origin_reachable,
        "Reconciling working copy"
    );

    let mut warnings = Vec::new();

    let tracking = match state {
        RepositoryState::Absent => {
            host.run_checked(&RemoteCommand::CreateDir {
                path: target.work_dir.clone(),
            })
            .await?;
            clone_fresh(host, target, origin_reachable).await?;
            true
        }
        RepositoryState::NotGit => {
            warn!(path = %target.work_dir, "Directory is not a git checkout, recreating");
            host.run_checked(&RemoteCommand::RemoveAll {
                path: target.work_dir.clone(),
            })
            .await?;
            host.run_checked(&RemoteCommand::CreateDir {
                path: target.work_dir.clone(),
            })
            .await?;
            clone_fresh(host, target, origin_reachable).await?;
            true
        }
        RepositoryState::GitValid => {
            if origin_reachable {
                update_checkout(host, target).await?;
            } else {
                warnings.push(format!(
                    "origin unreachable, keeping existing checkout in {} (code may be stale)",
                    target.work_dir
                ));
            }
            true
        }
        RepositoryState::GitCorrupted => {
            warn!(path = %target.work_dir, "Git metadata has no origin remote, reinitializing");
            host.run_checked(&RemoteCommand::RemoveAll {
                path: target.git_dir(),
            })
            .await?;
            host.run_checked(&RemoteCommand::git(&target.work_dir, &["init"]))
                .await?;

            if origin_reachable {
                attach_origin(host, target).await?;
                true
            } else {
                warnings.push(format!(
                    "origin unreachable, {} reinitialized without a remote",
                    target.work_dir
                ));
                false
            }
        }
    };

    for warning in &warnings {
        warn!(path = %target.work_dir, "{}", warning);
    }

    let head = current_head(host, target).await?;
    info!(
        path = %target.work_dir,
        head = head.as_deref().unwrap_or("-"),
        tracking,
        "Working copy reconciled"
    );

    Ok(ReconciledRepo {
        path: target.work_dir.clone(),
        branch: target.branch.clone(),
        initial_state: state,
        tracking,
        head,
        warnings,
    })
}

/// 在空目录中克隆并切到目标分支；origin 不可达为致命错误
async fn clone_fresh(
    host: &dyn RemoteHost,
    target: &DeploymentTarget,
    origin_reachable: bool,
) -> DeployResult<()> {
    if !origin_reachable {
        return Err(DeployError::CloneUnreachable {
            path: target.work_dir.clone(),
            origin: target.origin_host().unwrap_or_else(|| target.repo_url.clone()),
        });
    }

    info!(repo = %target.repo_url, path = %target.work_dir, "Cloning repository");
    host.run_checked(&RemoteCommand::git(
        &target.work_dir,
        &["clone", &target.repo_url, "."],
    ))
    .await?;

    let branch = target.branch.as_str();
    host.run_checked(&RemoteCommand::git(
        &target.work_dir,
        &["fetch", "origin", branch],
    ))
    .await?;
    checkout_tracking(host, target).await?;
    Ok(())
}

/// 对已有效的检出执行 fetch / checkout / pull
async fn update_checkout(host: &dyn RemoteHost, target: &DeploymentTarget) -> DeployResult<()> {
    let branch = target.branch.as_str();
    host.run_checked(&RemoteCommand::git(
        &target.work_dir,
        &["fetch", "origin", branch],
    ))
    .await?;
    checkout_tracking(host, target).await?;
    host.run_checked(&RemoteCommand::git(
        &target.work_dir,
        &["pull", "origin", branch],
    ))
    .await?;
    Ok(())
}

/// 为重新初始化的仓库登记 remote 并强制检出跟踪分支
async fn attach_origin(host: &dyn RemoteHost, target: &DeploymentTarget) -> DeployResult<()> {
    let branch = target.branch.as_str();
    host.run_checked(&RemoteCommand::git(
        &target.work_dir,
        &["remote", "add", "origin", &target.repo_url],
    ))
    .await?;
    host.run_checked(&RemoteCommand::git(
        &target.work_dir,
        &["fetch", "origin", branch],
    ))
    .await?;

    // 工作区里已有的文件会和检出冲突，强制覆盖
    let upstream = format!("origin/{}", branch);
    host.run_checked(&RemoteCommand::git(
        &target.work_dir,
        &["checkout", "-f", "-B", branch, "--track", &upstream],
    ))
    .await?;
    Ok(())
}

/// 切到目标分支，本地不存在时创建跟踪分支
async fn checkout_tracking(host: &dyn RemoteHost, target: &DeploymentTarget) -> DeployResult<()> {
    let branch = target.branch.as_str();
    let local_ref = format!("refs/heads/{}", branch);
    let has_local = host
        .succeeds(&RemoteCommand::git(
            &target.work_dir,
            &["rev-parse", "--verify", "--quiet", &local_ref],
        ))
        .await?;

    if has_local {
        host.run_checked(&RemoteCommand::git(&target.work_dir, &["checkout", branch]))
            .await?;
    } else {
        let upstream = format!("origin/{}", branch);
        host.run_checked(&RemoteCommand::git(
            &target.work_dir,
            &["checkout", "-b", branch, "--track", &upstream],
        ))
        .await?;
    }
    Ok(())
}

async fn current_head(
    host: &dyn RemoteHost,
    target: &DeploymentTarget,
) -> DeployResult<Option<String>> {
    let output = host
        .run(&RemoteCommand::git(&target.work_dir, &["rev-parse", "HEAD"]))
        .await?;
    Ok(output
        .success()
        .then(|| output.stdout.trim().to_string())
        .filter(|h| !h.is_empty()))
}
