//! 连通性探测
//!
//! Runs on the target host before anything is mutated. No internet is fatal.
//! An unreachable origin triggers a best-effort hosts-file workaround and the
//! run carries on with the probed status.

use tracing::{info, warn};

use crate::config::env::constants::{INTERNET_PROBE_ADDR, ORIGIN_PROBE_PORT};
use crate::domain::health::ConnectivityStatus;
use crate::domain::target::DeploymentTarget;
use crate::error::{DeployError, DeployResult};
use crate::infra::remote::{HostsEntry, RemoteCommand, RemoteHost};

/// 探测外网与 origin 可达性
pub async fn probe(
    host: &dyn RemoteHost,
    target: &DeploymentTarget,
    hosts_entries: &[HostsEntry],
) -> DeployResult<ConnectivityStatus> {
    let internet_reachable = host
        .succeeds(&RemoteCommand::Ping {
            address: INTERNET_PROBE_ADDR.to_string(),
        })
        .await?;

    if !internet_reachable {
        warn!(probe = INTERNET_PROBE_ADDR, "Target host has no internet connectivity");
        return Err(DeployError::NoInternet);
    }

    let origin_host = target.origin_host().ok_or_else(|| {
        DeployError::config(format!("cannot determine origin host from {}", target.repo_url))
    })?;

    let origin_reachable = host
        .succeeds(&RemoteCommand::TcpConnect {
            host: origin_host.clone(),
            port: ORIGIN_PROBE_PORT,
        })
        .await?;

    let mut status = ConnectivityStatus {
        internet_reachable,
        origin_reachable,
        ..Default::default()
    };

    if origin_reachable {
        info!(origin = %origin_host, "Origin reachable");
    } else {
        warn!(origin = %origin_host, "Origin unreachable, adding static hosts entries");
        status.origin_hosts_entry = covers_host(hosts_entries, &origin_host);
        if !status.origin_hosts_entry {
            warn!(
                origin = %origin_host,
                "No static hosts entry names the origin, set DEPLOY_HOSTS_ENTRIES"
            );
        }
        apply_dns_workaround(host, hosts_entries).await;
        status.dns_workaround_attempted = true;
    }

    Ok(status)
}

fn covers_host(entries: &[HostsEntry], hostname: &str) -> bool {
    entries
        .iter()
        .any(|e| e.hostname.eq_ignore_ascii_case(hostname))
}

/// 追加静态 hosts 条目（尽力而为，结果丢弃）
pub async fn apply_dns_workaround(host: &dyn RemoteHost, entries: &[HostsEntry]) {
    if entries.is_empty() {
        return;
    }
    let _ = host
        .run(&RemoteCommand::AppendHosts {
            entries: entries.to_vec(),
        })
        .await;
}
