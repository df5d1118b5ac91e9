//! 健康检查
//!
//! 启动后等待固定时间，然后对每个端点发一次 GET，不重试。结果只用于报告，
//! 不会让运行失败。

use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use crate::domain::health::HealthCheckResult;

/// 响应摘要长度（字符）
const SNIPPET_CHARS: usize = 120;

/// 检查所有端点
pub async fn verify(
    endpoints: &[String],
    settle_delay: Duration,
    timeout: Duration,
) -> Vec<HealthCheckResult> {
    if !settle_delay.is_zero() {
        info!(secs = settle_delay.as_secs(), "Waiting for services to settle");
        tokio::time::sleep(settle_delay).await;
    }

    let client = match Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Failed to create HTTP client");
            return endpoints
                .iter()
                .map(|ep| HealthCheckResult::unreachable(ep, e.to_string()))
                .collect();
        }
    };

    let mut results = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        let result = check(&client, endpoint).await;
        if result.reachable {
            info!(endpoint = %endpoint, status = ?result.status, "Endpoint healthy");
        } else {
            warn!(endpoint = %endpoint, status = ?result.status, "Endpoint unhealthy");
        }
        results.push(result);
    }
    results
}

async fn check(client: &Client, endpoint: &str) -> HealthCheckResult {
    let response = match client.get(endpoint).send().await {
        Ok(response) => response,
        Err(e) => return HealthCheckResult::unreachable(endpoint, e.to_string()),
    };

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    HealthCheckResult {
        endpoint: endpoint.to_string(),
        reachable: status.is_success(),
        status: Some(status.as_u16()),
        snippet: Some(body.chars().take(SNIPPET_CHARS).collect()),
    }
}
