//! 连通性与健康检查结果

use serde::Serialize;

/// 连通性探测结果
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ConnectivityStatus {
    pub internet_reachable: bool,
    pub origin_reachable: bool,
    /// 是否尝试了 hosts 写入（无论成功与否）
    pub dns_workaround_attempted: bool,
    /// 写入的条目里是否有 origin 主机名
    pub origin_hosts_entry: bool,
}

/// 单个端点的健康检查结果
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct HealthCheckResult {
    pub endpoint: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl HealthCheckResult {
    pub fn unreachable(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reachable: false,
            status: None,
            snippet: Some(reason.into()),
        }
    }
}
