//! 部署相关领域模型

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::health::{ConnectivityStatus, HealthCheckResult};
use crate::domain::repo::ReconciledRepo;

/// 部署运行状态
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    Running,
    Success,
    /// 完成，但有警告（陈旧代码、健康检查失败等）
    Degraded,
    Failed,
}

impl DeployStatus {
    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStatus::Running => "running",
            DeployStatus::Success => "success",
            DeployStatus::Degraded => "degraded",
            DeployStatus::Failed => "failed",
        }
    }
}

/// 阶段状态
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl StageStatus {
    /// 摘要中使用的图标
    pub fn icon(&self) -> &'static str {
        match self {
            StageStatus::Success => "✓",
            StageStatus::Failed => "✗",
            StageStatus::Skipped => "⊘",
            StageStatus::Running => "⟳",
            StageStatus::Pending => "○",
        }
    }
}

/// 部署阶段信息
#[derive(Clone, Debug, Serialize)]
pub struct DeployStage {
    /// 阶段标识 (e.g., "connectivity", "repository", "redeploy")
    pub name: String,
    /// 显示名称 (e.g., "Connectivity Probe")
    pub display_name: String,
    /// 开始时间
    pub started_at: Option<DateTime<Utc>>,
    /// 结束时间
    pub finished_at: Option<DateTime<Utc>>,
    /// 持续时间（毫秒）
    pub duration_ms: Option<i64>,
    /// 阶段状态
    pub status: StageStatus,
    /// 附加信息
    pub message: Option<String>,
}

impl DeployStage {
    /// 创建新的待执行阶段
    pub fn new(name: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            started_at: None,
            finished_at: None,
            duration_ms: None,
            status: StageStatus::Pending,
            message: None,
        }
    }

    /// 开始执行阶段
    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
        self.status = StageStatus::Running;
    }

    /// 完成阶段
    pub fn finish(&mut self, success: bool, message: Option<String>) {
        let now = Utc::now();
        self.finished_at = Some(now);
        self.status = if success {
            StageStatus::Success
        } else {
            StageStatus::Failed
        };
        self.message = message;
        if let Some(started) = self.started_at {
            self.duration_ms = Some((now - started).num_milliseconds());
        }
    }

    /// 跳过阶段
    pub fn skip(&mut self, reason: Option<String>) {
        self.status = StageStatus::Skipped;
        self.message = reason;
    }

    /// 摘要行，例如 `✓ Repository (120ms)`
    pub fn summary_line(&self) -> String {
        let duration = self
            .duration_ms
            .map(|d| format!("{}ms", d))
            .unwrap_or_else(|| "-".to_string());
        match self.message {
            Some(ref msg) => format!(
                "{} {} ({}) - {}",
                self.status.icon(),
                self.display_name,
                duration,
                msg
            ),
            None => format!("{} {} ({})", self.status.icon(), self.display_name, duration),
        }
    }
}

/// 运维输出行
#[derive(Clone, Debug, Serialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub stream: String, // stdout | stderr
    pub content: String,
}

impl LogLine {
    pub fn new(stream: &str, content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            stream: stream.to_string(),
            content: content.into(),
        }
    }

    pub fn stdout(content: impl Into<String>) -> Self {
        Self::new("stdout", content)
    }

    pub fn stderr(content: impl Into<String>) -> Self {
        Self::new("stderr", content)
    }
}

/// 一次运行的最终报告
#[derive(Clone, Debug, Serialize)]
pub struct DeployReport {
    pub run_id: String,
    pub status: DeployStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<DeployStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<ConnectivityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<ReconciledRepo>,
    pub health: Vec<HealthCheckResult>,
    pub warnings: Vec<String>,
}

impl DeployReport {
    pub fn new(run_id: String, stages: Vec<DeployStage>) -> Self {
        Self {
            run_id,
            status: DeployStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            stages,
            connectivity: None,
            repository: None,
            health: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// 设置完成状态：有警告则为 Degraded
    pub fn complete(&mut self) {
        self.status = if self.warnings.is_empty() {
            DeployStatus::Success
        } else {
            DeployStatus::Degraded
        };
        self.finished_at = Some(Utc::now());
    }

    /// 致命错误：进行中的阶段标记失败，未开始的阶段标记跳过
    pub fn fail(&mut self, reason: &str) {
        for stage in &mut self.stages {
            match stage.status {
                StageStatus::Running => stage.finish(false, Some(reason.to_string())),
                StageStatus::Pending => stage.skip(Some("aborted".to_string())),
                _ => {}
            }
        }
        self.status = DeployStatus::Failed;
        self.finished_at = Some(Utc::now());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn stage(&self, name: &str) -> Option<&DeployStage> {
        self.stages.iter().find(|s| s.name == name)
    }
}
