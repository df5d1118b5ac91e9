//! 工作副本（仓库）状态领域模型

use serde::Serialize;

/// 远程工作副本的分类
///
/// 每次运行开始时检测一次，互斥且完备
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryState {
    /// 目录不存在
    Absent,
    /// 目录存在但没有 `.git`
    NotGit,
    /// `.git` 存在且配置了 origin remote
    GitValid,
    /// `.git` 存在但没有 origin remote
    GitCorrupted,
}

impl RepositoryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryState::Absent => "absent",
            RepositoryState::NotGit => "present_not_git",
            RepositoryState::GitValid => "present_git_valid",
            RepositoryState::GitCorrupted => "present_git_corrupted",
        }
    }
}

impl std::fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 调和后的工作副本
#[derive(Clone, Debug, Serialize)]
pub struct ReconciledRepo {
    pub path: String,
    pub branch: String,
    /// 调和前检测到的状态
    pub initial_state: RepositoryState,
    /// 当前分支是否跟踪远程分支
    pub tracking: bool,
    /// HEAD commit（无提交时为空）
    pub head: Option<String>,
    /// 降级但继续的警告
    pub warnings: Vec<String>,
}

impl ReconciledRepo {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}
