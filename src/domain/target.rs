//! 部署目标领域模型

use serde::Serialize;

/// 部署目标
///
/// 一次运行内不可变，由配置构建后以引用传入各组件
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DeploymentTarget {
    /// 主机地址
    pub host: String,
    /// SSH 端口
    pub ssh_port: u16,
    /// 登录用户
    pub user: String,
    /// 远程工作目录（仓库检出位置）
    pub work_dir: String,
    /// 目标分支
    pub branch: String,
    /// 仓库地址
    pub repo_url: String,
}

impl DeploymentTarget {
    /// 工作目录下的 `.git` 路径
    pub fn git_dir(&self) -> String {
        format!("{}/.git", self.work_dir.trim_end_matches('/'))
    }

    /// 工作目录下的相对路径
    pub fn path_in_work_dir(&self, relative: &str) -> String {
        format!("{}/{}", self.work_dir.trim_end_matches('/'), relative)
    }

    /// 从仓库地址解析代码托管主机名
    ///
    /// Supports `https://host/owner/repo.git`, `ssh://git@host:22/owner/repo`
    /// and scp-like `git@host:owner/repo.git`.
    pub fn origin_host(&self) -> Option<String> {
        parse_origin_host(&self.repo_url)
    }

    /// 是否指向本机
    pub fn is_local(&self) -> bool {
        matches!(self.host.as_str(), "localhost" | "127.0.0.1" | "::1")
    }
}

fn parse_origin_host(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    let host_part = if let Some((_, rest)) = url.split_once("://") {
        // 去掉 userinfo，截取到第一个 '/'
        let authority = rest.split('/').next()?;
        let authority = authority.rsplit('@').next()?;
        authority.split(':').next()?
    } else {
        // scp 风格: [user@]host:path
        let (authority, _) = url.split_once(':')?;
        authority.rsplit('@').next()?
    };

    if host_part.is_empty() {
        None
    } else {
        Some(host_part.to_lowercase())
    }
}
