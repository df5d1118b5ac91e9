//! 环境变量配置加载

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::domain::stack::Environment;
use crate::domain::target::DeploymentTarget;
use crate::infra::remote::HostsEntry;

/// SSH 认证方式
#[derive(Clone, Debug, PartialEq)]
pub enum SshAuth {
    /// 私钥文件
    KeyFile(PathBuf),
    /// 密码
    Password(String),
}

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 部署目标
    pub target: DeploymentTarget,
    /// SSH 认证
    pub auth: SshAuth,
    /// 运行环境（决定容器栈与默认值）
    pub environment: Environment,
    /// 环境 profile 文件
    pub profile_path: PathBuf,
    /// 是否清理悬空镜像
    pub prune_images: bool,
    /// 健康检查前等待时间
    pub settle_delay: Duration,
    /// 单次健康检查超时
    pub health_timeout: Duration,
    /// 使用本机 shell 而不是 SSH
    pub local: bool,
    /// origin 不可达时写入的 hosts 条目
    pub hosts_entries: Vec<HostsEntry>,
}

/// 命令行覆盖项
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub work_dir: Option<String>,
    pub branch: Option<String>,
    pub repo_url: Option<String>,
    pub environment: Option<Environment>,
    pub profile: Option<PathBuf>,
    pub identity: Option<PathBuf>,
    pub settle_secs: Option<u64>,
    pub no_prune: bool,
    pub local: bool,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let host = env::var("DEPLOY_HOST").unwrap_or_else(|_| "localhost".to_string());

        let ssh_port = env::var("DEPLOY_SSH_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(22);

        let user = env::var("DEPLOY_USER").unwrap_or_else(|_| "root".to_string());

        let work_dir = env::var("DEPLOY_DIR")
            .unwrap_or_else(|_| "/opt/gemini-image-generator".to_string());

        let branch = env::var("DEPLOY_BRANCH").unwrap_or_else(|_| "main".to_string());

        let repo_url = env::var("DEPLOY_REPO_URL").unwrap_or_else(|_| {
            "https://github.com/gemini-image-generator/gemini-image-generator.git".to_string()
        });

        // 密码优先于私钥；都未设置时使用默认私钥路径
        let auth = match env::var("DEPLOY_SSH_PASSWORD").ok().filter(|s| !s.is_empty()) {
            Some(password) => SshAuth::Password(password),
            None => SshAuth::KeyFile(
                env::var("DEPLOY_SSH_KEY")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| default_identity()),
            ),
        };

        let environment = match env::var("DEPLOY_ENVIRONMENT") {
            Ok(v) => v.parse::<Environment>().unwrap_or_else(|e| {
                warn!(value = %v, error = %e, "Invalid DEPLOY_ENVIRONMENT, using production");
                Environment::Production
            }),
            Err(_) => Environment::Production,
        };

        let profile_path = env::var("DEPLOY_PROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(constants::DEFAULT_PROFILE_FILE));

        let prune_images = env::var("DEPLOY_PRUNE_IMAGES")
            .ok()
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        let settle_delay = Duration::from_secs(
            env::var("HEALTH_SETTLE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(constants::HEALTH_SETTLE_SECS),
        );

        let health_timeout = Duration::from_secs(
            env::var("HEALTH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(constants::HEALTH_TIMEOUT_SECS),
        );

        let local = env::var("DEPLOY_LOCAL")
            .ok()
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let hosts_entries = env::var("DEPLOY_HOSTS_ENTRIES")
            .map(|v| parse_hosts_entries(&v))
            .unwrap_or_else(|_| default_hosts_entries());

        Self {
            target: DeploymentTarget {
                host,
                ssh_port,
                user,
                work_dir,
                branch,
                repo_url,
            },
            auth,
            environment,
            profile_path,
            prune_images,
            settle_delay,
            health_timeout,
            local,
            hosts_entries,
        }
    }

    /// 应用命令行覆盖
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(host) = overrides.host {
            self.target.host = host;
        }
        if let Some(port) = overrides.port {
            self.target.ssh_port = port;
        }
        if let Some(user) = overrides.user {
            self.target.user = user;
        }
        if let Some(dir) = overrides.work_dir {
            self.target.work_dir = dir;
        }
        if let Some(branch) = overrides.branch {
            self.target.branch = branch;
        }
        if let Some(repo) = overrides.repo_url {
            self.target.repo_url = repo;
        }
        if let Some(environment) = overrides.environment {
            self.environment = environment;
        }
        if let Some(profile) = overrides.profile {
            self.profile_path = profile;
        }
        if let Some(identity) = overrides.identity {
            self.auth = SshAuth::KeyFile(identity);
        }
        if let Some(secs) = overrides.settle_secs {
            self.settle_delay = Duration::from_secs(secs);
        }
        if overrides.no_prune {
            self.prune_images = false;
        }
        if overrides.local {
            self.local = true;
        }
        self
    }

    /// 是否通过本机 shell 执行
    pub fn use_local_shell(&self) -> bool {
        self.local || self.target.is_local()
    }
}

fn parse_bool(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
}

fn default_identity() -> PathBuf {
    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".ssh").join("id_ed25519"))
        .unwrap_or_else(|_| PathBuf::from(".ssh/id_ed25519"))
}

fn default_hosts_entries() -> Vec<HostsEntry> {
    constants::FALLBACK_HOSTS_ENTRIES
        .iter()
        .map(|(address, hostname)| HostsEntry::new(*address, *hostname))
        .collect()
}

/// 解析 `addr host,addr host` 形式的 hosts 条目
fn parse_hosts_entries(v: &str) -> Vec<HostsEntry> {
    v.split(',')
        .filter_map(|item| {
            let mut parts = item.split_whitespace();
            let address = parts.next()?;
            let hostname = parts.next()?;
            Some(HostsEntry::new(address, hostname))
        })
        .collect()
}

/// 常量
pub mod constants {
    /// 外网探测地址
    pub const INTERNET_PROBE_ADDR: &str = "8.8.8.8";

    /// origin 探测端口
    pub const ORIGIN_PROBE_PORT: u16 = 443;

    /// 探测超时（秒）
    pub const PROBE_TIMEOUT_SECS: u64 = 5;

    /// 普通远程命令超时（秒）
    pub const COMMAND_TIMEOUT_SECS: u64 = 120;

    /// 克隆、构建、安装等长命令超时（秒）
    pub const LONG_COMMAND_TIMEOUT_SECS: u64 = 1800; // 30 分钟

    /// origin 不可达时追加的 hosts 条目
    ///
    /// Only covers a GitHub origin. Other origins need `DEPLOY_HOSTS_ENTRIES`.
    pub const FALLBACK_HOSTS_ENTRIES: &[(&str, &str)] =
        &[("140.82.112.3", "github.com"), ("8.8.8.8", "dns.google")];

    /// 固定的 Docker 版本
    pub const DOCKER_VERSION: &str = "24.0.7";

    /// 固定的 docker-compose 版本
    pub const COMPOSE_VERSION: &str = "v2.24.5";

    /// 默认 profile 文件
    pub const DEFAULT_PROFILE_FILE: &str = "deploy.env";

    /// 远程环境文件（相对工作目录）
    pub const ENV_FILE_NAME: &str = ".env";

    /// 健康检查前等待（秒）
    pub const HEALTH_SETTLE_SECS: u64 = 10;

    /// 单次健康检查超时（秒）
    pub const HEALTH_TIMEOUT_SECS: u64 = 10;

    /// 启动后输出的日志行数
    pub const LOG_TAIL_LINES: u32 = 20;

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
