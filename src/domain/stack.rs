//! 容器栈描述
//!
//! Static service definitions per environment. Nothing here is read from the
//! host; the compose files in the repository are expected to match.

use std::str::FromStr;

use serde::Serialize;

/// 运行环境
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(format!("unknown environment `{}`", other)),
        }
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }

    /// 该环境的容器栈描述
    pub fn stack(&self) -> ContainerStackDescriptor {
        match self {
            Environment::Production => ContainerStackDescriptor::production(),
            Environment::Development => ContainerStackDescriptor::development(),
        }
    }
}

/// 端口映射 host:container
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl PortMapping {
    pub const fn new(host: u16, container: u16) -> Self {
        Self { host, container }
    }
}

/// 单个服务定义
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ServiceSpec {
    pub name: &'static str,
    /// 镜像构建上下文（相对工作目录）
    pub build_context: &'static str,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<&'static str>,
    pub network: &'static str,
    /// 健康检查路径；为空表示不检查
    pub health_path: Option<&'static str>,
}

/// 容器栈描述
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ContainerStackDescriptor {
    pub environment: Environment,
    /// compose 文件（相对工作目录）
    pub compose_file: &'static str,
    /// compose 项目名
    pub project_name: &'static str,
    pub services: Vec<ServiceSpec>,
}

impl ContainerStackDescriptor {
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            compose_file: "docker-compose.yml",
            project_name: "imagegen",
            services: vec![
                ServiceSpec {
                    name: "web",
                    build_context: ".",
                    ports: vec![PortMapping::new(5000, 5000)],
                    volumes: vec!["./uploads:/app/uploads", "./outputs:/app/outputs"],
                    network: "imagegen",
                    health_path: Some("/api/models"),
                },
                ServiceSpec {
                    name: "nginx",
                    build_context: "./nginx",
                    ports: vec![PortMapping::new(80, 80)],
                    volumes: vec!["./outputs:/usr/share/nginx/outputs:ro"],
                    network: "imagegen",
                    health_path: Some("/"),
                },
            ],
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            compose_file: "docker-compose.dev.yml",
            project_name: "imagegen-dev",
            services: vec![ServiceSpec {
                name: "web",
                build_context: ".",
                ports: vec![PortMapping::new(5001, 5000)],
                volumes: vec![".:/app", "./uploads:/app/uploads", "./outputs:/app/outputs"],
                network: "imagegen-dev",
                health_path: Some("/api/models"),
            }],
        }
    }

    /// 健康检查端点（按服务顺序，每个发布端口一个）
    pub fn health_endpoints(&self, host: &str) -> Vec<String> {
        self.services
            .iter()
            .filter_map(|svc| svc.health_path.map(|path| (svc, path)))
            .flat_map(|(svc, path)| {
                svc.ports
                    .iter()
                    .map(move |p| format!("http://{}:{}{}", host, p.host, path))
            })
            .collect()
    }

    pub fn service_names(&self) -> Vec<&'static str> {
        self.services.iter().map(|s| s.name).collect()
    }
}

/// 编排工具形态
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComposeTool {
    /// 独立的 `docker-compose` 二进制
    Standalone,
    /// `docker compose` 插件
    Plugin,
}

impl ComposeTool {
    /// 命令前缀
    pub fn invocation(&self) -> &'static str {
        match self {
            ComposeTool::Standalone => "docker-compose",
            ComposeTool::Plugin => "docker compose",
        }
    }
}
