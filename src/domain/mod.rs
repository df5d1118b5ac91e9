//! 领域模型模块
//!
//! 纯数据结构，不依赖 tokio/russh

pub mod deploy;
pub mod health;
pub mod repo;
pub mod stack;
pub mod target;

// Re-exports for convenience
pub use deploy::{DeployReport, DeployStage, DeployStatus, LogLine, StageStatus};
pub use health::{ConnectivityStatus, HealthCheckResult};
pub use repo::{ReconciledRepo, RepositoryState};
pub use stack::{ComposeTool, ContainerStackDescriptor, Environment, PortMapping, ServiceSpec};
pub use target::DeploymentTarget;
