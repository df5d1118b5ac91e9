//! 配置模块
//!
//! 环境变量解析、命令行覆盖与环境 profile

pub mod env;
pub mod profile;

pub use env::{EnvConfig, Overrides, SshAuth};
pub use profile::{EnvironmentProfile, ProfileFile};
