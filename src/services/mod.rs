//! 服务层模块
//!
//! 部署流水线的各个组件，全部通过 `RemoteHost` 操作目标主机

pub mod connectivity;
pub mod containers;
pub mod deploy;
pub mod environment;
pub mod health;
pub mod repository;
