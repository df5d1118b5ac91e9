//! 诊断日志初始化
//!
//! `tracing` diagnostics go to stderr and are filtered by `RUST_LOG`
//! (default `info`). Operator-facing stage output is separate and goes
//! through `DeployContext`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化 tracing subscriber
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
