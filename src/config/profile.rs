//! 环境 profile
//!
//! Defaults for the application's `.env` contract plus the optional operator
//! profile file that overrides them.

use std::path::Path;
use tracing::{debug, info};

use crate::domain::stack::Environment;
use crate::error::{DeployError, DeployResult};

/// 应用识别的配置键及其默认值（按写出顺序）
fn default_entries(environment: Environment) -> [(&'static str, &'static str); 10] {
    let (mode, debug, rate_limit) = match environment {
        Environment::Production => ("production", "0", "true"),
        Environment::Development => ("development", "1", "false"),
    };
    [
        ("FLASK_ENV", mode),
        ("FLASK_DEBUG", debug),
        ("SECRET_KEY", ""),
        ("HOST", "0.0.0.0"),
        ("PORT", "5000"),
        ("MAX_CONTENT_LENGTH", "16777216"), // 16 MiB
        ("UPLOAD_FOLDER", "uploads"),
        ("OUTPUT_FOLDER", "outputs"),
        ("CORS_ORIGINS", "*"),
        ("RATE_LIMIT_ENABLED", rate_limit),
    ]
}

/// 有序的 键 → 值 映射
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvironmentProfile {
    entries: Vec<(String, String)>,
}

impl EnvironmentProfile {
    /// 某个环境的默认 profile
    pub fn defaults(environment: Environment) -> Self {
        Self {
            entries: default_entries(environment)
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// 默认值 + profile 文件覆盖
    ///
    /// Overrides with an empty value are treated as unset. Unknown keys are
    /// appended after the defaults in file order.
    pub fn resolve(environment: Environment, overrides: &ProfileFile) -> Self {
        let mut profile = Self::defaults(environment);
        for (key, value) in overrides.entries() {
            if value.is_empty() {
                debug!(key = %key, "Empty profile value, keeping default");
                continue;
            }
            profile.set(key, value);
        }
        profile
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 原位替换，不存在则追加
    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 运维侧 profile 文件（`KEY=VALUE` 行）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileFile {
    entries: Vec<(String, String)>,
}

impl ProfileFile {
    /// 解析 profile 文本
    ///
    /// Blank lines and `#` comments are skipped, an `export ` prefix is
    /// dropped, and a later duplicate key replaces the earlier value.
    pub fn parse(text: &str) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                debug!(line = %line, "Skipping profile line without '='");
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let value = value.trim().to_string();
            match entries.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key.to_string(), value)),
            }
        }
        Self { entries }
    }

    /// 读取 profile 文件；文件不存在视为无覆盖
    pub fn load(path: &Path) -> DeployResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let file = Self::parse(&text);
                info!(path = %path.display(), keys = file.entries.len(), "Loaded environment profile");
                Ok(file)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No environment profile, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(DeployError::config(format!(
                "failed to read profile {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
