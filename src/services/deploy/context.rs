//! 部署上下文
//!
//! 一次运行的标识与运维输出通道

use std::sync::Mutex;

use crate::domain::deploy::LogLine;

/// 部署执行上下文
pub struct DeployContext {
    /// 运行 ID
    pub run_id: String,
    /// 是否输出到终端
    echo: bool,
    /// 本次运行的全部输出
    transcript: Mutex<Vec<LogLine>>,
}

impl DeployContext {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            echo: true,
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// 只记录不打印（`--json` 与测试）
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// 发送日志
    pub fn log(&self, line: LogLine) {
        if self.echo {
            match line.stream.as_str() {
                "stderr" => eprintln!("{}", line.content),
                _ => println!("{}", line.content),
            }
        }
        if let Ok(mut transcript) = self.transcript.lock() {
            transcript.push(line);
        }
    }

    /// 发送 stdout 日志
    pub fn log_stdout(&self, content: &str) {
        self.log(LogLine::stdout(content));
    }

    /// 发送 stderr 日志
    pub fn log_stderr(&self, content: &str) {
        self.log(LogLine::stderr(content));
    }

    /// 已输出的全部内容
    pub fn transcript(&self) -> Vec<LogLine> {
        self.transcript
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }
}

impl Default for DeployContext {
    fn default() -> Self {
        Self::new()
    }
}
