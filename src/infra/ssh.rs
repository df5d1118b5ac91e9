//! SSH 执行通道
//!
//! 每次运行建立一个会话，每条命令打开一个 exec channel

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::env::SshAuth;
use crate::domain::target::DeploymentTarget;
use crate::infra::remote::{ChannelError, RemoteCommand, RemoteHost, RemoteOutput};

/// 会话事件处理器
struct ClientHandler {
    host: String,
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        // 不校验 known_hosts
        warn!(
            host = %self.host,
            fingerprint = %server_public_key.fingerprint(),
            "Accepting SSH host key without verification"
        );
        Ok(true)
    }
}

/// SSH 通道
pub struct SshChannel {
    session: Mutex<Handle<ClientHandler>>,
    addr: String,
}

impl SshChannel {
    /// 建立会话并认证
    pub async fn connect(target: &DeploymentTarget, auth: &SshAuth) -> anyhow::Result<Self> {
        let addr = format!("{}:{}", target.host, target.ssh_port);
        info!(addr = %addr, user = %target.user, "Connecting to deployment target");

        let config = Arc::new(client::Config {
            inactivity_timeout: Some(Duration::from_secs(600)),
            ..Default::default()
        });
        let handler = ClientHandler {
            host: target.host.clone(),
        };

        let mut session = client::connect(config, (target.host.as_str(), target.ssh_port), handler)
            .await
            .map_err(|e| ChannelError::Connect {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;

        let authenticated = match auth {
            SshAuth::KeyFile(path) => {
                debug!(key_file = %path.display(), "SSH public key auth");
                let key = russh_keys::load_secret_key(path, None)?;
                session
                    .authenticate_publickey(&target.user, Arc::new(key))
                    .await?
            }
            SshAuth::Password(password) => {
                debug!("SSH password auth");
                session
                    .authenticate_password(&target.user, password)
                    .await?
            }
        };

        if !authenticated {
            return Err(ChannelError::Auth {
                user: target.user.clone(),
            }
            .into());
        }

        info!(addr = %addr, "SSH session established");
        Ok(Self {
            session: Mutex::new(session),
            addr,
        })
    }

    /// 关闭会话
    pub async fn close(&self) {
        if let Err(e) = self
            .session
            .lock()
            .await
            .disconnect(Disconnect::ByApplication, "deployment finished", "en")
            .await
        {
            debug!(addr = %self.addr, error = %e, "SSH disconnect failed");
        }
    }

    async fn exec(&self, line: &str) -> Result<RemoteOutput, ChannelError> {
        let mut channel = self
            .session
            .lock()
            .await
            .channel_open_session()
            .await
            .map_err(|e| ChannelError::Protocol(e.to_string()))?;
        channel
            .exec(true, line)
            .await
            .map_err(|e| ChannelError::Protocol(e.to_string()))?;

        let mut output = RemoteOutput {
            exit_status: -1,
            ..Default::default()
        };
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                // ext == 1 为 stderr
                ChannelMsg::ExtendedData { ref data, ext } if ext == 1 => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    output.exit_status = exit_status as i32;
                }
                _ => {}
            }
        }

        output.stdout = String::from_utf8_lossy(&stdout).into_owned();
        output.stderr = String::from_utf8_lossy(&stderr).into_owned();
        Ok(output)
    }
}

#[async_trait]
impl RemoteHost for SshChannel {
    async fn run(&self, command: &RemoteCommand) -> Result<RemoteOutput, ChannelError> {
        let line = command.to_shell();
        let timeout = command.timeout();
        debug!(addr = %self.addr, command = %command.describe(), "Running remote command");

        match tokio::time::timeout(timeout, self.exec(&line)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout {
                command: command.describe(),
                secs: timeout.as_secs(),
            }),
        }
    }
}
