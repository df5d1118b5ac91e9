//! Imagegen Deployer - 命令行入口
//!
//! Usage:
//! - Deploy with environment config: `imagegen-deploy`
//! - Override the target: `imagegen-deploy --host 203.0.113.10 --branch release`
//! - Development stack on this machine: `imagegen-deploy --local --environment development`
//! - Machine-readable report: `imagegen-deploy --json`

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use imagegen_deployer::config::{EnvConfig, Overrides};
use imagegen_deployer::domain::stack::Environment;
use imagegen_deployer::services::deploy::DeployContext;

#[derive(Parser, Debug)]
#[command(
    name = "imagegen-deploy",
    version,
    about = "Bootstrap and redeploy the image generation service stack on a remote host"
)]
struct Cli {
    /// Target host (DEPLOY_HOST)
    #[arg(long)]
    host: Option<String>,

    /// SSH port (DEPLOY_SSH_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// SSH user (DEPLOY_USER)
    #[arg(long)]
    user: Option<String>,

    /// Remote working directory (DEPLOY_DIR)
    #[arg(long)]
    dir: Option<String>,

    /// Branch to check out (DEPLOY_BRANCH)
    #[arg(long)]
    branch: Option<String>,

    /// Repository URL (DEPLOY_REPO_URL)
    #[arg(long)]
    repo: Option<String>,

    /// production | development (DEPLOY_ENVIRONMENT)
    #[arg(long)]
    environment: Option<Environment>,

    /// Environment profile overriding the .env defaults (DEPLOY_PROFILE)
    #[arg(long)]
    profile: Option<PathBuf>,

    /// SSH private key file (DEPLOY_SSH_KEY)
    #[arg(long)]
    identity: Option<PathBuf>,

    /// Seconds to wait before health checks (HEALTH_SETTLE_SECS)
    #[arg(long)]
    settle_secs: Option<u64>,

    /// Skip `docker image prune`
    #[arg(long)]
    no_prune: bool,

    /// Run commands on this machine instead of over SSH
    #[arg(long)]
    local: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            work_dir: self.dir.clone(),
            branch: self.branch.clone(),
            repo_url: self.repo.clone(),
            environment: self.environment,
            profile: self.profile.clone(),
            identity: self.identity.clone(),
            settle_secs: self.settle_secs,
            no_prune: self.no_prune,
            local: self.local,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    imagegen_deployer::logging::init();

    let config = EnvConfig::from_env().with_overrides(cli.overrides());
    let mut ctx = DeployContext::new();
    if cli.json {
        ctx = ctx.quiet();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(imagegen_deployer::run(&config, &ctx)) {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("Failed to serialize report: {}", e),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Deployment failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
