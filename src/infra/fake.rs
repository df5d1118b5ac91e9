//! 内存中的假主机，供单元测试使用
//!
//! Interprets [`RemoteCommand`] variants against a small simulated filesystem,
//! git repository and compose stack instead of rendering them to shell.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::infra::remote::{ChannelError, RemoteCommand, RemoteHost, RemoteOutput};

pub const ORIGIN_URL: &str = "https://github.com/acme/gemini-image-generator.git";

/// 假仓库
#[derive(Clone, Debug, Default)]
pub struct FakeRepo {
    /// remote 名称 → URL
    pub remotes: BTreeMap<String, String>,
    /// 当前分支
    pub branch: Option<String>,
    /// 本地分支 → commit
    pub local_branches: BTreeMap<String, String>,
    /// 本地分支 → 上游
    pub upstreams: BTreeMap<String, String>,
    /// 已 fetch 的远程分支 → commit
    pub fetched: BTreeMap<String, String>,
}

impl FakeRepo {
    pub fn origin(&self) -> Option<&str> {
        self.remotes.get("origin").map(String::as_str)
    }

    pub fn head(&self) -> Option<String> {
        self.branch
            .as_ref()
            .and_then(|b| self.local_branches.get(b))
            .cloned()
    }

    pub fn tracking(&self) -> Option<&str> {
        self.branch
            .as_ref()
            .and_then(|b| self.upstreams.get(b))
            .map(String::as_str)
    }
}

#[derive(Debug)]
pub struct FakeState {
    pub internet: bool,
    pub origin_reachable: bool,
    pub hosts_writable: bool,
    pub hosts: Vec<String>,
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, String>,
    /// 工作目录 → 仓库
    pub repos: BTreeMap<String, FakeRepo>,
    pub default_branch: String,
    /// origin 上的分支 → commit
    pub origin_branches: BTreeMap<String, String>,
    pub programs: BTreeSet<String>,
    pub compose_plugin: bool,
    /// 安装脚本退出码（按工具名）
    pub install_status: HashMap<String, i32>,
    pub running_services: Vec<String>,
    /// `up` 之后运行的服务
    pub stack_services: Vec<String>,
    pub build_status: i32,
    pub up_status: i32,
    pub prune_status: i32,
    /// 所有执行过的命令
    pub log: Vec<RemoteCommand>,
}

impl Default for FakeState {
    fn default() -> Self {
        let mut origin_branches = BTreeMap::new();
        origin_branches.insert("main".to_string(), "c0ffee1".to_string());
        origin_branches.insert("release".to_string(), "beef002".to_string());

        Self {
            internet: true,
            origin_reachable: true,
            hosts_writable: true,
            hosts: Vec::new(),
            dirs: BTreeSet::new(),
            files: BTreeMap::new(),
            repos: BTreeMap::new(),
            default_branch: "main".to_string(),
            origin_branches,
            programs: ["docker", "docker-compose"].iter().map(|s| s.to_string()).collect(),
            compose_plugin: false,
            install_status: HashMap::new(),
            running_services: Vec::new(),
            stack_services: vec!["web".to_string(), "nginx".to_string()],
            build_status: 0,
            up_status: 0,
            prune_status: 0,
            log: Vec::new(),
        }
    }
}

/// 假主机
#[derive(Debug, Default)]
pub struct FakeHost {
    state: Mutex<FakeState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(f: impl FnOnce(&mut FakeState)) -> Self {
        let host = Self::new();
        host.update(f);
        host
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeState)) {
        let mut state = self.state.lock().unwrap();
        f(&mut state);
    }

    pub fn inspect<T>(&self, f: impl FnOnce(&FakeState) -> T) -> T {
        let state = self.state.lock().unwrap();
        f(&state)
    }

    pub fn repo(&self, dir: &str) -> Option<FakeRepo> {
        self.inspect(|s| s.repos.get(dir).cloned())
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.inspect(|s| s.files.get(path).cloned())
    }

    pub fn commands(&self) -> Vec<RemoteCommand> {
        self.inspect(|s| s.log.clone())
    }

    /// 已执行命令中是否有满足条件的
    pub fn ran(&self, pred: impl Fn(&RemoteCommand) -> bool) -> bool {
        self.inspect(|s| s.log.iter().any(pred))
    }

    /// 准备一个已跟踪 origin 的有效检出
    pub fn seed_valid_checkout(&self, dir: &str, branch: &str, commit: &str) {
        self.seed_checkout_with_remote(dir, "origin", branch, commit);
    }

    /// 准备一个 remote 名为 `remote` 的检出
    pub fn seed_checkout_with_remote(&self, dir: &str, remote: &str, branch: &str, commit: &str) {
        self.update(|s| {
            s.dirs.insert(dir.to_string());
            let mut repo = FakeRepo {
                branch: Some(branch.to_string()),
                ..Default::default()
            };
            repo.remotes.insert(remote.to_string(), ORIGIN_URL.to_string());
            repo.local_branches.insert(branch.to_string(), commit.to_string());
            repo.upstreams
                .insert(branch.to_string(), format!("{}/{}", remote, branch));
            s.repos.insert(dir.to_string(), repo);
        });
    }

    /// 准备一个没有 remote 的 `.git`
    pub fn seed_corrupted_checkout(&self, dir: &str) {
        self.update(|s| {
            s.dirs.insert(dir.to_string());
            let mut repo = FakeRepo {
                branch: Some("main".to_string()),
                ..Default::default()
            };
            repo.local_branches
                .insert("main".to_string(), "dead000".to_string());
            s.repos.insert(dir.to_string(), repo);
        });
    }

    /// 准备一个不是 git 仓库的目录
    pub fn seed_plain_dir(&self, dir: &str) {
        self.update(|s| {
            s.dirs.insert(dir.to_string());
            s.files
                .insert(format!("{}/stale.txt", dir), "leftover".to_string());
        });
    }
}

fn status(ok: bool) -> RemoteOutput {
    if ok {
        RemoteOutput::ok("")
    } else {
        RemoteOutput::failed(1, "")
    }
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(p, _)| p).unwrap_or("")
}

impl FakeState {
    fn exists(&self, path: &str) -> bool {
        if self.dirs.contains(path) || self.files.contains_key(path) {
            return true;
        }
        path.strip_suffix("/.git")
            .map(|dir| self.repos.contains_key(dir))
            .unwrap_or(false)
    }

    fn remove_all(&mut self, path: &str) {
        if let Some(dir) = path.strip_suffix("/.git") {
            self.repos.remove(dir);
            return;
        }
        let prefix = format!("{}/", path);
        self.dirs.retain(|d| d != path && !d.starts_with(&prefix));
        self.files.retain(|f, _| !f.starts_with(&prefix));
        self.repos.retain(|d, _| d != path && !d.starts_with(&prefix));
    }

    fn git(&mut self, dir: &str, args: &[String]) -> RemoteOutput {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        if !self.dirs.contains(dir) {
            return RemoteOutput::failed(128, "fatal: cannot change to directory");
        }

        match args.as_slice() {
            ["clone", url, "."] => {
                if !self.origin_reachable {
                    return RemoteOutput::failed(128, "fatal: unable to access origin");
                }
                let default = self.default_branch.clone();
                let Some(commit) = self.origin_branches.get(&default).cloned() else {
                    return RemoteOutput::failed(128, "fatal: empty remote");
                };
                let mut repo = FakeRepo {
                    branch: Some(default.clone()),
                    ..Default::default()
                };
                repo.remotes.insert("origin".to_string(), url.to_string());
                repo.local_branches.insert(default.clone(), commit.clone());
                repo.upstreams
                    .insert(default.clone(), format!("origin/{}", default));
                repo.fetched = self.origin_branches.clone();
                self.repos.insert(dir.to_string(), repo);
                RemoteOutput::ok("")
            }
            ["init"] => {
                self.repos.insert(
                    dir.to_string(),
                    FakeRepo {
                        branch: Some("master".to_string()),
                        ..Default::default()
                    },
                );
                RemoteOutput::ok("Initialized empty Git repository\n")
            }
            rest => {
                let reachable = self.origin_reachable;
                let origin_branches = self.origin_branches.clone();
                let Some(repo) = self.repos.get_mut(dir) else {
                    return RemoteOutput::failed(128, "fatal: not a git repository");
                };
                git_in_repo(repo, rest, reachable, &origin_branches)
            }
        }
    }
}

fn git_in_repo(
    repo: &mut FakeRepo,
    args: &[&str],
    reachable: bool,
    origin_branches: &BTreeMap<String, String>,
) -> RemoteOutput {
    match args {
        ["remote", "get-url", name] => match repo.remotes.get(*name) {
            Some(url) => RemoteOutput::ok(format!("{}\n", url)),
            None => RemoteOutput::failed(2, "error: No such remote"),
        },
        ["remote", "add", name, url] => {
            if repo.remotes.contains_key(*name) {
                return RemoteOutput::failed(3, "error: remote already exists");
            }
            repo.remotes.insert(name.to_string(), url.to_string());
            RemoteOutput::ok("")
        }
        ["fetch", "origin", branch] => {
            if !reachable || repo.origin().is_none() {
                return RemoteOutput::failed(128, "fatal: could not read from remote");
            }
            match origin_branches.get(*branch) {
                Some(commit) => {
                    repo.fetched.insert(branch.to_string(), commit.clone());
                    RemoteOutput::ok("")
                }
                None => RemoteOutput::failed(128, "fatal: couldn't find remote ref"),
            }
        }
        ["rev-parse", "--verify", "--quiet", reference] => {
            let exists = reference
                .strip_prefix("refs/heads/")
                .map(|b| repo.local_branches.contains_key(b))
                .unwrap_or(false);
            status(exists)
        }
        ["rev-parse", "HEAD"] => match repo.head() {
            Some(head) => RemoteOutput::ok(format!("{}\n", head)),
            None => RemoteOutput::failed(128, "fatal: ambiguous argument 'HEAD'"),
        },
        ["checkout", branch] => {
            if repo.local_branches.contains_key(*branch) {
                repo.branch = Some(branch.to_string());
                RemoteOutput::ok("")
            } else {
                RemoteOutput::failed(1, "error: pathspec did not match")
            }
        }
        ["checkout", "-b", branch, "--track", upstream]
        | ["checkout", "-f", "-B", branch, "--track", upstream] => {
            let force = args[1] == "-f";
            if !force && repo.local_branches.contains_key(*branch) {
                return RemoteOutput::failed(128, "fatal: branch already exists");
            }
            let remote_branch = upstream.trim_start_matches("origin/");
            let Some(commit) = repo.fetched.get(remote_branch).cloned() else {
                return RemoteOutput::failed(128, "fatal: invalid reference");
            };
            repo.local_branches.insert(branch.to_string(), commit);
            repo.upstreams.insert(branch.to_string(), upstream.to_string());
            repo.branch = Some(branch.to_string());
            RemoteOutput::ok("")
        }
        ["pull", "origin", branch] => {
            if !reachable || repo.origin().is_none() {
                return RemoteOutput::failed(1, "fatal: could not read from remote");
            }
            match origin_branches.get(*branch) {
                Some(commit) => {
                    repo.fetched.insert(branch.to_string(), commit.clone());
                    repo.local_branches.insert(branch.to_string(), commit.clone());
                    RemoteOutput::ok("Already up to date.\n")
                }
                None => RemoteOutput::failed(1, "fatal: couldn't find remote ref"),
            }
        }
        _ => RemoteOutput::ok(""),
    }
}

#[async_trait]
impl RemoteHost for FakeHost {
    async fn run(&self, command: &RemoteCommand) -> Result<RemoteOutput, ChannelError> {
        let mut s = self.state.lock().unwrap();
        s.log.push(command.clone());

        let output = match command {
            RemoteCommand::Ping { .. } => status(s.internet),
            RemoteCommand::TcpConnect { .. } => status(s.origin_reachable),
            RemoteCommand::AppendHosts { entries } => {
                if s.hosts_writable {
                    s.hosts.extend(entries.iter().map(|e| e.line()));
                    RemoteOutput::ok("")
                } else {
                    RemoteOutput::failed(1, "sudo: a password is required")
                }
            }
            RemoteCommand::DirExists { path } => status(s.dirs.contains(path)),
            RemoteCommand::PathExists { path } => status(s.exists(path)),
            RemoteCommand::RemoveAll { path } => {
                s.remove_all(path);
                RemoteOutput::ok("")
            }
            RemoteCommand::CreateDir { path } => {
                s.dirs.insert(path.clone());
                RemoteOutput::ok("")
            }
            RemoteCommand::WriteFile { path, contents } => {
                if s.dirs.contains(parent_dir(path)) {
                    s.files.insert(path.clone(), contents.clone());
                    RemoteOutput::ok("")
                } else {
                    RemoteOutput::failed(1, "No such file or directory")
                }
            }
            RemoteCommand::Git { dir, args } => s.git(dir, args),
            RemoteCommand::CommandExists { program } => status(s.programs.contains(program)),
            RemoteCommand::Install { tool, .. } => {
                let code = s.install_status.get(tool).copied().unwrap_or(0);
                if code == 0 {
                    s.programs.insert(tool.clone());
                    RemoteOutput::ok("")
                } else {
                    RemoteOutput::failed(code, "install failed")
                }
            }
            RemoteCommand::Compose { args, .. } => {
                match args.first().map(String::as_str) {
                    Some("ps") => RemoteOutput::ok(
                        s.running_services
                            .iter()
                            .map(|svc| format!("{}-id\n", svc))
                            .collect::<String>(),
                    ),
                    Some("down") => {
                        s.running_services.clear();
                        RemoteOutput::ok("")
                    }
                    Some("build") => {
                        let code = s.build_status;
                        if code == 0 {
                            RemoteOutput::ok("")
                        } else {
                            RemoteOutput::failed(code, "build failed")
                        }
                    }
                    Some("up") => {
                        let code = s.up_status;
                        if code == 0 {
                            s.running_services = s.stack_services.clone();
                            RemoteOutput::ok("")
                        } else {
                            RemoteOutput::failed(code, "up failed")
                        }
                    }
                    Some("logs") => RemoteOutput::ok("web-1  | * Running on all addresses\n"),
                    _ => RemoteOutput::ok(""),
                }
            }
            RemoteCommand::Docker { args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                match args.as_slice() {
                    ["compose", "version"] => status(s.compose_plugin),
                    ["image", "prune", "-f"] => {
                        let code = s.prune_status;
                        if code == 0 {
                            RemoteOutput::ok("")
                        } else {
                            RemoteOutput::failed(code, "prune failed")
                        }
                    }
                    _ => RemoteOutput::ok(""),
                }
            }
        };

        Ok(output)
    }
}
