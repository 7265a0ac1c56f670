//! Settings resolved once at startup from flags, config file and environment.
//!
//! Precedence: CLI flag (or its env var) > config file > built-in default.

use std::path::PathBuf;

use anyhow::{Context, bail};
use laymux_core::config::{default_config_path, expand_home};
use laymux_core::{ApplyOptions, Config, JsonFileStore, LayoutRepository};
use laymux_tmux::{TmuxCommandRunner, TmuxExecutor, TmuxHost, current_session};

use crate::cli::Cli;

/// Session used when neither `--session` nor `$TMUX` names one.
pub const DEFAULT_SESSION: &str = "laymux";

#[derive(Debug, Clone)]
pub struct Settings {
    pub config: Config,
    pub data_dir: PathBuf,
    pub tmux_bin: String,
    pub tmux_socket: Option<PathBuf>,
    /// `--session`, if given.
    pub session: Option<String>,
    /// `$TMUX` is set: we run inside a tmux client.
    pub inside_tmux: bool,
    /// `$TMUX_PANE`: our own pane, never closed by `load --close-existing`.
    pub own_pane: Option<String>,
    pub workspace_root: Option<PathBuf>,
}

impl Settings {
    /// `env` reads environment variables; `cwd` is the fallback workspace root.
    pub fn resolve(
        cli: &Cli,
        env: impl Fn(&str) -> Option<String>,
        cwd: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let config = match &cli.config {
            Some(path) => {
                let path = expand_home(path, &env);
                if !path.is_file() {
                    bail!("config file {} not found", path.display());
                }
                Config::load(&path)?
            }
            None => match default_config_path(&env) {
                Some(path) => Config::load(&path)?,
                None => Config::default(),
            },
        };

        let data_dir = match &cli.data_dir {
            Some(dir) => expand_home(dir, &env),
            None => config
                .data_dir_or_default(&env)
                .context("cannot locate a data directory; pass --data-dir or set HOME")?,
        };

        let tmux_bin = config.tmux_bin.clone().unwrap_or_else(|| "tmux".to_string());
        let tmux_socket = cli
            .tmux_socket
            .clone()
            .or_else(|| config.tmux_socket.clone())
            .map(|path| expand_home(&path, &env));
        let workspace_root = config
            .workspace_root
            .as_deref()
            .map(|root| expand_home(root, &env))
            .or(cwd);
        let inside_tmux = env("TMUX").is_some_and(|v| !v.is_empty());
        let own_pane = if inside_tmux { env("TMUX_PANE") } else { None };

        tracing::debug!(
            data_dir = %data_dir.display(),
            tmux_bin = %tmux_bin,
            inside_tmux,
            "settings resolved"
        );
        Ok(Self {
            session: cli.session.clone(),
            config,
            data_dir,
            tmux_bin,
            tmux_socket,
            inside_tmux,
            own_pane,
            workspace_root,
        })
    }

    pub fn repository(&self) -> LayoutRepository<JsonFileStore> {
        LayoutRepository::new(JsonFileStore::new(&self.data_dir))
    }

    pub fn executor(&self) -> TmuxExecutor {
        let executor = TmuxExecutor::new(&self.tmux_bin);
        match &self.tmux_socket {
            Some(socket) => executor.with_socket_path(socket),
            None => executor,
        }
    }

    /// `--session`, else the session of the client we run in, else
    /// [`DEFAULT_SESSION`].
    pub fn session_name(&self, runner: &impl TmuxCommandRunner) -> anyhow::Result<String> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }
        if self.inside_tmux {
            return current_session(runner).context("cannot determine the current tmux session");
        }
        Ok(DEFAULT_SESSION.to_string())
    }

    pub fn host(&self) -> anyhow::Result<TmuxHost<TmuxExecutor>> {
        let executor = self.executor();
        let session = self.session_name(&executor)?;
        Ok(TmuxHost::new(executor, session))
    }

    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            close_existing: false,
            workspace_root: self.workspace_root.clone(),
            profiles: self.config.profiles.clone(),
            settle: self.config.settle.policy(),
            spare: self.own_pane.clone(),
        }
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.config.profiles.keys().cloned().collect()
    }
}
