//! Sync tmux subprocess wrapper behind a mockable trait.

use std::path::PathBuf;
use std::process::Command;

use crate::error::TmuxError;

/// Runs one tmux command and returns its stdout.
pub trait TmuxCommandRunner: Send + Sync {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError>;
}

impl<T: TmuxCommandRunner + ?Sized> TmuxCommandRunner for &T {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        (**self).run(args)
    }
}

/// Which tmux server to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Socket {
    /// `-S <path>`
    Path(PathBuf),
    /// `-L <name>`
    Name(String),
}

/// Real tmux executor using `std::process::Command`.
#[derive(Debug, Clone)]
pub struct TmuxExecutor {
    tmux_bin: String,
    socket: Option<Socket>,
}

impl TmuxExecutor {
    pub fn new(tmux_bin: impl Into<String>) -> Self {
        Self {
            tmux_bin: tmux_bin.into(),
            socket: None,
        }
    }

    #[must_use]
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket = Some(Socket::Path(path.into()));
        self
    }

    #[must_use]
    pub fn with_socket_name(mut self, name: impl Into<String>) -> Self {
        self.socket = Some(Socket::Name(name.into()));
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.tmux_bin);
        match &self.socket {
            Some(Socket::Path(path)) => {
                cmd.arg("-S").arg(path);
            }
            Some(Socket::Name(name)) => {
                cmd.arg("-L").arg(name);
            }
            None => {}
        }
        cmd.args(args);
        cmd
    }
}

impl Default for TmuxExecutor {
    fn default() -> Self {
        Self::new("tmux")
    }
}

impl TmuxCommandRunner for TmuxExecutor {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        tracing::debug!(bin = %self.tmux_bin, ?args, "tmux");
        let output = self.command(args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TmuxError::CommandFailed(format!(
                "{} (exit code {}): {}",
                args.first().copied().unwrap_or("tmux"),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
