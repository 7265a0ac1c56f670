//! Apply-time resolution of working directories.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Why a stored cwd was dropped. Not fatal: the terminal opens in the
/// host's default directory instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CwdError {
    #[error("relative cwd {0:?} needs a workspace root")]
    NoWorkspaceRoot(String),

    #[error("cwd {} does not exist", .0.display())]
    Missing(PathBuf),
}

fn env_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"(?i)\$\{env:([^}]+)\}").expect("env token pattern"))
}

/// Replace every `${env:NAME}` with `lookup(NAME)`; unknown names expand
/// to the empty string. The `env` keyword matches case-insensitively.
pub fn expand_env_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    env_token()
        .replace_all(input, |caps: &Captures<'_>| {
            lookup(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// Expand, then anchor relative paths on `workspace_root`. Does not touch
/// the filesystem.
pub fn resolve_path(
    raw: &str,
    workspace_root: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, CwdError> {
    let expanded = PathBuf::from(expand_env_vars(raw, lookup));
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    match workspace_root {
        Some(root) => Ok(root.join(expanded)),
        None => Err(CwdError::NoWorkspaceRoot(raw.to_string())),
    }
}

/// [`resolve_path`] plus an existence check on the result.
pub fn resolve_cwd(
    raw: &str,
    workspace_root: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, CwdError> {
    let path = resolve_path(raw, workspace_root, lookup)?;
    if path.is_dir() {
        Ok(path)
    } else {
        Err(CwdError::Missing(path))
    }
}
