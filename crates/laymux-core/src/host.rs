use std::collections::BTreeMap;
use std::path::PathBuf;

/// A terminal as the host identifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalHandle {
    /// Host-assigned id (a tmux pane id such as `%12`).
    pub id: String,
    pub name: String,
}

/// Everything the host needs to open one terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTerminal {
    pub name: String,
    /// Already resolved and known to exist.
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    /// Shell command from a resolved profile. `None` means the host default.
    pub shell: Option<String>,
    pub icon: Option<String>,
}

impl CreateTerminal {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Abstraction over terminal-hosting environments.
///
/// Synchronous: every call returns once the host accepted the request,
/// which does not mean the new terminal is already listed. Callers that
/// need that wait for it (see `replay::wait_until`).
pub trait TerminalHost: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a terminal in a new top-level container (a group root).
    fn create_terminal(&self, spec: &CreateTerminal) -> Result<TerminalHandle, Self::Error>;

    /// Split `parent` and open a terminal beside it.
    fn split_terminal(
        &self,
        parent: &TerminalHandle,
        spec: &CreateTerminal,
    ) -> Result<TerminalHandle, Self::Error>;

    fn rename_terminal(&self, terminal: &TerminalHandle, name: &str) -> Result<(), Self::Error>;

    /// Type `text` into the terminal and submit it.
    fn send_text(&self, terminal: &TerminalHandle, text: &str) -> Result<(), Self::Error>;

    fn list_terminals(&self) -> Result<Vec<TerminalHandle>, Self::Error>;

    fn dispose_terminal(&self, terminal: &TerminalHandle) -> Result<(), Self::Error>;

    fn set_color(&self, terminal: &TerminalHandle, color: &str) -> Result<(), Self::Error>;
}
