//! laymux-tmux: tmux as the terminal host.
//! Subprocess execution, pane listing, the `TerminalHost` implementation
//! and capture of open panes. No layout logic here.

pub mod capture;
pub mod error;
pub mod executor;
pub mod host;
pub mod pane_info;

pub use capture::capture_terminals;
pub use error::TmuxError;
pub use executor::{TmuxCommandRunner, TmuxExecutor};
pub use host::{TmuxHost, current_session};
pub use pane_info::{LIST_PANES_FORMAT, TmuxPane, list_panes, parse_list_panes_output};
