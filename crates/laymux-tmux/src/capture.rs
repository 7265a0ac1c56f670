//! Snapshot the panes that are open right now as terminal specs.

use laymux_core::TerminalSpec;
use laymux_core::types::non_blank;

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;
use crate::pane_info::{TmuxPane, list_panes};

const FALLBACK_NAME: &str = "terminal";

/// Panes of `session` in window, then pane, order. Each becomes a spec
/// named after its title (window name if untitled) with the pane's current
/// path as `cwd`. Commands and env are not recoverable from tmux.
pub fn capture_terminals(
    runner: &impl TmuxCommandRunner,
    session: &str,
) -> Result<Vec<TerminalSpec>, TmuxError> {
    let panes = list_panes(runner, session)?;
    tracing::debug!(session, panes = panes.len(), "captured panes");
    Ok(panes.iter().map(pane_to_spec).collect())
}

fn pane_to_spec(pane: &TmuxPane) -> TerminalSpec {
    let name = match pane.display_name() {
        "" => FALLBACK_NAME.to_string(),
        name => name.to_string(),
    };
    TerminalSpec {
        name,
        cwd: non_blank(Some(pane.current_path.clone())),
        ..TerminalSpec::default()
    }
}
