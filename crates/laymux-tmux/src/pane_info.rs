//! `list-panes` format string and parser.

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;

/// Tab-delimited format string for `tmux list-panes -F`.
pub const LIST_PANES_FORMAT: &str = "#{session_name}\t#{window_id}\t#{window_index}\t#{window_name}\t#{pane_id}\t#{pane_index}\t#{pane_current_path}\t#{pane_title}\t#{pane_active}\t#{host}";

const FIELD_COUNT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TmuxPane {
    pub session_name: String,
    pub window_id: String,
    pub window_index: u32,
    pub window_name: String,
    pub pane_id: String,
    pub pane_index: u32,
    pub current_path: String,
    pub pane_title: String,
    pub active: bool,
    /// tmux initialises `pane_title` to the hostname.
    pub host: String,
}

impl TmuxPane {
    /// Title set by the user or a program, if any.
    pub fn explicit_title(&self) -> Option<&str> {
        let title = self.pane_title.trim();
        if title.is_empty() || title == self.host || self.host.starts_with(&format!("{title}.")) {
            None
        } else {
            Some(title)
        }
    }

    /// Pane title, else window name.
    pub fn display_name(&self) -> &str {
        self.explicit_title()
            .unwrap_or_else(|| self.window_name.trim())
    }
}

/// Run `list-panes -s` for one session; panes in window, then pane, order.
pub fn list_panes(runner: &impl TmuxCommandRunner, session: &str) -> Result<Vec<TmuxPane>, TmuxError> {
    let target = exact_session(session);
    let output = runner.run(&["list-panes", "-s", "-t", &target, "-F", LIST_PANES_FORMAT])?;
    let mut panes = parse_list_panes_output(&output)?;
    panes.sort_by(|a, b| {
        a.window_index
            .cmp(&b.window_index)
            .then(a.pane_index.cmp(&b.pane_index))
    });
    Ok(panes)
}

/// `=name` makes tmux match the session name exactly instead of by prefix.
pub(crate) fn exact_session(session: &str) -> String {
    format!("={session}")
}

/// Parse the raw output of `tmux list-panes -F <LIST_PANES_FORMAT>`.
pub fn parse_list_panes_output(output: &str) -> Result<Vec<TmuxPane>, TmuxError> {
    output
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_line(line, idx + 1))
        .collect()
}

fn parse_line(line: &str, line_num: usize) -> Result<TmuxPane, TmuxError> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < FIELD_COUNT {
        return Err(TmuxError::ParseError {
            line_num,
            detail: format!(
                "expected {FIELD_COUNT} tab-separated fields, got {}",
                parts.len()
            ),
        });
    }
    let index = |pos: usize, what: &str| {
        parts[pos].trim().parse::<u32>().map_err(|e| TmuxError::ParseError {
            line_num,
            detail: format!("bad {what} {:?}: {e}", parts[pos]),
        })
    };

    Ok(TmuxPane {
        session_name: parts[0].to_string(),
        window_id: parts[1].to_string(),
        window_index: index(2, "window_index")?,
        window_name: parts[3].to_string(),
        pane_id: parts[4].to_string(),
        pane_index: index(5, "pane_index")?,
        current_path: parts[6].to_string(),
        pane_title: parts[7].to_string(),
        active: matches!(parts[8].trim(), "1" | "true"),
        host: parts[9].trim().to_string(),
    })
}
