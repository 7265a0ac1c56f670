//! `laymux ls`: saved layouts as a table or JSON.

use chrono::{DateTime, Utc};
use laymux_core::types::groups_label;
use laymux_core::{KeyValueStore, LayoutRepository, TerminalLayout};
use serde::Serialize;

use crate::context::{relative_time, truncate};

const DESCRIPTION_WIDTH: usize = 40;

/// Entry point for `laymux ls`.
pub fn cmd_ls<S: KeyValueStore>(
    repo: &LayoutRepository<S>,
    json: bool,
    use_color: bool,
) -> anyhow::Result<()> {
    let layouts = repo.get_all()?;

    if json {
        println!("{}", format_ls_json(&layouts)?);
        return Ok(());
    }
    if layouts.is_empty() {
        eprintln!("No saved layouts. Run `laymux save` to capture the open panes.");
        return Ok(());
    }
    print!("{}", format_ls_table(&layouts, Utc::now(), use_color));
    Ok(())
}

// ── JSON ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LsEntry<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    groups: usize,
    terminals: usize,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'a> From<&'a TerminalLayout> for LsEntry<'a> {
    fn from(layout: &'a TerminalLayout) -> Self {
        Self {
            id: &layout.id,
            name: &layout.name,
            description: layout.description.as_deref(),
            groups: layout.groups.len(),
            terminals: layout.terminal_count(),
            created_at: layout.created_at,
            updated_at: layout.updated_at,
        }
    }
}

/// `--json`: one summary object per layout, oldest first.
pub fn format_ls_json(layouts: &[TerminalLayout]) -> anyhow::Result<String> {
    let entries: Vec<LsEntry<'_>> = layouts.iter().map(LsEntry::from).collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

// ── Table ───────────────────────────────────────────────────────────────────

/// One line per layout: name, groups, terminals, age, description.
pub fn format_ls_table(layouts: &[TerminalLayout], now: DateTime<Utc>, use_color: bool) -> String {
    let name_width = layouts
        .iter()
        .map(|l| l.name.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for layout in layouts {
        let name = format!("{:<name_width$}", layout.name);
        let groups = format!("{:<9}", groups_label(layout.groups.len()));
        let terminals = format!("{:<13}", format!("{} terminal(s)", layout.terminal_count()));
        let age = format!(
            "{:<10}",
            relative_time((now - layout.updated_at).num_seconds())
        );
        let description = layout
            .description
            .as_deref()
            .map(|d| truncate(d, DESCRIPTION_WIDTH))
            .unwrap_or_default();

        let line = if use_color {
            format!(
                "\x1b[1m{name}\x1b[0m  {groups}  {terminals}  \x1b[2m{age}\x1b[0m  {description}"
            )
        } else {
            format!("{name}  {groups}  {terminals}  {age}  {description}")
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
