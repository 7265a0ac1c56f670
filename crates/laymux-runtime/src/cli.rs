//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "laymux", version, about = "Save and restore tmux terminal layouts")]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/laymux/config.toml)
    #[arg(long, global = true, env = "LAYMUX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the layout store (default: $XDG_DATA_HOME/laymux)
    #[arg(long, global = true, env = "LAYMUX_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// tmux server socket path, passed as `tmux -S`
    #[arg(long, global = true)]
    pub tmux_socket: Option<PathBuf>,

    /// tmux session to capture from and load into (default: the current one)
    #[arg(long, global = true)]
    pub session: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Save the open panes as a new layout
    Save(SaveOpts),
    /// Author a new layout terminal by terminal
    Create,
    /// Open a saved layout
    Load(LoadOpts),
    /// List saved layouts (default)
    Ls(LsOpts),
    /// Pick a layout from a menu, then load, edit or delete it
    Menu,
    /// Delete a layout
    Rm(RmOpts),
    /// Rename, redescribe or re-capture a layout
    Edit(AddressOpts),
    /// Print one layout as JSON
    Show(ShowOpts),
    /// Write one layout to a file (or stdout)
    Export(ExportOpts),
    /// Add a layout from an exported file
    Import(ImportOpts),
}

#[derive(clap::Args)]
pub struct SaveOpts {
    /// Layout name; prompted for when omitted
    pub name: Option<String>,
}

/// Optional layout name or id; picked interactively when omitted.
#[derive(clap::Args)]
pub struct AddressOpts {
    pub layout: Option<String>,
}

#[derive(clap::Args)]
pub struct LoadOpts {
    /// Layout name or id
    pub layout: Option<String>,

    /// Close the panes that are open now once the layout is up
    #[arg(long, conflicts_with = "keep_existing")]
    pub close_existing: bool,

    /// Leave the panes that are open now alone
    #[arg(long)]
    pub keep_existing: bool,
}

impl LoadOpts {
    /// `None` when neither flag was given.
    pub fn close_existing(&self) -> Option<bool> {
        match (self.close_existing, self.keep_existing) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(clap::Args, Default)]
pub struct LsOpts {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Color output: auto, always, never
    #[arg(long, default_value = "auto")]
    pub color: String,
}

#[derive(clap::Args)]
pub struct RmOpts {
    /// Layout name or id
    pub layout: Option<String>,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(clap::Args)]
pub struct ShowOpts {
    /// Layout name or id
    pub layout: String,
}

#[derive(clap::Args)]
pub struct ExportOpts {
    /// Layout name or id
    pub layout: String,

    /// Output file (default: stdout)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ImportOpts {
    /// File written by `laymux export`
    pub file: PathBuf,

    /// Store under this name instead of the one in the file
    #[arg(long)]
    pub name: Option<String>,
}
