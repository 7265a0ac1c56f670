//! laymux: save and restore tmux terminal layouts.
//!
//! Everything is built once here and passed down explicitly: settings,
//! repository, prompter, tmux host.

use std::io;

use anyhow::Context;
use clap::Parser;
use laymux_core::{LayoutError, TerminalSpec};
use laymux_tmux::{TmuxCommandRunner, TmuxHost, capture_terminals};

mod app;
mod cli;
mod cmd_ls;
mod context;
mod prompt;
mod workflow;

use workflow::Outcome;

fn main() {
    let args = cli::Cli::parse();

    let filter = std::env::var("LAYMUX_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(args) {
        if is_user_error(&e) {
            eprintln!("laymux: {e}");
        } else {
            tracing::error!("{e:#}");
            eprintln!("laymux: {e:#}");
        }
        std::process::exit(1);
    }
}

fn run(args: cli::Cli) -> anyhow::Result<()> {
    let settings = app::Settings::resolve(
        &args,
        |name| std::env::var(name).ok(),
        std::env::current_dir().ok(),
    )?;
    let mut repo = settings.repository();
    let mut prompter = prompt::TermPrompter::new(io::stdin().lock(), io::stderr());

    let command = args
        .command
        .unwrap_or_else(|| cli::Command::Ls(cli::LsOpts::default()));

    match command {
        cli::Command::Save(opts) => {
            let host = settings.host()?;
            let captured = capture_open(&host)?;
            finish(workflow::save(
                &mut repo,
                &mut prompter,
                captured,
                opts.name.as_deref(),
            )?);
        }
        cli::Command::Create => {
            finish(workflow::create(
                &mut repo,
                &mut prompter,
                &settings.profile_names(),
            )?);
        }
        cli::Command::Load(opts) => {
            let host = settings.host()?;
            finish(workflow::load(
                &repo,
                &mut prompter,
                &host,
                opts.layout.as_deref(),
                opts.close_existing(),
                &settings.apply_options(),
            )?);
        }
        cli::Command::Ls(opts) => {
            let use_color = context::resolve_color(&opts.color);
            cmd_ls::cmd_ls(&repo, opts.json, use_color)?;
        }
        cli::Command::Menu => {
            let host = settings.host()?;
            finish(workflow::browse(
                &mut repo,
                &mut prompter,
                &host,
                &settings.profile_names(),
                &settings.apply_options(),
                || capture_open(&host),
            )?);
        }
        cli::Command::Rm(opts) => {
            finish(workflow::delete(
                &mut repo,
                &mut prompter,
                opts.layout.as_deref(),
                opts.yes,
            )?);
        }
        cli::Command::Edit(opts) => {
            let host = settings.host()?;
            finish(workflow::edit(
                &mut repo,
                &mut prompter,
                opts.layout.as_deref(),
                || capture_open(&host),
            )?);
        }
        cli::Command::Show(opts) => {
            let layout = workflow::find(&repo, &opts.layout)?;
            println!("{}", serde_json::to_string_pretty(&layout)?);
        }
        cli::Command::Export(opts) => {
            let layout = workflow::find(&repo, &opts.layout)?;
            let json = serde_json::to_string_pretty(&layout)?;
            match &opts.output {
                Some(path) => {
                    std::fs::write(path, format!("{json}\n"))
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Exported layout {:?} to {}", layout.name, path.display());
                }
                None => println!("{json}"),
            }
        }
        cli::Command::Import(opts) => {
            let content = std::fs::read_to_string(&opts.file)
                .with_context(|| format!("failed to read {}", opts.file.display()))?;
            let record: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("{} is not JSON", opts.file.display()))?;
            let layout = workflow::import(&mut repo, record, opts.name.as_deref())?;
            eprintln!("Imported layout {:?}: {}", layout.name, layout.summary());
        }
    }

    Ok(())
}

/// Panes of the host's session; nothing when the session does not exist.
fn capture_open<R: TmuxCommandRunner>(host: &TmuxHost<R>) -> anyhow::Result<Vec<TerminalSpec>> {
    if !host.has_session()? {
        tracing::info!(session = host.session(), "no tmux session, nothing to capture");
        return Ok(Vec::new());
    }
    Ok(capture_terminals(host.runner(), host.session())?)
}

fn finish<T>(outcome: Outcome<T>) {
    if let Outcome::Cancelled = outcome {
        tracing::debug!("cancelled");
    }
}

/// Bad input (blank or taken name, unknown layout) rather than a fault:
/// reported as a plain message, not logged.
fn is_user_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<LayoutError>()
        .is_some_and(LayoutError::is_recoverable)
}
