//! Operator workflows behind the CLI subcommands.
//!
//! Every collaborator is passed in: repository, prompter, host, captured
//! terminals. Declining a prompt ends the workflow with
//! [`Outcome::Cancelled`] and leaves earlier side effects in place.

use anyhow::Context;
use laymux_core::migrate::migrate_record;
use laymux_core::prompt::require_name;
use laymux_core::types::{non_blank, normalize_name};
use laymux_core::{
    ApplyOptions, ApplyReport, InputRequest, KeyValueStore, LayoutError, LayoutPatch,
    LayoutRepository, Prompt, PromptGrouping, Prompter, RecordShape, TerminalGroup, TerminalHost,
    TerminalLayout, TerminalSpec, apply_layout, new_layout_id, partition,
};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Done(value) => Outcome::Done(f(value)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

/// Unwrap a prompt answer or end the workflow as cancelled.
macro_rules! answer {
    ($prompt:expr) => {
        match $prompt {
            Prompt::Value(value) => value,
            Prompt::Cancelled => return Ok(Outcome::Cancelled),
        }
    };
}

// ─── Shared steps ─────────────────────────────────────────────────

fn ask_layout_name<P: Prompter + ?Sized>(
    prompter: &mut P,
    preset: Option<&str>,
    prompt: &str,
) -> Result<Prompt<String>, LayoutError> {
    if let Some(name) = preset {
        return normalize_name(name).map(Prompt::Value);
    }
    let request = InputRequest::new(prompt)
        .placeholder("e.g. Dev")
        .validate(require_name);
    Ok(prompter.input(&request)?.map(|name| name.trim().to_string()))
}

fn ask_description<P: Prompter + ?Sized>(
    prompter: &mut P,
    current: Option<&str>,
) -> Result<Prompt<Option<String>>, LayoutError> {
    let prompt = match current {
        Some(current) => format!("Description, currently {current:?}"),
        None => "Description".to_string(),
    };
    let request = InputRequest::new(&prompt).placeholder("optional, blank for none");
    Ok(prompter.input(&request)?.map(|d| non_blank(Some(d))))
}

fn ensure_unique<S: KeyValueStore>(
    repo: &LayoutRepository<S>,
    name: &str,
    exclude_id: Option<&str>,
) -> anyhow::Result<()> {
    if repo.name_exists(name, exclude_id)? {
        return Err(LayoutError::DuplicateName(name.to_string()).into());
    }
    Ok(())
}

/// Layout by id or exact name.
pub fn find<S: KeyValueStore>(
    repo: &LayoutRepository<S>,
    address: &str,
) -> anyhow::Result<TerminalLayout> {
    repo.resolve(address)?
        .ok_or_else(|| LayoutError::NotFound(address.to_string()).into())
}

/// Address the layout directly, or let the operator pick one.
pub fn pick<S: KeyValueStore, P: Prompter + ?Sized>(
    repo: &LayoutRepository<S>,
    prompter: &mut P,
    address: Option<&str>,
    title: &str,
) -> anyhow::Result<Outcome<TerminalLayout>> {
    if let Some(address) = address {
        return find(repo, address).map(Outcome::Done);
    }
    let mut layouts = repo.get_all()?;
    if layouts.is_empty() {
        prompter.notify("No saved layouts yet.");
        return Ok(Outcome::Cancelled);
    }
    let items: Vec<String> = layouts
        .iter()
        .map(|l| format!("{}  ({})", l.name, l.summary()))
        .collect();
    let idx = answer!(prompter.choose(title, &items)?);
    Ok(Outcome::Done(layouts.swap_remove(idx)))
}

fn group_terminals<P: Prompter + ?Sized>(
    prompter: &mut P,
    specs: Vec<TerminalSpec>,
) -> Result<Prompt<Vec<TerminalGroup>>, LayoutError> {
    let mut operator = PromptGrouping::new(prompter);
    partition(specs, &mut operator)
}

// ─── save / create ────────────────────────────────────────────────

/// Save the captured terminals as a new layout.
pub fn save<S: KeyValueStore, P: Prompter + ?Sized>(
    repo: &mut LayoutRepository<S>,
    prompter: &mut P,
    captured: Vec<TerminalSpec>,
    preset_name: Option<&str>,
) -> anyhow::Result<Outcome<TerminalLayout>> {
    if captured.is_empty() && !answer!(prompter.confirm("No open terminals. Save an empty layout?")?) {
        return Ok(Outcome::Cancelled);
    }

    let names: Vec<&str> = captured.iter().map(|t| t.name.as_str()).collect();
    let prompt = if names.is_empty() {
        "Layout name".to_string()
    } else {
        format!("Saving {} | Layout name", names.join(", "))
    };
    let name = answer!(ask_layout_name(prompter, preset_name, &prompt)?);
    ensure_unique(repo, &name, None)?;

    let groups = answer!(group_terminals(prompter, captured)?);
    let description = answer!(ask_description(prompter, None)?);

    let layout = TerminalLayout::new(&name, description, groups, repo.now())?;
    repo.save(&layout)?;
    prompter.notify(&format!("Saved layout {:?}: {}", layout.name, layout.summary()));
    Ok(Outcome::Done(layout))
}

/// Author a layout terminal by terminal.
pub fn create<S: KeyValueStore, P: Prompter + ?Sized>(
    repo: &mut LayoutRepository<S>,
    prompter: &mut P,
    profiles: &[String],
) -> anyhow::Result<Outcome<TerminalLayout>> {
    let name = answer!(ask_layout_name(prompter, None, "Layout name")?);
    ensure_unique(repo, &name, None)?;
    let description = answer!(ask_description(prompter, None)?);

    let mut terminals: Vec<TerminalSpec> = Vec::new();
    loop {
        let title = format!("Terminal {} name", terminals.len() + 1);
        let request = InputRequest::new(&title).placeholder("e.g. backend, blank to finish");
        // Declining the name finishes authoring.
        let Prompt::Value(terminal_name) = prompter.input(&request)? else {
            break;
        };
        let Some(terminal_name) = non_blank(Some(terminal_name)) else {
            break;
        };

        let mut spec = TerminalSpec::new(&terminal_name)?;
        if !profiles.is_empty() {
            let mut items = vec!["Default shell".to_string()];
            items.extend(profiles.iter().cloned());
            let title = format!("Profile for {terminal_name:?}");
            if let Some(profile) = answer!(prompter.choose(&title, &items)?).checked_sub(1) {
                spec = spec.with_profile(profiles[profile].clone());
            }
        }

        let prompt = format!("{terminal_name:?}: command to run");
        let command = answer!(prompter.input(&InputRequest::new(&prompt).placeholder("optional, e.g. npm run dev"))?);
        let prompt = format!("{terminal_name:?}: working directory");
        let cwd = answer!(prompter.input(&InputRequest::new(&prompt).placeholder("optional, e.g. ./backend"))?);
        terminals.push(spec.with_command(command).with_cwd(cwd));

        let question = format!("{} terminal(s) added. Add another?", terminals.len());
        if !matches!(prompter.confirm(&question)?, Prompt::Value(true)) {
            break;
        }
    }

    if terminals.is_empty() {
        tracing::warn!(layout = %name, "no terminals added");
        prompter.notify("No terminals added; layout not created.");
        return Ok(Outcome::Cancelled);
    }

    let count = terminals.len();
    let groups = answer!(group_terminals(prompter, terminals)?);
    let layout = TerminalLayout::new(&name, description, groups, repo.now())?;
    repo.save(&layout)?;
    prompter.notify(&format!(
        "Created layout {:?}: {count} terminal(s) in {}",
        layout.name,
        laymux_core::types::groups_label(layout.groups.len())
    ));
    Ok(Outcome::Done(layout))
}

// ─── load / delete ────────────────────────────────────────────────

/// Replay a layout. `close_existing: None` asks the operator.
pub fn load<S, P, H>(
    repo: &LayoutRepository<S>,
    prompter: &mut P,
    host: &H,
    address: Option<&str>,
    close_existing: Option<bool>,
    options: &ApplyOptions,
) -> anyhow::Result<Outcome<ApplyReport>>
where
    S: KeyValueStore,
    P: Prompter + ?Sized,
    H: TerminalHost + ?Sized,
{
    let Outcome::Done(layout) = pick(repo, prompter, address, "Layout to load")? else {
        return Ok(Outcome::Cancelled);
    };

    let close_existing = match close_existing {
        Some(close) => close,
        None => {
            let items = vec![
                "Keep open terminals".to_string(),
                "Close open terminals".to_string(),
            ];
            answer!(prompter.choose("What about the terminals already open?", &items)?) == 1
        }
    };

    let options = ApplyOptions {
        close_existing,
        ..options.clone()
    };
    let report = apply_layout(host, &layout, &options)
        .with_context(|| format!("failed to load layout {:?}", layout.name))?;

    for warning in &report.warnings {
        prompter.notify(&format!("warning: {warning}"));
    }
    prompter.notify(&format!(
        "Loaded layout {:?}: {} terminal(s) in {}",
        layout.name,
        report.terminals.len(),
        laymux_core::types::groups_label(report.groups)
    ));
    Ok(Outcome::Done(report))
}

pub fn delete<S: KeyValueStore, P: Prompter + ?Sized>(
    repo: &mut LayoutRepository<S>,
    prompter: &mut P,
    address: Option<&str>,
    assume_yes: bool,
) -> anyhow::Result<Outcome<TerminalLayout>> {
    let Outcome::Done(layout) = pick(repo, prompter, address, "Layout to delete")? else {
        return Ok(Outcome::Cancelled);
    };
    if !assume_yes {
        let question = format!("Delete layout {:?}? This cannot be undone.", layout.name);
        if !answer!(prompter.confirm(&question)?) {
            return Ok(Outcome::Cancelled);
        }
    }
    if !repo.delete(&layout.id)? {
        return Err(LayoutError::NotFound(layout.id).into());
    }
    prompter.notify(&format!("Deleted layout {:?}", layout.name));
    Ok(Outcome::Done(layout))
}

// ─── edit ─────────────────────────────────────────────────────────

/// Rename, redescribe, or re-capture a layout. `capture` is only called
/// when the operator chooses to replace the terminals.
pub fn edit<S, P, C>(
    repo: &mut LayoutRepository<S>,
    prompter: &mut P,
    address: Option<&str>,
    capture: C,
) -> anyhow::Result<Outcome<TerminalLayout>>
where
    S: KeyValueStore,
    P: Prompter + ?Sized,
    C: FnOnce() -> anyhow::Result<Vec<TerminalSpec>>,
{
    let Outcome::Done(layout) = pick(repo, prompter, address, "Layout to edit")? else {
        return Ok(Outcome::Cancelled);
    };
    let items = vec![
        "Rename".to_string(),
        "Edit description".to_string(),
        "Replace terminals with the ones open now".to_string(),
    ];
    let title = format!("Edit {:?}", layout.name);
    match answer!(prompter.choose(&title, &items)?) {
        0 => rename(repo, prompter, layout),
        1 => redescribe(repo, prompter, layout),
        _ => recapture(repo, prompter, layout, capture()?),
    }
}

fn rename<S: KeyValueStore, P: Prompter + ?Sized>(
    repo: &mut LayoutRepository<S>,
    prompter: &mut P,
    layout: TerminalLayout,
) -> anyhow::Result<Outcome<TerminalLayout>> {
    let request = InputRequest::new("New name")
        .initial(&layout.name)
        .validate(require_name);
    let name = answer!(prompter.input(&request)?).trim().to_string();
    if name == layout.name {
        prompter.notify("Name unchanged.");
        return Ok(Outcome::Done(layout));
    }
    ensure_unique(repo, &name, Some(&layout.id))?;
    let updated = repo.update(&layout.id, LayoutPatch::name(name))?;
    prompter.notify(&format!("Renamed to {:?}", updated.name));
    Ok(Outcome::Done(updated))
}

fn redescribe<S: KeyValueStore, P: Prompter + ?Sized>(
    repo: &mut LayoutRepository<S>,
    prompter: &mut P,
    layout: TerminalLayout,
) -> anyhow::Result<Outcome<TerminalLayout>> {
    let description = answer!(ask_description(prompter, layout.description.as_deref())?);
    let updated = repo.update(&layout.id, LayoutPatch::description(description))?;
    prompter.notify("Description updated.");
    Ok(Outcome::Done(updated))
}

fn recapture<S: KeyValueStore, P: Prompter + ?Sized>(
    repo: &mut LayoutRepository<S>,
    prompter: &mut P,
    layout: TerminalLayout,
    captured: Vec<TerminalSpec>,
) -> anyhow::Result<Outcome<TerminalLayout>> {
    if captured.is_empty() {
        let question = format!("No open terminals. Clear every terminal from {:?}?", layout.name);
        if !answer!(prompter.confirm(&question)?) {
            return Ok(Outcome::Cancelled);
        }
    }
    let groups = answer!(group_terminals(prompter, captured)?);
    let updated = repo.update(&layout.id, LayoutPatch::groups(groups))?;
    prompter.notify(&format!("Updated {:?}: {}", updated.name, updated.summary()));
    Ok(Outcome::Done(updated))
}

// ─── browse ───────────────────────────────────────────────────────

/// What the operator did from the [`browse`] menu.
#[derive(Debug, Clone, PartialEq)]
pub enum Browsed {
    Created(TerminalLayout),
    Loaded(ApplyReport),
    Edited(TerminalLayout),
    Deleted(TerminalLayout),
}

/// Pick a saved layout (or start a new one), then load, edit or delete it.
pub fn browse<S, P, H, C>(
    repo: &mut LayoutRepository<S>,
    prompter: &mut P,
    host: &H,
    profiles: &[String],
    options: &ApplyOptions,
    capture: C,
) -> anyhow::Result<Outcome<Browsed>>
where
    S: KeyValueStore,
    P: Prompter + ?Sized,
    H: TerminalHost + ?Sized,
    C: FnOnce() -> anyhow::Result<Vec<TerminalSpec>>,
{
    let mut layouts = repo.get_all()?;
    let mut items: Vec<String> = layouts
        .iter()
        .map(|l| format!("{}  ({})", l.name, l.summary()))
        .collect();
    items.push("+ Create a new layout".to_string());

    let idx = answer!(prompter.choose("Terminal layouts", &items)?);
    if idx == layouts.len() {
        return Ok(create(repo, prompter, profiles)?.map(Browsed::Created));
    }
    let layout = layouts.swap_remove(idx);

    let actions = vec![
        "Load".to_string(),
        "Edit".to_string(),
        "Delete".to_string(),
    ];
    let title = format!("{:?}: {}", layout.name, layout.summary());
    let address = Some(layout.id.as_str());
    Ok(match answer!(prompter.choose(&title, &actions)?) {
        0 => load(repo, prompter, host, address, None, options)?.map(Browsed::Loaded),
        1 => edit(repo, prompter, address, capture)?.map(Browsed::Edited),
        _ => delete(repo, prompter, address, false)?.map(Browsed::Deleted),
    })
}

// ─── import ───────────────────────────────────────────────────────

/// Store an exported record (either shape) as a new layout with a fresh id.
/// Names are trimmed, empty groups dropped and group ids renumbered.
pub fn import<S: KeyValueStore>(
    repo: &mut LayoutRepository<S>,
    record: Value,
    name: Option<&str>,
) -> anyhow::Result<TerminalLayout> {
    let shape = RecordShape::detect(&record);
    let mut layout = migrate_record(shape, record).context("file is not a layout record")?;
    layout.name = normalize_name(name.unwrap_or(&layout.name))?;
    layout.description = non_blank(layout.description);
    layout.groups = normalize_groups(layout.groups)?;
    ensure_unique(repo, &layout.name, None)?;

    let now = repo.now();
    layout.id = new_layout_id();
    layout.created_at = now;
    layout.updated_at = now;
    repo.save(&layout)?;
    Ok(layout)
}

fn normalize_groups(groups: Vec<TerminalGroup>) -> Result<Vec<TerminalGroup>, LayoutError> {
    let mut normalized = Vec::with_capacity(groups.len());
    for group in groups {
        if group.terminals.is_empty() {
            tracing::debug!(group = group.id, "dropping empty group");
            continue;
        }
        let terminals = group
            .terminals
            .into_iter()
            .map(normalize_terminal)
            .collect::<Result<Vec<_>, _>>()?;
        normalized.push(TerminalGroup::new(normalized.len() as u32, terminals));
    }
    Ok(normalized)
}

fn normalize_terminal(spec: TerminalSpec) -> Result<TerminalSpec, LayoutError> {
    let name = spec.name.trim();
    if name.is_empty() {
        return Err(LayoutError::Validation("terminal name must not be empty".into()));
    }
    Ok(TerminalSpec {
        name: name.to_string(),
        cwd: non_blank(spec.cwd),
        command: non_blank(spec.command),
        env: spec.env,
        icon: non_blank(spec.icon),
        color: non_blank(spec.color),
        profile_name: non_blank(spec.profile_name),
    })
}
