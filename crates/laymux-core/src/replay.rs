//! Replay engine: recreates a stored layout on a [`TerminalHost`].
//!
//! Groups are applied strictly in order. After every create or split the
//! engine polls `list_terminals()` until the new handle shows up, so a
//! split never targets a terminal the host has not finished opening.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::host::{CreateTerminal, TerminalHandle, TerminalHost};
use crate::resolve::resolve_cwd;
use crate::types::{TerminalLayout, TerminalSpec};

#[derive(Debug, Error)]
pub enum ReplayError<E: std::error::Error + 'static> {
    #[error("host error: {0}")]
    Host(#[source] E),

    #[error("terminal {terminal:?} was not listed by the host after {waited_ms}ms")]
    Settle { terminal: String, waited_ms: u64 },
}

// ─── Settle wait ──────────────────────────────────────────────────

/// Exponential backoff bounds for [`wait_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub initial: Duration,
    pub max_interval: Duration,
    /// Zero means check exactly once.
    pub timeout: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(20),
            max_interval: Duration::from_millis(250),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Poll `check` until it reports `true` or the policy's timeout elapses.
///
/// Returns `Ok(false)` on timeout. Errors from `check` end the wait
/// immediately.
pub fn wait_until<E>(
    policy: &SettlePolicy,
    mut check: impl FnMut() -> Result<bool, E>,
) -> Result<bool, E> {
    let start = Instant::now();
    let mut interval = policy.initial;
    loop {
        if check()? {
            return Ok(true);
        }
        let elapsed = start.elapsed();
        if elapsed >= policy.timeout {
            return Ok(false);
        }
        std::thread::sleep(interval.min(policy.timeout - elapsed));
        interval = (interval * 2).min(policy.max_interval);
    }
}

// ─── Apply ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Dispose terminals that were open before replay, once the new ones
    /// exist.
    pub close_existing: bool,
    /// Base for relative `cwd` values.
    pub workspace_root: Option<PathBuf>,
    /// Profile name to shell command.
    pub profiles: BTreeMap<String, String>,
    pub settle: SettlePolicy,
    /// Terminal never disposed by `close_existing` (the one running us).
    pub spare: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub groups: usize,
    /// Created terminals in creation order.
    pub terminals: Vec<TerminalHandle>,
    /// Non-fatal problems (dropped cwd, unknown profile).
    pub warnings: Vec<String>,
    pub disposed: usize,
}

/// Recreate `layout` on `host`.
///
/// Each group's first terminal is created as a root; every further one is
/// split off that root in order, renamed, coloured and handed its command.
pub fn apply_layout<H: TerminalHost + ?Sized>(
    host: &H,
    layout: &TerminalLayout,
    options: &ApplyOptions,
) -> Result<ApplyReport, ReplayError<H::Error>> {
    tracing::info!(layout = %layout.name, groups = layout.groups.len(), "applying layout");

    let existing = if options.close_existing {
        host.list_terminals().map_err(ReplayError::Host)?
    } else {
        Vec::new()
    };

    let mut report = ApplyReport::default();
    for group in &layout.groups {
        let Some((root_spec, rest)) = group.terminals.split_first() else {
            continue;
        };
        let request = creation_request(root_spec, options, &mut report.warnings);
        let root = host.create_terminal(&request).map_err(ReplayError::Host)?;
        settle(host, &root, &options.settle)?;
        finish_terminal(host, &root, root_spec)?;
        report.terminals.push(root.clone());

        for spec in rest {
            let request = creation_request(spec, options, &mut report.warnings);
            let pane = host
                .split_terminal(&root, &request)
                .map_err(ReplayError::Host)?;
            settle(host, &pane, &options.settle)?;
            finish_terminal(host, &pane, spec)?;
            report.terminals.push(pane);
        }
        report.groups += 1;
        tracing::debug!(group = group.id, terminals = group.terminals.len(), "group settled");
    }

    for old in &existing {
        if options.spare.as_deref() == Some(old.id.as_str()) {
            continue;
        }
        host.dispose_terminal(old).map_err(ReplayError::Host)?;
        report.disposed += 1;
    }

    tracing::info!(
        layout = %layout.name,
        terminals = report.terminals.len(),
        disposed = report.disposed,
        warnings = report.warnings.len(),
        "layout applied"
    );
    Ok(report)
}

fn creation_request(
    spec: &TerminalSpec,
    options: &ApplyOptions,
    warnings: &mut Vec<String>,
) -> CreateTerminal {
    let cwd = spec.cwd.as_deref().and_then(|raw| {
        match resolve_cwd(raw, options.workspace_root.as_deref(), |name| {
            std::env::var(name).ok()
        }) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(terminal = %spec.name, "dropping cwd: {e}");
                warnings.push(format!("{}: {e}", spec.name));
                None
            }
        }
    });

    let shell = spec.profile_name.as_deref().and_then(|profile| {
        let shell = options.profiles.get(profile).cloned();
        if shell.is_none() {
            tracing::warn!(terminal = %spec.name, profile, "unknown profile, using default shell");
            warnings.push(format!("{}: unknown profile {profile:?}", spec.name));
        }
        shell
    });

    CreateTerminal {
        name: spec.name.clone(),
        cwd,
        env: spec.env.clone().unwrap_or_default(),
        shell,
        icon: spec.icon.clone(),
    }
}

fn settle<H: TerminalHost + ?Sized>(
    host: &H,
    handle: &TerminalHandle,
    policy: &SettlePolicy,
) -> Result<(), ReplayError<H::Error>> {
    let start = Instant::now();
    let listed = wait_until(policy, || {
        host.list_terminals()
            .map(|open| open.iter().any(|t| t.id == handle.id))
    })
    .map_err(ReplayError::Host)?;
    if !listed {
        return Err(ReplayError::Settle {
            terminal: handle.name.clone(),
            waited_ms: start.elapsed().as_millis() as u64,
        });
    }
    Ok(())
}

fn finish_terminal<H: TerminalHost + ?Sized>(
    host: &H,
    handle: &TerminalHandle,
    spec: &TerminalSpec,
) -> Result<(), ReplayError<H::Error>> {
    host.rename_terminal(handle, &spec.name)
        .map_err(ReplayError::Host)?;
    if let Some(color) = &spec.color {
        host.set_color(handle, color).map_err(ReplayError::Host)?;
    }
    if let Some(command) = &spec.command {
        host.send_text(handle, command).map_err(ReplayError::Host)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::types::TerminalGroup;

    #[derive(Debug, Error)]
    #[error("fake host failure")]
    struct FakeError;

    #[derive(Default)]
    struct FakeState {
        next_id: u32,
        open: Vec<TerminalHandle>,
        /// Created but not yet visible; revealed after `lag` list calls.
        pending: Vec<(TerminalHandle, usize)>,
        calls: Vec<String>,
        requests: Vec<CreateTerminal>,
    }

    /// Records calls; new terminals become listed after `lag` polls.
    #[derive(Default)]
    struct FakeHost {
        state: Mutex<FakeState>,
        lag: usize,
        never_settles: bool,
    }

    impl FakeHost {
        fn with_open(names: &[&str]) -> Self {
            let host = Self::default();
            {
                let mut state = host.state.lock().expect("lock");
                for name in names {
                    let id = format!("%{}", state.next_id);
                    state.next_id += 1;
                    state.open.push(TerminalHandle {
                        id,
                        name: name.to_string(),
                    });
                }
            }
            host
        }

        fn calls(&self) -> Vec<String> {
            self.state.lock().expect("lock").calls.clone()
        }

        fn requests(&self) -> Vec<CreateTerminal> {
            self.state.lock().expect("lock").requests.clone()
        }

        fn open(&self, spec: &CreateTerminal, call: String) -> TerminalHandle {
            let mut state = self.state.lock().expect("lock");
            let handle = TerminalHandle {
                id: format!("%{}", state.next_id),
                name: spec.name.clone(),
            };
            state.next_id += 1;
            state.calls.push(call);
            state.requests.push(spec.clone());
            if !self.never_settles {
                state.pending.push((handle.clone(), self.lag));
            }
            handle
        }
    }

    impl TerminalHost for FakeHost {
        type Error = FakeError;

        fn create_terminal(&self, spec: &CreateTerminal) -> Result<TerminalHandle, FakeError> {
            Ok(self.open(spec, format!("create {}", spec.name)))
        }

        fn split_terminal(
            &self,
            parent: &TerminalHandle,
            spec: &CreateTerminal,
        ) -> Result<TerminalHandle, FakeError> {
            Ok(self.open(spec, format!("split {} off {}", spec.name, parent.name)))
        }

        fn rename_terminal(&self, terminal: &TerminalHandle, name: &str) -> Result<(), FakeError> {
            let mut state = self.state.lock().expect("lock");
            state.calls.push(format!("rename {} {name}", terminal.id));
            Ok(())
        }

        fn send_text(&self, terminal: &TerminalHandle, text: &str) -> Result<(), FakeError> {
            let mut state = self.state.lock().expect("lock");
            state.calls.push(format!("send {} {text}", terminal.name));
            Ok(())
        }

        fn list_terminals(&self) -> Result<Vec<TerminalHandle>, FakeError> {
            let mut state = self.state.lock().expect("lock");
            state.calls.push("list".into());
            let mut still_pending = Vec::new();
            for (handle, polls) in std::mem::take(&mut state.pending) {
                if polls == 0 {
                    state.open.push(handle);
                } else {
                    still_pending.push((handle, polls - 1));
                }
            }
            state.pending = still_pending;
            Ok(state.open.clone())
        }

        fn dispose_terminal(&self, terminal: &TerminalHandle) -> Result<(), FakeError> {
            let mut state = self.state.lock().expect("lock");
            state.calls.push(format!("dispose {}", terminal.name));
            state.open.retain(|t| t.id != terminal.id);
            Ok(())
        }

        fn set_color(&self, terminal: &TerminalHandle, color: &str) -> Result<(), FakeError> {
            let mut state = self.state.lock().expect("lock");
            state.calls.push(format!("color {} {color}", terminal.name));
            Ok(())
        }
    }

    fn spec(name: &str) -> TerminalSpec {
        TerminalSpec::new(name).expect("valid")
    }

    fn layout(groups: Vec<Vec<TerminalSpec>>) -> TerminalLayout {
        let groups = groups
            .into_iter()
            .enumerate()
            .map(|(i, terminals)| TerminalGroup::new(i as u32, terminals))
            .collect();
        TerminalLayout::new("Dev", None, groups, Utc::now()).expect("valid")
    }

    fn fast() -> ApplyOptions {
        ApplyOptions {
            settle: SettlePolicy {
                initial: Duration::from_millis(1),
                max_interval: Duration::from_millis(2),
                timeout: Duration::from_millis(200),
            },
            ..ApplyOptions::default()
        }
    }

    fn without_lists(calls: Vec<String>) -> Vec<String> {
        calls.into_iter().filter(|c| c != "list").collect()
    }

    #[test]
    fn groups_created_in_order_with_splits_off_root() {
        let host = FakeHost::default();
        let layout = layout(vec![
            vec![spec("api").with_command("cargo run"), spec("web"), spec("db")],
            vec![spec("logs")],
        ]);
        let report = apply_layout(&host, &layout, &fast()).expect("apply");

        assert_eq!(report.groups, 2);
        assert_eq!(report.terminals.len(), 4);
        assert_eq!(
            without_lists(host.calls()),
            [
                "create api",
                "rename %0 api",
                "send api cargo run",
                "split web off api",
                "rename %1 web",
                "split db off api",
                "rename %2 db",
                "create logs",
                "rename %3 logs",
            ]
        );
    }

    #[test]
    fn each_terminal_is_listed_before_next_step() {
        let host = FakeHost {
            lag: 2,
            ..FakeHost::default()
        };
        let layout = layout(vec![vec![spec("a"), spec("b")], vec![spec("c")]]);
        apply_layout(&host, &layout, &fast()).expect("apply");

        let calls = host.calls();
        let pos = |needle: &str| calls.iter().position(|c| c == needle).expect(needle);
        // three polls per terminal: two misses, then a hit
        assert_eq!(calls[pos("create a") + 1..pos("rename %0 a")], ["list", "list", "list"]);
        assert!(pos("rename %1 b") < pos("create c"));
    }

    #[test]
    fn settle_timeout_fails_replay() {
        let host = FakeHost {
            never_settles: true,
            ..FakeHost::default()
        };
        let mut options = fast();
        options.settle.timeout = Duration::from_millis(10);
        let err = apply_layout(&host, &layout(vec![vec![spec("a")]]), &options).unwrap_err();
        match err {
            ReplayError::Settle { terminal, .. } => assert_eq!(terminal, "a"),
            other => panic!("expected Settle, got {other:?}"),
        }
        assert!(!host.calls().iter().any(|c| c.starts_with("rename")));
    }

    #[test]
    fn close_existing_disposes_after_creation_and_spares_own_pane() {
        let host = FakeHost::with_open(&["old-1", "laymux", "old-2"]);
        let mut options = fast();
        options.close_existing = true;
        options.spare = Some("%1".into());
        let report = apply_layout(&host, &layout(vec![vec![spec("new")]]), &options).expect("apply");

        assert_eq!(report.disposed, 2);
        let calls = without_lists(host.calls());
        assert_eq!(
            calls,
            ["create new", "rename %3 new", "dispose old-1", "dispose old-2"]
        );
    }

    #[test]
    fn keep_existing_disposes_nothing() {
        let host = FakeHost::with_open(&["old"]);
        let report = apply_layout(&host, &layout(vec![vec![spec("new")]]), &fast()).expect("apply");
        assert_eq!(report.disposed, 0);
        assert!(!host.calls().iter().any(|c| c.starts_with("dispose")));
    }

    #[test]
    fn cwd_resolution_drops_bad_paths_with_warnings() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("api")).expect("mkdir");
        let host = FakeHost::default();
        let layout = layout(vec![vec![
            spec("api").with_cwd("api"),
            spec("web").with_cwd("web"),
        ]]);

        let mut options = fast();
        options.workspace_root = Some(dir.path().to_path_buf());
        let report = apply_layout(&host, &layout, &options).expect("apply");

        let requests = host.requests();
        assert_eq!(requests[0].cwd, Some(dir.path().join("api")));
        assert_eq!(requests[1].cwd, None);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("web:"));
    }

    #[test]
    fn relative_cwd_without_root_is_dropped() {
        let host = FakeHost::default();
        let report = apply_layout(&host, &layout(vec![vec![spec("a").with_cwd("src")]]), &fast())
            .expect("apply");
        assert_eq!(host.requests()[0].cwd, None);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn profiles_resolve_to_shell() {
        let host = FakeHost::default();
        let layout = layout(vec![vec![
            spec("a").with_profile("zsh"),
            spec("b").with_profile("fish"),
        ]]);
        let mut options = fast();
        options.profiles.insert("zsh".into(), "/bin/zsh -l".into());
        let report = apply_layout(&host, &layout, &options).expect("apply");

        let requests = host.requests();
        assert_eq!(requests[0].shell.as_deref(), Some("/bin/zsh -l"));
        assert_eq!(requests[1].shell, None);
        assert_eq!(report.warnings, ["b: unknown profile \"fish\""]);
    }

    #[test]
    fn color_and_env_passed_through() {
        let host = FakeHost::default();
        let layout = layout(vec![vec![
            spec("a").with_color("red").with_env("PORT", "3000"),
        ]]);
        apply_layout(&host, &layout, &fast()).expect("apply");
        assert!(host.calls().contains(&"color a red".to_string()));
        assert_eq!(host.requests()[0].env.get("PORT").map(String::as_str), Some("3000"));
    }

    #[test]
    fn empty_layout_is_a_no_op() {
        let host = FakeHost::default();
        let report = apply_layout(&host, &layout(Vec::new()), &fast()).expect("apply");
        assert_eq!(report, ApplyReport::default());
        assert!(host.calls().is_empty());
    }

    #[test]
    fn wait_until_zero_timeout_checks_once() {
        let policy = SettlePolicy {
            timeout: Duration::ZERO,
            ..SettlePolicy::default()
        };
        let mut checks = 0;
        let done = wait_until::<FakeError>(&policy, || {
            checks += 1;
            Ok(false)
        })
        .expect("no error");
        assert!(!done);
        assert_eq!(checks, 1);
    }

    #[test]
    fn wait_until_polls_until_true() {
        let mut checks = 0;
        let done = wait_until::<FakeError>(&fast().settle, || {
            checks += 1;
            Ok(checks == 4)
        })
        .expect("no error");
        assert!(done);
        assert_eq!(checks, 4);
    }

    #[test]
    fn wait_until_stops_on_error() {
        let mut checks = 0;
        let result = wait_until(&fast().settle, || {
            checks += 1;
            Err::<bool, _>(FakeError)
        });
        assert!(result.is_err());
        assert_eq!(checks, 1);
    }
}
