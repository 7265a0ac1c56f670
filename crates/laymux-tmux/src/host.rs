//! `TerminalHost` over tmux.
//!
//! Group root ⇒ new window (new session when the target session does not
//! exist yet), split ⇒ `split-window -h` off the root, name ⇒ pane title
//! plus window name for roots.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use laymux_core::{CreateTerminal, TerminalHandle, TerminalHost};

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;
use crate::pane_info::{exact_session, list_panes};

/// Prints the new pane's id on stdout.
const PRINT_PANE_ID: [&str; 3] = ["-P", "-F", "#{pane_id}"];

/// Session of the client we run inside (`$TMUX` set).
pub fn current_session(runner: &impl TmuxCommandRunner) -> Result<String, TmuxError> {
    let out = runner.run(&["display-message", "-p", "#{session_name}"])?;
    let name = out.trim();
    if name.is_empty() {
        return Err(TmuxError::CommandFailed(
            "display-message returned no session name".into(),
        ));
    }
    Ok(name.to_string())
}

pub struct TmuxHost<R> {
    runner: R,
    session: String,
    /// Panes created as window roots; renaming them renames the window.
    roots: Mutex<HashSet<String>>,
}

impl<R: TmuxCommandRunner> TmuxHost<R> {
    pub fn new(runner: R, session: impl Into<String>) -> Self {
        Self {
            runner,
            session: session.into(),
            roots: Mutex::new(HashSet::new()),
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Whether the target session exists. A missing server counts as no.
    pub fn has_session(&self) -> Result<bool, TmuxError> {
        let target = exact_session(&self.session);
        match self.runner.run(&["has-session", "-t", &target]) {
            Ok(_) => Ok(true),
            Err(TmuxError::CommandFailed(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn open(&self, mut args: Vec<String>, spec: &CreateTerminal) -> Result<TerminalHandle, TmuxError> {
        if let Some(cwd) = &spec.cwd {
            args.push("-c".into());
            args.push(cwd.to_string_lossy().into_owned());
        }
        for (key, value) in &spec.env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        args.extend(PRINT_PANE_ID.iter().map(|s| s.to_string()));
        if let Some(shell) = &spec.shell {
            args.push("--".into());
            args.push(shell.clone());
        }
        if let Some(icon) = &spec.icon {
            tracing::debug!(terminal = %spec.name, icon = %icon, "tmux has no pane icons, ignoring");
        }

        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.runner.run(&argv)?;
        let id = out.trim();
        if !id.starts_with('%') {
            return Err(TmuxError::ParseError {
                line_num: 1,
                detail: format!("expected a pane id, got {id:?}"),
            });
        }
        Ok(TerminalHandle {
            id: id.to_string(),
            name: spec.name.clone(),
        })
    }

    fn is_root(&self, pane_id: &str) -> bool {
        self.roots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(pane_id)
    }
}

impl<R: TmuxCommandRunner> TerminalHost for TmuxHost<R> {
    type Error = TmuxError;

    fn create_terminal(&self, spec: &CreateTerminal) -> Result<TerminalHandle, TmuxError> {
        let args: Vec<String> = if self.has_session()? {
            let target = format!("{}:", exact_session(&self.session));
            vec!["new-window".into(), "-t".into(), target, "-n".into(), spec.name.clone()]
        } else {
            tracing::info!(session = %self.session, "creating tmux session");
            vec![
                "new-session".into(),
                "-d".into(),
                "-s".into(),
                self.session.clone(),
                "-n".into(),
                spec.name.clone(),
            ]
        };
        let handle = self.open(args, spec)?;
        self.roots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.id.clone());
        tracing::debug!(pane = %handle.id, name = %handle.name, "created window");
        Ok(handle)
    }

    fn split_terminal(
        &self,
        parent: &TerminalHandle,
        spec: &CreateTerminal,
    ) -> Result<TerminalHandle, TmuxError> {
        let args: Vec<String> = vec!["split-window".into(), "-h".into(), "-t".into(), parent.id.clone()];
        let handle = self.open(args, spec)?;
        self.runner
            .run(&["select-layout", "-t", &parent.id, "even-horizontal"])?;
        tracing::debug!(pane = %handle.id, parent = %parent.id, "split pane");
        Ok(handle)
    }

    fn rename_terminal(&self, terminal: &TerminalHandle, name: &str) -> Result<(), TmuxError> {
        self.runner
            .run(&["select-pane", "-t", &terminal.id, "-T", name])?;
        if self.is_root(&terminal.id) {
            self.runner
                .run(&["rename-window", "-t", &terminal.id, "--", name])?;
        }
        Ok(())
    }

    fn send_text(&self, terminal: &TerminalHandle, text: &str) -> Result<(), TmuxError> {
        self.runner
            .run(&["send-keys", "-t", &terminal.id, "-l", "--", text])?;
        self.runner.run(&["send-keys", "-t", &terminal.id, "Enter"])?;
        Ok(())
    }

    fn list_terminals(&self) -> Result<Vec<TerminalHandle>, TmuxError> {
        if !self.has_session()? {
            return Ok(Vec::new());
        }
        let panes = list_panes(&self.runner, &self.session)?;
        Ok(panes
            .iter()
            .map(|pane| TerminalHandle {
                id: pane.pane_id.clone(),
                name: pane.display_name().to_string(),
            })
            .collect())
    }

    fn dispose_terminal(&self, terminal: &TerminalHandle) -> Result<(), TmuxError> {
        self.runner.run(&["kill-pane", "-t", &terminal.id])?;
        self.roots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&terminal.id);
        Ok(())
    }

    fn set_color(&self, terminal: &TerminalHandle, color: &str) -> Result<(), TmuxError> {
        let style = format!("fg={color}");
        self.runner
            .run(&["select-pane", "-t", &terminal.id, "-P", &style])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::PathBuf;

    use super::*;

    /// Records every command; answers from a queue, default `""`.
    #[derive(Default)]
    struct MockRunner {
        calls: Mutex<Vec<Vec<String>>>,
        replies: Mutex<VecDeque<Result<String, TmuxError>>>,
    }

    impl MockRunner {
        fn replying(replies: Vec<Result<String, TmuxError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .expect("lock")
                .iter()
                .map(|argv| argv.join(" "))
                .collect()
        }
    }

    impl TmuxCommandRunner for MockRunner {
        fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
            self.calls
                .lock()
                .expect("lock")
                .push(args.iter().map(|a| a.to_string()).collect());
            self.replies
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn failed() -> Result<String, TmuxError> {
        Err(TmuxError::CommandFailed("no server running".into()))
    }

    fn handle(id: &str, name: &str) -> TerminalHandle {
        TerminalHandle {
            id: id.into(),
            name: name.into(),
        }
    }

    #[test]
    fn create_in_existing_session_opens_window() {
        let runner = MockRunner::replying(vec![Ok(String::new()), Ok("%7\n".into())]);
        let host = TmuxHost::new(&runner, "work");
        let mut spec = CreateTerminal::named("api");
        spec.cwd = Some(PathBuf::from("/src/api"));
        spec.env.insert("PORT".into(), "3000".into());
        spec.shell = Some("/bin/zsh".into());

        let created = host.create_terminal(&spec).expect("create");
        assert_eq!(created, handle("%7", "api"));
        assert_eq!(
            runner.calls(),
            [
                "has-session -t =work",
                "new-window -t =work: -n api -c /src/api -e PORT=3000 -P -F #{pane_id} -- /bin/zsh",
            ]
        );
    }

    #[test]
    fn create_without_session_starts_one() {
        let runner = MockRunner::replying(vec![failed(), Ok("%0".into())]);
        let host = TmuxHost::new(&runner, "laymux");
        host.create_terminal(&CreateTerminal::named("api"))
            .expect("create");
        assert_eq!(
            runner.calls()[1],
            "new-session -d -s laymux -n api -P -F #{pane_id}"
        );
    }

    #[test]
    fn create_rejects_garbage_pane_id() {
        let runner = MockRunner::replying(vec![Ok(String::new()), Ok("oops".into())]);
        let host = TmuxHost::new(&runner, "work");
        let err = host.create_terminal(&CreateTerminal::named("api")).unwrap_err();
        assert!(matches!(err, TmuxError::ParseError { .. }));
    }

    #[test]
    fn has_session_propagates_io_errors() {
        let runner = MockRunner::replying(vec![Err(TmuxError::Io(std::io::Error::other("no tmux")))]);
        let host = TmuxHost::new(&runner, "work");
        assert!(host.has_session().is_err());
    }

    #[test]
    fn split_targets_parent_and_evens_layout() {
        let runner = MockRunner::replying(vec![Ok("%8".into())]);
        let host = TmuxHost::new(&runner, "work");
        let pane = host
            .split_terminal(&handle("%7", "api"), &CreateTerminal::named("web"))
            .expect("split");
        assert_eq!(pane, handle("%8", "web"));
        assert_eq!(
            runner.calls(),
            [
                "split-window -h -t %7 -P -F #{pane_id}",
                "select-layout -t %7 even-horizontal",
            ]
        );
    }

    #[test]
    fn rename_root_also_renames_window() {
        let runner = MockRunner::replying(vec![Ok(String::new()), Ok("%1".into())]);
        let host = TmuxHost::new(&runner, "work");
        let root = host.create_terminal(&CreateTerminal::named("api")).expect("create");
        host.rename_terminal(&root, "api").expect("rename");
        host.rename_terminal(&handle("%2", "web"), "web").expect("rename");

        let calls = runner.calls();
        assert_eq!(
            calls[2..],
            [
                "select-pane -t %1 -T api",
                "rename-window -t %1 -- api",
                "select-pane -t %2 -T web",
            ]
        );
    }

    #[test]
    fn send_text_is_literal_then_enter() {
        let runner = MockRunner::default();
        let host = TmuxHost::new(&runner, "work");
        host.send_text(&handle("%1", "api"), "echo $HOME; ls")
            .expect("send");
        assert_eq!(
            runner.calls(),
            ["send-keys -t %1 -l -- echo $HOME; ls", "send-keys -t %1 Enter"]
        );
    }

    #[test]
    fn leading_dash_text_is_not_a_flag() {
        let runner = MockRunner::replying(vec![Ok(String::new()), Ok("%1".into())]);
        let host = TmuxHost::new(&runner, "work");
        let mut spec = CreateTerminal::named("-dash");
        spec.shell = Some("-zsh".into());
        let root = host.create_terminal(&spec).expect("create");
        host.rename_terminal(&root, "-dash").expect("rename");
        host.send_text(&root, "-n hi").expect("send");

        assert_eq!(
            runner.calls()[1..],
            [
                "new-window -t =work: -n -dash -P -F #{pane_id} -- -zsh",
                "select-pane -t %1 -T -dash",
                "rename-window -t %1 -- -dash",
                "send-keys -t %1 -l -- -n hi",
                "send-keys -t %1 Enter",
            ]
        );
    }

    #[test]
    fn list_terminals_uses_titles() {
        let runner = MockRunner::replying(vec![
            Ok(String::new()),
            Ok("work\t@1\t0\tdev\t%1\t0\t/src\tapi\t1\thost\nwork\t@1\t0\tdev\t%2\t1\t/src\thost\t0\thost\n".into()),
        ]);
        let host = TmuxHost::new(&runner, "work");
        let listed = host.list_terminals().expect("list");
        assert_eq!(listed, [handle("%1", "api"), handle("%2", "dev")]);
    }

    #[test]
    fn list_terminals_without_session_is_empty() {
        let runner = MockRunner::replying(vec![failed()]);
        let host = TmuxHost::new(&runner, "work");
        assert!(host.list_terminals().expect("list").is_empty());
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn dispose_and_color() {
        let runner = MockRunner::default();
        let host = TmuxHost::new(&runner, "work");
        host.set_color(&handle("%3", "db"), "green").expect("color");
        host.dispose_terminal(&handle("%3", "db")).expect("dispose");
        assert_eq!(
            runner.calls(),
            ["select-pane -t %3 -P fg=green", "kill-pane -t %3"]
        );
    }

    #[test]
    fn current_session_reads_display_message() {
        let runner = MockRunner::replying(vec![Ok("main\n".into())]);
        assert_eq!(current_session(&runner).expect("session"), "main");
        let empty = MockRunner::replying(vec![Ok("\n".into())]);
        assert!(current_session(&empty).is_err());
    }
}
