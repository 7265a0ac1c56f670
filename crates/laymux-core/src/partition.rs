//! Group partitioner: turns an ordered list of terminal specs into ordered
//! split groups.
//!
//! Host-independent. Which terminals sit side by side cannot be read back
//! from an open host session, so the operator states it here.

use crate::error::LayoutError;
use crate::prompt::{Prompt, Prompter};
use crate::types::{TerminalGroup, TerminalSpec, groups_label};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingStrategy {
    /// One group per terminal.
    AllSeparate,
    /// A single group holding every terminal.
    AllTogether,
    /// Operator picks each group from the remaining pool.
    Manual,
}

/// Answer when the operator picked nothing from a non-empty pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptySelection {
    /// Each remaining terminal becomes its own group.
    Singletons,
    /// Abandon the whole partition.
    Abort,
}

/// Answer after a group was formed and terminals remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterGroup {
    Continue,
    /// Remaining terminals become singleton groups.
    Finish,
}

/// Decisions the partitioner needs from an operator.
pub trait GroupingOperator {
    fn choose_strategy(
        &mut self,
        specs: &[TerminalSpec],
    ) -> Result<Prompt<GroupingStrategy>, LayoutError>;

    /// Indices into `pool`, in pick order. A cancelled pick counts as an
    /// empty selection.
    fn pick_group(
        &mut self,
        pool: &[TerminalSpec],
        formed: &[TerminalGroup],
    ) -> Result<Prompt<Vec<usize>>, LayoutError>;

    /// Cancelled counts as [`EmptySelection::Abort`].
    fn on_empty_selection(&mut self, remaining: usize)
    -> Result<Prompt<EmptySelection>, LayoutError>;

    /// Cancelled counts as [`AfterGroup::Finish`].
    fn after_group(
        &mut self,
        group: &TerminalGroup,
        remaining: usize,
    ) -> Result<Prompt<AfterGroup>, LayoutError>;
}

/// Partition `specs` into groups with sequential ids from 0.
///
/// - no specs: empty result, no prompt
/// - one spec: a single group, no prompt
/// - otherwise the operator picks a strategy
///
/// `Prompt::Cancelled` means the enclosing operation must be abandoned; it
/// is distinct from an empty `Prompt::Value`.
pub fn partition<O: GroupingOperator + ?Sized>(
    specs: Vec<TerminalSpec>,
    op: &mut O,
) -> Result<Prompt<Vec<TerminalGroup>>, LayoutError> {
    if specs.len() <= 1 {
        return Ok(Prompt::Value(all_together(specs)));
    }

    let strategy = match op.choose_strategy(&specs)? {
        Prompt::Value(strategy) => strategy,
        Prompt::Cancelled => return Ok(Prompt::Cancelled),
    };
    tracing::debug!(?strategy, terminals = specs.len(), "partitioning terminals");

    let groups = match strategy {
        GroupingStrategy::AllSeparate => Prompt::Value(all_separate(specs)),
        GroupingStrategy::AllTogether => Prompt::Value(all_together(specs)),
        GroupingStrategy::Manual => manual(specs, op)?,
    };
    if let Prompt::Value(groups) = &groups {
        for group in groups {
            tracing::debug!(id = group.id, terminals = %group.label(), "group formed");
        }
    }
    Ok(groups)
}

pub fn all_separate(specs: Vec<TerminalSpec>) -> Vec<TerminalGroup> {
    specs
        .into_iter()
        .enumerate()
        .map(|(idx, spec)| TerminalGroup::new(idx as u32, vec![spec]))
        .collect()
}

pub fn all_together(specs: Vec<TerminalSpec>) -> Vec<TerminalGroup> {
    if specs.is_empty() {
        return Vec::new();
    }
    vec![TerminalGroup::new(0, specs)]
}

fn manual<O: GroupingOperator + ?Sized>(
    specs: Vec<TerminalSpec>,
    op: &mut O,
) -> Result<Prompt<Vec<TerminalGroup>>, LayoutError> {
    let mut pool = specs;
    let mut groups: Vec<TerminalGroup> = Vec::new();

    while !pool.is_empty() {
        let picked = match op.pick_group(&pool, &groups)? {
            Prompt::Value(indices) => take_selected(&mut pool, &indices),
            Prompt::Cancelled => Vec::new(),
        };

        if picked.is_empty() {
            match op.on_empty_selection(pool.len())? {
                Prompt::Value(EmptySelection::Singletons) => {
                    drain_singletons(&mut groups, &mut pool);
                    break;
                }
                Prompt::Value(EmptySelection::Abort) | Prompt::Cancelled => {
                    return Ok(Prompt::Cancelled);
                }
            }
        }

        let id = groups.len() as u32;
        groups.push(TerminalGroup::new(id, picked));

        if pool.is_empty() {
            break;
        }
        let formed = &groups[groups.len() - 1];
        match op.after_group(formed, pool.len())? {
            Prompt::Value(AfterGroup::Continue) => {}
            Prompt::Value(AfterGroup::Finish) | Prompt::Cancelled => {
                drain_singletons(&mut groups, &mut pool);
                break;
            }
        }
    }

    Ok(Prompt::Value(groups))
}

/// Move the selected pool entries out, in selection order. Entries are
/// identified by position, never by content, so identical specs stay
/// distinct. Duplicate and out-of-range indices are ignored.
fn take_selected(pool: &mut Vec<TerminalSpec>, indices: &[usize]) -> Vec<TerminalSpec> {
    let mut slots: Vec<Option<TerminalSpec>> = std::mem::take(pool).into_iter().map(Some).collect();
    let picked: Vec<TerminalSpec> = indices
        .iter()
        .filter_map(|&idx| slots.get_mut(idx).and_then(Option::take))
        .collect();
    *pool = slots.into_iter().flatten().collect();
    picked
}

fn drain_singletons(groups: &mut Vec<TerminalGroup>, pool: &mut Vec<TerminalSpec>) {
    for spec in pool.drain(..) {
        let id = groups.len() as u32;
        groups.push(TerminalGroup::new(id, vec![spec]));
    }
}

// ─── Prompt-driven operator ───────────────────────────────────────

/// Drives the partitioner through a [`Prompter`].
pub struct PromptGrouping<'a, P: ?Sized> {
    prompter: &'a mut P,
}

impl<'a, P: Prompter + ?Sized> PromptGrouping<'a, P> {
    pub fn new(prompter: &'a mut P) -> Self {
        Self { prompter }
    }
}

impl<P: Prompter + ?Sized> GroupingOperator for PromptGrouping<'_, P> {
    fn choose_strategy(
        &mut self,
        specs: &[TerminalSpec],
    ) -> Result<Prompt<GroupingStrategy>, LayoutError> {
        let separate: Vec<String> = specs.iter().map(|s| format!("[{}]", s.label())).collect();
        let together: Vec<String> = specs.iter().map(TerminalSpec::label).collect();
        let items = vec![
            format!("Each terminal separate   {}", separate.join(" ")),
            format!("All split side by side   [{}]", together.join(" | ")),
            "Arrange splits manually".to_string(),
        ];
        let title = format!("How should {} terminals be split?", specs.len());
        Ok(self.prompter.choose(&title, &items)?.map(|idx| match idx {
            0 => GroupingStrategy::AllSeparate,
            1 => GroupingStrategy::AllTogether,
            _ => GroupingStrategy::Manual,
        }))
    }

    fn pick_group(
        &mut self,
        pool: &[TerminalSpec],
        formed: &[TerminalGroup],
    ) -> Result<Prompt<Vec<usize>>, LayoutError> {
        let items: Vec<String> = pool
            .iter()
            .map(|spec| match &spec.cwd {
                Some(cwd) => format!("{}  ({cwd})", spec.label()),
                None => spec.label(),
            })
            .collect();
        let mut title = format!(
            "Group {}: pick terminals to place side by side",
            formed.len() + 1
        );
        if !formed.is_empty() {
            title.push_str(&format!(" ({} created)", groups_label(formed.len())));
        }
        self.prompter.multi_select(&title, &items)
    }

    fn on_empty_selection(
        &mut self,
        remaining: usize,
    ) -> Result<Prompt<EmptySelection>, LayoutError> {
        let items = vec![
            "Give each remaining terminal its own group".to_string(),
            "Cancel".to_string(),
        ];
        let title = format!("{remaining} terminal(s) not grouped yet");
        Ok(self.prompter.choose(&title, &items)?.map(|idx| {
            if idx == 0 {
                EmptySelection::Singletons
            } else {
                EmptySelection::Abort
            }
        }))
    }

    fn after_group(
        &mut self,
        group: &TerminalGroup,
        remaining: usize,
    ) -> Result<Prompt<AfterGroup>, LayoutError> {
        let items = vec![
            "Add another group".to_string(),
            "Finish (remaining terminals get their own groups)".to_string(),
        ];
        let title = format!(
            "Group {} created with {} terminal(s), {remaining} remaining",
            group.id + 1,
            group.terminals.len()
        );
        Ok(self.prompter.choose(&title, &items)?.map(|idx| {
            if idx == 0 {
                AfterGroup::Continue
            } else {
                AfterGroup::Finish
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::prompt::InputRequest;

    fn spec(name: &str) -> TerminalSpec {
        TerminalSpec::new(name).expect("valid")
    }

    fn specs(names: &[&str]) -> Vec<TerminalSpec> {
        names.iter().map(|n| spec(n)).collect()
    }

    fn names(groups: &[TerminalGroup]) -> Vec<(u32, Vec<String>)> {
        groups
            .iter()
            .map(|g| (g.id, g.terminals.iter().map(|t| t.name.clone()).collect()))
            .collect()
    }

    /// Operator answering from fixed queues; panics on unexpected prompts.
    #[derive(Default)]
    struct Scripted {
        strategy: VecDeque<Prompt<GroupingStrategy>>,
        picks: VecDeque<Prompt<Vec<usize>>>,
        empty: VecDeque<Prompt<EmptySelection>>,
        after: VecDeque<Prompt<AfterGroup>>,
        strategy_prompts: usize,
    }

    impl GroupingOperator for Scripted {
        fn choose_strategy(
            &mut self,
            _specs: &[TerminalSpec],
        ) -> Result<Prompt<GroupingStrategy>, LayoutError> {
            self.strategy_prompts += 1;
            Ok(self.strategy.pop_front().expect("unexpected strategy prompt"))
        }

        fn pick_group(
            &mut self,
            _pool: &[TerminalSpec],
            _formed: &[TerminalGroup],
        ) -> Result<Prompt<Vec<usize>>, LayoutError> {
            Ok(self.picks.pop_front().expect("unexpected pick prompt"))
        }

        fn on_empty_selection(
            &mut self,
            _remaining: usize,
        ) -> Result<Prompt<EmptySelection>, LayoutError> {
            Ok(self.empty.pop_front().expect("unexpected empty-selection prompt"))
        }

        fn after_group(
            &mut self,
            _group: &TerminalGroup,
            _remaining: usize,
        ) -> Result<Prompt<AfterGroup>, LayoutError> {
            Ok(self.after.pop_front().expect("unexpected after-group prompt"))
        }
    }

    fn manual_op() -> Scripted {
        Scripted {
            strategy: [Prompt::Value(GroupingStrategy::Manual)].into(),
            ..Scripted::default()
        }
    }

    #[test]
    fn empty_input_no_prompt() {
        let mut op = Scripted::default();
        let groups = partition(Vec::new(), &mut op).expect("ok");
        assert_eq!(groups, Prompt::Value(Vec::new()));
        assert_eq!(op.strategy_prompts, 0);
    }

    #[test]
    fn singleton_short_circuits() {
        let mut op = Scripted::default();
        let groups = partition(specs(&["x"]), &mut op).expect("ok");
        assert_eq!(op.strategy_prompts, 0);
        assert_eq!(groups, Prompt::Value(vec![TerminalGroup::new(0, specs(&["x"]))]));
    }

    #[test]
    fn all_separate_strategy() {
        let mut op = Scripted {
            strategy: [Prompt::Value(GroupingStrategy::AllSeparate)].into(),
            ..Scripted::default()
        };
        let groups = partition(specs(&["A", "B", "C"]), &mut op)
            .expect("ok")
            .value()
            .expect("value");
        assert_eq!(
            names(&groups),
            [
                (0, vec!["A".to_string()]),
                (1, vec!["B".to_string()]),
                (2, vec!["C".to_string()]),
            ]
        );
    }

    #[test]
    fn all_together_strategy() {
        let mut op = Scripted {
            strategy: [Prompt::Value(GroupingStrategy::AllTogether)].into(),
            ..Scripted::default()
        };
        let groups = partition(specs(&["A", "B", "C"]), &mut op)
            .expect("ok")
            .value()
            .expect("value");
        assert_eq!(groups, vec![TerminalGroup::new(0, specs(&["A", "B", "C"]))]);
    }

    #[test]
    fn strategy_cancel_is_cancelled() {
        let mut op = Scripted {
            strategy: [Prompt::Cancelled].into(),
            ..Scripted::default()
        };
        assert!(partition(specs(&["A", "B"]), &mut op).expect("ok").is_cancelled());
    }

    #[test]
    fn manual_with_remainder() {
        let mut op = manual_op();
        op.picks.push_back(Prompt::Value(vec![1, 3]));
        op.after.push_back(Prompt::Value(AfterGroup::Finish));
        let groups = partition(specs(&["A", "B", "C", "D"]), &mut op)
            .expect("ok")
            .value()
            .expect("value");
        assert_eq!(
            names(&groups),
            [
                (0, vec!["B".to_string(), "D".to_string()]),
                (1, vec!["A".to_string()]),
                (2, vec!["C".to_string()]),
            ]
        );
    }

    #[test]
    fn manual_keeps_selection_order() {
        let mut op = manual_op();
        op.picks.push_back(Prompt::Value(vec![2, 0]));
        op.after.push_back(Prompt::Value(AfterGroup::Continue));
        op.picks.push_back(Prompt::Value(vec![0]));
        let groups = partition(specs(&["A", "B", "C"]), &mut op)
            .expect("ok")
            .value()
            .expect("value");
        assert_eq!(
            names(&groups),
            [
                (0, vec!["C".to_string(), "A".to_string()]),
                (1, vec!["B".to_string()]),
            ]
        );
        assert!(op.after.is_empty(), "no continue prompt once pool drains");
    }

    #[test]
    fn manual_abort_is_cancelled_not_empty() {
        let mut op = manual_op();
        op.picks.push_back(Prompt::Value(Vec::new()));
        op.empty.push_back(Prompt::Value(EmptySelection::Abort));
        let result = partition(specs(&["A", "B"]), &mut op).expect("ok");
        assert_eq!(result, Prompt::Cancelled);
        assert_ne!(result, Prompt::Value(Vec::new()));
    }

    #[test]
    fn manual_dismissed_empty_prompt_aborts() {
        let mut op = manual_op();
        op.picks.push_back(Prompt::Cancelled);
        op.empty.push_back(Prompt::Cancelled);
        assert!(partition(specs(&["A", "B"]), &mut op).expect("ok").is_cancelled());
    }

    #[test]
    fn manual_empty_selection_singletons() {
        let mut op = manual_op();
        op.picks.push_back(Prompt::Value(vec![0, 1]));
        op.after.push_back(Prompt::Value(AfterGroup::Continue));
        op.picks.push_back(Prompt::Value(Vec::new()));
        op.empty.push_back(Prompt::Value(EmptySelection::Singletons));
        let groups = partition(specs(&["A", "B", "C", "D"]), &mut op)
            .expect("ok")
            .value()
            .expect("value");
        let ids: Vec<u32> = groups.iter().map(|g| g.id).collect();
        assert_eq!(ids, [0, 1, 2]);
        assert_eq!(groups[1].terminals, specs(&["C"]));
        assert_eq!(groups[2].terminals, specs(&["D"]));
    }

    #[test]
    fn manual_dismissed_continue_prompt_finishes() {
        let mut op = manual_op();
        op.picks.push_back(Prompt::Value(vec![0]));
        op.after.push_back(Prompt::Cancelled);
        let groups = partition(specs(&["A", "B", "C"]), &mut op)
            .expect("ok")
            .value()
            .expect("value");
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn identical_specs_are_distinguished_by_position() {
        let mut op = manual_op();
        op.picks.push_back(Prompt::Value(vec![1]));
        op.after.push_back(Prompt::Value(AfterGroup::Finish));
        let twin = spec("shell").with_cwd("/a");
        let other = spec("shell").with_cwd("/b");
        let input = vec![twin.clone(), twin.clone(), other.clone()];
        let groups = partition(input, &mut op).expect("ok").value().expect("value");
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].terminals, vec![twin.clone()]);
        assert_eq!(groups[1].terminals, vec![twin]);
        assert_eq!(groups[2].terminals, vec![other]);
    }

    #[test]
    fn take_selected_ignores_duplicates_and_out_of_range() {
        let mut pool = specs(&["A", "B", "C"]);
        let picked = take_selected(&mut pool, &[2, 2, 9, 0]);
        assert_eq!(picked, specs(&["C", "A"]));
        assert_eq!(pool, specs(&["B"]));
    }

    // ── PromptGrouping ──────────────────────────────────────────

    #[derive(Default)]
    struct ScriptedPrompter {
        selects: VecDeque<Prompt<usize>>,
        multis: VecDeque<Prompt<Vec<usize>>>,
        titles: Vec<String>,
    }

    impl Prompter for ScriptedPrompter {
        fn input(&mut self, _request: &InputRequest<'_>) -> Result<Prompt<String>, LayoutError> {
            panic!("unexpected input prompt")
        }

        fn select(&mut self, title: &str, _items: &[String]) -> Result<Prompt<usize>, LayoutError> {
            self.titles.push(title.to_string());
            Ok(self.selects.pop_front().expect("unexpected select"))
        }

        fn multi_select(
            &mut self,
            title: &str,
            _items: &[String],
        ) -> Result<Prompt<Vec<usize>>, LayoutError> {
            self.titles.push(title.to_string());
            Ok(self.multis.pop_front().expect("unexpected multi_select"))
        }

        fn confirm(&mut self, _question: &str) -> Result<Prompt<bool>, LayoutError> {
            panic!("unexpected confirm prompt")
        }

        fn notify(&mut self, _message: &str) {}
    }

    #[test]
    fn prompt_grouping_maps_answers() {
        let mut prompter = ScriptedPrompter {
            // strategy: manual; after first group: finish
            selects: [Prompt::Value(2), Prompt::Value(1)].into(),
            multis: [Prompt::Value(vec![1, 3])].into(),
            ..ScriptedPrompter::default()
        };
        let mut op = PromptGrouping::new(&mut prompter);
        let groups = partition(specs(&["A", "B", "C", "D"]), &mut op)
            .expect("ok")
            .value()
            .expect("value");
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].terminals, specs(&["B", "D"]));
        assert!(prompter.titles[1].starts_with("Group 1:"));
        assert!(prompter.titles[2].contains("2 remaining"));
    }

    #[test]
    fn prompt_grouping_cancel_option() {
        let mut prompter = ScriptedPrompter {
            selects: [Prompt::Value(2), Prompt::Value(1)].into(),
            multis: [Prompt::Value(Vec::new())].into(),
            ..ScriptedPrompter::default()
        };
        let mut op = PromptGrouping::new(&mut prompter);
        assert!(partition(specs(&["A", "B"]), &mut op).expect("ok").is_cancelled());
    }

    #[test]
    fn prompt_grouping_out_of_range_strategy_cancels() {
        let mut prompter = ScriptedPrompter {
            selects: [Prompt::Value(3)].into(),
            ..ScriptedPrompter::default()
        };
        let mut op = PromptGrouping::new(&mut prompter);
        assert!(partition(specs(&["A", "B"]), &mut op).expect("ok").is_cancelled());
        assert_eq!(prompter.titles.len(), 1);
    }
}
