#![forbid(unsafe_code)]

//! Property tests for the dual-stack history against a plain `Vec` model.
//!
//! Run:
//!   cargo test -p tilegrid-runtime --test history_props

use proptest::prelude::*;
use tilegrid_runtime::{GridRect, HistoryConfig, HistorySnapshot, HistoryStack, MultiStackHistory, Widget};

#[derive(Debug, Clone, Copy)]
enum Op {
    Edit(HistoryStack),
    Undo(HistoryStack),
    Redo(HistoryStack),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let stack = prop_oneof![Just(HistoryStack::Desktop), Just(HistoryStack::Mobile)];
    (0u8..3, stack).prop_map(|(kind, stack)| match kind {
        0 => Op::Edit(stack),
        1 => Op::Undo(stack),
        _ => Op::Redo(stack),
    })
}

/// A one-widget arrangement whose row encodes a state label.
fn snapshot(label: u32) -> HistorySnapshot {
    HistorySnapshot::new(vec![Widget::new("w", "card", GridRect::new(0, label, 4, 2))], None)
}

fn label(snapshot: &HistorySnapshot) -> u32 {
    snapshot.widgets[0].layout.y
}

#[derive(Debug, Default)]
struct ModelStack {
    current: u32,
    undo: Vec<u32>,
    redo: Vec<u32>,
}

fn index(stack: HistoryStack) -> usize {
    match stack {
        HistoryStack::Desktop => 0,
        HistoryStack::Mobile => 1,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn history_matches_vec_model(
        depth in 1usize..6,
        ops in prop::collection::vec(op_strategy(), 0..60),
    ) {
        let mut history = MultiStackHistory::new(HistoryConfig::new(depth));
        let mut model = [ModelStack::default(), ModelStack::default()];
        let mut next_label = 1u32;

        for op in ops {
            match op {
                Op::Edit(stack) => {
                    let m = &mut model[index(stack)];
                    prop_assert!(history.push(stack, snapshot(m.current)));
                    m.undo.push(m.current);
                    if m.undo.len() > depth {
                        m.undo.remove(0);
                    }
                    m.redo.clear();
                    m.current = next_label;
                    next_label += 1;
                }
                Op::Undo(stack) => {
                    let m = &mut model[index(stack)];
                    let restored = history.undo(stack, snapshot(m.current));
                    match m.undo.pop() {
                        Some(expected) => {
                            prop_assert_eq!(restored.as_ref().map(label), Some(expected));
                            m.redo.push(m.current);
                            m.current = expected;
                        }
                        None => prop_assert!(restored.is_none()),
                    }
                }
                Op::Redo(stack) => {
                    let m = &mut model[index(stack)];
                    let restored = history.redo(stack, snapshot(m.current));
                    match m.redo.pop() {
                        Some(expected) => {
                            prop_assert_eq!(restored.as_ref().map(label), Some(expected));
                            m.undo.push(m.current);
                            if m.undo.len() > depth {
                                m.undo.remove(0);
                            }
                            m.current = expected;
                        }
                        None => prop_assert!(restored.is_none()),
                    }
                }
            }

            for stack in HistoryStack::ALL {
                let m = &model[index(stack)];
                prop_assert_eq!(history.undo_depth(stack), m.undo.len());
                prop_assert_eq!(history.redo_depth(stack), m.redo.len());
                prop_assert!(history.undo_depth(stack) <= depth);
            }
        }
    }

    #[test]
    fn undo_all_then_redo_all_round_trips(edits in 1u32..20) {
        let mut history = MultiStackHistory::new(HistoryConfig::unlimited());
        for n in 0..edits {
            history.push(HistoryStack::Mobile, snapshot(n));
        }

        let mut current = snapshot(edits);
        let mut undone = Vec::new();
        while let Some(previous) = history.undo(HistoryStack::Mobile, current.clone()) {
            undone.push(label(&previous));
            current = previous;
        }
        prop_assert_eq!(undone, (0..edits).rev().collect::<Vec<_>>());

        let mut redone = Vec::new();
        while let Some(next) = history.redo(HistoryStack::Mobile, current.clone()) {
            redone.push(label(&next));
            current = next;
        }
        prop_assert_eq!(redone, (1..=edits).collect::<Vec<_>>());
        prop_assert_eq!(history.undo_depth(HistoryStack::Desktop), 0);
    }

    #[test]
    fn captures_are_suppressed_while_applying(edits in 1u32..10) {
        let mut history = MultiStackHistory::new(HistoryConfig::default());
        history.begin_apply();
        for n in 0..edits {
            prop_assert!(!history.push(HistoryStack::Desktop, snapshot(n)));
        }
        history.end_apply();
        prop_assert!(history.is_empty());
        prop_assert!(history.push(HistoryStack::Desktop, snapshot(0)));
    }
}
