//! Property invariants for change detection and crack selection.

use proptest::prelude::*;
use tilegrid_layout::{
    Breakpoint, DragDirection, GridRect, MobileLayoutMode, StaticRegistry, Widget,
    check_for_actual_changes, derive_mobile_layout, select_crack_by_direction,
};

fn arb_widgets() -> impl Strategy<Value = Vec<Widget>> {
    prop::collection::vec(
        (0u32..12, 0u32..16, 1u32..=6, 1u32..5, prop::option::of((0u32..2, 0u32..30))),
        0..12,
    )
    .prop_map(|cells| {
        cells
            .into_iter()
            .enumerate()
            .map(|(i, (x, y, w, h, mobile))| {
                let widget = Widget::new(format!("w{i}"), "card", GridRect::new(x, y, w, h));
                match mobile {
                    Some((mx, my)) => widget.with_mobile_layout(GridRect::new(mx, my, 2, h)),
                    None => widget,
                }
            })
            .collect()
    })
}

fn arb_breakpoint() -> impl Strategy<Value = Breakpoint> {
    prop_oneof![Just(Breakpoint::Desktop), Just(Breakpoint::Mobile)]
}

fn arb_mode() -> impl Strategy<Value = MobileLayoutMode> {
    prop_oneof![Just(MobileLayoutMode::Linked), Just(MobileLayoutMode::Independent)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn self_comparison_reports_no_changes(
        widgets in arb_widgets(),
        breakpoint in arb_breakpoint(),
        mode in arb_mode(),
    ) {
        let report = check_for_actual_changes(
            &widgets, breakpoint, &widgets, &widgets, mode, false, &widgets,
        );
        prop_assert!(!report.has_changes);
        prop_assert!(!report.should_unlink);
    }

    #[test]
    fn unlink_only_for_linked_mobile_edits(
        before in arb_widgets(),
        after in arb_widgets(),
        breakpoint in arb_breakpoint(),
        mode in arb_mode(),
        pending in any::<bool>(),
    ) {
        let report = check_for_actual_changes(
            &after, breakpoint, &before, &before, mode, pending, &before,
        );
        if report.should_unlink {
            prop_assert_eq!(breakpoint, Breakpoint::Mobile);
            prop_assert_eq!(mode, MobileLayoutMode::Linked);
            prop_assert!(report.has_changes);
        }
    }

    #[test]
    fn derived_mobile_matches_desktop_baseline(widgets in arb_widgets()) {
        let plain: Vec<Widget> = widgets
            .into_iter()
            .map(|mut w| {
                w.mobile_layout = None;
                w
            })
            .collect();
        let derived = derive_mobile_layout(&plain, &StaticRegistry::new());
        let report = check_for_actual_changes(
            &derived,
            Breakpoint::Mobile,
            &plain,
            &[],
            MobileLayoutMode::Linked,
            false,
            &plain,
        );
        prop_assert!(!report.has_changes);
    }

    #[test]
    fn directional_selection_respects_travel(
        mut cracks in prop::collection::vec(0u32..40, 1..10),
        cursor in 0.0f64..40.0,
    ) {
        cracks.push(0);
        cracks.sort_unstable();
        cracks.dedup();
        let down = select_crack_by_direction(&cracks, cursor, DragDirection::Down, 0.0);
        let up = select_crack_by_direction(&cracks, cursor, DragDirection::Up, 0.0);
        prop_assert!(down.is_some());
        prop_assert!(up.is_some());
        if let Some(d) = down && cracks.iter().any(|c| f64::from(*c) >= cursor) {
            prop_assert!(f64::from(d) >= cursor);
        }
        if let Some(u) = up {
            // 0 is always a crack, so something at or above the cursor exists.
            prop_assert!(f64::from(u) <= cursor);
        }
    }
}

#[test]
fn crack_selection_example() {
    let cracks = [0, 2, 5, 8];
    assert_eq!(
        select_crack_by_direction(&cracks, 3.0, DragDirection::Down, 0.0),
        Some(5)
    );
    assert_eq!(
        select_crack_by_direction(&cracks, 3.0, DragDirection::Up, 0.0),
        Some(2)
    );
}
