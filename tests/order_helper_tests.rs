//! Order helper: filter runs, manual row moves and order assignment.

mod common;

use common::*;
use lorebook_drawer::app::Event;
use lorebook_drawer::domain::{BookData, Uid};
use lorebook_drawer::host::WorldInfoHost;
use lorebook_drawer::render::class;
use lorebook_drawer::view::View;

fn books() -> Vec<(&'static str, BookData)> {
    vec![
        (
            "Lore",
            book([entry(1, "Keep one", Some(1), Some(1)), entry(2, "Keep two", Some(2), Some(2))]),
        ),
        (
            "Atlas",
            book([entry(3, "Drop", Some(7), Some(3)), entry(4, "Keep four", Some(4), Some(4))]),
        ),
    ]
}

/// Runtime with both books active and the order helper open.
fn opened() -> TestRuntime {
    let mut rt = runtime(books());
    activate(&mut rt, "Lore");
    activate(&mut rt, "Atlas");
    let toggle = rt.drawer.layout.order_toggle;
    click(&mut rt, toggle);
    rt
}

fn open_filter(rt: &mut TestRuntime) {
    let toggle = helper(rt).controls().filter_toggle;
    click(rt, toggle);
    assert!(helper(rt).filter_open());
}

fn type_filter(rt: &mut TestRuntime, script: &str) {
    let input = helper(rt).controls().filter_input;
    type_value(rt, input, script);
}

fn filtered(rt: &TestRuntime) -> Vec<bool> {
    (0..helper(rt).rows().len())
        .map(|i| helper(rt).is_filtered(&rt.drawer.view, i))
        .collect()
}

#[test]
fn rows_follow_prompt_order_across_active_books() {
    let rt = opened();
    let rows: Vec<(String, Uid)> = helper(&rt).rows().iter().map(|r| (r.book.clone(), r.uid.clone())).collect();
    assert_eq!(
        rows,
        vec![
            ("Lore".to_string(), Uid::from(1)),
            ("Lore".to_string(), Uid::from(2)),
            ("Atlas".to_string(), Uid::from(3)),
            ("Atlas".to_string(), Uid::from(4)),
        ]
    );
}

#[test]
fn apply_skips_filtered_rows_and_saves_each_book_once() {
    let mut rt = opened();
    open_filter(&mut rt);
    type_filter(&mut rt, "has:Keep");
    rt.advance(1000).unwrap();
    assert_eq!(filtered(&rt), vec![false, false, true, false]);

    rt.drawer.host.clear_saves();
    let apply = helper(&rt).controls().apply;
    click(&mut rt, apply);

    assert_eq!(cached(&rt, "Lore", 1).order, Some(100));
    assert_eq!(cached(&rt, "Lore", 2).order, Some(110));
    assert_eq!(cached(&rt, "Atlas", 3).order, Some(7));
    assert_eq!(cached(&rt, "Atlas", 4).order, Some(120));
    assert_eq!(rt.drawer.host.save_count("Lore"), 1);
    assert_eq!(rt.drawer.host.save_count("Atlas"), 1);

    let saved = rt.drawer.host.load_world_info("Atlas").unwrap();
    assert_eq!(saved.entries[&Uid::from(4)].order, Some(120));
    let order_input = helper(&rt).rows()[3].handles.order;
    assert_eq!(rt.drawer.view.value(order_input).as_deref(), Some("120"));
}

#[test]
fn filter_edits_are_debounced_into_one_compile() {
    let mut rt = opened();
    open_filter(&mut rt);

    type_filter(&mut rt, "has:Ke");
    rt.advance(200).unwrap();
    type_filter(&mut rt, "has:Keep");
    rt.advance(999).unwrap();
    assert!(rt.scripts().compiled.is_empty());

    rt.advance(1).unwrap();
    assert_eq!(rt.scripts().compiled, vec!["has:Keep".to_string()]);
    assert_eq!(rt.scripts().evaluations, 4);
}

#[test]
fn filter_does_not_run_while_its_panel_is_hidden() {
    let mut rt = opened();
    type_filter(&mut rt, "has:Keep");
    rt.settle().unwrap();

    assert!(rt.scripts().compiled.is_empty());
    assert_eq!(filtered(&rt), vec![false; 4]);
}

#[test]
fn failed_compile_keeps_the_previous_classification() {
    let mut rt = opened();
    open_filter(&mut rt);
    type_filter(&mut rt, "has:Keep");
    rt.settle().unwrap();

    type_filter(&mut rt, "broken(");
    rt.settle().unwrap();

    assert_eq!(rt.scripts().compiled.len(), 2);
    assert_eq!(filtered(&rt), vec![false, false, true, false]);
}

#[test]
fn results_of_a_stale_filter_run_are_discarded() {
    let mut rt = opened();
    open_filter(&mut rt);
    rt.defer_work = true;

    type_filter(&mut rt, "has:one");
    rt.settle().unwrap();
    type_filter(&mut rt, "has:two");
    rt.settle().unwrap();
    assert_eq!(rt.deferred().len(), 2);

    rt.defer_work = false;
    rt.complete_deferred(1).unwrap();
    assert_eq!(filtered(&rt), vec![true, false, true, true]);

    rt.complete_deferred(0).unwrap();
    assert_eq!(rt.scripts().compiled, vec!["has:two".to_string(), "has:one".to_string()]);
    assert_eq!(filtered(&rt), vec![true, false, true, true]);
}

#[test]
fn evaluation_from_a_closed_helper_is_discarded() {
    let mut rt = opened();
    open_filter(&mut rt);
    rt.defer_work = true;
    type_filter(&mut rt, "has:one");
    rt.settle().unwrap();
    rt.complete_deferred(0).unwrap();
    assert_eq!(rt.deferred().len(), 1, "first evaluation of the old run in flight");

    let toggle = rt.drawer.layout.order_toggle;
    click(&mut rt, toggle);
    click(&mut rt, toggle);
    open_filter(&mut rt);
    type_filter(&mut rt, "has:two");
    rt.settle().unwrap();
    rt.complete_deferred(1).unwrap();
    assert_eq!(filtered(&rt), vec![true; 4]);

    rt.complete_deferred(0).unwrap();
    assert_eq!(filtered(&rt), vec![true; 4]);

    while !rt.deferred().is_empty() {
        rt.complete_deferred(0).unwrap();
    }
    assert_eq!(rt.scripts().compiled, vec!["has:one".to_string(), "has:two".to_string()]);
    assert_eq!(filtered(&rt), vec![true, false, true, true]);
}

#[test]
fn debounce_timer_from_a_replaced_helper_is_ignored() {
    let mut rt = opened();
    let layout = rt.drawer.layout;
    open_filter(&mut rt);
    type_filter(&mut rt, "has:one");
    rt.advance(500).unwrap();

    click(&mut rt, layout.activation_toggle);
    click(&mut rt, layout.order_toggle);
    open_filter(&mut rt);
    type_filter(&mut rt, "has:two");

    rt.advance(600).unwrap();
    assert!(rt.scripts().compiled.is_empty());

    rt.advance(400).unwrap();
    assert_eq!(rt.scripts().compiled, vec!["has:two".to_string()]);
    assert_eq!(filtered(&rt), vec![true, false, true, true]);
}

#[test]
fn moved_rows_are_numbered_in_their_new_order() {
    let mut rt = opened();
    rt.dispatch(Event::MoveOrderRow { from: 3, to: 0 }).unwrap();
    assert_eq!(helper(&rt).visual_order(&rt.drawer.view).unwrap(), vec![3, 0, 1, 2]);

    let apply = helper(&rt).controls().apply;
    click(&mut rt, apply);

    assert_eq!(cached(&rt, "Atlas", 4).order, Some(100));
    assert_eq!(cached(&rt, "Lore", 1).order, Some(110));
    assert_eq!(cached(&rt, "Lore", 2).order, Some(120));
    assert_eq!(cached(&rt, "Atlas", 3).order, Some(130));
}

#[test]
fn upward_direction_numbers_from_the_bottom() {
    let mut rt = opened();
    let controls = *helper(&rt).controls();
    type_value(&mut rt, controls.start, "10");
    type_value(&mut rt, controls.step, "5");
    type_value(&mut rt, controls.direction, "up");
    click(&mut rt, controls.apply);

    assert_eq!(cached(&rt, "Atlas", 4).order, Some(10));
    assert_eq!(cached(&rt, "Atlas", 3).order, Some(15));
    assert_eq!(cached(&rt, "Lore", 2).order, Some(20));
    assert_eq!(cached(&rt, "Lore", 1).order, Some(25));
    assert_eq!(helper(&rt).prefs().start, 10);
}

#[test]
fn row_order_edit_persists_and_resorts_the_list() {
    let mut rt = opened();
    let select = rt.drawer.layout.sort_select;
    type_value(&mut rt, select, "order-desc");
    assert_eq!(row_order(&rt, "Lore"), uids(&[2, 1]));

    let index = helper(&rt).row_index("Lore", &Uid::from(1)).unwrap();
    let input = helper(&rt).rows()[index].handles.order;
    type_value(&mut rt, input, "50");

    assert_eq!(cached(&rt, "Lore", 1).order, Some(50));
    assert_eq!(row_order(&rt, "Lore"), uids(&[1, 2]));
    assert_eq!(rt.drawer.host.load_world_info("Lore").unwrap().entries[&Uid::from(1)].order, Some(50));
}

#[test]
fn list_toggle_is_mirrored_into_the_helper_row() {
    let mut rt = opened();
    let toggle = row(&rt, "Lore", 2).enabled;
    click(&mut rt, toggle);

    assert!(cached(&rt, "Lore", 2).disable);
    let index = helper(&rt).row_index("Lore", &Uid::from(2)).unwrap();
    let mirrored = helper(&rt).rows()[index].handles.enabled;
    assert!(rt.drawer.view.has_class(mirrored, class::TOGGLE_OFF));
}
