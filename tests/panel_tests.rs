//! Panel slot: editor builds, panel exclusivity, jumping and focus mode.

mod common;

use common::*;
use lorebook_drawer::app::{Action, Event};
use lorebook_drawer::domain::{BookData, EntryField, Uid};
use lorebook_drawer::editor::ActivePanel;
use lorebook_drawer::host::WorldInfoHost;
use lorebook_drawer::render::class;
use lorebook_drawer::view::View;

fn lore() -> Vec<(&'static str, BookData)> {
    vec![(
        "Lore",
        book([entry(1, "Intro", Some(10), Some(4)), entry(2, "Map", Some(5), Some(4))]),
    )]
}

fn token(rt: &TestRuntime) -> u64 {
    rt.drawer.editor.editor().unwrap().token
}

#[test]
fn panels_replace_each_other() {
    let mut rt = runtime(lore());
    activate(&mut rt, "Lore");
    let layout = rt.drawer.layout;
    let first = row(&rt, "Lore", 1).root;

    click(&mut rt, first);
    assert!(rt.drawer.editor.editor().is_some());
    assert!(rt.drawer.view.has_class(first, class::ACTIVE));

    click(&mut rt, layout.order_toggle);
    assert!(rt.drawer.editor.editor().is_none());
    assert_eq!(helper(&rt).rows().len(), 2);
    assert!(!rt.drawer.view.has_class(first, class::ACTIVE));
    assert!(rt.drawer.view.has_class(layout.order_toggle, class::ACTIVE));

    click(&mut rt, layout.activation_toggle);
    assert!(matches!(rt.drawer.editor.panel(), ActivePanel::GlobalSettings));
    assert!(!rt.drawer.view.has_class(layout.order_toggle, class::ACTIVE));
    assert!(rt.drawer.view.has_class(layout.activation_toggle, class::ACTIVE));

    click(&mut rt, layout.activation_toggle);
    assert!(matches!(rt.drawer.editor.panel(), ActivePanel::None));
    assert!(rt.drawer.view.children(layout.editor).unwrap().is_empty());
}

#[test]
fn order_toggle_closes_an_open_helper() {
    let mut rt = runtime(lore());
    let toggle = rt.drawer.layout.order_toggle;
    click(&mut rt, toggle);
    assert!(rt.drawer.editor.order_helper().is_some());
    assert!(helper(&rt).rows().is_empty(), "no active books");

    click(&mut rt, toggle);
    assert!(rt.drawer.editor.order_helper().is_none());
}

#[test]
fn book_order_helper_lists_an_inactive_book() {
    let mut rt = runtime(lore());
    let root = book_handles(&rt, "Lore").root;
    let button = rt.drawer.view.find_by_attr(root, "data-action", "book-order-helper").unwrap();
    click(&mut rt, button);

    let uids: Vec<Uid> = helper(&rt).rows().iter().map(|r| r.uid.clone()).collect();
    assert_eq!(uids, vec![Uid::from(1), Uid::from(2)]);
}

#[test]
fn only_the_latest_editor_build_is_mounted() {
    let mut rt = runtime(lore());
    rt.defer_work = true;
    open_entry(&mut rt, "Lore", 1);
    open_entry(&mut rt, "Lore", 2);
    assert_eq!(rt.deferred().len(), 2);
    assert!(rt.deferred().iter().all(|a| matches!(a, Action::BuildEditor { .. })));

    rt.complete_deferred(1).unwrap();
    rt.complete_deferred(0).unwrap();

    let slot = rt.drawer.editor.editor().unwrap();
    assert_eq!(slot.uid, Uid::from(2));
    assert_eq!(slot.form.as_ref().unwrap().value(&EntryField::Comment), Some("Map"));
}

#[test]
fn jump_opens_the_entry_and_reuses_a_showing_editor() {
    let mut rt = runtime(lore());
    let toggle = rt.drawer.layout.order_toggle;
    click(&mut rt, toggle);
    assert!(rt.drawer.cache.require("Lore").unwrap().collapsed);

    let jump = Event::JumpToEntry {
        book: "Lore".to_string(),
        uid: Uid::from(2),
    };
    rt.dispatch(jump.clone()).unwrap();

    let target = row(&rt, "Lore", 2).root;
    assert!(rt.drawer.editor.order_helper().is_none());
    assert!(!rt.drawer.cache.require("Lore").unwrap().collapsed);
    assert_eq!(rt.scrolled.last(), Some(&target));
    let before = token(&rt);

    rt.dispatch(jump).unwrap();
    assert_eq!(token(&rt), before);
    assert_eq!(rt.scrolled.len(), 2);
}

#[test]
fn jump_to_an_unknown_entry_fails() {
    let mut rt = runtime(lore());
    let jumped = rt.dispatch(Event::JumpToEntry {
        book: "Lore".to_string(),
        uid: Uid::from(9),
    });
    assert!(jumped.is_err());
    assert_eq!(rt.errors.len(), 1);
}

#[test]
fn showing_the_drawer_rebuilds_the_open_editor() {
    let mut rt = runtime(lore());
    rt.dispatch(Event::DrawerShown).unwrap();
    assert!(rt.drawer.editor.editor().is_none());

    open_entry(&mut rt, "Lore", 1);
    let before = token(&rt);
    rt.dispatch(Event::DrawerShown).unwrap();

    assert!(token(&rt) > before);
    assert!(rt.drawer.editor.editor().unwrap().form.is_some());
}

#[test]
fn editor_input_writes_through_the_host() {
    let mut rt = runtime(lore());
    open_entry(&mut rt, "Lore", 1);
    let before = token(&rt);
    let input = rt.drawer.editor.editor().unwrap().inputs["comment"];

    type_value(&mut rt, input, "Prologue");
    assert_eq!(
        rt.drawer.host.load_world_info("Lore").unwrap().entries[&Uid::from(1)].comment,
        "Prologue"
    );

    rt.settle().unwrap();
    assert_eq!(text(&rt, row(&rt, "Lore", 1).comment), "Prologue");
    assert_eq!(cached(&rt, "Lore", 1).comment, "Prologue");
    assert_eq!(token(&rt), before, "the form already shows the value");
}

#[test]
fn focus_mode_survives_reopening_the_same_entry() {
    let mut rt = runtime(lore());
    let panel = rt.drawer.layout.editor;
    open_entry(&mut rt, "Lore", 1);
    let focus = rt.drawer.view.find_by_attr(panel, "data-action", "editor-focus").unwrap();

    click(&mut rt, focus);
    assert!(rt.drawer.view.has_class(panel, class::FOCUS));

    open_entry(&mut rt, "Lore", 1);
    assert!(rt.drawer.editor.editor().unwrap().focused);
    assert!(rt.drawer.view.has_class(panel, class::FOCUS));

    open_entry(&mut rt, "Lore", 2);
    assert!(!rt.drawer.view.has_class(panel, class::FOCUS));
}
