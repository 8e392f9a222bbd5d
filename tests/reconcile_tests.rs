//! Reconciliation driven through host notifications and the debounce timer.

mod common;

use common::*;
use lorebook_drawer::app::Event;
use lorebook_drawer::domain::{EntryField, Uid};
use lorebook_drawer::host::{HostNotification, WorldInfoHost};
use lorebook_drawer::render::class;
use lorebook_drawer::view::View;

fn lore() -> Vec<(&'static str, lorebook_drawer::domain::BookData)> {
    vec![(
        "Lore",
        book([entry(1, "Intro", Some(10), Some(4)), entry(2, "Map", Some(5), Some(4))]),
    )]
}

#[test]
fn order_sort_keeps_entries_without_order_last() {
    let mut rt = runtime(lore());
    let select = rt.drawer.layout.sort_select;

    type_value(&mut rt, select, "order-asc");
    assert_eq!(row_order(&rt, "Lore"), uids(&[2, 1]));
    type_value(&mut rt, select, "order-desc");
    assert_eq!(row_order(&rt, "Lore"), uids(&[1, 2]));

    let grown = book([
        entry(1, "Intro", Some(10), Some(4)),
        entry(2, "Map", Some(5), Some(4)),
        entry(3, "Appendix", None, Some(4)),
    ]);
    host_update(&mut rt, "Lore", grown);
    rt.settle().unwrap();
    assert_eq!(row_order(&rt, "Lore"), uids(&[1, 2, 3]));

    type_value(&mut rt, select, "order-asc");
    assert_eq!(row_order(&rt, "Lore"), uids(&[2, 1, 3]));
}

#[test]
fn changed_comment_and_removed_entry_refresh_the_open_editor() {
    let mut rt = runtime(lore());
    let first = row(&rt, "Lore", 1);
    let second = row(&rt, "Lore", 2);

    click(&mut rt, first.root);
    let slot = rt.drawer.editor.editor().unwrap();
    assert_eq!(slot.form.as_ref().unwrap().value(&EntryField::Comment), Some("Intro"));
    let token = slot.token;

    host_update(&mut rt, "Lore", book([entry(1, "Foreword", Some(10), Some(4))]));
    rt.settle().unwrap();

    let cached = &rt.drawer.cache.require("Lore").unwrap().entries;
    assert_eq!(cached.keys().cloned().collect::<Vec<_>>(), uids(&[1]));
    assert_eq!(text(&rt, first.comment), "Foreword");
    assert!(rt.drawer.view.contains(first.root));
    assert!(!rt.drawer.view.contains(second.root));

    let slot = rt.drawer.editor.editor().unwrap();
    assert!(slot.token > token);
    assert_eq!(slot.form.as_ref().unwrap().value(&EntryField::Comment), Some("Foreword"));
}

#[test]
fn removing_the_open_entry_closes_the_editor() {
    let mut rt = runtime(lore());
    open_entry(&mut rt, "Lore", 2);

    host_update(&mut rt, "Lore", book([entry(1, "Intro", Some(10), Some(4))]));
    rt.settle().unwrap();

    assert!(rt.drawer.editor.editor().is_none());
}

#[test]
fn repeated_notification_with_same_data_mutates_nothing() {
    let mut rt = runtime(lore());
    let data = rt.drawer.host.load_world_info("Lore").unwrap();
    host_update(&mut rt, "Lore", data.clone());
    rt.settle().unwrap();

    let before = rt.drawer.view.mutations();
    host_update(&mut rt, "Lore", data);
    rt.settle().unwrap();
    assert_eq!(rt.drawer.view.mutations(), before);
}

#[test]
fn rapid_notifications_coalesce_into_one_pass_with_the_latest_data() {
    let mut rt = runtime(lore());
    let label = row(&rt, "Lore", 1).comment;

    host_update(&mut rt, "Lore", book([entry(1, "Draft", Some(10), Some(4)), entry(2, "Map", Some(5), Some(4))]));
    rt.advance(250).unwrap();
    assert_eq!(text(&rt, label), "Intro");

    host_update(&mut rt, "Lore", book([entry(1, "Final", Some(10), Some(4)), entry(2, "Map", Some(5), Some(4))]));
    rt.advance(100).unwrap();
    assert_eq!(text(&rt, label), "Intro", "the first timer is stale");

    rt.advance(250).unwrap();
    assert_eq!(text(&rt, label), "Final");
}

#[test]
fn added_books_are_inserted_case_insensitively() {
    let mut rt = runtime(vec![("alpha", book([])), ("Charlie", book([]))]);
    assert_eq!(book_order(&rt), vec!["alpha", "Charlie"]);

    rt.drawer.host.put_book("bravo", book([titled(0, "Note")]));
    rt.dispatch(Event::Host(HostNotification::BookListChanged)).unwrap();
    rt.settle().unwrap();

    assert_eq!(book_order(&rt), vec!["alpha", "bravo", "Charlie"]);
    assert_eq!(row_order(&rt, "bravo"), vec![Uid::from(0)]);
}

#[test]
fn books_gone_from_the_host_are_dropped() {
    let mut rt = runtime(vec![("Lore", book([])), ("Atlas", book([]))]);
    let atlas = book_handles(&rt, "Atlas").root;

    rt.drawer.host.remove_book("Atlas");
    rt.dispatch(Event::Host(HostNotification::BookListChanged)).unwrap();
    rt.settle().unwrap();

    assert!(!rt.drawer.cache.contains("Atlas"));
    assert!(!rt.drawer.view.contains(atlas));
}

#[test]
fn created_book_is_revealed_after_the_next_pass() {
    let mut rt = runtime(lore());
    let add = rt.drawer.layout.add_book;

    click(&mut rt, add);
    assert_eq!(rt.drawer.signals.waiting().len(), 1);
    assert!(!rt.drawer.cache.contains("New World (1)"));

    rt.settle().unwrap();
    let handles = book_handles(&rt, "New World (1)");
    assert!(!rt.drawer.cache.require("New World (1)").unwrap().collapsed);
    assert!(!rt.drawer.view.has_class(handles.entries, class::COLLAPSED));
    assert_eq!(rt.scrolled.last(), Some(&handles.root));
}

#[test]
fn settings_notification_syncs_active_checkboxes() {
    let mut rt = runtime(lore());
    let checkbox = book_handles(&rt, "Lore").active;
    assert_eq!(rt.drawer.view.value(checkbox).as_deref(), Some("false"));

    activate(&mut rt, "Lore");
    assert_eq!(rt.drawer.view.value(checkbox).as_deref(), Some("true"));
}
