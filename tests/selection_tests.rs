//! Multi-select, drag move/copy and delete through drawer events.

mod common;

use common::*;
use lorebook_drawer::app::{Event, Toast};
use lorebook_drawer::domain::Uid;
use lorebook_drawer::host::WorldInfoHost;
use lorebook_drawer::render::class;
use lorebook_drawer::view::View;

fn books() -> TestRuntime {
    let mut rt = runtime(vec![
        (
            "Lore",
            book([
                entry(1, "A", Some(10), Some(4)),
                entry(2, "B", Some(20), Some(4)),
                entry(3, "C", Some(30), Some(4)),
                entry(4, "D", Some(40), Some(4)),
            ]),
        ),
        ("Atlas", book([entry(7, "Map", Some(10), Some(4))])),
    ]);
    let select = rt.drawer.layout.sort_select;
    type_value(&mut rt, select, "order-asc");
    rt.settle().unwrap();
    rt.drawer.host.clear_saves();
    rt
}

fn select(rt: &mut TestRuntime, book: &str, uid: u64) {
    let selector = row(rt, book, uid).selector;
    click(rt, selector);
}

#[test]
fn shift_click_selects_the_contiguous_range() {
    let mut rt = books();
    assert_eq!(row_order(&rt, "Lore"), uids(&[1, 2, 3, 4]));

    select(&mut rt, "Lore", 1);
    assert_eq!(rt.toasts, vec![Toast::SelectionHelp]);

    let last = row(&rt, "Lore", 4).selector;
    shift_click(&mut rt, last);

    let selection = rt.drawer.selection.current().unwrap();
    assert_eq!(selection.source, "Lore");
    for uid in 1..=4 {
        assert!(selection.contains(&Uid::from(uid)), "uid {uid} selected");
        assert!(rt.drawer.view.has_class(row(&rt, "Lore", uid).root, class::SELECTED));
    }
}

#[test]
fn deselecting_the_last_entry_hides_the_help() {
    let mut rt = books();
    select(&mut rt, "Lore", 2);
    select(&mut rt, "Lore", 2);

    assert!(!rt.drawer.selection.is_active());
    assert!(rt.toasts.is_empty());
}

#[test]
fn drop_moves_entries_and_saves_each_book_once() {
    let mut rt = books();
    select(&mut rt, "Lore", 1);
    select(&mut rt, "Lore", 2);
    let dragged = row(&rt, "Lore", 1).root;
    rt.dispatch(Event::DragStart { node: dragged }).unwrap();
    assert!(rt.drawer.view.has_class(rt.drawer.layout.books, class::DRAGGING));

    rt.dispatch(Event::DragOver {
        book: "Atlas".to_string(),
        over: true,
    })
    .unwrap();
    rt.dispatch(Event::Drop {
        book: "Atlas".to_string(),
        copy: false,
    })
    .unwrap();
    rt.dispatch(Event::DragEnd).unwrap();

    assert_eq!(rt.drawer.host.save_count("Atlas"), 1);
    assert_eq!(rt.drawer.host.save_count("Lore"), 1);
    assert!(!rt.drawer.selection.is_active());
    assert!(rt.toasts.is_empty());
    assert!(!rt.drawer.view.has_class(rt.drawer.layout.books, class::DRAGGING));
    assert!(!rt.drawer.view.has_class(book_handles(&rt, "Atlas").root, class::TARGET));

    let lore = &rt.drawer.cache.require("Lore").unwrap().entries;
    assert_eq!(lore.keys().cloned().collect::<Vec<_>>(), uids(&[3, 4]));
    let titles: Vec<String> = rt.drawer.cache.require("Atlas").unwrap().entries.values().map(|e| e.comment.clone()).collect();
    assert_eq!(titles.len(), 3);
    assert!(titles.contains(&"A".to_string()) && titles.contains(&"B".to_string()));

    rt.settle().unwrap();
    assert_eq!(rt.drawer.host.load_world_info("Atlas").unwrap().entries.len(), 3);
}

#[test]
fn drop_with_copy_keeps_the_source() {
    let mut rt = books();
    select(&mut rt, "Lore", 3);
    rt.dispatch(Event::Drop {
        book: "Atlas".to_string(),
        copy: true,
    })
    .unwrap();

    assert_eq!(rt.drawer.host.save_count("Lore"), 0);
    assert_eq!(rt.drawer.host.save_count("Atlas"), 1);
    assert_eq!(rt.drawer.cache.require("Lore").unwrap().entries.len(), 4);
    assert_eq!(rt.drawer.cache.require("Atlas").unwrap().entries.len(), 2);
}

#[test]
fn drop_onto_the_source_without_copy_changes_nothing() {
    let mut rt = books();
    select(&mut rt, "Lore", 3);
    let selected = row(&rt, "Lore", 3).root;
    rt.dispatch(Event::Drop {
        book: "Lore".to_string(),
        copy: false,
    })
    .unwrap();

    assert!(rt.drawer.host.saves().is_empty());
    assert_eq!(rt.drawer.cache.require("Lore").unwrap().entries.len(), 4);
    assert!(!rt.drawer.selection.is_active());
    assert!(rt.toasts.is_empty());
    assert!(!rt.drawer.view.has_class(selected, class::SELECTED));
}

#[test]
fn delete_key_removes_the_selection() {
    let mut rt = books();
    let removed = row(&rt, "Lore", 2).root;
    select(&mut rt, "Lore", 2);
    rt.dispatch(Event::DeleteKey).unwrap();

    assert_eq!(rt.drawer.host.save_count("Lore"), 1);
    assert!(!rt.drawer.view.contains(removed));
    assert!(rt.drawer.cache.entry("Lore", &Uid::from(2)).is_none());
    assert!(!rt.drawer.host.load_world_info("Lore").unwrap().entries.contains_key(&Uid::from(2)));
    assert!(!rt.drawer.selection.is_active());
}

#[test]
fn delete_key_without_selection_is_ignored() {
    let mut rt = books();
    rt.dispatch(Event::DeleteKey).unwrap();
    assert!(rt.drawer.host.saves().is_empty());
}
