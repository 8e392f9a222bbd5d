//! The drawer running over a directory of JSON book files.

use lorebook_drawer::app::{Event, Runtime};
use lorebook_drawer::domain::Uid;
use lorebook_drawer::host::{JsonDirHost, MacroEngine, PlainFormFactory};
use lorebook_drawer::settings::MemoryStore;
use lorebook_drawer::view::{View, ViewTree};
use lorebook_drawer::Config;
use serde_json::{json, Value};
use std::path::Path;

type DirRuntime = Runtime<JsonDirHost, ViewTree, PlainFormFactory, MacroEngine>;

fn mount(dir: &Path) -> DirRuntime {
    let host = JsonDirHost::open(dir.to_path_buf()).unwrap();
    Runtime::mount(
        host,
        ViewTree::new(),
        Box::new(MemoryStore::new()),
        Config::default(),
        PlainFormFactory,
        MacroEngine,
    )
    .unwrap()
}

fn read(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn write_lore(dir: &Path) {
    let book = json!({
        "name": "Lore",
        "entries": {
            "0": {"uid": 0, "comment": "Intro", "key": ["intro"], "order": 10, "sticky": 3},
            "1": {"uid": 1, "comment": "Map", "order": 20}
        }
    });
    std::fs::write(dir.join("Lore.json"), book.to_string()).unwrap();
}

#[test]
fn entry_toggle_rewrites_the_file_and_keeps_unknown_fields() {
    let dir = tempfile::tempdir().unwrap();
    write_lore(dir.path());
    let mut rt = mount(dir.path());

    let toggle = rt.drawer.cache.row("Lore", &Uid::from(0)).unwrap().enabled;
    rt.dispatch(Event::Click { node: toggle, shift: false }).unwrap();
    rt.settle().unwrap();

    let saved = read(&dir.path().join("Lore.json"));
    assert_eq!(saved["entries"]["0"]["disable"], true);
    assert_eq!(saved["entries"]["0"]["sticky"], 3);
    assert_eq!(saved["name"], "Lore");
    assert!(rt.errors.is_empty());
}

#[test]
fn sort_preset_survives_a_remount() {
    let dir = tempfile::tempdir().unwrap();
    write_lore(dir.path());

    let mut rt = mount(dir.path());
    let select = rt.drawer.layout.sort_select;
    rt.dispatch(Event::ValueChanged {
        node: select,
        value: "order-desc".to_string(),
    })
    .unwrap();
    rt.settle().unwrap();

    let settings = read(&dir.path().join("settings.json"));
    assert_eq!(settings["wordInfoDrawer"]["sortLogic"], "order");

    let reopened = mount(dir.path());
    let list = reopened.drawer.cache.require("Lore").unwrap().handles.entries;
    let shown: Vec<String> = reopened
        .drawer
        .view
        .children(list)
        .unwrap()
        .into_iter()
        .filter_map(|node| reopened.drawer.view.attr(node, "data-uid"))
        .collect();
    assert_eq!(shown, vec!["1", "0"]);
}

#[test]
fn created_book_gets_a_file_and_is_listed() {
    let dir = tempfile::tempdir().unwrap();
    let mut rt = mount(dir.path());

    let add = rt.drawer.layout.add_book;
    rt.dispatch(Event::Click { node: add, shift: false }).unwrap();
    rt.settle().unwrap();

    assert!(dir.path().join("New World (1).json").exists());
    assert!(rt.drawer.cache.contains("New World (1)"));
}
