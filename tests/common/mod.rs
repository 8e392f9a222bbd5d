//! Shared fixtures for the drawer integration tests.
//!
//! Every test drives a [`Runtime`] over a [`MemoryHost`] and a [`ViewTree`],
//! with a [`ScriptedEngine`] standing in for the host's script runtime.

#![allow(dead_code)]

use lorebook_drawer::app::{Event, Runtime};
use lorebook_drawer::cache::{BookHandles, EntryHandles};
use lorebook_drawer::domain::{BookData, DrawerError, Entry, Result, Uid};
use lorebook_drawer::host::{HostNotification, MemoryHost, PlainFormFactory, ScriptEngine, WorldInfoHost};
use lorebook_drawer::order_helper::OrderHelper;
use lorebook_drawer::settings::MemoryStore;
use lorebook_drawer::view::{NodeId, View, ViewTree};
use lorebook_drawer::Config;

pub type TestRuntime = Runtime<MemoryHost, ViewTree, PlainFormFactory, ScriptedEngine>;

/// Script engine with a tiny rule language.
///
/// - `has:<text>` keeps rows whose filter input contains `<text>`
/// - `fail` compiles but errors on evaluation
/// - anything containing `(` does not compile
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    /// Scripts passed to `compile`, oldest first.
    pub compiled: Vec<String>,
    /// Number of `evaluate` calls.
    pub evaluations: usize,
}

impl ScriptEngine for ScriptedEngine {
    fn compile(&mut self, script: &str) -> Result<()> {
        self.compiled.push(script.to_string());
        if script.contains('(') {
            return Err(DrawerError::Script(format!("cannot parse {script}")));
        }
        Ok(())
    }

    fn evaluate(&mut self, script: &str, input: &str) -> Result<bool> {
        self.evaluations += 1;
        match script.strip_prefix("has:") {
            Some(needle) => Ok(input.contains(needle)),
            None if script == "fail" => Err(DrawerError::Script("evaluation failed".to_string())),
            None => Ok(true),
        }
    }
}

/// Entry with a title, an order and a depth.
pub fn entry(uid: u64, comment: &str, order: Option<u32>, depth: Option<u32>) -> Entry {
    let mut entry = Entry::new(Uid::from(uid));
    entry.comment = comment.to_string();
    entry.order = order;
    entry.depth = depth;
    entry
}

/// Entry with only a title; order and depth keep the new-entry defaults.
pub fn titled(uid: u64, comment: &str) -> Entry {
    let mut entry = Entry::new(Uid::from(uid));
    entry.comment = comment.to_string();
    entry
}

pub fn book(entries: impl IntoIterator<Item = Entry>) -> BookData {
    BookData::from_entries(entries)
}

/// Default configuration: 300 ms reconcile debounce, 1 s filter debounce.
pub fn runtime(books: Vec<(&str, BookData)>) -> TestRuntime {
    runtime_with(books, Config::default())
}

pub fn runtime_with(books: Vec<(&str, BookData)>, config: Config) -> TestRuntime {
    let host = MemoryHost::with_books(books.into_iter().map(|(name, data)| (name.to_string(), data)));
    Runtime::mount(
        host,
        ViewTree::new(),
        Box::new(MemoryStore::new()),
        config,
        PlainFormFactory,
        ScriptedEngine::default(),
    )
    .unwrap()
}

pub fn click(rt: &mut TestRuntime, node: NodeId) {
    rt.dispatch(Event::Click { node, shift: false }).unwrap();
}

pub fn shift_click(rt: &mut TestRuntime, node: NodeId) {
    rt.dispatch(Event::Click { node, shift: true }).unwrap();
}

/// Clicks an entry row, opening its editor.
pub fn open_entry(rt: &mut TestRuntime, name: &str, uid: u64) {
    let node = row(rt, name, uid).root;
    click(rt, node);
}

pub fn type_value(rt: &mut TestRuntime, node: NodeId, value: &str) {
    rt.dispatch(Event::ValueChanged {
        node,
        value: value.to_string(),
    })
    .unwrap();
}

/// Replaces a book in the host and signals it the way the host would.
pub fn host_update(rt: &mut TestRuntime, name: &str, data: BookData) {
    rt.drawer.host.put_book(name, data.clone());
    rt.dispatch(Event::Host(HostNotification::WorldInfoUpdated {
        book: name.to_string(),
        data,
    }))
    .unwrap();
}

/// Activates a book in the host and delivers the settings notification.
pub fn activate(rt: &mut TestRuntime, name: &str) {
    rt.drawer.host.set_book_active(name, true).unwrap();
    for notification in rt.drawer.host.drain_notifications() {
        rt.dispatch(Event::Host(notification)).unwrap();
    }
}

pub fn book_handles(rt: &TestRuntime, name: &str) -> BookHandles {
    rt.drawer.cache.require(name).unwrap().handles
}

pub fn row(rt: &TestRuntime, name: &str, uid: u64) -> EntryHandles {
    rt.drawer.cache.row(name, &Uid::from(uid)).unwrap()
}

/// Uids of a book's rows in view order.
pub fn row_order(rt: &TestRuntime, name: &str) -> Vec<Uid> {
    let list = book_handles(rt, name).entries;
    rt.drawer
        .view
        .children(list)
        .unwrap()
        .into_iter()
        .filter_map(|node| rt.drawer.view.attr(node, "data-uid"))
        .map(|uid| Uid::from(uid.as_str()))
        .collect()
}

/// Book names in view order.
pub fn book_order(rt: &TestRuntime) -> Vec<String> {
    rt.drawer
        .view
        .children(rt.drawer.layout.books)
        .unwrap()
        .into_iter()
        .filter_map(|node| rt.drawer.view.attr(node, "data-book"))
        .collect()
}

pub fn uids(values: &[u64]) -> Vec<Uid> {
    values.iter().map(|v| Uid::from(*v)).collect()
}

pub fn cached(rt: &TestRuntime, name: &str, uid: u64) -> Entry {
    rt.drawer.cache.entry(name, &Uid::from(uid)).unwrap().clone()
}

pub fn helper(rt: &TestRuntime) -> &OrderHelper {
    rt.drawer.editor.order_helper().expect("order helper is open")
}

/// Label text of a node.
pub fn text(rt: &TestRuntime, node: NodeId) -> String {
    rt.drawer.view.text(node).unwrap_or_default().to_string()
}
