//! Host collaborator interfaces.
//!
//! The drawer is a view/controller layer: book persistence, the entry edit form
//! and the filter script language all belong to the host application. This
//! module defines the seams the drawer talks through.
//!
//! # Traits
//!
//! - [`WorldInfoHost`]: book storage, entry CRUD, active-book list, settings
//! - [`FormFactory`]: builds the entry edit form for the editor panel
//! - [`ScriptEngine`]: compiles and evaluates order-helper filter scripts
//!
//! # Implementations
//!
//! - [`JsonDirHost`]: a directory of `<book>.json` files with atomic writes
//! - [`MemoryHost`]: in-memory books with a save journal
//! - [`PlainFormFactory`]: a form showing the entry's raw field values
//! - [`MacroEngine`]: `{{var::entry}}` substitution with boolean coercion
//!
//! Hosts report their own mutations through [`WorldInfoHost::drain_notifications`];
//! the runtime turns those into drawer events, the same way a browser host
//! would fire its world-info-updated event after every save.

pub mod json;
pub mod memory;
pub mod script;

pub use json::JsonDirHost;
pub use memory::MemoryHost;
pub use script::MacroEngine;

use crate::domain::error::Result;
use crate::domain::{BookData, Entry, Uid};
use crate::editor::EditorForm;
use serde_json::Value;

/// Change signal raised by the host after a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostNotification {
    /// A book was written; carries the saved snapshot.
    WorldInfoUpdated {
        /// Book name.
        book: String,
        /// Snapshot that was saved.
        data: BookData,
    },
    /// The active-book list or global world-info settings changed.
    WorldInfoSettingsUpdated,
    /// The set of book names changed without a book being saved.
    BookListChanged,
}

/// Book storage and world-info settings owned by the host.
///
/// # Examples
///
/// ```rust
/// use lorebook_drawer::host::{MemoryHost, WorldInfoHost};
///
/// let mut host = MemoryHost::new();
/// host.create_world_info("Lore")?;
/// let mut data = host.load_world_info("Lore")?;
/// let entry = host.create_world_info_entry("Lore", &mut data)?;
/// host.save_world_info("Lore", &data, true)?;
/// assert!(host.load_world_info("Lore")?.entries.contains_key(&entry.uid));
/// # Ok::<(), lorebook_drawer::DrawerError>(())
/// ```
pub trait WorldInfoHost {
    /// Authoritative set of book names.
    ///
    /// # Errors
    ///
    /// Returns an error if the name list cannot be read.
    fn world_names(&self) -> Result<Vec<String>>;

    /// Globally active book names, in activation order.
    fn selected_world_info(&self) -> Vec<String>;

    /// Full snapshot of a book.
    ///
    /// # Errors
    ///
    /// Returns an error if the book does not exist or cannot be parsed.
    fn load_world_info(&self, name: &str) -> Result<BookData>;

    /// Writes a full snapshot of a book.
    ///
    /// `silent` suppresses host-side toasts; the update notification is raised
    /// either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn save_world_info(&mut self, name: &str, data: &BookData, silent: bool) -> Result<()>;

    /// Allocates a new entry with a fresh uid inside `data`.
    ///
    /// The entry is stored in `data` only; callers persist it with
    /// [`WorldInfoHost::save_world_info`].
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses the allocation.
    fn create_world_info_entry(&mut self, _name: &str, data: &mut BookData) -> Result<Entry> {
        Ok(data.allocate_entry())
    }

    /// Removes an entry from `data`; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses the deletion.
    fn delete_world_info_entry(&mut self, data: &mut BookData, uid: &Uid, _silent: bool) -> Result<bool> {
        Ok(data.entries.remove(uid).is_some())
    }

    /// Creates an empty book; returns `false` if the name is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the book cannot be written.
    fn create_world_info(&mut self, name: &str) -> Result<bool>;

    /// Adds or removes a book from the active list.
    ///
    /// # Errors
    ///
    /// Returns an error if the active list cannot be persisted.
    fn set_book_active(&mut self, name: &str, active: bool) -> Result<()>;

    /// Reads a value from the extension settings object.
    fn extension_settings(&self, key: &str) -> Option<Value>;

    /// Writes a value into the extension settings object.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be persisted.
    fn save_extension_settings(&mut self, key: &str, value: Value) -> Result<()>;

    /// Takes the notifications raised since the last call.
    fn drain_notifications(&mut self) -> Vec<HostNotification>;

    /// A `New World (n)` name not used by any book.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`WorldInfoHost::world_names`].
    fn free_world_name(&self) -> Result<String> {
        let names = self.world_names()?;
        let mut index = 1_u32;
        loop {
            let candidate = format!("New World ({index})");
            if !names.contains(&candidate) {
                return Ok(candidate);
            }
            index += 1;
        }
    }
}

/// Builds the entry edit form shown by the editor panel.
///
/// Construction may be slow in a real host; the drawer requests it through an
/// action and mounts the result only if no newer editor was requested since.
pub trait FormFactory {
    /// Builds the form for `entry` of `book`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be rendered.
    fn build_form(&mut self, book: &str, data: &BookData, entry: &Entry) -> Result<EditorForm>;
}

/// Form factory that shows every field of the entry as plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormFactory;

impl FormFactory for PlainFormFactory {
    fn build_form(&mut self, book: &str, data: &BookData, entry: &Entry) -> Result<EditorForm> {
        tracing::trace!(book = %book, uid = %entry.uid, entries = data.entries.len(), "building plain form");
        EditorForm::from_entry(entry)
    }
}

/// Filter script engine used by the order helper.
pub trait ScriptEngine {
    /// Checks that `script` can run.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DrawerError::Script`] with the parse failure.
    fn compile(&mut self, script: &str) -> Result<()>;

    /// Runs `script` with `input` bound as the entry; returns whether the entry
    /// is kept.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DrawerError::Script`] on runtime failure.
    fn evaluate(&mut self, script: &str, input: &str) -> Result<bool>;
}
