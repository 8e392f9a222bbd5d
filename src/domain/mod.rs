//! Domain layer for the lorebook drawer.
//!
//! This module contains the host-independent data model: books, entries, the
//! sort engine and the error type. Nothing in here knows about views, panels or
//! the host API.
//!
//! # Organization
//!
//! - [`error`]: Error types and result alias
//! - [`entry`]: Entry model, uid, strategy and position types
//! - [`book`]: Book snapshot as exchanged with the host
//! - [`sort`]: Multi-criterion entry ordering
//!
//! # Examples
//!
//! ```
//! use lorebook_drawer::domain::{BookData, Entry, SortPreset, Uid};
//!
//! let mut book = BookData::default();
//! let fresh = book.allocate_entry();
//! assert_eq!(fresh.uid, Uid::from(0));
//!
//! let ordered = SortPreset::default().sort(book.entries.values());
//! assert_eq!(ordered.len(), 1);
//! ```

pub mod book;
pub mod entry;
pub mod error;
pub mod sort;

pub use book::BookData;
pub use entry::{Entry, EntryField, Position, Strategy, Uid};
pub use error::{DrawerError, Result};
pub use sort::{sort_entries, sort_needed, SortCriterion, SortDirection, SortPreset};
