//! Application layer coordinating state, events, and actions.
//!
//! This module sits between the embedder (a browser shim, the headless
//! binary, the test suite) and the engine modules. It follows the same
//! unidirectional flow throughout:
//!
//! ```text
//! Interaction / Host notification → Event → handle_event → Drawer mutations → Actions
//!                                     ↑                                          ↓
//!                                     └──────────── Runtime performs ────────────┘
//! ```
//!
//! # Modules
//!
//! - [`actions`]: Side effect commands emitted by the event handler
//! - [`handler`]: Event processing and state transitions
//! - [`runtime`]: Headless executor with a virtual clock
//! - [`state`]: The mounted [`Drawer`] and the operations handlers compose
//!
//! # Example
//!
//! ```rust
//! use lorebook_drawer::app::{Event, Runtime};
//! use lorebook_drawer::host::{HostNotification, MacroEngine, MemoryHost, PlainFormFactory, WorldInfoHost};
//! use lorebook_drawer::settings::MemoryStore;
//! use lorebook_drawer::view::ViewTree;
//! use lorebook_drawer::Config;
//!
//! let mut runtime = Runtime::mount(
//!     MemoryHost::new(),
//!     ViewTree::new(),
//!     Box::new(MemoryStore::new()),
//!     Config::default(),
//!     PlainFormFactory,
//!     MacroEngine,
//! )?;
//! runtime.drawer.host.create_world_info("Lore")?;
//! runtime.dispatch(Event::Host(HostNotification::BookListChanged))?;
//! runtime.settle()?;
//! assert!(runtime.drawer.cache.contains("Lore"));
//! # Ok::<(), lorebook_drawer::DrawerError>(())
//! ```

pub mod actions;
pub mod handler;
pub mod runtime;
pub mod state;

pub use actions::{Action, TimerId, TimerKind, Toast};
pub use handler::{handle_event, Event};
pub use runtime::Runtime;
pub use state::{Drawer, SearchState};
