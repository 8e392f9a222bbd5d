//! Lorebook Drawer: a headless world-info drawer engine.
//!
//! The drawer presents a host application's lorebooks and their entries as a
//! tree and keeps that tree in sync with the host:
//! - Incremental reconciliation that preserves view nodes, open editors and
//!   selections across arbitrary host mutations
//! - Entry sorting by title, prompt position, order or uid
//! - Multi-select with drag move/copy and delete across books
//! - An order helper that turns row positions into `order` values, with a
//!   debounced filter script
//! - A panel slot shared by the entry editor, the order helper and the global
//!   activation settings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Headless binary (main.rs) / embedder               │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Application Layer (app/)                           │  ← State machine
//! │  - Event handling                                   │
//! │  - Action dispatching                               │
//! │  - Runtime with virtual clock                       │
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Reconciler    │   │ Panels        │   │ Selection     │
//! │ (reconcile/)  │   │ (editor/,     │   │ (selection/)  │
//! │ - Passes      │   │  order_helper)│   │ - Range select│
//! │ - Debounce    │   │ - Filter runs │   │ - Move / copy │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!         │                    │                    │
//! ┌─────────────────────────────────────────────────────┐
//! │  Cache (cache/) · Renderer (render/) · View (view/) │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Host traits & impls (host/) · Settings (settings/) │
//! │  Domain (domain/) · Infrastructure (infrastructure/)│
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Observability (observability/)                     │  ← Optional
//! │  - OpenTelemetry tracing                            │
//! │  - File-based span export                           │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`app`]: Drawer state, events, actions and the headless runtime
//! - [`cache`]: Book/entry cache with view handles
//! - [`domain`]: Entries, books, sorting and errors
//! - [`editor`]: Panel slot and entry editor
//! - [`host`]: Host collaborator traits with JSON-directory and in-memory hosts
//! - [`infrastructure`]: Data directory resolution
//! - [`order_helper`]: Order assignment table, filter runs and highlighting
//! - [`reconcile`]: Reconciliation passes and debouncing
//! - [`render`]: View construction for the drawer, books and entries
//! - [`selection`]: Multi-select, drag move/copy and delete
//! - [`settings`]: Sort settings and order helper preferences
//! - [`ui`]: Text outline of a rendered view
//! - [`view`]: View trait and in-memory tree
//! - `observability`: OpenTelemetry tracing (internal)
//!
//! # Configuration
//!
//! ```toml
//! reconcile_debounce_ms = 300
//! filter_debounce_ms = 1000
//! settings_debounce_ms = 1000
//! data_dir = "~/.local/share/lorebook-drawer"
//! trace_level = "debug"
//! settings_key = "wordInfoDrawer"
//! ```
//!
//! # Examples
//!
//! ```rust
//! use lorebook_drawer::app::{Event, Runtime};
//! use lorebook_drawer::host::{MacroEngine, MemoryHost, PlainFormFactory, WorldInfoHost};
//! use lorebook_drawer::settings::MemoryStore;
//! use lorebook_drawer::view::ViewTree;
//! use lorebook_drawer::Config;
//!
//! let mut host = MemoryHost::new();
//! host.create_world_info("Bestiary")?;
//! host.drain_notifications();
//!
//! let runtime = Runtime::mount(
//!     host,
//!     ViewTree::new(),
//!     Box::new(MemoryStore::new()),
//!     Config::default(),
//!     PlainFormFactory,
//!     MacroEngine,
//! )?;
//! assert_eq!(runtime.drawer.cache.names(), vec!["Bestiary"]);
//! # Ok::<(), lorebook_drawer::DrawerError>(())
//! ```

#![allow(clippy::multiple_crate_versions)]

pub mod app;
pub mod cache;
pub mod domain;
pub mod editor;
pub mod host;
pub mod infrastructure;
pub mod order_helper;
pub mod reconcile;
pub mod render;
pub mod selection;
pub mod settings;
pub mod ui;
pub mod view;

pub mod observability;

pub use app::{handle_event, Action, Drawer, Event, Runtime};
pub use domain::{DrawerError, Result};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Runtime configuration.
///
/// Built from a string map (the way plugin hosts hand over configuration) or
/// from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Delay between the last host notification and the reconciliation pass.
    /// Default: 300
    pub reconcile_debounce_ms: u64,

    /// Delay between the last filter script keystroke and the filter run.
    /// Default: 1000
    pub filter_debounce_ms: u64,

    /// Delay between a sort preset change and saving it. Default: 1000
    pub settings_debounce_ms: u64,

    /// Directory for span exports and local preferences.
    ///
    /// Paths starting with `~` are expanded. Default: platform data directory
    /// (see [`infrastructure::get_data_dir`]).
    pub data_dir: Option<PathBuf>,

    /// Tracing level for exported spans.
    ///
    /// Options: `trace`, `debug`, `info`, `warn`, `error`. Default: `"info"`
    pub trace_level: Option<String>,

    /// Key of the sort settings in the host's extension settings object.
    pub settings_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reconcile_debounce_ms: 300,
            filter_debounce_ms: 1000,
            settings_debounce_ms: 1000,
            data_dir: None,
            trace_level: None,
            settings_key: settings::SETTINGS_KEY.to_string(),
        }
    }
}

impl Config {
    /// Parses configuration from a string map.
    ///
    /// Unparseable numbers fall back to their defaults.
    ///
    /// # Parameters
    ///
    /// * `config` - Key/value configuration
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use lorebook_drawer::Config;
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("reconcile_debounce_ms".to_string(), "50".to_string());
    /// map.insert("filter_debounce_ms".to_string(), "soon".to_string());
    ///
    /// let config = Config::from_map(&map);
    /// assert_eq!(config.reconcile_debounce_ms, 50);
    /// assert_eq!(config.filter_debounce_ms, 1000);
    /// ```
    #[must_use]
    pub fn from_map(config: &BTreeMap<String, String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str, default: u64| {
            config
                .get(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        Self {
            reconcile_debounce_ms: number("reconcile_debounce_ms", defaults.reconcile_debounce_ms),
            filter_debounce_ms: number("filter_debounce_ms", defaults.filter_debounce_ms),
            settings_debounce_ms: number("settings_debounce_ms", defaults.settings_debounce_ms),
            data_dir: config
                .get("data_dir")
                .map(|d| PathBuf::from(infrastructure::expand_tilde(d))),
            trace_level: config.get("trace_level").cloned(),
            settings_key: config
                .get("settings_key")
                .filter(|k| !k.trim().is_empty())
                .cloned()
                .unwrap_or(defaults.settings_key),
        }
    }

    /// Parses configuration from TOML text. Missing keys use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError::Config`] when the text is not valid TOML or a
    /// value has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(text)?;
        config.data_dir = config
            .data_dir
            .map(|d| PathBuf::from(infrastructure::expand_tilde(&d.to_string_lossy())));
        Ok(config)
    }

    /// Reads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError::Io`] if the file cannot be read and
    /// [`DrawerError::Config`] if it does not parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = ?path, "loading configuration file");
        Self::from_toml_str(&text)
    }
}
