//! Headless drawer over a directory of lorebook files.
//!
//! Mounts the drawer on a [`JsonDirHost`], applies the requested sort preset
//! and search, and prints an outline of the rendered view:
//!
//! ```text
//! lorebook-drawer ./worlds --sort order-desc --expand
//! lorebook-drawer ./worlds --search dragon --entries --visible-only --color
//! ```
//!
//! A sort preset given on the command line is saved to the directory's
//! extension settings, the same way choosing it in the drawer does.

use clap::Parser;
use lorebook_drawer::app::{Event, Runtime};
use lorebook_drawer::domain::sort::SortPreset;
use lorebook_drawer::host::{JsonDirHost, MacroEngine, PlainFormFactory};
use lorebook_drawer::infrastructure::resolve_data_dir;
use lorebook_drawer::observability::init_tracing;
use lorebook_drawer::reconcile;
use lorebook_drawer::settings::{JsonFileStore, KeyValueStore, MemoryStore};
use lorebook_drawer::ui::{outline, OutlineOptions};
use lorebook_drawer::view::ViewTree;
use lorebook_drawer::{Config, DrawerError, Result};
use std::path::PathBuf;

/// Name of the order-helper preference file in the data directory.
const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Parser)]
#[command(name = "lorebook-drawer")]
#[command(about = "Render a directory of world-info books as a drawer outline")]
#[command(version)]
struct Cli {
    /// Directory holding one `<book>.json` per book
    dir: PathBuf,

    /// Sort preset, e.g. `title-asc`, `prompt-asc`, `order-desc`, `uid-asc`
    #[arg(long)]
    sort: Option<String>,

    /// Book search query
    #[arg(long)]
    search: Option<String>,

    /// Let the search match entry titles too
    #[arg(long)]
    entries: bool,

    /// Expand every book
    #[arg(long)]
    expand: bool,

    /// Omit books, entries and rows hidden by search, filters or collapse
    #[arg(long)]
    visible_only: bool,

    /// Colour the outline
    #[arg(long)]
    color: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep preferences in memory instead of the data directory
    #[arg(long)]
    ephemeral: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("lorebook-drawer: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(path) = init_tracing(&config) {
        tracing::debug!(path = ?path, "span log enabled");
    }

    let store: Box<dyn KeyValueStore> = if cli.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        let dir = resolve_data_dir(&config);
        std::fs::create_dir_all(&dir)?;
        Box::new(JsonFileStore::open(dir.join(PREFERENCES_FILE))?)
    };

    let host = JsonDirHost::open(cli.dir.clone())?;
    let mut runtime = Runtime::mount(host, ViewTree::new(), store, config, PlainFormFactory, MacroEngine)?;
    let layout = runtime.drawer.layout;

    if let Some(name) = &cli.sort {
        let preset = SortPreset::parse(name).ok_or_else(|| DrawerError::Config(format!("unknown sort preset: {name}")))?;
        runtime.dispatch(Event::ValueChanged {
            node: layout.sort_select,
            value: preset.label().to_string(),
        })?;
    }
    if cli.entries {
        runtime.dispatch(Event::ValueChanged {
            node: layout.search_entries,
            value: "true".to_string(),
        })?;
    }
    if let Some(query) = &cli.search {
        runtime.dispatch(Event::ValueChanged {
            node: layout.search,
            value: query.clone(),
        })?;
    }
    if cli.expand {
        let drawer = &mut runtime.drawer;
        for name in drawer.cache.names() {
            reconcile::set_collapsed(&mut drawer.view, &mut drawer.cache, &name, false)?;
        }
    }
    runtime.settle()?;

    let options = OutlineOptions {
        color: cli.color,
        visible_only: cli.visible_only,
    };
    print!("{}", outline(&runtime.drawer.view, layout.body, options));
    Ok(())
}
