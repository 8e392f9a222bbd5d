//! Subscriber setup for the span log.

use super::tracer;
use crate::infrastructure::resolve_data_dir;
use crate::Config;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::resource::Resource;
use std::path::PathBuf;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Name of the span log inside the data directory.
pub const SPAN_LOG_FILE: &str = "lorebook-drawer-spans.jsonl";

/// Installs the global subscriber exporting spans to the span log.
///
/// The filter comes from `config.trace_level` (default `"info"`), and the log
/// lives in the data directory resolved from `config`.
///
/// # Returns
///
/// The span log path when this call installed the subscriber. `None` when the
/// data directory cannot be created or a global subscriber already exists;
/// tracing is optional and the drawer runs the same without it.
///
/// # Example
///
/// ```rust
/// use lorebook_drawer::observability::init_tracing;
/// use lorebook_drawer::Config;
///
/// let dir = std::env::temp_dir().join("lorebook-drawer-doc");
/// let config = Config {
///     data_dir: Some(dir),
///     trace_level: Some("debug".to_string()),
///     ..Config::default()
/// };
///
/// init_tracing(&config);
/// tracing::debug!("tracing is now active");
/// ```
pub fn init_tracing(config: &Config) -> Option<PathBuf> {
    let level = config.trace_level.as_deref().unwrap_or("info");

    let data_dir = resolve_data_dir(config);
    std::fs::create_dir_all(&data_dir).ok()?;

    let resource = Resource::new(vec![opentelemetry::KeyValue::new("service.name", "lorebook-drawer")]);
    let path = data_dir.join(SPAN_LOG_FILE);
    let provider = tracer::create_tracer_provider(path.clone(), resource);

    let layer = OpenTelemetryLayer::new(provider.tracer("lorebook-drawer"));
    tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(layer)
        .try_init()
        .ok()?;

    Some(path)
}
