//! OpenTelemetry tracing exported to a local span log.
//!
//! Every `tracing` span the drawer opens (one per handled event, one per
//! reconciliation pass, and so on) ends up as a JSON line in
//! `lorebook-drawer-spans.jsonl` inside the data directory:
//!
//! ```text
//! tracing-opentelemetry → OpenTelemetry SDK → SpanLogExporter → span log (+3 backups)
//! ```
//!
//! The log rotates above 10 MB and keeps three timestamped backups. The level
//! comes from the `trace_level` configuration option, `"info"` by default.
//!
//! # Modules
//!
//! - `init`: Subscriber installation
//! - `tracer`: Tracer provider and span exporter
//! - `span_formatter`: Span to JSON record conversion
//! - `file_writer`: Rotating span log

mod file_writer;
mod init;
mod span_formatter;
mod tracer;

pub use init::{init_tracing, SPAN_LOG_FILE};
