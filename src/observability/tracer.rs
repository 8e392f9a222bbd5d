//! Tracer provider exporting finished spans into the span log.

use super::file_writer::SpanLog;
use super::span_formatter::SpanFormatter;
use futures_util::future::BoxFuture;
use opentelemetry::trace::TraceError;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::resource::Resource;
use opentelemetry_sdk::trace::TracerProvider;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Span exporter writing one JSON record per line.
#[derive(Debug)]
struct SpanLogExporter {
    log: SpanLog,
    formatter: SpanFormatter,
    is_shutdown: AtomicBool,
}

impl SpanExporter for SpanLogExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        if self.is_shutdown.load(Ordering::SeqCst) {
            return Box::pin(std::future::ready(Err(TraceError::from("span log exporter is shut down"))));
        }

        let result = self
            .formatter
            .format_batch(&batch)
            .iter()
            .try_for_each(|record| self.log.append(&record.to_string()))
            .map_err(|e| TraceError::from(e.to_string()));
        Box::pin(std::future::ready(result))
    }

    fn shutdown(&mut self) {
        self.is_shutdown.store(true, Ordering::SeqCst);
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.formatter = SpanFormatter::new(resource);
    }
}

/// Tracer provider exporting every finished span to `path` as it ends.
pub fn create_tracer_provider(path: PathBuf, resource: Resource) -> TracerProvider {
    let exporter = SpanLogExporter {
        log: SpanLog::new(path),
        formatter: SpanFormatter::new(&resource),
        is_shutdown: AtomicBool::new(false),
    };

    TracerProvider::builder()
        .with_config(opentelemetry_sdk::trace::Config::default().with_resource(resource))
        .with_simple_exporter(exporter)
        .build()
}
