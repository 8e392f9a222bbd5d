//! Flat JSON records for finished spans.
//!
//! Each span becomes one self-contained object per log line, carrying the
//! service name so lines from several runs can be concatenated:
//!
//! ```json
//! {"service":"lorebook-drawer","name":"handle_event","traceId":"…","spanId":"…",
//!  "parentSpanId":"…","start":"2026-10-16T09:12:03.120Z","durationUs":412,
//!  "attributes":{"event_type":"TimerElapsed(…)"},"events":[…],"status":"unset"}
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use opentelemetry::trace::{SpanId, Status};
use opentelemetry::{KeyValue, Value};
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::resource::Resource;
use serde_json::{json, Map, Value as JsonValue};
use std::time::SystemTime;

/// Converts span data into JSON records.
pub struct SpanFormatter {
    service: String,
}

impl SpanFormatter {
    /// Formatter labelling records with the resource's `service.name`.
    pub fn new(resource: &Resource) -> Self {
        let service = resource
            .get(opentelemetry::Key::from_static_str("service.name"))
            .map_or_else(|| "unknown".to_string(), |v| v.as_str().into_owned());
        Self { service }
    }

    /// One JSON record per span, in batch order.
    pub fn format_batch(&self, batch: &[SpanData]) -> Vec<JsonValue> {
        batch.iter().map(|span| self.format_span(span)).collect()
    }

    fn format_span(&self, span: &SpanData) -> JsonValue {
        let duration = span
            .end_time
            .duration_since(span.start_time)
            .unwrap_or_default();
        let parent = (span.parent_span_id != SpanId::INVALID).then(|| format!("{:016x}", span.parent_span_id));

        let events: Vec<JsonValue> = span
            .events
            .iter()
            .map(|event| {
                json!({
                    "at": timestamp(event.timestamp),
                    "name": event.name,
                    "attributes": attributes(&event.attributes),
                })
            })
            .collect();

        json!({
            "service": self.service,
            "name": span.name,
            "traceId": format!("{:032x}", span.span_context.trace_id()),
            "spanId": format!("{:016x}", span.span_context.span_id()),
            "parentSpanId": parent,
            "start": timestamp(span.start_time),
            "durationUs": u64::try_from(duration.as_micros()).unwrap_or(u64::MAX),
            "attributes": attributes(&span.attributes),
            "events": events,
            "status": status(&span.status),
        })
    }
}

fn timestamp(at: SystemTime) -> String {
    DateTime::<Utc>::from(at).to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn attributes(pairs: &[KeyValue]) -> JsonValue {
    let map: Map<String, JsonValue> = pairs
        .iter()
        .map(|kv| (kv.key.to_string(), attribute_value(&kv.value)))
        .collect();
    JsonValue::Object(map)
}

fn attribute_value(value: &Value) -> JsonValue {
    match value {
        Value::Bool(b) => json!(b),
        Value::I64(i) => json!(i),
        Value::F64(f) => json!(f),
        Value::String(s) => json!(s.as_str()),
        Value::Array(_) => json!(value.to_string()),
    }
}

fn status(status: &Status) -> JsonValue {
    match status {
        Status::Unset => json!("unset"),
        Status::Ok => json!("ok"),
        Status::Error { description } => json!({ "error": description.to_string() }),
    }
}

impl std::fmt::Debug for SpanFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanFormatter").field("service", &self.service).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_map_keeps_types() {
        let json = attributes(&[
            KeyValue::new("book", "Lore"),
            KeyValue::new("rows", 3_i64),
            KeyValue::new("silent", true),
        ]);
        assert_eq!(json["book"], "Lore");
        assert_eq!(json["rows"], 3);
        assert_eq!(json["silent"], true);
    }

    #[test]
    fn timestamps_are_rfc3339_utc() {
        assert_eq!(timestamp(SystemTime::UNIX_EPOCH), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn service_name_comes_from_resource() {
        let resource = Resource::new(vec![KeyValue::new("service.name", "lorebook-drawer")]);
        assert_eq!(SpanFormatter::new(&resource).service, "lorebook-drawer");
    }
}
