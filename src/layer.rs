//! `tracing` integration.
//!
//! [`LogfmtLayer`] plugs the encoder into a `tracing_subscriber` registry:
//! every event becomes one logfmt line written through a [`MakeWriter`].
//!
//! Span fields are encoded once, when recorded, into a pooled [`Encoder`]
//! stored in the span's extensions. A child span starts from a copy of its
//! parent's tokens, so an event line carries the fields of every enclosing
//! span, outermost first, followed by the event's own fields. The event's
//! `message` field becomes the record message.
//!
//! Several layers can share one registry; each keeps its own span fields.
//!
//! ```rust
//! use logfmt_encoder::{EncoderOptions, LogfmtLayer};
//! use tracing_subscriber::prelude::*;
//!
//! let layer = LogfmtLayer::new(EncoderOptions::default(), std::io::stderr);
//! let subscriber = tracing_subscriber::registry().with(layer);
//! tracing::subscriber::with_default(subscriber, || {
//!     tracing::info!(user = "ford", "logged in");
//! });
//! ```

use crate::entry::{Entry, EntryAssembler, Level};
use crate::{Encoder, EncoderOptions, EncoderPool, ObjectEncoder};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::{LookupSpan, SpanRef};
use tracing_subscriber::Layer;

// Events from this crate are not encoded: doing so would re-enter the layer.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

static NEXT_LAYER_ID: AtomicUsize = AtomicUsize::new(0);

/// A `tracing_subscriber` layer that writes logfmt lines.
pub struct LogfmtLayer<W> {
    id: usize,
    assembler: EntryAssembler,
    make_writer: W,
}

impl<W> LogfmtLayer<W>
where
    W: for<'a> MakeWriter<'a> + 'static,
{
    pub fn new(options: EncoderOptions, make_writer: W) -> Self {
        LogfmtLayer::with_pool(Arc::new(EncoderPool::new(options)), make_writer)
    }

    /// Builds a layer on an existing pool; key names come from the pool's options.
    pub fn with_pool(pool: Arc<EncoderPool>, make_writer: W) -> Self {
        LogfmtLayer {
            id: NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed),
            assembler: EntryAssembler::new(pool),
            make_writer,
        }
    }

    pub fn pool(&self) -> &Arc<EncoderPool> {
        self.assembler.pool()
    }

    /// A fresh encoder holding the parent span's tokens, if any.
    ///
    /// The parent's extensions are released before the pool is touched.
    fn inherited_fields<S>(&self, span: &SpanRef<'_, S>) -> Encoder
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let inherited = span.parent().and_then(|parent| {
            let extensions = parent.extensions();
            let stored = extensions.get::<SpanFields>()?.get(self.id)?;
            Some(stored.as_bytes().to_vec())
        });

        let mut fields = self.pool().take();
        if let Some(bytes) = inherited {
            fields.buffer_mut().extend(&bytes);
        }
        fields
    }
}

/// Span fields of every `LogfmtLayer` attached to one registry, by layer id.
struct SpanFields {
    layers: Vec<(usize, Encoder)>,
}

impl SpanFields {
    fn new(layer: usize, fields: Encoder) -> Self {
        SpanFields {
            layers: vec![(layer, fields)],
        }
    }

    fn get(&self, layer: usize) -> Option<&Encoder> {
        self.layers
            .iter()
            .find(|(id, _)| *id == layer)
            .map(|(_, fields)| fields)
    }

    fn get_mut(&mut self, layer: usize) -> Option<&mut Encoder> {
        self.layers
            .iter_mut()
            .find(|(id, _)| *id == layer)
            .map(|(_, fields)| fields)
    }

    /// Stores `fields` for `layer`, returning what it replaces.
    fn insert(&mut self, layer: usize, fields: Encoder) -> Option<Encoder> {
        match self.get_mut(layer) {
            Some(slot) => Some(std::mem::replace(slot, fields)),
            None => {
                self.layers.push((layer, fields));
                None
            }
        }
    }

    fn remove(&mut self, layer: usize) -> Option<Encoder> {
        let index = self.layers.iter().position(|(id, _)| *id == layer)?;
        Some(self.layers.swap_remove(index).1)
    }
}

fn is_own_target(target: &str) -> bool {
    match target.strip_prefix(OWN_TARGET) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}

impl<S, W> Layer<S> for LogfmtLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = self.inherited_fields(&span);
        attrs.record(&mut FieldVisitor::new(&mut fields, false));

        let mut extensions = span.extensions_mut();
        let replaced = match extensions.get_mut::<SpanFields>() {
            Some(stored) => stored.insert(self.id, fields),
            None => {
                extensions.insert(SpanFields::new(self.id, fields));
                None
            }
        };
        drop(extensions);

        if let Some(stale) = replaced {
            self.pool().release(stale);
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        let fields = extensions
            .get_mut::<SpanFields>()
            .and_then(|stored| stored.get_mut(self.id));
        if let Some(fields) = fields {
            values.record(&mut FieldVisitor::new(fields, false));
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else {
            return;
        };
        let removed = span
            .extensions_mut()
            .get_mut::<SpanFields>()
            .and_then(|stored| stored.remove(self.id));
        if let Some(fields) = removed {
            self.pool().release(fields);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_own_target(metadata.target()) {
            return;
        }

        let mut fields = self.pool().acquire();
        if let Some(span) = ctx.event_span(event) {
            let extensions = span.extensions();
            let inherited = extensions
                .get::<SpanFields>()
                .and_then(|stored| stored.get(self.id));
            if let Some(inherited) = inherited {
                fields.clone_from(inherited);
            }
        }

        let mut visitor = FieldVisitor::new(&mut fields, true);
        event.record(&mut visitor);
        let message = visitor.message;

        let entry = Entry::new(Level::from(*metadata.level()), &message);
        let mut writer = self.make_writer.make_writer_for(metadata);
        // A logging backend has nowhere to report its own failures.
        let _ = self
            .assembler
            .write_entry(Some(&mut writer), &entry, &fields);
    }
}

/// Records `tracing` fields as encoder tokens.
struct FieldVisitor<'a> {
    fields: &'a mut Encoder,
    capture_message: bool,
    message: String,
}

impl<'a> FieldVisitor<'a> {
    fn new(fields: &'a mut Encoder, capture_message: bool) -> Self {
        FieldVisitor {
            fields,
            capture_message,
            message: String::new(),
        }
    }

    fn is_message(&self, field: &Field) -> bool {
        self.capture_message && field.name() == "message"
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if self.is_message(field) {
            self.message = value.to_string();
        } else {
            self.fields.add_string(field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if self.is_message(field) {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .add_display(field.name(), &format_args!("{value:?}"));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.add_i64(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.add_u64(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.add_f64(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.add_bool(field.name(), value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.fields.add_display(field.name(), &value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_target_matches_whole_path_segments() {
        assert!(is_own_target("logfmt_encoder"));
        assert!(is_own_target("logfmt_encoder::pool"));
        assert!(!is_own_target("logfmt_encoder_ext"));
        assert!(!is_own_target("logfmt_encoder_ext::io"));
        assert!(!is_own_target("app"));
    }

    #[test]
    fn test_span_fields_are_kept_per_layer() {
        let mut stored = SpanFields::new(1, Encoder::default());
        let mut second = Encoder::default();
        second.add_i64("layer", 2);
        assert!(stored.insert(2, second).is_none());

        assert!(stored.get(1).is_some_and(Encoder::is_empty));
        assert_eq!(stored.get(2).map(Encoder::as_bytes), Some(&b"layer=2"[..]));

        assert!(stored.remove(1).is_some());
        assert!(stored.get(1).is_none());
        assert!(stored.get(2).is_some());
    }
}
