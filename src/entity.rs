//! The entity facade: decoded views over one structural node.
//!
//! An [`Entity`] owns a copy of its node's fields and offsets and borrows
//! the message's backing store and codec. Header and address accessors never
//! touch the store; body accessors read their byte range on every call.

use std::borrow::Cow;

use chrono::{DateTime, Utc};

use crate::codec::Codec;
use crate::error::Result;
use crate::middleware::Middleware;
use crate::model::address::Address;
use crate::model::part::{FieldValue, Fields, Offsets, PartNode};
use crate::parser::header::parse_date;
use crate::store::BackingStore;

/// One MIME part, decoded on demand.
#[derive(Debug, Clone)]
pub struct Entity<'m> {
    node: PartNode,
    store: &'m BackingStore,
    codec: &'m Codec,
    middleware: Option<&'m Middleware>,
}

impl<'m> Entity<'m> {
    /// Attach a structural node to its message's store and codec.
    pub fn new(node: PartNode, store: &'m BackingStore, codec: &'m Codec) -> Self {
        Self {
            node,
            store,
            codec,
            middleware: None,
        }
    }

    /// Attach the hooks that [`parse`](Self::parse) runs.
    pub fn with_middleware(mut self, middleware: &'m Middleware) -> Self {
        self.middleware = Some(middleware);
        self
    }

    /// Run the attached middleware over this entity and return its result.
    /// Without middleware the entity comes back unchanged.
    pub fn parse(self) -> Entity<'m> {
        match self.middleware {
            Some(middleware) => middleware.apply(self),
            None => self,
        }
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn node(&self) -> &PartNode {
        &self.node
    }

    pub fn offsets(&self) -> Offsets {
        self.node.offsets
    }

    pub fn codec(&self) -> &'m Codec {
        self.codec
    }

    // ── Field accessors ─────────────────────────────────────────────

    pub fn content_type(&self) -> Option<&str> {
        self.node.content_type.as_deref()
    }

    pub fn content_disposition(&self) -> Option<&str> {
        self.node.content_disposition.as_deref()
    }

    pub fn disposition_filename(&self) -> Option<&str> {
        self.node.disposition_filename.as_deref()
    }

    pub fn content_name(&self) -> Option<&str> {
        self.node.content_name.as_deref()
    }

    pub fn content_id(&self) -> Option<&str> {
        self.node.content_id.as_deref()
    }

    pub fn charset(&self) -> Option<&str> {
        self.node.charset.as_deref()
    }

    pub fn transfer_encoding(&self) -> Option<&str> {
        self.node.transfer_encoding.as_deref()
    }

    /// A copy of one raw field value.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        self.node.fields.get(name).cloned()
    }

    /// A copy of every raw field.
    pub fn fields(&self) -> Fields {
        self.node.fields.clone()
    }

    /// Replace one field wholesale. Convenience fields derived at
    /// construction time are not recomputed.
    pub fn replace_field(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.node.fields.replace(name, value.into());
    }

    // ── Headers ─────────────────────────────────────────────────────

    /// Every header as `(name, first raw value)`, in stored order.
    pub fn headers_raw(&self) -> Vec<(String, String)> {
        self.node
            .fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.first().to_string()))
            .collect()
    }

    /// Every header as `(name, first decoded value)`, in stored order.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.node
            .fields
            .iter()
            .map(|(name, value)| (name.to_string(), self.codec.decode_header(value.first())))
            .collect()
    }

    /// First raw value of a header (case-insensitive).
    pub fn header_raw(&self, name: &str) -> Option<&str> {
        self.node.fields.first(name)
    }

    /// First value of a header with encoded-words resolved.
    pub fn header(&self, name: &str) -> Option<String> {
        self.header_raw(name).map(|raw| self.codec.decode_header(raw))
    }

    /// Every occurrence of a header, decoded, in order.
    pub fn header_all(&self, name: &str) -> Vec<String> {
        self.node
            .fields
            .get(name)
            .map(|value| {
                value
                    .all()
                    .into_iter()
                    .map(|raw| self.codec.decode_header(raw))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Address list of a header with decoded display names; empty when the
    /// header is missing.
    pub fn addresses(&self, name: &str) -> Vec<Address> {
        self.header_raw(name)
            .map(|raw| self.codec.parse_addresses(raw))
            .unwrap_or_default()
    }

    /// Address list of a header with display names left as written.
    pub fn addresses_raw(&self, name: &str) -> Vec<Address> {
        self.header_raw(name)
            .map(|raw| self.codec.parse_addresses_raw(raw))
            .unwrap_or_default()
    }

    /// Parsed `Date` header in UTC.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.header_raw("date").and_then(parse_date)
    }

    // ── Bodies ──────────────────────────────────────────────────────

    /// Raw body bytes, still transfer-encoded.
    pub fn body(&self) -> Result<Cow<'m, [u8]>> {
        let o = &self.node.offsets;
        self.store.read_range(o.body_start, o.body_end)
    }

    /// The whole part: headers, separator and body.
    pub fn complete_body(&self) -> Result<Cow<'m, [u8]>> {
        let o = &self.node.offsets;
        self.store.read_range(o.part_start, o.part_end)
    }

    /// The raw header block.
    pub fn raw_headers(&self) -> Result<Cow<'m, [u8]>> {
        let o = &self.node.offsets;
        self.store.read_range(o.header_start, o.header_end)
    }

    /// Body with the transfer encoding reversed; suitable for attachments.
    pub fn decoded_bytes(&self) -> Result<Vec<u8>> {
        let body = self.body()?;
        Ok(self
            .codec
            .reverse(&body, self.transfer_encoding().unwrap_or_default()))
    }

    /// Body as UTF-8 text: transfer encoding reversed, then charset
    /// normalized.
    pub fn decoded(&self) -> Result<String> {
        let bytes = self.decoded_bytes()?;
        Ok(self.codec.normalize_body(
            &bytes,
            self.charset().unwrap_or_default(),
            self.transfer_encoding().unwrap_or_default(),
        ))
    }

    // ── Classification ──────────────────────────────────────────────

    /// `true` for an inline (or undispositioned) `text/<subtype>` part.
    pub fn is_text_message(&self, subtype: &str) -> bool {
        let inline = match self.content_disposition() {
            None => true,
            Some(d) => d.is_empty() || d.eq_ignore_ascii_case("inline"),
        };
        let expected = format!("text/{subtype}");
        inline
            && self
                .content_type()
                .is_some_and(|ct| ct.eq_ignore_ascii_case(&expected))
    }

    /// `true` for an explicit attachment or any part carrying a filename.
    pub fn is_attachment(&self) -> bool {
        self.content_disposition()
            .is_some_and(|d| d.eq_ignore_ascii_case("attachment"))
            || self.disposition_filename().is_some()
    }

    /// Decoded file name: the disposition `filename`, else the type `name`.
    pub fn filename(&self) -> Option<String> {
        self.disposition_filename()
            .or(self.content_name())
            .map(|raw| self.codec.decode_header(raw))
    }
}
