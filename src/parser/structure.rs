//! Structural adapter: split a raw message into part nodes.
//!
//! `mail-parser` supplies the part tree and byte offsets. Header fields are
//! re-read from the raw header block of each part so that every entity sees
//! its values exactly as written, encoded-words included.

use mail_parser::{MessageParser, PartType};
use tracing::debug;

use crate::codec::Codec;
use crate::error::{EntityError, Result};
use crate::model::part::{Fields, Offsets, PartNode};
use crate::parser::header::{decode_header_bytes, split_parameters, unfold_headers, unquote};

/// Maximum multipart nesting followed before deeper parts are dropped.
const MAX_DEPTH: usize = 10;

/// Split `raw` into part nodes in depth-first order, root first.
///
/// The root is `"1"`; children of a multipart append their 1-based position
/// (`"1.2"`, `"1.2.1"`). A nested `message/rfc822` part is a leaf. Offsets
/// are absolute positions in `raw`, including any leading mbox `From ` line.
pub fn split(raw: &[u8], codec: &Codec) -> Result<Vec<PartNode>> {
    let skip = from_line_len(raw);
    let message = MessageParser::default()
        .parse(&raw[skip..])
        .ok_or_else(|| EntityError::Structure("no message headers found".to_string()))?;

    let mut nodes = Vec::with_capacity(message.parts.len());
    let mut stack = vec![(0usize, "1".to_string(), 0usize)];

    while let Some((index, id, depth)) = stack.pop() {
        let Some(part) = message.parts.get(index) else {
            debug!(index, "Part index out of range");
            continue;
        };

        let offsets = part_offsets(
            raw,
            skip + part.offset_header as usize,
            skip + part.offset_body as usize,
            skip + part.offset_end as usize,
        );
        let header_block = slice(raw, offsets.header_start, offsets.header_end);
        let fields = Fields::from_headers(unfold_headers(&decode_header_bytes(header_block)));
        nodes.push(describe(id.clone(), fields, offsets, codec));

        if let PartType::Multipart(children) = &part.body {
            if depth >= MAX_DEPTH {
                debug!(id = %id, depth, "Multipart nesting too deep, skipping children");
                continue;
            }
            // Pushed in reverse so the first child is visited first.
            for (pos, child) in children.iter().enumerate().rev() {
                stack.push((*child as usize, format!("{id}.{}", pos + 1), depth + 1));
            }
        }
    }

    debug!(parts = nodes.len(), "Split message");
    Ok(nodes)
}

/// Build a node and derive its convenience fields from the raw headers.
///
/// A part without `Content-Type` is treated as `text/plain`.
pub fn describe(id: impl Into<String>, fields: Fields, offsets: Offsets, codec: &Codec) -> PartNode {
    let charsets = codec.charsets();
    let mut node = PartNode::new(id, fields, offsets);

    let (content_type, type_params) = node
        .fields
        .first("content-type")
        .map(|v| split_parameters(v, charsets))
        .unwrap_or_else(|| ("text/plain".to_string(), Vec::new()));
    let content_type = content_type.to_ascii_lowercase();
    node.content_type = Some(if content_type.is_empty() {
        "text/plain".to_string()
    } else {
        content_type
    });
    node.charset = find_param(&type_params, "charset");
    node.content_name = find_param(&type_params, "name");

    if let Some(value) = node.fields.first("content-disposition") {
        let (disposition, params) = split_parameters(value, charsets);
        let disposition = disposition.to_ascii_lowercase();
        node.content_disposition = (!disposition.is_empty()).then_some(disposition);
        node.disposition_filename = find_param(&params, "filename");
    }

    node.content_id = node
        .fields
        .first("content-id")
        .map(|v| unquote(v.trim()).trim_start_matches('<').trim_end_matches('>').to_string())
        .filter(|v| !v.is_empty());

    node.transfer_encoding = node
        .fields
        .first("content-transfer-encoding")
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    node
}

fn find_param(params: &[(String, String)], name: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
        .filter(|v| !v.is_empty())
}

/// Offsets for a part whose headers start at `header`, body at `body`,
/// and which ends at `end`. The header block excludes the blank separator
/// line.
fn part_offsets(raw: &[u8], header: usize, body: usize, end: usize) -> Offsets {
    let end = end.min(raw.len());
    let body = body.min(end);
    let header = header.min(body);

    let block = &raw[header..body];
    let separator = if block.ends_with(b"\n\r\n") {
        2
    } else if block.ends_with(b"\n\n") {
        1
    } else {
        0
    };
    let header_end = body - separator;

    Offsets {
        part_start: header as u64,
        part_end: end as u64,
        header_start: header as u64,
        header_end: header_end as u64,
        body_start: body as u64,
        body_end: end as u64,
        line_count: count_lines(&raw[header..end]),
        body_line_count: count_lines(&raw[body..end]),
    }
}

fn count_lines(bytes: &[u8]) -> u64 {
    let newlines = bytes.iter().filter(|&&b| b == b'\n').count() as u64;
    match bytes.last() {
        None => 0,
        Some(b'\n') => newlines,
        Some(_) => newlines + 1,
    }
}

fn slice(raw: &[u8], start: u64, end: u64) -> &[u8] {
    let end = (end as usize).min(raw.len());
    let start = (start as usize).min(end);
    &raw[start..end]
}

/// Length of a leading mbox `From ` separator line, newline included.
fn from_line_len(raw: &[u8]) -> usize {
    if !raw.starts_with(b"From ") {
        return 0;
    }
    raw.iter()
        .position(|&b| b == b'\n')
        .map_or(raw.len(), |pos| pos + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTIPART: &[u8] = b"From: a@example.com\r\n\
Subject: test\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"XX\"\r\n\
\r\n\
preamble\r\n\
--XX\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
hello\r\n\
--XX\r\n\
Content-Type: application/octet-stream; name=\"a.bin\"\r\n\
Content-Disposition: attachment; filename=\"a.bin\"\r\n\
Content-Transfer-Encoding: BASE64\r\n\
Content-ID: <part2@example.com>\r\n\
\r\n\
AAEC\r\n\
--XX--\r\n";

    #[test]
    fn test_split_multipart_ids() {
        let nodes = split(MULTIPART, &Codec::default()).unwrap();
        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["1", "1.1", "1.2"]);
        assert_eq!(nodes[0].content_type.as_deref(), Some("multipart/mixed"));
        assert_eq!(nodes[0].fields.first("subject"), Some("test"));
    }

    #[test]
    fn test_split_convenience_fields() {
        let nodes = split(MULTIPART, &Codec::default()).unwrap();
        let text = &nodes[1];
        assert_eq!(text.content_type.as_deref(), Some("text/plain"));
        assert_eq!(text.charset.as_deref(), Some("utf-8"));
        assert_eq!(text.content_disposition, None);

        let bin = &nodes[2];
        assert_eq!(bin.content_disposition.as_deref(), Some("attachment"));
        assert_eq!(bin.disposition_filename.as_deref(), Some("a.bin"));
        assert_eq!(bin.content_name.as_deref(), Some("a.bin"));
        assert_eq!(bin.transfer_encoding.as_deref(), Some("base64"));
        assert_eq!(bin.content_id.as_deref(), Some("part2@example.com"));
    }

    #[test]
    fn test_split_offsets_point_at_body() {
        let nodes = split(MULTIPART, &Codec::default()).unwrap();
        let o = nodes[1].offsets;
        let body = &MULTIPART[o.body_start as usize..o.body_end as usize];
        assert!(body.starts_with(b"hello"));
        let headers = &MULTIPART[o.header_start as usize..o.header_end as usize];
        assert!(headers.starts_with(b"Content-Type: text/plain"));
        assert!(headers.ends_with(b"charset=utf-8\r\n"));
    }

    #[test]
    fn test_split_skips_mbox_from_line() {
        let raw = b"From a@example.com Mon Jan  1 00:00:00 2024\nSubject: hi\n\nbody\n";
        let nodes = split(raw, &Codec::default()).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].fields.len(), 1);
        assert_eq!(nodes[0].content_type.as_deref(), Some("text/plain"));
        let o = nodes[0].offsets;
        assert_eq!(&raw[o.body_start as usize..o.body_end as usize], b"body\n");
        assert_eq!(&raw[o.header_start as usize..o.header_end as usize], b"Subject: hi\n");
        assert_eq!(o.body_line_count, 1);
    }

    #[test]
    fn test_describe_defaults() {
        let node = describe("1", Fields::new(), Offsets::default(), &Codec::default());
        assert_eq!(node.content_type.as_deref(), Some("text/plain"));
        assert_eq!(node.charset, None);
        assert_eq!(node.transfer_encoding, None);
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"a"), 1);
        assert_eq!(count_lines(b"a\nb\n"), 2);
        assert_eq!(count_lines(b"a\nb"), 2);
    }
}
