//! Header value decoding: folding, encoded-words (RFC 2047), parameters
//! (RFC 2045 / RFC 2231) and dates.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use crate::codec::charset::CharsetManager;
use crate::codec::transfer::decode_base64;

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Whitespace between two adjacent encoded-words is dropped (RFC 2047 §6.2);
/// whitespace next to ordinary text is kept. Anything that does not parse as
/// an encoded-word is copied through literally.
pub fn decode_encoded_words(input: &str, charsets: &CharsetManager) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];

        match EncodedWord::parse(&remaining[start..]) {
            Some(word) => {
                if !(last_was_encoded && is_folding_whitespace(before)) {
                    result.push_str(before);
                }
                result.push_str(&word.decode(charsets));
                remaining = &remaining[start + word.len..];
                last_was_encoded = true;
            }
            None => {
                result.push_str(before);
                result.push_str("=?");
                remaining = &remaining[start + 2..];
                last_was_encoded = false;
            }
        }
    }

    result.push_str(remaining);
    result
}

/// One `=?charset?encoding?payload?=` token.
#[derive(Debug, PartialEq)]
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: u8,
    payload: &'a str,
    /// Byte length of the whole token including delimiters.
    len: usize,
}

impl<'a> EncodedWord<'a> {
    /// Parse an encoded-word at the very start of `s`.
    fn parse(s: &'a str) -> Option<Self> {
        let body = s.strip_prefix("=?")?;

        let charset_end = body.find('?')?;
        let charset = &body[..charset_end];
        if charset.is_empty() || charset.contains(char::is_whitespace) {
            return None;
        }

        let rest = &body[charset_end + 1..];
        let encoding = match rest.as_bytes() {
            [e @ (b'B' | b'b' | b'Q' | b'q'), b'?', ..] => e.to_ascii_uppercase(),
            _ => return None,
        };

        let payload_area = &rest[2..];
        let payload_end = payload_area.find("?=")?;
        let payload = &payload_area[..payload_end];
        if payload.contains(|c: char| c == '?' || c.is_whitespace()) {
            return None;
        }

        Some(Self {
            charset,
            encoding,
            payload,
            len: 2 + charset_end + 1 + 2 + payload_end + 2,
        })
    }

    fn decode(&self, charsets: &CharsetManager) -> String {
        let bytes = match self.encoding {
            b'B' => decode_base64(self.payload.as_bytes()),
            _ => decode_q(self.payload),
        };
        charsets.normalize(&bytes, self.charset)
    }
}

/// Q encoding (RFC 2047 §4.2): `_` is a space and `=XX` a hex byte. There
/// are no soft line breaks; an `=` not followed by two hex digits stays.
fn decode_q(payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' => match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&hi), Some(&lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                    out.push(hex_digit(hi) << 4 | hex_digit(lo));
                    i += 3;
                    continue;
                }
                _ => out.push(b'='),
            },
            b => out.push(b),
        }
        i += 1;
    }
    out
}

fn is_folding_whitespace(s: &str) -> bool {
    s.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

/// Decode a raw header block to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold a header block: continuation lines (starting with space or tab)
/// are joined onto the previous header.
///
/// Returns `(lowercase_name, raw_value)` pairs in block order.
pub fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                let continuation = line.trim();
                if !continuation.is_empty() {
                    if !last.1.is_empty() {
                        last.1.push(' ');
                    }
                    last.1.push_str(continuation);
                }
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            if name.is_empty() || name.contains(char::is_whitespace) {
                debug!(line, "Skipping malformed header line");
                continue;
            }
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
    }

    result
}

/// Split a structured header value into its main value and parameters.
///
/// `text/plain; charset="utf-8"; format=flowed` →
/// `("text/plain", [("charset", "utf-8"), ("format", "flowed")])`.
/// Parameter names are lowercased; RFC 2231 continuations (`name*0`,
/// `name*1`) are joined and extended values (`name*=utf-8''%E2%82%AC`) are
/// percent-decoded.
pub fn split_parameters(value: &str, charsets: &CharsetManager) -> (String, Vec<(String, String)>) {
    let mut segments = split_unquoted(value, ';').into_iter();
    let main = segments.next().unwrap_or_default().trim().to_string();

    let mut raw: Vec<RawParam> = Vec::new();
    for segment in segments {
        let Some((name, val)) = segment.split_once('=') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        raw.push(RawParam::new(&name, unquote(val.trim())));
    }

    (main, merge_rfc2231(raw, charsets))
}

/// Look up a single parameter of a structured header value.
pub fn parameter(value: &str, name: &str, charsets: &CharsetManager) -> Option<String> {
    let (_, params) = split_parameters(value, charsets);
    params
        .into_iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

struct RawParam {
    base: String,
    section: Option<u32>,
    extended: bool,
    value: String,
}

impl RawParam {
    fn new(name: &str, value: String) -> Self {
        let (name, extended) = match name.strip_suffix('*') {
            Some(stripped) => (stripped, true),
            None => (name, false),
        };
        let (base, section) = match name.split_once('*') {
            Some((base, n)) => match n.parse::<u32>() {
                Ok(n) => (base, Some(n)),
                Err(_) => (name, None),
            },
            None => (name, None),
        };
        Self {
            base: base.to_string(),
            section,
            extended,
            value,
        }
    }
}

fn merge_rfc2231(raw: Vec<RawParam>, charsets: &CharsetManager) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = Vec::new();
    let mut names: Vec<&str> = Vec::new();
    for p in &raw {
        if !names.contains(&p.base.as_str()) {
            names.push(&p.base);
        }
    }

    for name in names {
        let mut parts: Vec<&RawParam> = raw.iter().filter(|p| p.base == name).collect();
        // A plain `name=` wins over sections if both are present.
        if let Some(plain) = parts.iter().find(|p| p.section.is_none() && !p.extended) {
            merged.push((name.to_string(), plain.value.clone()));
            continue;
        }
        parts.sort_by_key(|p| p.section.unwrap_or(0));

        let mut charset = String::new();
        let mut bytes: Vec<u8> = Vec::new();
        for (i, part) in parts.iter().enumerate() {
            if !part.extended {
                bytes.extend_from_slice(part.value.as_bytes());
                continue;
            }
            let mut value = part.value.as_str();
            if i == 0 {
                let mut pieces = value.splitn(3, '\'');
                if let (Some(cs), Some(_lang), Some(rest)) =
                    (pieces.next(), pieces.next(), pieces.next())
                {
                    charset = cs.to_string();
                    value = rest;
                }
            }
            bytes.extend(percent_decode(value));
        }
        merged.push((name.to_string(), charsets.normalize(&bytes, &charset)));
    }

    merged
}

fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
            if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                out.push(hex_digit(hi) << 4 | hex_digit(lo));
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn hex_digit(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// Split on `sep` outside double-quoted strings.
fn split_unquoted(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                escaped = true;
                current.push(ch);
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            c if c == sep && !in_quotes => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Strip surrounding double quotes and resolve backslash escapes.
pub fn unquote(s: &str) -> String {
    let Some(inner) = s.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
        return s.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Parse an email date in RFC 2822, RFC 3339, or a common broken variant.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // Drop a trailing "(CET)" style comment and a leading day-of-week.
    let without_comment = match trimmed.find('(') {
        Some(pos) => trimmed[..pos].trim_end(),
        None => trimmed,
    };
    let without_dow = match without_comment.split_once(',') {
        Some((dow, rest)) if dow.len() <= 9 && dow.chars().all(char::is_alphabetic) => rest.trim(),
        _ => without_comment,
    };
    let candidate = replace_named_tz(without_dow);

    const FORMATS: [&str; 4] = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%Y-%m-%d %H:%M:%S %z",
        "%d-%b-%Y %H:%M:%S %z",
    ];
    const NAIVE_FORMATS: [&str; 3] = ["%d %b %Y %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%d-%b-%Y %H:%M:%S"];

    for fmt in FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&candidate, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&candidate, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    debug!(date = trimmed, "Could not parse date");
    None
}

/// Replace a trailing timezone abbreviation with its numeric offset.
fn replace_named_tz(s: &str) -> String {
    const ZONES: [(&str, &str); 12] = [
        ("UT", "+0000"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("CET", "+0100"),
    ];
    if let Some((head, zone)) = s.rsplit_once(' ') {
        if let Some((_, offset)) = ZONES.iter().find(|(name, _)| zone.eq_ignore_ascii_case(name)) {
            return format!("{head} {offset}");
        }
    }
    s.to_string()
}
