//! Content-Transfer-Encoding reversal (RFC 2045 §6).
//!
//! Decoding is permissive: stray characters in base64 are skipped and
//! malformed quoted-printable escapes are kept literally. Unknown encodings
//! pass the bytes through untouched.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::warn;

/// Base64 engine that accepts missing padding and non-zero trailing bits.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Reverses a content-transfer encoding.
///
/// Implementations must never fail: an encoding they do not understand
/// degrades to returning the input unchanged.
pub trait TransferDecoder: Send + Sync {
    /// Decode `bytes` that were encoded with the named transfer encoding.
    fn reverse(&self, bytes: &[u8], encoding: &str) -> Vec<u8>;
}

/// The transfer encodings this crate knows how to reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
    /// `7bit`, `8bit`, `binary`, empty, and anything unrecognized.
    Identity,
}

impl TransferEncoding {
    /// Classify a `Content-Transfer-Encoding` value (case-insensitive).
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "" | "7bit" | "8bit" | "binary" => Self::Identity,
            other => {
                warn!(encoding = other, "Unknown transfer encoding, passing through");
                Self::Identity
            }
        }
    }
}

/// Default decoder: base64, quoted-printable, identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTransferDecoder;

impl TransferDecoder for StandardTransferDecoder {
    fn reverse(&self, bytes: &[u8], encoding: &str) -> Vec<u8> {
        match TransferEncoding::from_label(encoding) {
            TransferEncoding::Base64 => decode_base64(bytes),
            TransferEncoding::QuotedPrintable => decode_quoted_printable(bytes),
            TransferEncoding::Identity => bytes.to_vec(),
        }
    }
}

/// Decode base64, ignoring every byte outside the standard alphabet.
///
/// Padding splits the input into independently decoded chunks, so bodies
/// made of several concatenated base64 blobs still decode.
pub fn decode_base64(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 3 / 4);
    let mut chunk = Vec::with_capacity(input.len());

    for &b in input {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'/' => chunk.push(b),
            b'=' => flush_base64_chunk(&mut chunk, &mut out),
            _ => {}
        }
    }
    flush_base64_chunk(&mut chunk, &mut out);
    out
}

fn flush_base64_chunk(chunk: &mut Vec<u8>, out: &mut Vec<u8>) {
    // A single leftover sextet cannot encode a byte.
    if chunk.len() % 4 == 1 {
        chunk.pop();
    }
    if chunk.is_empty() {
        return;
    }
    if let Err(e) = LENIENT_BASE64.decode_vec(&chunk[..], out) {
        warn!(error = %e, "Dropping undecodable base64 chunk");
    }
    chunk.clear();
}

/// Decode quoted-printable (RFC 2045 §6.7).
///
/// `=XX` becomes the byte `0xXX`; `=` at the end of a line (optionally
/// followed by trailing whitespace) is a soft line break. Anything else
/// after `=` is kept as-is.
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let b = input[i];
        if b != b'=' {
            out.push(b);
            i += 1;
            continue;
        }

        if let Some(skip) = soft_break_len(&input[i + 1..]) {
            i += 1 + skip;
            continue;
        }

        match (input.get(i + 1), input.get(i + 2)) {
            (Some(&hi), Some(&lo)) => match (hex_value(hi), hex_value(lo)) {
                (Some(hi), Some(lo)) => {
                    out.push((hi << 4) | lo);
                    i += 3;
                }
                _ => {
                    out.push(b'=');
                    i += 1;
                }
            },
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }

    out
}

/// Length of a soft line break following `=`: optional spaces/tabs, then
/// `\r\n`, `\n`, or end of input.
fn soft_break_len(rest: &[u8]) -> Option<usize> {
    let ws = rest
        .iter()
        .take_while(|&&b| b == b' ' || b == b'\t')
        .count();
    match &rest[ws..] {
        [b'\r', b'\n', ..] => Some(ws + 2),
        [b'\n', ..] => Some(ws + 1),
        [] => Some(ws),
        _ => None,
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}
