//! Charset normalization: declared or sniffed legacy charsets → UTF-8.
//!
//! Conversion and detection sit behind the [`Converter`] and [`Detector`]
//! traits so a higher-fidelity backend can replace the `encoding_rs` ones
//! without touching the pipeline.

use encoding_rs::Encoding;
use tracing::{debug, warn};

/// Detection candidates, tried in order.
pub const DEFAULT_CANDIDATES: [&str; 4] = ["windows-1252", "iso-8859-1", "gb2312", "gb18030"];

/// Converts bytes in a named charset to UTF-8.
pub trait Converter: Send + Sync {
    /// Returns `None` when the charset is unsupported or conversion fails.
    fn convert(&self, bytes: &[u8], charset: &str) -> Option<String>;
}

/// Guesses the charset of bytes that are not valid UTF-8.
pub trait Detector: Send + Sync {
    /// Return the first candidate label that can represent `bytes`.
    fn detect(&self, bytes: &[u8], candidates: &[String]) -> Option<String>;
}

/// [`Converter`] backed by the WHATWG encodings in `encoding_rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingRsConverter;

impl Converter for EncodingRsConverter {
    fn convert(&self, bytes: &[u8], charset: &str) -> Option<String> {
        let encoding = lookup(charset)?;
        let (decoded, had_errors) = encoding.decode_without_bom_handling(bytes);
        if had_errors {
            debug!(charset, "Charset conversion replaced malformed sequences");
        }
        Some(decoded.into_owned())
    }
}

/// [`Detector`] that accepts the first candidate decoding without errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingRsDetector;

impl Detector for EncodingRsDetector {
    fn detect(&self, bytes: &[u8], candidates: &[String]) -> Option<String> {
        candidates
            .iter()
            .find(|label| {
                lookup(label).is_some_and(|enc| {
                    enc.decode_without_bom_handling_and_without_replacement(bytes)
                        .is_some()
                })
            })
            .cloned()
    }
}

/// Resolve a label, treating the WHATWG "replacement" encoding as unknown.
fn lookup(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.as_bytes()).filter(|enc| *enc != encoding_rs::REPLACEMENT)
}

/// Turns body and header bytes into UTF-8 text.
///
/// Never fails: when nothing can convert the bytes, they come back through
/// a lossy UTF-8 reading.
pub struct CharsetManager {
    converter: Box<dyn Converter>,
    detector: Box<dyn Detector>,
    candidates: Vec<String>,
    assume_from_transfer_encoding: bool,
}

impl Default for CharsetManager {
    fn default() -> Self {
        Self::new(Box::new(EncodingRsConverter), Box::new(EncodingRsDetector))
    }
}

impl std::fmt::Debug for CharsetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharsetManager")
            .field("candidates", &self.candidates)
            .field(
                "assume_from_transfer_encoding",
                &self.assume_from_transfer_encoding,
            )
            .finish_non_exhaustive()
    }
}

impl CharsetManager {
    /// Build a manager from explicit backends and the default candidates.
    pub fn new(converter: Box<dyn Converter>, detector: Box<dyn Detector>) -> Self {
        Self {
            converter,
            detector,
            candidates: DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            assume_from_transfer_encoding: false,
        }
    }

    /// Replace the ordered detection candidates.
    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Enable the transfer-encoding charset guess used by
    /// [`normalize_with_hint`](Self::normalize_with_hint).
    pub fn with_transfer_encoding_fallback(mut self, enabled: bool) -> Self {
        self.assume_from_transfer_encoding = enabled;
        self
    }

    /// Ordered detection candidates.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Convert `bytes` to UTF-8 given the declared charset (possibly empty).
    ///
    /// An empty or UTF-8 declaration keeps valid UTF-8 as-is and sniffs
    /// anything else. Any other declaration is trusted over the content.
    pub fn normalize(&self, bytes: &[u8], declared: &str) -> String {
        let label = clean_label(declared);

        if label.is_empty() || is_utf8_label(&label) {
            if let Ok(text) = std::str::from_utf8(bytes) {
                return text.to_owned();
            }
            return match self.detect(bytes) {
                Some(detected) => self.convert_or_fallback(bytes, &detected),
                None => {
                    warn!("No candidate charset accepted the bytes, decoding lossily");
                    String::from_utf8_lossy(bytes).into_owned()
                }
            };
        }

        self.convert_or_fallback(bytes, &label)
    }

    /// Like [`normalize`](Self::normalize), but when no charset is declared
    /// and the fallback is enabled, guess one from the transfer encoding:
    /// `8bit` → windows-1252, `7bit` → iso-8859-1.
    pub fn normalize_with_hint(&self, bytes: &[u8], declared: &str, transfer_encoding: &str) -> String {
        if self.assume_from_transfer_encoding && clean_label(declared).is_empty() {
            if let Some(assumed) = charset_for_transfer_encoding(transfer_encoding) {
                debug!(assumed, transfer_encoding, "Assuming charset from transfer encoding");
                return self.normalize(bytes, assumed);
            }
        }
        self.normalize(bytes, declared)
    }

    /// Run detection over the configured candidates.
    ///
    /// `iso-8859-1` is reported as its superset `windows-1252`, which is what
    /// mislabeled mail almost always is.
    pub fn detect(&self, bytes: &[u8]) -> Option<String> {
        let detected = self.detector.detect(bytes, &self.candidates)?;
        if detected.eq_ignore_ascii_case("iso-8859-1") {
            Some("windows-1252".to_string())
        } else {
            Some(detected)
        }
    }

    fn convert_or_fallback(&self, bytes: &[u8], charset: &str) -> String {
        match self.converter.convert(bytes, charset) {
            Some(text) => text,
            None => {
                warn!(charset, "Unsupported charset, keeping original bytes");
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
    }
}

/// The weak charset guess implied by a transfer encoding.
pub fn charset_for_transfer_encoding(transfer_encoding: &str) -> Option<&'static str> {
    match transfer_encoding.trim().to_ascii_lowercase().as_str() {
        "8bit" => Some("windows-1252"),
        "7bit" => Some("iso-8859-1"),
        _ => None,
    }
}

/// Trim quotes and whitespace, drop an RFC 2231 language suffix, lowercase.
fn clean_label(label: &str) -> String {
    let label = label.trim().trim_matches(|c| c == '"' || c == '\'');
    let label = label.split('*').next().unwrap_or("");
    label.trim().to_ascii_lowercase()
}

fn is_utf8_label(label: &str) -> bool {
    label == "utf-8" || label == "utf8"
}
