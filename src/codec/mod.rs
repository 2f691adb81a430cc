//! The decoding configuration shared by every entity of a message.
//!
//! A [`Codec`] bundles the charset manager and the transfer decoder and
//! exposes the header and address decoders built on top of them. It is
//! constructed explicitly and handed to each entity; there is no global
//! default instance.

pub mod charset;
pub mod transfer;

use crate::config::DecodingConfig;
use crate::model::address::Address;
use crate::parser::{address, header};

use charset::{CharsetManager, EncodingRsConverter, EncodingRsDetector};
use transfer::{StandardTransferDecoder, TransferDecoder};

/// Stateless decoding services; safe to share across threads.
pub struct Codec {
    charsets: CharsetManager,
    transfer: Box<dyn TransferDecoder>,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(CharsetManager::default(), Box::new(StandardTransferDecoder))
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("charsets", &self.charsets)
            .finish_non_exhaustive()
    }
}

impl Codec {
    /// Assemble a codec from explicit backends.
    pub fn new(charsets: CharsetManager, transfer: Box<dyn TransferDecoder>) -> Self {
        Self { charsets, transfer }
    }

    /// Build the default backends tuned by the `[decoding]` config section.
    pub fn from_config(config: &DecodingConfig) -> Self {
        let charsets = CharsetManager::new(Box::new(EncodingRsConverter), Box::new(EncodingRsDetector))
            .with_candidates(config.detect_candidates.clone())
            .with_transfer_encoding_fallback(config.assume_charset_from_transfer_encoding);
        Self::new(charsets, Box::new(StandardTransferDecoder))
    }

    /// The charset manager used for bodies and encoded-words.
    pub fn charsets(&self) -> &CharsetManager {
        &self.charsets
    }

    /// Reverse a content-transfer encoding.
    pub fn reverse(&self, bytes: &[u8], encoding: &str) -> Vec<u8> {
        self.transfer.reverse(bytes, encoding)
    }

    /// Convert bytes in the declared (possibly empty) charset to UTF-8.
    pub fn normalize(&self, bytes: &[u8], charset: &str) -> String {
        self.charsets.normalize(bytes, charset)
    }

    /// Convert body bytes, allowing the opt-in transfer-encoding charset guess.
    pub fn normalize_body(&self, bytes: &[u8], charset: &str, transfer_encoding: &str) -> String {
        self.charsets
            .normalize_with_hint(bytes, charset, transfer_encoding)
    }

    /// Resolve RFC 2047 encoded-words in a raw header value.
    pub fn decode_header(&self, raw: &str) -> String {
        header::decode_encoded_words(raw, &self.charsets)
    }

    /// Parse an address list and decode its display names.
    pub fn parse_addresses(&self, raw: &str) -> Vec<Address> {
        address::parse_address_list(raw)
            .into_iter()
            .map(|mut addr| {
                addr.display_name = self.decode_header(&addr.display_name);
                addr
            })
            .collect()
    }

    /// Parse an address list, leaving display names undecoded.
    pub fn parse_addresses_raw(&self, raw: &str) -> Vec<Address> {
        address::parse_address_list(raw)
    }

    /// One parameter of a structured header (`charset`, `filename`, …).
    pub fn parameter(&self, value: &str, name: &str) -> Option<String> {
        header::parameter(value, name, &self.charsets)
    }
}
