//! Property tests for the decoding pipeline.

use base64::Engine;
use proptest::prelude::*;

use mimeentity::codec::charset::CharsetManager;
use mimeentity::model::part::{Fields, Offsets, PartNode};
use mimeentity::{BackingStore, Codec, Entity};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 1024,
        ..ProptestConfig::default()
    })]

    #[test]
    fn read_range_is_exact_or_empty(
        data in proptest::collection::vec(any::<u8>(), 0..256),
        start in 0u64..300,
        end in 0u64..300,
    ) {
        let store = BackingStore::from_bytes(data.clone());
        let got = store.read_range(start, end).unwrap();
        if start >= end {
            prop_assert!(got.is_empty());
        } else {
            let len = data.len() as u64;
            let (s, e) = (start.min(len) as usize, end.min(len) as usize);
            prop_assert_eq!(&*got, &data[s..e]);
        }
    }

    #[test]
    fn normalize_keeps_valid_utf8(text in any::<String>()) {
        let charsets = CharsetManager::default();
        prop_assert_eq!(charsets.normalize(text.as_bytes(), "utf-8"), text.clone());
        prop_assert_eq!(charsets.normalize(text.as_bytes(), ""), text);
    }

    #[test]
    fn normalize_changes_invalid_utf8(bytes in proptest::collection::vec(any::<u8>(), 1..64)) {
        prop_assume!(std::str::from_utf8(&bytes).is_err());
        let text = CharsetManager::default().normalize(&bytes, "utf-8");
        prop_assert_ne!(text.as_bytes(), &bytes[..]);
    }

    #[test]
    fn base64_reverse_recovers_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        // Wrap the way mail bodies are wrapped.
        let wrapped: Vec<u8> = encoded
            .as_bytes()
            .chunks(76)
            .flat_map(|line| line.iter().copied().chain(*b"\r\n"))
            .collect();
        prop_assert_eq!(Codec::default().reverse(&wrapped, "Base64"), bytes);
    }

    #[test]
    fn header_without_encoded_words_is_untouched(header in "[ -~]*") {
        prop_assume!(!contains_encoded_word(&header));
        prop_assert_eq!(Codec::default().decode_header(&header), header);
    }

    #[test]
    fn near_miss_words_are_untouched(
        charset in "[a-z0-9-]{0,8}",
        encoding in "[A-Za-z ]",
        payload in "[ -~]{0,12}",
        tail in "(\\?=)?",
    ) {
        let header = format!("x =?{charset}?{encoding}?{payload}{tail} y");
        prop_assume!(!contains_encoded_word(&header));
        prop_assert_eq!(Codec::default().decode_header(&header), header);
    }

    #[test]
    fn address_parser_never_panics(raw in any::<String>()) {
        let _ = Codec::default().parse_addresses(&raw);
    }

    #[test]
    fn entity_body_never_fails_on_inverted_offsets(
        data in proptest::collection::vec(any::<u8>(), 0..128),
        start in 0u64..200,
        end in 0u64..200,
    ) {
        let store = BackingStore::from_bytes(data);
        let codec = Codec::default();
        let offsets = Offsets {
            body_start: start,
            body_end: end,
            ..Offsets::default()
        };
        let entity = Entity::new(PartNode::new("1", Fields::new(), offsets), &store, &codec);
        prop_assert!(entity.decoded().is_ok());
    }
}

/// `true` if `s` holds a complete `=?charset?B|Q?payload?=` token.
fn contains_encoded_word(s: &str) -> bool {
    let no_delims = |t: &str| !t.is_empty() && !t.contains(|c: char| c == '?' || c.is_whitespace());
    s.match_indices("=?").any(|(start, _)| {
        let rest = &s[start + 2..];
        let mut fields = rest.splitn(3, '?');
        let (Some(charset), Some(encoding), Some(tail)) = (fields.next(), fields.next(), fields.next())
        else {
            return false;
        };
        let Some(end) = tail.find("?=") else {
            return false;
        };
        let payload = &tail[..end];
        no_delims(charset)
            && matches!(encoding, "B" | "b" | "Q" | "q")
            && (payload.is_empty() || no_delims(payload))
    })
}

#[test]
fn headers_with_stray_markers_are_untouched() {
    let codec = Codec::default();
    for header in ["50% = deal?", "=?", "a =? b", "=?utf-8?", "x=?y?z", "?= =?"] {
        assert_eq!(codec.decode_header(header), header);
    }
}

#[test]
fn adjacent_and_isolated_words() {
    let codec = Codec::default();
    assert_eq!(
        codec.decode_header("=?utf-8?Q?Hello?= =?utf-8?Q?World?="),
        "HelloWorld"
    );
    assert_eq!(codec.decode_header("=?utf-8?Q?Hello?= World"), "Hello World");
    assert_eq!(codec.decode_header("=?utf-8?Q?broken"), "=?utf-8?Q?broken");
}

#[test]
fn windows_1252_e_acute() {
    assert_eq!(Codec::default().normalize(&[0xE9], "windows-1252"), "é");
}
