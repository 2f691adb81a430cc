//! Integration tests: split real message files and decode their entities.

use std::path::Path;

use chrono::{TimeZone, Utc};

use mimeentity::config::DecodingConfig;
use mimeentity::{BackingStore, Codec, Message, Middleware};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn open(name: &str) -> Message {
    Message::open(fixture(name), Codec::default()).unwrap()
}

// ─── Structure ──────────────────────────────────────────────────────

#[test]
fn test_multipart_part_ids() {
    let msg = open("multipart.eml");
    let ids: Vec<String> = msg.entities().map(|e| e.id().to_string()).collect();
    assert_eq!(ids, ["1", "1.1", "1.1.1", "1.1.2", "1.2"]);

    let types: Vec<String> = msg
        .entities()
        .map(|e| e.content_type().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        types,
        [
            "multipart/mixed",
            "multipart/alternative",
            "text/plain",
            "text/html",
            "application/octet-stream"
        ]
    );
}

// ─── Headers ────────────────────────────────────────────────────────

#[test]
fn test_root_headers_decoded() {
    let msg = open("multipart.eml");
    let root = msg.root().unwrap();
    assert_eq!(root.header("Subject").as_deref(), Some("Hola, mundo"));
    assert_eq!(
        root.header_raw("subject"),
        Some("=?UTF-8?B?SG9sYSw=?= =?UTF-8?B?IG11bmRv?=")
    );
    assert_eq!(root.header("message-id").as_deref(), Some("<m1@example.com>"));
    assert_eq!(
        root.date(),
        Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap())
    );
}

#[test]
fn test_repeated_headers() {
    let msg = open("multipart.eml");
    let root = msg.root().unwrap();
    assert_eq!(
        root.header_all("received"),
        ["by relay-a.example.com", "by relay-b.example.com"]
    );
    assert_eq!(root.header("received").as_deref(), Some("by relay-a.example.com"));
    let received: Vec<_> = root
        .headers()
        .into_iter()
        .filter(|(name, _)| name == "received")
        .collect();
    assert_eq!(received.len(), 1);
}

#[test]
fn test_addresses_with_groups() {
    let msg = open("multipart.eml");
    let root = msg.root().unwrap();

    let from = root.addresses("from");
    assert_eq!(from.len(), 1);
    assert_eq!(from[0].display_name, "José García");
    assert_eq!(from[0].address(), "jose@example.com");

    let to: Vec<String> = root.addresses("to").iter().map(|a| a.address()).collect();
    assert_eq!(to, ["alice@example.com", "bob@example.com", "carol@example.org"]);
    assert_eq!(root.addresses("to")[1].display_name, "Bob B.");

    assert!(root.addresses("cc").is_empty());
    assert!(root.addresses("bcc").is_empty());
}

// ─── Bodies ─────────────────────────────────────────────────────────

#[test]
fn test_quoted_printable_latin1_body() {
    let msg = open("multipart.eml");
    let plain = msg.entity("1.1.1").unwrap();
    assert!(plain.is_text_message("plain"));
    assert!(!plain.is_text_message("html"));
    assert_eq!(
        plain.decoded().unwrap().trim_end(),
        "Café con leche, señor.\nLínea larga continuada."
    );
    assert!(plain.body().unwrap().starts_with(b"Caf=E9"));
}

#[test]
fn test_base64_html_body() {
    let msg = open("multipart.eml");
    let html = msg.entity("1.1.2").unwrap();
    assert!(html.is_text_message("HTML"));
    assert_eq!(html.decoded().unwrap(), "<p>Café con leche</p>\n");
    assert_eq!(msg.text_body("html").unwrap().as_deref(), Some("<p>Café con leche</p>\n"));
}

#[test]
fn test_binary_attachment() {
    let msg = open("multipart.eml");
    let att = msg.entity("1.2").unwrap();
    assert!(att.is_attachment());
    assert!(!att.is_text_message("plain"));
    assert_eq!(att.content_disposition(), Some("attachment"));
    assert_eq!(att.filename().as_deref(), Some("résumé.bin"));
    assert_eq!(att.decoded_bytes().unwrap(), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_complete_body_contains_headers_and_body() {
    let msg = open("multipart.eml");
    let att = msg.entity("1.2").unwrap();
    let complete = att.complete_body().unwrap();
    let raw_headers = att.raw_headers().unwrap();
    assert!(complete.starts_with(&raw_headers));
    assert!(String::from_utf8_lossy(&complete).contains("AAECAwQF"));
}

#[test]
fn test_latin1_headers_and_detected_body() {
    let msg = open("latin1.eml");
    let root = msg.root().unwrap();
    assert_eq!(root.addresses("from")[0].display_name, "René");
    assert_eq!(root.addresses("to")[0].display_name, "André");
    assert_eq!(root.header("subject").as_deref(), Some("Résumé du jour"));
    assert_eq!(root.charset(), None);
    assert_eq!(root.decoded().unwrap(), "Déjà vu, très bien.\n");
    assert!(root.is_text_message("plain"));
}

#[test]
fn test_transfer_encoding_hint_opt_in() {
    let config = DecodingConfig {
        assume_charset_from_transfer_encoding: true,
        ..DecodingConfig::default()
    };
    let msg = Message::open(fixture("latin1.eml"), Codec::from_config(&config)).unwrap();
    assert_eq!(msg.root().unwrap().decoded().unwrap(), "Déjà vu, très bien.\n");
}

#[test]
fn test_malformed_input_degrades() {
    let msg = open("broken.eml");
    let root = msg.root().unwrap();
    assert_eq!(
        root.header("subject").as_deref(),
        Some("ok and =?bogus?X?zzz?= tail")
    );
    assert_eq!(root.charset(), Some("x-no-such-charset"));
    assert_eq!(root.transfer_encoding(), Some("x-custom"));
    assert_eq!(root.decoded().unwrap(), "plain \u{FFFD} bytes\n");
    let from = root.addresses("from");
    assert_eq!(from.len(), 1);
    assert_eq!(from[0].display_name, "Broken");
    assert_eq!(from[0].address(), "broken@example.com");
}

// ─── Backing store variants ─────────────────────────────────────────

#[test]
fn test_stream_and_buffer_agree() {
    let streamed = Message::open(fixture("multipart.eml"), Codec::default()).unwrap();
    let bytes = std::fs::read(fixture("multipart.eml")).unwrap();
    let buffered = Message::parse(BackingStore::from_bytes(bytes), Codec::default()).unwrap();
    for (a, b) in streamed.entities().zip(buffered.entities()) {
        assert_eq!(a.id(), b.id());
        assert_eq!(a.decoded_bytes().unwrap(), b.decoded_bytes().unwrap());
    }
}

#[test]
fn test_out_of_order_reads_on_stream() {
    let msg = open("multipart.eml");
    let last = msg.entity("1.2").unwrap().decoded_bytes().unwrap();
    let first = msg.entity("1.1.1").unwrap().body().unwrap().into_owned();
    let last_again = msg.entity("1.2").unwrap().decoded_bytes().unwrap();
    assert_eq!(last, last_again);
    assert!(first.starts_with(b"Caf=E9"));
}

#[test]
fn test_in_memory_store_matches_file() {
    let bytes = std::fs::read(fixture("multipart.eml")).unwrap();
    let from_memory = Message::parse(BackingStore::from_bytes(bytes), Codec::default()).unwrap();
    let from_file = open("multipart.eml");
    assert_eq!(from_memory.nodes(), from_file.nodes());
}

#[test]
fn test_missing_file() {
    let err = Message::open(fixture("nope.eml"), Codec::default()).unwrap_err();
    assert!(err.is_store_error());
}

// ─── Middleware ─────────────────────────────────────────────────────

#[test]
fn test_middleware_rewrites_subject() {
    let middleware = Middleware::new().with(|mut entity| {
        if let Some(subject) = entity.header("subject") {
            entity.replace_field("subject", subject.to_uppercase());
        }
        entity
    });
    let msg = open("multipart.eml").with_middleware(middleware);
    let root = msg.root().unwrap().parse();
    assert_eq!(root.header("subject").as_deref(), Some("HOLA, MUNDO"));
    // Unparsed views still see the stored value.
    assert_eq!(msg.root().unwrap().header("subject").as_deref(), Some("Hola, mundo"));
}

#[test]
fn test_entities_decode_across_threads() {
    let msg = open("multipart.eml");
    std::thread::scope(|scope| {
        let handles: Vec<_> = msg
            .nodes()
            .iter()
            .map(|node| {
                let id = node.id.clone();
                let msg = &msg;
                scope.spawn(move || msg.entity(&id).unwrap().decoded_bytes().unwrap().len())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });
}
