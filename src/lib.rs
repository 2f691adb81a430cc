//! `mimeentity` — decode the headers, addresses and bodies of MIME parts.
//!
//! A message is split into part nodes (field map plus byte offsets) once.
//! Each [`Entity`] then decodes its part on demand: RFC 2047 encoded-words
//! in headers, RFC 822 address lists with groups, content-transfer
//! encodings and legacy charsets, all normalized to UTF-8.
//!
//! ```no_run
//! use mimeentity::{BackingStore, Codec, Message};
//!
//! let store = BackingStore::open("message.eml")?;
//! let message = Message::parse(store, Codec::default())?;
//! for entity in message.entities() {
//!     println!("{} {:?}", entity.id(), entity.header("subject"));
//! }
//! # Ok::<(), mimeentity::EntityError>(())
//! ```

pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod message;
pub mod middleware;
pub mod model;
pub mod parser;
pub mod store;

pub use codec::Codec;
pub use entity::Entity;
pub use error::{EntityError, Result};
pub use message::Message;
pub use middleware::Middleware;
pub use model::address::Address;
pub use model::part::{FieldValue, Fields, Offsets, PartNode};
pub use store::BackingStore;
