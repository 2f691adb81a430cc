//! Backing store: the shared raw byte source underlying one parsed message.

pub mod backing;

pub use backing::BackingStore;
