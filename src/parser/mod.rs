//! Parsing: header values, address lists, and the structural adapter.

pub mod address;
pub mod header;
pub mod structure;
