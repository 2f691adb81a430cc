//! Core data model types: structural nodes and address entries.

pub mod address;
pub mod part;
