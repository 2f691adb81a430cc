//! One parsed message: its backing store, decoding configuration and part
//! nodes, handing out borrowed [`Entity`] views.

use std::path::Path;

use tracing::info;

use crate::codec::Codec;
use crate::entity::Entity;
use crate::error::Result;
use crate::middleware::Middleware;
use crate::model::part::PartNode;
use crate::parser::structure;
use crate::store::BackingStore;

/// A message split into parts, ready for decoding.
#[derive(Debug)]
pub struct Message {
    store: BackingStore,
    codec: Codec,
    middleware: Option<Middleware>,
    nodes: Vec<PartNode>,
}

impl Message {
    /// Split the store's content into parts.
    pub fn parse(store: BackingStore, codec: Codec) -> Result<Self> {
        let nodes = {
            let raw = store.read_all()?;
            structure::split(&raw, &codec)?
        };
        info!(path = %store.path().display(), parts = nodes.len(), "Parsed message");
        Ok(Self::from_parts(store, codec, nodes))
    }

    /// Open a file as a stream-backed store and split it.
    pub fn open(path: impl AsRef<Path>, codec: Codec) -> Result<Self> {
        Self::parse(BackingStore::open(path)?, codec)
    }

    /// Bundle nodes produced by some other structural parser.
    pub fn from_parts(store: BackingStore, codec: Codec, nodes: Vec<PartNode>) -> Self {
        Self {
            store,
            codec,
            middleware: None,
            nodes,
        }
    }

    /// Attach hooks that every entity from this message runs on `parse`.
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middleware = Some(middleware);
        self
    }

    pub fn store(&self) -> &BackingStore {
        &self.store
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn nodes(&self) -> &[PartNode] {
        &self.nodes
    }

    /// Entity views over every part, root first.
    pub fn entities(&self) -> impl Iterator<Item = Entity<'_>> {
        self.nodes.iter().map(|node| self.view(node))
    }

    /// The entity with the given id.
    pub fn entity(&self, id: &str) -> Option<Entity<'_>> {
        self.nodes
            .iter()
            .find(|node| node.id == id)
            .map(|node| self.view(node))
    }

    /// The root entity (the message headers).
    pub fn root(&self) -> Option<Entity<'_>> {
        self.nodes.first().map(|node| self.view(node))
    }

    /// Decoded text of the first inline `text/<subtype>` part.
    pub fn text_body(&self, subtype: &str) -> Result<Option<String>> {
        self.entities()
            .find(|entity| entity.is_text_message(subtype))
            .map(|entity| entity.decoded())
            .transpose()
    }

    fn view<'m>(&'m self, node: &PartNode) -> Entity<'m> {
        let entity = Entity::new(node.clone(), &self.store, &self.codec);
        match &self.middleware {
            Some(middleware) => entity.with_middleware(middleware),
            None => entity,
        }
    }
}
