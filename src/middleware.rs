//! Post-processing hooks applied to an entity by [`Entity::parse`].
//!
//! A [`Middleware`] is an ordered list of functions; each receives the
//! entity produced by the previous one.

use crate::entity::Entity;

type Layer = Box<dyn for<'m> Fn(Entity<'m>) -> Entity<'m> + Send + Sync>;

/// Ordered composition of entity transformations.
#[derive(Default)]
pub struct Middleware {
    layers: Vec<Layer>,
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl Middleware {
    /// An empty stack; applying it returns the entity unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer, builder style.
    pub fn with<F>(mut self, layer: F) -> Self
    where
        F: for<'m> Fn(Entity<'m>) -> Entity<'m> + Send + Sync + 'static,
    {
        self.push(layer);
        self
    }

    /// Append a layer.
    pub fn push<F>(&mut self, layer: F)
    where
        F: for<'m> Fn(Entity<'m>) -> Entity<'m> + Send + Sync + 'static,
    {
        self.layers.push(Box::new(layer));
    }

    /// Run every layer in insertion order.
    pub fn apply<'m>(&self, entity: Entity<'m>) -> Entity<'m> {
        self.layers.iter().fold(entity, |entity, layer| layer(entity))
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// `true` if no layer has been added.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
