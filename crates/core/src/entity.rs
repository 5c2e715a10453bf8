//! Entity trait: identity + continuity across stores.

/// Entity marker + minimal interface.
///
/// Both halves of a flora (the relational row and the document) and the joined
/// result are entities; the join itself is keyed on [`Entity::id`].
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
