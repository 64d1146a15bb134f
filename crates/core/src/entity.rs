//! Entity trait: records with a stable identity owned by the directory.

/// Entity marker + minimal interface.
///
/// Users, roles and permissions implement this so storage adapters can key
/// their tables generically.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
