//! Geometry primitives.
//!
//! Leaf modules with no dependencies on the rest of the crate:
//! vectors, collision predicates, and hitboxes.

pub mod collision;
pub mod hitbox;
pub mod vec2;

// Re-export core types
pub use collision::{Intersection, LineIntersection};
pub use hitbox::Hitbox;
pub use vec2::Vec2;
