//! Game Logic Module
//!
//! The authoritative simulation: entities, the spatial grid, dirty
//! tracking, and the per-tick interest management that turns world
//! state into per-player update frames.
//!
//! ## Module Structure
//!
//! - `defs`: Class parameter tables
//! - `ids`: Entity id allocation
//! - `grid`: Uniform spatial grid (broad-phase + visibility)
//! - `entity`: Dirty sets and serialization caches
//! - `player` / `projectile` / `obstacle`: Entity kinds
//! - `world`: The simulation tick and packet assembly

pub mod defs;
pub mod entity;
pub mod grid;
pub mod ids;
pub mod obstacle;
pub mod player;
pub mod projectile;
pub mod world;

// Re-export key types
pub use defs::{ClassDef, ClassKind};
pub use entity::DirtySets;
pub use grid::Grid;
pub use world::{TickOutput, World};
