//! # Nova Arena Server
//!
//! Authoritative server for a real-time multiplayer arena game: a
//! fixed-tick simulation streams each connected client a bit-packed
//! delta of the world region visible to it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    NOVA ARENA SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Math primitives                          │
//! │  ├── vec2.rs      - 2D float vector                          │
//! │  ├── collision.rs - Shape predicates and separation          │
//! │  └── hitbox.rs    - Tagged-union collision shapes            │
//! │                                                              │
//! │  protocol/        - Binary wire protocol                     │
//! │  ├── bitstream.rs - Bit-level quantized codec                │
//! │  ├── packets.rs   - Join / Input / GameOver payloads         │
//! │  ├── update.rs    - The per-tick world delta                 │
//! │  └── mod.rs       - Framing and discriminator registry       │
//! │                                                              │
//! │  game/            - Simulation (single-threaded per tick)    │
//! │  ├── grid.rs      - Spatial broad-phase + visibility        │
//! │  ├── entity.rs    - Dirty sets and serialization caches      │
//! │  └── world.rs     - Tick loop and interest management        │
//! │                                                              │
//! │  network/         - Async transport                          │
//! │  ├── server.rs    - WebSocket accept / join / relay          │
//! │  └── session.rs   - The game task and its command channel    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Guarantee
//!
//! The world is owned by exactly one task. Network events only buffer
//! intents or submit commands that the tick drains at its start, so
//! grid, dirty-set, and cache invariants hold without locks, and a
//! client never receives a partial delta for an entity it has not
//! seen a full baseline for.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod protocol;

// Re-export commonly used types
pub use core::hitbox::Hitbox;
pub use core::vec2::Vec2;
pub use game::world::{TickOutput, World};
pub use network::server::{GameServer, ServerConfig};
pub use protocol::{ClientPacket, EntityId, EntityKind, ServerPacket};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
