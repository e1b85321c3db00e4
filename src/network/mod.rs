//! Network Layer
//!
//! WebSocket transport and the game session task. Inbound messages
//! only submit commands; all world mutation happens inside the tick.

pub mod server;
pub mod session;

pub use server::{GameServer, GameServerError, ServerConfig};
pub use session::{GameCommand, SessionConfig};
