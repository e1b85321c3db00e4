//! Game Session Task
//!
//! One task owns the [`World`] and runs the fixed-interval tick loop.
//! Connection tasks never touch the world directly: they submit
//! commands over a channel, and the loop drains them at the start of
//! each tick so every tick sees a consistent world.
//!
//! Outbound frames go through bounded per-player channels with
//! `try_send`; a client that cannot keep up is disconnected rather
//! than allowed to stall the simulation.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::defs::ClassKind;
use crate::game::world::World;
use crate::protocol::packets::InputPacket;
use crate::protocol::EntityId;

/// Outbound frame buffer depth per player.
pub const FRAME_BUFFER: usize = 16;

/// Commands submitted to the game task by connection handlers.
#[derive(Debug)]
pub enum GameCommand {
    /// A connection completed its join handshake.
    Join {
        /// Requested display name.
        name: String,
        /// Selected class.
        class: ClassKind,
        /// Channel the session sends this player's frames on.
        frames: mpsc::Sender<Vec<u8>>,
        /// Resolves to the assigned entity id, or `None` if the join
        /// was rejected.
        reply: oneshot::Sender<Option<EntityId>>,
    },
    /// A decoded input packet from a joined player.
    Input {
        /// The sending player.
        player: EntityId,
        /// The decoded intents.
        input: InputPacket,
    },
    /// The player's connection closed.
    Leave {
        /// The departing player.
        player: EntityId,
    },
}

/// Parameters for one game session.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Simulation rate in ticks per second.
    pub tick_rate: u32,
    /// World width in units.
    pub world_width: u16,
    /// World height in units.
    pub world_height: u16,
    /// Minimum live obstacle count.
    pub obstacle_floor: usize,
}

/// Run the session until the command channel closes.
pub async fn run_session(config: SessionConfig, mut commands: mpsc::Receiver<GameCommand>) {
    let mut world = World::new(config.world_width, config.world_height, config.obstacle_floor);
    let mut senders: BTreeMap<EntityId, mpsc::Sender<Vec<u8>>> = BTreeMap::new();

    let dt = 1.0 / config.tick_rate as f32;
    let mut ticker = interval(Duration::from_micros(1_000_000 / config.tick_rate as u64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        tick_rate = config.tick_rate,
        width = config.world_width,
        height = config.world_height,
        "session started"
    );

    loop {
        ticker.tick().await;

        // Apply external events before the tick so the tick itself is
        // atomic with respect to them.
        loop {
            match commands.try_recv() {
                Ok(cmd) => apply_command(&mut world, &mut senders, cmd),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    info!("command channel closed, session stopping");
                    return;
                }
            }
        }

        let out = world.tick(dt);

        for (player, bytes) in out.frames {
            let Some(tx) = senders.get(&player) else {
                continue;
            };
            match tx.try_send(bytes) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%player, "outbound buffer full, disconnecting");
                    senders.remove(&player);
                    world.remove_player(player);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(%player, "outbound channel closed");
                    senders.remove(&player);
                    world.remove_player(player);
                }
            }
        }

        // Dropping the sender closes the connection's send loop.
        for player in out.closed {
            senders.remove(&player);
        }
    }
}

fn apply_command(
    world: &mut World,
    senders: &mut BTreeMap<EntityId, mpsc::Sender<Vec<u8>>>,
    cmd: GameCommand,
) {
    match cmd {
        GameCommand::Join {
            name,
            class,
            frames,
            reply,
        } => {
            let id = world.add_player(name, class);
            if let Some(id) = id {
                senders.insert(id, frames);
            }
            // The connection may have dropped while waiting; the world
            // entry then gets cleaned up by the closed-channel path.
            let _ = reply.send(id);
        }
        GameCommand::Input { player, input } => {
            world.apply_input(player, &input);
        }
        GameCommand::Leave { player } => {
            senders.remove(&player);
            world.remove_player(player);
        }
    }
}
