//! Players
//!
//! A connected player's entity plus its per-connection view state:
//! the visible-entity set from the previous tick and the dirty flags
//! for player-specific scalars that are resent only on change.

use std::collections::BTreeSet;

use crate::core::hitbox::Hitbox;
use crate::core::vec2::Vec2;
use crate::game::defs::ClassKind;
use crate::protocol::packets::InputPacket;
use crate::protocol::update::{EntityNetData, PlayerDataDirty, PlayerNetFull, PLAYER_MAX_HEALTH};
use crate::protocol::EntityId;

/// Player collision radius.
pub const PLAYER_RADIUS: f32 = 1.0;

/// Player movement speed in world units per second.
pub const PLAYER_SPEED: f32 = 24.0;

/// Extra view range beyond the zoom level, in world units.
pub const VIEW_MARGIN: f32 = 10.0;

/// A connected player's entity and view bookkeeping.
#[derive(Debug, Clone)]
pub struct Player {
    /// Entity id.
    pub id: EntityId,
    /// Display name, already length-limited by the join decode.
    pub name: String,
    /// Selected class.
    pub class: ClassKind,
    /// Collision shape; owns the position.
    pub hitbox: Hitbox,
    /// Aim direction, a unit vector.
    pub direction: Vec2,
    /// Whether movement input is held.
    pub moving: bool,
    /// Whether the fire input is held.
    pub shooting: bool,
    /// Seconds until the next shot is allowed.
    pub fire_cooldown: f32,
    /// Current health.
    pub health: f32,
    /// Set when health reaches zero; the entity despawns at end of tick.
    pub dead: bool,
    /// Kills credited this life.
    pub kills: u32,

    /// Entity ids visible to this player as of the previous tick.
    pub visible: BTreeSet<EntityId>,
    /// True until the first update packet has been assembled.
    pub first_packet: bool,
    /// Which player scalars need resending.
    pub data_dirty: PlayerDataDirty,
}

impl Player {
    /// Create a player at a spawn position.
    pub fn new(id: EntityId, name: String, class: ClassKind, position: Vec2) -> Self {
        Self {
            id,
            name,
            class,
            hitbox: Hitbox::circle(position, PLAYER_RADIUS),
            direction: Vec2::RIGHT,
            moving: false,
            shooting: false,
            fire_cooldown: 0.0,
            health: PLAYER_MAX_HEALTH,
            dead: false,
            kills: 0,
            visible: BTreeSet::new(),
            // The first packet carries the full roster, map metadata,
            // and the assigned id and zoom.
            first_packet: true,
            data_dirty: PlayerDataDirty { id: true, zoom: true },
        }
    }

    /// Current position, from the hitbox.
    pub fn position(&self) -> Vec2 {
        self.hitbox.center()
    }

    /// Camera zoom for this player's class.
    pub fn zoom(&self) -> u8 {
        self.class.def().zoom
    }

    /// Half-extent of the interest rectangle.
    pub fn view_radius(&self) -> f32 {
        self.zoom() as f32 + VIEW_MARGIN
    }

    /// Interest rectangle as `(min, max)` corners.
    pub fn view_rect(&self) -> (Vec2, Vec2) {
        let r = self.view_radius();
        let pos = self.position();
        (
            Vec2::new(pos.x - r, pos.y - r),
            Vec2::new(pos.x + r, pos.y + r),
        )
    }

    /// Buffer an input packet. Only intent fields change here; the
    /// tick applies them.
    pub fn apply_input(&mut self, input: &InputPacket) {
        self.moving = input.moving;
        self.shooting = input.shooting;
        self.direction = input.direction.normalize_or(Vec2::RIGHT);
    }

    /// Apply damage. Returns true when this hit killed the player.
    pub fn damage(&mut self, amount: f32) -> bool {
        if self.dead {
            return false;
        }
        self.health -= amount;
        if self.health <= 0.0 {
            self.health = 0.0;
            self.dead = true;
            return true;
        }
        false
    }

    /// Whether the fire input can produce a shot this tick.
    pub fn can_fire(&self) -> bool {
        self.shooting && self.fire_cooldown <= 0.0 && !self.dead
    }

    /// Wire payload for this player.
    pub fn net_data(&self) -> EntityNetData {
        EntityNetData::Player {
            position: self.position(),
            direction: self.direction,
            full: Some(PlayerNetFull {
                health: self.health,
            }),
        }
    }
}
