//! Obstacles
//!
//! Destructible circular rocks scattered over the map. Health scales
//! with radius; a large enough rock splits into two smaller children
//! when destroyed.

use crate::core::hitbox::Hitbox;
use crate::core::vec2::Vec2;
use crate::protocol::update::{
    EntityNetData, ObstacleNetFull, OBSTACLE_MIN_RADIUS, OBSTACLE_VARIATIONS,
};
use crate::protocol::EntityId;

/// Hit points per unit of radius.
const HEALTH_PER_RADIUS: f32 = 10.0;

/// Smallest radius that still splits on destruction.
pub const MIN_SPLIT_RADIUS: f32 = OBSTACLE_MIN_RADIUS * 2.0;

/// A destructible rock.
#[derive(Debug, Clone)]
pub struct Obstacle {
    /// Entity id.
    pub id: EntityId,
    /// Collision shape; owns the position.
    pub hitbox: Hitbox,
    /// Cosmetic variation index, `0..OBSTACLE_VARIATIONS`.
    pub variation: u8,
    /// Remaining hit points.
    pub health: f32,
    /// Set once health reaches zero; later hits are ignored.
    pub dead: bool,
}

impl Obstacle {
    /// Create a rock at `position` with the given radius.
    pub fn new(id: EntityId, position: Vec2, radius: f32, variation: u8) -> Self {
        debug_assert!(variation < OBSTACLE_VARIATIONS);
        Self {
            id,
            hitbox: Hitbox::circle(position, radius),
            variation,
            health: radius * HEALTH_PER_RADIUS,
            dead: false,
        }
    }

    /// Current position, from the hitbox.
    pub fn position(&self) -> Vec2 {
        self.hitbox.center()
    }

    /// Collision radius.
    pub fn radius(&self) -> f32 {
        match self.hitbox {
            Hitbox::Circle { radius, .. } => radius,
            Hitbox::Rect { min, max } => max.sub(min).length() * 0.5,
        }
    }

    /// Apply damage. Returns true when this hit destroyed the rock.
    pub fn damage(&mut self, amount: f32) -> bool {
        if self.dead {
            return false;
        }
        self.health -= amount;
        if self.health <= 0.0 {
            self.dead = true;
            return true;
        }
        false
    }

    /// Whether destruction spawns two child rocks.
    pub fn splits(&self) -> bool {
        self.radius() >= MIN_SPLIT_RADIUS
    }

    /// Radius of each child rock.
    pub fn child_radius(&self) -> f32 {
        (self.radius() * 0.5).max(OBSTACLE_MIN_RADIUS)
    }

    /// Wire payload for this obstacle.
    pub fn net_data(&self) -> EntityNetData {
        EntityNetData::Obstacle {
            position: self.position(),
            full: Some(ObstacleNetFull {
                variation: self.variation,
                radius: self.radius(),
            }),
        }
    }
}
