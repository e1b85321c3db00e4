//! Projectiles
//!
//! Straight-line bullets with a bounded lifetime. Speed and damage
//! come from the firing player's class; the owner is immune to its own
//! shots.

use crate::core::hitbox::Hitbox;
use crate::core::vec2::Vec2;
use crate::protocol::update::{EntityNetData, ProjectileNetFull};
use crate::protocol::EntityId;

/// Projectile collision radius.
pub const PROJECTILE_RADIUS: f32 = 0.4;

/// Seconds a projectile flies before despawning.
pub const PROJECTILE_LIFETIME: f32 = 1.5;

/// A bullet in flight.
#[derive(Debug, Clone)]
pub struct Projectile {
    /// Entity id.
    pub id: EntityId,
    /// Collision shape; owns the position.
    pub hitbox: Hitbox,
    /// Normalized flight direction.
    pub direction: Vec2,
    /// Speed in world units per second.
    pub speed: f32,
    /// Damage dealt on hit.
    pub damage: f32,
    /// Player that fired it.
    pub owner: EntityId,
    /// Seconds of flight remaining.
    pub lifetime: f32,
    /// Set on impact or expiry; removed at end of tick.
    pub dead: bool,
}

impl Projectile {
    /// Spawn a projectile at `position` heading along `direction`.
    pub fn new(
        id: EntityId,
        owner: EntityId,
        position: Vec2,
        direction: Vec2,
        speed: f32,
        damage: f32,
    ) -> Self {
        Self {
            id,
            hitbox: Hitbox::circle(position, PROJECTILE_RADIUS),
            direction,
            speed,
            damage,
            owner,
            lifetime: PROJECTILE_LIFETIME,
            dead: false,
        }
    }

    /// Current position, from the hitbox.
    pub fn position(&self) -> Vec2 {
        self.hitbox.center()
    }

    /// Advance by `dt` seconds. Marks the projectile dead on expiry.
    pub fn advance(&mut self, dt: f32) {
        self.hitbox.translate(self.direction.mul(self.speed * dt));
        self.lifetime -= dt;
        if self.lifetime <= 0.0 {
            self.dead = true;
        }
    }

    /// Wire payload for this projectile.
    pub fn net_data(&self) -> EntityNetData {
        EntityNetData::Projectile {
            position: self.position(),
            full: Some(ProjectileNetFull {
                direction: self.direction,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_moves_along_direction() {
        let mut p = Projectile::new(
            EntityId(1),
            EntityId(2),
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            80.0,
            15.0,
        );
        p.advance(0.1);
        assert!((p.position().x - 8.0).abs() < 1e-4);
        assert_eq!(p.position().y, 0.0);
        assert!(!p.dead);
    }

    #[test]
    fn test_expires_after_lifetime() {
        let mut p = Projectile::new(
            EntityId(1),
            EntityId(2),
            Vec2::ZERO,
            Vec2::new(0.0, 1.0),
            80.0,
            15.0,
        );
        for _ in 0..16 {
            p.advance(0.1);
        }
        assert!(p.dead);
    }
}
