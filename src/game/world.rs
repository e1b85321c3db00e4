//! World Simulation
//!
//! Owns every entity, the spatial grid, the dirty sets, and the
//! per-entity serialization caches. `tick` advances the simulation and
//! assembles one update frame per connected player.
//!
//! Everything here runs on the single game task; inbound input only
//! mutates intent fields and the tick applies them, so the grid and
//! cache invariants hold without locks.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::core::hitbox::Hitbox;
use crate::core::vec2::Vec2;
use crate::game::defs::ClassKind;
use crate::game::entity::{encode_caches, encode_partial_cache, DirtySets};
use crate::game::grid::Grid;
use crate::game::ids::IdAllocator;
use crate::game::obstacle::Obstacle;
use crate::game::player::{Player, PLAYER_RADIUS, PLAYER_SPEED};
use crate::game::projectile::{Projectile, PROJECTILE_RADIUS};
use crate::protocol::packets::{GameOverPacket, InputPacket};
use crate::protocol::update::{
    CachedEntity, Explosion, MapData, PlayerData, PlayerEntry, UpdatePacket,
    EXPLOSION_MAX_RADIUS, EXPLOSION_MIN_RADIUS,
};
use crate::protocol::{EntityId, PacketStream, ServerPacket};

/// Keep spawns this far inside the world edge.
const SPAWN_MARGIN: f32 = 2.0;

/// Freshly spawned rock radius range.
const SPAWN_RADIUS_MIN: f32 = 2.0;
const SPAWN_RADIUS_MAX: f32 = 6.0;

/// Frames produced by one tick, plus players whose game ended.
#[derive(Debug, Default)]
pub struct TickOutput {
    /// Outbound byte frames, one per recipient.
    pub frames: Vec<(EntityId, Vec<u8>)>,
    /// Players that died this tick; their frame is a game-over packet
    /// and their connection should close after it is flushed.
    pub closed: Vec<EntityId>,
}

/// An assembled but not yet applied per-player view.
struct PendingView {
    id: EntityId,
    new_visible: BTreeSet<EntityId>,
    bytes: Vec<u8>,
}

enum HitTarget {
    Player(EntityId),
    Obstacle(EntityId),
}

/// The authoritative game world.
pub struct World {
    width: u16,
    height: u16,
    obstacle_floor: usize,
    grid: Grid,
    ids: IdAllocator,
    players: BTreeMap<EntityId, Player>,
    projectiles: BTreeMap<EntityId, Projectile>,
    obstacles: BTreeMap<EntityId, Obstacle>,
    dirty: DirtySets,
    /// Persistent per-entity encodings, refreshed for dirty entities
    /// each tick and spliced into update packets.
    caches: BTreeMap<EntityId, CachedEntity>,
    // Per-tick transients, cleared at end of tick.
    explosions: Vec<Explosion>,
    shots: Vec<Vec2>,
    joined: Vec<PlayerEntry>,
    left: Vec<EntityId>,
    rng: StdRng,
}

impl World {
    /// Create a world of `width` x `height` units that keeps at least
    /// `obstacle_floor` rocks alive.
    pub fn new(width: u16, height: u16, obstacle_floor: usize) -> Self {
        Self::with_seed(width, height, obstacle_floor, rand::random())
    }

    /// Create a world with a fixed RNG seed.
    pub fn with_seed(width: u16, height: u16, obstacle_floor: usize, seed: u64) -> Self {
        Self {
            width,
            height,
            obstacle_floor,
            grid: Grid::new(width as f32, height as f32),
            ids: IdAllocator::new(),
            players: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            obstacles: BTreeMap::new(),
            dirty: DirtySets::default(),
            caches: BTreeMap::new(),
            explosions: Vec::new(),
            shots: Vec::new(),
            joined: Vec::new(),
            left: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Connected player count.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Spawn a player at a random position. Returns `None` when the
    /// id space is exhausted.
    pub fn add_player(&mut self, name: String, class: ClassKind) -> Option<EntityId> {
        let Some(id) = self.ids.alloc() else {
            warn!("entity id space exhausted, rejecting join");
            return None;
        };
        let position = self.clear_position(PLAYER_RADIUS);
        let player = Player::new(id, name, class, position);
        let (min, max) = player.hitbox.to_rect();
        self.grid.insert(id, min, max);
        self.dirty.mark_full(id);
        self.joined.push(PlayerEntry {
            id,
            name: player.name.clone(),
        });
        info!(player = %id, name = %player.name, class = ?class, "player joined");
        self.players.insert(id, player);
        Some(id)
    }

    /// Remove a disconnected player and all bookkeeping that mentions
    /// it. Runs synchronously so no query can see the stale entity.
    pub fn remove_player(&mut self, id: EntityId) {
        let Some(player) = self.players.remove(&id) else {
            return;
        };
        self.despawn(id);
        self.left.push(id);
        info!(player = %id, name = %player.name, "player left");
    }

    /// Buffer a player's input. Only intent fields change here.
    pub fn apply_input(&mut self, id: EntityId, input: &InputPacket) {
        if let Some(player) = self.players.get_mut(&id) {
            player.apply_input(input);
            self.dirty.mark_partial(id);
        }
    }

    /// Advance the world by `dt` seconds and build outbound frames.
    pub fn tick(&mut self, dt: f32) -> TickOutput {
        let mut out = TickOutput::default();

        self.advance_players(dt);
        self.fire_shots();
        self.advance_projectiles(dt);
        let destroyed = self.collide_projectiles();
        self.destroy_obstacles(destroyed);
        self.resolve_player_collisions();
        self.reap_projectiles();
        self.reap_players(&mut out);
        self.maintain_obstacle_floor();

        self.refresh_caches();
        for view in self.assemble_updates() {
            if let Some(player) = self.players.get_mut(&view.id) {
                player.visible = view.new_visible;
                player.data_dirty.reset();
                player.first_packet = false;
            }
            out.frames.push((view.id, view.bytes));
        }

        self.dirty.clear();
        self.explosions.clear();
        self.shots.clear();
        self.joined.clear();
        self.left.clear();
        out
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    fn advance_players(&mut self, dt: f32) {
        for player in self.players.values_mut() {
            player.fire_cooldown = (player.fire_cooldown - dt).max(0.0);
            if !player.moving {
                continue;
            }
            let delta = player.direction.mul(PLAYER_SPEED * dt);
            let pos = clamp_to_world(
                player.position().add(delta),
                PLAYER_RADIUS,
                self.width,
                self.height,
            );
            player.hitbox.set_center(pos);
            let (min, max) = player.hitbox.to_rect();
            self.grid.update(player.id, min, max);
            self.dirty.mark_partial(player.id);
        }
    }

    fn fire_shots(&mut self) {
        let mut spawns = Vec::new();
        for player in self.players.values_mut() {
            if !player.can_fire() {
                continue;
            }
            let def = player.class.def();
            player.fire_cooldown = def.fire_delay;
            let muzzle = player
                .position()
                .add(player.direction.mul(PLAYER_RADIUS + PROJECTILE_RADIUS));
            spawns.push((
                player.id,
                muzzle,
                player.direction,
                def.projectile_speed,
                def.damage,
            ));
        }
        for (owner, muzzle, direction, speed, damage) in spawns {
            self.shots.push(muzzle);
            let Some(id) = self.ids.alloc() else {
                warn!("entity id space exhausted, dropping projectile");
                continue;
            };
            let projectile = Projectile::new(id, owner, muzzle, direction, speed, damage);
            let (min, max) = projectile.hitbox.to_rect();
            self.grid.insert(id, min, max);
            self.dirty.mark_full(id);
            self.projectiles.insert(id, projectile);
        }
    }

    fn advance_projectiles(&mut self, dt: f32) {
        let (width, height) = (self.width as f32, self.height as f32);
        for projectile in self.projectiles.values_mut() {
            projectile.advance(dt);
            let pos = projectile.hitbox.center();
            if pos.x < 0.0 || pos.y < 0.0 || pos.x > width || pos.y > height {
                projectile.dead = true;
                continue;
            }
            let (min, max) = projectile.hitbox.to_rect();
            self.grid.update(projectile.id, min, max);
            self.dirty.mark_partial(projectile.id);
        }
    }

    /// Detect projectile impacts and apply their damage. Returns the
    /// obstacles destroyed this tick.
    fn collide_projectiles(&mut self) -> Vec<EntityId> {
        let mut hits = Vec::new();
        for projectile in self.projectiles.values() {
            if projectile.dead {
                continue;
            }
            for cand in self.grid.query_hitbox(&projectile.hitbox) {
                if cand == projectile.id || cand == projectile.owner {
                    continue;
                }
                let target = if let Some(target) = self.players.get(&cand) {
                    if target.dead || !projectile.hitbox.collides_with(&target.hitbox) {
                        continue;
                    }
                    HitTarget::Player(cand)
                } else if let Some(rock) = self.obstacles.get(&cand) {
                    if rock.dead || !projectile.hitbox.collides_with(&rock.hitbox) {
                        continue;
                    }
                    HitTarget::Obstacle(cand)
                } else {
                    continue;
                };
                hits.push((projectile.id, projectile.owner, target, projectile.damage));
                break;
            }
        }

        let mut destroyed = Vec::new();
        for (projectile_id, owner, target, damage) in hits {
            // The target may already be gone from an earlier hit this
            // tick; the projectile then flies on.
            let consumed = match target {
                HitTarget::Player(id) => match self.players.get_mut(&id) {
                    Some(target) if !target.dead => {
                        if target.damage(damage) {
                            debug!(victim = %id, killer = %owner, "player killed");
                            if let Some(killer) = self.players.get_mut(&owner) {
                                killer.kills += 1;
                            }
                        }
                        self.dirty.mark_full(id);
                        true
                    }
                    _ => false,
                },
                HitTarget::Obstacle(id) => match self.obstacles.get_mut(&id) {
                    Some(rock) if !rock.dead => {
                        if rock.damage(damage) {
                            destroyed.push(id);
                        }
                        true
                    }
                    _ => false,
                },
            };
            if consumed {
                if let Some(projectile) = self.projectiles.get_mut(&projectile_id) {
                    projectile.dead = true;
                }
            }
        }
        destroyed
    }

    fn destroy_obstacles(&mut self, destroyed: Vec<EntityId>) {
        for id in destroyed {
            let Some(rock) = self.obstacles.remove(&id) else {
                continue;
            };
            self.despawn(id);
            let position = rock.position();
            self.explosions.push(Explosion {
                position,
                radius: (rock.radius() * 1.25)
                    .clamp(EXPLOSION_MIN_RADIUS, EXPLOSION_MAX_RADIUS),
            });
            if rock.splits() {
                let child_radius = rock.child_radius();
                let angle = self.rng.gen_range(0.0..std::f32::consts::PI);
                let offset = Vec2::new(angle.cos(), angle.sin()).mul(child_radius);
                for sign in [1.0f32, -1.0] {
                    let child_pos = clamp_to_world(
                        position.add(offset.mul(sign)),
                        child_radius,
                        self.width,
                        self.height,
                    );
                    self.spawn_obstacle(child_pos, child_radius, rock.variation);
                }
            }
        }
    }

    /// Positional correction for overlapping players, against both
    /// other players and obstacles. Players back off half the overlap
    /// from each other and the full overlap from rocks.
    fn resolve_player_collisions(&mut self) {
        let mut corrections: BTreeMap<EntityId, Vec2> = BTreeMap::new();
        for player in self.players.values() {
            for cand in self.grid.query_hitbox(&player.hitbox) {
                if cand == player.id {
                    continue;
                }
                let delta = if let Some(other) = self.players.get(&cand) {
                    player
                        .hitbox
                        .intersection(&other.hitbox)
                        .map(|ix| ix.dir.mul(-ix.pen * 0.5))
                } else if let Some(rock) = self.obstacles.get(&cand) {
                    player
                        .hitbox
                        .intersection(&rock.hitbox)
                        .map(|ix| ix.dir.mul(-ix.pen))
                } else {
                    None
                };
                if let Some(delta) = delta {
                    let entry = corrections.entry(player.id).or_insert(Vec2::ZERO);
                    *entry = entry.add(delta);
                }
            }
        }
        for (id, delta) in corrections {
            let Some(player) = self.players.get_mut(&id) else {
                continue;
            };
            let pos = clamp_to_world(
                player.position().add(delta),
                PLAYER_RADIUS,
                self.width,
                self.height,
            );
            player.hitbox.set_center(pos);
            let (min, max) = player.hitbox.to_rect();
            self.grid.update(id, min, max);
            self.dirty.mark_partial(id);
        }
    }

    fn reap_projectiles(&mut self) {
        let dead: Vec<EntityId> = self
            .projectiles
            .values()
            .filter(|p| p.dead)
            .map(|p| p.id)
            .collect();
        for id in dead {
            self.projectiles.remove(&id);
            self.despawn(id);
        }
    }

    fn reap_players(&mut self, out: &mut TickOutput) {
        let dead: Vec<(EntityId, u32)> = self
            .players
            .values()
            .filter(|p| p.dead)
            .map(|p| (p.id, p.kills))
            .collect();
        for (id, kills) in dead {
            self.players.remove(&id);
            self.despawn(id);
            self.left.push(id);

            let packet = GameOverPacket {
                kills: kills.min(u8::MAX as u32) as u8,
            };
            let mut stream = PacketStream::new();
            match stream.write_server_packet(&ServerPacket::GameOver(packet)) {
                Ok(()) => out.frames.push((id, stream.into_bytes())),
                Err(e) => error!(player = %id, error = %e, "game-over encode failed"),
            }
            out.closed.push(id);
        }
    }

    fn maintain_obstacle_floor(&mut self) {
        while self.obstacles.len() < self.obstacle_floor {
            let radius = self.rng.gen_range(SPAWN_RADIUS_MIN..SPAWN_RADIUS_MAX);
            let position = self.clear_position(radius);
            let variation = self.rng.gen_range(0..crate::protocol::update::OBSTACLE_VARIATIONS);
            if self.spawn_obstacle(position, radius, variation).is_none() {
                break;
            }
        }
    }

    /// Pick a spawn position that does not overlap a live entity,
    /// giving up after a few grid-checked attempts on a crowded map.
    fn clear_position(&mut self, radius: f32) -> Vec2 {
        const ATTEMPTS: usize = 8;
        let mut position = self.random_position(radius);
        for _ in 0..ATTEMPTS {
            let probe = Hitbox::circle(position, radius);
            let blocked = self
                .grid
                .query_hitbox(&probe)
                .into_iter()
                .any(|id| match (self.players.get(&id), self.obstacles.get(&id)) {
                    (Some(player), _) => probe.collides_with(&player.hitbox),
                    (_, Some(rock)) => probe.collides_with(&rock.hitbox),
                    _ => false,
                });
            if !blocked {
                break;
            }
            position = self.random_position(radius);
        }
        position
    }

    fn spawn_obstacle(&mut self, position: Vec2, radius: f32, variation: u8) -> Option<EntityId> {
        let Some(id) = self.ids.alloc() else {
            warn!("entity id space exhausted, dropping obstacle spawn");
            return None;
        };
        let rock = Obstacle::new(id, position, radius, variation);
        let (min, max) = rock.hitbox.to_rect();
        self.grid.insert(id, min, max);
        self.dirty.mark_full(id);
        self.obstacles.insert(id, rock);
        Some(id)
    }

    /// Drop an entity from the grid, caches, dirty sets, and the id
    /// allocator. The owning map entry is removed by the caller.
    fn despawn(&mut self, id: EntityId) {
        self.grid.remove(id);
        self.caches.remove(&id);
        self.dirty.forget(id);
        self.ids.free(id);
    }

    fn random_position(&mut self, margin: f32) -> Vec2 {
        let margin = margin.max(SPAWN_MARGIN);
        Vec2::new(
            self.rng.gen_range(margin..self.width as f32 - margin),
            self.rng.gen_range(margin..self.height as f32 - margin),
        )
    }

    fn net_data(&self, id: EntityId) -> Option<crate::protocol::update::EntityNetData> {
        if let Some(player) = self.players.get(&id) {
            return Some(player.net_data());
        }
        if let Some(projectile) = self.projectiles.get(&id) {
            return Some(projectile.net_data());
        }
        self.obstacles.get(&id).map(Obstacle::net_data)
    }

    // =========================================================================
    // Serialization caches & interest management
    // =========================================================================

    /// Re-encode every dirty entity exactly once. Full dirty refreshes
    /// both tiers; partial dirty refreshes only the partial bytes.
    fn refresh_caches(&mut self) {
        let full: Vec<EntityId> = self.dirty.full().iter().copied().collect();
        for id in full {
            let Some(data) = self.net_data(id) else { continue };
            match encode_caches(id, &data) {
                Ok(caches) => {
                    self.caches.insert(id, caches);
                }
                Err(e) => error!(entity = %id, error = %e, "full encode failed"),
            }
        }
        let partial: Vec<EntityId> = self.dirty.partial().iter().copied().collect();
        for id in partial {
            let Some(data) = self.net_data(id) else { continue };
            match encode_partial_cache(id, &data) {
                Ok(bytes) => {
                    self.caches.entry(id).or_default().partial = bytes;
                }
                Err(e) => error!(entity = %id, error = %e, "partial encode failed"),
            }
        }
    }

    /// Build every player's update packet against the current grid and
    /// dirty sets. Pure reads; the caller applies the new visible sets
    /// afterwards so all players diff against the same world state.
    fn assemble_updates(&self) -> Vec<PendingView> {
        let mut pending = Vec::with_capacity(self.players.len());
        for player in self.players.values() {
            let (min, max) = player.view_rect();
            let new_visible = self.grid.query_rect(min, max);
            let mut packet = UpdatePacket::default();

            packet.deleted_entities = player.visible.difference(&new_visible).copied().collect();

            for &id in &new_visible {
                let entered = !player.visible.contains(&id);
                if entered || self.dirty.is_full(id) {
                    match self.caches.get(&id) {
                        Some(caches) => packet.cached_full.push(caches.clone()),
                        None => warn!(entity = %id, "missing serialization cache"),
                    }
                } else if self.dirty.is_partial(id) {
                    if let Some(caches) = self.caches.get(&id) {
                        packet.cached_partial.push(caches.partial.clone());
                    }
                }
            }

            if player.first_packet {
                // First packet: complete roster and map metadata.
                packet.new_players = self
                    .players
                    .values()
                    .map(|p| PlayerEntry {
                        id: p.id,
                        name: p.name.clone(),
                    })
                    .collect();
                packet.map_dirty = true;
                packet.map = MapData {
                    width: self.width,
                    height: self.height,
                };
            } else {
                packet.new_players = self.joined.clone();
                packet.deleted_players = self.left.clone();
            }

            packet.player_data_dirty = player.data_dirty;
            packet.player_data = PlayerData {
                id: player.id,
                zoom: player.zoom(),
            };

            let in_view =
                |p: Vec2| p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y;
            packet.explosions = self
                .explosions
                .iter()
                .copied()
                .filter(|e| in_view(e.position))
                .collect();
            packet.shots = self.shots.iter().copied().filter(|s| in_view(*s)).collect();

            let mut stream = PacketStream::new();
            match stream.write_server_packet(&ServerPacket::Update(packet)) {
                Ok(()) => pending.push(PendingView {
                    id: player.id,
                    new_visible,
                    bytes: stream.into_bytes(),
                }),
                Err(e) => error!(player = %player.id, error = %e, "update encode failed"),
            }
        }
        pending
    }
}

fn clamp_to_world(pos: Vec2, radius: f32, width: u16, height: u16) -> Vec2 {
    Vec2::new(
        pos.x.clamp(radius, width as f32 - radius),
        pos.y.clamp(radius, height as f32 - radius),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::update::EntityNetData;
    use crate::protocol::PacketReader;

    const DT: f32 = 1.0 / 30.0;

    fn world() -> World {
        World::with_seed(128, 128, 0, 7)
    }

    fn place_player(w: &mut World, id: EntityId, pos: Vec2) {
        let player = w.players.get_mut(&id).unwrap();
        player.hitbox.set_center(pos);
        let (min, max) = player.hitbox.to_rect();
        w.grid.update(id, min, max);
        w.dirty.mark_partial(id);
    }

    fn frame_for(out: &TickOutput, id: EntityId) -> &[u8] {
        out.frames
            .iter()
            .find(|(player, _)| *player == id)
            .map(|(_, bytes)| bytes.as_slice())
            .unwrap()
    }

    fn decode_update(bytes: &[u8]) -> UpdatePacket {
        let mut reader = PacketReader::new(bytes);
        match reader.next_server_packet().unwrap().unwrap() {
            ServerPacket::Update(packet) => packet,
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_first_packet_has_baseline_roster_and_map() {
        let mut w = world();
        let id = w.add_player("alpha".to_string(), ClassKind::Auto).unwrap();
        place_player(&mut w, id, Vec2::new(64.0, 64.0));

        let out = w.tick(DT);
        let packet = decode_update(frame_for(&out, id));

        // Own entity arrives fully encoded.
        assert!(packet.full_entities.iter().any(|f| f.id == id));
        assert_eq!(packet.new_players.len(), 1);
        assert_eq!(packet.new_players[0].name, "alpha");
        assert!(packet.map_dirty);
        assert_eq!(packet.map, MapData { width: 128, height: 128 });
        assert!(packet.player_data_dirty.id);
        assert!(packet.player_data_dirty.zoom);
        assert_eq!(packet.player_data.id, id);
        assert_eq!(packet.player_data.zoom, ClassKind::Auto.def().zoom);

        // Scalars are sent once, not every tick.
        let out = w.tick(DT);
        let packet = decode_update(frame_for(&out, id));
        assert!(!packet.player_data_dirty.id);
        assert!(!packet.player_data_dirty.zoom);
        assert!(!packet.map_dirty);
    }

    #[test]
    fn test_entity_leaving_view_is_deleted() {
        let mut w = world();
        let id = w.add_player("alpha".to_string(), ClassKind::Auto).unwrap();
        place_player(&mut w, id, Vec2::new(10.0, 10.0));
        let near = w.spawn_obstacle(Vec2::new(10.0, 40.0), 2.0, 0).unwrap();
        let far = w.spawn_obstacle(Vec2::new(10.0, 120.0), 2.0, 0).unwrap();

        let out = w.tick(DT);
        let packet = decode_update(frame_for(&out, id));
        assert!(packet.full_entities.iter().any(|f| f.id == near));
        assert!(!packet.full_entities.iter().any(|f| f.id == far));

        // The near rock drifts out of range.
        let rock = w.obstacles.get_mut(&near).unwrap();
        rock.hitbox.set_center(Vec2::new(10.0, 120.0));
        let (min, max) = rock.hitbox.to_rect();
        w.grid.update(near, min, max);
        w.dirty.mark_partial(near);

        let out = w.tick(DT);
        let packet = decode_update(frame_for(&out, id));
        assert!(packet.deleted_entities.contains(&near));
        assert!(!w.players[&id].visible.contains(&near));
    }

    #[test]
    fn test_full_dirty_supersedes_partial_in_packet() {
        let mut w = world();
        let id = w.add_player("alpha".to_string(), ClassKind::Auto).unwrap();
        place_player(&mut w, id, Vec2::new(64.0, 64.0));
        let rock = w.spawn_obstacle(Vec2::new(70.0, 64.0), 2.0, 1).unwrap();
        w.tick(DT);

        // Marked both ways in one tick: encoded once, fully.
        w.dirty.mark_partial(rock);
        w.dirty.mark_full(rock);

        let out = w.tick(DT);
        let packet = decode_update(frame_for(&out, id));
        let full_count = packet
            .full_entities
            .iter()
            .filter(|f| f.id == rock)
            .count();
        assert_eq!(full_count, 1);
        assert!(!packet.partial_entities.iter().any(|f| f.id == rock));
    }

    #[test]
    fn test_moving_entity_sends_partial_delta() {
        let mut w = world();
        let id = w.add_player("alpha".to_string(), ClassKind::Auto).unwrap();
        place_player(&mut w, id, Vec2::new(64.0, 64.0));
        w.tick(DT);

        w.apply_input(
            id,
            &InputPacket {
                moving: true,
                shooting: false,
                direction: Vec2::RIGHT,
            },
        );
        let out = w.tick(DT);
        let packet = decode_update(frame_for(&out, id));

        let frame = packet
            .partial_entities
            .iter()
            .find(|f| f.id == id)
            .expect("own movement delta");
        match frame.data {
            EntityNetData::Player { position, full, .. } => {
                assert!(position.x > 64.0);
                assert!(full.is_none());
            }
            ref other => panic!("unexpected data: {other:?}"),
        }
        assert!(!packet.full_entities.iter().any(|f| f.id == id));
    }

    #[test]
    fn test_projectile_destroys_obstacle() {
        let mut w = world();
        let id = w.add_player("alpha".to_string(), ClassKind::Assault).unwrap();
        place_player(&mut w, id, Vec2::new(64.0, 64.0));
        // Small rock dead ahead; 15 health falls to one assault hit.
        let rock = w.spawn_obstacle(Vec2::new(70.0, 64.0), 1.5, 0).unwrap();
        w.tick(DT);

        w.apply_input(
            id,
            &InputPacket {
                moving: false,
                shooting: true,
                direction: Vec2::RIGHT,
            },
        );
        let mut gone = false;
        for _ in 0..30 {
            let out = w.tick(DT);
            let packet = decode_update(frame_for(&out, id));
            if packet.deleted_entities.contains(&rock) {
                assert!(!packet.explosions.is_empty());
                gone = true;
                break;
            }
        }
        assert!(gone, "rock should be destroyed and deleted from view");
        assert!(w.obstacles.is_empty(), "small rock must not split");
    }

    #[test]
    fn test_big_obstacle_splits_in_two() {
        let mut w = world();
        let id = w.add_player("alpha".to_string(), ClassKind::Sniper).unwrap();
        place_player(&mut w, id, Vec2::new(64.0, 64.0));
        // 4.0 radius -> 40 health, one sniper hit destroys it.
        let rock = w.spawn_obstacle(Vec2::new(70.0, 64.0), 4.0, 2).unwrap();
        w.tick(DT);

        w.apply_input(
            id,
            &InputPacket {
                moving: false,
                shooting: true,
                direction: Vec2::RIGHT,
            },
        );
        for _ in 0..30 {
            w.tick(DT);
            if !w.obstacles.contains_key(&rock) {
                break;
            }
        }
        assert!(!w.obstacles.contains_key(&rock));
        assert_eq!(w.obstacles.len(), 2);
        for child in w.obstacles.values() {
            assert_eq!(child.variation, 2);
            assert!((child.radius() - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_player_death_sends_game_over_and_roster_delta() {
        let mut w = world();
        let shooter = w.add_player("shooter".to_string(), ClassKind::Sniper).unwrap();
        let victim = w.add_player("victim".to_string(), ClassKind::Auto).unwrap();
        place_player(&mut w, shooter, Vec2::new(60.0, 64.0));
        place_player(&mut w, victim, Vec2::new(66.0, 64.0));
        w.players.get_mut(&victim).unwrap().health = 50.0;
        w.tick(DT);

        w.apply_input(
            shooter,
            &InputPacket {
                moving: false,
                shooting: true,
                direction: Vec2::RIGHT,
            },
        );
        let mut closed = Vec::new();
        let mut last_shooter_packet = None;
        for _ in 0..30 {
            let out = w.tick(DT);
            if !out.closed.is_empty() {
                closed = out.closed.clone();
                let mut reader = PacketReader::new(frame_for(&out, victim));
                match reader.next_server_packet().unwrap().unwrap() {
                    ServerPacket::GameOver(p) => assert_eq!(p.kills, 0),
                    other => panic!("expected game over, got {other:?}"),
                }
                last_shooter_packet = Some(decode_update(frame_for(&out, shooter)));
                break;
            }
        }
        assert_eq!(closed, vec![victim]);
        let packet = last_shooter_packet.unwrap();
        assert!(packet.deleted_players.contains(&victim));
        assert!(packet.deleted_entities.contains(&victim));
        assert_eq!(w.players[&shooter].kills, 1);
        assert!(!w.grid.contains(victim));
    }

    #[test]
    fn test_disconnect_scrubs_all_bookkeeping() {
        let mut w = world();
        let a = w.add_player("a".to_string(), ClassKind::Assault).unwrap();
        let b = w.add_player("b".to_string(), ClassKind::Assault).unwrap();
        place_player(&mut w, a, Vec2::new(60.0, 64.0));
        place_player(&mut w, b, Vec2::new(64.0, 64.0));
        w.tick(DT);

        w.remove_player(b);
        assert!(!w.grid.contains(b));
        assert!(!w.caches.contains_key(&b));

        let out = w.tick(DT);
        let packet = decode_update(frame_for(&out, a));
        assert!(packet.deleted_entities.contains(&b));
        assert!(packet.deleted_players.contains(&b));
    }

    #[test]
    fn test_obstacle_floor_is_maintained() {
        let mut w = World::with_seed(128, 128, 8, 3);
        w.tick(DT);
        assert!(w.obstacles.len() >= 8);
        // Every spawned rock got a baseline cache.
        for id in w.obstacles.keys() {
            assert!(w.caches.contains_key(id));
        }
    }

    #[test]
    fn test_overlapping_players_are_separated() {
        let mut w = world();
        let a = w.add_player("a".to_string(), ClassKind::Assault).unwrap();
        let b = w.add_player("b".to_string(), ClassKind::Assault).unwrap();
        place_player(&mut w, a, Vec2::new(64.0, 64.0));
        place_player(&mut w, b, Vec2::new(64.5, 64.0));
        w.tick(DT);

        let dist = w.players[&a]
            .position()
            .distance(w.players[&b].position());
        assert!(dist > 0.5, "players should be pushed apart, got {dist}");
    }

    #[test]
    fn test_separated_players_at_rest_do_not_move() {
        let mut w = world();
        let a = w.add_player("a".to_string(), ClassKind::Assault).unwrap();
        let b = w.add_player("b".to_string(), ClassKind::Assault).unwrap();
        place_player(&mut w, a, Vec2::new(40.0, 40.0));
        place_player(&mut w, b, Vec2::new(80.0, 80.0));
        w.tick(DT);

        assert_eq!(w.players[&a].position(), Vec2::new(40.0, 40.0));
        assert_eq!(w.players[&b].position(), Vec2::new(80.0, 80.0));
    }
}
