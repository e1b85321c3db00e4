//! Update Packet
//!
//! The per-tick world delta sent to every connected player. The packet
//! is a bit-flagged set of optional sections; a section is only
//! emitted when it has content, so an absent section costs one bit.
//!
//! Entity payloads come in two tiers: partial data changes most ticks
//! (position, orientation) while full data rarely changes (health,
//! cosmetic variation). The server pre-encodes both tiers once per
//! tick per dirty entity and splices the cached bytes here without
//! re-encoding per recipient; both tiers end byte-aligned so the
//! splice is a straight byte copy.

use crate::core::vec2::Vec2;
use crate::protocol::bitstream::{BitReader, BitWriter, CodecError};
use crate::protocol::{EntityId, EntityKind, NAME_MAX_LEN};

/// Bits per axis for entity direction vectors.
const DIRECTION_BITS: u32 = 16;

/// Wire range for player health.
pub const PLAYER_MAX_HEALTH: f32 = 100.0;
const HEALTH_BITS: u32 = 8;

/// Wire range for obstacle radii (covers split children).
pub const OBSTACLE_MIN_RADIUS: f32 = 1.0;
/// Upper bound of the obstacle radius wire range.
pub const OBSTACLE_MAX_RADIUS: f32 = 16.0;
const OBSTACLE_RADIUS_BITS: u32 = 8;

/// Number of obstacle cosmetic variations.
pub const OBSTACLE_VARIATIONS: u8 = 4;
const VARIATION_BITS: u32 = 2;

/// Wire range for explosion radii.
pub const EXPLOSION_MIN_RADIUS: f32 = 2.0;
/// Upper bound of the explosion radius wire range.
pub const EXPLOSION_MAX_RADIUS: f32 = 12.0;
const EXPLOSION_RADIUS_BITS: u32 = 8;

mod flags {
    pub const DELETED_ENTITIES: u8 = 1 << 0;
    pub const FULL_ENTITIES: u8 = 1 << 1;
    pub const PARTIAL_ENTITIES: u8 = 1 << 2;
    pub const NEW_PLAYERS: u8 = 1 << 3;
    pub const DELETED_PLAYERS: u8 = 1 << 4;
    pub const PLAYER_DATA: u8 = 1 << 5;
    pub const EVENTS: u8 = 1 << 6;
    pub const MAP: u8 = 1 << 7;
}

/// Full-tier fields of a player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerNetFull {
    /// Current health.
    pub health: f32,
}

/// Full-tier fields of a projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileNetFull {
    /// Flight direction, a unit vector.
    pub direction: Vec2,
}

/// Full-tier fields of an obstacle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleNetFull {
    /// Cosmetic variation index.
    pub variation: u8,
    /// Collision radius.
    pub radius: f32,
}

/// Serializable view of one entity, dispatched by kind.
///
/// Partial fields are always present; `full` is `Some` for full-tier
/// encodes (entity creation or rare-field change) and `None` for
/// partial deltas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityNetData {
    /// Player: position + aim direction; full adds health.
    Player {
        /// World position.
        position: Vec2,
        /// Aim direction, a unit vector.
        direction: Vec2,
        /// Full-tier fields, when present.
        full: Option<PlayerNetFull>,
    },
    /// Projectile: position; full adds flight direction.
    Projectile {
        /// World position.
        position: Vec2,
        /// Full-tier fields, when present.
        full: Option<ProjectileNetFull>,
    },
    /// Obstacle: position; full adds variation and radius.
    Obstacle {
        /// World position.
        position: Vec2,
        /// Full-tier fields, when present.
        full: Option<ObstacleNetFull>,
    },
}

impl EntityNetData {
    /// The wire kind tag for this payload.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Player { .. } => EntityKind::Player,
            Self::Projectile { .. } => EntityKind::Projectile,
            Self::Obstacle { .. } => EntityKind::Obstacle,
        }
    }

    /// Encode the partial-tier fields.
    pub fn serialize_partial(&self, w: &mut BitWriter) -> Result<(), CodecError> {
        match *self {
            Self::Player {
                position,
                direction,
                ..
            } => {
                w.write_position(position)?;
                w.write_unit(direction, DIRECTION_BITS)
            }
            Self::Projectile { position, .. } => w.write_position(position),
            Self::Obstacle { position, .. } => w.write_position(position),
        }
    }

    /// Encode the full-tier fields. Fails fast when the data carries
    /// no full tier, since that denotes a server-side logic error.
    pub fn serialize_full(&self, w: &mut BitWriter) -> Result<(), CodecError> {
        match self {
            Self::Player { full, .. } => {
                let full = full.as_ref().ok_or(CodecError::MissingFullData)?;
                w.write_float(full.health, 0.0, PLAYER_MAX_HEALTH, HEALTH_BITS)
            }
            Self::Projectile { full, .. } => {
                let full = full.as_ref().ok_or(CodecError::MissingFullData)?;
                w.write_unit(full.direction, DIRECTION_BITS)
            }
            Self::Obstacle { full, .. } => {
                let full = full.as_ref().ok_or(CodecError::MissingFullData)?;
                w.write_bits(full.variation as u32, VARIATION_BITS)?;
                w.write_float(
                    full.radius,
                    OBSTACLE_MIN_RADIUS,
                    OBSTACLE_MAX_RADIUS,
                    OBSTACLE_RADIUS_BITS,
                )
            }
        }
    }

    /// Decode the partial-tier fields for `kind`.
    pub fn deserialize_partial(
        r: &mut BitReader<'_>,
        kind: EntityKind,
    ) -> Result<Self, CodecError> {
        Ok(match kind {
            EntityKind::Player => Self::Player {
                position: r.read_position()?,
                direction: r.read_unit(DIRECTION_BITS)?,
                full: None,
            },
            EntityKind::Projectile => Self::Projectile {
                position: r.read_position()?,
                full: None,
            },
            EntityKind::Obstacle => Self::Obstacle {
                position: r.read_position()?,
                full: None,
            },
        })
    }

    /// Decode the full-tier fields into an existing payload.
    pub fn deserialize_full(&mut self, r: &mut BitReader<'_>) -> Result<(), CodecError> {
        match self {
            Self::Player { full, .. } => {
                *full = Some(PlayerNetFull {
                    health: r.read_float(0.0, PLAYER_MAX_HEALTH, HEALTH_BITS)?,
                });
            }
            Self::Projectile { full, .. } => {
                *full = Some(ProjectileNetFull {
                    direction: r.read_unit(DIRECTION_BITS)?,
                });
            }
            Self::Obstacle { full, .. } => {
                *full = Some(ObstacleNetFull {
                    variation: r.read_bits(VARIATION_BITS)? as u8,
                    radius: r.read_float(
                        OBSTACLE_MIN_RADIUS,
                        OBSTACLE_MAX_RADIUS,
                        OBSTACLE_RADIUS_BITS,
                    )?,
                });
            }
        }
        Ok(())
    }
}

/// A decoded entity section item.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityFrame {
    /// Entity identifier.
    pub id: EntityId,
    /// Entity kind.
    pub kind: EntityKind,
    /// Decoded payload.
    pub data: EntityNetData,
}

/// Pre-encoded entity caches, spliced into the stream on the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedEntity {
    /// Partial-tier bytes: id + kind + partial fields, byte-aligned.
    pub partial: Vec<u8>,
    /// Full-tier bytes: full fields, byte-aligned.
    pub full: Vec<u8>,
}

/// Roster entry for a player list delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEntry {
    /// The player's entity id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
}

/// Which player-specific scalars need resending.
///
/// A fixed-field struct with explicit per-field reset; no dynamic key
/// iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerDataDirty {
    /// Assigned entity id changed (sent once after join).
    pub id: bool,
    /// Camera zoom changed.
    pub zoom: bool,
}

impl PlayerDataDirty {
    /// Whether any field needs resending.
    pub fn any(&self) -> bool {
        self.id || self.zoom
    }

    /// Reset every field.
    pub fn reset(&mut self) {
        self.id = false;
        self.zoom = false;
    }
}

/// Player-specific scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerData {
    /// The receiving player's own entity id.
    pub id: EntityId,
    /// Camera zoom level.
    pub zoom: u8,
}

impl Default for PlayerData {
    fn default() -> Self {
        Self {
            id: EntityId(0),
            zoom: 0,
        }
    }
}

/// A transient explosion event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    /// Center of the explosion.
    pub position: Vec2,
    /// Visual radius, clamped into the wire range by the producer.
    pub radius: f32,
}

/// Map metadata, sent on first packet or when the map changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapData {
    /// World width in units.
    pub width: u16,
    /// World height in units.
    pub height: u16,
}

/// The per-tick world delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePacket {
    /// Ids that left the receiving player's view or despawned.
    pub deleted_entities: Vec<EntityId>,
    /// Server side: cached encodings for full-tier entities.
    pub cached_full: Vec<CachedEntity>,
    /// Server side: cached partial encodings for delta entities.
    pub cached_partial: Vec<Vec<u8>>,
    /// Decode side: full-tier entities.
    pub full_entities: Vec<EntityFrame>,
    /// Decode side: partial-delta entities.
    pub partial_entities: Vec<EntityFrame>,
    /// Roster additions (or the complete roster on first packet).
    pub new_players: Vec<PlayerEntry>,
    /// Roster removals.
    pub deleted_players: Vec<EntityId>,
    /// Which player scalars are present.
    pub player_data_dirty: PlayerDataDirty,
    /// Player scalar values.
    pub player_data: PlayerData,
    /// Explosions that occurred this tick inside the view.
    pub explosions: Vec<Explosion>,
    /// Shot origins this tick inside the view.
    pub shots: Vec<Vec2>,
    /// Whether the map section is present.
    pub map_dirty: bool,
    /// Map metadata.
    pub map: MapData,
}

impl UpdatePacket {
    fn flags(&self) -> u8 {
        let mut flags = 0;
        if !self.deleted_entities.is_empty() {
            flags |= flags::DELETED_ENTITIES;
        }
        if !self.cached_full.is_empty() {
            flags |= flags::FULL_ENTITIES;
        }
        if !self.cached_partial.is_empty() {
            flags |= flags::PARTIAL_ENTITIES;
        }
        if !self.new_players.is_empty() {
            flags |= flags::NEW_PLAYERS;
        }
        if !self.deleted_players.is_empty() {
            flags |= flags::DELETED_PLAYERS;
        }
        if self.player_data_dirty.any() {
            flags |= flags::PLAYER_DATA;
        }
        if !self.explosions.is_empty() || !self.shots.is_empty() {
            flags |= flags::EVENTS;
        }
        if self.map_dirty {
            flags |= flags::MAP;
        }
        flags
    }

    /// Encode into a stream. Consumes the server-side caches
    /// (`cached_full`/`cached_partial`), not the decode-side vectors.
    pub fn serialize(&self, w: &mut BitWriter) -> Result<(), CodecError> {
        let flags = self.flags();
        w.write_u8(flags)?;

        if flags & flags::DELETED_ENTITIES != 0 {
            w.write_array(&self.deleted_entities, 16, |w, id| w.write_u16(id.0))?;
        }

        if flags & flags::FULL_ENTITIES != 0 {
            w.write_array(&self.cached_full, 16, |w, entity| {
                w.align_to_byte();
                w.write_bytes(&entity.partial)?;
                w.write_bytes(&entity.full)
            })?;
        }

        if flags & flags::PARTIAL_ENTITIES != 0 {
            w.write_array(&self.cached_partial, 16, |w, partial| {
                w.align_to_byte();
                w.write_bytes(partial)
            })?;
        }

        if flags & flags::NEW_PLAYERS != 0 {
            w.write_array(&self.new_players, 8, |w, player| {
                w.write_u16(player.id.0)?;
                w.write_ascii_string(&player.name, NAME_MAX_LEN)
            })?;
        }

        if flags & flags::DELETED_PLAYERS != 0 {
            w.write_array(&self.deleted_players, 8, |w, id| w.write_u16(id.0))?;
        }

        if flags & flags::PLAYER_DATA != 0 {
            w.write_bool(self.player_data_dirty.id)?;
            if self.player_data_dirty.id {
                w.write_u16(self.player_data.id.0)?;
            }
            w.write_bool(self.player_data_dirty.zoom)?;
            if self.player_data_dirty.zoom {
                w.write_u8(self.player_data.zoom)?;
            }
            w.align_to_byte();
        }

        if flags & flags::EVENTS != 0 {
            w.write_array(&self.explosions, 8, |w, explosion| {
                w.write_position(explosion.position)?;
                w.write_float(
                    explosion.radius,
                    EXPLOSION_MIN_RADIUS,
                    EXPLOSION_MAX_RADIUS,
                    EXPLOSION_RADIUS_BITS,
                )
            })?;
            w.write_array(&self.shots, 8, |w, shot| w.write_position(*shot))?;
        }

        if flags & flags::MAP != 0 {
            w.write_u16(self.map.width)?;
            w.write_u16(self.map.height)?;
        }

        Ok(())
    }

    /// Decode from a stream. Entity sections land in `full_entities`
    /// and `partial_entities`.
    pub fn deserialize(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        let mut packet = Self::default();
        let flags = r.read_u8()?;

        if flags & flags::DELETED_ENTITIES != 0 {
            packet.deleted_entities = r.read_array(16, |r| Ok(EntityId(r.read_u16()?)))?;
        }

        if flags & flags::FULL_ENTITIES != 0 {
            packet.full_entities = r.read_array(16, |r| {
                r.align_to_byte();
                let id = EntityId(r.read_u16()?);
                let kind = EntityKind::from_u8(r.read_u8()?)?;
                let mut data = EntityNetData::deserialize_partial(r, kind)?;
                r.align_to_byte();
                data.deserialize_full(r)?;
                r.align_to_byte();
                Ok(EntityFrame { id, kind, data })
            })?;
        }

        if flags & flags::PARTIAL_ENTITIES != 0 {
            packet.partial_entities = r.read_array(16, |r| {
                r.align_to_byte();
                let id = EntityId(r.read_u16()?);
                let kind = EntityKind::from_u8(r.read_u8()?)?;
                let data = EntityNetData::deserialize_partial(r, kind)?;
                r.align_to_byte();
                Ok(EntityFrame { id, kind, data })
            })?;
        }

        if flags & flags::NEW_PLAYERS != 0 {
            packet.new_players = r.read_array(8, |r| {
                Ok(PlayerEntry {
                    id: EntityId(r.read_u16()?),
                    name: r.read_ascii_string(NAME_MAX_LEN)?,
                })
            })?;
        }

        if flags & flags::DELETED_PLAYERS != 0 {
            packet.deleted_players = r.read_array(8, |r| Ok(EntityId(r.read_u16()?)))?;
        }

        if flags & flags::PLAYER_DATA != 0 {
            if r.read_bool()? {
                packet.player_data_dirty.id = true;
                packet.player_data.id = EntityId(r.read_u16()?);
            }
            if r.read_bool()? {
                packet.player_data_dirty.zoom = true;
                packet.player_data.zoom = r.read_u8()?;
            }
            r.align_to_byte();
        }

        if flags & flags::EVENTS != 0 {
            packet.explosions = r.read_array(8, |r| {
                Ok(Explosion {
                    position: r.read_position()?,
                    radius: r.read_float(
                        EXPLOSION_MIN_RADIUS,
                        EXPLOSION_MAX_RADIUS,
                        EXPLOSION_RADIUS_BITS,
                    )?,
                })
            })?;
            packet.shots = r.read_array(8, |r| r.read_position())?;
        }

        if flags & flags::MAP != 0 {
            packet.map_dirty = true;
            packet.map.width = r.read_u16()?;
            packet.map.height = r.read_u16()?;
        }

        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build the cached encodings for an entity the way the server
    /// cache does: partial = id + kind + partial fields, full = full
    /// fields, both byte-aligned.
    fn encode_caches(id: EntityId, data: &EntityNetData) -> CachedEntity {
        let mut partial = BitWriter::new();
        partial.write_u16(id.0).unwrap();
        partial.write_u8(data.kind() as u8).unwrap();
        data.serialize_partial(&mut partial).unwrap();
        partial.align_to_byte();

        let mut full = BitWriter::new();
        data.serialize_full(&mut full).unwrap();
        full.align_to_byte();

        CachedEntity {
            partial: partial.into_bytes(),
            full: full.into_bytes(),
        }
    }

    fn player_data(pos: Vec2, health: f32) -> EntityNetData {
        EntityNetData::Player {
            position: pos,
            direction: Vec2::new(1.0, 0.0),
            full: Some(PlayerNetFull { health }),
        }
    }

    fn round_trip(packet: &UpdatePacket) -> UpdatePacket {
        let mut w = BitWriter::new();
        packet.serialize(&mut w).unwrap();
        let bytes = w.into_bytes();
        UpdatePacket::deserialize(&mut BitReader::new(&bytes)).unwrap()
    }

    #[test]
    fn test_empty_packet_is_one_flags_byte() {
        let packet = UpdatePacket::default();
        let mut w = BitWriter::new();
        packet.serialize(&mut w).unwrap();
        assert_eq!(w.into_bytes(), vec![0]);
    }

    #[test]
    fn test_deleted_entities_round_trip() {
        let packet = UpdatePacket {
            deleted_entities: vec![EntityId(3), EntityId(900)],
            ..Default::default()
        };
        let got = round_trip(&packet);
        assert_eq!(got.deleted_entities, packet.deleted_entities);
    }

    #[test]
    fn test_full_entities_round_trip_via_caches() {
        let data = player_data(Vec2::new(100.0, 200.0), 62.0);
        let packet = UpdatePacket {
            cached_full: vec![encode_caches(EntityId(7), &data)],
            ..Default::default()
        };
        let got = round_trip(&packet);

        assert_eq!(got.full_entities.len(), 1);
        let frame = &got.full_entities[0];
        assert_eq!(frame.id, EntityId(7));
        assert_eq!(frame.kind, EntityKind::Player);
        match frame.data {
            EntityNetData::Player {
                position, full, ..
            } => {
                assert!((position.x - 100.0).abs() < 0.1);
                assert!((position.y - 200.0).abs() < 0.1);
                let full = full.unwrap();
                assert!((full.health - 62.0).abs() <= PLAYER_MAX_HEALTH / 255.0);
            }
            ref other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn test_partial_entities_round_trip_via_caches() {
        let data = EntityNetData::Obstacle {
            position: Vec2::new(64.0, 64.0),
            full: Some(ObstacleNetFull {
                variation: 2,
                radius: 8.0,
            }),
        };
        let caches = encode_caches(EntityId(21), &data);
        let packet = UpdatePacket {
            cached_partial: vec![caches.partial],
            ..Default::default()
        };
        let got = round_trip(&packet);

        assert_eq!(got.partial_entities.len(), 1);
        let frame = &got.partial_entities[0];
        assert_eq!(frame.id, EntityId(21));
        assert_eq!(frame.kind, EntityKind::Obstacle);
        match frame.data {
            EntityNetData::Obstacle { position, full } => {
                assert!((position.x - 64.0).abs() < 0.1);
                // Partial deltas never carry full fields.
                assert!(full.is_none());
            }
            ref other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn test_mixed_sections_round_trip() {
        let player = player_data(Vec2::new(10.0, 20.0), 100.0);
        let projectile = EntityNetData::Projectile {
            position: Vec2::new(30.0, 40.0),
            full: Some(ProjectileNetFull {
                direction: Vec2::new(0.0, -1.0),
            }),
        };

        let packet = UpdatePacket {
            deleted_entities: vec![EntityId(99)],
            cached_full: vec![
                encode_caches(EntityId(1), &player),
                encode_caches(EntityId(2), &projectile),
            ],
            cached_partial: vec![encode_caches(EntityId(3), &player).partial],
            new_players: vec![PlayerEntry {
                id: EntityId(1),
                name: "newcomer".to_string(),
            }],
            deleted_players: vec![EntityId(44)],
            player_data_dirty: PlayerDataDirty { id: true, zoom: true },
            player_data: PlayerData {
                id: EntityId(1),
                zoom: 64,
            },
            explosions: vec![Explosion {
                position: Vec2::new(5.0, 6.0),
                radius: 7.5,
            }],
            shots: vec![Vec2::new(1.0, 2.0)],
            map_dirty: true,
            map: MapData {
                width: 128,
                height: 128,
            },
            ..Default::default()
        };
        let got = round_trip(&packet);

        assert_eq!(got.deleted_entities, vec![EntityId(99)]);
        assert_eq!(got.full_entities.len(), 2);
        assert_eq!(got.full_entities[1].kind, EntityKind::Projectile);
        assert_eq!(got.partial_entities.len(), 1);
        assert_eq!(got.new_players, packet.new_players);
        assert_eq!(got.deleted_players, packet.deleted_players);
        assert_eq!(got.player_data_dirty, packet.player_data_dirty);
        assert_eq!(got.player_data, packet.player_data);
        assert_eq!(got.explosions.len(), 1);
        assert!((got.explosions[0].radius - 7.5).abs() < 0.05);
        assert_eq!(got.shots.len(), 1);
        assert!(got.map_dirty);
        assert_eq!(got.map, packet.map);
    }

    #[test]
    fn test_player_scalars_sent_only_when_dirty() {
        let packet = UpdatePacket {
            player_data_dirty: PlayerDataDirty {
                id: false,
                zoom: true,
            },
            player_data: PlayerData {
                id: EntityId(12),
                zoom: 50,
            },
            ..Default::default()
        };
        let got = round_trip(&packet);
        assert!(!got.player_data_dirty.id);
        assert!(got.player_data_dirty.zoom);
        assert_eq!(got.player_data.zoom, 50);
        // The id scalar was not on the wire at all.
        assert_eq!(got.player_data.id, EntityId(0));
    }

    #[test]
    fn test_serialize_full_without_full_fields_fails_fast() {
        let data = EntityNetData::Player {
            position: Vec2::ZERO,
            direction: Vec2::RIGHT,
            full: None,
        };
        let mut w = BitWriter::new();
        assert!(matches!(
            data.serialize_full(&mut w),
            Err(CodecError::MissingFullData)
        ));
    }

    #[test]
    fn test_out_of_range_health_aborts_packet() {
        let data = player_data(Vec2::ZERO, 150.0);
        let mut w = BitWriter::new();
        assert!(matches!(
            data.serialize_full(&mut w),
            Err(CodecError::FloatOutOfRange { .. })
        ));
    }
}
