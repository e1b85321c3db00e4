//! Entity Dirty Tracking & Serialization Caches
//!
//! Each mutated entity is re-encoded exactly once per tick, into a
//! partial cache (id + kind + high-churn fields) and, when its rare
//! fields changed too, a full cache (low-churn fields). Both caches end
//! byte-aligned so update packets can splice them by byte copy for
//! every recipient without re-encoding.
//!
//! Dirty membership is two-tier and exclusive: full supersedes
//! partial, so an entity marked both ways is encoded once, fully.

use std::collections::BTreeSet;

use crate::protocol::bitstream::{BitWriter, CodecError};
use crate::protocol::update::{CachedEntity, EntityNetData};
use crate::protocol::EntityId;

/// The per-tick sets of entities needing re-serialization.
#[derive(Debug, Clone, Default)]
pub struct DirtySets {
    partial: BTreeSet<EntityId>,
    full: BTreeSet<EntityId>,
}

impl DirtySets {
    /// Mark an entity's high-churn fields changed. A no-op when the
    /// entity is already fully dirty.
    pub fn mark_partial(&mut self, id: EntityId) {
        if !self.full.contains(&id) {
            self.partial.insert(id);
        }
    }

    /// Mark an entity's rare fields changed. Drops it from the partial
    /// set so it is only encoded once.
    pub fn mark_full(&mut self, id: EntityId) {
        self.partial.remove(&id);
        self.full.insert(id);
    }

    /// Remove a despawned entity from both tiers.
    pub fn forget(&mut self, id: EntityId) {
        self.partial.remove(&id);
        self.full.remove(&id);
    }

    /// Partially dirty entities, in id order.
    pub fn partial(&self) -> &BTreeSet<EntityId> {
        &self.partial
    }

    /// Fully dirty entities, in id order.
    pub fn full(&self) -> &BTreeSet<EntityId> {
        &self.full
    }

    /// Whether `id` needs a full re-encode this tick.
    pub fn is_full(&self, id: EntityId) -> bool {
        self.full.contains(&id)
    }

    /// Whether `id` needs a partial re-encode this tick.
    pub fn is_partial(&self, id: EntityId) -> bool {
        self.partial.contains(&id)
    }

    /// Reset both tiers for the next tick.
    pub fn clear(&mut self) {
        self.partial.clear();
        self.full.clear();
    }
}

/// Encode the partial cache for an entity: id, kind tag, then the
/// high-churn fields, padded to a byte boundary.
pub fn encode_partial_cache(id: EntityId, data: &EntityNetData) -> Result<Vec<u8>, CodecError> {
    let mut w = BitWriter::new();
    w.write_u16(id.0)?;
    w.write_u8(data.kind() as u8)?;
    data.serialize_partial(&mut w)?;
    w.align_to_byte();
    Ok(w.into_bytes())
}

/// Encode both cache tiers. The full tier holds only the rare fields;
/// on the wire a full entity is the partial bytes followed by these.
pub fn encode_caches(id: EntityId, data: &EntityNetData) -> Result<CachedEntity, CodecError> {
    let partial = encode_partial_cache(id, data)?;
    let mut w = BitWriter::new();
    data.serialize_full(&mut w)?;
    w.align_to_byte();
    Ok(CachedEntity {
        partial,
        full: w.into_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;
    use crate::protocol::bitstream::BitReader;
    use crate::protocol::update::PlayerNetFull;
    use crate::protocol::EntityKind;

    fn sample() -> EntityNetData {
        EntityNetData::Player {
            position: Vec2::new(12.0, 34.0),
            direction: Vec2::new(0.0, 1.0),
            full: Some(PlayerNetFull { health: 80.0 }),
        }
    }

    #[test]
    fn test_full_supersedes_partial() {
        let mut dirty = DirtySets::default();
        dirty.mark_partial(EntityId(1));
        dirty.mark_full(EntityId(1));

        assert!(dirty.is_full(EntityId(1)));
        assert!(!dirty.is_partial(EntityId(1)));

        // Marking partial after full must not demote it.
        dirty.mark_partial(EntityId(1));
        assert!(!dirty.is_partial(EntityId(1)));
    }

    #[test]
    fn test_forget_clears_both_tiers() {
        let mut dirty = DirtySets::default();
        dirty.mark_partial(EntityId(1));
        dirty.mark_full(EntityId(2));
        dirty.forget(EntityId(1));
        dirty.forget(EntityId(2));
        assert!(dirty.partial().is_empty());
        assert!(dirty.full().is_empty());
    }

    #[test]
    fn test_caches_are_byte_aligned_and_decodable() {
        let data = sample();
        let caches = encode_caches(EntityId(6), &data).unwrap();

        // Wire layout of a full entity: partial bytes then full bytes.
        let mut bytes = caches.partial.clone();
        bytes.extend_from_slice(&caches.full);

        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_u16().unwrap(), 6);
        let kind = EntityKind::from_u8(r.read_u8().unwrap()).unwrap();
        assert_eq!(kind, EntityKind::Player);
        let mut decoded = EntityNetData::deserialize_partial(&mut r, kind).unwrap();
        r.align_to_byte();
        decoded.deserialize_full(&mut r).unwrap();

        match decoded {
            EntityNetData::Player { position, full, .. } => {
                assert!((position.x - 12.0).abs() < 0.1);
                assert!((full.unwrap().health - 80.0).abs() < 0.5);
            }
            other => panic!("unexpected data: {other:?}"),
        }
    }
}
