//! Class Definitions
//!
//! Numeric parameters for the selectable player classes. Gameplay math
//! consumes these values; the table itself is static and indexed by a
//! dense wire id (0 is reserved for "no/invalid class").

use crate::protocol::bitstream::{BitReader, BitWriter, CodecError};

/// Selectable player class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassKind {
    /// Balanced default loadout.
    #[default]
    Assault,
    /// Slow, high-damage, wide view.
    Sniper,
    /// Fast firing, low damage, narrow view.
    Auto,
}

/// Parameters for one class.
#[derive(Debug, Clone, Copy)]
pub struct ClassDef {
    /// Seconds between shots.
    pub fire_delay: f32,
    /// Damage per projectile hit.
    pub damage: f32,
    /// Projectile speed in world units per second.
    pub projectile_speed: f32,
    /// Camera zoom, which drives the interest radius.
    pub zoom: u8,
}

const ASSAULT: ClassDef = ClassDef {
    fire_delay: 0.25,
    damage: 15.0,
    projectile_speed: 80.0,
    zoom: 64,
};

const SNIPER: ClassDef = ClassDef {
    fire_delay: 1.0,
    damage: 80.0,
    projectile_speed: 130.0,
    zoom: 72,
};

const AUTO: ClassDef = ClassDef {
    fire_delay: 0.1,
    damage: 8.0,
    projectile_speed: 70.0,
    zoom: 50,
};

/// Bits used to encode a class id on the wire.
pub const CLASS_BITS: u32 = 2;

impl ClassKind {
    /// Look up the parameter table for this class.
    pub const fn def(self) -> &'static ClassDef {
        match self {
            Self::Assault => &ASSAULT,
            Self::Sniper => &SNIPER,
            Self::Auto => &AUTO,
        }
    }

    /// Dense wire id. 0 is reserved.
    const fn wire_id(self) -> u32 {
        match self {
            Self::Assault => 1,
            Self::Sniper => 2,
            Self::Auto => 3,
        }
    }

    fn from_wire_id(id: u32) -> Result<Self, CodecError> {
        match id {
            1 => Ok(Self::Assault),
            2 => Ok(Self::Sniper),
            3 => Ok(Self::Auto),
            other => Err(CodecError::UnknownDefinition(other)),
        }
    }

    /// Write this class id to a stream.
    pub fn write(self, w: &mut BitWriter) -> Result<(), CodecError> {
        w.write_bits(self.wire_id(), CLASS_BITS)
    }

    /// Read a class id from a stream.
    pub fn read(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Self::from_wire_id(r.read_bits(CLASS_BITS)?)
    }
}
