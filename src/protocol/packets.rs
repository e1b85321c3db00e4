//! Packet Payloads
//!
//! Encode/decode contracts for the simple packet kinds. The update
//! packet has its own module.

use crate::core::vec2::Vec2;
use crate::game::defs::ClassKind;
use crate::protocol::bitstream::{BitReader, BitWriter, CodecError};
use crate::protocol::NAME_MAX_LEN;

/// Bits per axis for input direction vectors.
const DIRECTION_BITS: u32 = 16;

/// Client join request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinPacket {
    /// Display name, ASCII, truncated to [`NAME_MAX_LEN`] bytes.
    pub name: String,
    /// Selected class.
    pub class: ClassKind,
}

impl JoinPacket {
    /// Encode into a stream.
    pub fn serialize(&self, w: &mut BitWriter) -> Result<(), CodecError> {
        w.write_ascii_string(&self.name, NAME_MAX_LEN)?;
        self.class.write(w)
    }

    /// Decode from a stream.
    pub fn deserialize(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            name: r.read_ascii_string(NAME_MAX_LEN)?,
            class: ClassKind::read(r)?,
        })
    }
}

/// Client movement and action intents for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputPacket {
    /// Whether the player wants to move along `direction`.
    pub moving: bool,
    /// Whether the primary action (shooting) is held.
    pub shooting: bool,
    /// Aim/movement direction, a unit vector.
    pub direction: Vec2,
}

impl InputPacket {
    /// Encode into a stream.
    pub fn serialize(&self, w: &mut BitWriter) -> Result<(), CodecError> {
        w.write_bool(self.moving)?;
        w.write_bool(self.shooting)?;
        w.write_unit(self.direction, DIRECTION_BITS)
    }

    /// Decode from a stream.
    pub fn deserialize(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            moving: r.read_bool()?,
            shooting: r.read_bool()?,
            direction: r.read_unit(DIRECTION_BITS)?,
        })
    }
}

/// Terminal stat summary sent when the player dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameOverPacket {
    /// Kills scored during the life.
    pub kills: u8,
}

impl GameOverPacket {
    /// Encode into a stream.
    pub fn serialize(&self, w: &mut BitWriter) -> Result<(), CodecError> {
        w.write_u8(self.kills)
    }

    /// Decode from a stream.
    pub fn deserialize(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            kills: r.read_u8()?,
        })
    }
}
