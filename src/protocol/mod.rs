//! Wire Protocol
//!
//! Bit-packed binary protocol between clients and the server. The
//! codec lives in [`bitstream`], individual packet payloads in
//! [`packets`] and [`update`], and this module holds the framing: a
//! direction-specific discriminator written before each payload, with
//! every packet padded to a byte boundary so multiple packets
//! concatenate into one transport frame.
//!
//! Discriminators are dense per direction and 0 is reserved invalid,
//! so the dispatch is a statically-built match rather than a mutable
//! registry.

pub mod bitstream;
pub mod packets;
pub mod update;

use bitstream::{BitReader, BitWriter, CodecError};
use packets::{GameOverPacket, InputPacket, JoinPacket};
use update::UpdatePacket;

pub use bitstream::{MAX_POSITION, POSITION_BITS};

/// Bits used for the packet discriminator in either direction.
pub const PACKET_TYPE_BITS: u32 = 2;

/// Maximum player display-name length in bytes.
pub const NAME_MAX_LEN: usize = 16;

/// Unique entity identifier, dense within a 16-bit space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u16);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Entity kind tag, 8 bits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum EntityKind {
    /// A connected player's avatar.
    Player = 0,
    /// A fired projectile.
    Projectile = 1,
    /// A destructible obstacle.
    Obstacle = 2,
}

impl EntityKind {
    /// Decode a kind tag from its wire byte.
    pub fn from_u8(value: u8) -> Result<Self, CodecError> {
        match value {
            0 => Ok(Self::Player),
            1 => Ok(Self::Projectile),
            2 => Ok(Self::Obstacle),
            other => Err(CodecError::UnknownDefinition(other as u32)),
        }
    }
}

/// Packets a client may send to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    /// Join request with display name and class selection.
    Join(JoinPacket),
    /// Per-tick movement and action intents.
    Input(InputPacket),
}

/// Packets the server may send to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPacket {
    /// Per-tick world delta.
    Update(UpdatePacket),
    /// Terminal stat summary after the player dies.
    GameOver(GameOverPacket),
}

// Direction-specific discriminators; 0 is reserved invalid.
const CLIENT_JOIN: u32 = 1;
const CLIENT_INPUT: u32 = 2;
const SERVER_UPDATE: u32 = 1;
const SERVER_GAME_OVER: u32 = 2;

/// Writer framing packets into one outbound byte frame.
#[derive(Debug, Default)]
pub struct PacketStream {
    writer: BitWriter,
}

impl PacketStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a client-to-server packet.
    pub fn write_client_packet(&mut self, packet: &ClientPacket) -> Result<(), CodecError> {
        match packet {
            ClientPacket::Join(p) => {
                self.writer.write_bits(CLIENT_JOIN, PACKET_TYPE_BITS)?;
                p.serialize(&mut self.writer)?;
            }
            ClientPacket::Input(p) => {
                self.writer.write_bits(CLIENT_INPUT, PACKET_TYPE_BITS)?;
                p.serialize(&mut self.writer)?;
            }
        }
        self.writer.align_to_byte();
        Ok(())
    }

    /// Append a server-to-client packet.
    pub fn write_server_packet(&mut self, packet: &ServerPacket) -> Result<(), CodecError> {
        match packet {
            ServerPacket::Update(p) => {
                self.writer.write_bits(SERVER_UPDATE, PACKET_TYPE_BITS)?;
                p.serialize(&mut self.writer)?;
            }
            ServerPacket::GameOver(p) => {
                self.writer.write_bits(SERVER_GAME_OVER, PACKET_TYPE_BITS)?;
                p.serialize(&mut self.writer)?;
            }
        }
        self.writer.align_to_byte();
        Ok(())
    }

    /// Finish the frame and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_bytes()
    }
}

/// Reader splitting an inbound byte frame into packets.
#[derive(Debug)]
pub struct PacketReader<'a> {
    reader: BitReader<'a>,
}

impl<'a> PacketReader<'a> {
    /// Create a reader over one transport frame.
    pub fn new(frame: &'a [u8]) -> Self {
        Self {
            reader: BitReader::new(frame),
        }
    }

    fn next_discriminator(&mut self) -> Option<Result<u32, CodecError>> {
        if self.reader.remaining_bits() < PACKET_TYPE_BITS as usize {
            return None;
        }
        Some(self.reader.read_bits(PACKET_TYPE_BITS))
    }

    /// Decode the next client-to-server packet, or `None` at frame end.
    ///
    /// A decode failure applies to the single packet; the caller drops
    /// the message and keeps the connection open.
    pub fn next_client_packet(&mut self) -> Option<Result<ClientPacket, CodecError>> {
        let disc = match self.next_discriminator()? {
            Ok(d) => d,
            Err(e) => return Some(Err(e)),
        };
        let result = match disc {
            CLIENT_JOIN => JoinPacket::deserialize(&mut self.reader).map(ClientPacket::Join),
            CLIENT_INPUT => InputPacket::deserialize(&mut self.reader).map(ClientPacket::Input),
            other => Err(CodecError::UnknownPacket(other)),
        };
        self.reader.align_to_byte();
        Some(result)
    }

    /// Decode the next server-to-client packet, or `None` at frame end.
    pub fn next_server_packet(&mut self) -> Option<Result<ServerPacket, CodecError>> {
        let disc = match self.next_discriminator()? {
            Ok(d) => d,
            Err(e) => return Some(Err(e)),
        };
        let result = match disc {
            SERVER_UPDATE => UpdatePacket::deserialize(&mut self.reader).map(ServerPacket::Update),
            SERVER_GAME_OVER => {
                GameOverPacket::deserialize(&mut self.reader).map(ServerPacket::GameOver)
            }
            other => Err(CodecError::UnknownPacket(other)),
        };
        self.reader.align_to_byte();
        Some(result)
    }
}
