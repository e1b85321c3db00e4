//! Bit-Stream Codec
//!
//! Quantized, bit-packed encoding over a raw byte buffer. All
//! multi-bit values are written most-significant-bit-first in stream
//! order, so a writer and reader that agree on field order and widths
//! agree on the bytes.
//!
//! Error policy: bit widths and value ranges are protocol contracts,
//! so violating them fails fast and aborts construction of the packet.
//! Array counts are data-driven sizes and degrade instead: an array
//! longer than its count prefix can address is truncated with a
//! warning, never corrupting the stream.

use tracing::warn;

use crate::core::vec2::Vec2;

/// Maximum world coordinate encodable by [`BitWriter::write_position`].
pub const MAX_POSITION: f32 = 1024.0;

/// Bits per axis for quantized world positions.
pub const POSITION_BITS: u32 = 16;

/// Unit-vector axis range, expanded past 1.0 so normalized vectors
/// that overshoot from floating-point error still encode.
pub const UNIT_EPS: f32 = 1.0001;

/// Errors produced by the bit-stream codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Bit width outside the valid `[1, 31]` range.
    #[error("invalid bit width: {0}")]
    InvalidBitWidth(u32),

    /// Integer does not fit in the declared width.
    #[error("value {value} does not fit in {bits} bits")]
    IntOutOfRange {
        /// The offending value.
        value: u32,
        /// The declared width.
        bits: u32,
    },

    /// Float outside its declared quantization range.
    #[error("value {value} outside quantization range [{min}, {max}]")]
    FloatOutOfRange {
        /// The offending value.
        value: f32,
        /// Declared minimum.
        min: f32,
        /// Declared maximum.
        max: f32,
    },

    /// Read past the end of the stream (truncated payload).
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// Byte-copy operation attempted on an unaligned cursor.
    #[error("stream cursor is not byte-aligned")]
    Unaligned,

    /// Discriminator that maps to no known packet kind.
    #[error("unknown packet discriminator: {0}")]
    UnknownPacket(u32),

    /// Id that maps to no known definition.
    #[error("unknown definition id: {0}")]
    UnknownDefinition(u32),

    /// Full-tier encode requested for data without full fields.
    #[error("entity data is missing its full fields")]
    MissingFullData,
}

fn check_width(bits: u32) -> Result<(), CodecError> {
    if !(1..=31).contains(&bits) {
        return Err(CodecError::InvalidBitWidth(bits));
    }
    Ok(())
}

/// Bit-level writer over a growable byte buffer.
#[derive(Debug, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    bit_pos: usize,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with `bytes` of pre-allocated capacity.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            bit_pos: 0,
        }
    }

    /// Current cursor position in bits.
    pub fn bit_len(&self) -> usize {
        self.bit_pos
    }

    /// Number of whole bytes the stream occupies (cursor rounded up).
    pub fn byte_len(&self) -> usize {
        (self.bit_pos + 7) / 8
    }

    /// Whether the cursor sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.bit_pos % 8 == 0
    }

    /// Consume the writer and return the encoded bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.byte_len());
        self.buf
    }

    /// Write the low `bits` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u32, bits: u32) -> Result<(), CodecError> {
        check_width(bits)?;
        if value >> bits != 0 {
            return Err(CodecError::IntOutOfRange { value, bits });
        }

        let mut remaining = bits;
        while remaining > 0 {
            let byte_idx = self.bit_pos / 8;
            if byte_idx == self.buf.len() {
                self.buf.push(0);
            }
            let bit_off = (self.bit_pos % 8) as u32;
            let avail = 8 - bit_off;
            let take = avail.min(remaining);
            let chunk = ((value >> (remaining - take)) & ((1 << take) - 1)) as u8;
            self.buf[byte_idx] |= chunk << (avail - take);
            self.bit_pos += take as usize;
            remaining -= take;
        }
        Ok(())
    }

    /// Write a single boolean bit.
    pub fn write_bool(&mut self, value: bool) -> Result<(), CodecError> {
        self.write_bits(value as u32, 1)
    }

    /// Write an 8-bit integer.
    pub fn write_u8(&mut self, value: u8) -> Result<(), CodecError> {
        self.write_bits(value as u32, 8)
    }

    /// Write a 16-bit integer.
    pub fn write_u16(&mut self, value: u16) -> Result<(), CodecError> {
        self.write_bits(value as u32, 16)
    }

    /// Quantize a bounded float into `bits` bits.
    ///
    /// Lossy by design; the reconstruction error is bounded by
    /// `(max - min) / (2^bits - 1)`. A value outside `[min, max]`
    /// denotes a protocol/content mismatch and fails fast.
    pub fn write_float(
        &mut self,
        value: f32,
        min: f32,
        max: f32,
        bits: u32,
    ) -> Result<(), CodecError> {
        check_width(bits)?;
        if !(value >= min && value <= max) {
            return Err(CodecError::FloatOutOfRange { value, min, max });
        }
        let range = (1u32 << bits) - 1;
        let raw = ((value - min) / (max - min) * range as f32).round() as u32;
        self.write_bits(raw, bits)
    }

    /// Write a vector with per-axis quantization ranges.
    pub fn write_vector(
        &mut self,
        v: Vec2,
        min: Vec2,
        max: Vec2,
        bits: u32,
    ) -> Result<(), CodecError> {
        self.write_float(v.x, min.x, max.x, bits)?;
        self.write_float(v.y, min.y, max.y, bits)
    }

    /// Write a world position with the game default range and width.
    pub fn write_position(&mut self, v: Vec2) -> Result<(), CodecError> {
        self.write_vector(
            v,
            Vec2::ZERO,
            Vec2::new(MAX_POSITION, MAX_POSITION),
            POSITION_BITS,
        )
    }

    /// Write a unit vector at `bits` bits per axis.
    pub fn write_unit(&mut self, v: Vec2, bits: u32) -> Result<(), CodecError> {
        self.write_vector(
            v,
            Vec2::new(-UNIT_EPS, -UNIT_EPS),
            Vec2::new(UNIT_EPS, UNIT_EPS),
            bits,
        )
    }

    /// Write a fixed-size ASCII string field of `max_len` bytes.
    ///
    /// Longer input is silently truncated; non-ASCII bytes are
    /// replaced with `?`; shorter input is zero-padded.
    pub fn write_ascii_string(&mut self, s: &str, max_len: usize) -> Result<(), CodecError> {
        let mut written = 0;
        for &b in s.as_bytes().iter().take(max_len) {
            let b = if b.is_ascii() && b != 0 { b } else { b'?' };
            self.write_u8(b)?;
            written += 1;
        }
        for _ in written..max_len {
            self.write_u8(0)?;
        }
        Ok(())
    }

    /// Write a length-prefixed array with `count_bits` of count.
    ///
    /// Supplying more items than the prefix can address truncates the
    /// array to the addressable maximum and logs a warning.
    pub fn write_array<T>(
        &mut self,
        items: &[T],
        count_bits: u32,
        mut f: impl FnMut(&mut Self, &T) -> Result<(), CodecError>,
    ) -> Result<(), CodecError> {
        check_width(count_bits)?;
        let max = ((1u32 << count_bits) - 1) as usize;
        let count = if items.len() > max {
            warn!(
                len = items.len(),
                max, "array overflows its count prefix, truncating"
            );
            max
        } else {
            items.len()
        };
        self.write_bits(count as u32, count_bits)?;
        for item in &items[..count] {
            f(self, item)?;
        }
        Ok(())
    }

    /// Pad with zero bits to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        if self.bit_pos % 8 != 0 {
            self.bit_pos = (self.bit_pos / 8 + 1) * 8;
            if self.buf.len() < self.bit_pos / 8 {
                self.buf.resize(self.bit_pos / 8, 0);
            }
        }
    }

    /// Splice pre-encoded bytes into the stream without re-encoding.
    ///
    /// The cursor must be byte-aligned; callers align both the source
    /// cache and this stream before copying.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        if !self.is_aligned() {
            return Err(CodecError::Unaligned);
        }
        self.buf.truncate(self.bit_pos / 8);
        self.buf.extend_from_slice(bytes);
        self.bit_pos += bytes.len() * 8;
        Ok(())
    }
}

/// Bit-level reader over a borrowed byte slice.
#[derive(Debug)]
pub struct BitReader<'a> {
    buf: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader over `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, bit_pos: 0 }
    }

    /// Bits left before the end of the buffer.
    pub fn remaining_bits(&self) -> usize {
        self.buf.len() * 8 - self.bit_pos
    }

    /// Whether the cursor sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.bit_pos % 8 == 0
    }

    /// Read `bits` bits, most significant first.
    pub fn read_bits(&mut self, bits: u32) -> Result<u32, CodecError> {
        check_width(bits)?;
        if self.remaining_bits() < bits as usize {
            return Err(CodecError::UnexpectedEof);
        }

        let mut value = 0u32;
        let mut remaining = bits;
        while remaining > 0 {
            let byte = self.buf[self.bit_pos / 8];
            let bit_off = (self.bit_pos % 8) as u32;
            let avail = 8 - bit_off;
            let take = avail.min(remaining);
            // Mask in u32: a u8 mask would overflow when a whole byte
            // is taken (1u8 << 8).
            let chunk = (byte as u32 >> (avail - take)) & ((1u32 << take) - 1);
            value = (value << take) | chunk;
            self.bit_pos += take as usize;
            remaining -= take;
        }
        Ok(value)
    }

    /// Read a single boolean bit.
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Read an 8-bit integer.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Read a 16-bit integer.
    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(self.read_bits(16)? as u16)
    }

    /// Reconstruct a quantized float.
    pub fn read_float(&mut self, min: f32, max: f32, bits: u32) -> Result<f32, CodecError> {
        let range = (1u32 << bits) - 1;
        let raw = self.read_bits(bits)?;
        Ok(min + (max - min) * raw as f32 / range as f32)
    }

    /// Read a vector with per-axis quantization ranges.
    pub fn read_vector(&mut self, min: Vec2, max: Vec2, bits: u32) -> Result<Vec2, CodecError> {
        Ok(Vec2::new(
            self.read_float(min.x, max.x, bits)?,
            self.read_float(min.y, max.y, bits)?,
        ))
    }

    /// Read a world position with the game default range and width.
    pub fn read_position(&mut self) -> Result<Vec2, CodecError> {
        self.read_vector(
            Vec2::ZERO,
            Vec2::new(MAX_POSITION, MAX_POSITION),
            POSITION_BITS,
        )
    }

    /// Read a unit vector at `bits` bits per axis.
    pub fn read_unit(&mut self, bits: u32) -> Result<Vec2, CodecError> {
        self.read_vector(
            Vec2::new(-UNIT_EPS, -UNIT_EPS),
            Vec2::new(UNIT_EPS, UNIT_EPS),
            bits,
        )
    }

    /// Read a fixed-size ASCII string field of `max_len` bytes.
    pub fn read_ascii_string(&mut self, max_len: usize) -> Result<String, CodecError> {
        let mut out = String::with_capacity(max_len);
        let mut terminated = false;
        for _ in 0..max_len {
            let b = self.read_u8()?;
            if b == 0 {
                terminated = true;
            }
            if !terminated && b.is_ascii() {
                out.push(b as char);
            }
        }
        Ok(out)
    }

    /// Read a length-prefixed array written by [`BitWriter::write_array`].
    pub fn read_array<T>(
        &mut self,
        count_bits: u32,
        mut f: impl FnMut(&mut Self) -> Result<T, CodecError>,
    ) -> Result<Vec<T>, CodecError> {
        let count = self.read_bits(count_bits)? as usize;
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(f(self)?);
        }
        Ok(items)
    }

    /// Skip padding bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        if self.bit_pos % 8 != 0 {
            self.bit_pos = (self.bit_pos / 8 + 1) * 8;
        }
    }
}
