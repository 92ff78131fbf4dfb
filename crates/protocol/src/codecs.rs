//! Realm protocol number and string codecs
//!
//! Integers are written in base 253 with every byte offset by one, so the
//! values 0 and 255 never appear inside a number. 254 fills unused high
//! bytes and 255 is reserved as the string break marker.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, Result};

/// Largest value + 1 that fits in one encoded byte
pub const MAX1: u32 = 253;
/// Largest value + 1 that fits in two encoded bytes
pub const MAX2: u32 = 64_009;
/// Largest value + 1 that fits in three encoded bytes
pub const MAX3: u32 = 16_194_277;

/// Filler byte for unused high digits
pub const FILLER: u8 = 254;
/// Terminator for break-delimited strings
pub const BREAK: u8 = 255;

/// Encode a number into its four-byte base-253 form.
///
/// # Format
/// - Byte 0 holds the lowest digit, byte 3 the highest
/// - Digits are stored as `digit + 1`
/// - High digits the value does not reach are [`FILLER`]
pub fn encode_number(number: u32) -> [u8; 4] {
    let mut value = number;
    let mut bytes = [FILLER; 4];

    if number >= MAX3 {
        bytes[3] = (value / MAX3 + 1) as u8;
        value %= MAX3;
    }
    if number >= MAX2 {
        bytes[2] = (value / MAX2 + 1) as u8;
        value %= MAX2;
    }
    if number >= MAX1 {
        bytes[1] = (value / MAX1 + 1) as u8;
        value %= MAX1;
    }
    bytes[0] = (value + 1) as u8;
    bytes
}

/// Decode up to four base-253 bytes, lowest digit first.
///
/// 0 and [`FILLER`] both read as a zero digit.
pub fn decode_number(bytes: &[u8]) -> u32 {
    const WEIGHTS: [u32; 4] = [1, MAX1, MAX2, MAX3];

    bytes
        .iter()
        .take(4)
        .zip(WEIGHTS)
        .map(|(&byte, weight)| {
            let digit = if byte == 0 || byte == FILLER { 0 } else { byte as u32 - 1 };
            digit.wrapping_mul(weight)
        })
        .fold(0u32, u32::wrapping_add)
}

/// Cursor over a decoded packet body
#[derive(Debug, Clone)]
pub struct PacketReader {
    buf: Bytes,
}

impl PacketReader {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn take(&mut self, len: usize) -> Result<Bytes> {
        if self.buf.remaining() < len {
            return Err(ProtocolError::Truncated { needed: len - self.buf.remaining() });
        }
        Ok(self.buf.split_to(len))
    }

    /// Raw byte without number decoding
    pub fn get_byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// One-byte number (0..253)
    pub fn get_char(&mut self) -> Result<u32> {
        Ok(decode_number(&self.take(1)?))
    }

    /// Two-byte number (0..64009)
    pub fn get_short(&mut self) -> Result<u32> {
        Ok(decode_number(&self.take(2)?))
    }

    /// Three-byte number
    pub fn get_three(&mut self) -> Result<u32> {
        Ok(decode_number(&self.take(3)?))
    }

    /// Four-byte number
    pub fn get_int(&mut self) -> Result<u32> {
        Ok(decode_number(&self.take(4)?))
    }

    /// Everything left in the packet as text
    pub fn get_end_string(&mut self) -> Result<String> {
        let rest = self.buf.split_to(self.buf.remaining());
        to_string(&rest)
    }

    /// Text up to the next [`BREAK`] byte, which is consumed.
    /// A missing break reads to the end of the packet.
    pub fn get_break_string(&mut self) -> Result<String> {
        match self.buf.iter().position(|&b| b == BREAK) {
            Some(index) => {
                let text = self.buf.split_to(index);
                self.buf.advance(1);
                to_string(&text)
            }
            None => self.get_end_string(),
        }
    }
}

fn to_string(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| ProtocolError::InvalidText(e.to_string()))
}

/// Builder for an outbound packet body
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: BytesMut,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_byte(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    /// Values past the width are clamped to the largest encodable number.
    pub fn add_char(&mut self, value: u32) -> &mut Self {
        let bytes = encode_number(value.min(MAX1 - 1));
        self.buf.put_slice(&bytes[..1]);
        self
    }

    pub fn add_short(&mut self, value: u32) -> &mut Self {
        let bytes = encode_number(value.min(MAX2 - 1));
        self.buf.put_slice(&bytes[..2]);
        self
    }

    pub fn add_three(&mut self, value: u32) -> &mut Self {
        let bytes = encode_number(value.min(MAX3 - 1));
        self.buf.put_slice(&bytes[..3]);
        self
    }

    pub fn add_int(&mut self, value: u32) -> &mut Self {
        self.buf.put_slice(&encode_number(value));
        self
    }

    /// Text with no terminator; only valid as the last field.
    pub fn add_string(&mut self, value: &str) -> &mut Self {
        self.buf.put_slice(value.as_bytes());
        self
    }

    /// Text followed by a [`BREAK`] byte.
    pub fn add_break_string(&mut self, value: &str) -> &mut Self {
        self.buf.extend(value.bytes().filter(|&b| b != BREAK));
        self.buf.put_u8(BREAK);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> BytesMut {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_number_digits() {
        assert_eq!(encode_number(0), [1, FILLER, FILLER, FILLER]);
        assert_eq!(encode_number(252), [253, FILLER, FILLER, FILLER]);
        assert_eq!(encode_number(253), [1, 2, FILLER, FILLER]);
        assert_eq!(encode_number(MAX2), [1, 1, 2, FILLER]);
    }

    #[test]
    fn test_number_boundaries_decode() {
        for value in [0, 1, 252, 253, 254, 64_008, 64_009, 16_194_276, 16_194_277, 100_000_000] {
            assert_eq!(decode_number(&encode_number(value)), value, "Failed for {}", value);
        }
    }

    #[test]
    fn test_filler_and_zero_read_as_zero_digit() {
        assert_eq!(decode_number(&[FILLER, FILLER]), 0);
        assert_eq!(decode_number(&[0]), 0);
        assert_eq!(decode_number(&[5, FILLER]), 4);
    }

    #[test]
    fn test_reader_fields() {
        let mut writer = PacketWriter::new();
        writer
            .add_char(7)
            .add_short(1_000)
            .add_three(70_000)
            .add_break_string("alice")
            .add_string("hello there");

        let mut reader = PacketReader::new(writer.finish().freeze());
        assert_eq!(reader.get_char().unwrap(), 7);
        assert_eq!(reader.get_short().unwrap(), 1_000);
        assert_eq!(reader.get_three().unwrap(), 70_000);
        assert_eq!(reader.get_break_string().unwrap(), "alice");
        assert_eq!(reader.get_end_string().unwrap(), "hello there");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_reader_truncated() {
        let mut reader = PacketReader::new(Bytes::from_static(&[1]));
        assert!(matches!(reader.get_short(), Err(ProtocolError::Truncated { needed: 1 })));
    }

    #[test]
    fn test_char_clamps() {
        let mut writer = PacketWriter::new();
        writer.add_char(1_000);
        let mut reader = PacketReader::new(writer.finish().freeze());
        assert_eq!(reader.get_char().unwrap(), 252);
    }
}
