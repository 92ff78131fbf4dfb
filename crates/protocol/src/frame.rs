//! Length-prefixed framing for `tokio_util::codec`

use bytes::{Buf, BufMut, Bytes, BytesMut};
use realm_core::RealmError;
use tokio_util::codec::{Decoder, Encoder};

use crate::codecs::{decode_number, encode_number, FILLER};
use crate::error::ProtocolError;

/// Largest payload a frame may carry (two-byte number ceiling)
pub const MAX_FRAME: usize = 64_008;

const LENGTH_BYTES: usize = 2;

/// Outbound unit for [`FrameCodec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Payload (already transformed) that gets a length prefix
    Packet(Bytes),
    /// Bytes written exactly as given
    Raw(Bytes),
}

/// The fixed three bytes sent instead of dispatching a rate-limited packet.
///
/// The first two bytes decode to a zero length, which no real frame uses.
pub fn busy_ack(sequence: u32) -> OutboundFrame {
    OutboundFrame::Raw(Bytes::copy_from_slice(&[FILLER, FILLER, sequence as u8]))
}

/// Splits the inbound stream into payloads and prefixes outbound ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = RealmError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_BYTES {
            return Ok(None);
        }

        let length = decode_number(&src[..LENGTH_BYTES]) as usize;
        if length == 0 || length > MAX_FRAME {
            return Err(ProtocolError::FrameLength(length).into());
        }

        if src.len() < LENGTH_BYTES + length {
            src.reserve(LENGTH_BYTES + length - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_BYTES);
        Ok(Some(src.split_to(length).freeze()))
    }
}

impl Encoder<OutboundFrame> for FrameCodec {
    type Error = RealmError;

    fn encode(&mut self, item: OutboundFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            OutboundFrame::Packet(payload) => {
                if payload.is_empty() || payload.len() > MAX_FRAME {
                    return Err(ProtocolError::FrameLength(payload.len()).into());
                }
                let length = encode_number(payload.len() as u32);
                dst.reserve(LENGTH_BYTES + payload.len());
                dst.put_slice(&length[..LENGTH_BYTES]);
                dst.put_slice(&payload);
            }
            OutboundFrame::Raw(bytes) => dst.put_slice(&bytes),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_waits_for_full_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&encode_number(3)[..2]);
        buf.put_slice(&[10, 20]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.put_slice(&[30, 40]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], &[10, 20, 30]);
        assert_eq!(&buf[..], &[40]);
    }

    #[test]
    fn test_zero_length_is_violation() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[FILLER, FILLER, 1][..]);
        assert!(matches!(codec.decode(&mut buf), Err(RealmError::ProtocolViolation(_))));
    }

    #[test]
    fn test_oversized_length_is_violation() {
        let mut codec = FrameCodec::new();
        // 255 is not a valid digit and pushes the length past MAX_FRAME.
        let mut buf = BytesMut::from(&[255u8, 255][..]);
        assert!(matches!(codec.decode(&mut buf), Err(RealmError::ProtocolViolation(_))));
    }

    #[test]
    fn test_encode_prefixes_length() {
        let mut codec = FrameCodec::new();
        let mut dst = BytesMut::new();
        codec
            .encode(OutboundFrame::Packet(Bytes::from_static(&[5, 6, 7])), &mut dst)
            .unwrap();
        assert_eq!(decode_number(&dst[..2]), 3);
        assert_eq!(&dst[2..], &[5, 6, 7]);
    }

    #[test]
    fn test_busy_ack_bytes() {
        let mut codec = FrameCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(busy_ack(300), &mut dst).unwrap();
        assert_eq!(&dst[..], &[FILLER, FILLER, 44]);
    }
}
