//! # Realm Protocol Library
//!
//! Wire format of the realm game protocol.
//!
//! ## Layers
//!
//! ### 1. Codecs ([`codecs`])
//! Base-253 numbers (1 to 4 bytes) and break-terminated strings, with
//! [`PacketReader`] / [`PacketWriter`] cursors over packet bodies.
//!
//! ### 2. Cipher ([`cipher`])
//! The reversible byte transform keyed by a per-direction multiplier.
//!
//! ### 3. Packet ids ([`packets`])
//! Category and action enumerations.
//!
//! ### 4. Messages ([`messages`])
//! The (category, action) schema registry and typed client/server messages.
//!
//! ### 5. Framing ([`frame`])
//! A `tokio_util` codec for the two-byte length prefix.
//!
//! ## Usage Example
//!
//! ```rust
//! use realm_protocol::{cipher, ServerMessage};
//!
//! let mut payload = ServerMessage::RecoverPlayer { hp: 40, tp: 12 }.to_payload();
//! cipher::encrypt(&mut payload, 8);
//! cipher::decrypt(&mut payload, 8);
//! assert_eq!(payload, ServerMessage::RecoverPlayer { hp: 40, tp: 12 }.to_payload());
//! ```

pub mod cipher;
pub mod codecs;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod messages;
pub mod packets;

pub use codecs::{decode_number, encode_number, PacketReader, PacketWriter, MAX1, MAX2, MAX3};
pub use error::ProtocolError;
pub use frame::{busy_ack, FrameCodec, OutboundFrame, MAX_FRAME};
pub use messages::*;
pub use packets::{PacketAction, PacketCategory, PacketId};
