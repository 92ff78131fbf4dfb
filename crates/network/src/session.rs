//! # Session Protocol State Machine
//!
//! One [`Session`] per TCP connection. Its receive loop runs on the
//! connection's own task; any other task (zone ticks, broadcasts, the
//! keep-alive sweep) reaches it through the [`Peer`] trait.
//!
//! # Lifecycle
//!
//! ```text
//! Unestablished → Handshaking → Active → Closed
//!      (init)        (accept)
//! ```
//!
//! # Receive path
//!
//! Per frame: decrypt, read action and category, check the sequence value,
//! apply the rate limit, resolve the schema, decode, dispatch. A bad frame,
//! a sequence mismatch or a failing handler ends the loop; unknown or
//! premature packets are logged and dropped.
//!
//! # Multipliers
//!
//! `decode_multiple` unscrambles what the client sends and
//! `encode_multiple` scrambles what the server sends. Both are zero (no
//! transform) until the init reply has gone out.
//!
//! # Thread Safety
//!
//! Mutable protocol fields live behind one `parking_lot::Mutex` that is never
//! held across an `.await`. The writer sits behind an async mutex so
//! concurrent sends never interleave on the wire.

use async_trait::async_trait;
use bytes::BytesMut;
use futures::{FutureExt, SinkExt, StreamExt};
use parking_lot::Mutex;
use realm_core::{RealmError, Result, SessionId, SessionState, ZoneId};
use realm_protocol::{
    busy_ack, cipher, ClientMessage, FrameCodec, MessageKind, OutboundFrame, PacketAction, PacketCategory,
    PacketId, PacketReader, ServerMessage,
};
use realm_world::{Character, Peer};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::NetworkConfig;
use crate::context::ServerContext;
use crate::rate_limit::RateLimiter;
use crate::sequence::{read_sequence, SequenceGenerator};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// What the keep-alive sweep should do with a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAlive {
    /// Send a ping with the stored start
    Ping,
    /// Not active yet; counted but nothing sent
    Waiting,
    /// The previous round went unanswered
    Expired,
}

/// Protocol fields guarded together
#[derive(Debug)]
struct ProtocolState {
    state: SessionState,
    decode_multiple: u8,
    encode_multiple: u8,
    sequence: SequenceGenerator,
    /// Start announced by the last ping; consumed by the ping answer
    upcoming_start: Option<u32>,
    rate_limiter: RateLimiter,
}

/// A connected client
pub struct Session {
    id: SessionId,
    /// Remote address or another label for logs
    peer_label: String,
    enforce_sequence: bool,
    write_timeout: Duration,

    writer: tokio::sync::Mutex<FramedWrite<BoxedWriter, FrameCodec>>,
    protocol: Mutex<ProtocolState>,

    character: Mutex<Option<Arc<Mutex<Character>>>>,
    zone: Mutex<Option<ZoneId>>,
    transition: tokio::sync::Mutex<()>,

    keepalive_outstanding: AtomicBool,
    shutdown: CancellationToken,
    cleaned_up: AtomicBool,

    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    messages_handled: AtomicU64,
}

impl Session {
    /// Create a session around the write half of a connection.
    ///
    /// # Arguments
    /// * `id` - Session id from the server's pool
    /// * `writer` - Write half; the read half goes to [`run`](Self::run)
    /// * `peer_label` - Remote address for logs
    /// * `config` - Network options
    pub fn new<W>(id: SessionId, writer: W, peer_label: impl Into<String>, config: &NetworkConfig) -> Arc<Self>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: BoxedWriter = Box::new(writer);
        let peer_label = peer_label.into();
        debug!("New session {}: {}", id, peer_label);
        Arc::new(Self {
            id,
            peer_label,
            enforce_sequence: config.enforce_sequence,
            write_timeout: config.write_timeout,
            writer: tokio::sync::Mutex::new(FramedWrite::new(writer, FrameCodec::new())),
            protocol: Mutex::new(ProtocolState {
                state: SessionState::Unestablished,
                decode_multiple: 0,
                encode_multiple: 0,
                sequence: SequenceGenerator::default(),
                upcoming_start: None,
                rate_limiter: RateLimiter::new(config.rate_limits.clone()),
            }),
            character: Mutex::new(None),
            zone: Mutex::new(None),
            transition: tokio::sync::Mutex::new(()),
            keepalive_outstanding: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            cleaned_up: AtomicBool::new(false),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            messages_handled: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer_label(&self) -> &str {
        &self.peer_label
    }

    pub fn state(&self) -> SessionState {
        self.protocol.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_in.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_out.load(Ordering::Relaxed)
    }

    /// Messages that reached a handler
    pub fn messages_handled(&self) -> u64 {
        self.messages_handled.load(Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    // ========== Receive loop ==========

    /// Process frames until the client disconnects, a fatal error occurs or
    /// the session is closed.
    ///
    /// # Returns
    /// `Ok(())` on a clean end, otherwise the fatal error. Cleanup is left
    /// to [`cleanup`](Self::cleanup).
    pub async fn run<R>(self: &Arc<Self>, reader: R, ctx: Arc<ServerContext>) -> Result<()>
    where
        R: AsyncRead + Send + Unpin,
    {
        info!("Session {} starting receive loop", self.id);
        let mut frames = FramedRead::new(reader, FrameCodec::new());

        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Session {} closed by server", self.id);
                    return Ok(());
                }
                frame = frames.next() => frame,
            };

            let payload = match frame {
                Some(Ok(payload)) => payload,
                Some(Err(e)) => return Err(e),
                None => {
                    info!("Session {} closed by client", self.id);
                    return Ok(());
                }
            };

            self.bytes_in.fetch_add(payload.len() as u64 + 2, Ordering::Relaxed);
            self.process_frame(BytesMut::from(&payload[..]), &ctx).await?;
        }
    }

    /// Handle one inbound payload.
    async fn process_frame(self: &Arc<Self>, mut payload: BytesMut, ctx: &Arc<ServerContext>) -> Result<()> {
        let decode_multiple = self.protocol.lock().decode_multiple;
        cipher::decrypt(&mut payload, decode_multiple);

        let mut reader = PacketReader::new(payload.freeze());
        let (action, category) = match (reader.get_byte(), reader.get_byte()) {
            (Ok(action), Ok(category)) => (action, category),
            _ => return Err(RealmError::ProtocolViolation("packet shorter than its header".into())),
        };

        let sequence = self.check_sequence(category, action, &mut reader)?;

        let id = match (PacketCategory::from_u8(category), PacketAction::from_u8(action)) {
            (Some(category), Some(action)) => PacketId::new(category, action),
            _ => {
                warn!("Session {} dropped unroutable packet {}/{}", self.id, category, action);
                return Ok(());
            }
        };

        if self.protocol.lock().rate_limiter.should_reject(id) {
            debug!("Session {} rate limited {}", self.id, id);
            return self.send_frame(busy_ack(sequence)).await;
        }

        let Some(kind) = MessageKind::resolve(id) else {
            warn!("Session {} dropped unroutable packet {}", self.id, id);
            return Ok(());
        };

        if !kind.is_handshake() && !self.is_active() {
            warn!("Session {} dropped {} before the handshake completed", self.id, id);
            return Ok(());
        }

        let message = match ClientMessage::decode(kind, &mut reader) {
            Ok(message) => message,
            Err(e) => {
                warn!("Session {} dropped malformed {}: {}", self.id, id, e);
                return Ok(());
            }
        };

        let Some(handler) = ctx.handlers.handler(kind) else {
            warn!("Session {} has no handler for {:?}", self.id, kind);
            return Ok(());
        };

        self.protocol.lock().rate_limiter.record(id);
        self.messages_handled.fetch_add(1, Ordering::Relaxed);
        trace!("Session {} dispatching {:?}", self.id, kind);

        match AssertUnwindSafe(handler(ctx.clone(), self.clone(), message)).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e @ (RealmError::ProtocolViolation(_) | RealmError::ZoneInconsistency(_)))) => Err(e),
            Ok(Err(e)) => Err(RealmError::HandlerFault(format!("{:?}: {}", kind, e))),
            Err(_) => Err(RealmError::HandlerFault(format!("{:?} handler panicked", kind))),
        }
    }

    /// Consume this packet's sequence value.
    ///
    /// # Returns
    /// The value the generator produced, echoed by a busy ack
    fn check_sequence(&self, category: u8, action: u8, reader: &mut PacketReader) -> Result<u32> {
        let mut protocol = self.protocol.lock();

        if category == PacketCategory::Init.as_u8() {
            let value = protocol.sequence.next();
            if action != PacketAction::Init.as_u8() && reader.get_byte().is_err() {
                return Err(RealmError::ProtocolViolation("missing sequence value".into()));
            }
            return Ok(value);
        }

        let keepalive_response =
            category == PacketCategory::Connection.as_u8() && action == PacketAction::Ping.as_u8();
        if keepalive_response {
            if let Some(start) = protocol.upcoming_start.take() {
                protocol.sequence.reseed(start);
                let expected = protocol.sequence.next();
                read_sequence(reader, expected)?;
                return Ok(expected);
            }
        }

        let expected = protocol.sequence.next();
        let received = read_sequence(reader, expected)?;
        if received != expected {
            if self.enforce_sequence {
                return Err(RealmError::ProtocolViolation(format!(
                    "sequence {} where {} was expected",
                    received, expected
                )));
            }
            debug!("Session {} sequence {} where {} was expected", self.id, received, expected);
        }
        Ok(expected)
    }

    // ========== Send path ==========

    /// Serialize, transform and write one message.
    pub async fn send_message(&self, message: &ServerMessage) -> Result<()> {
        let mut payload = message.to_payload();
        if !message.is_handshake_reply() {
            let encode_multiple = self.protocol.lock().encode_multiple;
            cipher::encrypt(&mut payload, encode_multiple);
        }
        trace!("Session {} sending {}", self.id, message.id());
        self.send_frame(OutboundFrame::Packet(payload.freeze())).await
    }

    async fn send_frame(&self, frame: OutboundFrame) -> Result<()> {
        let length = match &frame {
            OutboundFrame::Packet(payload) => payload.len() + 2,
            OutboundFrame::Raw(bytes) => bytes.len(),
        };
        let mut writer = self.writer.lock().await;
        match tokio::time::timeout(self.write_timeout, writer.send(frame)).await {
            Ok(Ok(())) => {
                self.bytes_out.fetch_add(length as u64, Ordering::Relaxed);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RealmError::Network(format!("write timed out after {:?}", self.write_timeout))),
        }
    }

    // ========== Handshake ==========

    /// Store the multipliers and sequence start announced by the init reply.
    ///
    /// # Errors
    /// `ProtocolViolation` if the session already started a handshake
    pub fn begin_handshake(&self, decode_multiple: u8, encode_multiple: u8, start: u32) -> Result<()> {
        let mut protocol = self.protocol.lock();
        if protocol.state != SessionState::Unestablished {
            return Err(RealmError::ProtocolViolation("repeated init request".into()));
        }
        protocol.state = SessionState::Handshaking;
        protocol.decode_multiple = decode_multiple;
        protocol.encode_multiple = encode_multiple;
        protocol.sequence.reseed(start);
        Ok(())
    }

    /// Check the client's echo of the init reply and become active.
    ///
    /// # Errors
    /// `ProtocolViolation` on any mismatch or out-of-order accept
    pub fn confirm_handshake(&self, decode_multiple: u8, encode_multiple: u8, player_id: SessionId) -> Result<()> {
        let mut protocol = self.protocol.lock();
        if protocol.state != SessionState::Handshaking {
            return Err(RealmError::ProtocolViolation(format!("accept while {:?}", protocol.state)));
        }
        if decode_multiple != protocol.decode_multiple
            || encode_multiple != protocol.encode_multiple
            || player_id != self.id
        {
            return Err(RealmError::ProtocolViolation("handshake echo does not match".into()));
        }
        protocol.state = SessionState::Active;
        info!("Session {} established", self.id);
        Ok(())
    }

    // ========== Keep-alive ==========

    /// Start a keep-alive round.
    ///
    /// # Arguments
    /// * `start` - Sequence start the ping will announce
    pub fn arm_keepalive(&self, start: u32) -> KeepAlive {
        if self.keepalive_outstanding.swap(true, Ordering::SeqCst) {
            return KeepAlive::Expired;
        }
        let mut protocol = self.protocol.lock();
        if protocol.state != SessionState::Active {
            return KeepAlive::Waiting;
        }
        protocol.upcoming_start = Some(start);
        KeepAlive::Ping
    }

    pub fn keepalive_answered(&self) {
        self.keepalive_outstanding.store(false, Ordering::SeqCst);
    }

    // ========== Character ==========

    pub fn set_character(&self, character: Arc<Mutex<Character>>) {
        *self.character.lock() = Some(character);
    }

    // ========== Cleanup ==========

    /// Release everything the session holds. Only the first call does
    /// anything, whatever path ended the session.
    ///
    /// Leaves the zone, deregisters, saves the character and returns the id.
    pub async fn cleanup(self: &Arc<Self>, ctx: &ServerContext) {
        if self.cleaned_up.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();
        self.protocol.lock().state = SessionState::Closed;

        ctx.world.deregister_session(self.id).await;

        if let Some(character) = self.character() {
            let record = character.lock().to_record();
            let store = ctx.store.clone();
            let name = record.name.clone();
            match tokio::task::spawn_blocking(move || store.save(&record)).await {
                Ok(Ok(())) => debug!("Session {} saved character {}", self.id, name),
                Ok(Err(e)) => warn!("Session {} failed to save character {}: {}", self.id, name, e),
                Err(e) => warn!("Session {} save task failed: {}", self.id, e),
            }
        }

        ctx.ids.release(self.id.get());
        info!(
            "Session {} cleaned up ({} bytes in, {} bytes out, {} messages)",
            self.id,
            self.bytes_received(),
            self.bytes_sent(),
            self.messages_handled()
        );
    }
}

#[async_trait]
impl Peer for Session {
    fn session_id(&self) -> SessionId {
        self.id
    }

    async fn send(&self, message: ServerMessage) -> Result<()> {
        self.send_message(&message).await
    }

    fn close(&self) {
        if !self.shutdown.is_cancelled() {
            debug!("Session {} close requested", self.id);
            self.shutdown.cancel();
        }
    }

    fn zone(&self) -> Option<ZoneId> {
        *self.zone.lock()
    }

    fn set_zone(&self, zone: Option<ZoneId>) {
        *self.zone.lock() = zone;
    }

    fn character(&self) -> Option<Arc<Mutex<Character>>> {
        self.character.lock().clone()
    }

    fn transition_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{accept_test_connection, test_context, test_context_with_store, MemoryStore, Received, TestClient};
    use realm_config::ServerConfig;
    use realm_protocol::PacketWriter;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_handshake_activates_session() {
        let ctx = test_context(ServerConfig::default());
        let (mut client, session, _task) = accept_test_connection(&ctx);

        let reply = client.handshake().await;
        assert_eq!(reply.player_id, SessionId::new(1));
        assert_eq!(reply.challenge_response, realm_protocol::handshake::challenge_response(TestClient::CHALLENGE));
        assert!((6..=12).contains(&reply.decode_multiple));

        client.send(&ClientMessage::RefreshRequest).await;
        let (id, _) = client.recv_message().await;
        assert_eq!(id, PacketId::new(PacketCategory::Refresh, PacketAction::Reply));
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn test_packets_before_handshake_are_dropped() {
        let ctx = test_context(ServerConfig::default());
        let (mut client, session, _task) = accept_test_connection(&ctx);

        client.send(&ClientMessage::RefreshRequest).await;
        client.send(&ClientMessage::InitRequest {
            challenge: TestClient::CHALLENGE,
            version: [0, 0, 28],
            hdid: "test".into(),
        })
        .await;

        // The refresh produced nothing; the first frame back is the init reply.
        let (id, _) = client.recv_message().await;
        assert_eq!(id, PacketId::new(PacketCategory::Init, PacketAction::Init));
        assert_eq!(session.messages_handled(), 1);
    }

    #[tokio::test]
    async fn test_sequence_mismatch_disconnects() {
        let ctx = test_context(ServerConfig::default());
        let (mut client, session, task) = accept_test_connection(&ctx);
        client.handshake().await;

        client.skip_sequence();
        client.send(&ClientMessage::RefreshRequest).await;

        let result = task.await.unwrap();
        assert!(matches!(result, Err(RealmError::ProtocolViolation(_))));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(ctx.world.find_session(SessionId::new(1)).is_none());
    }

    #[tokio::test]
    async fn test_sequence_mismatch_tolerated_when_not_enforced() {
        let config = ServerConfig::parse("enforcesequence = false\n").unwrap();
        let ctx = test_context(config);
        let (mut client, _session, _task) = accept_test_connection(&ctx);
        client.handshake().await;

        client.skip_sequence();
        client.send(&ClientMessage::RefreshRequest).await;
        let (id, _) = client.recv_message().await;
        assert_eq!(id, PacketId::new(PacketCategory::Refresh, PacketAction::Reply));
    }

    #[tokio::test]
    async fn test_handshake_echo_mismatch_disconnects() {
        let ctx = test_context(ServerConfig::default());
        let (mut client, _session, task) = accept_test_connection(&ctx);

        let reply = client.init().await;
        client
            .send(&ClientMessage::ConnectionAccept {
                decode_multiple: reply.decode_multiple,
                encode_multiple: reply.encode_multiple,
                player_id: SessionId::new(99),
            })
            .await;

        let result = task.await.unwrap();
        assert!(matches!(result, Err(RealmError::ProtocolViolation(_))));
    }

    #[tokio::test]
    async fn test_zero_length_frame_disconnects() {
        let ctx = test_context(ServerConfig::default());
        let (mut client, _session, task) = accept_test_connection(&ctx);

        client.write_raw(&[254, 254, 1]).await;
        let result = task.await.unwrap();
        assert!(matches!(result, Err(RealmError::ProtocolViolation(_))));
    }

    #[tokio::test]
    async fn test_unknown_packet_is_dropped() {
        let ctx = test_context(ServerConfig::default());
        let (mut client, _session, _task) = accept_test_connection(&ctx);
        client.handshake().await;

        // Unknown category 200, sequence value still consumed.
        let mut writer = PacketWriter::new();
        writer.add_byte(1).add_byte(200);
        client.send_raw_body(writer).await;

        client.send(&ClientMessage::RefreshRequest).await;
        let (id, _) = client.recv_message().await;
        assert_eq!(id, PacketId::new(PacketCategory::Refresh, PacketAction::Reply));
    }

    #[tokio::test]
    async fn test_rate_limited_packet_gets_busy_ack() {
        let ctx = test_context(ServerConfig::default());
        let (mut client, session, _task) = accept_test_connection(&ctx);
        client.login("alice").await;
        let handled = session.messages_handled();

        client.send(&ClientMessage::TalkReport { message: "one".into() }).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let expected = client.next_sequence_value();
        client.send(&ClientMessage::TalkReport { message: "two".into() }).await;

        match client.recv().await {
            Received::Busy(sequence) => assert_eq!(sequence, expected as u8),
            other => panic!("expected a busy ack, got {:?}", other),
        }
        assert_eq!(session.messages_handled(), handled + 1);
    }

    #[tokio::test]
    async fn test_spaced_packets_are_both_handled() {
        let ctx = test_context(ServerConfig::default());
        let (mut client, session, _task) = accept_test_connection(&ctx);
        client.login("alice").await;
        let handled = session.messages_handled();

        client.send(&ClientMessage::TalkReport { message: "one".into() }).await;
        tokio::time::sleep(Duration::from_millis(600)).await;
        client.send(&ClientMessage::TalkReport { message: "two".into() }).await;
        client.send(&ClientMessage::RefreshRequest).await;

        let (id, _) = client.recv_message().await;
        assert_eq!(id, PacketId::new(PacketCategory::Refresh, PacketAction::Reply));
        assert_eq!(session.messages_handled(), handled + 3);
    }

    #[tokio::test]
    async fn test_cleanup_runs_once() {
        let store = MemoryStore::with_characters(&["alice"]);
        let ctx = test_context_with_store(ServerConfig::default(), store.clone());
        let (mut client, session, task) = accept_test_connection(&ctx);
        client.login("alice").await;
        assert_eq!(ctx.world.session_count(), 1);

        session.close();
        assert!(task.await.unwrap().is_ok());
        session.cleanup(&ctx).await;

        assert_eq!(ctx.world.session_count(), 0);
        assert_eq!(ctx.ids.in_use(), 0);
        assert_eq!(store.saves("alice"), 1);
    }

    #[tokio::test]
    async fn test_client_disconnect_ends_loop() {
        let ctx = test_context(ServerConfig::default());
        let (client, _session, task) = accept_test_connection(&ctx);
        let mut stream = client.into_stream();
        stream.shutdown().await.unwrap();
        drop(stream);
        assert!(task.await.unwrap().is_ok());
    }
}
