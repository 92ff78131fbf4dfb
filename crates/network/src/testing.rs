//! Test harness: an in-memory character store and a scripted client that
//! speaks the wire protocol from the other side.

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use realm_accounts::{AccountError, CharacterRecord, CharacterStore};
use realm_config::ServerConfig;
use realm_core::{Direction, Result, SessionId, TilePosition, ZoneId};
use realm_game::StandardFormulas;
use realm_protocol::{
    cipher, encode_number, handshake, ClientMessage, PacketAction, PacketCategory, PacketId, PacketReader,
    PacketWriter, MAX1,
};
use realm_world::{WorldRegistry, Zone, ZoneTemplate};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use crate::context::ServerContext;
use crate::sequence::SequenceGenerator;
use crate::server::spawn_connection;
use crate::session::Session;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Character records kept in memory, with a save counter per name
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, CharacterRecord>>,
    saves: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    /// Default records at (1, 1) in zone 1 for every name.
    pub fn with_characters(names: &[&str]) -> Arc<Self> {
        Self::with_records(names.iter().map(|name| TestClient::record(name, 1, 1, 1)).collect())
    }

    pub fn with_records(records: Vec<CharacterRecord>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut map = store.records.lock();
            for record in records {
                map.insert(record.name.clone(), record);
            }
        }
        Arc::new(store)
    }

    pub fn saves(&self, name: &str) -> usize {
        self.saves.lock().get(name).copied().unwrap_or(0)
    }
}

impl CharacterStore for MemoryStore {
    fn load(&self, name: &str) -> realm_accounts::Result<CharacterRecord> {
        self.records
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| AccountError::NotFound(name.to_string()))
    }

    fn save(&self, record: &CharacterRecord) -> realm_accounts::Result<()> {
        self.records.lock().insert(record.name.clone(), record.clone());
        *self.saves.lock().entry(record.name.clone()).or_insert(0) += 1;
        Ok(())
    }
}

/// Alice and Bob in two open 20x20 zones.
pub fn test_context(config: ServerConfig) -> Arc<ServerContext> {
    test_context_with_store(config, MemoryStore::with_characters(&["alice", "bob"]))
}

pub fn test_context_with_store(config: ServerConfig, store: Arc<MemoryStore>) -> Arc<ServerContext> {
    test_context_with_zones(
        config,
        store,
        vec![ZoneTemplate::open(ZoneId::new(1), 20, 20), ZoneTemplate::open(ZoneId::new(2), 20, 20)],
    )
}

pub fn test_context_with_zones(
    config: ServerConfig,
    store: Arc<MemoryStore>,
    templates: Vec<ZoneTemplate>,
) -> Arc<ServerContext> {
    use rand::SeedableRng;

    let zones = templates.into_iter().map(|template| Zone::new(Arc::new(template))).collect();
    let world = Arc::new(WorldRegistry::new(zones, config.global_history));
    let ctx = ServerContext::new(config, world, store, Arc::new(StandardFormulas))
        .with_rng(rand::rngs::StdRng::seed_from_u64(11));
    Arc::new(ctx)
}

/// Connect a [`TestClient`] to a new session over an in-memory pipe.
pub fn accept_test_connection(ctx: &Arc<ServerContext>) -> (TestClient, Arc<Session>, JoinHandle<Result<()>>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let id = ctx.ids.acquire().expect("free session id");
    let (reader, writer) = tokio::io::split(server);
    let (session, task) = spawn_connection(ctx, SessionId::new(id), reader, writer, format!("test-{}", id))
        .expect("register test session");
    (TestClient::new(client), session, task)
}

/// A session whose output goes nowhere and which is not registered.
pub fn detached_session(ctx: &Arc<ServerContext>) -> Arc<Session> {
    let id = ctx.ids.acquire().expect("free session id");
    Session::new(SessionId::new(id), tokio::io::sink(), "detached", &ctx.network)
}

/// One frame read by the client
#[derive(Debug)]
pub enum Received {
    Busy(u8),
    Message(PacketId, Bytes),
}

/// Fields of the init reply
#[derive(Debug, Clone, Copy)]
pub struct InitReplyInfo {
    pub player_id: SessionId,
    pub challenge_response: u32,
    pub decode_multiple: u8,
    pub encode_multiple: u8,
}

/// Client end of a connection
pub struct TestClient<S = DuplexStream> {
    stream: S,
    sequence: SequenceGenerator,
    /// Scrambles what the client sends
    decode_multiple: u8,
    /// Unscrambles what the client receives
    encode_multiple: u8,
    pending_ping: Option<u32>,
}

impl TestClient {
    pub const CHALLENGE: u32 = 12_345;

    pub fn record(name: &str, zone: u16, x: i32, y: i32) -> CharacterRecord {
        CharacterRecord { name: name.to_string(), zone, x, y, ..CharacterRecord::default() }
    }

    /// A record that hits almost every time for `damage`.
    pub fn record_with_damage(name: &str, zone: u16, x: i32, y: i32, damage: u32) -> CharacterRecord {
        CharacterRecord {
            accuracy: 1000,
            min_damage: damage,
            max_damage: damage,
            ..Self::record(name, zone, x, y)
        }
    }
}

impl<S> TestClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream, sequence: SequenceGenerator::default(), decode_multiple: 0, encode_multiple: 0, pending_ping: None }
    }

    pub async fn send(&mut self, message: &ClientMessage) {
        let id = message.kind().id();
        let mut writer = PacketWriter::new();
        writer.add_byte(id.action.as_u8()).add_byte(id.category.as_u8());

        if id.category == PacketCategory::Init {
            self.sequence.next();
        } else {
            if id == PacketId::new(PacketCategory::Connection, PacketAction::Ping) {
                if let Some(start) = self.pending_ping.take() {
                    self.sequence.reseed(start);
                }
            }
            let value = self.sequence.next();
            write_sequence(&mut writer, value);
        }

        message.encode_body(&mut writer);
        self.write_payload(writer.finish()).await;
    }

    /// Send action, category and body from `writer` with the next sequence
    /// value inserted after the header.
    pub async fn send_raw_body(&mut self, writer: PacketWriter) {
        let raw = writer.finish();
        let mut packet = PacketWriter::new();
        packet.add_byte(raw[0]).add_byte(raw[1]);
        write_sequence(&mut packet, self.sequence.next());
        let mut payload = packet.finish();
        payload.extend_from_slice(&raw[2..]);
        self.write_payload(payload).await;
    }

    async fn write_payload(&mut self, mut payload: BytesMut) {
        cipher::encrypt(&mut payload, self.decode_multiple);
        let mut frame = encode_number(payload.len() as u32)[..2].to_vec();
        frame.extend_from_slice(&payload);
        self.write_raw(&frame).await;
    }

    pub async fn write_raw(&mut self, bytes: &[u8]) {
        // The server may already be gone; tests check that separately.
        let _ = self.stream.write_all(bytes).await;
        let _ = self.stream.flush().await;
    }

    pub async fn recv(&mut self) -> Received {
        tokio::time::timeout(RECV_TIMEOUT, self.read_frame())
            .await
            .expect("frame within timeout")
            .expect("frame before end of stream")
    }

    /// Next frame, which must be a message; returns its id and body.
    pub async fn recv_message(&mut self) -> (PacketId, Bytes) {
        match self.recv().await {
            Received::Message(id, body) => (id, body),
            other => panic!("expected a message, got {:?}", other),
        }
    }

    async fn read_frame(&mut self) -> std::io::Result<Received> {
        let mut header = [0u8; 2];
        self.stream.read_exact(&mut header).await?;
        if header == [254, 254] {
            let mut sequence = [0u8; 1];
            self.stream.read_exact(&mut sequence).await?;
            return Ok(Received::Busy(sequence[0]));
        }

        let length = realm_protocol::decode_number(&header) as usize;
        let mut payload = BytesMut::zeroed(length);
        self.stream.read_exact(&mut payload).await?;
        cipher::decrypt(&mut payload, self.encode_multiple);

        let category = PacketCategory::from_u8(payload[1]).expect("known category");
        let action = PacketAction::from_u8(payload[0]).expect("known action");
        let body = payload.freeze().slice(2..);
        Ok(Received::Message(PacketId::new(category, action), body))
    }

    /// Send the init request and adopt what the reply announces.
    pub async fn init(&mut self) -> InitReplyInfo {
        self.send(&ClientMessage::InitRequest { challenge: TestClient::CHALLENGE, version: [0, 0, 28], hdid: "test".into() })
            .await;
        let (id, body) = self.recv_message().await;
        assert_eq!(id, PacketId::new(PacketCategory::Init, PacketAction::Init));

        let mut reader = PacketReader::new(body);
        let seq1 = reader.get_char().expect("seq1");
        let seq2 = reader.get_char().expect("seq2");
        let info = InitReplyInfo {
            decode_multiple: reader.get_char().expect("decode multiple") as u8,
            encode_multiple: reader.get_char().expect("encode multiple") as u8,
            player_id: SessionId::new(reader.get_short().expect("player id") as u16),
            challenge_response: reader.get_three().expect("challenge response"),
        };

        self.sequence.reseed(handshake::sequence_start_from_init(seq1, seq2));
        self.decode_multiple = info.decode_multiple;
        self.encode_multiple = info.encode_multiple;
        info
    }

    /// Init request plus the accept echo.
    pub async fn handshake(&mut self) -> InitReplyInfo {
        let info = self.init().await;
        self.send(&ClientMessage::ConnectionAccept {
            decode_multiple: info.decode_multiple,
            encode_multiple: info.encode_multiple,
            player_id: info.player_id,
        })
        .await;
        info
    }

    /// Handshake, log in as `name` and read the login reply.
    pub async fn login(&mut self, name: &str) {
        self.handshake().await;
        self.send(&ClientMessage::LoginRequest { name: name.into() }).await;
        let (id, _) = self.recv_message().await;
        assert_eq!(id, PacketId::new(PacketCategory::Login, PacketAction::Reply), "login as {}", name);
    }

    pub async fn walk(&mut self, direction: Direction, destination: TilePosition) {
        self.send(&ClientMessage::WalkPlayer { direction, timestamp: 0, destination }).await;
    }

    /// Burn one sequence value so the next packet is out of order.
    pub fn skip_sequence(&mut self) {
        self.sequence.next();
    }

    pub fn next_sequence_value(&self) -> u32 {
        self.sequence.peek()
    }

    /// Remember the start a keep-alive ping announced; the next
    /// [`ClientMessage::ConnectionPing`] follows it.
    pub fn answer_ping(&mut self, ping: &Received) {
        let Received::Message(_, body) = ping else {
            panic!("not a ping: {:?}", ping);
        };
        let mut reader = PacketReader::new(body.clone());
        let seq1 = reader.get_short().expect("seq1");
        let seq2 = reader.get_char().expect("seq2");
        self.pending_ping = Some(handshake::sequence_start_from_ping(seq1, seq2));
    }

    /// True once the server closed its end.
    pub async fn is_closed_by_server(&mut self) -> bool {
        let mut buf = [0u8; 16];
        match tokio::time::timeout(RECV_TIMEOUT, self.stream.read(&mut buf)).await {
            Ok(Ok(0)) | Ok(Err(_)) => true,
            Ok(Ok(_)) | Err(_) => false,
        }
    }

    pub fn into_stream(self) -> S {
        self.stream
    }
}

fn write_sequence(writer: &mut PacketWriter, value: u32) {
    if value >= MAX1 {
        writer.add_short(value);
    } else {
        writer.add_char(value);
    }
}
