//! Binary wire protocol.
//!
//! Every datagram starts with a fixed [`Header`] (`kind: u8`, `slot: i32`,
//! `sequence: u32`) followed by the payload for that kind. Encoding uses
//! bincode's default configuration: fixed-width little-endian integers,
//! one-byte bools and no length prefix on tuples, which makes every packet
//! kind a fixed size.
//!
//! Decoding reads the header first and only then the payload its kind names.
//! Unknown kinds, truncated payloads and malformed contents all decode to
//! `None`; callers drop such datagrams without further action. There is no
//! checksum, version or authentication on purpose.

use crate::entities::InputState;
use crate::state::GameState;
use crate::{
    MAX_BULLETS_PER_PLAYER, MAX_ENEMIES, MAX_ENEMY_BULLETS, MAX_EXPLOSIONS, MAX_PACKET_SIZE,
    MAX_PLAYERS,
};
use serde::{Deserialize, Serialize};

/// Fixed size of the display name carried in a connect request
pub const NAME_LEN: usize = 32;

/// Slot value used in headers before the server has assigned one
pub const UNASSIGNED_SLOT: i32 = -1;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Connect = 0,
    ConnectAck = 1,
    Input = 2,
    StateSnapshot = 3,
    Disconnect = 4,
}

impl TryFrom<u8> for PacketKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PacketKind::Connect),
            1 => Ok(PacketKind::ConnectAck),
            2 => Ok(PacketKind::Input),
            3 => Ok(PacketKind::StateSnapshot),
            4 => Ok(PacketKind::Disconnect),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    kind: u8,
    pub slot: i32,
    pub sequence: u32,
}

impl Header {
    pub fn new(kind: PacketKind, slot: i32, sequence: u32) -> Self {
        Self {
            kind: kind as u8,
            slot,
            sequence,
        }
    }

    /// `None` for a kind this protocol does not know
    pub fn kind(&self) -> Option<PacketKind> {
        PacketKind::try_from(self.kind).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    name: [u8; NAME_LEN],
}

impl ConnectRequest {
    /// Truncates `name` so that the field always keeps a trailing NUL.
    pub fn new(name: &str) -> Self {
        let mut field = [0u8; NAME_LEN];
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_LEN - 1);
        field[..len].copy_from_slice(&bytes[..len]);
        Self { name: field }
    }

    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectAck {
    pub assigned_slot: i32,
    pub success: bool,
}

impl ConnectAck {
    pub fn accepted(slot: usize) -> Self {
        Self {
            assigned_slot: slot as i32,
            success: true,
        }
    }

    pub fn rejected() -> Self {
        Self {
            assigned_slot: UNASSIGNED_SLOT,
            success: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Connect(ConnectRequest),
    ConnectAck(ConnectAck),
    Input(InputState),
    StateSnapshot(Box<GameState>),
    Disconnect,
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Connect(_) => PacketKind::Connect,
            Packet::ConnectAck(_) => PacketKind::ConnectAck,
            Packet::Input(_) => PacketKind::Input,
            Packet::StateSnapshot(_) => PacketKind::StateSnapshot,
            Packet::Disconnect => PacketKind::Disconnect,
        }
    }

    /// Exact encoded size of this packet including the header
    pub fn encoded_len(&self) -> usize {
        match self {
            Packet::Connect(_) => CONNECT_PACKET_SIZE,
            Packet::ConnectAck(_) => CONNECT_ACK_PACKET_SIZE,
            Packet::Input(_) => INPUT_PACKET_SIZE,
            Packet::StateSnapshot(_) => SNAPSHOT_PACKET_SIZE,
            Packet::Disconnect => HEADER_SIZE,
        }
    }
}

/// A decoded datagram: header fields plus the typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub slot: i32,
    pub sequence: u32,
    pub packet: Packet,
}

impl Message {
    pub fn new(slot: i32, sequence: u32, packet: Packet) -> Self {
        Self {
            slot,
            sequence,
            packet,
        }
    }

    pub fn header(&self) -> Header {
        Header::new(self.packet.kind(), self.slot, self.sequence)
    }
}

pub fn encode(message: &Message) -> bincode::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(message.packet.encoded_len());
    bincode::serialize_into(&mut buf, &message.header())?;
    match &message.packet {
        Packet::Connect(request) => bincode::serialize_into(&mut buf, request)?,
        Packet::ConnectAck(ack) => bincode::serialize_into(&mut buf, ack)?,
        Packet::Input(input) => bincode::serialize_into(&mut buf, input)?,
        Packet::StateSnapshot(state) => bincode::serialize_into(&mut buf, state.as_ref())?,
        Packet::Disconnect => {}
    }
    Ok(buf)
}

/// Encodes a snapshot straight from a borrowed state.
///
/// Produces the same bytes as [`encode`] on a `StateSnapshot` message with
/// slot [`UNASSIGNED_SLOT`].
pub fn encode_snapshot(sequence: u32, state: &GameState) -> bincode::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(SNAPSHOT_PACKET_SIZE);
    let header = Header::new(PacketKind::StateSnapshot, UNASSIGNED_SLOT, sequence);
    bincode::serialize_into(&mut buf, &header)?;
    bincode::serialize_into(&mut buf, state)?;
    Ok(buf)
}

/// Reads only the header of a datagram.
pub fn peek_header(bytes: &[u8]) -> Option<Header> {
    let mut reader = bytes;
    bincode::deserialize_from(&mut reader).ok()
}

/// Decodes a datagram, or returns `None` if it should be ignored.
pub fn decode(bytes: &[u8]) -> Option<Message> {
    if bytes.len() > MAX_PACKET_SIZE {
        return None;
    }

    let mut reader = bytes;
    let header: Header = bincode::deserialize_from(&mut reader).ok()?;

    let packet = match header.kind()? {
        PacketKind::Connect => Packet::Connect(bincode::deserialize_from(&mut reader).ok()?),
        PacketKind::ConnectAck => Packet::ConnectAck(bincode::deserialize_from(&mut reader).ok()?),
        PacketKind::Input => Packet::Input(bincode::deserialize_from(&mut reader).ok()?),
        PacketKind::StateSnapshot => {
            Packet::StateSnapshot(Box::new(bincode::deserialize_from(&mut reader).ok()?))
        }
        PacketKind::Disconnect => Packet::Disconnect,
    };

    Some(Message {
        slot: header.slot,
        sequence: header.sequence,
        packet,
    })
}

const fn pool_size(capacity: usize, slot_size: usize) -> usize {
    (capacity + 7) / 8 + capacity * slot_size
}

pub const HEADER_SIZE: usize = 1 + 4 + 4;
pub const BULLET_RECORD_SIZE: usize = 4 * 4;
pub const ENEMY_RECORD_SIZE: usize = 4 + 4 + 1 + 4;
pub const EXPLOSION_RECORD_SIZE: usize = 4 + 4 + 8;
/// An optional timestamp is a presence flag plus the value
const OPTIONAL_MILLIS_SIZE: usize = 1 + 8;
pub const PLAYER_RECORD_SIZE: usize = 1 // slot
    + 4 + 4 // position
    + 4 // health
    + 4 // score
    + 1 // alive
    + pool_size(MAX_BULLETS_PER_PLAYER, BULLET_RECORD_SIZE)
    + 4 // shots fired
    + 1 // reloading
    + 8 // reload started
    + OPTIONAL_MILLIS_SIZE // last shot
    + OPTIONAL_MILLIS_SIZE; // respawn at
pub const GAME_STATE_SIZE: usize = 4 // tick
    + 3 * 4 // counts
    + pool_size(MAX_PLAYERS, PLAYER_RECORD_SIZE)
    + pool_size(MAX_ENEMIES, ENEMY_RECORD_SIZE)
    + pool_size(MAX_ENEMY_BULLETS, BULLET_RECORD_SIZE)
    + pool_size(MAX_EXPLOSIONS, EXPLOSION_RECORD_SIZE);

pub const CONNECT_PACKET_SIZE: usize = HEADER_SIZE + NAME_LEN;
pub const CONNECT_ACK_PACKET_SIZE: usize = HEADER_SIZE + 4 + 1;
pub const INPUT_PACKET_SIZE: usize = HEADER_SIZE + 5 + 8;
pub const SNAPSHOT_PACKET_SIZE: usize = HEADER_SIZE + GAME_STATE_SIZE;

const _: () = assert!(
    SNAPSHOT_PACKET_SIZE <= MAX_PACKET_SIZE,
    "a full snapshot must fit in one datagram"
);
