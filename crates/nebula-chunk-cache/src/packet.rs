//! The outbound level chunk packet.
//!
//! Wire layout of one packet body:
//!
//! | Field | Encoding | Present |
//! |-------|----------|---------|
//! | packet id | `u8` ([`LEVEL_CHUNK_PACKET_ID`]) | always |
//! | chunk x, z | postcard zigzag varints | always |
//! | dimension | postcard varint | `protocol >= dimension_field_min` |
//! | sub-chunk count, request flag, blob hashes, payload | postcard | always |

use nebula_config::ProtocolConfig;
use serde::{Deserialize, Serialize};

/// Packet id of [`LevelChunkPacket`].
pub const LEVEL_CHUNK_PACKET_ID: u8 = 0x3A;

/// Column position of a chunk in chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPosition {
    /// Chunk X coordinate.
    pub x: i32,
    /// Chunk Z coordinate.
    pub z: i32,
}

impl ChunkPosition {
    /// Creates a position from chunk coordinates.
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// World dimension a chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DimensionId {
    #[default]
    Overworld,
    Nether,
    End,
}

/// A level chunk packet, either the full or the cacheable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelChunkPacket {
    pub position: ChunkPosition,
    pub dimension: DimensionId,
    /// Number of sub-chunk blobs in the chunk (biomes excluded).
    pub sub_chunk_count: u32,
    /// Whether the client should request sub-chunks itself. Always `false`
    /// for cached chunks.
    pub client_sub_chunk_requests: bool,
    /// Blob hashes for the cacheable form; `None` when blobs are inlined.
    pub used_blob_hashes: Option<Vec<u64>>,
    /// Inlined blob bytes plus trailing chunk data, or the trailing chunk
    /// data alone for the cacheable form.
    pub payload: Vec<u8>,
}

#[derive(Serialize)]
struct BodyRef<'a> {
    sub_chunk_count: u32,
    client_sub_chunk_requests: bool,
    used_blob_hashes: Option<&'a [u64]>,
    payload: &'a [u8],
}

#[derive(Deserialize)]
struct Body {
    sub_chunk_count: u32,
    client_sub_chunk_requests: bool,
    used_blob_hashes: Option<Vec<u64>>,
    payload: Vec<u8>,
}

impl LevelChunkPacket {
    /// Serializes the packet body for `protocol`, including the packet id.
    pub fn encode(&self, protocol: u32, gates: &ProtocolConfig) -> Result<Vec<u8>, PacketError> {
        let mut out = postcard::to_extend(
            &(self.position.x, self.position.z),
            vec![LEVEL_CHUNK_PACKET_ID],
        )?;
        if gates.has_dimension_field(protocol) {
            out = postcard::to_extend(&self.dimension, out)?;
        }
        let body = BodyRef {
            sub_chunk_count: self.sub_chunk_count,
            client_sub_chunk_requests: self.client_sub_chunk_requests,
            used_blob_hashes: self.used_blob_hashes.as_deref(),
            payload: &self.payload,
        };
        Ok(postcard::to_extend(&body, out)?)
    }

    /// Parses a packet body produced by [`encode`](Self::encode) for the
    /// same `protocol`. Protocols without the dimension field decode as
    /// [`DimensionId::Overworld`].
    pub fn decode(data: &[u8], protocol: u32, gates: &ProtocolConfig) -> Result<Self, PacketError> {
        let (&id, rest) = data.split_first().ok_or(PacketError::Truncated {
            expected: 1,
            actual: 0,
        })?;
        if id != LEVEL_CHUNK_PACKET_ID {
            return Err(PacketError::UnknownPacketId(id));
        }

        let ((x, z), rest): ((i32, i32), _) = postcard::take_from_bytes(rest)?;
        let (dimension, rest) = if gates.has_dimension_field(protocol) {
            postcard::take_from_bytes::<DimensionId>(rest)?
        } else {
            (DimensionId::Overworld, rest)
        };
        let (body, rest): (Body, _) = postcard::take_from_bytes(rest)?;
        if !rest.is_empty() {
            return Err(PacketError::TrailingBytes(rest.len()));
        }

        Ok(Self {
            position: ChunkPosition::new(x, z),
            dimension,
            sub_chunk_count: body.sub_chunk_count,
            client_sub_chunk_requests: body.client_sub_chunk_requests,
            used_blob_hashes: body.used_blob_hashes,
            payload: body.payload,
        })
    }
}

/// Errors raised while encoding or decoding packets and batches.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// The input ended before a complete field or frame.
    #[error("data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required to continue.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// The packet id byte is not a level chunk packet.
    #[error("unknown packet id: 0x{0:02X}")]
    UnknownPacketId(u8),

    /// A packet is too large to frame, or exceeds the decode limit.
    #[error("packet size {size} exceeds maximum {max}")]
    PacketTooLarge {
        /// Actual packet size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Bytes were left over after the packet body.
    #[error("{0} trailing bytes after packet body")]
    TrailingBytes(usize),

    /// Postcard encoding or decoding failed.
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}
