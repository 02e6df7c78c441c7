//! One chunk version, pre-encoded for every client.
//!
//! A [`CachedChunk`] is filled with blobs by the chunk pipeline, compressed
//! exactly once with [`CachedChunk::compress_and_cache`], and then read by
//! any number of senders. Two encodings are produced:
//!
//! - the *full* packet inlines every blob, so any client can use it;
//! - the *cacheable* packet lists blob hashes only, for clients whose blob
//!   cache already holds them.
//!
//! Once compressed the entry is frozen: blob mutations and a second
//! compression fail with [`ChunkCacheError::AlreadyCompressed`].

use std::sync::Arc;

use nebula_config::ProtocolConfig;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::batch::encode_batch;
use crate::blob::{Blob, BlobRegistry};
use crate::compression::{CompressionError, Compressor, batch_prefix};
use crate::packet::{ChunkPosition, DimensionId, LevelChunkPacket, PacketError};

/// Errors returned by [`CachedChunk`].
#[derive(Debug, thiserror::Error)]
pub enum ChunkCacheError {
    /// A packet accessor was called before compression.
    #[error("tried to read a chunk packet before it was compressed")]
    NotReady,

    /// The entry was mutated or compressed after compression.
    #[error("chunk packets are already compressed")]
    AlreadyCompressed,

    /// Compression was requested without a biome blob.
    #[error("biome blob must be set before compression")]
    MissingBiomes,

    /// The compressor failed.
    #[error("compression failed: {0}")]
    Compression(#[from] CompressionError),

    /// The packet batch could not be encoded.
    #[error("packet encoding failed: {0}")]
    Packet(#[from] PacketError),
}

/// Both compressed encodings of one chunk version.
///
/// Immutable and cheap to share between sender threads through [`Arc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedPackets {
    full: Vec<u8>,
    cacheable: Vec<u8>,
}

impl CompressedPackets {
    /// The compressed packet with every blob inlined.
    pub fn full(&self) -> &[u8] {
        &self.full
    }

    /// The compressed packet that references blobs by hash.
    pub fn cacheable(&self) -> &[u8] {
        &self.cacheable
    }

    /// Combined length of both encodings.
    pub fn len(&self) -> usize {
        self.full.len() + self.cacheable.len()
    }

    /// Whether both encodings are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
enum CacheState {
    #[default]
    Uncompressed,
    Compressed(Arc<CompressedPackets>),
}

/// Blobs of one chunk version plus its memoized packet encodings.
#[derive(Debug, Clone, Default)]
pub struct CachedChunk {
    blobs: BlobRegistry,
    state: CacheState,
}

impl CachedChunk {
    /// Creates an empty, uncompressed entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sub-chunk blob in vertical order.
    pub fn add_sub_chunk(&mut self, hash: u64, blob: impl Into<Vec<u8>>) -> Result<(), ChunkCacheError> {
        self.ensure_mutable()?;
        self.blobs.add_sub_chunk(hash, blob);
        Ok(())
    }

    /// Sets the biome blob. Later calls replace earlier ones.
    pub fn set_biomes(&mut self, hash: u64, biomes: impl Into<Vec<u8>>) -> Result<(), ChunkCacheError> {
        self.ensure_mutable()?;
        self.blobs.set_biomes(hash, biomes);
        Ok(())
    }

    /// Sub-chunk hashes in order, biome hash last.
    pub fn hashes(&self) -> Vec<u64> {
        self.blobs.hashes()
    }

    /// Every blob keyed by hash; on repeated hashes the later blob wins.
    pub fn hash_map(&self) -> FxHashMap<u64, &[u8]> {
        self.blobs.hash_map()
    }

    /// Ordered sub-chunk blobs.
    pub fn sub_chunks(&self) -> &[Blob] {
        self.blobs.sub_chunks()
    }

    /// The biome blob, if set.
    pub fn biomes(&self) -> Option<&Blob> {
        self.blobs.biomes()
    }

    /// Whether [`compress_and_cache`](Self::compress_and_cache) has succeeded.
    pub fn is_compressed(&self) -> bool {
        matches!(self.state, CacheState::Compressed(_))
    }

    /// Builds, compresses and stores both packet encodings.
    ///
    /// `chunk_data` is the trailing per-chunk payload (block entities and
    /// the like) that follows the blobs. Batches for protocols at or above
    /// `gates.compression_prefix_min` start with the compressor's network id.
    ///
    /// On error the entry stays uncompressed and untouched.
    pub fn compress_and_cache(
        &mut self,
        position: ChunkPosition,
        dimension: DimensionId,
        chunk_data: &[u8],
        compressor: &dyn Compressor,
        protocol: u32,
        gates: &ProtocolConfig,
    ) -> Result<(), ChunkCacheError> {
        self.ensure_mutable()?;
        if self.blobs.biomes().is_none() {
            warn!(x = position.x, z = position.z, "compression requested without biomes");
            return Err(ChunkCacheError::MissingBiomes);
        }

        let prefix = batch_prefix(compressor, protocol, gates);
        let full = self.build_full_packet(position, dimension, chunk_data);
        let cacheable = self.build_cacheable_packet(position, dimension, chunk_data);

        let packets = CompressedPackets {
            full: compress_single(&full, prefix, compressor, protocol, gates)?,
            cacheable: compress_single(&cacheable, prefix, compressor, protocol, gates)?,
        };

        debug!(
            x = position.x,
            z = position.z,
            ?dimension,
            protocol,
            sub_chunks = self.blobs.sub_chunk_count(),
            full_bytes = packets.full.len(),
            cacheable_bytes = packets.cacheable.len(),
            "cached chunk packets"
        );

        self.state = CacheState::Compressed(Arc::new(packets));
        Ok(())
    }

    /// The compressed full packet.
    pub fn packet(&self) -> Result<&[u8], ChunkCacheError> {
        Ok(self.compressed()?.full())
    }

    /// The compressed cacheable packet.
    pub fn cacheable_packet(&self) -> Result<&[u8], ChunkCacheError> {
        Ok(self.compressed()?.cacheable())
    }

    /// A shared handle to both encodings, for handing to sender threads.
    pub fn shared_packets(&self) -> Result<Arc<CompressedPackets>, ChunkCacheError> {
        match &self.state {
            CacheState::Compressed(packets) => Ok(Arc::clone(packets)),
            CacheState::Uncompressed => Err(ChunkCacheError::NotReady),
        }
    }

    /// Approximate memory held by this entry: distinct blob bytes plus both
    /// compressed packets once they exist.
    pub fn estimated_size(&self) -> usize {
        let packets = match &self.state {
            CacheState::Compressed(packets) => packets.len(),
            CacheState::Uncompressed => 0,
        };
        self.blobs.blob_bytes() + packets
    }

    fn compressed(&self) -> Result<&CompressedPackets, ChunkCacheError> {
        match &self.state {
            CacheState::Compressed(packets) => Ok(packets),
            CacheState::Uncompressed => Err(ChunkCacheError::NotReady),
        }
    }

    fn ensure_mutable(&self) -> Result<(), ChunkCacheError> {
        if self.is_compressed() {
            warn!("rejected change to an already compressed chunk");
            return Err(ChunkCacheError::AlreadyCompressed);
        }
        Ok(())
    }

    fn build_full_packet(
        &self,
        position: ChunkPosition,
        dimension: DimensionId,
        chunk_data: &[u8],
    ) -> LevelChunkPacket {
        LevelChunkPacket {
            position,
            dimension,
            sub_chunk_count: self.blobs.sub_chunk_count() as u32,
            client_sub_chunk_requests: false,
            used_blob_hashes: None,
            payload: self.blobs.concat_with(chunk_data),
        }
    }

    fn build_cacheable_packet(
        &self,
        position: ChunkPosition,
        dimension: DimensionId,
        chunk_data: &[u8],
    ) -> LevelChunkPacket {
        LevelChunkPacket {
            position,
            dimension,
            sub_chunk_count: self.blobs.sub_chunk_count() as u32,
            client_sub_chunk_requests: false,
            used_blob_hashes: Some(self.blobs.hashes()),
            payload: chunk_data.to_vec(),
        }
    }
}

/// Encodes `packet` as a one-packet batch, compresses it and prepends `prefix`.
fn compress_single(
    packet: &LevelChunkPacket,
    prefix: Option<u8>,
    compressor: &dyn Compressor,
    protocol: u32,
    gates: &ProtocolConfig,
) -> Result<Vec<u8>, ChunkCacheError> {
    let batch = encode_batch(protocol, gates, std::slice::from_ref(packet))?;
    let compressed = compressor.compress(&batch)?;

    let mut out = Vec::with_capacity(prefix.map_or(0, |_| 1) + compressed.len());
    out.extend(prefix);
    out.extend_from_slice(&compressed);
    Ok(out)
}
