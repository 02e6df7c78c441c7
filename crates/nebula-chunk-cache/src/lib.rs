//! Per-chunk network packet cache: content-addressed chunk blobs and their
//! full and cacheable level chunk packets, compressed once and reused for
//! every client.

pub mod batch;
pub mod blob;
pub mod cached_chunk;
pub mod compression;
pub mod packet;

pub use batch::{MAX_BATCH_PACKET_SIZE, decode_batch, encode_batch};
pub use blob::{Blob, BlobRegistry};
pub use cached_chunk::{CachedChunk, ChunkCacheError, CompressedPackets};
pub use compression::{
    COMPRESSION_ID_LZ4, COMPRESSION_ID_NONE, CompressionError, Compressor, Lz4Compressor,
    NoopCompressor, compressor_for, compressor_for_id, decompress_batch,
};
pub use packet::{ChunkPosition, DimensionId, LEVEL_CHUNK_PACKET_ID, LevelChunkPacket, PacketError};
