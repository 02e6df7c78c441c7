//! Content-addressed blob storage for one chunk.
//!
//! A chunk is split into blobs: one per vertical sub-chunk, plus a single
//! biome blob. Each blob is identified by a 64-bit content hash computed by
//! the caller. Sub-chunk order matches the vertical layout of the chunk and is
//! preserved everywhere blobs are concatenated or listed.

use rustc_hash::FxHashMap;

/// A hash-identified slice of chunk data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Content hash supplied by the caller.
    pub hash: u64,
    /// Raw blob bytes.
    pub data: Vec<u8>,
}

impl Blob {
    /// Creates a blob from a hash and its bytes.
    pub fn new(hash: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            hash,
            data: data.into(),
        }
    }
}

/// Ordered sub-chunk blobs plus the biome blob of a single chunk.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    sub_chunks: Vec<Blob>,
    biomes: Option<Blob>,
}

impl BlobRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sub-chunk blob. Duplicate hashes are kept as-is.
    pub fn add_sub_chunk(&mut self, hash: u64, data: impl Into<Vec<u8>>) {
        self.sub_chunks.push(Blob::new(hash, data));
    }

    /// Sets the biome blob, replacing any previous one.
    pub fn set_biomes(&mut self, hash: u64, data: impl Into<Vec<u8>>) {
        self.biomes = Some(Blob::new(hash, data));
    }

    /// Sub-chunk blobs in insertion order.
    pub fn sub_chunks(&self) -> &[Blob] {
        &self.sub_chunks
    }

    /// The biome blob, if set.
    pub fn biomes(&self) -> Option<&Blob> {
        self.biomes.as_ref()
    }

    /// Number of sub-chunk blobs (the biome blob is not counted).
    pub fn sub_chunk_count(&self) -> usize {
        self.sub_chunks.len()
    }

    /// Sub-chunk hashes in insertion order, followed by the biome hash.
    ///
    /// This exact order is what receivers resolve the cacheable packet against.
    pub fn hashes(&self) -> Vec<u64> {
        self.sub_chunks
            .iter()
            .chain(self.biomes.iter())
            .map(|blob| blob.hash)
            .collect()
    }

    /// Every blob keyed by hash.
    ///
    /// Sub-chunks are inserted first in order, the biome blob last, so on a
    /// repeated hash the later blob wins.
    pub fn hash_map(&self) -> FxHashMap<u64, &[u8]> {
        let mut map = FxHashMap::default();
        for blob in self.sub_chunks.iter().chain(self.biomes.iter()) {
            map.insert(blob.hash, blob.data.as_slice());
        }
        map
    }

    /// Total bytes of the distinct blobs in [`hash_map`](Self::hash_map).
    pub fn blob_bytes(&self) -> usize {
        self.hash_map().values().map(|data| data.len()).sum()
    }

    /// Sub-chunk bytes in order, then biome bytes, then `trailer`.
    pub(crate) fn concat_with(&self, trailer: &[u8]) -> Vec<u8> {
        let blob_len: usize = self
            .sub_chunks
            .iter()
            .chain(self.biomes.iter())
            .map(|blob| blob.data.len())
            .sum();

        let mut buf = Vec::with_capacity(blob_len + trailer.len());
        for blob in self.sub_chunks.iter().chain(self.biomes.iter()) {
            buf.extend_from_slice(&blob.data);
        }
        buf.extend_from_slice(trailer);
        buf
    }
}
