use nebula_chunk_cache::{
    CachedChunk, ChunkCacheError, ChunkPosition, Compressor, DimensionId, LevelChunkPacket,
    Lz4Compressor, NoopCompressor, decode_batch, decompress_batch,
};
use nebula_config::ProtocolConfig;

const AUX: &[u8] = b"tile-entities";

fn sample_chunk() -> CachedChunk {
    let mut chunk = CachedChunk::new();
    chunk.add_sub_chunk(1, b"AA".to_vec()).unwrap();
    chunk.add_sub_chunk(2, b"BB".to_vec()).unwrap();
    chunk.set_biomes(3, b"CC".to_vec()).unwrap();
    chunk
}

fn decode_single(
    bytes: &[u8],
    protocol: u32,
    gates: &ProtocolConfig,
    compressor: &dyn Compressor,
) -> LevelChunkPacket {
    let batch = decompress_batch(bytes, protocol, gates, compressor).unwrap();
    let mut packets = decode_batch(protocol, gates, &batch).unwrap();
    assert_eq!(packets.len(), 1, "each cached batch holds exactly one packet");
    packets.pop().unwrap()
}

#[test]
fn test_identity_compressor_below_threshold() {
    let gates = ProtocolConfig::default();
    let protocol = gates.compression_prefix_min - 1;
    let mut chunk = sample_chunk();

    assert_eq!(chunk.hashes(), vec![1, 2, 3]);
    assert!(matches!(chunk.packet(), Err(ChunkCacheError::NotReady)));

    chunk
        .compress_and_cache(
            ChunkPosition::new(4, -7),
            DimensionId::Overworld,
            AUX,
            &NoopCompressor,
            protocol,
            &gates,
        )
        .unwrap();

    // No prefix below the threshold: the identity output is the batch itself.
    let full = decode_batch(protocol, &gates, chunk.packet().unwrap()).unwrap();
    assert_eq!(full.len(), 1);
    let full = &full[0];
    assert_eq!(full.payload, [b"AABBCC".as_slice(), AUX].concat());
    assert_eq!(full.used_blob_hashes, None);
    assert!(!full.client_sub_chunk_requests);

    let cacheable = decode_batch(protocol, &gates, chunk.cacheable_packet().unwrap()).unwrap();
    assert_eq!(cacheable.len(), 1);
    let cacheable = &cacheable[0];
    assert_eq!(cacheable.used_blob_hashes, Some(vec![1, 2, 3]));
    assert_eq!(cacheable.payload, AUX);

    for packet in [full, cacheable] {
        assert_eq!(packet.position, ChunkPosition::new(4, -7));
        assert_eq!(packet.dimension, DimensionId::Overworld);
        assert_eq!(packet.sub_chunk_count, 2);
    }
}

#[test]
fn test_lz4_above_threshold_decodes_to_matching_packets() {
    let gates = ProtocolConfig::default();
    let protocol = gates.compression_prefix_min + 15;
    let compressor = Lz4Compressor::default();

    let mut chunk = CachedChunk::new();
    for y in 0..16u64 {
        chunk.add_sub_chunk(0x1000 + y, vec![y as u8; 4096]).unwrap();
    }
    chunk.set_biomes(0xB10E, vec![1u8; 512]).unwrap();
    let blob_bytes = chunk.estimated_size();
    assert_eq!(blob_bytes, 16 * 4096 + 512);

    chunk
        .compress_and_cache(
            ChunkPosition::new(-100, 250),
            DimensionId::Nether,
            AUX,
            &compressor,
            protocol,
            &gates,
        )
        .unwrap();

    let full_bytes = chunk.packet().unwrap();
    let cacheable_bytes = chunk.cacheable_packet().unwrap();
    assert_eq!(full_bytes[0], compressor.network_id());
    assert_eq!(cacheable_bytes[0], compressor.network_id());
    assert!(cacheable_bytes.len() < full_bytes.len());

    let full = decode_single(full_bytes, protocol, &gates, &compressor);
    let cacheable = decode_single(cacheable_bytes, protocol, &gates, &compressor);
    assert_eq!(full.position, cacheable.position);
    assert_eq!(full.dimension, DimensionId::Nether);
    assert_eq!(cacheable.dimension, DimensionId::Nether);
    assert_eq!(full.sub_chunk_count, 16);
    assert_eq!(cacheable.sub_chunk_count, 16);

    // A receiver holding every blob rebuilds the full payload from hashes.
    let blobs = chunk.hash_map();
    let mut rebuilt = Vec::new();
    for hash in cacheable.used_blob_hashes.as_ref().unwrap() {
        rebuilt.extend_from_slice(blobs[hash]);
    }
    rebuilt.extend_from_slice(&cacheable.payload);
    assert_eq!(rebuilt, full.payload);

    assert_eq!(
        chunk.estimated_size(),
        blob_bytes + full_bytes.len() + cacheable_bytes.len()
    );
}

#[test]
fn test_packets_are_stable_across_reads() {
    let gates = ProtocolConfig::default();
    let mut chunk = sample_chunk();
    chunk
        .compress_and_cache(
            ChunkPosition::new(0, 0),
            DimensionId::End,
            AUX,
            &Lz4Compressor::default(),
            gates.compression_prefix_min,
            &gates,
        )
        .unwrap();

    let first = chunk.packet().unwrap().to_vec();
    let shared = chunk.shared_packets().unwrap();
    assert_eq!(shared.full(), first.as_slice());
    assert_eq!(chunk.packet().unwrap(), first.as_slice());
    assert!(matches!(
        chunk.add_sub_chunk(99, b"late".to_vec()),
        Err(ChunkCacheError::AlreadyCompressed)
    ));
}
