//! Chunk cache inspector.
//!
//! Builds a synthetic chunk, caches both packet encodings for the configured
//! protocol and compression algorithm, verifies they decode, and reports the
//! sizes the server-side chunk cache would account for.
//!
//! Run with `cargo run -p nebula-server -- --protocol 600 --compression none`.

use std::hash::Hasher;

use clap::Parser;
use nebula_chunk_cache::{
    CachedChunk, ChunkCacheError, ChunkPosition, DimensionId, compressor_for, decode_batch,
    decompress_batch,
};
use nebula_config::{CliArgs, Config};
use rustc_hash::FxHasher;
use tracing::{error, info};

/// Trailing chunk data appended after the blobs (block entities).
const SAMPLE_CHUNK_DATA: &[u8] = b"\x00";

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("nebula-chunk-cache")
    });

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    nebula_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = inspect(&config, args.sub_chunks) {
        error!("chunk cache inspection failed: {e}");
        std::process::exit(1);
    }
}

/// Content hash of a blob.
fn blob_hash(data: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data);
    hasher.finish()
}

/// Builds a chunk whose sub-chunk `y` is filled with byte `y`.
fn build_sample_chunk(sub_chunks: usize) -> Result<CachedChunk, ChunkCacheError> {
    let mut chunk = CachedChunk::new();
    for y in 0..sub_chunks {
        let blob = vec![y as u8; 4096];
        chunk.add_sub_chunk(blob_hash(&blob), blob)?;
    }
    let biomes = vec![0x01u8; 256];
    chunk.set_biomes(blob_hash(&biomes), biomes)?;
    Ok(chunk)
}

fn inspect(config: &Config, sub_chunks: usize) -> Result<(), ChunkCacheError> {
    let gates = &config.protocol;
    let protocol = gates.default_protocol;
    let compressor = compressor_for(config.compression.algorithm);

    let mut chunk = build_sample_chunk(sub_chunks)?;
    info!(
        sub_chunks,
        blob_bytes = chunk.estimated_size(),
        "built sample chunk"
    );

    chunk.compress_and_cache(
        ChunkPosition::new(0, 0),
        DimensionId::Overworld,
        SAMPLE_CHUNK_DATA,
        compressor.as_ref(),
        protocol,
        gates,
    )?;

    for (label, bytes) in [
        ("full", chunk.packet()?),
        ("cacheable", chunk.cacheable_packet()?),
    ] {
        let batch = decompress_batch(bytes, protocol, gates, compressor.as_ref())?;
        let packets = decode_batch(protocol, gates, &batch)?;
        info!(
            encoding = label,
            compressed_bytes = bytes.len(),
            batch_bytes = batch.len(),
            packets = packets.len(),
            "verified cached encoding"
        );
    }

    info!(
        protocol,
        algorithm = ?config.compression.algorithm,
        estimated_size = chunk.estimated_size(),
        "chunk cache entry ready"
    );
    Ok(())
}
