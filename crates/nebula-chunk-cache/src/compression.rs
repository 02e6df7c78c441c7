//! Pluggable batch compression.
//!
//! Cached chunk batches are compressed once and sent many times, so every
//! [`Compressor`] must be deterministic for a given input. Newer protocols
//! prefix each compressed batch with the compressor's one-byte network id so
//! the receiver can pick the matching decompressor.

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use nebula_config::{CompressionAlgorithm, ProtocolConfig};

/// Network id of [`Lz4Compressor`].
pub const COMPRESSION_ID_LZ4: u8 = 0x01;

/// Network id of [`NoopCompressor`].
pub const COMPRESSION_ID_NONE: u8 = 0xFF;

/// Default upper bound on a decompressed batch. Default: 8 MiB.
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 8 * 1024 * 1024;

/// A batch compression algorithm.
pub trait Compressor: Send + Sync {
    /// One-byte id written in front of compressed batches on newer protocols.
    fn network_id(&self) -> u8;

    /// Compresses a serialized batch.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;

    /// Reverses [`compress`](Self::compress).
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

/// LZ4 block compression with the uncompressed length prepended.
#[derive(Debug, Clone)]
pub struct Lz4Compressor {
    /// Largest decompressed size accepted before allocation.
    pub max_decompressed_size: usize,
}

impl Default for Lz4Compressor {
    fn default() -> Self {
        Self {
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl Compressor for Lz4Compressor {
    fn network_id(&self) -> u8 {
        COMPRESSION_ID_LZ4
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(compress_prepend_size(data))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let Some(size_bytes) = data.first_chunk::<4>() else {
            return Err(CompressionError::DecompressFailed(
                "missing LZ4 size header".to_string(),
            ));
        };
        let declared = u32::from_le_bytes(*size_bytes) as usize;
        if declared > self.max_decompressed_size {
            return Err(CompressionError::TooLarge {
                size: declared,
                max: self.max_decompressed_size,
            });
        }

        decompress_size_prepended(data).map_err(|e| CompressionError::DecompressFailed(e.to_string()))
    }
}

/// Pass-through compressor; output equals input.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompressor;

impl Compressor for NoopCompressor {
    fn network_id(&self) -> u8 {
        COMPRESSION_ID_NONE
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(data.to_vec())
    }
}

/// Builds the compressor selected in the config.
pub fn compressor_for(algorithm: CompressionAlgorithm) -> Box<dyn Compressor> {
    match algorithm {
        CompressionAlgorithm::Lz4 => Box::new(Lz4Compressor::default()),
        CompressionAlgorithm::None => Box::new(NoopCompressor),
    }
}

/// Looks up a compressor by the network id found in a batch prefix.
pub fn compressor_for_id(network_id: u8) -> Result<Box<dyn Compressor>, CompressionError> {
    match network_id {
        COMPRESSION_ID_LZ4 => Ok(Box::new(Lz4Compressor::default())),
        COMPRESSION_ID_NONE => Ok(Box::new(NoopCompressor)),
        other => Err(CompressionError::UnknownAlgorithm(other)),
    }
}

/// The prefix written in front of a compressed batch for `protocol`.
pub(crate) fn batch_prefix(
    compressor: &dyn Compressor,
    protocol: u32,
    gates: &ProtocolConfig,
) -> Option<u8> {
    gates
        .has_compression_prefix(protocol)
        .then(|| compressor.network_id())
}

/// Decompresses a cached batch as a receiver speaking `protocol` would.
///
/// When the protocol carries the algorithm byte it must match `compressor`.
pub fn decompress_batch(
    batch: &[u8],
    protocol: u32,
    gates: &ProtocolConfig,
    compressor: &dyn Compressor,
) -> Result<Vec<u8>, CompressionError> {
    let body = match batch_prefix(compressor, protocol, gates) {
        Some(expected) => {
            let (&actual, rest) = batch
                .split_first()
                .ok_or(CompressionError::EmptyPayload)?;
            if actual != expected {
                return Err(CompressionError::PrefixMismatch { expected, actual });
            }
            rest
        }
        None => batch,
    };

    compressor.decompress(body)
}

/// Errors raised while compressing or decompressing batches.
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// The batch was empty where an algorithm byte was expected.
    #[error("empty payload, no compression algorithm byte")]
    EmptyPayload,
    /// Decompression of the batch body failed.
    #[error("decompression failed: {0}")]
    DecompressFailed(String),
    /// The declared decompressed size exceeds the configured limit.
    #[error("decompressed size {size} exceeds maximum {max}")]
    TooLarge {
        /// Size declared by the batch.
        size: usize,
        /// Configured maximum.
        max: usize,
    },
    /// An unrecognised algorithm byte was encountered.
    #[error("unknown compression algorithm: 0x{0:02X}")]
    UnknownAlgorithm(u8),
    /// The algorithm byte does not match the expected compressor.
    #[error("compression prefix 0x{actual:02X} does not match expected 0x{expected:02X}")]
    PrefixMismatch {
        /// Network id of the decompressor in use.
        expected: u8,
        /// Byte found at the start of the batch.
        actual: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lz4_roundtrip() {
        let compressor = Lz4Compressor::default();
        let data: Vec<u8> = (0..4096).map(|i| (i % 256) as u8).collect();
        let compressed = compressor.compress(&data).unwrap();
        assert_eq!(compressor.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_lz4_shrinks_repetitive_chunk_data() {
        let compressor = Lz4Compressor::default();
        let mut chunk = Vec::with_capacity(32_768);
        chunk.extend(std::iter::repeat_n(0x00u8, 16_384));
        chunk.extend(std::iter::repeat_n(0x01u8, 16_384));

        let compressed = compressor.compress(&chunk).unwrap();
        assert!(
            compressed.len() < chunk.len() / 2,
            "Compressed size {} should be under half of {}",
            compressed.len(),
            chunk.len()
        );
    }

    #[test]
    fn test_lz4_is_deterministic() {
        let compressor = Lz4Compressor::default();
        let data = b"the same chunk, twice over, the same chunk".to_vec();
        assert_eq!(
            compressor.compress(&data).unwrap(),
            compressor.compress(&data).unwrap()
        );
    }

    #[test]
    fn test_lz4_rejects_oversized_header() {
        let compressor = Lz4Compressor {
            max_decompressed_size: 16,
        };
        let compressed = compressor.compress(&[0u8; 64]).unwrap();
        let result = compressor.decompress(&compressed);
        assert!(matches!(
            result,
            Err(CompressionError::TooLarge { size: 64, max: 16 })
        ));
    }

    #[test]
    fn test_lz4_rejects_truncated_input() {
        let compressor = Lz4Compressor::default();
        assert!(matches!(
            compressor.decompress(&[0x01, 0x00]),
            Err(CompressionError::DecompressFailed(_))
        ));
    }

    #[test]
    fn test_noop_is_identity() {
        let compressor = NoopCompressor;
        assert_eq!(compressor.compress(b"AABBCC").unwrap(), b"AABBCC");
        assert_eq!(compressor.decompress(b"AABBCC").unwrap(), b"AABBCC");
    }

    #[test]
    fn test_compressor_for_config() {
        assert_eq!(
            compressor_for(CompressionAlgorithm::Lz4).network_id(),
            COMPRESSION_ID_LZ4
        );
        assert_eq!(
            compressor_for(CompressionAlgorithm::None).network_id(),
            COMPRESSION_ID_NONE
        );
    }

    #[test]
    fn test_compressor_for_unknown_id() {
        assert!(matches!(
            compressor_for_id(0x42),
            Err(CompressionError::UnknownAlgorithm(0x42))
        ));
        assert_eq!(compressor_for_id(0x01).unwrap().network_id(), 0x01);
    }

    #[test]
    fn test_prefix_follows_protocol_gate() {
        let gates = ProtocolConfig::default();
        let compressor = Lz4Compressor::default();
        assert_eq!(batch_prefix(&compressor, 670, &gates), None);
        assert_eq!(batch_prefix(&compressor, 671, &gates), Some(COMPRESSION_ID_LZ4));
    }

    #[test]
    fn test_decompress_batch_checks_prefix() {
        let gates = ProtocolConfig::default();
        let compressor = Lz4Compressor::default();
        let mut batch = vec![COMPRESSION_ID_NONE];
        batch.extend(compressor.compress(b"payload").unwrap());

        let result = decompress_batch(&batch, 700, &gates, &compressor);
        assert!(matches!(
            result,
            Err(CompressionError::PrefixMismatch {
                expected: COMPRESSION_ID_LZ4,
                actual: COMPRESSION_ID_NONE
            })
        ));
    }

    #[test]
    fn test_decompress_batch_empty_with_prefix() {
        let gates = ProtocolConfig::default();
        let result = decompress_batch(&[], 700, &gates, &NoopCompressor);
        assert!(matches!(result, Err(CompressionError::EmptyPayload)));
    }

    #[test]
    fn test_decompress_batch_without_prefix() {
        let gates = ProtocolConfig::default();
        let compressor = Lz4Compressor::default();
        let batch = compressor.compress(b"legacy client").unwrap();
        let body = decompress_batch(&batch, 600, &gates, &compressor).unwrap();
        assert_eq!(body, b"legacy client");
    }
}
