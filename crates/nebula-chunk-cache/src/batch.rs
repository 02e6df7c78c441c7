//! Packet batches: the unit that gets compressed and sent.
//!
//! ```text
//! +-------------------+--------------------+-------------------+-----
//! | length (4 bytes)  |   packet body      | length (4 bytes)  | ...
//! | u32 little-endian |   (length bytes)   | u32 little-endian |
//! +-------------------+--------------------+-------------------+-----
//! ```

use nebula_config::ProtocolConfig;

use crate::packet::{LevelChunkPacket, PacketError};

/// Largest packet body accepted when decoding a batch. Default: 2 MiB.
///
/// Encoding is only bounded by the `u32` frame length.
pub const MAX_BATCH_PACKET_SIZE: usize = 2 * 1024 * 1024;

/// Encodes `packets` for `protocol` into one uncompressed batch.
pub fn encode_batch(
    protocol: u32,
    gates: &ProtocolConfig,
    packets: &[LevelChunkPacket],
) -> Result<Vec<u8>, PacketError> {
    let mut out = Vec::new();
    for packet in packets {
        let body = packet.encode(protocol, gates)?;
        let len = u32::try_from(body.len()).map_err(|_| PacketError::PacketTooLarge {
            size: body.len(),
            max: u32::MAX as usize,
        })?;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&body);
    }
    Ok(out)
}

/// Decodes an uncompressed batch produced by [`encode_batch`].
pub fn decode_batch(
    protocol: u32,
    gates: &ProtocolConfig,
    mut data: &[u8],
) -> Result<Vec<LevelChunkPacket>, PacketError> {
    let mut packets = Vec::new();
    while !data.is_empty() {
        let Some((len_buf, rest)) = data.split_first_chunk::<4>() else {
            return Err(PacketError::Truncated {
                expected: 4,
                actual: data.len(),
            });
        };

        let len = u32::from_le_bytes(*len_buf) as usize;
        if len > MAX_BATCH_PACKET_SIZE {
            return Err(PacketError::PacketTooLarge {
                size: len,
                max: MAX_BATCH_PACKET_SIZE,
            });
        }
        if rest.len() < len {
            return Err(PacketError::Truncated {
                expected: len,
                actual: rest.len(),
            });
        }

        let (body, rest) = rest.split_at(len);
        packets.push(LevelChunkPacket::decode(body, protocol, gates)?);
        data = rest;
    }
    Ok(packets)
}
