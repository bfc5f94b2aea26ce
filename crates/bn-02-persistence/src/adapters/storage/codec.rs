//! # Artifact Codec
//!
//! On-disk format of one block artifact:
//!
//! ```text
//! [magic "BNBK":4][version:1][compression:1][crc32:4 LE][payload...]
//! ```
//!
//! The payload is the bincode-encoded item list, zstd-compressed when
//! configured. The checksum covers the stored payload bytes.

use shared_types::BlockItem;

use crate::domain::errors::StorageError;

const MAGIC: &[u8; 4] = b"BNBK";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 10;

/// Payload compression of a block artifact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionKind {
    #[default]
    None,
    Zstd,
}

impl CompressionKind {
    fn tag(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Zstd => 1,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::None),
            1 => Some(Self::Zstd),
            _ => None,
        }
    }

    /// File extension suffix for artifacts in this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::None => "blk",
            Self::Zstd => "blk.zstd",
        }
    }
}

/// Configuration for artifact compression
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressionConfig {
    pub kind: CompressionKind,
    /// Zstd level (1-22, default 3)
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            kind: CompressionKind::None,
            level: 3,
        }
    }
}

pub fn encode_artifact(
    items: &[BlockItem],
    compression: CompressionConfig,
) -> Result<Vec<u8>, StorageError> {
    let encoded =
        bincode::serialize(items).map_err(|e| StorageError::Serialization(e.to_string()))?;
    let payload = match compression.kind {
        CompressionKind::None => encoded,
        CompressionKind::Zstd => zstd::encode_all(encoded.as_slice(), compression.level)
            .map_err(|e| StorageError::Compression(e.to_string()))?,
    };

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.push(compression.kind.tag());
    bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub fn decode_artifact(block_number: u64, bytes: &[u8]) -> Result<Vec<BlockItem>, StorageError> {
    let corrupted = |reason: &str| StorageError::Corrupted {
        block_number,
        reason: reason.to_string(),
    };

    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(corrupted("missing artifact header"));
    }
    if bytes[4] != FORMAT_VERSION {
        return Err(corrupted("unsupported format version"));
    }
    let kind = CompressionKind::from_tag(bytes[5]).ok_or_else(|| corrupted("unknown compression"))?;
    let mut crc = [0u8; 4];
    crc.copy_from_slice(&bytes[6..HEADER_LEN]);
    let payload = &bytes[HEADER_LEN..];
    if crc32fast::hash(payload) != u32::from_le_bytes(crc) {
        return Err(corrupted("checksum mismatch"));
    }

    let encoded = match kind {
        CompressionKind::None => payload.to_vec(),
        CompressionKind::Zstd => zstd::decode_all(payload).map_err(|e| corrupted(&e.to_string()))?,
    };
    bincode::deserialize(&encoded).map_err(|e| corrupted(&e.to_string()))
}
