//! Chunk compression for container datasets
//!
//! Each dataset chunk is a run of little-endian `f64` values, optionally
//! LZ4-compressed. Chunks are compressed independently so a windowed read
//! only decompresses the chunks it touches.

use crate::container::error::{ContainerError, ContainerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compression applied to dataset chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Compression {
    None = 0,
    Lz4 = 1,
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Lz4
    }
}

impl TryFrom<u8> for Compression {
    type Error = ContainerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Lz4),
            _ => Err(ContainerError::InvalidFormat(format!(
                "Unknown compression type: {}",
                value
            ))),
        }
    }
}

impl FromStr for Compression {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "lz4" => Ok(Compression::Lz4),
            other => Err(ContainerError::InvalidFormat(format!(
                "Unknown compression: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Lz4 => write!(f, "lz4"),
        }
    }
}

/// Encode a run of values as chunk payload bytes
pub fn encode_chunk(values: &[f64], compression: Compression) -> Vec<u8> {
    let mut raw = Vec::with_capacity(values.len() * 8);
    for value in values {
        raw.extend_from_slice(&value.to_le_bytes());
    }

    match compression {
        Compression::None => raw,
        Compression::Lz4 => lz4_flex::compress_prepend_size(&raw),
    }
}

/// Decode chunk payload bytes back to values
///
/// `expected` is the element count recorded in the index; a mismatch means
/// the chunk and the index disagree and is reported as corruption.
pub fn decode_chunk(
    bytes: &[u8],
    compression: Compression,
    expected: usize,
) -> ContainerResult<Vec<f64>> {
    let raw = match compression {
        Compression::None => std::borrow::Cow::Borrowed(bytes),
        Compression::Lz4 => std::borrow::Cow::Owned(
            lz4_flex::decompress_size_prepended(bytes).map_err(|e| {
                ContainerError::Compression(format!("LZ4 decompression failed: {}", e))
            })?,
        ),
    };

    if raw.len() != expected * 8 {
        return Err(ContainerError::Corruption(format!(
            "chunk holds {} bytes, index expects {} values",
            raw.len(),
            expected
        )));
    }

    Ok(raw
        .chunks_exact(8)
        .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .collect())
}
