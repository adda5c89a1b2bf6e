//! Container file format
//!
//! Layout:
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ HEADER (64 bytes)                       │
//! │   magic: [u8; 4] = "TSVC"               │
//! │   version: u16                          │
//! │   compression: u8                       │
//! │   index_offset: u64                     │
//! │   index_len: u32                        │
//! │   generation: u64                       │
//! │   index_capacity: u64                   │
//! │   spare_offset: u64                     │
//! │   spare_capacity: u64                   │
//! │   reserved: [u8; 9]                     │
//! │   checksum: u32                         │
//! ├─────────────────────────────────────────┤
//! │ FRAMES                                  │
//! │   len: u32                              │
//! │   payload: [u8; len]                    │
//! │   crc: u32                              │
//! │   ... dataset chunks, string slots and  │
//! │       the two index slots               │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Chunk frames are append-only. Index and string-list frames live in
//! [`Slot`]s: reserved regions that are rewritten in place while the new
//! frame fits and reallocated at twice the size when it does not.
//!
//! The index alternates between two slots. A commit writes the spare slot,
//! then rewrites the header to point at it, so the header always names a
//! complete index. Chunks of deleted datasets and outgrown slots stay in the
//! file as dead space.

use crate::container::compression::Compression;
use crate::container::error::{ContainerError, ContainerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// Magic bytes for container file identification
pub const CONTAINER_MAGIC: [u8; 4] = *b"TSVC";

/// Current container format version
pub const CONTAINER_VERSION: u16 = 1;

/// Header size in bytes
pub const HEADER_SIZE: usize = 64;

/// Bytes added around every frame payload (length prefix + checksum)
pub const FRAME_OVERHEAD: u64 = 8;

/// Container file header
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub compression: Compression,
    /// Offset of the current index frame
    pub index_offset: u64,
    /// Payload length of the current index frame
    pub index_len: u32,
    /// Incremented on every commit
    pub generation: u64,
    /// Reserved size of the current index slot
    pub index_capacity: u64,
    /// The other index slot; capacity 0 until one is allocated
    pub spare_offset: u64,
    pub spare_capacity: u64,
}

impl ContainerHeader {
    pub fn new(compression: Compression) -> Self {
        Self {
            magic: CONTAINER_MAGIC,
            version: CONTAINER_VERSION,
            compression,
            index_offset: HEADER_SIZE as u64,
            index_len: 0,
            generation: 0,
            index_capacity: 0,
            spare_offset: 0,
            spare_capacity: 0,
        }
    }

    /// Slot holding the current index
    pub fn index_slot(&self) -> Slot {
        Slot {
            offset: self.index_offset,
            len: self.index_len,
            capacity: self.index_capacity,
        }
    }

    /// Slot the next commit may overwrite
    pub fn spare_slot(&self) -> Slot {
        Slot {
            offset: self.spare_offset,
            len: 0,
            capacity: self.spare_capacity,
        }
    }

    /// Point the header at `next` and keep the previous index slot as spare
    pub fn swap_index(&mut self, next: Slot) {
        self.spare_offset = self.index_offset;
        self.spare_capacity = self.index_capacity;
        self.index_offset = next.offset;
        self.index_len = next.len;
        self.index_capacity = next.capacity;
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        buf[0..4].copy_from_slice(&self.magic);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6] = self.compression as u8;
        buf[7..15].copy_from_slice(&self.index_offset.to_le_bytes());
        buf[15..19].copy_from_slice(&self.index_len.to_le_bytes());
        buf[19..27].copy_from_slice(&self.generation.to_le_bytes());
        buf[27..35].copy_from_slice(&self.index_capacity.to_le_bytes());
        buf[35..43].copy_from_slice(&self.spare_offset.to_le_bytes());
        buf[43..51].copy_from_slice(&self.spare_capacity.to_le_bytes());
        // bytes 51-59 reserved

        let checksum = crc32fast::hash(&buf[0..60]);
        buf[60..64].copy_from_slice(&checksum.to_le_bytes());

        buf
    }

    /// Parse header from bytes
    pub fn from_bytes(buf: &[u8]) -> ContainerResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(ContainerError::InvalidFormat(format!(
                "file too short for header: {} bytes",
                buf.len()
            )));
        }

        let stored_checksum = u32::from_le_bytes(read_array(&buf[60..64]));
        let computed_checksum = crc32fast::hash(&buf[0..60]);
        if stored_checksum != computed_checksum {
            return Err(ContainerError::Corruption(format!(
                "Header checksum mismatch: stored={}, computed={}",
                stored_checksum, computed_checksum
            )));
        }

        let magic: [u8; 4] = read_array(&buf[0..4]);
        if magic != CONTAINER_MAGIC {
            return Err(ContainerError::InvalidFormat(format!(
                "Invalid magic: {:?}",
                magic
            )));
        }

        let version = u16::from_le_bytes(read_array(&buf[4..6]));
        if version > CONTAINER_VERSION {
            return Err(ContainerError::InvalidFormat(format!(
                "Unsupported version: {}",
                version
            )));
        }

        Ok(Self {
            magic,
            version,
            compression: Compression::try_from(buf[6])?,
            index_offset: u64::from_le_bytes(read_array(&buf[7..15])),
            index_len: u32::from_le_bytes(read_array(&buf[15..19])),
            generation: u64::from_le_bytes(read_array(&buf[19..27])),
            index_capacity: u64::from_le_bytes(read_array(&buf[27..35])),
            spare_offset: u64::from_le_bytes(read_array(&buf[35..43])),
            spare_capacity: u64::from_le_bytes(read_array(&buf[43..51])),
        })
    }
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Write `payload` as one frame, returning the number of bytes written
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> ContainerResult<u64> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        ContainerError::InvalidFormat(format!("frame too large: {} bytes", payload.len()))
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.write_all(&crc32fast::hash(payload).to_le_bytes())?;
    Ok(payload.len() as u64 + FRAME_OVERHEAD)
}

/// Validate a complete frame (`len`, payload, `crc`) and return its payload
pub fn read_frame(frame: &[u8]) -> ContainerResult<&[u8]> {
    if frame.len() < FRAME_OVERHEAD as usize {
        return Err(ContainerError::Corruption("truncated frame".into()));
    }
    let len = u32::from_le_bytes(read_array(&frame[0..4])) as usize;
    if frame.len() != len + FRAME_OVERHEAD as usize {
        return Err(ContainerError::Corruption(format!(
            "frame length {} does not match span of {} bytes",
            len,
            frame.len()
        )));
    }

    let payload = &frame[4..4 + len];
    let stored = u32::from_le_bytes(read_array(&frame[4 + len..]));
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(ContainerError::Corruption(format!(
            "frame checksum mismatch: stored={}, computed={}",
            stored, computed
        )));
    }
    Ok(payload)
}

/// Scalar attribute attached to a group or dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Str(s) => write!(f, "{}", s),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

/// Location of one compressed chunk frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Offset of the frame from start of file
    pub offset: u64,
    /// Payload length of the frame
    pub len: u32,
}

/// Smallest region reserved for a slot
pub const MIN_SLOT_BYTES: u64 = 256;

/// A reserved file region holding one frame that may be rewritten in place
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub offset: u64,
    /// Payload length of the frame currently in the slot
    pub len: u32,
    /// Bytes reserved, frame overhead included
    pub capacity: u64,
}

impl Slot {
    /// Whether a frame around `payload_len` bytes fits in the slot
    pub fn fits(&self, payload_len: usize) -> bool {
        payload_len as u64 + FRAME_OVERHEAD <= self.capacity
    }

    /// Capacity to reserve for a new slot first holding `payload_len` bytes
    pub fn capacity_for(payload_len: usize) -> u64 {
        ((payload_len as u64 + FRAME_OVERHEAD) * 2).max(MIN_SLOT_BYTES)
    }
}

/// Payload of a dataset node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatasetBody {
    /// Row-major `f64` array cut into a regular grid of chunks
    ///
    /// `chunks` lists the grid cells in row-major order.
    Numeric {
        shape: Vec<usize>,
        chunk_shape: Vec<usize>,
        chunks: Vec<ChunkMeta>,
    },
    /// Ordered list of strings, stored as one frame in `slot`
    Strings { slot: Slot, count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetNode {
    pub attributes: Attributes,
    pub body: DatasetBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub attributes: Attributes,
    pub children: BTreeMap<String, Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Group(GroupNode),
    Dataset(DatasetNode),
}

impl Node {
    pub fn attributes(&self) -> &Attributes {
        match self {
            Node::Group(g) => &g.attributes,
            Node::Dataset(d) => &d.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Node::Group(g) => &mut g.attributes,
            Node::Dataset(d) => &mut d.attributes,
        }
    }
}

/// Serialize the group tree into an index payload
pub fn encode_index(root: &GroupNode) -> ContainerResult<Vec<u8>> {
    Ok(bincode::serialize(root)?)
}

/// Deserialize an index payload into the group tree
pub fn decode_index(payload: &[u8]) -> ContainerResult<GroupNode> {
    Ok(bincode::deserialize(payload)?)
}

pub fn encode_strings(values: &[String]) -> ContainerResult<Vec<u8>> {
    Ok(bincode::serialize(values)?)
}

pub fn decode_strings(payload: &[u8]) -> ContainerResult<Vec<String>> {
    Ok(bincode::deserialize(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let mut header = ContainerHeader::new(Compression::Lz4);
        header.index_offset = 4096;
        header.index_len = 321;
        header.generation = 7;
        header.index_capacity = 1024;
        header.spare_offset = 9000;
        header.spare_capacity = 512;

        let bytes = header.to_bytes();
        let restored = ContainerHeader::from_bytes(&bytes).unwrap();
        assert_eq!(restored, header);
    }

    #[test]
    fn test_header_checksum_detects_corruption() {
        let mut bytes = ContainerHeader::new(Compression::None).to_bytes();
        bytes[8] ^= 0xFF;
        let err = ContainerHeader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ContainerError::Corruption(_)));
    }

    #[test]
    fn test_header_rejects_foreign_file() {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(b"CHRN");
        let checksum = crc32fast::hash(&bytes[0..60]);
        bytes[60..64].copy_from_slice(&checksum.to_le_bytes());
        let err = ContainerHeader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidFormat(_)));
    }

    #[test]
    fn test_swap_index_keeps_previous_as_spare() {
        let mut header = ContainerHeader::new(Compression::Lz4);
        header.swap_index(Slot {
            offset: 64,
            len: 10,
            capacity: 256,
        });
        header.swap_index(Slot {
            offset: 320,
            len: 12,
            capacity: 256,
        });

        assert_eq!(header.index_slot().offset, 320);
        assert_eq!(header.spare_slot().offset, 64);
        assert!(header.spare_slot().fits(200));
        assert!(!header.spare_slot().fits(250));
    }

    #[test]
    fn test_strings_roundtrip() {
        let values = vec!["a:load".to_string(), String::new(), "b:load2".to_string()];
        let payload = encode_strings(&values).unwrap();
        assert_eq!(decode_strings(&payload).unwrap(), values);
    }

    #[test]
    fn test_frame_roundtrip_and_corruption() {
        let mut buf = Vec::new();
        let written = write_frame(&mut buf, b"payload").unwrap();
        assert_eq!(written, buf.len() as u64);
        assert_eq!(read_frame(&buf).unwrap(), b"payload");

        buf[5] ^= 0x01;
        assert!(matches!(
            read_frame(&buf).unwrap_err(),
            ContainerError::Corruption(_)
        ));
    }

    #[test]
    fn test_index_roundtrip() {
        let mut root = GroupNode::default();
        let mut entry = GroupNode::default();
        entry
            .attributes
            .insert("resolution".into(), AttrValue::Int(3_600_000));
        entry.children.insert(
            "components".into(),
            Node::Dataset(DatasetNode {
                attributes: Attributes::new(),
                body: DatasetBody::Strings {
                    slot: Slot {
                        offset: 64,
                        len: 20,
                        capacity: MIN_SLOT_BYTES,
                    },
                    count: 1,
                },
            }),
        );
        root.children.insert("entry".into(), Node::Group(entry));

        let payload = encode_index(&root).unwrap();
        assert_eq!(decode_index(&payload).unwrap(), root);
    }
}
