//! Hierarchical binary container
//!
//! A single file holding a tree of named groups and datasets, each carrying
//! scalar attributes. Numeric datasets are cut into a regular grid of chunks
//! so that a [`Hyperslab`] read decompresses only the chunks it intersects.
//!
//! - **array**: `NdArray` and `Hyperslab`
//! - **layout**: chunk grids and chunk shape selection
//! - **compression**: per-chunk encoding
//! - **format**: header, frames, slots and the serialized index tree
//! - **error**: error types
//!
//! # Access model
//!
//! ```text
//! open ──► mutate in-memory index, write chunks and slots ──► close (commit index + header)
//! ```
//!
//! A handle opened [`OpenMode::ReadOnly`] memory-maps the file and never
//! writes to it, so any number of read-only handles may share one file as
//! long as no writer has it open.

pub mod array;
pub mod compression;
pub mod error;
pub mod format;
pub mod layout;

pub use array::{Hyperslab, NdArray};
pub use compression::Compression;
pub use error::{ContainerError, ContainerResult};
pub use format::{AttrValue, Attributes};

use crate::container::compression::{decode_chunk, encode_chunk};
use crate::container::format::{
    decode_index, decode_strings, encode_index, encode_strings, read_frame, write_frame,
    ChunkMeta, ContainerHeader, DatasetBody, DatasetNode, GroupNode, Node, Slot,
    FRAME_OVERHEAD, HEADER_SIZE,
};
use crate::container::layout::{guess_chunk_shape, ChunkGrid};
use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Default target size of one dataset chunk before compression (64KB)
pub const DEFAULT_CHUNK_TARGET_BYTES: usize = 64 * 1024;

/// How a container file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

enum Backing {
    Mapped(Mmap),
    File(File),
}

/// An open container file
pub struct Container {
    path: PathBuf,
    mode: OpenMode,
    backing: Backing,
    header: ContainerHeader,
    root: GroupNode,
    /// Where the next frame is appended
    end_of_file: u64,
    chunk_target_bytes: usize,
    dirty: bool,
}

impl Container {
    /// Create (or truncate) a container file holding an empty root group
    pub fn create(path: impl AsRef<Path>, compression: Compression) -> ContainerResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let mut container = Self {
            path,
            mode: OpenMode::ReadWrite,
            backing: Backing::File(file),
            header: ContainerHeader::new(compression),
            root: GroupNode::default(),
            end_of_file: HEADER_SIZE as u64,
            chunk_target_bytes: DEFAULT_CHUNK_TARGET_BYTES,
            dirty: true,
        };

        let header = container.header.to_bytes();
        container.write_at(0, &header)?;
        container.commit()?;

        tracing::debug!("Created container {:?}", container.path);
        Ok(container)
    }

    /// Open an existing container file
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> ContainerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ContainerError::NotFound(path.display().to_string()));
        }

        let file = match mode {
            OpenMode::ReadOnly => File::open(&path)?,
            OpenMode::ReadWrite => OpenOptions::new().read(true).write(true).open(&path)?,
        };
        let end_of_file = file.metadata()?.len();

        let backing = match mode {
            // SAFETY: read-only handles never write through the map. Writers
            // rewrite slots in place, so a file is never shared between a
            // read-only handle and a live writer.
            OpenMode::ReadOnly => Backing::Mapped(unsafe { Mmap::map(&file)? }),
            OpenMode::ReadWrite => Backing::File(file),
        };

        let mut container = Self {
            path,
            mode,
            backing,
            header: ContainerHeader::new(Compression::None),
            root: GroupNode::default(),
            end_of_file,
            chunk_target_bytes: DEFAULT_CHUNK_TARGET_BYTES,
            dirty: false,
        };

        let header = ContainerHeader::from_bytes(&container.read_bytes(0, HEADER_SIZE)?)?;
        let slot = header.index_slot();
        let index = container.read_payload(slot.offset, slot.len)?;
        container.root = decode_index(&index)?;
        container.header = header;

        Ok(container)
    }

    /// Builder: set the target uncompressed size of new dataset chunks
    pub fn with_chunk_target(mut self, bytes: usize) -> Self {
        self.chunk_target_bytes = bytes.max(8);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn compression(&self) -> Compression {
        self.header.compression
    }

    /// Number of commits since the file was created
    pub fn generation(&self) -> u64 {
        self.header.generation
    }

    /// Current file length, dead space included
    pub fn size_on_disk(&self) -> u64 {
        self.end_of_file
    }

    // ==================== Tree Navigation ====================

    /// Whether a node exists at `path` (the empty path is the root)
    pub fn contains(&self, path: &str) -> bool {
        segments(path).is_empty() || self.node(path).is_ok()
    }

    /// Names of the children of the group at `path`, in sorted order
    pub fn children(&self, path: &str) -> ContainerResult<Vec<String>> {
        Ok(self.group(path)?.children.keys().cloned().collect())
    }

    /// Attributes of the node at `path`
    pub fn attrs(&self, path: &str) -> ContainerResult<&Attributes> {
        if segments(path).is_empty() {
            return Ok(&self.root.attributes);
        }
        Ok(self.node(path)?.attributes())
    }

    /// Shape of the dataset at `path`; string lists report their length
    pub fn dataset_shape(&self, path: &str) -> ContainerResult<Vec<usize>> {
        match &self.dataset(path)?.body {
            DatasetBody::Numeric { shape, .. } => Ok(shape.clone()),
            DatasetBody::Strings { count, .. } => Ok(vec![*count]),
        }
    }

    /// Number of chunks a numeric dataset is stored in
    pub fn chunk_count(&self, path: &str) -> ContainerResult<usize> {
        Ok(self.numeric(path)?.2.len())
    }

    /// Number of chunks a read of `slab` decompresses
    pub fn chunks_covering(&self, path: &str, slab: &Hyperslab) -> ContainerResult<usize> {
        let (shape, chunk_shape, _) = self.numeric(path)?;
        slab.check(shape)?;
        Ok(ChunkGrid::new(shape, chunk_shape)?.covering(slab).len())
    }

    // ==================== Mutation ====================

    /// Create an empty group; the parent must already exist
    pub fn create_group(&mut self, path: &str) -> ContainerResult<()> {
        self.insert_node(path, Node::Group(GroupNode::default()))
    }

    /// Remove the node at `path` and everything below it
    ///
    /// Chunks belonging to the removed datasets are not reclaimed.
    pub fn delete(&mut self, path: &str) -> ContainerResult<()> {
        self.ensure_writable()?;
        let (parent, leaf) = split_leaf(path)?;
        self.group_mut(parent)?
            .children
            .remove(leaf)
            .ok_or_else(|| ContainerError::NotFound(path.to_string()))?;
        self.dirty = true;
        Ok(())
    }

    /// Set one attribute on the node at `path`
    pub fn set_attr(
        &mut self,
        path: &str,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> ContainerResult<()> {
        self.ensure_writable()?;
        let attributes = if segments(path).is_empty() {
            &mut self.root.attributes
        } else {
            self.node_mut(path)?.attributes_mut()
        };
        attributes.insert(name.to_string(), value.into());
        self.dirty = true;
        Ok(())
    }

    /// Write a new numeric dataset with an automatically chosen chunk shape
    pub fn write_dataset(&mut self, path: &str, array: &NdArray) -> ContainerResult<()> {
        self.write_dataset_chunked(path, array, &[])
    }

    /// Write a new numeric dataset whose chunks have extent 1 along `unit_axes`
    ///
    /// Reads that select one index of such an axis then decompress only the
    /// chunks holding that index.
    pub fn write_dataset_chunked(
        &mut self,
        path: &str,
        array: &NdArray,
        unit_axes: &[usize],
    ) -> ContainerResult<()> {
        self.ensure_writable()?;
        let (parent, leaf) = split_leaf(path)?;
        if self.group(parent)?.children.contains_key(leaf) {
            return Err(ContainerError::AlreadyExists(path.to_string()));
        }

        let chunk_shape = guess_chunk_shape(array.shape(), self.chunk_target_bytes, unit_axes);
        let grid = ChunkGrid::new(array.shape(), &chunk_shape)?;
        let mut chunks = Vec::with_capacity(grid.len());

        for coord in grid.coords() {
            let block = array.slice(&Hyperslab::new(grid.bounds(&coord)))?;
            let payload = encode_chunk(block.data(), self.header.compression);
            let offset = self.append_frame(&payload)?;
            chunks.push(ChunkMeta {
                offset,
                len: payload.len() as u32,
            });
        }

        tracing::debug!(
            "Wrote dataset {} with shape {:?} in {} chunks of {:?}",
            path,
            array.shape(),
            chunks.len(),
            chunk_shape
        );

        self.insert_node(
            path,
            Node::Dataset(DatasetNode {
                attributes: Attributes::new(),
                body: DatasetBody::Numeric {
                    shape: array.shape().to_vec(),
                    chunk_shape,
                    chunks,
                },
            }),
        )
    }

    /// Write a new string-list dataset
    pub fn write_strings(&mut self, path: &str, values: &[String]) -> ContainerResult<()> {
        self.ensure_writable()?;
        let (parent, leaf) = split_leaf(path)?;
        if self.group(parent)?.children.contains_key(leaf) {
            return Err(ContainerError::AlreadyExists(path.to_string()));
        }

        let payload = encode_strings(values)?;
        let slot = self.allocate_slot(&payload)?;
        self.insert_node(
            path,
            Node::Dataset(DatasetNode {
                attributes: Attributes::new(),
                body: DatasetBody::Strings {
                    slot,
                    count: values.len(),
                },
            }),
        )
    }

    /// Replace the contents of an existing string-list dataset
    ///
    /// The list is rewritten in place while it fits its slot. This is not
    /// atomic: a crash before the next commit leaves the slot disagreeing
    /// with the committed index, which reads report as corruption.
    pub fn replace_strings(&mut self, path: &str, values: &[String]) -> ContainerResult<()> {
        self.ensure_writable()?;
        let current = match &self.dataset(path)?.body {
            DatasetBody::Strings { slot, .. } => *slot,
            DatasetBody::Numeric { .. } => {
                return Err(ContainerError::NotADataset(format!(
                    "{} holds numbers, not strings",
                    path
                )))
            }
        };

        let payload = encode_strings(values)?;
        let slot = if current.fits(payload.len()) {
            self.write_slot(current, &payload)?
        } else {
            self.allocate_slot(&payload)?
        };

        if let Node::Dataset(dataset) = self.node_mut(path)? {
            dataset.body = DatasetBody::Strings {
                slot,
                count: values.len(),
            };
        }
        self.dirty = true;
        Ok(())
    }

    // ==================== Reads ====================

    /// Read a whole string-list dataset
    pub fn read_strings(&self, path: &str) -> ContainerResult<Vec<String>> {
        match &self.dataset(path)?.body {
            DatasetBody::Strings { slot, count } => {
                let values = decode_strings(&self.read_payload(slot.offset, slot.len)?)?;
                if values.len() != *count {
                    return Err(ContainerError::Corruption(format!(
                        "{} holds {} strings, index expects {}",
                        path,
                        values.len(),
                        count
                    )));
                }
                Ok(values)
            }
            DatasetBody::Numeric { .. } => Err(ContainerError::NotADataset(format!(
                "{} holds numbers, not strings",
                path
            ))),
        }
    }

    /// Read a whole numeric dataset
    pub fn read_dataset(&self, path: &str) -> ContainerResult<NdArray> {
        let shape = self.dataset_shape(path)?;
        self.read_slab(path, &Hyperslab::full(&shape))
    }

    /// Read the block selected by `slab`, decompressing only the chunks it spans
    pub fn read_slab(&self, path: &str, slab: &Hyperslab) -> ContainerResult<NdArray> {
        let (shape, chunk_shape, chunks) = self.numeric(path)?;
        slab.check(shape)?;
        let out_shape = slab.shape();
        let total: usize = out_shape.iter().product();
        let mut out = NdArray::new(out_shape, vec![0.0; total])?;
        if total == 0 {
            return Ok(out);
        }

        let grid = ChunkGrid::new(shape, chunk_shape)?;
        if grid.len() != chunks.len() {
            return Err(ContainerError::Corruption(format!(
                "{} indexes {} chunks, its grid has {}",
                path,
                chunks.len(),
                grid.len()
            )));
        }

        let covering = grid.covering(slab);
        for coord in &covering {
            let meta = chunks[grid.linear(coord)];
            let bounds = grid.bounds(coord);
            let extent: Vec<usize> = bounds.iter().map(|r| r.len()).collect();
            let payload = self.read_payload(meta.offset, meta.len)?;
            let values = decode_chunk(&payload, self.header.compression, extent.iter().product())?;
            let block = NdArray::new(extent, values)?;

            let overlap: Vec<_> = bounds
                .iter()
                .zip(&slab.ranges)
                .map(|(b, r)| b.start.max(r.start)..b.end.min(r.end))
                .collect();
            let local = Hyperslab::new(
                overlap
                    .iter()
                    .zip(&bounds)
                    .map(|(o, b)| o.start - b.start..o.end - b.start)
                    .collect(),
            );
            let origin: Vec<usize> = overlap
                .iter()
                .zip(&slab.ranges)
                .map(|(o, r)| o.start - r.start)
                .collect();
            out.paste(&origin, &block.slice(&local)?)?;
        }

        tracing::trace!("Read {} of {} chunks from {}", covering.len(), chunks.len(), path);
        Ok(out)
    }

    // ==================== Lifecycle ====================

    /// Persist the index and header if anything changed
    pub fn commit(&mut self) -> ContainerResult<()> {
        if !self.dirty || self.mode == OpenMode::ReadOnly {
            return Ok(());
        }

        // Never overwrite the slot the on-disk header points at
        let payload = encode_index(&self.root)?;
        let spare = self.header.spare_slot();
        let next = if spare.fits(payload.len()) {
            self.write_slot(spare, &payload)?
        } else {
            self.allocate_slot(&payload)?
        };

        self.header.swap_index(next);
        self.header.generation += 1;
        let header = self.header.to_bytes();
        self.write_at(0, &header)?;
        self.writable_file()?.sync_data()?;

        self.dirty = false;
        Ok(())
    }

    /// Commit pending changes and release the file
    pub fn close(mut self) -> ContainerResult<()> {
        self.commit()
    }

    // ==================== Internals ====================

    fn ensure_writable(&self) -> ContainerResult<()> {
        match self.mode {
            OpenMode::ReadOnly => Err(ContainerError::ReadOnly),
            OpenMode::ReadWrite => Ok(()),
        }
    }

    fn writable_file(&self) -> ContainerResult<&File> {
        match (&self.backing, self.mode) {
            (Backing::File(file), OpenMode::ReadWrite) => Ok(file),
            _ => Err(ContainerError::ReadOnly),
        }
    }

    fn write_at(&self, offset: u64, bytes: &[u8]) -> ContainerResult<()> {
        let mut file = self.writable_file()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        Ok(())
    }

    fn append_frame(&mut self, payload: &[u8]) -> ContainerResult<u64> {
        let offset = self.end_of_file;
        let written = {
            let mut writer = BufWriter::new(self.writable_file()?);
            writer.seek(SeekFrom::Start(offset))?;
            let written = write_frame(&mut writer, payload)?;
            writer.flush()?;
            written
        };
        self.end_of_file += written;
        Ok(offset)
    }

    /// Reserve a new slot at the end of the file and write `payload` into it
    fn allocate_slot(&mut self, payload: &[u8]) -> ContainerResult<Slot> {
        let capacity = Slot::capacity_for(payload.len());
        let offset = self.end_of_file;
        let slot = self.write_slot(
            Slot {
                offset,
                len: 0,
                capacity,
            },
            payload,
        )?;

        // Pad so the whole reservation exists on disk
        let written = payload.len() as u64 + FRAME_OVERHEAD;
        let padding = vec![0u8; (capacity - written) as usize];
        self.write_at(offset + written, &padding)?;
        self.end_of_file = offset + capacity;
        Ok(slot)
    }

    /// Write `payload` as a frame at the start of `slot`
    fn write_slot(&mut self, slot: Slot, payload: &[u8]) -> ContainerResult<Slot> {
        let mut frame = Vec::with_capacity(payload.len() + FRAME_OVERHEAD as usize);
        write_frame(&mut frame, payload)?;
        self.write_at(slot.offset, &frame)?;
        Ok(Slot {
            len: payload.len() as u32,
            ..slot
        })
    }

    /// Shape, chunk shape and chunk list of the numeric dataset at `path`
    fn numeric(&self, path: &str) -> ContainerResult<(&[usize], &[usize], &[ChunkMeta])> {
        match &self.dataset(path)?.body {
            DatasetBody::Numeric {
                shape,
                chunk_shape,
                chunks,
            } => {
                if shape.is_empty() {
                    return Err(ContainerError::InvalidFormat(format!(
                        "{} is a dataset without axes",
                        path
                    )));
                }
                Ok((shape, chunk_shape, chunks))
            }
            DatasetBody::Strings { .. } => Err(ContainerError::NotADataset(format!(
                "{} holds strings, not numbers",
                path
            ))),
        }
    }

    fn read_bytes(&self, offset: u64, len: usize) -> ContainerResult<Cow<'_, [u8]>> {
        let end = offset
            .checked_add(len as u64)
            .filter(|&end| end <= self.end_of_file)
            .ok_or_else(|| {
                ContainerError::Corruption(format!(
                    "read of {} bytes at {} runs past end of file ({})",
                    len, offset, self.end_of_file
                ))
            })?;

        match &self.backing {
            Backing::Mapped(map) => Ok(Cow::Borrowed(&map[offset as usize..end as usize])),
            Backing::File(file) => {
                let mut file = file;
                let mut buf = vec![0u8; len];
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(&mut buf)?;
                Ok(Cow::Owned(buf))
            }
        }
    }

    fn read_payload(&self, offset: u64, len: u32) -> ContainerResult<Vec<u8>> {
        let frame = self.read_bytes(offset, len as usize + FRAME_OVERHEAD as usize)?;
        Ok(read_frame(&frame)?.to_vec())
    }

    fn group(&self, path: &str) -> ContainerResult<&GroupNode> {
        let mut group = &self.root;
        for segment in segments(path) {
            match group.children.get(segment) {
                Some(Node::Group(child)) => group = child,
                Some(Node::Dataset(_)) => return Err(ContainerError::NotAGroup(path.to_string())),
                None => return Err(ContainerError::NotFound(path.to_string())),
            }
        }
        Ok(group)
    }

    fn group_mut(&mut self, path: &str) -> ContainerResult<&mut GroupNode> {
        let mut group = &mut self.root;
        for segment in segments(path) {
            match group.children.get_mut(segment) {
                Some(Node::Group(child)) => group = child,
                Some(Node::Dataset(_)) => return Err(ContainerError::NotAGroup(path.to_string())),
                None => return Err(ContainerError::NotFound(path.to_string())),
            }
        }
        Ok(group)
    }

    fn node(&self, path: &str) -> ContainerResult<&Node> {
        let (parent, leaf) = split_leaf(path)?;
        self.group(parent)?
            .children
            .get(leaf)
            .ok_or_else(|| ContainerError::NotFound(path.to_string()))
    }

    fn node_mut(&mut self, path: &str) -> ContainerResult<&mut Node> {
        let (parent, leaf) = split_leaf(path)?;
        self.group_mut(parent)?
            .children
            .get_mut(leaf)
            .ok_or_else(|| ContainerError::NotFound(path.to_string()))
    }

    fn dataset(&self, path: &str) -> ContainerResult<&DatasetNode> {
        match self.node(path)? {
            Node::Dataset(dataset) => Ok(dataset),
            Node::Group(_) => Err(ContainerError::NotADataset(path.to_string())),
        }
    }

    fn insert_node(&mut self, path: &str, node: Node) -> ContainerResult<()> {
        self.ensure_writable()?;
        let (parent, leaf) = split_leaf(path)?;
        let group = self.group_mut(parent)?;
        if group.children.contains_key(leaf) {
            return Err(ContainerError::AlreadyExists(path.to_string()));
        }
        group.children.insert(leaf.to_string(), node);
        self.dirty = true;
        Ok(())
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if self.dirty && self.mode == OpenMode::ReadWrite {
            if let Err(e) = self.commit() {
                tracing::warn!("Failed to commit container {:?} on drop: {}", self.path, e);
            }
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Split `a/b/c` into (`a/b`, `c`); the root has no leaf
fn split_leaf(path: &str) -> ContainerResult<(&str, &str)> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(ContainerError::NotFound("the root group has no parent".into()));
    }
    Ok(match trimmed.rsplit_once('/') {
        Some((parent, leaf)) => (parent, leaf),
        None => ("", trimmed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn matrix(rows: usize, cols: usize) -> NdArray {
        let data = (0..rows * cols).map(|i| i as f64 * 0.5).collect();
        NdArray::new(vec![rows, cols], data).unwrap()
    }

    #[test]
    fn test_create_and_reopen_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tsv");

        Container::create(&path, Compression::Lz4).unwrap().close().unwrap();

        let container = Container::open(&path, OpenMode::ReadOnly).unwrap();
        assert!(container.children("").unwrap().is_empty());
        assert_eq!(container.compression(), Compression::Lz4);
        assert_eq!(container.generation(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let err = Container::open(dir.path().join("missing.tsv"), OpenMode::ReadOnly)
            .err()
            .unwrap();
        assert!(matches!(err, ContainerError::NotFound(_)));
    }

    #[test]
    fn test_groups_attributes_and_strings_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tsv");

        {
            let mut container = Container::create(&path, Compression::None).unwrap();
            container.create_group("time_series").unwrap();
            container.create_group("time_series/entry").unwrap();
            container
                .set_attr("time_series/entry", "resolution", 3_600_000i64)
                .unwrap();
            container
                .set_attr("time_series/entry", "data_kind", "CONSTANT")
                .unwrap();
            container
                .write_strings("time_series/entry/components", &["a__x".to_string()])
                .unwrap();
            container.close().unwrap();
        }

        let container = Container::open(&path, OpenMode::ReadOnly).unwrap();
        let attrs = container.attrs("time_series/entry").unwrap();
        assert_eq!(attrs.get("resolution"), Some(&AttrValue::Int(3_600_000)));
        assert_eq!(attrs.get("data_kind").and_then(|v| v.as_str()), Some("CONSTANT"));
        assert_eq!(
            container.read_strings("time_series/entry/components").unwrap(),
            vec!["a__x".to_string()]
        );
        assert!(container.contains("time_series/entry"));
        assert!(!container.contains("time_series/other"));
    }

    #[test]
    fn test_chunked_dataset_partial_reads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tsv");
        let array = matrix(100, 3);

        {
            // 3 values per row * 8 bytes = 24 bytes per row -> 4 rows per chunk
            let mut container = Container::create(&path, Compression::Lz4)
                .unwrap()
                .with_chunk_target(96);
            container.write_dataset("data", &array).unwrap();
            container.close().unwrap();
        }

        for mode in [OpenMode::ReadOnly, OpenMode::ReadWrite] {
            let container = Container::open(&path, mode).unwrap();
            assert_eq!(container.dataset_shape("data").unwrap(), vec![100, 3]);
            assert_eq!(container.read_dataset("data").unwrap(), array);

            let slab = Hyperslab::new(vec![37..43, 1..3]);
            let part = container.read_slab("data", &slab).unwrap();
            assert_eq!(part, array.slice(&slab).unwrap());
        }
    }

    #[test]
    fn test_grid_chunks_irregular_edges() {
        let dir = tempdir().unwrap();
        let data = (0..5 * 7 * 9).map(|i| i as f64).collect();
        let array = NdArray::new(vec![5, 7, 9], data).unwrap();

        // 64 bytes = 8 values per chunk, so every axis is cut
        let mut container = Container::create(dir.path().join("s.tsv"), Compression::Lz4)
            .unwrap()
            .with_chunk_target(64);
        container.write_dataset("cube", &array).unwrap();
        assert!(container.chunk_count("cube").unwrap() > 5);

        assert_eq!(container.read_dataset("cube").unwrap(), array);
        for slab in [
            Hyperslab::new(vec![1..4, 2..7, 0..9]),
            Hyperslab::new(vec![4..5, 0..7, 8..9]),
            Hyperslab::new(vec![0..5, 3..4, 2..6]),
        ] {
            assert_eq!(
                container.read_slab("cube", &slab).unwrap(),
                array.slice(&slab).unwrap()
            );
        }
    }

    #[test]
    fn test_unit_axis_column_read_touches_one_chunk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tsv");
        let data = (0..3 * 24 * 365).map(|i| (i % 1000) as f64).collect();
        let array = NdArray::new(vec![3, 24, 365], data).unwrap();

        {
            let mut container = Container::create(&path, Compression::Lz4).unwrap();
            container.write_dataset_chunked("ensemble", &array, &[2]).unwrap();
            container.close().unwrap();
        }

        let container = Container::open(&path, OpenMode::ReadOnly).unwrap();
        assert_eq!(container.chunk_count("ensemble").unwrap(), 365);

        let column = Hyperslab::new(vec![0..3, 0..24, 5..6]);
        assert_eq!(container.chunks_covering("ensemble", &column).unwrap(), 1);
        assert_eq!(
            container.read_slab("ensemble", &column).unwrap(),
            array.slice(&column).unwrap()
        );

        let window = Hyperslab::new(vec![0..3, 6..12, 5..6]);
        assert_eq!(container.chunks_covering("ensemble", &window).unwrap(), 1);
    }

    #[test]
    fn test_dataset_without_axes_is_invalid() {
        let dir = tempdir().unwrap();
        let mut container = Container::create(dir.path().join("s.tsv"), Compression::Lz4).unwrap();
        container
            .insert_node(
                "scalar",
                Node::Dataset(DatasetNode {
                    attributes: Attributes::new(),
                    body: DatasetBody::Numeric {
                        shape: vec![],
                        chunk_shape: vec![],
                        chunks: vec![],
                    },
                }),
            )
            .unwrap();

        assert!(matches!(
            container.read_dataset("scalar").unwrap_err(),
            ContainerError::InvalidFormat(_)
        ));
        assert!(matches!(
            container.chunk_count("scalar").unwrap_err(),
            ContainerError::InvalidFormat(_)
        ));
    }

    #[test]
    fn test_replace_strings_reuses_slot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tsv");
        let names = |n: usize| (0..n).map(|i| format!("owner_{i}")).collect::<Vec<_>>();

        let mut container = Container::create(&path, Compression::Lz4).unwrap();
        container.write_strings("refs", &names(1)).unwrap();
        container.commit().unwrap();
        container.replace_strings("refs", &names(2)).unwrap();
        container.commit().unwrap();
        let settled = container.size_on_disk();

        // Small lists fit the first reservation and the index alternates slots
        for n in 3..6 {
            container.replace_strings("refs", &names(n)).unwrap();
            container.commit().unwrap();
        }
        assert_eq!(container.size_on_disk(), settled);

        // Outgrowing the slot moves the list and keeps every value
        container.replace_strings("refs", &names(200)).unwrap();
        container.commit().unwrap();
        assert_eq!(container.size_on_disk(), std::fs::metadata(&path).unwrap().len());
        container.close().unwrap();

        let container = Container::open(&path, OpenMode::ReadOnly).unwrap();
        assert_eq!(container.read_strings("refs").unwrap(), names(200));
        assert_eq!(container.dataset_shape("refs").unwrap(), vec![200]);
    }

    #[test]
    fn test_commit_keeps_previous_index_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tsv");

        let mut container = Container::create(&path, Compression::None).unwrap();
        container.create_group("first").unwrap();
        container.commit().unwrap();
        let committed = container.header.index_slot();

        container.create_group("second").unwrap();
        container.commit().unwrap();
        assert_ne!(container.header.index_slot().offset, committed.offset);

        // The slot the previous header pointed at is untouched until the next commit
        let previous = decode_index(&container.read_payload(committed.offset, committed.len).unwrap())
            .unwrap();
        assert!(previous.children.contains_key("first"));
        assert!(!previous.children.contains_key("second"));
    }

    #[test]
    fn test_empty_selection() {
        let dir = tempdir().unwrap();
        let mut container = Container::create(dir.path().join("s.tsv"), Compression::Lz4).unwrap();
        container.write_dataset("data", &matrix(4, 2)).unwrap();
        let part = container
            .read_slab("data", &Hyperslab::new(vec![2..2, 0..2]))
            .unwrap();
        assert_eq!(part.shape(), &[0, 2]);
    }

    #[test]
    fn test_read_only_rejects_mutation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tsv");
        Container::create(&path, Compression::Lz4).unwrap().close().unwrap();
        let before = std::fs::read(&path).unwrap();

        {
            let mut container = Container::open(&path, OpenMode::ReadOnly).unwrap();
            assert!(matches!(
                container.create_group("x").unwrap_err(),
                ContainerError::ReadOnly
            ));
            assert!(matches!(
                container.set_attr("", "k", "v").unwrap_err(),
                ContainerError::ReadOnly
            ));
            assert!(matches!(
                container.write_dataset("d", &matrix(1, 1)).unwrap_err(),
                ContainerError::ReadOnly
            ));
        }

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_delete_does_not_reclaim_space() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tsv");

        let mut container = Container::create(&path, Compression::None).unwrap();
        container.create_group("g").unwrap();
        container.write_dataset("g/data", &matrix(64, 4)).unwrap();
        container.commit().unwrap();
        let size_with_data = container.size_on_disk();

        container.delete("g").unwrap();
        container.close().unwrap();

        let container = Container::open(&path, OpenMode::ReadOnly).unwrap();
        assert!(!container.contains("g"));
        assert!(container.size_on_disk() >= size_with_data);
    }

    #[test]
    fn test_drop_commits_pending_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tsv");

        {
            let mut container = Container::create(&path, Compression::Lz4).unwrap();
            container.create_group("pending").unwrap();
        }

        let container = Container::open(&path, OpenMode::ReadOnly).unwrap();
        assert!(container.contains("pending"));
    }

    #[test]
    fn test_duplicate_and_missing_nodes() {
        let dir = tempdir().unwrap();
        let mut container = Container::create(dir.path().join("s.tsv"), Compression::Lz4).unwrap();
        container.create_group("a").unwrap();
        assert!(matches!(
            container.create_group("a").unwrap_err(),
            ContainerError::AlreadyExists(_)
        ));
        assert!(matches!(
            container.create_group("missing/child").unwrap_err(),
            ContainerError::NotFound(_)
        ));
        assert!(matches!(
            container.delete("nope").unwrap_err(),
            ContainerError::NotFound(_)
        ));
        assert!(matches!(
            container.read_dataset("a").unwrap_err(),
            ContainerError::NotADataset(_)
        ));
    }
}
