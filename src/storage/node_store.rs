//! Node Store - file I/O for tree nodes.
//!
//! The [`NodeStore`] handles all direct node-file operations:
//! - Reading and rewriting nodes at their byte offset
//! - Appending new nodes at end of file
//! - Keeping the file header (root, order, node counts) current

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::common::config::TreeConfig;
use crate::common::{Error, NodeOffset, Result, TreeStats};
use crate::index::{KeyCodec, KeyType};
use crate::storage::node::{InternalNode, LeafNode, Node, NodeKind, NodeLayout};
use crate::storage::TreeHeader;

/// Owns the node file of one tree.
///
/// # File Layout
/// ```text
/// ┌──────────┬──────────┬──────────┬─────┬──────────┐
/// │  Header  │  Node A  │  Node B  │ ... │  Node N  │
/// │  (20 B)  │ (leaf)   │(internal)│     │          │
/// └──────────┴──────────┴──────────┴─────┴──────────┘
/// ```
///
/// Nodes are packed back to back; leaf and internal sizes differ, so a
/// node's offset is only known from the link that points at it. Every
/// node starts with its kind byte.
///
/// # Thread Safety
/// `NodeStore` is **single-threaded**: the file handle is opened once and
/// every operation takes `&mut self`.
///
/// # Durability
/// Writes go straight to the file without `fsync()`; call [`sync`](Self::sync)
/// to force them to disk. There is no journaling, so a crash between two
/// writes of one tree operation can leave the file inconsistent.
pub struct NodeStore {
    file: File,
    layout: NodeLayout,
    header: TreeHeader,
    /// Current length of the node file in bytes.
    file_len: u64,
    stats: TreeStats,
}

impl NodeStore {
    /// Create a new node file holding an empty tree.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or the file already exists.
    pub fn create<P: AsRef<Path>>(path: P, config: &TreeConfig) -> Result<Self> {
        config.validate()?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Self::init(file, config)
    }

    /// Open an existing node file.
    ///
    /// The order comes from the file header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its header is corrupt.
    pub fn open<P: AsRef<Path>>(path: P, key_type: KeyType) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let file_len = file.metadata()?.len();

        let mut buf = [0u8; TreeHeader::SIZE];
        let n = read_fully(&mut file, &mut buf)?;
        let header = TreeHeader::from_bytes(&buf[..n])?;
        let layout = NodeLayout::new(header.order, KeyCodec::new(key_type)?);

        debug!(
            root = %header.root,
            order = header.order,
            nodes = header.node_count(),
            "opened node file"
        );

        Ok(Self {
            file,
            layout,
            header,
            file_len,
            stats: TreeStats::new(),
        })
    }

    /// Open an existing node file, or create it if it doesn't exist.
    ///
    /// A file too short to hold a header is treated as absent and
    /// reinitialized. An existing file keeps its stored order even when
    /// `config.order` differs.
    pub fn open_or_create<P: AsRef<Path>>(path: P, config: &TreeConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();
        let existing_len = path.metadata().map(|m| m.len()).ok();

        match existing_len {
            Some(len) if len >= TreeHeader::SIZE as u64 => {
                let store = Self::open(path, config.key_type)?;
                if store.order() != config.order {
                    warn!(
                        stored = store.order(),
                        requested = config.order,
                        "node file keeps its stored order"
                    );
                }
                Ok(store)
            }
            _ => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)?;
                Self::init(file, config)
            }
        }
    }

    fn init(file: File, config: &TreeConfig) -> Result<Self> {
        let mut store = Self {
            file,
            layout: NodeLayout::new(config.order, KeyCodec::new(config.key_type)?),
            header: TreeHeader::new(config.order),
            file_len: TreeHeader::SIZE as u64,
            stats: TreeStats::new(),
        };
        store.write_header()?;
        debug!(order = config.order, "created node file");
        Ok(store)
    }

    // ========================================================================
    // Header
    // ========================================================================

    #[inline]
    pub fn header(&self) -> &TreeHeader {
        &self.header
    }

    #[inline]
    pub fn root(&self) -> NodeOffset {
        self.header.root
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.header.order
    }

    #[inline]
    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    #[inline]
    pub fn codec(&self) -> &KeyCodec {
        self.layout.codec()
    }

    #[inline]
    pub fn stats(&self) -> &TreeStats {
        &self.stats
    }

    /// Get the total size of the node file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.file_len
    }

    /// Point the header at a new root and persist it.
    pub fn set_root(&mut self, root: NodeOffset) -> Result<()> {
        self.header.root = root;
        self.write_header()
    }

    fn write_header(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&self.header.to_bytes())?;
        Ok(())
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Read the node at `offset`.
    ///
    /// # Errors
    /// Returns `Error::CorruptFile` if fewer bytes remain than the node needs
    /// or the bytes do not decode.
    pub fn read_node(&mut self, offset: NodeOffset) -> Result<Node> {
        let start = self.check_offset(offset)?;

        self.file.seek(SeekFrom::Start(start))?;
        let mut kind_byte = [0u8; 1];
        self.file.read_exact(&mut kind_byte)?;
        let kind = NodeKind::from_u8(kind_byte[0])
            .ok_or_else(|| Error::corrupt(start, "unknown node discriminator"))?;

        let size = self.layout.node_size(kind);
        if start + size as u64 > self.file_len {
            return Err(Error::corrupt(
                start,
                format!(
                    "{:?} node needs {} bytes, {} remain",
                    kind,
                    size,
                    self.file_len - start
                ),
            ));
        }

        let mut buf = vec![0u8; size];
        self.file.seek(SeekFrom::Start(start))?;
        self.file.read_exact(&mut buf)?;
        TreeStats::bump(&self.stats.nodes_read);
        self.layout.decode(&buf, start)
    }

    /// Read the node at `offset`, which must be a leaf.
    pub fn read_leaf(&mut self, offset: NodeOffset) -> Result<LeafNode> {
        match self.read_node(offset)? {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(_) => Err(Error::corrupt(offset.as_u64(), "expected a leaf node")),
        }
    }

    /// Read the node at `offset`, which must be internal.
    pub fn read_internal(&mut self, offset: NodeOffset) -> Result<InternalNode> {
        match self.read_node(offset)? {
            Node::Internal(node) => Ok(node),
            Node::Leaf(_) => Err(Error::corrupt(offset.as_u64(), "expected an internal node")),
        }
    }

    /// Overwrite the node at `offset`. Never changes the file length.
    pub fn write_node(&mut self, offset: NodeOffset, node: &Node) -> Result<()> {
        let buf = self.layout.encode(node)?;
        self.write_at(offset, &buf)
    }

    pub fn write_leaf(&mut self, offset: NodeOffset, leaf: &LeafNode) -> Result<()> {
        let buf = self.layout.encode_leaf(leaf)?;
        self.write_at(offset, &buf)
    }

    pub fn write_internal(&mut self, offset: NodeOffset, node: &InternalNode) -> Result<()> {
        let buf = self.layout.encode_internal(node)?;
        self.write_at(offset, &buf)
    }

    /// Append a node at end of file and return its offset.
    ///
    /// Bumps the node counter for its kind and persists the header. The
    /// first parentless node appended to an empty tree becomes the root.
    pub fn append_node(&mut self, node: &Node) -> Result<NodeOffset> {
        let buf = self.layout.encode(node)?;
        let offset = NodeOffset::new(self.file_len as i64);

        self.file.seek(SeekFrom::Start(self.file_len))?;
        self.file.write_all(&buf)?;
        self.file_len += buf.len() as u64;
        TreeStats::bump(&self.stats.nodes_appended);

        match node.kind() {
            NodeKind::Leaf => self.header.n_leaf += 1,
            NodeKind::Internal => self.header.n_internal += 1,
        }
        if !self.header.root.is_valid() && !node.parent().is_valid() {
            self.header.root = offset;
            debug!(%offset, "appended node became root");
        }
        self.write_header()?;

        Ok(offset)
    }

    /// Flush all writes to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn write_at(&mut self, offset: NodeOffset, buf: &[u8]) -> Result<()> {
        let start = self.check_offset(offset)?;
        if start + buf.len() as u64 > self.file_len {
            return Err(Error::invariant(format!(
                "write of {} bytes at {} would extend the node file",
                buf.len(),
                offset
            )));
        }
        self.file.seek(SeekFrom::Start(start))?;
        self.file.write_all(buf)?;
        TreeStats::bump(&self.stats.nodes_written);
        Ok(())
    }

    fn check_offset(&self, offset: NodeOffset) -> Result<u64> {
        let start = offset.as_u64();
        if !offset.is_valid() || start < TreeHeader::SIZE as u64 || start >= self.file_len {
            return Err(Error::corrupt(
                start,
                format!("{} is outside the node area", offset),
            ));
        }
        Ok(start)
    }
}

/// Read until `buf` is full or EOF; returns the bytes read.
fn read_fully(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    file.seek(SeekFrom::Start(0))?;
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
