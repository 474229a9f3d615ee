//! The in-memory filesystem tree.
//!
//! All nodes live in one arena owned by [`Vfs`]; directories refer to their
//! children by [`NodeId`] and handles refer to nodes the same way, so there
//! is never a reference into the tree that can dangle. Nodes are never
//! removed from the arena.

use crate::wasi::{Filesize, Filestat, Filetype, Timestamp};
use crate::{Errno, Result};
use cranelift_entity::{PrimaryMap, entity_impl};
use tracing::trace;

/// An opaque reference to a node of the tree.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(u32);
entity_impl!(NodeId);

/// What a node holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Children in creation order.
    Directory(Vec<NodeId>),
    File(Vec<u8>),
}

/// What `resolve_or_create` makes when the last segment is missing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LeafKind {
    Directory,
    File,
}

#[derive(Clone, Debug)]
pub struct Node {
    name: String,
    kind: NodeKind,
    atim: Timestamp,
    mtim: Timestamp,
    ctim: Timestamp,
}

impl Node {
    fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            atim: 0,
            mtim: 0,
            ctim: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn filetype(&self) -> Filetype {
        match self.kind {
            NodeKind::Directory(_) => Filetype::Directory,
            NodeKind::File(_) => Filetype::RegularFile,
        }
    }

    pub fn size(&self) -> Filesize {
        match &self.kind {
            NodeKind::Directory(_) => 0,
            NodeKind::File(data) => data.len() as Filesize,
        }
    }

    fn data(&self) -> Result<&Vec<u8>> {
        match &self.kind {
            NodeKind::File(data) => Ok(data),
            NodeKind::Directory(_) => Err(Errno::Isdir),
        }
    }

    fn data_mut(&mut self) -> Result<&mut Vec<u8>> {
        match &mut self.kind {
            NodeKind::File(data) => Ok(data),
            NodeKind::Directory(_) => Err(Errno::Isdir),
        }
    }
}

/// The largest size a file may grow to. Growing past it fails with `fbig`.
pub const MAX_FILE_SIZE: Filesize = 1 << 32;

/// Makes room in `data` for `new_len` bytes without touching its contents.
/// Lengths over [`MAX_FILE_SIZE`] or that the allocator refuses are `fbig`.
fn reserve_to(data: &mut Vec<u8>, new_len: Filesize) -> Result<usize> {
    if new_len > MAX_FILE_SIZE {
        return Err(Errno::Fbig);
    }
    let new_len = usize::try_from(new_len).map_err(|_| Errno::Fbig)?;
    data.try_reserve(new_len.saturating_sub(data.len()))
        .map_err(|_| Errno::Fbig)?;
    Ok(new_len)
}

/// A rooted tree of directories and files.
#[derive(Clone, Debug)]
pub struct Vfs {
    nodes: PrimaryMap<NodeId, Node>,
    root: NodeId,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    pub fn new() -> Self {
        let mut nodes = PrimaryMap::new();
        let root = nodes.push(Node::new("", NodeKind::Directory(Vec::new())));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Finds the child of `dir` called `name`.
    ///
    /// Returns `None` when there is no such child, including when `dir` is
    /// a file.
    pub fn lookup(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        match &self.nodes[dir].kind {
            NodeKind::Directory(children) => children
                .iter()
                .copied()
                .find(|child| self.nodes[*child].name == name),
            NodeKind::File(_) => None,
        }
    }

    /// Looks `name` up in `dir`, creating an empty directory there when it
    /// is missing and `create` is set.
    pub fn lookup_or_create(
        &mut self,
        dir: NodeId,
        name: &str,
        create: bool,
    ) -> Result<Option<NodeId>> {
        if let Some(child) = self.lookup(dir, name) {
            return Ok(Some(child));
        }
        if !create {
            return Ok(None);
        }
        self.create_child(dir, name, LeafKind::Directory).map(Some)
    }

    /// Appends a new, empty child to `dir` without checking for duplicates.
    fn create_child(&mut self, dir: NodeId, name: &str, leaf: LeafKind) -> Result<NodeId> {
        if !self.nodes[dir].is_dir() {
            return Err(Errno::Notdir);
        }
        let kind = match leaf {
            LeafKind::Directory => NodeKind::Directory(Vec::new()),
            LeafKind::File => NodeKind::File(Vec::new()),
        };
        let child = self.nodes.push(Node::new(name, kind));
        if let NodeKind::Directory(children) = &mut self.nodes[dir].kind {
            children.push(child);
        }
        trace!("vfs: created {:?} {:?} in {:?}", leaf, name, dir);
        Ok(child)
    }

    /// Creates the directory `name` directly under `dir`.
    ///
    /// `name` is a single component: it may not contain `/` or NUL.
    pub fn create_dir(&mut self, dir: NodeId, name: &str) -> Result<NodeId> {
        if name.is_empty() {
            return Err(Errno::Noent);
        }
        if name.contains(['/', '\0']) {
            return Err(Errno::Inval);
        }
        if name == "." || name == ".." || self.lookup(dir, name).is_some() {
            return Err(Errno::Exist);
        }
        self.create_child(dir, name, LeafKind::Directory)
    }

    /// Resolves `path` relative to `dir`.
    pub fn resolve(&self, dir: NodeId, path: &str) -> Result<NodeId> {
        let mut node = dir;
        for segment in segments(path)? {
            if !self.nodes[node].is_dir() {
                return Err(Errno::Notdir);
            }
            node = self.lookup(node, segment).ok_or(Errno::Noent)?;
        }
        Ok(node)
    }

    /// Resolves `path` relative to `dir`, creating missing intermediate
    /// directories and a missing final segment of kind `leaf`.
    ///
    /// Returns the node and whether the final segment was created.
    pub fn resolve_or_create(
        &mut self,
        dir: NodeId,
        path: &str,
        leaf: LeafKind,
    ) -> Result<(NodeId, bool)> {
        let segments = segments(path)?;
        let mut node = dir;
        for (i, segment) in segments.iter().enumerate() {
            if !self.nodes[node].is_dir() {
                return Err(Errno::Notdir);
            }
            let last = i + 1 == segments.len();
            node = match self.lookup(node, segment) {
                Some(child) => child,
                None if last => return Ok((self.create_child(node, segment, leaf)?, true)),
                None => self.create_child(node, segment, LeafKind::Directory)?,
            };
        }
        Ok((node, false))
    }

    /// Turns `node` into an empty file, dropping any children it had.
    pub fn make_file(&mut self, node: NodeId) {
        self.nodes[node].kind = NodeKind::File(Vec::new());
    }

    /// The bytes of a file.
    pub fn contents(&self, node: NodeId) -> Result<&[u8]> {
        self.nodes[node].data().map(Vec::as_slice)
    }

    pub fn contents_mut(&mut self, node: NodeId) -> Result<&mut [u8]> {
        self.nodes[node].data_mut().map(Vec::as_mut_slice)
    }

    /// Resizes a file, zero-filling on growth.
    pub fn set_size(&mut self, node: NodeId, size: Filesize) -> Result<()> {
        let data = self.nodes[node].data_mut()?;
        let size = reserve_to(data, size)?;
        data.resize(size, 0);
        Ok(())
    }

    /// Inserts `len` zero bytes at `offset`, shifting the rest of the file.
    pub fn allocate(&mut self, node: NodeId, offset: Filesize, len: Filesize) -> Result<()> {
        let data = self.nodes[node].data_mut()?;
        let offset = match usize::try_from(offset) {
            Ok(offset) if offset <= data.len() => offset,
            _ => return Err(Errno::Inval),
        };
        let new_len = (data.len() as Filesize)
            .checked_add(len)
            .ok_or(Errno::Fbig)?;
        let new_len = reserve_to(data, new_len)?;
        let added = new_len - data.len();
        data.splice(offset..offset, std::iter::repeat_n(0, added));
        Ok(())
    }

    /// Copies file bytes starting at `offset` into `buf`, returning how many
    /// were available.
    pub fn read_at(&self, node: NodeId, offset: Filesize, buf: &mut [u8]) -> Result<usize> {
        let data = self.nodes[node].data()?;
        let start = match usize::try_from(offset) {
            Ok(start) if start < data.len() => start,
            _ => return Ok(0),
        };
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    /// Overwrites file bytes starting at `offset`, growing the file when the
    /// write runs past its end.
    pub fn write_at(&mut self, node: NodeId, offset: Filesize, buf: &[u8]) -> Result<usize> {
        let data = self.nodes[node].data_mut()?;
        let end = offset
            .checked_add(buf.len() as Filesize)
            .ok_or(Errno::Fbig)?;
        if end > data.len() as Filesize {
            let end = reserve_to(data, end)?;
            data.resize(end, 0);
        }
        let start = offset as usize;
        data[start..start + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }

    pub fn filestat(&self, id: NodeId) -> Filestat {
        let node = &self.nodes[id];
        Filestat {
            dev: 0,
            ino: id.as_u32().into(),
            filetype: node.filetype(),
            nlink: 1,
            size: node.size(),
            atim: node.atim,
            mtim: node.mtim,
            ctim: node.ctim,
        }
    }

    /// Updates the timestamps that are given, leaving the others untouched.
    pub fn set_times(&mut self, id: NodeId, atim: Option<Timestamp>, mtim: Option<Timestamp>) {
        let node = &mut self.nodes[id];
        if let Some(atim) = atim {
            node.atim = atim;
        }
        if let Some(mtim) = mtim {
            node.mtim = mtim;
        }
    }
}

/// Splits a guest path into the components that name a node.
fn segments(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Err(Errno::Noent);
    }
    if path.contains('\0') {
        return Err(Errno::Inval);
    }
    let mut out = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(Errno::Notcapable),
            segment => out.push(segment),
        }
    }
    Ok(out)
}
