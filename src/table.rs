use crate::fdpool::FdPool;
use crate::vfs::NodeId;
use crate::wasi::{Fd, Fdflags, Filesize, Rights};
use crate::{Errno, Result};

/// The first descriptor handed out by `path_open`. Slots below it are the
/// console triad and the preopened root.
pub const FIRST_FREE_FD: Fd = 4;

/// The descriptor of the preopened root directory.
pub const ROOT_FD: Fd = 3;

/// Per-descriptor state of an open node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handle {
    pub node: NodeId,
    pub flags: Fdflags,
    pub rights_base: Rights,
    pub rights_inheriting: Rights,
    /// Byte offset used by `fd_read`, `fd_write` and `fd_seek`.
    pub cursor: Filesize,
}

impl Handle {
    pub fn new(node: NodeId, rights_base: Rights, rights_inheriting: Rights) -> Self {
        Self {
            node,
            flags: Fdflags::empty(),
            rights_base,
            rights_inheriting,
            cursor: 0,
        }
    }
}

/// One slot of the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    /// Any use of this descriptor fails with the carried code.
    Error(Errno),
    Live(Handle),
}

/// Maps descriptors to handles.
///
/// Slots 0, 1 and 2 are the console streams, which never reach the
/// filesystem, and slot 3 is the preopened root. Closed slots from 4 upward
/// are reused lowest first.
#[derive(Debug)]
pub struct HandleTable {
    entries: Vec<Entry>,
    pool: FdPool,
}

impl HandleTable {
    pub fn new(root: NodeId) -> Self {
        let entries = vec![
            Entry::Error(Errno::Notcapable),
            Entry::Error(Errno::Notcapable),
            Entry::Error(Errno::Notcapable),
            Entry::Live(Handle::new(root, Rights::all(), Rights::all())),
        ];
        Self {
            entries,
            pool: FdPool::new(FIRST_FREE_FD),
        }
    }

    /// Installs `handle` in the lowest free slot and returns its descriptor.
    pub fn obtain(&mut self, handle: Handle) -> Result<Fd> {
        let fd = self.pool.allocate().ok_or(Errno::Nfile)?;
        let index = usize::try_from(fd)?;
        if index == self.entries.len() {
            self.entries.push(Entry::Live(handle));
        } else {
            self.entries[index] = Entry::Live(handle);
        }
        Ok(fd)
    }

    /// Validates `fd`: descriptors past the end of the table are `Badf`,
    /// error slots report their stored code.
    pub fn get(&self, fd: Fd) -> Result<&Handle> {
        match self.entries.get(fd as usize) {
            Some(Entry::Live(handle)) => Ok(handle),
            Some(Entry::Error(errno)) => Err(*errno),
            None => Err(Errno::Badf),
        }
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut Handle> {
        match self.entries.get_mut(fd as usize) {
            Some(Entry::Live(handle)) => Ok(handle),
            Some(Entry::Error(errno)) => Err(*errno),
            None => Err(Errno::Badf),
        }
    }

    /// Replaces the slot with a `Badf` error slot.
    pub fn close(&mut self, fd: Fd) -> Result<()> {
        let entry = self.entries.get_mut(fd as usize).ok_or(Errno::Badf)?;
        if let Entry::Error(errno) = entry {
            return Err(*errno);
        }
        *entry = Entry::Error(Errno::Badf);
        if fd >= FIRST_FREE_FD {
            self.pool.deallocate(fd);
        }
        Ok(())
    }

    /// The current number of slots, live or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
