//! Contains mechanism for managing the WASI file descriptor
//! pool. It's intended to be mainly used within the `HandleTable`
//! object.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// This container tracks and manages all file descriptors that
/// were already allocated.
///
/// Released descriptors are handed out again lowest first.
#[derive(Debug)]
pub(crate) struct FdPool {
    next_alloc: Option<u32>,
    available: BinaryHeap<Reverse<u32>>,
}

impl FdPool {
    /// Creates a pool whose first fresh descriptor is `first`.
    pub fn new(first: u32) -> Self {
        Self {
            next_alloc: Some(first),
            available: BinaryHeap::new(),
        }
    }

    /// Obtain another valid WASI file descriptor.
    ///
    /// If we've handed out the maximum possible amount of file
    /// descriptors, then this method will return `None` to signal that
    /// case. Otherwise, a new file descriptor is return as `Some(fd)`.
    pub fn allocate(&mut self) -> Option<u32> {
        if let Some(Reverse(fd)) = self.available.pop() {
            return Some(fd);
        }
        let fd = self.next_alloc.take()?;
        self.next_alloc = fd.checked_add(1);
        Some(fd)
    }

    /// Return a file descriptor back to the pool.
    ///
    /// If the caller tries to return a file descriptor that was
    /// not yet allocated, this method will panic.
    pub fn deallocate(&mut self, fd: u32) {
        if let Some(next_alloc) = self.next_alloc {
            assert!(fd < next_alloc);
        }
        debug_assert!(!self.available.iter().any(|Reverse(free)| *free == fd));
        self.available.push(Reverse(fd));
    }
}
