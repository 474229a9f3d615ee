//! WASI preview1 hostcalls backed by an in-memory filesystem.
//!
//! A [`WasiCtx`] owns a virtual directory tree, the guest's descriptor
//! table and the console line buffers. The functions in [`hostcalls`]
//! implement the `wasi_snapshot_preview1` imports on top of it, reaching
//! guest memory only through the copy primitives of [`GuestMemory`].
//!
//! ```ignore
//! let mut ctx = WasiCtxBuilder::new()
//!     .arg("guest")
//!     .preload_file("/data/input.txt", "hello\n")
//!     .build()?;
//! let errno = hostcalls::fd_write(&mut ctx, &mut memory, 1, iovs, 1, nwritten);
//! ```

#![deny(unsafe_code)]

mod console;
mod ctx;
mod error;
mod fdpool;
mod host;
mod hostcalls_impl;
mod iovec;
mod memory;
mod string_array;
mod table;
mod vfs;

pub mod hostcalls;
pub mod wasi;

pub use console::{Console, LineBuffer, Stream};
pub use ctx::{WasiCtx, WasiCtxBuilder};
pub use error::{Errno, I32Exit, Result};
pub use host::{
    CLOCK_MONOTONIC, CLOCK_PROCESS_CPUTIME_ID, CLOCK_REALTIME, CLOCK_THREAD_CPUTIME_ID, Host,
    StdHost,
};
pub use memory::{GuestError, GuestMemory, GuestPtr, GuestType, VecMemory};
pub use string_array::{StringArray, StringArrayError};
pub use table::{Entry, FIRST_FREE_FD, Handle, HandleTable, ROOT_FD};
pub use vfs::{LeafKind, MAX_FILE_SIZE, Node, NodeId, NodeKind, Vfs};
