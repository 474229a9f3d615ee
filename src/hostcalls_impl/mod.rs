//! The semantics of each hostcall, over typed values.
//!
//! Every function takes the raw ABI arguments, decodes them, and reports
//! failure as an `Errno`; out-parameters are written through `GuestPtr`s
//! only once the call has succeeded.

mod fs;
mod misc;

pub(crate) use self::fs::*;
pub(crate) use self::misc::*;

use crate::ctx::WasiCtx;
use crate::memory::{GuestMemory, GuestPtr};
use crate::vfs::NodeId;
use crate::wasi::{Fd, Fstflags, Size, Timestamp};
use crate::{Errno, Result};

/// Reads a guest string of `len` bytes at `ptr`.
fn read_path(memory: &dyn GuestMemory, ptr: u32, len: Size) -> Result<String> {
    let bytes = GuestPtr::<u8>::new(ptr).read_bytes(memory, len)?;
    Ok(std::str::from_utf8(&bytes)?.to_owned())
}

/// The node of `fd`, which must be a directory for path-relative calls.
fn dir_node(ctx: &WasiCtx, fd: Fd) -> Result<NodeId> {
    let node = ctx.table.get(fd)?.node;
    if !ctx.vfs.node(node).is_dir() {
        return Err(Errno::Inval);
    }
    Ok(node)
}

/// Converts a host clock reading in milliseconds to nanoseconds. Whole
/// milliseconds convert exactly; negative and NaN readings become 0.
fn ms_to_ns(ms: f64) -> Timestamp {
    if ms.is_nan() || ms <= 0.0 {
        return 0;
    }
    let whole = ms.trunc();
    let fraction_ns = ((ms - whole) * 1_000_000.0).round() as Timestamp;
    (whole as Timestamp)
        .saturating_mul(1_000_000)
        .saturating_add(fraction_ns)
}

/// Decodes the `fst_flags` of the `*_set_times` calls into the access and
/// modification times to store. Bit 0 stores `atim`, bit 1 stores `mtim`.
fn new_times(
    atim: Timestamp,
    mtim: Timestamp,
    fst_flags: u32,
) -> (Option<Timestamp>, Option<Timestamp>) {
    let flags = Fstflags::from_bits_truncate(fst_flags as u16);
    (
        flags.contains(Fstflags::ATIM).then_some(atim),
        flags.contains(Fstflags::MTIM).then_some(mtim),
    )
}
