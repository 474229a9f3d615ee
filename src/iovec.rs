//! Moving data between scattered guest buffers and the host.
//!
//! Each `iovec` is bounds-checked against guest memory before any data
//! moves, then staged through one reused local buffer of at most
//! [`STAGING_CHUNK`] bytes: reads fill it and copy it out to the guest,
//! writes copy it in from the guest and hand it on. Buffers are processed
//! in order and zero-length entries are skipped without touching guest
//! memory.

use crate::memory::{GuestMemory, GuestPtr};
use crate::wasi::{Iovec, Size};
use crate::{Errno, Result};

/// The most bytes staged between the guest and the host at once.
pub const STAGING_CHUNK: u32 = 64 * 1024;

fn iovec_at(mem: &dyn GuestMemory, iovs: GuestPtr<Iovec>, index: u32) -> Result<Iovec> {
    Ok(iovs.add(index)?.read(mem)?)
}

fn add_to_total(total: Size, n: usize) -> Result<Size> {
    total
        .checked_add(Size::try_from(n)?)
        .ok_or(Errno::Overflow)
}

/// Fills the guest buffers described by `iovs_len` entries at `iovs`.
///
/// `filler` is handed staging buffers covering each iovec in turn and
/// returns how many bytes it produced; only those are copied back, and a
/// short fill moves on to the next iovec. Returns the total number of bytes
/// copied.
pub fn fill<F>(
    mem: &mut dyn GuestMemory,
    iovs: GuestPtr<Iovec>,
    iovs_len: u32,
    mut filler: F,
) -> Result<Size>
where
    F: FnMut(&mut [u8]) -> Result<usize>,
{
    let mut staging = Vec::new();
    let mut total: Size = 0;
    for i in 0..iovs_len {
        let iov = iovec_at(mem, iovs, i)?;
        iov.buf.check_len(mem, iov.buf_len)?;
        let mut done = 0;
        while done < iov.buf_len {
            let chunk = (iov.buf_len - done).min(STAGING_CHUNK);
            staging.resize(chunk as usize, 0);
            let n = filler(&mut staging)?.min(staging.len());
            iov.buf.byte_add(done)?.write_bytes(mem, &staging[..n])?;
            total = add_to_total(total, n)?;
            if n < staging.len() {
                break;
            }
            done += chunk;
        }
    }
    Ok(total)
}

/// Reads the guest buffers described by `iovs_len` entries at `iovs` and
/// hands them to `consumer` in order, which returns how many bytes it took.
/// Returns the total number of bytes taken.
pub fn drain<F>(
    mem: &dyn GuestMemory,
    iovs: GuestPtr<Iovec>,
    iovs_len: u32,
    mut consumer: F,
) -> Result<Size>
where
    F: FnMut(&[u8]) -> Result<usize>,
{
    let mut staging = Vec::new();
    let mut total: Size = 0;
    for i in 0..iovs_len {
        let iov = iovec_at(mem, iovs, i)?;
        iov.buf.check_len(mem, iov.buf_len)?;
        let mut done = 0;
        while done < iov.buf_len {
            let chunk = (iov.buf_len - done).min(STAGING_CHUNK);
            staging.resize(chunk as usize, 0);
            mem.copy_from_guest(iov.buf.offset() + done, &mut staging)?;
            let n = consumer(&staging)?;
            total = add_to_total(total, n)?;
            if n < staging.len() {
                break;
            }
            done += chunk;
        }
    }
    Ok(total)
}
