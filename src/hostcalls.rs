//! The `wasi_snapshot_preview1` ABI.
//!
//! One entry point per import. Each takes the context, the guest memory
//! and the raw integer arguments the guest passed, and returns the raw
//! `errno`; `0` is success. Out-parameters are guest addresses.

#![allow(non_camel_case_types)]

use crate::ctx::WasiCtx;
use crate::hostcalls_impl;
use crate::memory::GuestMemory;
use crate::wasi::{Clockid, Exitcode, Fd, Filedelta, Filesize, Size, Timestamp};
use crate::{Errno, Result};
use tracing::debug;

fn into_errno(name: &str, result: Result<()>) -> u16 {
    match result {
        Ok(()) => Errno::Success.raw(),
        Err(e) => {
            debug!("{} failed: {}", name, e);
            e.raw()
        }
    }
}

macro_rules! hostcalls {
    ($($(#[$attr:meta])* pub fn $name:ident($($arg:ident: $ty:ty),* $(,)?);)*) => ($(
        $(#[$attr])*
        pub fn $name(
            ctx: &mut WasiCtx,
            memory: &mut dyn GuestMemory,
            $($arg: $ty),*
        ) -> u16 {
            into_errno(
                stringify!($name),
                hostcalls_impl::$name(ctx, memory, $($arg),*),
            )
        }
    )*)
}

hostcalls! {
    pub fn args_get(argv_ptr: u32, argv_buf: u32);
    pub fn args_sizes_get(argc_ptr: u32, argv_buf_size_ptr: u32);
    pub fn environ_get(environ_ptr: u32, environ_buf: u32);
    pub fn environ_sizes_get(environ_count_ptr: u32, environ_size_ptr: u32);

    /// Clocks whose host resolution is zero report `notcapable`.
    pub fn clock_res_get(clock_id: Clockid, resolution_ptr: u32);
    pub fn clock_time_get(clock_id: Clockid, precision: Timestamp, time_ptr: u32);

    pub fn fd_advise(fd: Fd, offset: Filesize, len: Filesize, advice: u32);
    /// Inserts `len` zero bytes at `offset`, moving the rest of the file
    /// back.
    pub fn fd_allocate(fd: Fd, offset: Filesize, len: Filesize);
    pub fn fd_close(fd: Fd);
    pub fn fd_datasync(fd: Fd);
    pub fn fd_fdstat_get(fd: Fd, fdstat_ptr: u32);
    pub fn fd_fdstat_set_flags(fd: Fd, fdflags: u32);
    pub fn fd_fdstat_set_rights(fd: Fd, fs_rights_base: u64, fs_rights_inheriting: u64);
    pub fn fd_filestat_get(fd: Fd, filestat_ptr: u32);
    pub fn fd_filestat_set_size(fd: Fd, st_size: Filesize);
    pub fn fd_filestat_set_times(fd: Fd, st_atim: Timestamp, st_mtim: Timestamp, fst_flags: u32);
    pub fn fd_pread(fd: Fd, iovs_ptr: u32, iovs_len: Size, offset: Filesize, nread: u32);
    pub fn fd_prestat_get(fd: Fd, prestat_ptr: u32);
    pub fn fd_prestat_dir_name(fd: Fd, path_ptr: u32, path_len: Size);
    pub fn fd_pwrite(fd: Fd, iovs_ptr: u32, iovs_len: Size, offset: Filesize, nwritten: u32);
    pub fn fd_read(fd: Fd, iovs_ptr: u32, iovs_len: Size, nread: u32);
    pub fn fd_readdir(fd: Fd, buf_ptr: u32, buf_len: Size, cookie: u64, bufused_ptr: u32);
    pub fn fd_renumber(from: Fd, to: Fd);
    /// The new offset is clamped to the file's bounds.
    pub fn fd_seek(fd: Fd, offset: Filedelta, whence: u32, newoffset: u32);
    pub fn fd_sync(fd: Fd);
    pub fn fd_tell(fd: Fd, newoffset: u32);
    /// Descriptors 1 and 2 go to the host line by line.
    pub fn fd_write(fd: Fd, iovs_ptr: u32, iovs_len: Size, nwritten: u32);

    pub fn path_create_directory(dirfd: Fd, path_ptr: u32, path_len: Size);
    pub fn path_filestat_get(
        dirfd: Fd,
        dirflags: u32,
        path_ptr: u32,
        path_len: Size,
        filestat_ptr: u32,
    );
    pub fn path_filestat_set_times(
        dirfd: Fd,
        dirflags: u32,
        path_ptr: u32,
        path_len: Size,
        st_atim: Timestamp,
        st_mtim: Timestamp,
        fst_flags: u32,
    );
    pub fn path_link(
        old_dirfd: Fd,
        old_flags: u32,
        old_path_ptr: u32,
        old_path_len: Size,
        new_dirfd: Fd,
        new_path_ptr: u32,
        new_path_len: Size,
    );
    pub fn path_open(
        dirfd: Fd,
        dirflags: u32,
        path_ptr: u32,
        path_len: Size,
        oflags: u32,
        fs_rights_base: u64,
        fs_rights_inheriting: u64,
        fs_flags: u32,
        fd_out_ptr: u32,
    );
    pub fn path_readlink(
        dirfd: Fd,
        path_ptr: u32,
        path_len: Size,
        buf_ptr: u32,
        buf_len: Size,
        bufused_ptr: u32,
    );
    pub fn path_remove_directory(dirfd: Fd, path_ptr: u32, path_len: Size);
    pub fn path_rename(
        old_dirfd: Fd,
        old_path_ptr: u32,
        old_path_len: Size,
        new_dirfd: Fd,
        new_path_ptr: u32,
        new_path_len: Size,
    );
    pub fn path_symlink(
        old_path_ptr: u32,
        old_path_len: Size,
        dirfd: Fd,
        new_path_ptr: u32,
        new_path_len: Size,
    );
    pub fn path_unlink_file(dirfd: Fd, path_ptr: u32, path_len: Size);

    pub fn poll_oneoff(in_: u32, out: u32, nsubscriptions: Size, nevents: u32);
    pub fn proc_raise(sig: u32);
    pub fn sched_yield();
    /// Fills the buffer eight bytes at a time from the host; the last chunk
    /// is cut to fit.
    pub fn random_get(buf_ptr: u32, buf_len: Size);

    pub fn sock_accept(fd: Fd, flags: u32, fd_out_ptr: u32);
    pub fn sock_recv(
        fd: Fd,
        ri_data: u32,
        ri_data_len: Size,
        ri_flags: u32,
        ro_datalen: u32,
        ro_flags: u32,
    );
    pub fn sock_send(fd: Fd, si_data: u32, si_data_len: Size, si_flags: u32, so_datalen: u32);
    pub fn sock_shutdown(fd: Fd, how: u32);
}

/// Hands `rval` to the host's `proc_exit`. Never returns.
pub fn proc_exit(ctx: &mut WasiCtx, rval: Exitcode) -> ! {
    hostcalls_impl::proc_exit(ctx, rval)
}
