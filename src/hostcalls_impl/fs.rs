use super::{dir_node, new_times, read_path};
use crate::console::Stream;
use crate::ctx::WasiCtx;
use crate::iovec;
use crate::memory::{GuestMemory, GuestPtr};
use crate::table::{Handle, ROOT_FD};
use crate::vfs::LeafKind;
use crate::wasi::{
    Fd, Fdflags, Fdstat, Filedelta, Filesize, Filestat, Iovec, Oflags, Prestat, Rights, Size,
    Timestamp, Whence,
};
use crate::{Errno, Result};
use tracing::trace;

/// The name reported for the preopened root, NUL included.
const ROOT_NAME: &[u8] = b"/\0";

pub(crate) fn fd_close(ctx: &mut WasiCtx, _memory: &mut dyn GuestMemory, fd: Fd) -> Result<()> {
    trace!("fd_close(fd={:?})", fd);

    ctx.table.close(fd)
}

pub(crate) fn fd_fdstat_get(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    fd: Fd,
    fdstat_ptr: u32,
) -> Result<()> {
    trace!("fd_fdstat_get(fd={:?}, fdstat_ptr={:#x?})", fd, fdstat_ptr);

    let handle = ctx.table.get(fd)?;
    let fdstat = Fdstat {
        fs_filetype: ctx.vfs.node(handle.node).filetype(),
        fs_flags: handle.flags,
        fs_rights_base: handle.rights_base,
        fs_rights_inheriting: handle.rights_inheriting,
    };

    trace!("     | *buf={:?}", fdstat);

    GuestPtr::<Fdstat>::new(fdstat_ptr).write(memory, fdstat)?;
    Ok(())
}

pub(crate) fn fd_fdstat_set_flags(
    ctx: &mut WasiCtx,
    _memory: &mut dyn GuestMemory,
    fd: Fd,
    fdflags: u32,
) -> Result<()> {
    trace!("fd_fdstat_set_flags(fd={:?}, fdflags={:#x?})", fd, fdflags);

    let fdflags = decode_fdflags(fdflags)?;
    ctx.table.get_mut(fd)?.flags = fdflags;
    Ok(())
}

pub(crate) fn fd_fdstat_set_rights(
    ctx: &mut WasiCtx,
    _memory: &mut dyn GuestMemory,
    fd: Fd,
    fs_rights_base: u64,
    fs_rights_inheriting: u64,
) -> Result<()> {
    trace!(
        "fd_fdstat_set_rights(fd={:?}, fs_rights_base={:#x?}, fs_rights_inheriting={:#x?})",
        fd,
        fs_rights_base,
        fs_rights_inheriting
    );

    let handle = ctx.table.get_mut(fd)?;
    handle.rights_base = Rights::from_bits_retain(fs_rights_base);
    handle.rights_inheriting = Rights::from_bits_retain(fs_rights_inheriting);
    Ok(())
}

pub(crate) fn fd_filestat_get(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    fd: Fd,
    filestat_ptr: u32,
) -> Result<()> {
    trace!("fd_filestat_get(fd={:?}, filestat_ptr={:#x?})", fd, filestat_ptr);

    let node = ctx.table.get(fd)?.node;
    let filestat = ctx.vfs.filestat(node);

    trace!("     | *filestat_ptr={:?}", filestat);

    GuestPtr::<Filestat>::new(filestat_ptr).write(memory, filestat)?;
    Ok(())
}

pub(crate) fn fd_filestat_set_size(
    ctx: &mut WasiCtx,
    _memory: &mut dyn GuestMemory,
    fd: Fd,
    st_size: Filesize,
) -> Result<()> {
    trace!("fd_filestat_set_size(fd={:?}, st_size={})", fd, st_size);

    let handle = ctx.table.get_mut(fd)?;
    ctx.vfs.set_size(handle.node, st_size)?;
    handle.cursor = handle.cursor.min(st_size);
    Ok(())
}

pub(crate) fn fd_filestat_set_times(
    ctx: &mut WasiCtx,
    _memory: &mut dyn GuestMemory,
    fd: Fd,
    st_atim: Timestamp,
    st_mtim: Timestamp,
    fst_flags: u32,
) -> Result<()> {
    trace!(
        "fd_filestat_set_times(fd={:?}, st_atim={}, st_mtim={}, fst_flags={:#x?})",
        fd,
        st_atim,
        st_mtim,
        fst_flags
    );

    let node = ctx.table.get(fd)?.node;
    let (atim, mtim) = new_times(st_atim, st_mtim, fst_flags);
    ctx.vfs.set_times(node, atim, mtim);
    Ok(())
}

pub(crate) fn fd_allocate(
    ctx: &mut WasiCtx,
    _memory: &mut dyn GuestMemory,
    fd: Fd,
    offset: Filesize,
    len: Filesize,
) -> Result<()> {
    trace!("fd_allocate(fd={:?}, offset={}, len={})", fd, offset, len);

    let node = ctx.table.get(fd)?.node;
    ctx.vfs.allocate(node, offset, len)
}

pub(crate) fn fd_read(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    fd: Fd,
    iovs_ptr: u32,
    iovs_len: Size,
    nread: u32,
) -> Result<()> {
    trace!(
        "fd_read(fd={:?}, iovs_ptr={:#x?}, iovs_len={:?}, nread={:#x?})",
        fd,
        iovs_ptr,
        iovs_len,
        nread
    );

    let handle = file_handle(ctx, fd)?;
    let (node, mut cursor) = (handle.node, handle.cursor);
    let vfs = &ctx.vfs;
    let filled = iovec::fill(memory, GuestPtr::new(iovs_ptr), iovs_len, |buf| {
        let n = vfs.read_at(node, cursor, buf)?;
        cursor += n as Filesize;
        Ok(n)
    });
    // Bytes already delivered stay consumed even if a later iovec faults.
    ctx.table.get_mut(fd)?.cursor = cursor;
    let host_nread = filled?;

    trace!("     | *nread={:?}", host_nread);

    GuestPtr::<Size>::new(nread).write(memory, host_nread)?;
    Ok(())
}

pub(crate) fn fd_pread(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    fd: Fd,
    iovs_ptr: u32,
    iovs_len: Size,
    offset: Filesize,
    nread: u32,
) -> Result<()> {
    trace!(
        "fd_pread(fd={:?}, iovs_ptr={:#x?}, iovs_len={:?}, offset={}, nread={:#x?})",
        fd,
        iovs_ptr,
        iovs_len,
        offset,
        nread
    );

    let node = file_handle(ctx, fd)?.node;
    let vfs = &ctx.vfs;
    let mut pos = offset;
    let host_nread = iovec::fill(memory, GuestPtr::new(iovs_ptr), iovs_len, |buf| {
        let n = vfs.read_at(node, pos, buf)?;
        pos += n as Filesize;
        Ok(n)
    })?;

    trace!("     | *nread={:?}", host_nread);

    GuestPtr::<Size>::new(nread).write(memory, host_nread)?;
    Ok(())
}

pub(crate) fn fd_write(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    fd: Fd,
    iovs_ptr: u32,
    iovs_len: Size,
    nwritten: u32,
) -> Result<()> {
    trace!(
        "fd_write(fd={:?}, iovs_ptr={:#x?}, iovs_len={:?}, nwritten={:#x?})",
        fd,
        iovs_ptr,
        iovs_len,
        nwritten
    );

    let iovs = GuestPtr::<Iovec>::new(iovs_ptr);
    let host_nwritten = match Stream::from_fd(fd) {
        Some(stream) => {
            let WasiCtx { console, host, .. } = ctx;
            iovec::drain(&*memory, iovs, iovs_len, |buf| {
                Ok(console.write(stream, buf, host.as_mut()))
            })?
        }
        None => {
            let handle = file_handle(ctx, fd)?;
            let node = handle.node;
            let mut cursor = if handle.flags.contains(Fdflags::APPEND) {
                ctx.vfs.node(node).size()
            } else {
                handle.cursor
            };
            let vfs = &mut ctx.vfs;
            let drained = iovec::drain(&*memory, iovs, iovs_len, |buf| {
                let n = vfs.write_at(node, cursor, buf)?;
                cursor += n as Filesize;
                Ok(n)
            });
            ctx.table.get_mut(fd)?.cursor = cursor;
            drained?
        }
    };

    trace!("     | *nwritten={:?}", host_nwritten);

    GuestPtr::<Size>::new(nwritten).write(memory, host_nwritten)?;
    Ok(())
}

pub(crate) fn fd_pwrite(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    fd: Fd,
    iovs_ptr: u32,
    iovs_len: Size,
    offset: Filesize,
    nwritten: u32,
) -> Result<()> {
    trace!(
        "fd_pwrite(fd={:?}, iovs_ptr={:#x?}, iovs_len={:?}, offset={}, nwritten={:#x?})",
        fd,
        iovs_ptr,
        iovs_len,
        offset,
        nwritten
    );

    let node = file_handle(ctx, fd)?.node;
    let vfs = &mut ctx.vfs;
    let mut pos = offset;
    let host_nwritten = iovec::drain(&*memory, GuestPtr::new(iovs_ptr), iovs_len, |buf| {
        let n = vfs.write_at(node, pos, buf)?;
        pos += n as Filesize;
        Ok(n)
    })?;

    trace!("     | *nwritten={:?}", host_nwritten);

    GuestPtr::<Size>::new(nwritten).write(memory, host_nwritten)?;
    Ok(())
}

pub(crate) fn fd_seek(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    fd: Fd,
    offset: Filedelta,
    whence: u32,
    newoffset: u32,
) -> Result<()> {
    trace!(
        "fd_seek(fd={:?}, offset={:?}, whence={:?}, newoffset={:#x?})",
        fd,
        offset,
        whence,
        newoffset
    );

    let whence = u8::try_from(whence)
        .map_err(|_| Errno::Inval)
        .and_then(|w| Ok(Whence::try_from(w)?))?;
    let node = file_handle(ctx, fd)?.node;
    let size = ctx.vfs.node(node).size();
    let handle = ctx.table.get_mut(fd)?;
    let base = match whence {
        Whence::Set => 0,
        Whence::Cur => handle.cursor,
        Whence::End => size,
    };
    let target = i128::from(base) + i128::from(offset);
    let host_newoffset = target.clamp(0, i128::from(size)) as Filesize;
    handle.cursor = host_newoffset;

    trace!("     | *newoffset={:?}", host_newoffset);

    GuestPtr::<Filesize>::new(newoffset).write(memory, host_newoffset)?;
    Ok(())
}

pub(crate) fn fd_tell(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    fd: Fd,
    newoffset: u32,
) -> Result<()> {
    trace!("fd_tell(fd={:?}, newoffset={:#x?})", fd, newoffset);

    let host_offset = ctx.table.get(fd)?.cursor;

    trace!("     | *newoffset={:?}", host_offset);

    GuestPtr::<Filesize>::new(newoffset).write(memory, host_offset)?;
    Ok(())
}

pub(crate) fn fd_prestat_get(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    fd: Fd,
    prestat_ptr: u32,
) -> Result<()> {
    trace!("fd_prestat_get(fd={:?}, prestat_ptr={:#x?})", fd, prestat_ptr);

    preopen(ctx, fd)?;
    let prestat = Prestat::Dir {
        pr_name_len: (ROOT_NAME.len() - 1) as Size,
    };

    trace!("     | *prestat_ptr={:?}", prestat);

    GuestPtr::<Prestat>::new(prestat_ptr).write(memory, prestat)?;
    Ok(())
}

pub(crate) fn fd_prestat_dir_name(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    fd: Fd,
    path_ptr: u32,
    path_len: Size,
) -> Result<()> {
    trace!(
        "fd_prestat_dir_name(fd={:?}, path_ptr={:#x?}, path_len={})",
        fd,
        path_ptr,
        path_len
    );

    preopen(ctx, fd)?;
    let len = ROOT_NAME.len().min(path_len as usize);

    trace!("     | (path_ptr,path_len)={:?}", &ROOT_NAME[..len]);

    GuestPtr::<u8>::new(path_ptr).write_bytes(memory, &ROOT_NAME[..len])?;
    Ok(())
}

pub(crate) fn path_create_directory(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    dirfd: Fd,
    path_ptr: u32,
    path_len: Size,
) -> Result<()> {
    trace!(
        "path_create_directory(dirfd={:?}, path_ptr={:#x?}, path_len={})",
        dirfd,
        path_ptr,
        path_len,
    );

    let dir = dir_node(ctx, dirfd)?;
    let path = read_path(memory, path_ptr, path_len)?;

    trace!("     | (path_ptr,path_len)='{}'", path);

    ctx.vfs.create_dir(dir, &path)?;
    Ok(())
}

pub(crate) fn path_filestat_get(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    dirfd: Fd,
    dirflags: u32,
    path_ptr: u32,
    path_len: Size,
    filestat_ptr: u32,
) -> Result<()> {
    trace!(
        "path_filestat_get(dirfd={:?}, dirflags={:?}, path_ptr={:#x?}, path_len={}, filestat_ptr={:#x?})",
        dirfd,
        dirflags,
        path_ptr,
        path_len,
        filestat_ptr
    );

    let dir = dir_node(ctx, dirfd)?;
    let path = read_path(memory, path_ptr, path_len)?;

    trace!("     | (path_ptr,path_len)='{}'", path);

    let node = ctx.vfs.resolve(dir, &path)?;
    let filestat = ctx.vfs.filestat(node);

    trace!("     | *filestat_ptr={:?}", filestat);

    GuestPtr::<Filestat>::new(filestat_ptr).write(memory, filestat)?;
    Ok(())
}

pub(crate) fn path_filestat_set_times(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    dirfd: Fd,
    dirflags: u32,
    path_ptr: u32,
    path_len: Size,
    st_atim: Timestamp,
    st_mtim: Timestamp,
    fst_flags: u32,
) -> Result<()> {
    trace!(
        "path_filestat_set_times(dirfd={:?}, dirflags={:?}, path_ptr={:#x?}, path_len={}, st_atim={}, st_mtim={}, fst_flags={:#x?})",
        dirfd,
        dirflags,
        path_ptr,
        path_len,
        st_atim,
        st_mtim,
        fst_flags
    );

    let dir = dir_node(ctx, dirfd)?;
    let path = read_path(memory, path_ptr, path_len)?;

    trace!("     | (path_ptr,path_len)='{}'", path);

    let node = ctx.vfs.resolve(dir, &path)?;
    let (atim, mtim) = new_times(st_atim, st_mtim, fst_flags);
    ctx.vfs.set_times(node, atim, mtim);
    Ok(())
}

pub(crate) fn path_open(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    dirfd: Fd,
    dirflags: u32,
    path_ptr: u32,
    path_len: Size,
    oflags: u32,
    fs_rights_base: u64,
    fs_rights_inheriting: u64,
    fs_flags: u32,
    fd_out_ptr: u32,
) -> Result<()> {
    trace!(
        "path_open(dirfd={:?}, dirflags={:?}, path_ptr={:#x?}, path_len={:?}, oflags={:#x?}, fs_rights_base={:#x?}, fs_rights_inheriting={:#x?}, fs_flags={:#x?}, fd_out_ptr={:#x?})",
        dirfd,
        dirflags,
        path_ptr,
        path_len,
        oflags,
        fs_rights_base,
        fs_rights_inheriting,
        fs_flags,
        fd_out_ptr
    );

    let oflags = u16::try_from(oflags)
        .ok()
        .and_then(Oflags::from_bits)
        .ok_or(Errno::Inval)?;
    let fs_flags = decode_fdflags(fs_flags)?;
    let dir = dir_node(ctx, dirfd)?;
    let path = read_path(memory, path_ptr, path_len)?;

    trace!("     | (path_ptr,path_len)='{}'", path);

    if oflags.contains(Oflags::EXCL) && ctx.vfs.resolve(dir, &path).is_ok() {
        return Err(Errno::Exist);
    }
    let node = if oflags.contains(Oflags::CREAT) {
        let leaf = if oflags.contains(Oflags::DIRECTORY) {
            LeafKind::Directory
        } else {
            LeafKind::File
        };
        ctx.vfs.resolve_or_create(dir, &path, leaf)?.0
    } else {
        ctx.vfs.resolve(dir, &path)?
    };
    let is_dir = ctx.vfs.node(node).is_dir();
    if oflags.contains(Oflags::DIRECTORY) && !is_dir {
        return Err(Errno::Notdir);
    }
    if oflags.contains(Oflags::TRUNC) {
        if is_dir {
            return Err(Errno::Isdir);
        }
        ctx.vfs.set_size(node, 0)?;
    }

    let mut handle = Handle::new(
        node,
        Rights::from_bits_retain(fs_rights_base),
        Rights::from_bits_retain(fs_rights_inheriting),
    );
    handle.flags = fs_flags;
    if fs_flags.contains(Fdflags::APPEND) {
        handle.cursor = ctx.vfs.node(node).size();
    }
    let fd = ctx.table.obtain(handle)?;

    trace!("     | *fd={:?}", fd);

    if let Err(e) = GuestPtr::<Fd>::new(fd_out_ptr).write(memory, fd) {
        ctx.table.close(fd)?;
        return Err(e.into());
    }
    Ok(())
}

macro_rules! unsupported {
    ($($name:ident($($arg:ident: $ty:ty),* $(,)?);)*) => ($(
        pub(crate) fn $name(
            _ctx: &mut WasiCtx,
            _memory: &mut dyn GuestMemory,
            $($arg: $ty),*
        ) -> Result<()> {
            trace!("{}{:?} unsupported", stringify!($name), ($($arg,)*));
            Err(Errno::Notcapable)
        }
    )*)
}

unsupported! {
    fd_advise(fd: Fd, offset: Filesize, len: Filesize, advice: u32);
    fd_datasync(fd: Fd);
    fd_sync(fd: Fd);
    fd_readdir(fd: Fd, buf_ptr: u32, buf_len: Size, cookie: u64, bufused_ptr: u32);
    fd_renumber(from: Fd, to: Fd);
    path_link(
        old_dirfd: Fd,
        old_flags: u32,
        old_path_ptr: u32,
        old_path_len: Size,
        new_dirfd: Fd,
        new_path_ptr: u32,
        new_path_len: Size,
    );
    path_readlink(
        dirfd: Fd,
        path_ptr: u32,
        path_len: Size,
        buf_ptr: u32,
        buf_len: Size,
        bufused_ptr: u32,
    );
    path_remove_directory(dirfd: Fd, path_ptr: u32, path_len: Size);
    path_rename(
        old_dirfd: Fd,
        old_path_ptr: u32,
        old_path_len: Size,
        new_dirfd: Fd,
        new_path_ptr: u32,
        new_path_len: Size,
    );
    path_symlink(
        old_path_ptr: u32,
        old_path_len: Size,
        dirfd: Fd,
        new_path_ptr: u32,
        new_path_len: Size,
    );
    path_unlink_file(dirfd: Fd, path_ptr: u32, path_len: Size);
}

/// The handle of `fd`, which must not be a directory.
fn file_handle(ctx: &WasiCtx, fd: Fd) -> Result<&Handle> {
    let handle = ctx.table.get(fd)?;
    if ctx.vfs.node(handle.node).is_dir() {
        return Err(Errno::Isdir);
    }
    Ok(handle)
}

/// Only the root preopen has a prestat.
fn preopen(ctx: &WasiCtx, fd: Fd) -> Result<()> {
    if fd != ROOT_FD || ctx.table.get(fd).is_err() {
        return Err(Errno::Badf);
    }
    Ok(())
}

fn decode_fdflags(fdflags: u32) -> Result<Fdflags> {
    u16::try_from(fdflags)
        .ok()
        .and_then(Fdflags::from_bits)
        .ok_or(Errno::Inval)
}
