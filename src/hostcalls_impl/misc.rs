use super::ms_to_ns;
use crate::ctx::WasiCtx;
use crate::error::I32Exit;
use crate::memory::{GuestMemory, GuestPtr};
use crate::wasi::{Clockid, Exitcode, Fd, Size, Timestamp};
use crate::{Errno, Result};
use tracing::trace;

pub(crate) fn args_get(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    argv_ptr: u32,
    argv_buf: u32,
) -> Result<()> {
    trace!("args_get(argv_ptr={:#x?}, argv_buf={:#x?})", argv_ptr, argv_buf);

    ctx.args
        .write_to_guest(memory, GuestPtr::new(argv_buf), GuestPtr::new(argv_ptr))
}

pub(crate) fn args_sizes_get(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    argc_ptr: u32,
    argv_buf_size_ptr: u32,
) -> Result<()> {
    trace!(
        "args_sizes_get(argc_ptr={:#x?}, argv_buf_size_ptr={:#x?})",
        argc_ptr,
        argv_buf_size_ptr,
    );

    let argc = ctx.args.number_elements();
    let argv_size = ctx.args.cumulative_size();

    trace!("     | *argc_ptr={:?}", argc);

    GuestPtr::<Size>::new(argc_ptr).write(memory, argc)?;

    trace!("     | *argv_buf_size_ptr={:?}", argv_size);

    GuestPtr::<Size>::new(argv_buf_size_ptr).write(memory, argv_size)?;
    Ok(())
}

pub(crate) fn environ_get(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    environ_ptr: u32,
    environ_buf: u32,
) -> Result<()> {
    trace!(
        "environ_get(environ_ptr={:#x?}, environ_buf={:#x?})",
        environ_ptr,
        environ_buf,
    );

    ctx.env
        .write_to_guest(memory, GuestPtr::new(environ_buf), GuestPtr::new(environ_ptr))
}

pub(crate) fn environ_sizes_get(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    environ_count_ptr: u32,
    environ_size_ptr: u32,
) -> Result<()> {
    trace!(
        "environ_sizes_get(environ_count_ptr={:#x?}, environ_size_ptr={:#x?})",
        environ_count_ptr,
        environ_size_ptr,
    );

    let environ_count = ctx.env.number_elements();
    let environ_size = ctx.env.cumulative_size();

    trace!("     | *environ_count_ptr={:?}", environ_count);

    GuestPtr::<Size>::new(environ_count_ptr).write(memory, environ_count)?;

    trace!("     | *environ_size_ptr={:?}", environ_size);

    GuestPtr::<Size>::new(environ_size_ptr).write(memory, environ_size)?;
    Ok(())
}

pub(crate) fn clock_res_get(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    clock_id: Clockid,
    resolution_ptr: u32,
) -> Result<()> {
    trace!(
        "clock_res_get(clock_id={:?}, resolution_ptr={:#x?})",
        clock_id,
        resolution_ptr,
    );

    let resolution = supported_resolution(ctx, clock_id)?;

    trace!("     | *resolution_ptr={:?}", resolution);

    GuestPtr::<Timestamp>::new(resolution_ptr).write(memory, resolution)?;
    Ok(())
}

pub(crate) fn clock_time_get(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    clock_id: Clockid,
    precision: Timestamp,
    time_ptr: u32,
) -> Result<()> {
    trace!(
        "clock_time_get(clock_id={:?}, precision={:?}, time_ptr={:#x?})",
        clock_id,
        precision,
        time_ptr,
    );

    supported_resolution(ctx, clock_id)?;
    let time = ms_to_ns(ctx.host.clock_ms(clock_id));

    trace!("     | *time_ptr={:?}", time);

    GuestPtr::<Timestamp>::new(time_ptr).write(memory, time)?;
    Ok(())
}

/// A clock with a zero resolution does not exist on this host.
fn supported_resolution(ctx: &mut WasiCtx, clock_id: Clockid) -> Result<Timestamp> {
    match ctx.host.clock_res_ns(clock_id) {
        0 => Err(Errno::Notcapable),
        resolution => Ok(resolution),
    }
}

pub(crate) fn random_get(
    ctx: &mut WasiCtx,
    memory: &mut dyn GuestMemory,
    buf_ptr: u32,
    buf_len: Size,
) -> Result<()> {
    trace!("random_get(buf_ptr={:#x?}, buf_len={:?})", buf_ptr, buf_len);

    let buf = GuestPtr::<u8>::new(buf_ptr);
    let mut offset = 0;
    while offset < buf_len {
        let chunk = ctx.host.random_u64().to_le_bytes();
        let n = (buf_len - offset).min(chunk.len() as Size);
        buf.byte_add(offset)?
            .write_bytes(memory, &chunk[..n as usize])?;
        offset += n;
    }
    Ok(())
}

pub(crate) fn sched_yield(_ctx: &mut WasiCtx, _memory: &mut dyn GuestMemory) -> Result<()> {
    trace!("sched_yield()");

    Ok(())
}

pub(crate) fn proc_exit(ctx: &mut WasiCtx, rval: Exitcode) -> ! {
    trace!("proc_exit(rval={:?})", rval);

    ctx.host.proc_exit(I32Exit(rval))
}

pub(crate) fn proc_raise(_ctx: &mut WasiCtx, _memory: &mut dyn GuestMemory, sig: u32) -> Result<()> {
    trace!("proc_raise(sig={:?}) unsupported", sig);

    Err(Errno::Notcapable)
}

pub(crate) fn poll_oneoff(
    _ctx: &mut WasiCtx,
    _memory: &mut dyn GuestMemory,
    in_: u32,
    out: u32,
    nsubscriptions: Size,
    nevents: u32,
) -> Result<()> {
    trace!(
        "poll_oneoff(in={:#x?}, out={:#x?}, nsubscriptions={}, nevents={:#x?}) unsupported",
        in_,
        out,
        nsubscriptions,
        nevents,
    );

    Err(Errno::Notcapable)
}

pub(crate) fn sock_accept(
    _ctx: &mut WasiCtx,
    _memory: &mut dyn GuestMemory,
    fd: Fd,
    flags: u32,
    fd_out_ptr: u32,
) -> Result<()> {
    trace!(
        "sock_accept(fd={:?}, flags={:#x?}, fd_out_ptr={:#x?}) unsupported",
        fd,
        flags,
        fd_out_ptr
    );

    Err(Errno::Notcapable)
}

pub(crate) fn sock_recv(
    _ctx: &mut WasiCtx,
    _memory: &mut dyn GuestMemory,
    fd: Fd,
    ri_data: u32,
    ri_data_len: Size,
    ri_flags: u32,
    ro_datalen: u32,
    ro_flags: u32,
) -> Result<()> {
    trace!(
        "sock_recv(fd={:?}, ri_data={:#x?}, ri_data_len={}, ri_flags={:#x?}, ro_datalen={:#x?}, ro_flags={:#x?}) unsupported",
        fd,
        ri_data,
        ri_data_len,
        ri_flags,
        ro_datalen,
        ro_flags
    );

    Err(Errno::Notcapable)
}

pub(crate) fn sock_send(
    _ctx: &mut WasiCtx,
    _memory: &mut dyn GuestMemory,
    fd: Fd,
    si_data: u32,
    si_data_len: Size,
    si_flags: u32,
    so_datalen: u32,
) -> Result<()> {
    trace!(
        "sock_send(fd={:?}, si_data={:#x?}, si_data_len={}, si_flags={:#x?}, so_datalen={:#x?}) unsupported",
        fd,
        si_data,
        si_data_len,
        si_flags,
        so_datalen
    );

    Err(Errno::Notcapable)
}

pub(crate) fn sock_shutdown(
    _ctx: &mut WasiCtx,
    _memory: &mut dyn GuestMemory,
    fd: Fd,
    how: u32,
) -> Result<()> {
    trace!("sock_shutdown(fd={:?}, how={:?}) unsupported", fd, how);

    Err(Errno::Notcapable)
}
