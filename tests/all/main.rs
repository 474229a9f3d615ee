mod console;
mod loader;
mod misc;
mod props;

use std::sync::{Arc, Mutex};
use wasi_memfs::wasi::{Clockid, Fd, Filedelta, Filestat, Iovec, Size};
use wasi_memfs::{
    CLOCK_MONOTONIC, CLOCK_REALTIME, Errno, GuestPtr, Host, I32Exit, VecMemory, WasiCtx,
    WasiCtxBuilder, hostcalls,
};

/// Lines the guest printed, in order.
#[derive(Debug, Default)]
pub struct Lines {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

/// A host with fixed clocks and a counting random source that records
/// console output. `proc_exit` panics with the `I32Exit` as payload.
#[derive(Clone, Default)]
pub struct TestHost {
    pub lines: Arc<Mutex<Lines>>,
    random: u64,
}

pub const REALTIME_MS: f64 = 1_700_000_000_123.0;
pub const MONOTONIC_MS: f64 = 42.0;

impl Host for TestHost {
    fn stdout_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line).into_owned();
        self.lines.lock().unwrap().stdout.push(line);
    }

    fn stderr_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line).into_owned();
        self.lines.lock().unwrap().stderr.push(line);
    }

    fn random_u64(&mut self) -> u64 {
        self.random += 1;
        u64::from_le_bytes([self.random as u8; 8])
    }

    fn clock_ms(&mut self, id: Clockid) -> f64 {
        match id {
            CLOCK_REALTIME => REALTIME_MS,
            CLOCK_MONOTONIC => MONOTONIC_MS,
            _ => 0.0,
        }
    }

    fn clock_res_ns(&mut self, id: Clockid) -> u64 {
        match id {
            CLOCK_REALTIME => 1_000,
            CLOCK_MONOTONIC => 1,
            _ => 0,
        }
    }

    fn proc_exit(&mut self, status: I32Exit) -> ! {
        std::panic::panic_any(status)
    }
}

/// Where `Guest::alloc` starts handing out memory.
const HEAP_BASE: u32 = 1024;

/// A context plus guest memory, with helpers that marshal arguments the
/// way a guest would before calling the raw hostcalls.
pub struct Guest {
    pub ctx: WasiCtx,
    pub mem: VecMemory,
    pub lines: Arc<Mutex<Lines>>,
    next: u32,
}

pub fn errno(raw: u16) -> Result<(), Errno> {
    match Errno::try_from(raw).expect("known errno") {
        Errno::Success => Ok(()),
        e => Err(e),
    }
}

impl Guest {
    pub fn new() -> Self {
        Self::with(WasiCtxBuilder::new())
    }

    pub fn with(builder: WasiCtxBuilder) -> Self {
        let host = TestHost::default();
        let lines = host.lines.clone();
        let ctx = builder.host(host).build().expect("building context");
        Self {
            ctx,
            mem: VecMemory::new(64 * 1024),
            lines,
            next: HEAP_BASE,
        }
    }

    /// Reserves `len` bytes of zeroed guest memory, 8-byte aligned.
    pub fn alloc(&mut self, len: u32) -> u32 {
        let at = self.next;
        self.next = (at + len + 7) & !7;
        assert!(self.next as usize <= self.mem.as_slice().len(), "guest heap exhausted");
        at
    }

    /// Copies `bytes` into fresh guest memory.
    pub fn put(&mut self, bytes: &[u8]) -> (u32, u32) {
        let at = self.alloc(bytes.len() as u32);
        self.mem.as_mut_slice()[at as usize..][..bytes.len()].copy_from_slice(bytes);
        (at, bytes.len() as u32)
    }

    pub fn bytes(&self, at: u32, len: u32) -> &[u8] {
        &self.mem.as_slice()[at as usize..][..len as usize]
    }

    pub fn u32_at(&self, at: u32) -> u32 {
        GuestPtr::<u32>::new(at).read(&self.mem).unwrap()
    }

    pub fn u64_at(&self, at: u32) -> u64 {
        GuestPtr::<u64>::new(at).read(&self.mem).unwrap()
    }

    /// Builds an iovec array describing `bufs`.
    pub fn iovecs(&mut self, bufs: &[(u32, u32)]) -> (u32, u32) {
        let at = self.alloc(8 * bufs.len() as u32);
        for (i, (buf, len)) in bufs.iter().enumerate() {
            let iov = Iovec {
                buf: GuestPtr::new(*buf),
                buf_len: *len,
            };
            GuestPtr::<Iovec>::new(at)
                .add(i as u32)
                .unwrap()
                .write(&mut self.mem, iov)
                .unwrap();
        }
        (at, bufs.len() as u32)
    }

    pub fn open_at(
        &mut self,
        dirfd: Fd,
        path: &str,
        oflags: u16,
        fdflags: u16,
    ) -> Result<Fd, Errno> {
        let (path_ptr, path_len) = self.put(path.as_bytes());
        let fd_out = self.alloc(4);
        errno(hostcalls::path_open(
            &mut self.ctx,
            &mut self.mem,
            dirfd,
            0,
            path_ptr,
            path_len,
            oflags.into(),
            u64::MAX,
            u64::MAX,
            fdflags.into(),
            fd_out,
        ))?;
        Ok(self.u32_at(fd_out))
    }

    pub fn open(&mut self, path: &str, oflags: u16, fdflags: u16) -> Result<Fd, Errno> {
        self.open_at(3, path, oflags, fdflags)
    }

    pub fn mkdir_at(&mut self, dirfd: Fd, path: &str) -> Result<(), Errno> {
        let (path_ptr, path_len) = self.put(path.as_bytes());
        errno(hostcalls::path_create_directory(
            &mut self.ctx,
            &mut self.mem,
            dirfd,
            path_ptr,
            path_len,
        ))
    }

    pub fn mkdir(&mut self, path: &str) -> Result<(), Errno> {
        self.mkdir_at(3, path)
    }

    pub fn write(&mut self, fd: Fd, data: &[u8]) -> Result<Size, Errno> {
        let buf = self.put(data);
        let (iovs, iovs_len) = self.iovecs(&[buf]);
        let nwritten = self.alloc(4);
        errno(hostcalls::fd_write(
            &mut self.ctx,
            &mut self.mem,
            fd,
            iovs,
            iovs_len,
            nwritten,
        ))?;
        Ok(self.u32_at(nwritten))
    }

    pub fn read(&mut self, fd: Fd, len: u32) -> Result<Vec<u8>, Errno> {
        let buf = self.alloc(len);
        let (iovs, iovs_len) = self.iovecs(&[(buf, len)]);
        let nread = self.alloc(4);
        errno(hostcalls::fd_read(
            &mut self.ctx,
            &mut self.mem,
            fd,
            iovs,
            iovs_len,
            nread,
        ))?;
        let n = self.u32_at(nread);
        Ok(self.bytes(buf, n).to_vec())
    }

    pub fn seek(&mut self, fd: Fd, offset: Filedelta, whence: u32) -> Result<u64, Errno> {
        let newoffset = self.alloc(8);
        errno(hostcalls::fd_seek(
            &mut self.ctx,
            &mut self.mem,
            fd,
            offset,
            whence,
            newoffset,
        ))?;
        Ok(self.u64_at(newoffset))
    }

    pub fn tell(&mut self, fd: Fd) -> Result<u64, Errno> {
        let offset = self.alloc(8);
        errno(hostcalls::fd_tell(&mut self.ctx, &mut self.mem, fd, offset))?;
        Ok(self.u64_at(offset))
    }

    pub fn close(&mut self, fd: Fd) -> Result<(), Errno> {
        errno(hostcalls::fd_close(&mut self.ctx, &mut self.mem, fd))
    }

    pub fn filestat(&mut self, fd: Fd) -> Result<Filestat, Errno> {
        let buf = self.alloc(64);
        errno(hostcalls::fd_filestat_get(
            &mut self.ctx,
            &mut self.mem,
            fd,
            buf,
        ))?;
        Ok(GuestPtr::<Filestat>::new(buf).read(&self.mem).unwrap())
    }

    pub fn stdout(&self) -> Vec<String> {
        self.lines.lock().unwrap().stdout.clone()
    }

    pub fn stderr(&self) -> Vec<String> {
        self.lines.lock().unwrap().stderr.clone()
    }
}

pub mod oflags {
    pub const CREAT: u16 = 1;
    pub const DIRECTORY: u16 = 2;
    pub const EXCL: u16 = 4;
    pub const TRUNC: u16 = 8;
}

pub const APPEND: u16 = 1;

pub const SEEK_SET: u32 = 0;
pub const SEEK_CUR: u32 = 1;
pub const SEEK_END: u32 = 2;
