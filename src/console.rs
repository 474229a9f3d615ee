//! Line buffering for the console descriptors.
//!
//! Bytes written to fd 1 and fd 2 never reach the filesystem. They collect
//! in one buffer per stream, and every `\n` hands the line before it to the
//! host. A partial line waits for the next write.

use crate::host::Host;
use crate::wasi::Fd;
use tracing::trace;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    /// The console stream written through `fd`, if any.
    pub fn from_fd(fd: Fd) -> Option<Self> {
        match fd {
            1 => Some(Self::Stdout),
            2 => Some(Self::Stderr),
            _ => None,
        }
    }
}

/// Bytes of the current, unfinished line.
#[derive(Clone, Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Appends `bytes`, calling `emit` once per completed line.
    pub fn push(&mut self, bytes: &[u8], mut emit: impl FnMut(&[u8])) {
        for &byte in bytes {
            if byte == b'\n' {
                emit(&self.pending);
                self.pending.clear();
            } else {
                self.pending.push(byte);
            }
        }
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

#[derive(Clone, Debug, Default)]
pub struct Console {
    stdout: LineBuffer,
    stderr: LineBuffer,
}

impl Console {
    /// Buffers `bytes` written to `stream`, forwarding complete lines to
    /// `host`. Returns the number of bytes taken, which is always all of
    /// them.
    pub fn write(&mut self, stream: Stream, bytes: &[u8], host: &mut dyn Host) -> usize {
        trace!("console: {:?} <- {} bytes", stream, bytes.len());
        match stream {
            Stream::Stdout => self.stdout.push(bytes, |line| host.stdout_line(line)),
            Stream::Stderr => self.stderr.push(bytes, |line| host.stderr_line(line)),
        }
        bytes.len()
    }

    /// The unfinished line of `stream`.
    pub fn pending(&self, stream: Stream) -> &[u8] {
        match stream {
            Stream::Stdout => self.stdout.pending(),
            Stream::Stderr => self.stderr.pending(),
        }
    }
}
