//! Types and constants of the `wasi_snapshot_preview1` interface, together
//! with their wasm32 layout in guest memory.
//!
//! Struct layouts are written out field by field with explicit offsets so
//! that the bytes the guest sees match the preview1 ABI regardless of how
//! the host lays out the Rust types.

#![allow(non_camel_case_types)]

use crate::memory::{GuestError, GuestPtr, GuestType};
use bitflags::bitflags;

pub type Fd = u32;
pub type Size = u32;
pub type Filesize = u64;
pub type Filedelta = i64;
pub type Timestamp = u64;
pub type Device = u64;
pub type Inode = u64;
pub type Linkcount = u64;
pub type Userdata = u64;
pub type Clockid = u32;
pub type Exitcode = u32;

/// The type of a node as reported in `filestat` and `fdstat`.
///
/// The filesystem only has regular files and directories, numbered 3 and 4.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Filetype {
    Unknown = 0,
    RegularFile = 3,
    Directory = 4,
}

impl TryFrom<u8> for Filetype {
    type Error = GuestError;

    fn try_from(value: u8) -> Result<Self, GuestError> {
        match value {
            0 => Ok(Self::Unknown),
            3 => Ok(Self::RegularFile),
            4 => Ok(Self::Directory),
            value => Err(GuestError::InvalidEnumValue {
                name: "filetype",
                value: value.into(),
            }),
        }
    }
}

/// The position relative to which to set the offset of the file descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

impl TryFrom<u8> for Whence {
    type Error = GuestError;

    fn try_from(value: u8) -> Result<Self, GuestError> {
        match value {
            0 => Ok(Self::Set),
            1 => Ok(Self::Cur),
            2 => Ok(Self::End),
            value => Err(GuestError::InvalidEnumValue {
                name: "whence",
                value: value.into(),
            }),
        }
    }
}

bitflags! {
    /// File descriptor flags.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Fdflags: u16 {
        const APPEND = 1 << 0;
        const DSYNC = 1 << 1;
        const NONBLOCK = 1 << 2;
        const RSYNC = 1 << 3;
        const SYNC = 1 << 4;
    }

    /// Open flags used by `path_open`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Oflags: u16 {
        const CREAT = 1 << 0;
        const DIRECTORY = 1 << 1;
        const EXCL = 1 << 2;
        const TRUNC = 1 << 3;
    }

    /// Which file time attributes the `*_set_times` calls store. Other bits
    /// are ignored.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Fstflags: u16 {
        const ATIM = 1 << 0;
        const MTIM = 1 << 1;
    }

    /// File descriptor rights, determining which actions may be performed.
    ///
    /// Rights are recorded per descriptor but never checked.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Rights: u64 {
        const FD_DATASYNC = 1 << 0;
        const FD_READ = 1 << 1;
        const FD_SEEK = 1 << 2;
        const FD_FDSTAT_SET_FLAGS = 1 << 3;
        const FD_SYNC = 1 << 4;
        const FD_TELL = 1 << 5;
        const FD_WRITE = 1 << 6;
        const FD_ADVISE = 1 << 7;
        const FD_ALLOCATE = 1 << 8;
        const PATH_CREATE_DIRECTORY = 1 << 9;
        const PATH_CREATE_FILE = 1 << 10;
        const PATH_LINK_SOURCE = 1 << 11;
        const PATH_LINK_TARGET = 1 << 12;
        const PATH_OPEN = 1 << 13;
        const FD_READDIR = 1 << 14;
        const PATH_READLINK = 1 << 15;
        const PATH_RENAME_SOURCE = 1 << 16;
        const PATH_RENAME_TARGET = 1 << 17;
        const PATH_FILESTAT_GET = 1 << 18;
        const PATH_FILESTAT_SET_SIZE = 1 << 19;
        const PATH_FILESTAT_SET_TIMES = 1 << 20;
        const FD_FILESTAT_GET = 1 << 21;
        const FD_FILESTAT_SET_SIZE = 1 << 22;
        const FD_FILESTAT_SET_TIMES = 1 << 23;
        const PATH_SYMLINK = 1 << 24;
        const PATH_REMOVE_DIRECTORY = 1 << 25;
        const PATH_UNLINK_FILE = 1 << 26;
        const POLL_FD_READWRITE = 1 << 27;
        const SOCK_SHUTDOWN = 1 << 28;
        const SOCK_ACCEPT = 1 << 29;
    }
}

/// A region of guest memory used for scatter/gather I/O.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Iovec {
    pub buf: GuestPtr<u8>,
    pub buf_len: Size,
}

impl GuestType for Iovec {
    fn guest_size() -> u32 {
        8
    }

    fn decode(bytes: &[u8]) -> Result<Self, GuestError> {
        Ok(Self {
            buf: GuestPtr::decode(&bytes[0..4])?,
            buf_len: u32::decode(&bytes[4..8])?,
        })
    }

    fn encode(&self, bytes: &mut [u8]) {
        self.buf.encode(&mut bytes[0..4]);
        self.buf_len.encode(&mut bytes[4..8]);
    }
}

/// File descriptor attributes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fdstat {
    pub fs_filetype: Filetype,
    pub fs_flags: Fdflags,
    pub fs_rights_base: Rights,
    pub fs_rights_inheriting: Rights,
}

impl GuestType for Fdstat {
    fn guest_size() -> u32 {
        24
    }

    fn decode(bytes: &[u8]) -> Result<Self, GuestError> {
        Ok(Self {
            fs_filetype: Filetype::try_from(bytes[0])?,
            fs_flags: Fdflags::from_bits_retain(u16::decode(&bytes[2..4])?),
            fs_rights_base: Rights::from_bits_retain(u64::decode(&bytes[8..16])?),
            fs_rights_inheriting: Rights::from_bits_retain(u64::decode(&bytes[16..24])?),
        })
    }

    fn encode(&self, bytes: &mut [u8]) {
        bytes[..24].fill(0);
        bytes[0] = self.fs_filetype as u8;
        self.fs_flags.bits().encode(&mut bytes[2..4]);
        self.fs_rights_base.bits().encode(&mut bytes[8..16]);
        self.fs_rights_inheriting.bits().encode(&mut bytes[16..24]);
    }
}

/// File attributes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Filestat {
    pub dev: Device,
    pub ino: Inode,
    pub filetype: Filetype,
    pub nlink: Linkcount,
    pub size: Filesize,
    pub atim: Timestamp,
    pub mtim: Timestamp,
    pub ctim: Timestamp,
}

impl GuestType for Filestat {
    fn guest_size() -> u32 {
        64
    }

    fn decode(bytes: &[u8]) -> Result<Self, GuestError> {
        Ok(Self {
            dev: u64::decode(&bytes[0..8])?,
            ino: u64::decode(&bytes[8..16])?,
            filetype: Filetype::try_from(bytes[16])?,
            nlink: u64::decode(&bytes[24..32])?,
            size: u64::decode(&bytes[32..40])?,
            atim: u64::decode(&bytes[40..48])?,
            mtim: u64::decode(&bytes[48..56])?,
            ctim: u64::decode(&bytes[56..64])?,
        })
    }

    fn encode(&self, bytes: &mut [u8]) {
        bytes[..64].fill(0);
        self.dev.encode(&mut bytes[0..8]);
        self.ino.encode(&mut bytes[8..16]);
        bytes[16] = self.filetype as u8;
        self.nlink.encode(&mut bytes[24..32]);
        self.size.encode(&mut bytes[32..40]);
        self.atim.encode(&mut bytes[40..48]);
        self.mtim.encode(&mut bytes[48..56]);
        self.ctim.encode(&mut bytes[56..64]);
    }
}

/// Information about a pre-opened capability. Only directories exist.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Prestat {
    Dir { pr_name_len: Size },
}

impl GuestType for Prestat {
    fn guest_size() -> u32 {
        8
    }

    fn decode(bytes: &[u8]) -> Result<Self, GuestError> {
        match bytes[0] {
            0 => Ok(Self::Dir {
                pr_name_len: u32::decode(&bytes[4..8])?,
            }),
            tag => Err(GuestError::InvalidEnumValue {
                name: "preopentype",
                value: tag.into(),
            }),
        }
    }

    fn encode(&self, bytes: &mut [u8]) {
        bytes[..8].fill(0);
        match self {
            Self::Dir { pr_name_len } => {
                bytes[0] = 0;
                pr_name_len.encode(&mut bytes[4..8]);
            }
        }
    }
}

/// The contents of a `subscription` when its type is `clock`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionClock {
    pub id: Clockid,
    pub timeout: Timestamp,
    pub precision: Timestamp,
    pub flags: u16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionU {
    Clock(SubscriptionClock),
    FdRead(Fd),
    FdWrite(Fd),
}

/// Subscription to an event, as passed to `poll_oneoff`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub userdata: Userdata,
    pub u: SubscriptionU,
}

impl GuestType for Subscription {
    fn guest_size() -> u32 {
        48
    }

    fn decode(bytes: &[u8]) -> Result<Self, GuestError> {
        let u = match bytes[8] {
            0 => SubscriptionU::Clock(SubscriptionClock {
                id: u32::decode(&bytes[16..20])?,
                timeout: u64::decode(&bytes[24..32])?,
                precision: u64::decode(&bytes[32..40])?,
                flags: u16::decode(&bytes[40..42])?,
            }),
            1 => SubscriptionU::FdRead(u32::decode(&bytes[16..20])?),
            2 => SubscriptionU::FdWrite(u32::decode(&bytes[16..20])?),
            tag => {
                return Err(GuestError::InvalidEnumValue {
                    name: "eventtype",
                    value: tag.into(),
                });
            }
        };
        Ok(Self {
            userdata: u64::decode(&bytes[0..8])?,
            u,
        })
    }

    fn encode(&self, bytes: &mut [u8]) {
        bytes[..48].fill(0);
        self.userdata.encode(&mut bytes[0..8]);
        match self.u {
            SubscriptionU::Clock(clock) => {
                bytes[8] = 0;
                clock.id.encode(&mut bytes[16..20]);
                clock.timeout.encode(&mut bytes[24..32]);
                clock.precision.encode(&mut bytes[32..40]);
                clock.flags.encode(&mut bytes[40..42]);
            }
            SubscriptionU::FdRead(fd) => {
                bytes[8] = 1;
                fd.encode(&mut bytes[16..20]);
            }
            SubscriptionU::FdWrite(fd) => {
                bytes[8] = 2;
                fd.encode(&mut bytes[16..20]);
            }
        }
    }
}

/// An event that occurred, as written by `poll_oneoff`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub userdata: Userdata,
    pub error: u16,
    pub type_: u8,
    pub nbytes: Filesize,
    pub flags: u16,
}

impl GuestType for Event {
    fn guest_size() -> u32 {
        32
    }

    fn decode(bytes: &[u8]) -> Result<Self, GuestError> {
        Ok(Self {
            userdata: u64::decode(&bytes[0..8])?,
            error: u16::decode(&bytes[8..10])?,
            type_: bytes[10],
            nbytes: u64::decode(&bytes[16..24])?,
            flags: u16::decode(&bytes[24..26])?,
        })
    }

    fn encode(&self, bytes: &mut [u8]) {
        bytes[..32].fill(0);
        self.userdata.encode(&mut bytes[0..8]);
        self.error.encode(&mut bytes[8..10]);
        bytes[10] = self.type_;
        self.nbytes.encode(&mut bytes[16..24]);
        self.flags.encode(&mut bytes[24..26]);
    }
}
