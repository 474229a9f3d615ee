use crate::memory::GuestError;
use std::convert::Infallible;
use std::num::TryFromIntError;
use std::str::Utf8Error;

pub type Result<T> = std::result::Result<T, Errno>;

/// The WASI preview1 `$errno` type.
///
/// Every hostcall reports exactly one of these values back to the guest;
/// `Success` is what a call that returned `Ok` encodes to.
#[derive(Clone, Copy, Debug, thiserror::Error, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum Errno {
    #[error("Success: No error occurred")]
    Success = 0,
    #[error("TooBig: Argument list too long")]
    TooBig = 1,
    #[error("Acces: Permission denied")]
    Acces = 2,
    #[error("Again: Resource unavailable, or operation would block")]
    Again = 6,
    #[error("Badf: Bad file descriptor")]
    Badf = 8,
    #[error("Busy: Device or resource busy")]
    Busy = 10,
    #[error("Exist: File exists")]
    Exist = 20,
    #[error("Fault: Bad address")]
    Fault = 21,
    #[error("Fbig: File too large")]
    Fbig = 22,
    #[error("Ilseq: Illegal byte sequence")]
    Ilseq = 25,
    #[error("Inval: Invalid argument")]
    Inval = 28,
    #[error("Io: I/O error")]
    Io = 29,
    #[error("Isdir: Is a directory")]
    Isdir = 31,
    #[error("Loop: Too many levels of symbolic links")]
    Loop = 32,
    #[error("Mfile: File descriptor value too large")]
    Mfile = 33,
    #[error("Nametoolong: Filename too long")]
    Nametoolong = 37,
    #[error("Nfile: Too many files open in system")]
    Nfile = 41,
    #[error("Noent: No such file or directory")]
    Noent = 44,
    #[error("Nospc: No space left on device")]
    Nospc = 51,
    #[error("Nosys: Function not supported")]
    Nosys = 52,
    #[error("Notdir: Not a directory or a symbolic link to a directory")]
    Notdir = 54,
    #[error("Notempty: Directory not empty")]
    Notempty = 55,
    #[error("Notsup: Not supported, or operation not supported on socket")]
    Notsup = 58,
    #[error("Overflow: Value too large to be stored in data type")]
    Overflow = 61,
    #[error("Perm: Operation not permitted")]
    Perm = 63,
    #[error("Spipe: Invalid seek")]
    Spipe = 70,
    #[error("Notcapable: Extension: Capabilities insufficient")]
    Notcapable = 76,
}

impl Errno {
    /// The raw code handed back across the ABI.
    pub fn raw(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for Errno {
    type Error = GuestError;

    fn try_from(value: u16) -> std::result::Result<Self, GuestError> {
        Ok(match value {
            0 => Self::Success,
            1 => Self::TooBig,
            2 => Self::Acces,
            6 => Self::Again,
            8 => Self::Badf,
            10 => Self::Busy,
            20 => Self::Exist,
            21 => Self::Fault,
            22 => Self::Fbig,
            25 => Self::Ilseq,
            28 => Self::Inval,
            29 => Self::Io,
            31 => Self::Isdir,
            32 => Self::Loop,
            33 => Self::Mfile,
            37 => Self::Nametoolong,
            41 => Self::Nfile,
            44 => Self::Noent,
            51 => Self::Nospc,
            52 => Self::Nosys,
            54 => Self::Notdir,
            55 => Self::Notempty,
            58 => Self::Notsup,
            61 => Self::Overflow,
            63 => Self::Perm,
            70 => Self::Spipe,
            76 => Self::Notcapable,
            value => {
                return Err(GuestError::InvalidEnumValue {
                    name: "errno",
                    value: value.into(),
                });
            }
        })
    }
}

impl From<GuestError> for Errno {
    fn from(err: GuestError) -> Self {
        match err {
            GuestError::InvalidEnumValue { .. } => Self::Inval,
            GuestError::PtrOutOfBounds { .. } | GuestError::PtrOverflow { .. } => Self::Fault,
        }
    }
}

impl From<TryFromIntError> for Errno {
    fn from(_err: TryFromIntError) -> Self {
        Self::Overflow
    }
}

impl From<Utf8Error> for Errno {
    fn from(_err: Utf8Error) -> Self {
        Self::Ilseq
    }
}

impl From<Infallible> for Errno {
    fn from(_err: Infallible) -> Self {
        unreachable!("should be impossible: From<Infallible>")
    }
}

/// Exit status requested by the guest through `proc_exit`.
#[derive(Clone, Copy, Debug, thiserror::Error, Eq, PartialEq)]
#[error("Exited with i32 exit status {0}")]
pub struct I32Exit(pub u32);
