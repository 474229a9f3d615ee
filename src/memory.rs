//! Typed access to the guest's linear memory.
//!
//! The guest's memory is never borrowed directly. Every access goes through
//! the two copy primitives of [`GuestMemory`], so a [`GuestPtr`] is nothing
//! more than an offset tagged with the type it points at.

use std::fmt;
use std::marker::PhantomData;

/// Errors raised while copying to or from guest memory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuestError {
    #[error("Pointer out of memory bounds: {offset:#x} + {len} > {memory_len:#x}")]
    PtrOutOfBounds {
        offset: u32,
        len: u32,
        memory_len: usize,
    },
    #[error("Pointer overflow: {offset:#x} + {len}")]
    PtrOverflow { offset: u32, len: u32 },
    #[error("Invalid enum value for {name}: {value}")]
    InvalidEnumValue { name: &'static str, value: u64 },
}

/// The host-provided copy primitives for one guest memory.
pub trait GuestMemory {
    /// Copy `bytes` into guest memory starting at `offset`.
    fn copy_to_guest(&mut self, offset: u32, bytes: &[u8]) -> Result<(), GuestError>;

    /// Fill `bytes` from guest memory starting at `offset`.
    fn copy_from_guest(&self, offset: u32, bytes: &mut [u8]) -> Result<(), GuestError>;
}

/// A guest memory backed by a plain byte vector.
#[derive(Clone, Default)]
pub struct VecMemory {
    bytes: Vec<u8>,
}

impl VecMemory {
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn range(&self, offset: u32, len: usize) -> Result<std::ops::Range<usize>, GuestError> {
        let len32 = u32::try_from(len).map_err(|_| GuestError::PtrOverflow {
            offset,
            len: u32::MAX,
        })?;
        let end = offset
            .checked_add(len32)
            .ok_or(GuestError::PtrOverflow { offset, len: len32 })?;
        if end as usize > self.bytes.len() {
            return Err(GuestError::PtrOutOfBounds {
                offset,
                len: len32,
                memory_len: self.bytes.len(),
            });
        }
        Ok(offset as usize..end as usize)
    }
}

impl GuestMemory for VecMemory {
    fn copy_to_guest(&mut self, offset: u32, bytes: &[u8]) -> Result<(), GuestError> {
        let range = self.range(offset, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }

    fn copy_from_guest(&self, offset: u32, bytes: &mut [u8]) -> Result<(), GuestError> {
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.bytes[range]);
        Ok(())
    }
}

impl fmt::Debug for VecMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecMemory")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A type with a fixed little-endian representation in guest memory.
///
/// Implementations describe how to decode themselves from, and encode
/// themselves into, exactly `guest_size()` bytes.
pub trait GuestType: Sized {
    /// Returns the size, in bytes, of this type in the guest memory.
    fn guest_size() -> u32;

    fn decode(bytes: &[u8]) -> Result<Self, GuestError>;

    fn encode(&self, bytes: &mut [u8]);
}

macro_rules! integer_primitives {
    ($($ty:ident)*) => ($(
        impl GuestType for $ty {
            #[inline]
            fn guest_size() -> u32 { std::mem::size_of::<Self>() as u32 }

            #[inline]
            fn decode(bytes: &[u8]) -> Result<Self, GuestError> {
                let mut raw = [0; std::mem::size_of::<Self>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<Self>()]);
                Ok($ty::from_le_bytes(raw))
            }

            #[inline]
            fn encode(&self, bytes: &mut [u8]) {
                bytes[..std::mem::size_of::<Self>()].copy_from_slice(&self.to_le_bytes());
            }
        }
    )*)
}

integer_primitives!(u8 u16 u32 u64 i8 i16 i32 i64);

/// A pointer into guest memory.
///
/// Holding a `GuestPtr` never keeps any guest memory borrowed: each `read`
/// and `write` performs one bounded copy through the [`GuestMemory`] passed
/// in at that moment.
pub struct GuestPtr<T> {
    offset: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> GuestPtr<T> {
    pub fn new(offset: u32) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn cast<U>(&self) -> GuestPtr<U> {
        GuestPtr::new(self.offset)
    }

    /// Offsets this pointer by `bytes` bytes.
    pub fn byte_add(&self, bytes: u32) -> Result<Self, GuestError> {
        let offset = self
            .offset
            .checked_add(bytes)
            .ok_or(GuestError::PtrOverflow {
                offset: self.offset,
                len: bytes,
            })?;
        Ok(Self::new(offset))
    }
}

impl<T: GuestType> GuestPtr<T> {
    /// Offsets this pointer by `amt` elements of `T`.
    pub fn add(&self, amt: u32) -> Result<Self, GuestError> {
        let bytes = amt
            .checked_mul(T::guest_size())
            .ok_or(GuestError::PtrOverflow {
                offset: self.offset,
                len: amt,
            })?;
        self.byte_add(bytes)
    }

    pub fn read(&self, mem: &dyn GuestMemory) -> Result<T, GuestError> {
        let mut bytes = vec![0; T::guest_size() as usize];
        mem.copy_from_guest(self.offset, &mut bytes)?;
        T::decode(&bytes)
    }

    pub fn write(&self, mem: &mut dyn GuestMemory, val: T) -> Result<(), GuestError> {
        let mut bytes = vec![0; T::guest_size() as usize];
        val.encode(&mut bytes);
        mem.copy_to_guest(self.offset, &bytes)
    }
}

impl GuestPtr<u8> {
    /// Fails unless all `len` bytes starting here are inside `mem`.
    pub fn check_len(&self, mem: &dyn GuestMemory, len: u32) -> Result<(), GuestError> {
        let Some(last) = len.checked_sub(1) else {
            return Ok(());
        };
        let last = self.offset.checked_add(last).ok_or(GuestError::PtrOverflow {
            offset: self.offset,
            len,
        })?;
        mem.copy_from_guest(last, &mut [0])
    }

    pub fn read_bytes(&self, mem: &dyn GuestMemory, len: u32) -> Result<Vec<u8>, GuestError> {
        self.check_len(mem, len)?;
        let mut bytes = vec![0; len as usize];
        mem.copy_from_guest(self.offset, &mut bytes)?;
        Ok(bytes)
    }

    pub fn write_bytes(&self, mem: &mut dyn GuestMemory, bytes: &[u8]) -> Result<(), GuestError> {
        mem.copy_to_guest(self.offset, bytes)
    }
}

// Pointers stored in guest memory are always 32 bits wide.
impl<T> GuestType for GuestPtr<T> {
    fn guest_size() -> u32 {
        u32::guest_size()
    }

    fn decode(bytes: &[u8]) -> Result<Self, GuestError> {
        Ok(Self::new(u32::decode(bytes)?))
    }

    fn encode(&self, bytes: &mut [u8]) {
        self.offset.encode(bytes)
    }
}

impl<T> Clone for GuestPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for GuestPtr<T> {}

impl<T> PartialEq for GuestPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<T> Eq for GuestPtr<T> {}

impl<T> fmt::Debug for GuestPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuestPtr({:#x})", self.offset)
    }
}
