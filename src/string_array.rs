use crate::memory::{GuestMemory, GuestPtr};
use crate::wasi::Size;
use crate::{Errno, Result};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StringArrayError {
    #[error("Number of elements exceeds 2^32")]
    NumberElements,
    #[error("Element size exceeds 2^32")]
    ElementSize,
    #[error("Cumulative size exceeds 2^32")]
    CumulativeSize,
    #[error("String contains a NUL byte: {0:?}")]
    Nul(String),
}

/// NUL-terminated strings handed to the guest by `args_get` and
/// `environ_get`.
#[derive(Debug, Clone, Default)]
pub struct StringArray {
    elems: Vec<String>,
}

impl StringArray {
    pub fn new() -> Self {
        StringArray { elems: Vec::new() }
    }

    pub fn push(&mut self, elem: String) -> std::result::Result<(), StringArrayError> {
        if self.elems.len() + 1 > u32::MAX as usize {
            return Err(StringArrayError::NumberElements);
        }
        if elem.contains('\0') {
            return Err(StringArrayError::Nul(elem));
        }
        if elem.len() + 1 > u32::MAX as usize {
            return Err(StringArrayError::ElementSize);
        }
        if self.cumulative_size() as usize + elem.len() + 1 > u32::MAX as usize {
            return Err(StringArrayError::CumulativeSize);
        }
        self.elems.push(elem);
        Ok(())
    }

    pub fn number_elements(&self) -> Size {
        self.elems.len() as Size
    }

    /// Total bytes of all strings including their terminators.
    pub fn cumulative_size(&self) -> Size {
        self.elems
            .iter()
            .map(|e| e.len() + 1)
            .sum::<usize>()
            .try_into()
            .unwrap_or(Size::MAX)
    }

    /// Copies the strings to `buffer` and their addresses to `element_heads`.
    pub fn write_to_guest(
        &self,
        mem: &mut dyn GuestMemory,
        buffer: GuestPtr<u8>,
        element_heads: GuestPtr<GuestPtr<u8>>,
    ) -> Result<()> {
        let mut cursor = 0;
        for (i, elem) in self.elems.iter().enumerate() {
            let head = buffer.byte_add(cursor)?;
            let mut bytes = Vec::with_capacity(elem.len() + 1);
            bytes.extend_from_slice(elem.as_bytes());
            bytes.push(0);
            head.write_bytes(mem, &bytes)?;
            element_heads.add(u32::try_from(i)?)?.write(mem, head)?;
            cursor = cursor
                .checked_add(u32::try_from(bytes.len())?)
                .ok_or(Errno::Overflow)?;
        }
        Ok(())
    }
}
