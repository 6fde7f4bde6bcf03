//! Little-endian field readers for guest-supplied byte ranges.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("descriptor too short: want {want} bytes, got {got}")]
    TooShort { want: usize, got: usize },
    #[error("invalid {field} value {value}")]
    InvalidEnum { field: &'static str, value: u32 },
}

pub fn read_u32_le(bytes: &[u8], offset: usize) -> Result<u32, WireError> {
    let end = offset.checked_add(4).ok_or(WireError::TooShort {
        want: usize::MAX,
        got: bytes.len(),
    })?;
    let slice = bytes.get(offset..end).ok_or(WireError::TooShort {
        want: end,
        got: bytes.len(),
    })?;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

pub fn read_u64_le(bytes: &[u8], offset: usize) -> Result<u64, WireError> {
    let end = offset.checked_add(8).ok_or(WireError::TooShort {
        want: usize::MAX,
        got: bytes.len(),
    })?;
    let slice = bytes.get(offset..end).ok_or(WireError::TooShort {
        want: end,
        got: bytes.len(),
    })?;
    Ok(u64::from_le_bytes(slice.try_into().unwrap()))
}

/// Location of a variable-length byte region in guest linear memory.
///
/// This is both the wire form of one buffer-array element and the shape of
/// every indirect (string/blob) descriptor field: a guest offset plus a byte
/// length. Offset zero is the null slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestSlice {
    pub offset: u64,
    pub len: u32,
}

impl GuestSlice {
    /// On-the-wire size: u64 offset + u32 length.
    pub const SIZE_BYTES: usize = 12;

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let offset = read_u64_le(bytes, 0)?;
        let len = read_u32_le(bytes, 8)?;
        Ok(Self { offset, len })
    }

    pub fn encode(self) -> [u8; Self::SIZE_BYTES] {
        let mut out = [0u8; Self::SIZE_BYTES];
        out[0..8].copy_from_slice(&self.offset.to_le_bytes());
        out[8..12].copy_from_slice(&self.len.to_le_bytes());
        out
    }

    pub fn is_null(self) -> bool {
        self.offset == 0
    }
}
