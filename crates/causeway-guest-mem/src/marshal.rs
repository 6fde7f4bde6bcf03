//! Deep marshaling of nested variable-length structures.
//!
//! A guest buffer array is a sequence of `{offset, len}` descriptors in guest
//! memory, each naming a byte region elsewhere in guest memory. Marshaling to
//! the host produces a fully-owned deep copy with no aliasing of guest memory;
//! marshaling to the guest allocates fresh guest blocks plus a fresh
//! descriptor array describing them.
//!
//! Failures are tolerated per element: a single element that cannot be copied
//! or allocated is recorded (host side) or written as a `{0, 0}` descriptor
//! (guest side) without aborting the rest of the array. The descriptor array
//! itself failing to read or allocate aborts the whole call.

use causeway_types::GuestSlice;
use thiserror::Error;

use crate::memory::{GuestMemory, GuestMemoryError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    #[error("buffer array descriptor offset is null")]
    NullDescriptorArray,
    #[error("buffer array is empty")]
    EmptyArray,
    #[error("buffer array of {count} elements does not fit guest memory")]
    ArrayTooLarge { count: usize },
    #[error("guest string is not valid utf-8")]
    InvalidUtf8,
    #[error(transparent)]
    Memory(#[from] GuestMemoryError),
}

/// One marshaled element of a buffer array.
///
/// Per-element failure is represented explicitly rather than as a silently
/// uninitialized payload; every downstream consumer checks for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferElement {
    /// Host-owned deep copy of the guest bytes at call time.
    Copied(Vec<u8>),
    /// The guest descriptor had length zero.
    Empty,
    /// The element could not be copied; the rest of the array is unaffected.
    Failed(GuestMemoryError),
}

impl BufferElement {
    /// The payload bytes, if this element marshaled successfully.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            BufferElement::Copied(bytes) => Some(bytes),
            BufferElement::Empty => Some(&[]),
            BufferElement::Failed(_) => None,
        }
    }
}

/// Host-owned result of marshaling a guest buffer array.
///
/// Dropping the array releases every element's storage; there is no separate
/// deep-free on the host side.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OwnedBufferArray {
    elements: Vec<BufferElement>,
}

impl OwnedBufferArray {
    pub fn from_elements(elements: Vec<BufferElement>) -> Self {
        Self { elements }
    }

    /// Build an array of successfully "copied" payloads (host-originated
    /// data headed for the guest).
    pub fn from_payloads<I: IntoIterator<Item = Vec<u8>>>(payloads: I) -> Self {
        Self {
            elements: payloads.into_iter().map(BufferElement::Copied).collect(),
        }
    }

    pub fn elements(&self) -> &[BufferElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Flatten into per-element payloads: `None` for failed elements,
    /// `Some(empty)` for zero-length ones.
    pub fn into_payloads(self) -> Vec<Option<Vec<u8>>> {
        self.elements
            .into_iter()
            .map(|e| match e {
                BufferElement::Copied(bytes) => Some(bytes),
                BufferElement::Empty => Some(Vec::new()),
                BufferElement::Failed(_) => None,
            })
            .collect()
    }
}

/// A buffer array written into guest memory: the descriptor array location
/// and its element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestBufferArray {
    pub desc_offset: u64,
    pub count: u32,
}

fn read_desc(
    mem: &dyn GuestMemory,
    desc_offset: u64,
    index: u32,
) -> Result<GuestSlice, MarshalError> {
    // desc_offset is guest-controlled; the arithmetic must not wrap.
    let offset = desc_offset
        .checked_add(u64::from(index) * GuestSlice::SIZE_BYTES as u64)
        .ok_or(GuestMemoryError::OutOfBounds {
            offset: desc_offset,
            len: GuestSlice::SIZE_BYTES,
        })?;
    let mut raw = [0u8; GuestSlice::SIZE_BYTES];
    mem.read(offset, &mut raw)?;
    // Decode over an exact-size buffer cannot fail.
    Ok(GuestSlice::decode(&raw).expect("exact-size descriptor decode"))
}

/// Deep-copy a guest buffer array into host-owned storage.
///
/// Rejects a null descriptor offset or zero count before touching guest
/// memory. An unreadable descriptor array aborts the call; an unreadable
/// element payload only fails that element.
pub fn copy_buffer_array_to_host(
    mem: &dyn GuestMemory,
    desc_offset: u64,
    count: u32,
) -> Result<OwnedBufferArray, MarshalError> {
    if desc_offset == 0 {
        return Err(MarshalError::NullDescriptorArray);
    }
    if count == 0 {
        return Err(MarshalError::EmptyArray);
    }

    let mut elements = Vec::with_capacity(count as usize);
    for i in 0..count {
        let desc = read_desc(mem, desc_offset, i)?;
        if desc.len == 0 {
            elements.push(BufferElement::Empty);
            continue;
        }
        if desc.is_null() {
            elements.push(BufferElement::Failed(GuestMemoryError::OutOfBounds {
                offset: 0,
                len: desc.len as usize,
            }));
            continue;
        }
        let mut payload = vec![0u8; desc.len as usize];
        match mem.read(desc.offset, &mut payload) {
            Ok(()) => elements.push(BufferElement::Copied(payload)),
            Err(err) => elements.push(BufferElement::Failed(err)),
        }
    }
    Ok(OwnedBufferArray::from_elements(elements))
}

/// Write a host buffer array into freshly allocated guest memory.
///
/// Allocates one guest block per element plus the descriptor array. An
/// element whose allocation fails is written as a `{0, 0}` descriptor and the
/// remaining elements still marshal; a descriptor-array allocation failure
/// aborts the call.
pub fn copy_buffer_array_to_guest(
    mem: &dyn GuestMemory,
    array: &OwnedBufferArray,
) -> Result<GuestBufferArray, MarshalError> {
    if array.is_empty() {
        return Err(MarshalError::EmptyArray);
    }
    let count = u32::try_from(array.len()).map_err(|_| MarshalError::ArrayTooLarge {
        count: array.len(),
    })?;
    let desc_bytes = count
        .checked_mul(GuestSlice::SIZE_BYTES as u32)
        .ok_or(MarshalError::ArrayTooLarge {
            count: array.len(),
        })?;
    let desc_offset = mem.alloc(desc_bytes)?;

    for (i, element) in array.elements().iter().enumerate() {
        let desc = match element.bytes() {
            Some(bytes) if !bytes.is_empty() => {
                match write_element(mem, bytes) {
                    Some(offset) => GuestSlice {
                        offset,
                        len: bytes.len() as u32,
                    },
                    // Allocation failed for this element; its guest length
                    // stays 0 and the rest of the array proceeds.
                    None => GuestSlice { offset: 0, len: 0 },
                }
            }
            _ => GuestSlice { offset: 0, len: 0 },
        };
        let record_offset = desc_offset + i as u64 * GuestSlice::SIZE_BYTES as u64;
        mem.write(record_offset, &desc.encode())?;
    }

    Ok(GuestBufferArray { desc_offset, count })
}

fn write_element(mem: &dyn GuestMemory, bytes: &[u8]) -> Option<u64> {
    let offset = mem.alloc(bytes.len() as u32).ok()?;
    if mem.write(offset, bytes).is_err() {
        mem.free(offset);
        return None;
    }
    Some(offset)
}

/// Guest-side deep free for an array produced by
/// [`copy_buffer_array_to_guest`]: walks the descriptors, frees each
/// element's block, then the descriptor array itself.
pub fn free_guest_buffer_array(
    mem: &dyn GuestMemory,
    array: GuestBufferArray,
) -> Result<(), MarshalError> {
    if array.desc_offset == 0 {
        return Err(MarshalError::NullDescriptorArray);
    }
    for i in 0..array.count {
        let desc = read_desc(mem, array.desc_offset, i)?;
        if !desc.is_null() {
            mem.free(desc.offset);
        }
    }
    mem.free(array.desc_offset);
    Ok(())
}

/// Copy the bytes a [`GuestSlice`] points at into host-owned storage.
pub fn read_guest_bytes(
    mem: &dyn GuestMemory,
    slice: GuestSlice,
) -> Result<Vec<u8>, GuestMemoryError> {
    let mut bytes = vec![0u8; slice.len as usize];
    mem.read(slice.offset, &mut bytes)?;
    Ok(bytes)
}

/// Copy a guest string (UTF-8 bytes) into host-owned storage.
pub fn read_guest_string(mem: &dyn GuestMemory, slice: GuestSlice) -> Result<String, MarshalError> {
    if slice.len == 0 {
        return Ok(String::new());
    }
    let bytes = read_guest_bytes(mem, slice)?;
    String::from_utf8(bytes).map_err(|_| MarshalError::InvalidUtf8)
}


#[cfg(all(test, not(target_arch = "wasm32")))]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::memory::VecGuestMemory;

    proptest! {
        /// Any non-empty payload set survives a guest round trip with bytes
        /// and per-element lengths intact.
        #[test]
        fn round_trip_preserves_payloads(
            payloads in proptest::collection::vec(
                proptest::collection::vec(any::<u8>(), 0..64),
                1..8,
            )
        ) {
            let mem = VecGuestMemory::new(16);
            let source = OwnedBufferArray::from_payloads(payloads.clone());
            let guest = copy_buffer_array_to_guest(&mem, &source).unwrap();
            let back = copy_buffer_array_to_host(&mem, guest.desc_offset, guest.count).unwrap();

            prop_assert_eq!(back.len(), payloads.len());
            for (element, payload) in back.elements().iter().zip(&payloads) {
                prop_assert_eq!(element.bytes(), Some(payload.as_slice()));
            }
        }
    }
}
