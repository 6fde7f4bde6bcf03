//! Guest linear-memory access and deep marshaling.
//!
//! The execution engine owns the guest's address space; this crate wraps the
//! engine's translation/allocation primitives behind [`GuestMemory`] and
//! builds the deep-copy marshaler for nested variable-length structures on
//! top of it.
//!
//! Translated host pointers never escape a call: the trait exposes
//! bounds-checked copies instead of pointers, so "do not retain a pointer
//! across calls" (guest memory may move or grow between calls) is enforced by
//! construction rather than by documentation.

mod marshal;
mod memory;

pub use marshal::{
    copy_buffer_array_to_guest, copy_buffer_array_to_host, free_guest_buffer_array,
    read_guest_bytes, read_guest_string, BufferElement, GuestBufferArray, MarshalError,
    OwnedBufferArray,
};
pub use memory::{GuestMemory, GuestMemoryError, VecGuestMemory};
