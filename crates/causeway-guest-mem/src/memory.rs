//! Guest memory interface and an in-memory implementation for tests.

use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuestMemoryError {
    #[error("guest memory access out of bounds: offset=0x{offset:x}, len=0x{len:x}")]
    OutOfBounds { offset: u64, len: usize },
    #[error("guest allocation of {len} bytes failed")]
    OutOfGuestMemory { len: u32 },
}

/// Minimal guest memory interface.
///
/// The real runtime provides an implementation backed by its linear-memory
/// subsystem. `read`/`write` must validate that `[offset, offset + len)` lies
/// within the guest's currently committed range before touching it. `alloc`
/// returns a guest offset for a fresh block; offset 0 is the null offset and
/// is never a valid allocation.
pub trait GuestMemory {
    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<(), GuestMemoryError>;
    fn write(&self, offset: u64, src: &[u8]) -> Result<(), GuestMemoryError>;
    fn alloc(&self, len: u32) -> Result<u64, GuestMemoryError>;
    fn free(&self, offset: u64);

    fn read_u32(&self, offset: u64) -> Result<u32, GuestMemoryError> {
        let mut buf = [0u8; 4];
        self.read(offset, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&self, offset: u64) -> Result<u64, GuestMemoryError> {
        let mut buf = [0u8; 8];
        self.read(offset, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn write_u32(&self, offset: u64, value: u32) -> Result<(), GuestMemoryError> {
        self.write(offset, &value.to_le_bytes())
    }

    fn write_u64(&self, offset: u64, value: u64) -> Result<(), GuestMemoryError> {
        self.write(offset, &value.to_le_bytes())
    }
}

#[derive(Debug)]
struct VecGuestMemoryInner {
    mem: Vec<u8>,
    /// Total size (committed + allocations) the memory may grow to.
    limit: usize,
    freed: Vec<u64>,
    alloc_count: usize,
}

/// Contiguous in-memory guest implementation for tests.
///
/// The initial `size` bytes are the committed range; `alloc` appends fresh
/// blocks past it (so returned offsets are never 0 for `size > 0`) up to an
/// optional limit, which tests use to provoke `OutOfGuestMemory`. `free` only
/// records the offset; test memory is never reused within a test.
#[derive(Debug)]
pub struct VecGuestMemory {
    inner: Mutex<VecGuestMemoryInner>,
}

impl VecGuestMemory {
    pub fn new(size: usize) -> Self {
        Self::with_limit(size, usize::MAX)
    }

    /// Like [`VecGuestMemory::new`], but allocations past `limit` total bytes
    /// fail with `OutOfGuestMemory`.
    pub fn with_limit(size: usize, limit: usize) -> Self {
        assert!(size > 0, "guest memory needs a non-empty committed range");
        Self {
            inner: Mutex::new(VecGuestMemoryInner {
                mem: vec![0u8; size],
                limit,
                freed: Vec::new(),
                alloc_count: 0,
            }),
        }
    }

    /// Offsets passed to `free` so far, in call order.
    pub fn freed_offsets(&self) -> Vec<u64> {
        self.inner.lock().unwrap().freed.clone()
    }

    /// Number of successful `alloc` calls so far.
    pub fn alloc_count(&self) -> usize {
        self.inner.lock().unwrap().alloc_count
    }
}

impl GuestMemory for VecGuestMemory {
    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<(), GuestMemoryError> {
        let inner = self.inner.lock().unwrap();
        let start = usize::try_from(offset).map_err(|_| GuestMemoryError::OutOfBounds {
            offset,
            len: dst.len(),
        })?;
        let end = start
            .checked_add(dst.len())
            .ok_or(GuestMemoryError::OutOfBounds {
                offset,
                len: dst.len(),
            })?;
        let slice = inner
            .mem
            .get(start..end)
            .ok_or(GuestMemoryError::OutOfBounds {
                offset,
                len: dst.len(),
            })?;
        dst.copy_from_slice(slice);
        Ok(())
    }

    fn write(&self, offset: u64, src: &[u8]) -> Result<(), GuestMemoryError> {
        let mut inner = self.inner.lock().unwrap();
        let start = usize::try_from(offset).map_err(|_| GuestMemoryError::OutOfBounds {
            offset,
            len: src.len(),
        })?;
        let end = start
            .checked_add(src.len())
            .ok_or(GuestMemoryError::OutOfBounds {
                offset,
                len: src.len(),
            })?;
        let slice = inner
            .mem
            .get_mut(start..end)
            .ok_or(GuestMemoryError::OutOfBounds {
                offset,
                len: src.len(),
            })?;
        slice.copy_from_slice(src);
        Ok(())
    }

    fn alloc(&self, len: u32) -> Result<u64, GuestMemoryError> {
        let mut inner = self.inner.lock().unwrap();
        let offset = inner.mem.len();
        let new_len = offset
            .checked_add(len as usize)
            .ok_or(GuestMemoryError::OutOfGuestMemory { len })?;
        if new_len > inner.limit {
            return Err(GuestMemoryError::OutOfGuestMemory { len });
        }
        inner.mem.resize(new_len, 0);
        inner.alloc_count += 1;
        Ok(offset as u64)
    }

    fn free(&self, offset: u64) {
        self.inner.lock().unwrap().freed.push(offset);
    }
}
