//! Abstraction over the persistent storage holding the RO and RW images.
//!
//! Everything above this layer addresses flash by byte offset from the start
//! of the part. The medium itself only promises that `erase` resets a range to
//! all-ones and that `write` programs bits from one to arbitrary values.

/// Value of every byte of freshly erased flash.
pub const ERASED_BYTE: u8 = 0xFF;

/// Raw flash primitives consumed by the update and verification engines.
///
/// Implementations are shared between engines through a `spin::Mutex`; the
/// engines hold the lock across a whole erase/write/read-back sequence so a
/// single operation is never interleaved with another.
pub trait FlashMedium {
    /// Fills `buf` with the contents of flash starting at `offset`.
    fn read(&self, offset: u32, buf: &mut [u8]) -> Result<(), FlashError>;

    /// Programs `data` at `offset`. The destination is expected to be erased.
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError>;

    /// Resets `len` bytes starting at `offset` to [`ERASED_BYTE`].
    fn erase(&mut self, offset: u32, len: u32) -> Result<(), FlashError>;

    /// Checks whether the hardware write protect is currently asserted.
    fn is_write_protected(&self) -> bool;

    /// Board-specific bitmask describing the current protection state, as
    /// reported to update tools. The default only reflects the hardware
    /// write-protect line in bit 0.
    fn protect_flags(&self) -> u32 {
        u32::from(self.is_write_protected())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FlashError {
    /// The requested range is not backed by the part.
    OutOfBounds,
    /// The range is protected against modification.
    Protected,
    Read,
    Write,
    Erase,
}

/// A contiguous range of flash, `size` bytes long, starting at `base`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FlashRegion {
    pub base: u32,
    pub size: u32,
}

impl FlashRegion {
    pub const fn new(base: u32, size: u32) -> Self {
        Self { base, size }
    }

    /// One past the last byte of the region. Computed in 64 bits so a region
    /// ending at the top of the address space does not wrap.
    pub const fn end(&self) -> u64 {
        self.base as u64 + self.size as u64
    }

    /// Checks that `[offset, offset + len)` lies entirely inside the region.
    pub const fn contains_range(&self, offset: u32, len: usize) -> bool {
        let end = offset as u64 + len as u64;
        offset >= self.base && end <= self.end()
    }

    /// Translates an absolute flash offset into an offset from `base`.
    pub fn relative(&self, offset: u32) -> Option<u32> {
        if self.contains_range(offset, 0) {
            Some(offset - self.base)
        } else {
            None
        }
    }
}

/// Reads `len` bytes starting at `offset` in `chunk`-sized pieces, passing each
/// piece to `f`. Used for hashing and blank-checking ranges larger than any
/// buffer we want on the stack.
pub fn for_each_chunk<F: FlashMedium + ?Sized>(
    flash: &F,
    offset: u32,
    len: u32,
    chunk: &mut [u8],
    mut f: impl FnMut(&[u8]),
) -> Result<(), FlashError> {
    if chunk.is_empty() {
        return Err(FlashError::Read);
    }
    // Tracked in 64 bits so a range ending at the top of the address space
    // terminates; `pos < end <= 1 << 32` keeps the cast below lossless.
    let mut pos = offset as u64;
    let end = offset as u64 + len as u64;
    while pos < end {
        let n = core::cmp::min(chunk.len() as u64, end - pos) as usize;
        let buf = &mut chunk[..n];
        flash.read(pos as u32, buf)?;
        f(buf);
        pos += n as u64;
    }
    Ok(())
}
