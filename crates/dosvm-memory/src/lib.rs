//! Guest physical memory for the real-mode VM.
//!
//! The VM owns a single byte arena covering conventional memory, the upper memory area and the
//! HMA. The arena is cheaply clonable so that device worker threads (the VGA redraw timer) can
//! read video memory while the VM thread runs guest code.

mod arena;

pub use arena::GuestMemory;

/// Size of the real-mode address space including the high memory area (1 MiB + 64 KiB - 16).
pub const GUEST_MEMORY_SIZE: usize = 0x11_0000;

/// Errors returned by [`GuestMemory`] range accessors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuestMemoryError {
    /// The requested address range is outside the guest memory arena.
    #[error("guest memory access out of range: paddr=0x{paddr:x} len={len} size=0x{size:x}")]
    OutOfRange { paddr: u32, len: usize, size: usize },
}

pub type GuestMemoryResult<T> = Result<T, GuestMemoryError>;

/// Converts a real-mode `segment:offset` pair into a linear address.
#[inline]
pub const fn linear(segment: u16, offset: u16) -> u32 {
    ((segment as u32) << 4) + offset as u32
}

pub(crate) fn check_range(size: usize, paddr: u32, len: usize) -> GuestMemoryResult<usize> {
    let start = paddr as usize;
    let end = start
        .checked_add(len)
        .ok_or(GuestMemoryError::OutOfRange { paddr, len, size })?;
    if end > size {
        return Err(GuestMemoryError::OutOfRange { paddr, len, size });
    }
    Ok(start)
}
