use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::{check_range, GuestMemoryResult};

/// Byte-addressable guest memory shared between the VM thread and device workers.
///
/// Every byte is an independent atomic cell, so concurrent readers never observe undefined
/// behaviour. Multi-byte accesses are not atomic as a whole; like real RAM, a reader racing a
/// writer may see a torn word.
#[derive(Clone)]
pub struct GuestMemory {
    bytes: Arc<[AtomicU8]>,
}

impl std::fmt::Debug for GuestMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestMemory")
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl GuestMemory {
    /// Allocates a zero-filled arena of `size` bytes.
    pub fn new(size: usize) -> Self {
        let bytes: Arc<[AtomicU8]> = (0..size).map(|_| AtomicU8::new(0)).collect();
        Self { bytes }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn read_into(&self, paddr: u32, dst: &mut [u8]) -> GuestMemoryResult<()> {
        let len = dst.len();
        let start = check_range(self.size(), paddr, len)?;
        for (out, cell) in dst.iter_mut().zip(&self.bytes[start..start + len]) {
            *out = cell.load(Ordering::Relaxed);
        }
        Ok(())
    }

    pub fn write_from(&self, paddr: u32, src: &[u8]) -> GuestMemoryResult<()> {
        let start = check_range(self.size(), paddr, src.len())?;
        for (cell, byte) in self.bytes[start..start + src.len()].iter().zip(src) {
            cell.store(*byte, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Sets `len` bytes starting at `paddr` to `value`.
    pub fn fill(&self, paddr: u32, len: usize, value: u8) -> GuestMemoryResult<()> {
        let start = check_range(self.size(), paddr, len)?;
        for cell in &self.bytes[start..start + len] {
            cell.store(value, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Copies `len` bytes out of the arena.
    pub fn read_vec(&self, paddr: u32, len: usize) -> GuestMemoryResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(paddr, &mut buf)?;
        Ok(buf)
    }

    // Scalar accessors follow bus semantics: reads outside the arena float high and writes
    // outside it are dropped.

    pub fn read_u8(&self, paddr: u32) -> u8 {
        let mut buf = [0xFFu8; 1];
        self.read_bus(paddr, &mut buf);
        buf[0]
    }

    pub fn read_u16(&self, paddr: u32) -> u16 {
        let mut buf = [0xFFu8; 2];
        self.read_bus(paddr, &mut buf);
        u16::from_le_bytes(buf)
    }

    pub fn read_u32(&self, paddr: u32) -> u32 {
        let mut buf = [0xFFu8; 4];
        self.read_bus(paddr, &mut buf);
        u32::from_le_bytes(buf)
    }

    pub fn write_u8(&self, paddr: u32, value: u8) {
        self.write_bus(paddr, &[value]);
    }

    pub fn write_u16(&self, paddr: u32, value: u16) {
        self.write_bus(paddr, &value.to_le_bytes());
    }

    pub fn write_u32(&self, paddr: u32, value: u32) {
        self.write_bus(paddr, &value.to_le_bytes());
    }

    fn read_bus(&self, paddr: u32, dst: &mut [u8]) {
        if let Err(err) = self.read_into(paddr, dst) {
            tracing::warn!(%err, "open-bus read");
            dst.fill(0xFF);
        }
    }

    fn write_bus(&self, paddr: u32, src: &[u8]) {
        if let Err(err) = self.write_from(paddr, src) {
            tracing::warn!(%err, "dropped write");
        }
    }
}
