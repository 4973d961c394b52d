use std::collections::TryReserveError;

use dosvm_memory::GuestMemory;

use crate::host::SurfaceLock;

/// Start and size of the guest-visible graphics window for 8-bit and deeper modes.
pub const VGA_WINDOW_START: u32 = 0xA_0000;
pub const VGA_WINDOW_SIZE: usize = 0x1_0000;
/// Start and size of the CGA window used by modes shallower than 8 bits.
pub const CGA_WINDOW_START: u32 = 0xB_8000;
pub const CGA_WINDOW_SIZE: usize = 0x8000;

const MIN_FRAMEBUFFER_SIZE: usize = 256 * 1024;

/// How the guest window relates to the host-side framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMapping {
    /// The window is a direct copy of the framebuffer starting at this byte offset.
    Linear(usize),
    /// Planar (unchained) addressing; the window is not mirrored.
    Unchained,
}

#[derive(Debug)]
pub(crate) struct Framebuffer {
    pub(crate) data: Vec<u8>,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) depth: u32,
    pub(crate) pitch: usize,
    /// Display start within `data`.
    pub(crate) offset: usize,
    pub(crate) window: WindowMapping,
    pub(crate) window_base: u32,
    pub(crate) window_size: usize,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            depth: 0,
            pitch: 0,
            offset: 0,
            window: WindowMapping::Linear(0),
            window_base: VGA_WINDOW_START,
            window_size: VGA_WINDOW_SIZE,
        }
    }
}

impl Framebuffer {
    pub(crate) fn bytes_per_pixel(&self) -> usize {
        (self.depth as usize + 7) / 8
    }

    /// Sets the geometry and makes sure the backing store can hold it. Never shrinks.
    pub(crate) fn configure(
        &mut self,
        width: u32,
        height: u32,
        depth: u32,
    ) -> Result<(), TryReserveError> {
        self.width = width;
        self.height = height;
        self.depth = depth;
        self.offset = 0;
        self.pitch = width as usize * self.bytes_per_pixel();

        let needed = (self.pitch * height as usize).max(MIN_FRAMEBUFFER_SIZE);
        if self.data.len() < needed {
            self.data.try_reserve_exact(needed - self.data.len())?;
            self.data.resize(needed, 0);
        }
        Ok(())
    }

    pub(crate) fn select_window(&mut self, base: u32, size: usize) {
        self.window_base = base;
        self.window_size = size;
    }

    pub(crate) fn clear_window(&self, memory: &GuestMemory) {
        if let Err(err) = memory.fill(self.window_base, self.window_size, 0) {
            tracing::warn!(%err, "cannot clear video window");
        }
    }

    /// Copies the guest window into the framebuffer (`target_is_fb`) or back out of it.
    ///
    /// Only the part of the window that overlaps the framebuffer is copied.
    pub(crate) fn sync_window(&mut self, memory: &GuestMemory, target_is_fb: bool) {
        let WindowMapping::Linear(start) = self.window else {
            return;
        };
        if start >= self.data.len() {
            return;
        }
        let size = self.window_size.min(self.data.len() - start);
        let chunk = &mut self.data[start..start + size];
        let result = if target_is_fb {
            memory.read_into(self.window_base, chunk)
        } else {
            memory.write_from(self.window_base, chunk)
        };
        if let Err(err) = result {
            tracing::warn!(%err, "video window sync failed");
        }
    }

    /// Moves the window, committing the old view first so no data is lost.
    pub(crate) fn set_window_start(&mut self, memory: &GuestMemory, window: WindowMapping) {
        if window == self.window {
            return;
        }

        match self.window {
            WindowMapping::Linear(_) => self.sync_window(memory, true),
            WindowMapping::Unchained => tracing::warn!("leaving planar VGA memory mode"),
        }
        self.window = window;
        match self.window {
            WindowMapping::Linear(_) => self.sync_window(memory, false),
            WindowMapping::Unchained => {
                tracing::warn!("planar VGA memory is not emulated; window left unmapped")
            }
        }
    }

    /// Renders the visible framebuffer into a locked host surface.
    pub(crate) fn blit(&self, target: &mut SurfaceLock<'_>) {
        let Some(src) = self.data.get(self.offset..) else {
            return;
        };
        let (w, h) = (self.width as usize, self.height as usize);
        let pitch = target.pitch;
        let bpp = self.bytes_per_pixel();

        if self.depth == 4 && w == 160 && h == 200 {
            // Composite 160x200x16: two pixels per byte, interleaved banks, 4x2 host pixels each.
            for y in 0..h {
                for x in 0..w {
                    let shift = if x % 2 == 0 { 4 } else { 0 };
                    let value = (cga_byte(src, x / 2, y) >> shift) & 0x0F;
                    let base = 2 * y * pitch + x * 4;
                    for dy in [0, pitch] {
                        for dx in 0..4 {
                            put(target.pixels, base + dy + dx, value);
                        }
                    }
                }
            }
        } else if self.depth == 2 && w == 320 && h == 200 {
            // CGA 320x200x4: four pixels per byte, interleaved banks, doubled.
            for y in 0..h {
                for x in 0..w {
                    let shift = 6 - (x % 4) * 2;
                    let value = (cga_byte(src, x / 4, y) >> shift) & 0x03;
                    let base = 2 * y * pitch + x * 2;
                    for offset in [0, 1, pitch, pitch + 1] {
                        put(target.pixels, base + offset, value);
                    }
                }
            }
        } else if target.height as usize >= 2 * h && target.width as usize >= 2 * w && bpp == 1 {
            for y in 0..h {
                for x in 0..w {
                    let value = src.get(y * self.pitch + x).copied().unwrap_or(0);
                    let base = 2 * y * pitch + x * 2;
                    for offset in [0, 1, pitch, pitch + 1] {
                        put(target.pixels, base + offset, value);
                    }
                }
            }
        } else {
            let row_bytes = w * bpp;
            for y in 0..h {
                let Some(line) = src.get(y * self.pitch..y * self.pitch + row_bytes) else {
                    break;
                };
                let Some(dst) = target.pixels.get_mut(y * pitch..y * pitch + row_bytes) else {
                    break;
                };
                dst.copy_from_slice(line);
            }
        }
    }
}

/// Byte `column` of scanline `y` in CGA layout: odd lines live in the bank at 8 KiB.
fn cga_byte(src: &[u8], column: usize, y: usize) -> u8 {
    let bank = if y & 1 == 1 { 8 * 1024 } else { 0 };
    src.get(bank + 80 * (y / 2) + column).copied().unwrap_or(0)
}

fn put(pixels: &mut [u8], index: usize, value: u8) {
    if let Some(p) = pixels.get_mut(index) {
        *p = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_never_shrinks() {
        let mut fb = Framebuffer::default();
        fb.configure(1024, 768, 8).unwrap();
        assert_eq!(fb.data.len(), 1024 * 768);
        fb.configure(320, 200, 8).unwrap();
        assert_eq!(fb.data.len(), 1024 * 768);
        assert_eq!(fb.pitch, 320);
    }

    #[test]
    fn cga_blit_decodes_interleaved_banks() {
        let mut fb = Framebuffer::default();
        fb.configure(320, 200, 2).unwrap();
        fb.data[0] = 0b11_10_01_00;
        fb.data[8 * 1024] = 0b01_00_00_00;

        let pitch = 640;
        let mut pixels = vec![0u8; pitch * 400];
        fb.blit(&mut SurfaceLock {
            pixels: &mut pixels,
            pitch,
            width: 640,
            height: 400,
        });

        assert_eq!(&pixels[0..8], &[3, 3, 2, 2, 1, 1, 0, 0]);
        assert_eq!(&pixels[pitch..pitch + 2], &[3, 3]);
        // Line 1 comes from the odd bank and lands on host rows 2 and 3.
        assert_eq!(&pixels[2 * pitch..2 * pitch + 2], &[1, 1]);
        assert_eq!(&pixels[3 * pitch..3 * pitch + 2], &[1, 1]);
    }
}
