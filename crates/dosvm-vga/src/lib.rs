//! VGA/CGA display adapter model.
//!
//! [`VgaController`] owns the mode state, a host-side framebuffer mirrored through the guest's
//! 64 KiB window, the palette DAC and the text shadow buffer. Port I/O from the guest arrives via
//! [`VgaController::port_read`] and [`VgaController::port_write`]; a redraw thread periodically
//! pushes frames (graphics) or changed text rows (alpha modes) to the host.

mod controller;
mod dac;
mod framebuffer;
mod headless;
mod host;
mod modes;
mod palette;
mod ports;
mod text;
mod timer;

pub use controller::{VgaConfig, VgaController, VgaError, VgaGeometry};
pub use framebuffer::{
    WindowMapping, CGA_WINDOW_SIZE, CGA_WINDOW_START, VGA_WINDOW_SIZE, VGA_WINDOW_START,
};
pub use headless::{BufferConsole, ConsoleScreen, MemoryDisplay, MemoryScreen};
pub use host::{
    ConsoleCell, ConsoleInfo, HostConsole, HostDisplay, HostSurface, PaletteEntry, SurfaceError,
    SurfaceLock,
};
pub use modes::{mode_info, ModeKind, VgaModeInfo, MODE_TABLE};
pub use palette::{cga_palette, default_palette, ega_color, DEFAULT_ATTRIBUTE_PALETTE};

/// Text buffer shared by the alpha modes.
pub const TEXT_BUFFER_START: u32 = 0xB_8000;

/// True for ports decoded by the adapter (monochrome, EGA/VGA and color register blocks).
pub fn is_vga_port(port: u16) -> bool {
    (0x3B0..=0x3DF).contains(&port)
}
