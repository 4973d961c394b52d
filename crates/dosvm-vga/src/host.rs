//! Host presentation seams: a text console for alpha modes and an exclusive pixel surface for
//! graphics modes.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaletteEntry {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl PaletteEntry {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsoleCell {
    pub ch: u8,
    pub attr: u8,
}

/// What the host console reports about itself when VGA text emulation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleInfo {
    pub cols: u16,
    pub rows: u16,
    pub cursor: (u16, u16),
    pub attr: u8,
}

pub trait HostConsole: Send {
    /// `None` when output is not an interactive console (e.g. redirected to a file).
    fn screen_info(&self) -> Option<ConsoleInfo>;
    fn set_screen_size(&mut self, cols: u16, rows: u16);
    fn write_row(&mut self, row: u16, cells: &[ConsoleCell]);
    fn set_cursor_position(&mut self, x: u16, y: u16);
    fn set_cursor_info(&mut self, size_percent: u32, visible: bool);
    /// Raw byte output used when there is no console to mirror the text buffer into.
    fn write_raw(&mut self, byte: u8);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("host display unavailable: {0}")]
    Unavailable(String),
    #[error("surface {width}x{height}x{depth} not supported by host")]
    UnsupportedMode { width: u32, height: u32, depth: u32 },
    #[error("surface lock failed")]
    LockFailed,
}

/// Pixels of a locked host surface. `pitch` is in bytes.
pub struct SurfaceLock<'a> {
    pub pixels: &'a mut [u8],
    pub pitch: usize,
    pub width: u32,
    pub height: u32,
}

pub trait HostSurface: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn depth(&self) -> u32;
    fn lock(&mut self) -> Result<SurfaceLock<'_>, SurfaceError>;
    /// Publishes whatever was drawn since the last `lock`.
    fn unlock(&mut self);
    fn set_palette(&mut self, start: usize, entries: &[PaletteEntry]);
}

pub trait HostDisplay: Send {
    fn create_surface(
        &mut self,
        width: u32,
        height: u32,
        depth: u32,
    ) -> Result<Box<dyn HostSurface>, SurfaceError>;
}
