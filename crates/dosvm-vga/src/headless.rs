//! In-memory host implementations for running without a real console or display.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::host::{
    ConsoleCell, ConsoleInfo, HostConsole, HostDisplay, HostSurface, PaletteEntry, SurfaceError,
    SurfaceLock,
};

#[derive(Debug, Clone, Default)]
pub struct ConsoleScreen {
    pub attached: bool,
    pub cols: u16,
    pub rows: u16,
    pub cells: Vec<ConsoleCell>,
    pub cursor: (u16, u16),
    pub cursor_size: u32,
    pub cursor_visible: bool,
    pub rows_written: usize,
    pub raw: Vec<u8>,
}

impl ConsoleScreen {
    pub fn row_text(&self, row: u16) -> String {
        let cols = usize::from(self.cols);
        let start = usize::from(row) * cols;
        self.cells
            .get(start..start + cols)
            .map(|cells| cells.iter().map(|c| char::from(c.ch)).collect())
            .unwrap_or_default()
    }
}

/// Console that keeps the screen contents in memory. Clones share the same screen.
#[derive(Debug, Clone, Default)]
pub struct BufferConsole {
    screen: Arc<Mutex<ConsoleScreen>>,
}

impl BufferConsole {
    pub fn new(cols: u16, rows: u16) -> Self {
        let screen = ConsoleScreen {
            attached: true,
            cols,
            rows,
            cells: vec![ConsoleCell::default(); usize::from(cols) * usize::from(rows)],
            cursor_size: 25,
            cursor_visible: true,
            ..Default::default()
        };
        Self {
            screen: Arc::new(Mutex::new(screen)),
        }
    }

    /// A console that reports itself as redirected output.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> MutexGuard<'_, ConsoleScreen> {
        self.screen.lock()
    }
}

impl HostConsole for BufferConsole {
    fn screen_info(&self) -> Option<ConsoleInfo> {
        let screen = self.screen.lock();
        screen.attached.then(|| ConsoleInfo {
            cols: screen.cols,
            rows: screen.rows,
            cursor: screen.cursor,
            attr: 0x07,
        })
    }

    fn set_screen_size(&mut self, cols: u16, rows: u16) {
        let mut screen = self.screen.lock();
        screen.cols = cols;
        screen.rows = rows;
        screen
            .cells
            .resize(usize::from(cols) * usize::from(rows), ConsoleCell::default());
    }

    fn write_row(&mut self, row: u16, cells: &[ConsoleCell]) {
        let mut screen = self.screen.lock();
        let cols = usize::from(screen.cols);
        let start = usize::from(row) * cols;
        let len = cells.len().min(cols);
        if let Some(dst) = screen.cells.get_mut(start..start + len) {
            dst.copy_from_slice(&cells[..len]);
            screen.rows_written += 1;
        }
    }

    fn set_cursor_position(&mut self, x: u16, y: u16) {
        self.screen.lock().cursor = (x, y);
    }

    fn set_cursor_info(&mut self, size_percent: u32, visible: bool) {
        let mut screen = self.screen.lock();
        screen.cursor_size = size_percent;
        screen.cursor_visible = visible;
    }

    fn write_raw(&mut self, byte: u8) {
        self.screen.lock().raw.push(byte);
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryScreen {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub pitch: usize,
    pub pixels: Vec<u8>,
    pub palette: Vec<PaletteEntry>,
    pub surfaces_created: usize,
    pub frames: usize,
    pub fail_locks: bool,
}

/// Display whose surfaces present into a shared in-memory screen.
#[derive(Debug, Clone, Default)]
pub struct MemoryDisplay {
    screen: Arc<Mutex<MemoryScreen>>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> MutexGuard<'_, MemoryScreen> {
        self.screen.lock()
    }

    /// Makes every subsequent surface lock fail, as a lost exclusive surface would.
    pub fn set_fail_locks(&self, fail: bool) {
        self.screen.lock().fail_locks = fail;
    }
}

impl HostDisplay for MemoryDisplay {
    fn create_surface(
        &mut self,
        width: u32,
        height: u32,
        depth: u32,
    ) -> Result<Box<dyn HostSurface>, SurfaceError> {
        if width == 0 || height == 0 || depth % 8 != 0 {
            return Err(SurfaceError::UnsupportedMode {
                width,
                height,
                depth,
            });
        }
        let pitch = width as usize * (depth as usize / 8);
        let pixels = vec![0u8; pitch * height as usize];

        let mut screen = self.screen.lock();
        screen.width = width;
        screen.height = height;
        screen.depth = depth;
        screen.pitch = pitch;
        screen.pixels = pixels.clone();
        screen.palette = vec![PaletteEntry::default(); 256];
        screen.surfaces_created += 1;

        Ok(Box::new(MemorySurface {
            screen: self.screen.clone(),
            width,
            height,
            depth,
            pitch,
            pixels,
        }))
    }
}

struct MemorySurface {
    screen: Arc<Mutex<MemoryScreen>>,
    width: u32,
    height: u32,
    depth: u32,
    pitch: usize,
    pixels: Vec<u8>,
}

impl HostSurface for MemorySurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn depth(&self) -> u32 {
        self.depth
    }

    fn lock(&mut self) -> Result<SurfaceLock<'_>, SurfaceError> {
        if self.screen.lock().fail_locks {
            return Err(SurfaceError::LockFailed);
        }
        Ok(SurfaceLock {
            pixels: &mut self.pixels,
            pitch: self.pitch,
            width: self.width,
            height: self.height,
        })
    }

    fn unlock(&mut self) {
        let mut screen = self.screen.lock();
        screen.pixels.clone_from(&self.pixels);
        screen.frames += 1;
    }

    fn set_palette(&mut self, start: usize, entries: &[PaletteEntry]) {
        let mut screen = self.screen.lock();
        let end = (start + entries.len()).min(screen.palette.len());
        if start < end {
            screen.palette[start..end].copy_from_slice(&entries[..end - start]);
        }
    }
}
