use std::collections::TryReserveError;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dosvm_memory::GuestMemory;
use parking_lot::Mutex;

use crate::dac::DacLatch;
use crate::framebuffer::{
    Framebuffer, WindowMapping, CGA_WINDOW_SIZE, CGA_WINDOW_START, VGA_WINDOW_SIZE,
    VGA_WINDOW_START,
};
use crate::host::{ConsoleCell, HostConsole, HostDisplay, HostSurface, PaletteEntry, SurfaceError};
use crate::modes::{mode_info, ModeKind, VgaModeInfo};
use crate::palette::{default_palette, ega_color, CGA_PALETTE_1, DEFAULT_ATTRIBUTE_PALETTE};
use crate::text::TextState;
use crate::timer::RedrawTimer;
use crate::TEXT_BUFFER_START;

#[derive(Debug, thiserror::Error)]
pub enum VgaError {
    #[error("unknown video mode {0:#x}")]
    UnknownMode(u16),
    #[error("framebuffer allocation failed: {0}")]
    FramebufferAlloc(#[from] TryReserveError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("cannot start redraw thread: {0}")]
    RedrawThread(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VgaConfig {
    /// Redraw period while a graphics mode is active.
    pub graphics_refresh: Duration,
    /// Redraw period for alpha modes mirrored into a host console.
    pub text_refresh: Duration,
    /// Smallest host surface requested for low-resolution graphics modes.
    pub min_surface: (u32, u32),
}

impl Default for VgaConfig {
    fn default() -> Self {
        Self {
            graphics_refresh: Duration::from_millis(20),
            text_refresh: Duration::from_millis(30),
            min_surface: (640, 480),
        }
    }
}

/// Snapshot of the active graphics configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VgaGeometry {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub pitch: usize,
    pub framebuffer_len: usize,
    /// `(width, height, depth)` of the host surface, if one is attached.
    pub surface: Option<(u32, u32, u32)>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct CgaState {
    pub(crate) palette_index: u8,
    pub(crate) bright: bool,
    pub(crate) enabled: bool,
    pub(crate) composite: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexLatches {
    pub(crate) attribute: u8,
    /// Attribute controller flip-flop: the next 3C0h write is an index.
    pub(crate) attribute_is_index: bool,
    pub(crate) sequencer: u8,
    pub(crate) graphics: u8,
    pub(crate) crtc: u8,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Retrace {
    pub(crate) vertical: bool,
    pub(crate) horizontal: bool,
}

/// Everything guarded by the device lock.
pub(crate) struct VgaState {
    pub(crate) memory: GuestMemory,
    pub(crate) config: VgaConfig,
    pub(crate) mode: u16,
    pub(crate) fb: Framebuffer,
    pub(crate) palette: [PaletteEntry; 256],
    pub(crate) palette_size: usize,
    pub(crate) attribute_palette: [u8; 17],
    pub(crate) cga: CgaState,
    pub(crate) dac: DacLatch,
    pub(crate) index: IndexLatches,
    pub(crate) retrace: Retrace,
    pub(crate) timer_running: bool,
    pub(crate) text: TextState,
    pub(crate) console: Box<dyn HostConsole>,
    pub(crate) display: Box<dyn HostDisplay>,
    pub(crate) surface: Option<Box<dyn HostSurface>>,
}

/// The VGA/CGA adapter. Shared between the VM thread and the redraw thread.
pub struct VgaController {
    pub(crate) state: Mutex<VgaState>,
    timer: Mutex<Option<RedrawTimer>>,
    weak_self: Weak<Self>,
}

impl VgaController {
    pub fn new(
        memory: GuestMemory,
        config: VgaConfig,
        console: Box<dyn HostConsole>,
        display: Box<dyn HostDisplay>,
    ) -> Arc<Self> {
        let state = VgaState {
            memory,
            config,
            mode: 3,
            fb: Framebuffer::default(),
            palette: default_palette(),
            palette_size: 256,
            attribute_palette: DEFAULT_ATTRIBUTE_PALETTE,
            cga: CgaState {
                palette_index: 0,
                bright: false,
                enabled: true,
                composite: false,
            },
            dac: DacLatch::new(),
            index: IndexLatches {
                attribute: 0,
                attribute_is_index: true,
                sequencer: 0,
                graphics: 0,
                crtc: 0,
            },
            retrace: Retrace::default(),
            timer_running: false,
            text: TextState::default(),
            console,
            display,
            surface: None,
        };
        Arc::new_cyclic(|weak_self| Self {
            state: Mutex::new(state),
            timer: Mutex::new(None),
            weak_self: weak_self.clone(),
        })
    }

    /// Probes the host console and adopts its geometry as the initial alpha mode.
    ///
    /// Does not switch modes; returns the text grid the BIOS should report.
    pub fn init_alpha_mode(&self) -> (u16, u16) {
        let mut state = self.state.lock();
        let info = state.console.screen_info();
        let text = &mut state.text;
        let size = match info {
            Some(info) => {
                text.console = true;
                text.x = info.cursor.0;
                text.y = info.cursor.1;
                text.attr = info.attr;
                (info.cols, info.rows)
            }
            None => {
                text.console = false;
                text.x = 0;
                text.y = 0;
                text.attr = 0x0F;
                (80, 25)
            }
        };
        state.text.width = size.0;
        state.text.height = size.1;
        state.prepare_shadow();
        tracing::debug!(
            cols = size.0,
            rows = size.1,
            console = state.text.console,
            "alpha mode probed"
        );
        size
    }

    /// Switches to `mode` and clears video memory. Repeating the current mode is harmless: the
    /// framebuffer and host surface are reused when their geometry does not change.
    pub fn set_mode(&self, mode: u16) -> Result<(), VgaError> {
        self.set_mode_with(mode, true)
    }

    /// Like [`set_mode`](Self::set_mode). With `clear` unset, a graphics mode keeps the current
    /// video memory contents.
    pub fn set_mode_with(&self, mode: u16, clear: bool) -> Result<(), VgaError> {
        let info = mode_info(mode).ok_or(VgaError::UnknownMode(mode))?;
        if !info.supported {
            tracing::warn!(mode = format_args!("{mode:#x}"), "video mode is not fully supported");
        }
        tracing::debug!(
            mode = format_args!("{mode:#x}"),
            kind = ?info.kind,
            clear,
            "setting video mode"
        );

        match info.kind {
            ModeKind::Text => self.set_alpha_mode(mode, info),
            ModeKind::Graphics => self.set_graphics_mode(mode, info, clear),
        }
    }

    fn set_alpha_mode(&self, mode: u16, info: &VgaModeInfo) -> Result<(), VgaError> {
        self.state.lock().surface = None;
        self.deinstall_timer();

        let (cols, rows) = info.text_size();
        let console = {
            let mut state = self.state.lock();
            state.mode = mode;
            state.text.width = cols;
            state.text.height = rows;
            state.prepare_shadow();
            if state.text.x >= cols || state.text.y >= rows {
                state.text.x = 0;
                state.text.y = 0;
            }
            if state.text.console {
                state.console.set_screen_size(cols, rows);
            }
            state.text.console
        };

        if console {
            let rate = self.state.lock().config.text_refresh;
            self.install_timer(rate)?;
        }
        Ok(())
    }

    fn set_graphics_mode(
        &self,
        mode: u16,
        info: &VgaModeInfo,
        clear: bool,
    ) -> Result<(), VgaError> {
        let rate = {
            let mut state = self.state.lock();
            state.mode = mode;
            if let Err(err) = state.configure_graphics(info, clear) {
                tracing::error!(%err, mode = format_args!("{mode:#x}"), "graphics mode setup failed");
                state.surface = None;
                return Err(err);
            }
            state.config.graphics_refresh
        };
        self.install_timer(rate)
    }

    pub fn current_mode(&self) -> u16 {
        self.state.lock().mode
    }

    pub fn geometry(&self) -> VgaGeometry {
        let state = self.state.lock();
        VgaGeometry {
            width: state.fb.width,
            height: state.fb.height,
            depth: state.fb.depth,
            pitch: state.fb.pitch,
            framebuffer_len: state.fb.data.len(),
            surface: state
                .surface
                .as_ref()
                .map(|s| (s.width(), s.height(), s.depth())),
        }
    }

    pub fn window(&self) -> WindowMapping {
        self.state.lock().fb.window
    }

    /// Remaps the guest window, committing the current window contents first.
    pub fn set_window_start(&self, window: WindowMapping) {
        let mut state = self.state.lock();
        let VgaState { fb, memory, .. } = &mut *state;
        fb.set_window_start(memory, window);
    }

    /// Copies between the guest window and the framebuffer; `target_is_framebuffer` picks the
    /// direction.
    pub fn sync_window(&self, target_is_framebuffer: bool) {
        let mut state = self.state.lock();
        let VgaState { fb, memory, .. } = &mut *state;
        fb.sync_window(memory, target_is_framebuffer);
    }

    /// Raw framebuffer bytes starting at `offset`, for inspection.
    pub fn framebuffer_bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        let state = self.state.lock();
        state
            .fb
            .data
            .get(offset..offset.saturating_add(len).min(state.fb.data.len()))
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    pub fn set_palette(&self, start: usize, entries: &[PaletteEntry]) {
        self.state.lock().set_palette(start, entries);
    }

    pub fn palette_entry(&self, index: u8) -> PaletteEntry {
        self.state.lock().palette[usize::from(index)]
    }

    /// Number of palette entries meaningful in the current mode.
    pub fn palette_size(&self) -> usize {
        self.state.lock().palette_size
    }

    /// Sets EGA attribute register `reg` (0..16, 16 = overscan) to an rgbRGB color.
    pub fn set_color16(&self, reg: usize, color: u8) {
        self.state.lock().set_color16(reg, color);
    }

    pub fn color16(&self, reg: usize) -> u8 {
        self.state
            .lock()
            .attribute_palette
            .get(reg)
            .copied()
            .unwrap_or(0)
    }

    /// Loads all 16 attribute registers plus the overscan register.
    pub fn set_16_palette(&self, table: &[u8; 17]) {
        let mut state = self.state.lock();
        for (reg, &color) in table.iter().enumerate() {
            state.set_color16(reg, color);
        }
    }

    pub fn palette_registers(&self) -> [u8; 17] {
        self.state.lock().attribute_palette
    }

    /// Selects CGA palette `index` (0 = green/red/brown, 1 = cyan/magenta/white).
    pub fn set_cga_palette(&self, index: u8, bright: bool) {
        let mut state = self.state.lock();
        state.cga.palette_index = index & 1;
        state.cga.bright = bright;
        state.update_cga_palette();
    }

    /// `(palette index, bright)` of the CGA colour control register.
    pub fn cga_palette_selection(&self) -> (u8, bool) {
        let state = self.state.lock();
        (state.cga.palette_index, state.cga.bright)
    }

    /// Enables the composite decoding of mode 6 (160x200x16) on the next mode set.
    pub fn set_composite(&self, composite: bool) {
        self.state.lock().cga.composite = composite;
    }

    pub fn is_timer_running(&self) -> bool {
        self.state.lock().timer_running
    }

    /// One redraw tick: pushes a graphics frame or the changed text rows to the host and
    /// raises the vertical retrace flag.
    pub fn poll(&self) {
        self.state.lock().redraw();
    }

    /// Drops the host surface and stops the redraw thread after a final redraw.
    pub fn shutdown(&self) {
        self.state.lock().surface = None;
        self.deinstall_timer();
    }

    fn install_timer(&self, rate: Duration) -> Result<(), VgaError> {
        let mut timer = self.timer.lock();
        match timer.as_ref() {
            Some(running) => running.set_rate(rate),
            None => *timer = Some(RedrawTimer::start(self.weak_self.clone(), rate)?),
        }
        drop(timer);
        self.state.lock().timer_running = true;
        tracing::debug!(?rate, "redraw timer installed");
        Ok(())
    }

    fn deinstall_timer(&self) {
        let Some(timer) = self.timer.lock().take() else {
            return;
        };
        timer.stop();
        self.state.lock().timer_running = false;
        self.poll();
        tracing::debug!("redraw timer removed");
    }
}

impl VgaState {
    /// Framebuffer, window, palette and surface setup for a graphics mode.
    fn configure_graphics(&mut self, info: &VgaModeInfo, clear: bool) -> Result<(), VgaError> {
        let (mut width, height, mut depth) = (info.width, info.height, info.depth);
        if info.id == 6 && self.cga.composite {
            width /= 4;
            depth *= 4;
        }
        // Commit the outgoing window while its base is still selected.
        if matches!(self.fb.window, WindowMapping::Linear(_)) {
            self.fb.sync_window(&self.memory, true);
        }
        self.fb.window = WindowMapping::Linear(0);
        self.fb.configure(width, height, depth)?;

        let (surface_width, surface_height) = if width >= 640 || height >= 480 {
            (width, height)
        } else {
            self.config.min_surface
        };
        let surface_depth = depth.max(8);

        if depth >= 8 {
            self.fb.select_window(VGA_WINDOW_START, VGA_WINDOW_SIZE);
            self.palette = default_palette();
            self.palette_size = 256;
        } else {
            self.fb.select_window(CGA_WINDOW_START, CGA_WINDOW_SIZE);
            self.palette = default_palette();
            if depth == 2 {
                self.palette[..4].copy_from_slice(&CGA_PALETTE_1);
                self.palette_size = 4;
            } else {
                self.palette_size = 16;
            }
            self.cga.palette_index = 1;
            self.cga.bright = false;
        }

        if clear {
            self.fb.clear_window(&self.memory);
            self.fb.data.fill(0);
        } else {
            self.fb.sync_window(&self.memory, false);
        }

        let reusable = self.surface.as_ref().is_some_and(|s| {
            s.width() == surface_width && s.height() == surface_height && s.depth() == surface_depth
        });
        if !reusable {
            self.surface = None;
            let surface =
                self.display
                    .create_surface(surface_width, surface_height, surface_depth)?;
            tracing::debug!(
                width = surface_width,
                height = surface_height,
                depth = surface_depth,
                "host surface created"
            );
            self.surface = Some(surface);
        }
        if let Some(surface) = self.surface.as_mut() {
            surface.set_palette(0, &self.palette);
        }
        self.retrace = Retrace::default();
        Ok(())
    }

    pub(crate) fn set_palette(&mut self, start: usize, entries: &[PaletteEntry]) {
        let end = (start + entries.len()).min(self.palette.len());
        if start >= end {
            return;
        }
        self.palette[start..end].copy_from_slice(&entries[..end - start]);
        if let Some(surface) = self.surface.as_mut() {
            surface.set_palette(start, &self.palette[start..end]);
        }
    }

    pub(crate) fn set_color16(&mut self, reg: usize, color: u8) {
        let Some(slot) = self.attribute_palette.get_mut(reg) else {
            tracing::warn!(reg, "attribute register out of range");
            return;
        };
        *slot = color;
        if reg < 16 {
            self.set_palette(reg, &[ega_color(color)]);
        }
    }

    pub(crate) fn update_cga_palette(&mut self) {
        let entries = *crate::palette::cga_palette(self.cga.palette_index, self.cga.bright);
        self.set_palette(0, &entries);
    }

    /// Fills the text shadow with the inverse of the current text buffer so the first redraw
    /// repaints every row.
    pub(crate) fn prepare_shadow(&mut self) {
        let len = self.text.cells() * 2;
        let current = self
            .memory
            .read_vec(TEXT_BUFFER_START, len)
            .unwrap_or_else(|_| vec![0; len]);
        self.text.shadow = current.into_iter().map(|b| b ^ 0xFF).collect();
    }

    pub(crate) fn redraw(&mut self) {
        if self.surface.is_some() {
            self.redraw_graphics();
        } else if self.text.console {
            self.redraw_text();
        }
        self.retrace.vertical = true;
    }

    fn redraw_graphics(&mut self) {
        let Self {
            fb,
            memory,
            surface,
            ..
        } = self;
        let Some(surface) = surface.as_mut() else {
            return;
        };
        if fb.window != WindowMapping::Unchained {
            fb.sync_window(memory, true);
        }
        match surface.lock() {
            Ok(mut lock) => fb.blit(&mut lock),
            Err(err) => {
                tracing::debug!(%err, "surface lock failed; skipping frame");
                return;
            }
        }
        surface.unlock();
    }

    fn redraw_text(&mut self) {
        self.console.set_cursor_position(self.text.x, self.text.y);

        let row_bytes = usize::from(self.text.width) * 2;
        if row_bytes == 0 {
            return;
        }
        let len = self.text.cells() * 2;
        let Ok(current) = self.memory.read_vec(TEXT_BUFFER_START, len) else {
            return;
        };
        if self.text.shadow.len() != len {
            self.text.shadow = current.iter().map(|b| b ^ 0xFF).collect();
        }

        for (row, (line, old)) in current
            .chunks_exact(row_bytes)
            .zip(self.text.shadow.chunks_exact_mut(row_bytes))
            .enumerate()
        {
            if line == old {
                continue;
            }
            let cells: Vec<ConsoleCell> = line
                .chunks_exact(2)
                .map(|pair| ConsoleCell {
                    ch: if pair[0] == 0 { b' ' } else { pair[0] },
                    attr: pair[1],
                })
                .collect();
            self.console.write_row(row as u16, &cells);
            old.copy_from_slice(line);
        }
    }
}
