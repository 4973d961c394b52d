//! Alpha-mode text services operating on the text buffer at B8000h.

use crate::controller::{VgaController, VgaState};
use crate::modes::{mode_info, ModeKind};
use crate::TEXT_BUFFER_START;

#[derive(Debug, Clone, Default)]
pub(crate) struct TextState {
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) x: u16,
    pub(crate) y: u16,
    pub(crate) attr: u8,
    /// Host output is an interactive console that mirrors the text buffer.
    pub(crate) console: bool,
    /// Copy of the text buffer as last pushed to the console.
    pub(crate) shadow: Vec<u8>,
}

impl TextState {
    pub(crate) fn cells(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}

impl VgaState {
    fn in_text_mode(&self) -> bool {
        mode_info(self.mode).map_or(true, |info| info.kind == ModeKind::Text)
    }

    fn cell_address(&self, x: u16, y: u16) -> u32 {
        TEXT_BUFFER_START + (u32::from(self.text.width) * u32::from(y) + u32::from(x)) * 2
    }

    fn put_char_at(&mut self, x: u16, y: u16, ch: u8, attr: Option<u8>) {
        if !self.in_text_mode() {
            tracing::warn!(ch, x, y, "text output in graphics mode is not supported");
            return;
        }
        let addr = self.cell_address(x, y);
        self.memory.write_u8(addr, ch);
        if let Some(attr) = attr {
            self.memory.write_u8(addr + 1, attr);
        }
    }

    pub(crate) fn write_chars(&mut self, x: u16, y: u16, ch: u8, attr: Option<u8>, count: u16) {
        for i in (0..count).rev() {
            self.put_char_at(x.saturating_add(i), y, ch, attr);
        }
    }

    pub(crate) fn put_char(&mut self, ch: u8) {
        match ch {
            0x08 => {
                if self.text.x > 0 {
                    self.text.x -= 1;
                    self.put_char_at(self.text.x, self.text.y, b' ', Some(0));
                }
            }
            b'\t' => self.text.x = (self.text.x + 8) & !7,
            b'\n' => {
                self.text.y += 1;
                self.text.x = 0;
            }
            0x07 => {}
            b'\r' => self.text.x = 0,
            _ => {
                let attr = self.text.attr;
                self.put_char_at(self.text.x, self.text.y, ch, Some(attr));
                self.text.x += 1;
            }
        }

        if self.text.x >= self.text.width {
            self.text.x = 0;
            self.text.y += 1;
        }
        if self.text.y >= self.text.height && self.text.height > 0 {
            self.text.y = self.text.height - 1;
            let (right, bottom, attr) = (
                self.text.width.saturating_sub(1),
                self.text.height - 1,
                self.text.attr,
            );
            self.scroll_up(0, 0, bottom, right, 1, attr);
        }

        if !self.text.console {
            self.console.write_raw(ch);
        }
    }

    pub(crate) fn clear_text(&mut self, top: u16, left: u16, bottom: u16, right: u16, attr: u8) {
        for y in top..=bottom {
            for x in left..=right {
                self.put_char_at(x, y, b' ', Some(attr));
            }
        }
    }

    fn copy_row(&self, left: u16, right: u16, from: u16, to: u16) {
        let len = usize::from(right - left + 1) * 2;
        let src = self.cell_address(left, from);
        let dst = self.cell_address(left, to);
        match self.memory.read_vec(src, len) {
            Ok(row) => {
                if let Err(err) = self.memory.write_from(dst, &row) {
                    tracing::warn!(%err, "text scroll out of range");
                }
            }
            Err(err) => tracing::warn!(%err, "text scroll out of range"),
        }
    }

    pub(crate) fn scroll_up(
        &mut self,
        top: u16,
        left: u16,
        bottom: u16,
        right: u16,
        lines: u16,
        attr: u8,
    ) {
        if top > bottom || left > right || lines == 0 {
            return;
        }
        let lines = lines.min(bottom - top + 1);
        if lines <= bottom - top {
            for y in top..=bottom - lines {
                self.copy_row(left, right, y + lines, y);
            }
        }
        for y in bottom + 1 - lines..=bottom {
            self.write_chars(left, y, b' ', Some(attr), right - left + 1);
        }
    }

    pub(crate) fn scroll_down(
        &mut self,
        top: u16,
        left: u16,
        bottom: u16,
        right: u16,
        lines: u16,
        attr: u8,
    ) {
        if top > bottom || left > right || lines == 0 {
            return;
        }
        let lines = lines.min(bottom - top + 1);
        for y in (top + lines..=bottom).rev() {
            self.copy_row(left, right, y - lines, y);
        }
        for y in top..top + lines {
            self.write_chars(left, y, b' ', Some(attr), right - left + 1);
        }
    }

    /// Plots one pixel into the CGA window (2 bits per pixel, interleaved banks).
    pub(crate) fn write_pixel(&mut self, color: u8, col: u16, row: u16) {
        let bank = if row & 1 == 1 { 8 * 1024 } else { 0 };
        let offset = bank + 80 * u32::from(row / 2) + u32::from(col / 4);
        let addr = self.fb.window_base + offset;
        let shift = 6 - (col % 4) * 2;
        let byte = self.memory.read_u8(addr);
        let byte = (byte & !(0x03 << shift)) | ((color & 0x03) << shift);
        self.memory.write_u8(addr, byte);
    }
}

impl VgaController {
    /// Text grid of the current alpha mode.
    pub fn text_size(&self) -> (u16, u16) {
        let state = self.state.lock();
        (state.text.width, state.text.height)
    }

    pub fn cursor_position(&self) -> (u16, u16) {
        let state = self.state.lock();
        (state.text.x, state.text.y)
    }

    pub fn set_cursor_position(&self, x: u16, y: u16) {
        let mut state = self.state.lock();
        state.text.x = x;
        state.text.y = y;
    }

    /// Applies a BIOS cursor shape (start/end scan lines, bits 5-6 of `start` hide it).
    pub fn set_cursor_shape(&self, start: u8, end: u8) {
        let lines = u32::from(end & 0x1F).saturating_sub(u32::from(start & 0x1F));
        let size = (lines * 100 / 0x0E).clamp(1, 100);
        let visible = start & 0x60 != 0x20;
        self.state.lock().console.set_cursor_info(size, visible);
    }

    /// Teletype output of one character at the cursor, honouring BS, TAB, LF, BEL and CR.
    pub fn put_char(&self, ch: u8) {
        self.state.lock().put_char(ch);
    }

    /// Writes `count` copies of `ch` starting at `(x, y)`; `attr` of `None` keeps the
    /// existing attributes.
    pub fn write_chars(&self, x: u16, y: u16, ch: u8, attr: Option<u8>, count: u16) {
        self.state.lock().write_chars(x, y, ch, attr, count);
    }

    pub fn clear_text(&self, top: u16, left: u16, bottom: u16, right: u16, attr: u8) {
        self.state.lock().clear_text(top, left, bottom, right, attr);
    }

    pub fn scroll_up(&self, top: u16, left: u16, bottom: u16, right: u16, lines: u16, attr: u8) {
        self.state
            .lock()
            .scroll_up(top, left, bottom, right, lines, attr);
    }

    pub fn scroll_down(&self, top: u16, left: u16, bottom: u16, right: u16, lines: u16, attr: u8) {
        self.state
            .lock()
            .scroll_down(top, left, bottom, right, lines, attr);
    }

    /// `(ascii, attr)` under the cursor.
    pub fn char_at_cursor(&self) -> (u8, u8) {
        let state = self.state.lock();
        let addr = state.cell_address(state.text.x, state.text.y);
        (state.memory.read_u8(addr), state.memory.read_u8(addr + 1))
    }

    pub fn write_pixel(&self, color: u8, col: u16, row: u16) {
        self.state.lock().write_pixel(color, col, row);
    }
}
