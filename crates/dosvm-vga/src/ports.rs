//! Register file behind ports 3B0h-3DFh.

use crate::controller::{VgaController, VgaError, VgaState};
use crate::framebuffer::WindowMapping;

const SEQ_MEMORY_MODE: u8 = 0x04;

/// Work a port write leaves for after the device lock is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortEffect {
    None,
    SetMode(u16),
}

/// CGA mode control values (`val & 0x17` of 3D8h) and the BIOS modes they select.
const CGA_MODE_CONTROL: [(u8, u16); 7] = [
    (0x04, 0),
    (0x00, 1),
    (0x05, 2),
    (0x01, 3),
    (0x02, 4),
    (0x06, 5),
    (0x16, 6),
];
const CGA_COMPOSITE: u8 = 0x12;

impl VgaController {
    /// Guest `OUT` to an adapter port. Only a mode switch can fail.
    pub fn port_write(&self, port: u16, value: u8) -> Result<(), VgaError> {
        let effect = self.state.lock().port_write(port, value);
        match effect {
            PortEffect::None => Ok(()),
            PortEffect::SetMode(mode) => self.set_mode(mode),
        }
    }

    /// Guest `IN` from an adapter port. Unsupported registers read as 0xFF.
    pub fn port_read(&self, port: u16) -> u8 {
        self.state.lock().port_read(port)
    }
}

impl VgaState {
    fn port_write(&mut self, port: u16, value: u8) -> PortEffect {
        tracing::trace!(
            port = format_args!("{port:#06x}"),
            value = format_args!("{value:#04x}"),
            "vga out"
        );
        match port {
            0x3C0 => {
                if self.index.attribute_is_index {
                    self.index.attribute = value;
                } else if self.index.attribute < 0x10 {
                    let reg = usize::from(self.index.attribute);
                    self.set_color16(reg, value & 0x3F);
                } else {
                    tracing::warn!(
                        index = format_args!("{:#04x}", self.index.attribute),
                        value = format_args!("{value:#04x}"),
                        "unsupported attribute controller register"
                    );
                }
                self.index.attribute_is_index = !self.index.attribute_is_index;
            }
            0x3C4 => self.index.sequencer = value,
            0x3C5 => self.sequencer_write(value),
            0x3C6 => self.dac.set_pel_mask(value),
            0x3C7 => self.dac.select_read(value),
            0x3C8 => self.dac.select_write(value),
            0x3C9 => {
                if let Some((index, entry)) = self.dac.write_data(value) {
                    self.set_palette(usize::from(index), &[entry]);
                }
            }
            0x3CE => self.index.graphics = value,
            0x3CF => tracing::warn!(
                index = format_args!("{:#04x}", self.index.graphics),
                value = format_args!("{value:#04x}"),
                "unsupported graphics controller register"
            ),
            0x3B4 | 0x3D4 => self.index.crtc = value,
            0x3B5 | 0x3D5 => tracing::warn!(
                index = format_args!("{:#04x}", self.index.crtc),
                value = format_args!("{value:#04x}"),
                "unsupported crt controller register"
            ),
            0x3B8 | 0x3D8 => return self.mode_control_write(value),
            0x3D9 => {
                self.cga.bright = value & 0x10 != 0;
                self.cga.palette_index = u8::from(value & 0x20 != 0);
                self.update_cga_palette();
            }
            _ => tracing::warn!(
                port = format_args!("{port:#06x}"),
                value = format_args!("{value:#04x}"),
                "unsupported vga register write"
            ),
        }
        PortEffect::None
    }

    fn sequencer_write(&mut self, value: u8) {
        match self.index.sequencer {
            SEQ_MEMORY_MODE if self.fb.depth == 8 => {
                let window = if value & 0x08 != 0 {
                    WindowMapping::Linear(0)
                } else {
                    WindowMapping::Unchained
                };
                self.fb.set_window_start(&self.memory, window);
            }
            SEQ_MEMORY_MODE => tracing::warn!("memory mode register not supported in this mode"),
            index => tracing::warn!(
                index = format_args!("{index:#04x}"),
                value = format_args!("{value:#04x}"),
                "unsupported sequencer register"
            ),
        }
    }

    fn mode_control_write(&mut self, value: u8) -> PortEffect {
        if value & 0xC0 != 0 {
            tracing::warn!(value = format_args!("{value:#04x}"), "mode control bits 6-7 not supported");
        }
        if value & 0x20 != 0 {
            tracing::warn!(value = format_args!("{value:#04x}"), "blink is not supported");
        }

        let enabled = value & 0x08 != 0;
        if self.cga.enabled && !enabled {
            self.fb.clear_window(&self.memory);
        }
        self.cga.enabled = enabled;

        let selector = value & 0x17;
        self.cga.composite = selector == CGA_COMPOSITE;
        if self.cga.composite {
            return PortEffect::SetMode(6);
        }
        match CGA_MODE_CONTROL.iter().find(|(bits, _)| *bits == selector) {
            Some(&(_, mode)) => PortEffect::SetMode(mode),
            None => {
                tracing::warn!(value = format_args!("{value:#04x}"), "unrecognized cga mode");
                PortEffect::None
            }
        }
    }

    fn port_read(&mut self, port: u16) -> u8 {
        match port {
            0x3C1 => {
                let index = usize::from(self.index.attribute);
                self.attribute_palette.get(index).copied().unwrap_or(0xFF)
            }
            0x3C5 => match self.index.sequencer {
                SEQ_MEMORY_MODE if self.fb.window == WindowMapping::Unchained => 0xF7,
                SEQ_MEMORY_MODE => 0xFF,
                index => {
                    tracing::warn!(index = format_args!("{index:#04x}"), "unsupported sequencer read");
                    0xFF
                }
            },
            0x3C6 => self.dac.pel_mask(),
            0x3C8 => self.dac.write_index(),
            0x3C9 => self.dac.read_data(&self.palette),
            0x3BA | 0x3DA => self.input_status_read(),
            _ => {
                tracing::warn!(port = format_args!("{port:#06x}"), "unsupported vga register read");
                0xFF
            }
        }
    }

    /// Input status 1: resets the attribute flip-flop and fakes retrace.
    ///
    /// With the redraw timer running, vertical retrace is raised once per frame and cleared by
    /// the read. Without it the bit toggles on every read. Horizontal retrace always toggles.
    fn input_status_read(&mut self) -> u8 {
        self.index.attribute_is_index = true;

        let mut status = 0;
        if self.retrace.vertical {
            status |= 0x09;
        }
        if self.retrace.horizontal {
            status |= 0x03;
        }

        if self.timer_running {
            self.retrace.vertical = false;
        } else {
            self.retrace.vertical = !self.retrace.vertical;
        }
        self.retrace.horizontal = !self.retrace.horizontal;
        status
    }
}
