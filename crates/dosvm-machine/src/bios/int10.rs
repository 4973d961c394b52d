//! INT 10h video services.

use dosvm_bios::bda;
use dosvm_cpu::{CpuContext, EFlags};
use dosvm_memory::linear;
use dosvm_vga::{mode_info, PaletteEntry, VgaError};

use crate::{VirtualMachineInstance, VmError};

impl VirtualMachineInstance {
    pub(crate) fn handle_int10(&mut self, ctx: &mut CpuContext) -> Result<(), VmError> {
        let ah = ctx.ah();
        match ah {
            0x00 => self.int10_set_mode(ctx.al() & 0x7F, ctx.al() & 0x80 == 0)?,
            0x01 => {
                self.vga.set_cursor_shape(ctx.ch(), ctx.cl());
                self.memory.write_u16(bda::VIDEO_CURSOR_SHAPE, ctx.cx());
            }
            0x02 => {
                let (x, y) = (u16::from(ctx.dl()), u16::from(ctx.dh()));
                self.vga.set_cursor_position(x, y);
                self.memory.write_u16(bda::VIDEO_CURSOR_POS, ctx.dx());
            }
            0x03 => {
                let (x, y) = self.vga.cursor_position();
                ctx.set_dl(x as u8);
                ctx.set_dh(y as u8);
                ctx.set_cx(self.memory.read_u16(bda::VIDEO_CURSOR_SHAPE));
            }
            0x05 => tracing::debug!(page = ctx.al(), "video page select ignored"),
            0x06 | 0x07 => self.int10_scroll(ctx, ah == 0x06),
            0x08 => {
                let (ch, attr) = self.vga.char_at_cursor();
                ctx.set_al(ch);
                ctx.set_ah(attr);
            }
            0x09 | 0x0A => {
                let (x, y) = self.vga.cursor_position();
                let attr = (ah == 0x09).then(|| ctx.bl());
                self.vga.write_chars(x, y, ctx.al(), attr, ctx.cx());
            }
            0x0B => match ctx.bh() {
                0x01 => {
                    let (_, bright) = self.vga.cga_palette_selection();
                    self.vga.set_cga_palette(ctx.bl() & 1, bright);
                }
                bh => tracing::debug!(bh, bl = ctx.bl(), "background colour ignored"),
            },
            0x0C => self.vga.write_pixel(ctx.al(), ctx.cx(), ctx.dx()),
            0x0E => self.vga.put_char(ctx.al()),
            0x0F => {
                ctx.set_al(self.memory.read_u8(bda::VIDEO_MODE));
                ctx.set_ah(self.memory.read_u16(bda::VIDEO_COLUMNS) as u8);
                ctx.set_bh(self.memory.read_u8(bda::VIDEO_PAGE));
            }
            0x10 => self.int10_palette(ctx),
            _ => tracing::warn!(
                ah = format_args!("{ah:#04x}"),
                al = format_args!("{:#04x}", ctx.al()),
                "unimplemented INT 10h function"
            ),
        }
        ctx.set_flag(EFlags::CF, false);
        Ok(())
    }

    /// AL bit 7 set asks to keep video memory.
    fn int10_set_mode(&mut self, mode: u8, clear: bool) -> Result<(), VmError> {
        match self.vga.set_mode_with(u16::from(mode), clear) {
            Ok(()) => {}
            Err(VgaError::UnknownMode(mode)) => {
                tracing::warn!(mode = format_args!("{mode:#x}"), "INT 10h: unknown video mode");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }

        let (cols, rows) = mode_info(u16::from(mode))
            .map(|info| info.text_size())
            .unwrap_or((80, 25));
        bda::set_video_mode(&self.memory, mode, cols, rows);
        self.memory.write_u16(bda::VIDEO_CURSOR_POS, 0);
        Ok(())
    }

    fn int10_scroll(&mut self, ctx: &CpuContext, up: bool) {
        let top = u16::from(ctx.ch());
        let left = u16::from(ctx.cl());
        let bottom = u16::from(ctx.dh());
        let right = u16::from(ctx.dl());
        let attr = ctx.bh();
        let lines = u16::from(ctx.al());

        if lines == 0 {
            self.vga.clear_text(top, left, bottom, right, attr);
        } else if up {
            self.vga.scroll_up(top, left, bottom, right, lines, attr);
        } else {
            self.vga.scroll_down(top, left, bottom, right, lines, attr);
        }
    }

    /// AH=10h palette register services.
    fn int10_palette(&mut self, ctx: &mut CpuContext) {
        let buffer = linear(ctx.es, ctx.dx());
        match ctx.al() {
            0x00 => self.vga.set_color16(usize::from(ctx.bl()), ctx.bh()),
            0x01 => tracing::debug!(color = ctx.bh(), "overscan colour ignored"),
            0x02 => {
                let mut table = [0u8; 17];
                for (i, reg) in table.iter_mut().enumerate() {
                    *reg = self.memory.read_u8(buffer + i as u32);
                }
                self.vga.set_16_palette(&table);
            }
            0x07 => ctx.set_bh(self.vga.color16(usize::from(ctx.bl()))),
            0x09 => {
                for (i, reg) in self.vga.palette_registers().iter().enumerate() {
                    self.memory.write_u8(buffer + i as u32, *reg);
                }
            }
            0x10 => {
                let entry = PaletteEntry::new(ctx.dh() << 2, ctx.ch() << 2, ctx.cl() << 2);
                self.vga.set_palette(usize::from(ctx.bl()), &[entry]);
            }
            0x12 => {
                let start = usize::from(ctx.bx() & 0xFF);
                let count = usize::from(ctx.cx()).min(256 - start);
                let entries: Vec<PaletteEntry> = (0..count)
                    .map(|i| {
                        let addr = buffer + 3 * i as u32;
                        PaletteEntry::new(
                            self.memory.read_u8(addr) << 2,
                            self.memory.read_u8(addr + 1) << 2,
                            self.memory.read_u8(addr + 2) << 2,
                        )
                    })
                    .collect();
                self.vga.set_palette(start, &entries);
            }
            0x15 => {
                let entry = self.vga.palette_entry(ctx.bl());
                ctx.set_dh(entry.red >> 2);
                ctx.set_ch(entry.green >> 2);
                ctx.set_cl(entry.blue >> 2);
            }
            0x17 => {
                let start = usize::from(ctx.bx() & 0xFF);
                let count = usize::from(ctx.cx()).min(256 - start);
                for i in 0..count {
                    let entry = self.vga.palette_entry((start + i) as u8);
                    let addr = buffer + 3 * i as u32;
                    self.memory.write_u8(addr, entry.red >> 2);
                    self.memory.write_u8(addr + 1, entry.green >> 2);
                    self.memory.write_u8(addr + 2, entry.blue >> 2);
                }
            }
            al => tracing::warn!(
                al = format_args!("{al:#04x}"),
                "unimplemented INT 10h palette function"
            ),
        }
    }
}
