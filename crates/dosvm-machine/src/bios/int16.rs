//! INT 16h keyboard services.

use dosvm_bios::bda;
use dosvm_cpu::{CpuContext, EFlags};

use crate::{VirtualMachineInstance, VmError};

fn key_word(scan: u8, ascii: u8) -> u16 {
    u16::from(scan) << 8 | u16::from(ascii)
}

impl VirtualMachineInstance {
    pub(crate) fn handle_int16(&mut self, ctx: &mut CpuContext) -> Result<(), VmError> {
        let ah = ctx.ah();
        match ah {
            // Blocking read.
            0x00 | 0x10 => {
                if let Some((scan, ascii)) = self.consume_key(ctx, true)? {
                    ctx.set_ax(key_word(scan, ascii));
                }
            }
            // Keystroke available?
            0x01 | 0x11 => match self.keyboard_buffer.peek() {
                Some((scan, ascii)) => {
                    ctx.set_ax(key_word(scan, ascii));
                    ctx.set_flag(EFlags::ZF, false);
                }
                None => ctx.set_flag(EFlags::ZF, true),
            },
            0x02 => ctx.set_al(self.memory.read_u8(bda::KBD_SHIFT_FLAGS)),
            0x12 => {
                ctx.set_al(self.memory.read_u8(bda::KBD_SHIFT_FLAGS));
                ctx.set_ah(self.memory.read_u8(bda::KBD_SHIFT_FLAGS2));
            }
            0x03 => tracing::debug!("typematic rate change ignored"),
            0x05 => {
                let stored = self.keyboard_buffer.produce(ctx.ch(), ctx.cl());
                ctx.set_al(u8::from(!stored));
            }
            _ => tracing::warn!(ah = format_args!("{ah:#04x}"), "unimplemented INT 16h function"),
        }
        Ok(())
    }
}
