use dosvm_bios::bda;
use dosvm_cpu::CpuContext;

use crate::VirtualMachineInstance;

impl VirtualMachineInstance {
    /// INT 11h: equipment list.
    pub(crate) fn handle_int11(&mut self, ctx: &mut CpuContext) {
        ctx.set_ax(self.memory.read_u16(bda::EQUIPMENT_LIST));
    }

    /// INT 12h: conventional memory size in KiB.
    pub(crate) fn handle_int12(&mut self, ctx: &mut CpuContext) {
        ctx.set_ax(self.memory.read_u16(bda::MEMORY_SIZE_KB));
    }

    /// INT 1Ah: system tick count.
    pub(crate) fn handle_int1a(&mut self, ctx: &mut CpuContext) {
        match ctx.ah() {
            0x00 => {
                let ticks = self.memory.read_u32(bda::TIMER_TICKS);
                ctx.set_cx((ticks >> 16) as u16);
                ctx.set_dx(ticks as u16);
                ctx.set_al(self.memory.read_u8(bda::TIMER_ROLLOVER));
                self.memory.write_u8(bda::TIMER_ROLLOVER, 0);
            }
            0x01 => {
                let ticks = u32::from(ctx.cx()) << 16 | u32::from(ctx.dx());
                self.memory.write_u32(bda::TIMER_TICKS, ticks);
                self.memory.write_u8(bda::TIMER_ROLLOVER, 0);
            }
            ah => tracing::warn!(ah = format_args!("{ah:#04x}"), "unimplemented INT 1Ah function"),
        }
    }

    /// INT 20h: the program is done; every `enter` level unwinds.
    pub(crate) fn handle_int20(&mut self, ctx: &mut CpuContext) {
        tracing::debug!(
            cs = format_args!("{:#06x}", ctx.cs),
            "program terminated"
        );
        self.exit_status = Some(0);
    }
}
