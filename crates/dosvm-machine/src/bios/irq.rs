//! Hardware interrupt handlers for IRQ0 and IRQ1.

use dosvm_bios::{bda, ivt, ShiftFlags};
use dosvm_cpu::CpuContext;

use crate::{VirtualMachineInstance, VmError};

const USER_TICK_VECTOR: u8 = 0x1C;

impl VirtualMachineInstance {
    /// INT 08h: count the tick, run a hooked INT 1Ch, then acknowledge IRQ0.
    pub(crate) fn handle_timer_irq(&mut self, ctx: &mut CpuContext) -> Result<(), VmError> {
        let ticks = bda::advance_timer_ticks(&self.memory);
        tracing::trace!(ticks, "timer tick");

        let result = if ivt::is_builtin(&self.memory, USER_TICK_VECTOR) {
            Ok(())
        } else {
            let target = ivt::get_vector(&self.memory, USER_TICK_VECTOR);
            let mut nested = ctx.clone();
            self.call_real_mode(&mut nested, target)
        };

        self.scheduler.acknowledge_eoi();
        result
    }

    /// INT 09h: move the current scan code into the BIOS keyboard state.
    pub(crate) fn handle_keyboard_irq(&mut self, _ctx: &mut CpuContext) {
        let (scan, ascii) = self.keyboard.current_scan();

        let mut shift = ShiftFlags::from_bits_retain(self.memory.read_u8(bda::KBD_SHIFT_FLAGS));
        if shift.track(scan) {
            self.memory.write_u8(bda::KBD_SHIFT_FLAGS, shift.bits());
            tracing::trace!(
                scan = format_args!("{scan:#04x}"),
                flags = ?shift,
                "shift state changed"
            );
        } else if scan & 0x80 == 0 {
            self.keyboard_buffer.produce(scan, ascii);
        }

        self.scheduler.acknowledge_eoi();
    }
}
