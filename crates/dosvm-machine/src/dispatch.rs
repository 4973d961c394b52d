//! Real-mode interrupt dispatch table.

use dosvm_cpu::CpuContext;

use crate::{VirtualMachineInstance, VmError};

/// Interrupts serviced by the monitor itself while their vector still points at the BIOS stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinInterrupt {
    /// IRQ0, INT 08h.
    Timer,
    /// IRQ1, INT 09h.
    Keyboard,
    /// IRQs without a device model: acknowledge and return.
    IrqAck,
    /// INT 10h.
    Video,
    /// INT 11h.
    Equipment,
    /// INT 12h.
    MemorySize,
    /// INT 16h.
    KeyboardServices,
    /// INT 1Ah.
    TimeOfDay,
    /// INT 1Ch, chained from the timer handler.
    UserTick,
    /// INT 20h.
    Terminate,
}

/// The builtin handler for `vector`, if the monitor has one.
pub fn lookup(vector: u8) -> Option<BuiltinInterrupt> {
    Some(match vector {
        0x08 => BuiltinInterrupt::Timer,
        0x09 => BuiltinInterrupt::Keyboard,
        0x0A..=0x0F | 0x70..=0x77 => BuiltinInterrupt::IrqAck,
        0x10 => BuiltinInterrupt::Video,
        0x11 => BuiltinInterrupt::Equipment,
        0x12 => BuiltinInterrupt::MemorySize,
        0x16 => BuiltinInterrupt::KeyboardServices,
        0x1A => BuiltinInterrupt::TimeOfDay,
        0x1C => BuiltinInterrupt::UserTick,
        0x20 => BuiltinInterrupt::Terminate,
        _ => return None,
    })
}

impl VirtualMachineInstance {
    /// Runs the builtin handler for `vector` against `ctx`.
    ///
    /// Vectors without a handler are logged and otherwise ignored, so the guest just returns
    /// from the stub.
    pub fn dispatch(&mut self, vector: u8, ctx: &mut CpuContext) -> Result<(), VmError> {
        let Some(handler) = lookup(vector) else {
            tracing::warn!(
                vector = format_args!("{vector:#04x}"),
                ax = format_args!("{:#06x}", ctx.ax()),
                "unknown interrupt"
            );
            return Ok(());
        };

        tracing::trace!(vector = format_args!("{vector:#04x}"), ?handler, "builtin interrupt");
        match handler {
            BuiltinInterrupt::Timer => self.handle_timer_irq(ctx)?,
            BuiltinInterrupt::Keyboard => self.handle_keyboard_irq(ctx),
            BuiltinInterrupt::IrqAck => self.scheduler.acknowledge_eoi(),
            BuiltinInterrupt::Video => self.handle_int10(ctx)?,
            BuiltinInterrupt::Equipment => self.handle_int11(ctx),
            BuiltinInterrupt::MemorySize => self.handle_int12(ctx),
            BuiltinInterrupt::KeyboardServices => self.handle_int16(ctx)?,
            BuiltinInterrupt::TimeOfDay => self.handle_int1a(ctx),
            BuiltinInterrupt::UserTick => {}
            BuiltinInterrupt::Terminate => self.handle_int20(ctx),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn irq_vectors_without_devices_are_acknowledged() {
        for vector in (0x0A..=0x0F).chain(0x70..=0x77) {
            assert_eq!(lookup(vector), Some(BuiltinInterrupt::IrqAck));
        }
        assert_eq!(lookup(0x08), Some(BuiltinInterrupt::Timer));
        assert_eq!(lookup(0x09), Some(BuiltinInterrupt::Keyboard));
    }

    proptest! {
        #[test]
        fn only_known_vectors_have_handlers(vector in any::<u8>()) {
            let known = matches!(
                vector,
                0x08..=0x12 | 0x16 | 0x1A | 0x1C | 0x20 | 0x70..=0x77
            );
            prop_assert_eq!(lookup(vector).is_some(), known);
        }
    }
}
