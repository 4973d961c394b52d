use std::sync::Arc;

use dosvm_cpu::PortIoDevice;

use crate::EventScheduler;

pub const PIC_COMMAND_PORT: u16 = 0x20;
pub const PIC_DATA_PORT: u16 = 0x21;
/// Non-specific end of interrupt (OCW2).
pub const PIC_EOI: u8 = 0x20;

/// Port view of the virtual PIC.
///
/// Only the EOI command is modelled; IRQ masking and priority rotation are not.
pub struct PicPorts {
    scheduler: Arc<EventScheduler>,
}

impl PicPorts {
    pub fn new(scheduler: Arc<EventScheduler>) -> Self {
        Self { scheduler }
    }
}

impl PortIoDevice for PicPorts {
    fn read(&mut self, port: u16, _size: u8) -> u32 {
        tracing::debug!(port = format_args!("{port:#x}"), "PIC register read");
        0
    }

    fn write(&mut self, port: u16, _size: u8, value: u32) {
        self.scheduler.pic_port_write(port, value as u8);
    }
}
